// FgrPlan: fine-grained-routing placement planner written in Rust
// Copyright 2022-2024 the fgrplan developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rank placement.
//!
//! The hybrid strategy round-robins the eligible routers; each visit takes
//! the cheapest client the router still has, skipping (and discarding)
//! clients another router already claimed, and rotates the router's LNET
//! through its OST ring. The scheduler owns working copies of the queues
//! and rings, so a run never mutates shared state.
//!
//! The random strategy is the baseline: a uniform sample of distinct
//! clients, with OST assignment left to the launcher.

use crate::cost::CostIndex;
use crate::groups::LNET_BASE;
use crate::ostmap::OstLayout;
use crate::router::RouterTable;
use crate::topology::Topology;
use crate::types::{Nid, PlannerError, RouterId};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet, VecDeque};

/// A fully scheduled rank: one client bound to one OST through one router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    /// The selected client.
    pub client: Nid,
    /// The assigned OST (global index; atlas2 OSTs start at 1008).
    pub ost: u16,
    /// The torus cost of the client-to-router route.
    pub cost: u32,
    /// The LNET the rank writes through.
    pub lnet: u16,
    /// The router carrying the traffic.
    pub router: RouterId,
}

/// The outcome of a placement run.
#[derive(Debug, Clone)]
pub enum Placement {
    /// Cost-driven ranks with per-rank OST assignments.
    Hybrid(Vec<Rank>),
    /// A plain client sample; OST assignment is left to the launcher.
    Random(Vec<Nid>),
}

impl Placement {
    /// The selected client NIDs, in rank order.
    pub fn clients(&self) -> Vec<Nid> {
        match self {
            Placement::Hybrid(ranks) => ranks.iter().map(|r| r.client).collect(),
            Placement::Random(clients) => clients.clone(),
        }
    }

    /// Number of ranks.
    pub fn len(&self) -> usize {
        match self {
            Placement::Hybrid(ranks) => ranks.len(),
            Placement::Random(clients) => clients.len(),
        }
    }

    /// Whether no rank was placed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The hybrid scheduler.
#[derive(Debug)]
pub struct Scheduler<'a> {
    routers: &'a RouterTable,
    costs: &'a CostIndex,
    queues: HashMap<Nid, VecDeque<Nid>>,
    rings: Vec<VecDeque<u16>>,
    picked: HashSet<Nid>,
    selected: Vec<Rank>,
}

impl<'a> Scheduler<'a> {
    /// A fresh scheduler with private copies of the client queues and OST
    /// rings.
    pub fn new(routers: &'a RouterTable, costs: &'a CostIndex, layout: &OstLayout) -> Self {
        Scheduler {
            routers,
            costs,
            queues: costs.clone_queues(),
            rings: layout.rings(),
            picked: HashSet::new(),
            selected: Vec::new(),
        }
    }

    /// Round-robin the eligible routers until `numranks` ranks are
    /// selected. Consumes the scheduler; its working state is spent.
    pub fn run(
        mut self,
        eligible: &[RouterId],
        numranks: usize,
    ) -> Result<Vec<Rank>, PlannerError> {
        if eligible.is_empty() {
            return Err(PlannerError::PlannerBug(
                "placement started with no eligible routers".to_string(),
            ));
        }
        log::info!("eligible routers: {}", eligible.len());
        let routers = self.routers;
        while self.selected.len() < numranks {
            for &rid in eligible {
                if self.selected.len() == numranks {
                    break;
                }
                let router = routers.get(rid);
                let selected = self.selected.len();
                let (client, cost) = Self::best_client(
                    &mut self.queues,
                    &self.picked,
                    self.costs,
                    router.nid,
                    selected,
                    numranks,
                )?;
                if !self.picked.insert(client) {
                    return Err(PlannerError::DuplicateSelection(client));
                }
                let ost = Self::rotate_ost(&mut self.rings, router.lnet)?;
                log::trace!(
                    "rank {selected}: client {client} -> ost {ost} via router {} (cost {cost})",
                    router.nid
                );
                self.selected.push(Rank {
                    client,
                    ost,
                    cost,
                    lnet: router.lnet,
                    router: rid,
                });
            }
        }
        if self.picked.len() != self.selected.len() {
            return Err(PlannerError::PlannerBug(format!(
                "{} ranks but {} distinct clients",
                self.selected.len(),
                self.picked.len()
            )));
        }
        log::info!("selected {} ranks", self.selected.len());
        Ok(self.selected)
    }

    /// Pop the cheapest not-yet-selected client of `router`. Skipped
    /// clients leave the queue for good; they stay reachable through the
    /// other routers' queues.
    fn best_client(
        queues: &mut HashMap<Nid, VecDeque<Nid>>,
        picked: &HashSet<Nid>,
        costs: &CostIndex,
        router: Nid,
        selected: usize,
        requested: usize,
    ) -> Result<(Nid, u32), PlannerError> {
        let queue = queues.get_mut(&router).ok_or(PlannerError::SchedulerExhausted {
            router,
            selected,
            requested,
        })?;
        loop {
            let Some(client) = queue.pop_front() else {
                return Err(PlannerError::SchedulerExhausted {
                    router,
                    selected,
                    requested,
                });
            };
            if picked.contains(&client) {
                continue;
            }
            let cost = costs.cost(client, router).ok_or_else(|| {
                PlannerError::PlannerBug(format!(
                    "no cost recorded for client {client} via router {router}"
                ))
            })?;
            return Ok((client, cost));
        }
    }

    /// Rotate the OST ring of `lnet` by one and return the head, so
    /// successive visits walk the 56 OSTs cyclically.
    fn rotate_ost(rings: &mut [VecDeque<u16>], lnet: u16) -> Result<u16, PlannerError> {
        let index = (lnet as usize)
            .checked_sub(LNET_BASE as usize)
            .filter(|i| *i < rings.len())
            .ok_or_else(|| PlannerError::PlannerBug(format!("LNET {lnet} outside the layout")))?;
        let ring = &mut rings[index];
        let ost = ring
            .pop_front()
            .ok_or_else(|| PlannerError::PlannerBug(format!("LNET {lnet} has an empty OST ring")))?;
        ring.push_back(ost);
        Ok(ost)
    }
}

/// Uniformly sample `numranks` distinct clients. Seeded from system
/// entropy unless a test seed is given.
pub fn random_sample(
    topo: &Topology,
    numranks: usize,
    seed: Option<u64>,
) -> Result<Vec<Nid>, PlannerError> {
    let clients = topo.clients();
    if numranks > clients.len() {
        return Err(PlannerError::NotEnoughClients {
            requested: numranks,
            available: clients.len(),
        });
    }
    let sample = match seed {
        Some(seed) => {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            clients.choose_multiple(&mut rng, numranks).copied().collect()
        }
        None => {
            let mut rng = rand::thread_rng();
            clients.choose_multiple(&mut rng, numranks).copied().collect()
        }
    };
    Ok(sample)
}
