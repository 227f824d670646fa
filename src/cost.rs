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

//! The torus cost model and the cost indices the scheduler runs on.
//!
//! Costs exist only for `(client, router)` pairs named by a routing-map
//! file, so the index is built from one. Two views are kept: per-client
//! router costs for lookups, and per-router client queues in ascending
//! cost order for the scheduler. Queue order is deterministic: ties are
//! broken by first appearance in the input file.

use crate::topology::{Node, Topology, TORUS_X, TORUS_Y, TORUS_Z};
use crate::types::{Nid, PlannerError};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::path::Path;

/// Constant bias added to every route cost. Kept for byte-compatibility
/// with the formats existing consumers parse.
pub const COST_BIAS: u32 = 100;

/// Wrap-around distance between two coordinates on an axis of extent `dim`.
pub fn dist(a: u32, b: u32, dim: u32) -> u32 {
    let d = (a as i64 - b as i64).rem_euclid(dim as i64) as u32;
    d.min(dim - d)
}

/// Weighted torus cost of routing from `client` to `router`. Y hops are
/// weighted heaviest, then X, then Z.
pub fn route_cost(client: &Node, router: &Node) -> u32 {
    4 * dist(client.x, router.x, TORUS_X)
        + 8 * dist(client.y, router.y, TORUS_Y)
        + dist(client.z, router.z, TORUS_Z)
        + COST_BIAS
}

/// Cost indices built from a routing-map file.
#[derive(Debug, Clone, Default)]
pub struct CostIndex {
    client_costs: HashMap<Nid, HashMap<Nid, u32>>,
    router_clients: HashMap<Nid, VecDeque<Nid>>,
}

impl CostIndex {
    /// Read a routing-map file and build the indices. Each line is
    /// `<client_nid> o2ib<lnet>:<router_nid> ...`; lines for NIDs outside
    /// the topology's client set are skipped.
    pub fn from_fgr_file(path: &Path, topo: &Topology) -> Result<Self, PlannerError> {
        let input = fs::read_to_string(path).map_err(|source| PlannerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::parse(&input, path, topo)?;
        log::info!(
            "{}: costs for {} clients across {} routers",
            path.display(),
            index.client_costs.len(),
            index.router_clients.len()
        );
        Ok(index)
    }

    /// Parse routing-map text; `origin` names the source in errors.
    pub fn parse(input: &str, origin: &Path, topo: &Topology) -> Result<Self, PlannerError> {
        let mut client_costs: HashMap<Nid, HashMap<Nid, u32>> = HashMap::new();
        let mut buckets: HashMap<Nid, BTreeMap<u32, Vec<Nid>>> = HashMap::new();
        for (idx, raw) in input.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let parse_err = |reason: String| PlannerError::ParseLine {
                path: origin.to_path_buf(),
                line: idx + 1,
                reason,
            };
            let mut fields = line.split_whitespace();
            let nid = fields
                .next()
                .unwrap_or_default();
            let nid: Nid = nid
                .parse()
                .map_err(|_| parse_err(format!("invalid client NID {nid:?}")))?;
            if !topo.is_client(nid) {
                continue;
            }
            let client = topo.node(nid)?;
            for token in fields {
                let pair = token.strip_prefix("o2ib").ok_or_else(|| {
                    parse_err(format!("expected o2ib<lnet>:<nid>, found {token:?}"))
                })?;
                let (lnet, router) = pair.split_once(':').ok_or_else(|| {
                    parse_err(format!("expected o2ib<lnet>:<nid>, found {token:?}"))
                })?;
                let _lnet: u16 = lnet
                    .parse()
                    .map_err(|_| parse_err(format!("invalid LNET {lnet:?}")))?;
                let router: Nid = router
                    .parse()
                    .map_err(|_| parse_err(format!("invalid router NID {router:?}")))?;
                let cost = route_cost(client, topo.node(router)?);
                buckets.entry(router).or_default().entry(cost).or_default().push(nid);
                client_costs.entry(nid).or_default().insert(router, cost);
            }
        }
        let router_clients = buckets
            .into_iter()
            .map(|(router, by_cost)| (router, by_cost.into_values().flatten().collect()))
            .collect();
        Ok(CostIndex {
            client_costs,
            router_clients,
        })
    }

    /// The cost of reaching `router` from `client`, if the routing map
    /// names the pair.
    pub fn cost(&self, client: Nid, router: Nid) -> Option<u32> {
        self.client_costs.get(&client)?.get(&router).copied()
    }

    /// The clients of `router`, ascending by cost, stable on ties.
    pub fn clients_of(&self, router: Nid) -> Option<&VecDeque<Nid>> {
        self.router_clients.get(&router)
    }

    /// Every router with at least one client, with its queue length.
    pub fn router_loads(&self) -> impl Iterator<Item = (Nid, usize)> + '_ {
        self.router_clients.iter().map(|(nid, q)| (*nid, q.len()))
    }

    /// Number of clients the index covers.
    pub fn num_clients(&self) -> usize {
        self.client_costs.len()
    }

    /// Working copies of the per-router queues for the scheduler.
    pub(crate) fn clone_queues(&self) -> HashMap<Nid, VecDeque<Nid>> {
        self.router_clients.clone()
    }
}
