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

//! Router classification.
//!
//! A router is a single `(module, interface)` pair backed by one topology
//! node. Classification scans the map in file order and instantiates a
//! [`Router`] for every interface node whose module-level name is in the
//! built-in group table. Routers live in an arena and are identified by
//! [`RouterId`] everywhere else; nothing holds back-pointers.

use crate::groups;
use crate::topology::Topology;
use crate::types::{Cname, Interface, Nid, Partition, PartitionChoice, PlannerError, RouterId};
use std::collections::HashMap;

/// A single router interface.
#[derive(Debug, Clone)]
pub struct Router {
    /// Arena index of this router.
    pub id: RouterId,
    /// NID of the backing interface node.
    pub nid: Nid,
    /// Module-level cname (no interface part).
    pub module: Cname,
    /// Which of the four interfaces this is.
    pub interface: Interface,
    /// Router group index (0 for A through 8 for I).
    pub group: usize,
    /// The Lustre partition this interface serves.
    pub partition: Partition,
    /// The LNET this interface serves.
    pub lnet: u16,
    /// Torus X coordinate.
    pub x: u32,
    /// Torus Y coordinate.
    pub y: u32,
    /// Torus Z coordinate.
    pub z: u32,
}

impl Router {
    /// Full node name, module plus interface (for example `c7-2c2s0n0`).
    pub fn name(&self) -> String {
        format!("{}{}", self.module, self.interface)
    }
}

/// Arena of all classified routers, plus per-partition views in
/// classification order.
#[derive(Debug, Clone, Default)]
pub struct RouterTable {
    routers: Vec<Router>,
    by_nid: HashMap<Nid, RouterId>,
    atlas1: Vec<RouterId>,
    atlas2: Vec<RouterId>,
}

impl RouterTable {
    /// Scan the topology in map order and classify every router interface.
    ///
    /// An interface node of a known module with a node index outside
    /// `n0..n3` is a fatal error: it means the map and the built-in group
    /// table disagree.
    pub fn classify(topo: &Topology) -> Result<Self, PlannerError> {
        let mut table = RouterTable::default();
        for node in topo.nodes() {
            let Some(n) = node.cname.n else {
                continue;
            };
            let module = node.cname.module();
            let Some((group, _)) = groups::module_group(&module.to_string()) else {
                continue;
            };
            let interface = Interface::from_n(n)
                .ok_or_else(|| PlannerError::UnknownInterface(format!("n{n}")))?;
            let id = RouterId(table.routers.len() as u32);
            let partition = interface.partition();
            match partition {
                Partition::Atlas1 => table.atlas1.push(id),
                Partition::Atlas2 => table.atlas2.push(id),
            }
            table.by_nid.insert(node.nid, id);
            table.routers.push(Router {
                id,
                nid: node.nid,
                module,
                interface,
                group,
                partition,
                lnet: groups::lnet_of(group, interface),
                x: node.x,
                y: node.y,
                z: node.z,
            });
        }
        log::info!(
            "classified {} routers ({} atlas1, {} atlas2)",
            table.routers.len(),
            table.atlas1.len(),
            table.atlas2.len()
        );
        Ok(table)
    }

    /// The router behind an arena id.
    pub fn get(&self, id: RouterId) -> &Router {
        &self.routers[id.index()]
    }

    /// The router backed by the node with the given NID.
    pub fn by_nid(&self, nid: Nid) -> Option<&Router> {
        self.by_nid.get(&nid).map(|id| self.get(*id))
    }

    /// All routers, in classification order.
    pub fn iter(&self) -> std::slice::Iter<'_, Router> {
        self.routers.iter()
    }

    /// Number of classified routers.
    pub fn len(&self) -> usize {
        self.routers.len()
    }

    /// Whether no router was classified.
    pub fn is_empty(&self) -> bool {
        self.routers.is_empty()
    }

    /// Routers of one partition, in classification order.
    pub fn of_partition(&self, partition: Partition) -> &[RouterId] {
        match partition {
            Partition::Atlas1 => &self.atlas1,
            Partition::Atlas2 => &self.atlas2,
        }
    }

    /// Routers eligible under a partition selector; for `atlas` the
    /// atlas1 routers come first, as they do in the map.
    pub fn eligible(&self, choice: PartitionChoice) -> Vec<RouterId> {
        match choice {
            PartitionChoice::Atlas1 => self.atlas1.clone(),
            PartitionChoice::Atlas2 => self.atlas2.clone(),
            PartitionChoice::Atlas => {
                let mut all = self.atlas1.clone();
                all.extend_from_slice(&self.atlas2);
                all
            }
        }
    }
}
