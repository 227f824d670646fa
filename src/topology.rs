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

//! Loading and querying the physical machine map.
//!
//! The map is a line-oriented ASCII file, one node per line:
//!
//! ```text
//! <nid> <cname> <nodetype> <x> <y> <z>
//! ```
//!
//! The parsed [`Topology`] is immutable except for the client set, which
//! can be replaced by a node-list file or reduced by a failed-node list
//! before planning starts. Everything downstream borrows it read-only.

use crate::types::{Cname, Nid, PlannerError};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Torus extent along X.
pub const TORUS_X: u32 = 25;

/// Torus extent along Y.
pub const TORUS_Y: u32 = 16;

/// Torus extent along Z.
pub const TORUS_Z: u32 = 24;

/// Number of cabinet rows; the parallel route generator partitions by row.
pub const TORUS_ROWS: u32 = 8;

/// Whether a map entry is a compute node or a service node.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum NodeType {
    /// A compute node, candidate placement client.
    Compute,
    /// A service node; router modules live here.
    Service,
}

impl NodeType {
    fn parse(s: &str) -> Option<NodeType> {
        match s {
            "compute" => Some(NodeType::Compute),
            s if s.starts_with("service") => Some(NodeType::Service),
            _ => None,
        }
    }
}

/// One entry of the machine map.
#[derive(Debug, Clone)]
pub struct Node {
    /// Network id.
    pub nid: Nid,
    /// Structured cabinet name.
    pub cname: Cname,
    /// Compute or service.
    pub node_type: NodeType,
    /// Torus X coordinate.
    pub x: u32,
    /// Torus Y coordinate.
    pub y: u32,
    /// Torus Z coordinate.
    pub z: u32,
}

/// The parsed machine map.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: HashMap<Nid, Node>,
    order: Vec<Nid>,
    by_cname: HashMap<Cname, Nid>,
    clients: Vec<Nid>,
    client_set: HashSet<Nid>,
}

impl Topology {
    /// Read and parse a machine map file.
    pub fn load(path: &Path) -> Result<Self, PlannerError> {
        let input = fs::read_to_string(path).map_err(|source| PlannerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let topo = Self::parse(&input, path)?;
        log::info!(
            "{}: {} nodes, {} clients",
            path.display(),
            topo.nodes.len(),
            topo.clients.len()
        );
        Ok(topo)
    }

    /// Parse machine-map text; `origin` names the source in errors.
    pub fn parse(input: &str, origin: impl Into<PathBuf>) -> Result<Self, PlannerError> {
        let origin = origin.into();
        let mut topo = Topology::default();
        for (idx, raw) in input.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let parse_err = |reason: String| PlannerError::ParseLine {
                path: origin.clone(),
                line: idx + 1,
                reason,
            };
            let fields: Vec<&str> = line.split_whitespace().collect();
            let &[nid, cname, node_type, x, y, z] = fields.as_slice() else {
                return Err(parse_err(format!(
                    "expected 6 fields, found {}",
                    fields.len()
                )));
            };
            let nid: Nid = nid
                .parse()
                .map_err(|_| parse_err(format!("invalid NID {nid:?}")))?;
            let cname = Cname::parse(cname).map_err(|e| parse_err(e.to_string()))?;
            let node_type = NodeType::parse(node_type)
                .ok_or_else(|| parse_err(format!("unknown node type {node_type:?}")))?;
            let coord = |label: &str, v: &str| {
                v.parse::<u32>()
                    .map_err(|_| parse_err(format!("invalid {label} coordinate {v:?}")))
            };
            let node = Node {
                nid,
                cname,
                node_type,
                x: coord("x", x)?,
                y: coord("y", y)?,
                z: coord("z", z)?,
            };
            if node.node_type == NodeType::Compute {
                topo.clients.push(nid);
                topo.client_set.insert(nid);
            }
            topo.by_cname.insert(cname, nid);
            if topo.nodes.insert(nid, node).is_none() {
                topo.order.push(nid);
            }
        }
        Ok(topo)
    }

    /// The node with the given NID.
    pub fn node(&self, nid: Nid) -> Result<&Node, PlannerError> {
        self.nodes.get(&nid).ok_or(PlannerError::UnknownNid(nid))
    }

    /// The node with the given NID, if present.
    pub fn get(&self, nid: Nid) -> Option<&Node> {
        self.nodes.get(&nid)
    }

    /// The NID carrying the given cname.
    pub fn nid_of(&self, cname: &Cname) -> Option<Nid> {
        self.by_cname.get(cname).copied()
    }

    /// All nodes, in map-file order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.order.iter().filter_map(move |nid| self.nodes.get(nid))
    }

    /// Client NIDs, in map-file order (or node-list order after
    /// [`Topology::replace_clients_from`]).
    pub fn clients(&self) -> &[Nid] {
        &self.clients
    }

    /// Whether `nid` is in the client set.
    pub fn is_client(&self, nid: Nid) -> bool {
        self.client_set.contains(&nid)
    }

    /// Number of nodes in the map.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Replace the client set with the NIDs listed in `path`, one per line.
    pub fn replace_clients_from(&mut self, path: &Path) -> Result<(), PlannerError> {
        let input = fs::read_to_string(path).map_err(|source| PlannerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut clients = Vec::new();
        for (idx, raw) in input.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let nid: Nid = line.parse().map_err(|_| PlannerError::ParseLine {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: format!("invalid NID {line:?}"),
            })?;
            clients.push(nid);
        }
        log::info!("{}: client set replaced, {} NIDs", path.display(), clients.len());
        self.client_set = clients.iter().copied().collect();
        self.clients = clients;
        Ok(())
    }

    /// Remove the given NIDs from the client set, keeping the existing order.
    pub fn remove_failed(&mut self, failed: &[Nid]) {
        let failed: HashSet<Nid> = failed.iter().copied().collect();
        self.clients.retain(|nid| !failed.contains(nid));
        self.client_set = self.clients.iter().copied().collect();
        log::info!("{} clients after removing failed nodes", self.clients.len());
    }
}
