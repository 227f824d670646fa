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

//! Primary-router selection and routing-map generation.
//!
//! For every compute node and every router group, one module of the group
//! is "primary": subgroups are tried in order and the first one whose
//! Y-window contains the client wins, then the X-nearest module of that
//! subgroup is picked. The chosen module binds four LNETs at once, one per
//! interface, so nine picks fix all 36 LNETs of a client.
//!
//! Generation is embarrassingly parallel over clients. The parallel driver
//! fans out one rayon task per cabinet row; each task writes a private
//! partial file and the driver concatenates them in ascending row order,
//! so the result is deterministic.

use crate::cost::dist;
use crate::groups::{self, NUM_GROUPS, NUM_SUBGROUPS, SUBGROUP_SIZE};
use crate::output;
use crate::topology::{Node, Topology, TORUS_ROWS, TORUS_X};
use crate::types::{Cname, Interface, Nid, PlannerError};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One LNET binding of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    /// The LNET this binding serves.
    pub lnet: u16,
    /// NID of the primary router interface node.
    pub router: Nid,
    /// Torus-side network id of the return path.
    pub gni: u16,
}

/// The routing table: every client's 36 LNET bindings.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: HashMap<Nid, Vec<RouteEntry>>,
}

impl RouteTable {
    /// Compute the routing table for every client in the topology.
    pub fn generate(topo: &Topology) -> Result<Self, PlannerError> {
        let mut entries = HashMap::with_capacity(topo.clients().len());
        for &nid in topo.clients() {
            entries.insert(nid, for_client(topo, nid)?);
        }
        log::info!("routed {} clients", entries.len());
        Ok(RouteTable { entries })
    }

    /// The bindings of one client, in ascending LNET order.
    pub fn get(&self, nid: Nid) -> Option<&[RouteEntry]> {
        self.entries.get(&nid).map(Vec::as_slice)
    }

    /// Number of routed clients.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The chosen primary module of one group for one client.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PrimaryPick {
    /// Index of the matching subgroup.
    pub subgroup: usize,
    /// Position of the primary within the unsorted subgroup.
    pub rindex: usize,
    /// Module name of the primary.
    pub module: &'static str,
}

impl PrimaryPick {
    /// The GNI of the return path, unique per (subgroup, member) slot of a
    /// group.
    pub(crate) fn gni(&self) -> u16 {
        (100 + SUBGROUP_SIZE * self.subgroup + 1 + self.rindex) as u16
    }
}

/// The `n0` node anchoring a module's torus position.
fn anchor<'t>(topo: &'t Topology, module: &str) -> Result<&'t Node, PlannerError> {
    let cname = Cname::parse(module)?.with_n(Interface::N0.index());
    let nid = topo
        .nid_of(&cname)
        .ok_or_else(|| PlannerError::MissingRouterNode(cname.to_string()))?;
    topo.node(nid)
}

/// The subgroups of `group` whose Y-window contains torus coordinate `cy`.
///
/// A subgroup matches when its anchor row `ry` lies within `[cy-2, cy+1]`
/// on the Y ring; the group constants space the four anchors so that
/// exactly one subgroup matches any `cy`.
pub(crate) fn subgroup_matches(
    topo: &Topology,
    cy: u32,
    group: usize,
) -> Result<Vec<usize>, PlannerError> {
    let mut matching = Vec::new();
    for k in 0..NUM_SUBGROUPS {
        let first = groups::GROUP_MODULES[group][k * SUBGROUP_SIZE];
        let ry = anchor(topo, first)?.y;
        let delta = (cy as i64 - ry as i64 + 24).rem_euclid(16) - 8;
        if (-1..=2).contains(&delta) {
            matching.push(k);
        }
    }
    Ok(matching)
}

/// Pick the primary module of `group` for `client`: first subgroup to pass
/// the Y-window rule, then X-nearest member, ties broken by list order.
pub(crate) fn select_primary(
    topo: &Topology,
    client: &Node,
    group: usize,
) -> Result<PrimaryPick, PlannerError> {
    let matching = subgroup_matches(topo, client.y, group)?;
    let Some(&subgroup) = matching.first() else {
        return Err(PlannerError::NoRouterForNode {
            cname: client.cname.to_string(),
            group: groups::group_letter(group),
        });
    };
    let members =
        &groups::GROUP_MODULES[group][subgroup * SUBGROUP_SIZE..(subgroup + 1) * SUBGROUP_SIZE];
    let mut order: Vec<(usize, u32)> = Vec::with_capacity(SUBGROUP_SIZE);
    for (i, module) in members.iter().enumerate() {
        order.push((i, dist(client.x, anchor(topo, module)?.x, TORUS_X)));
    }
    order.sort_by_key(|&(_, d)| d);
    let rindex = order[0].0;
    Ok(PrimaryPick {
        subgroup,
        rindex,
        module: members[rindex],
    })
}

/// The 36 LNET bindings of one client: one primary module per group, four
/// interfaces per module, sorted by LNET.
pub fn for_client(topo: &Topology, nid: Nid) -> Result<Vec<RouteEntry>, PlannerError> {
    let client = topo.node(nid)?;
    let mut entries = Vec::with_capacity(groups::NUM_LNETS);
    for group in 0..NUM_GROUPS {
        let pick = select_primary(topo, client, group)?;
        let module = Cname::parse(pick.module)?;
        let gni = pick.gni();
        for interface in Interface::ALL {
            let name = module.with_n(interface.index());
            let router = topo
                .nid_of(&name)
                .ok_or_else(|| PlannerError::MissingRouterNode(name.to_string()))?;
            entries.push(RouteEntry {
                lnet: groups::lnet_of(group, interface),
                router,
                gni,
            });
        }
    }
    entries.sort_by_key(|e| e.lnet);
    Ok(entries)
}

/// Generate the routing map with one worker per cabinet row. Every worker
/// writes a private partial file; partials are concatenated into `out` in
/// ascending row order and removed afterwards.
pub fn generate_parallel(topo: &Topology, out: &Path) -> Result<(), PlannerError> {
    let partials = (0..TORUS_ROWS)
        .into_par_iter()
        .map(|row| write_row(topo, out, row))
        .collect::<Result<Vec<_>, PlannerError>>()?;
    let write_err = |source| PlannerError::OutputIo {
        path: out.to_path_buf(),
        source,
    };
    let mut sink = BufWriter::new(File::create(out).map_err(write_err)?);
    for partial in &partials {
        let mut part = File::open(partial).map_err(|source| PlannerError::Io {
            path: partial.clone(),
            source,
        })?;
        io::copy(&mut part, &mut sink).map_err(write_err)?;
    }
    sink.flush().map_err(write_err)?;
    for partial in &partials {
        let _ = fs::remove_file(partial);
    }
    log::info!(
        "concatenated {} row files into {}",
        partials.len(),
        out.display()
    );
    Ok(())
}

/// Route the clients of one cabinet row into `<out>.row<row>`.
fn write_row(topo: &Topology, out: &Path, row: u32) -> Result<PathBuf, PlannerError> {
    let mut name = out.as_os_str().to_os_string();
    name.push(format!(".row{row}"));
    let path = PathBuf::from(name);
    let mut buf = String::new();
    let mut count = 0usize;
    for &nid in topo.clients() {
        let node = topo.node(nid)?;
        if node.cname.row as u32 != row {
            continue;
        }
        buf.push_str(&output::routing_map_line(nid, &for_client(topo, nid)?));
        buf.push('\n');
        count += 1;
    }
    fs::write(&path, buf).map_err(|source| PlannerError::OutputIo {
        path: path.clone(),
        source,
    })?;
    log::debug!("row {row}: routed {count} clients");
    Ok(path)
}
