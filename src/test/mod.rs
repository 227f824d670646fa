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

//! Synthetic topologies and helpers shared by the test modules.

use crate::groups::{GROUP_MODULES, SUBGROUP_SIZE};
use crate::topology::Topology;
use crate::types::Nid;
use std::path::PathBuf;

/// First NID used for router interface nodes; computes get small NIDs.
pub const ROUTER_NID_BASE: Nid = 10_000;

/// Torus Y of subgroup `k` routers. Spacing the four subgroup anchors by 4
/// makes the Y-window rule match exactly one subgroup for every client Y.
pub fn subgroup_y(k: usize) -> u32 {
    (4 * k) as u32
}

/// Torus X of module `j` of group `g`.
pub fn module_x(g: usize, j: usize) -> u32 {
    ((2 * j + g) % 25) as u32
}

/// NID of interface `n` of module `j` of group `g`.
pub fn router_nid(g: usize, j: usize, n: usize) -> Nid {
    ROUTER_NID_BASE + ((g * 12 + j) * 4 + n) as Nid
}

/// Map lines for all 432 router interface nodes, with coordinates laid out
/// by [`subgroup_y`] and [`module_x`].
pub fn router_lines() -> String {
    let mut out = String::new();
    for (g, modules) in GROUP_MODULES.iter().enumerate() {
        for (j, module) in modules.iter().enumerate() {
            let k = j / SUBGROUP_SIZE;
            let (x, y, z) = (module_x(g, j), subgroup_y(k), ((g + j) % 24) as u32);
            for n in 0..4 {
                out.push_str(&format!(
                    "{} {}n{} service {} {} {}\n",
                    router_nid(g, j, n),
                    module,
                    n,
                    x,
                    y,
                    z
                ));
            }
        }
    }
    out
}

/// A topology of all router interface nodes plus the given compute nodes,
/// passed as `(nid, cname, x, y, z)`.
pub fn synthetic_topology(computes: &[(Nid, &str, u32, u32, u32)]) -> Topology {
    let mut map = router_lines();
    for (nid, cname, x, y, z) in computes {
        map.push_str(&format!("{nid} {cname} compute {x} {y} {z}\n"));
    }
    Topology::parse(&map, "synthetic.map").unwrap()
}

/// A scratch file path under the system temp directory.
pub fn temp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("fgrplan-tests");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(format!("{}-{}", std::process::id(), name))
}

mod test_groups;
mod test_output;
mod test_routegen;
