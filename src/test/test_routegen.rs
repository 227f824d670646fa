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

use crate::groups::{all_lnets, GROUP_MODULES, NUM_GROUPS};
use crate::output::{routing_map_line, write_routing_map};
use crate::routegen::{for_client, generate_parallel, select_primary, subgroup_matches, RouteTable};
use crate::test::{router_nid, synthetic_topology, temp_path};
use crate::topology::Topology;
use crate::types::PlannerError;
use pretty_assertions::assert_eq;
use std::fs;

#[test]
fn every_client_gets_all_36_lnets() {
    let topo = synthetic_topology(&[
        (1, "c0-0c0s0n0", 0, 0, 0),
        (2, "c0-0c0s1n0", 12, 7, 3),
        (3, "c0-0c0s2n0", 24, 15, 23),
    ]);
    let table = RouteTable::generate(&topo).unwrap();
    for nid in [1, 2, 3] {
        let entries = table.get(nid).unwrap();
        assert_eq!(entries.len(), 36);
        let lnets: Vec<u16> = entries.iter().map(|e| e.lnet).collect();
        assert_eq!(lnets, all_lnets().collect::<Vec<u16>>());
    }
}

#[test]
fn exactly_one_subgroup_matches_every_y() {
    let topo = synthetic_topology(&[]);
    for group in 0..NUM_GROUPS {
        for cy in 0..16 {
            let matching = subgroup_matches(&topo, cy, group).unwrap();
            assert_eq!(matching.len(), 1, "group {group}, cy {cy}");
        }
    }
}

#[test]
fn first_subgroup_first_module_yields_gni_101() {
    let topo = synthetic_topology(&[(1, "c0-0c0s0n0", 0, 0, 0)]);
    let entries = for_client(&topo, 1).unwrap();
    assert!(entries.iter().all(|e| e.gni == 101));

    // group A resolves to its first module, all four interfaces
    assert_eq!(entries[0].lnet, 201);
    assert_eq!(entries[0].router, router_nid(0, 0, 0));
    let n2 = entries.iter().find(|e| e.lnet == 210).unwrap();
    assert_eq!(n2.router, router_nid(0, 0, 2));
    let n1 = entries.iter().find(|e| e.lnet == 219).unwrap();
    assert_eq!(n1.router, router_nid(0, 0, 1));
    let n3 = entries.iter().find(|e| e.lnet == 228).unwrap();
    assert_eq!(n3.router, router_nid(0, 0, 3));
}

#[test]
fn x_distance_picks_the_primary_with_stable_ties() {
    // subgroup 0 of group A sits at x = 0, 2, 4
    let topo = synthetic_topology(&[
        (1, "c0-0c0s0n0", 3, 0, 0),
        (2, "c0-0c0s0n1", 1, 0, 0),
    ]);
    let pick = select_primary(&topo, topo.node(1).unwrap(), 0).unwrap();
    assert_eq!(pick.subgroup, 0);
    assert_eq!(pick.rindex, 1);
    assert_eq!(pick.gni(), 102);
    assert_eq!(pick.module, GROUP_MODULES[0][1]);

    // x = 1 is equidistant to the modules at 0 and 2; list order wins
    let pick = select_primary(&topo, topo.node(2).unwrap(), 0).unwrap();
    assert_eq!(pick.rindex, 0);
    assert_eq!(pick.gni(), 101);
}

#[test]
fn y_window_selects_the_matching_subgroup() {
    // cy = 5 falls into the window of the subgroup anchored at ry = 4
    let topo = synthetic_topology(&[(1, "c0-0c0s0n0", 8, 5, 0)]);
    let pick = select_primary(&topo, topo.node(1).unwrap(), 0).unwrap();
    assert_eq!(pick.subgroup, 1);
    assert_eq!(pick.rindex, 1);
    assert_eq!(pick.gni(), 105);
    assert_eq!(pick.module, GROUP_MODULES[0][4]);
}

#[test]
fn generation_is_deterministic() {
    let computes: Vec<(u32, String)> = (0..8)
        .map(|row| (100 + row, format!("c0-{row}c0s0n0")))
        .collect();
    let computes: Vec<(u32, &str, u32, u32, u32)> = computes
        .iter()
        .map(|(nid, cname)| (*nid, cname.as_str(), *nid % 25, *nid % 16, *nid % 24))
        .collect();
    let topo = synthetic_topology(&computes);

    let lines = |table: &RouteTable| -> String {
        topo.clients()
            .iter()
            .map(|&nid| routing_map_line(nid, table.get(nid).unwrap()))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let first = lines(&RouteTable::generate(&topo).unwrap());
    let second = lines(&RouteTable::generate(&topo).unwrap());
    assert_eq!(first, second);
}

#[test]
fn parallel_generation_matches_serial() {
    // one client per cabinet row, listed in row order like the real map
    let computes: Vec<(u32, String)> = (0..8)
        .map(|row| (100 + row, format!("c0-{row}c0s0n0")))
        .collect();
    let computes: Vec<(u32, &str, u32, u32, u32)> = computes
        .iter()
        .enumerate()
        .map(|(i, (nid, cname))| (*nid, cname.as_str(), (i as u32 * 3) % 25, i as u32, 0))
        .collect();
    let topo = synthetic_topology(&computes);

    let serial = temp_path("serial-routing.map");
    let table = RouteTable::generate(&topo).unwrap();
    write_routing_map(&serial, &topo, &table).unwrap();

    let parallel = temp_path("parallel-routing.map");
    generate_parallel(&topo, &parallel).unwrap();

    assert_eq!(
        fs::read_to_string(&serial).unwrap(),
        fs::read_to_string(&parallel).unwrap()
    );
}

#[test]
fn missing_router_nodes_are_fatal() {
    let topo = Topology::parse("1 c0-0c0s0n0 compute 0 0 0\n", "bare.map").unwrap();
    assert!(matches!(
        for_client(&topo, 1),
        Err(PlannerError::MissingRouterNode(_))
    ));
}
