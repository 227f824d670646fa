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

use crate::cost::CostIndex;
use crate::groups::GROUP_MODULES;
use crate::ostmap::OstLayout;
use crate::output::{
    write_debug, write_lnet2ost, write_ost2lnet, write_router_map, write_rtr2client, write_shell,
    ShellSpec,
};
use crate::placement::{Placement, Scheduler};
use crate::router::RouterTable;
use crate::test::temp_path;
use crate::topology::Topology;
use crate::types::{Partition, PartitionChoice, Strategy};
use itertools::Itertools;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

fn nine_router_world() -> (Topology, RouterTable, OstLayout, CostIndex) {
    let mut map = String::new();
    for g in 0..9 {
        map.push_str(&format!(
            "{} {}n1 service {} 0 {}\n",
            1000 + g,
            GROUP_MODULES[g][0],
            (g * 2) % 25,
            g % 24
        ));
    }
    for i in 0..9u32 {
        map.push_str(&format!(
            "{} c0-0c0s{}n{} compute {} 0 {}\n",
            1 + i,
            i / 4,
            i % 4,
            (i * 2) % 25,
            i % 24
        ));
    }
    let topo = Topology::parse(&map, "world.map").unwrap();
    let routers = RouterTable::classify(&topo).unwrap();
    let fgr: String = (0..9)
        .map(|g| format!("{} o2ib{}:{}\n", 1 + g, 219 + g, 1000 + g))
        .collect();
    let costs = CostIndex::parse(&fgr, Path::new("routing.map"), &topo).unwrap();
    (topo, routers, OstLayout::new(), costs)
}

#[test]
fn lnet2ost_records_are_blank_line_separated() {
    let layout = OstLayout::new();
    let path = temp_path("lnet2ost.map");
    write_lnet2ost(&path, &layout).unwrap();
    let content = fs::read_to_string(&path).unwrap();

    let first = format!("201 {}", layout.osts(201).iter().join(" "));
    assert!(content.starts_with(&first));
    assert!(content.ends_with("\n\n"));
    let records: Vec<&str> = content.split("\n\n").filter(|r| !r.is_empty()).collect();
    assert_eq!(records.len(), 36);
    assert!(records[35].starts_with("236 "));
}

#[test]
fn ost2lnet_lists_every_ost() {
    let layout = OstLayout::new();
    let path = temp_path("ost2lnet.map");
    write_ost2lnet(&path, &layout).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2016);
    assert_eq!(lines[0], "0 201");
    assert_eq!(lines[1008], "1008 219");
}

#[test]
fn router_map_format() {
    let (_, routers, _, _) = nine_router_world();
    let path = temp_path("atlas2-rtr.map");
    write_router_map(&path, &routers, Partition::Atlas2).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 9);
    assert_eq!(lines[0], "atlas2 219 c7-2c2s0n1 0 0 0");

    let empty = temp_path("atlas1-rtr.map");
    write_router_map(&empty, &routers, Partition::Atlas1).unwrap();
    assert_eq!(fs::read_to_string(&empty).unwrap(), "");
}

#[test]
fn rtr2client_is_sorted_by_nid() {
    let (_, _, _, costs) = nine_router_world();
    let path = temp_path("rtr2client.map");
    write_rtr2client(&path, &costs).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    let expected: String = (0..9).map(|g| format!("{} 1\n", 1000 + g)).collect();
    assert_eq!(content, expected);
}

#[test]
fn hybrid_shell_pins_files_to_osts() {
    let (_, routers, layout, costs) = nine_router_world();
    let ranks = Scheduler::new(&routers, &costs, &layout)
        .run(&routers.eligible(PartitionChoice::Atlas2), 9)
        .unwrap();
    let placement = Placement::Hybrid(ranks.clone());
    let spec = ShellSpec {
        partition: PartitionChoice::Atlas2,
        strategy: Strategy::Hybrid,
        numranks: 9,
        username: "fwang2",
        iorbin: "/usr/bin/IOR.posix",
        stripesize: "1m",
    };
    let path = temp_path("atlas2_hybrid_9.sh");
    write_shell(&path, &spec, &placement, &routers).unwrap();
    let content = fs::read_to_string(&path).unwrap();

    assert!(content.starts_with("#!/bin/bash\n"));
    assert!(content.contains("#PBS -N ior-atlas2-placement\n"));
    assert!(content.contains("rm -rf /lustre/atlas2/test/fwang2/"));
    assert!(content.contains("mkdir -p /lustre/atlas2/test/fwang2/"));
    // one setstripe per rank, OSTs reported modulo the partition size
    let stripes: Vec<&str> = content
        .lines()
        .filter(|l| l.starts_with("lfs setstripe"))
        .collect();
    assert_eq!(stripes.len(), 9);
    let first_ost = ranks[0].ost % 1008;
    assert!(stripes[0].starts_with(&format!("lfs setstripe -c 1 -i {first_ost} ")));
    assert!(stripes[0].ends_with("/file.00000000"));

    let aprun = content.lines().last().unwrap();
    assert!(aprun.starts_with("aprun -n 9 -N 1 -L 1,2,3,4,5,6,7,8,9 "));
    assert!(aprun.contains(" -t 1m "));
    assert!(aprun.ends_with("/file"));
}

#[test]
fn random_shell_skips_setstripe() {
    let (_, routers, _, _) = nine_router_world();
    let placement = Placement::Random(vec![3, 1, 4]);
    let spec = ShellSpec {
        partition: PartitionChoice::Atlas1,
        strategy: Strategy::Random,
        numranks: 3,
        username: "fwang2",
        iorbin: "/usr/bin/IOR.posix",
        stripesize: "1m",
    };
    let path = temp_path("atlas1_random_3.sh");
    write_shell(&path, &spec, &placement, &routers).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert!(!content.contains("lfs setstripe"));
    assert!(content.contains("-L 3,1,4 "));
    assert!(content.contains("#PBS -N ior-atlas1-placement\n"));
}

#[test]
fn both_partition_shell_uses_dual_paths() {
    let (_, routers, layout, costs) = nine_router_world();
    let ranks = Scheduler::new(&routers, &costs, &layout)
        .run(&routers.eligible(PartitionChoice::Atlas), 9)
        .unwrap();
    let placement = Placement::Hybrid(ranks);
    let spec = ShellSpec {
        partition: PartitionChoice::Atlas,
        strategy: Strategy::Hybrid,
        numranks: 9,
        username: "fwang2",
        iorbin: "/usr/bin/IOR.posix",
        stripesize: "1m",
    };
    let path = temp_path("atlas_hybrid_9.sh");
    write_shell(&path, &spec, &placement, &routers).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("rm -rf /lustre/atlas1/test/fwang2/"));
    assert!(content.contains("rm -rf /lustre/atlas2/test/fwang2/"));
    let aprun = content.lines().last().unwrap();
    assert!(aprun.contains("/file@/lustre/atlas2/"));
}

#[test]
fn debug_report_groups_clients_by_router() {
    let (topo, routers, layout, costs) = nine_router_world();
    let ranks = Scheduler::new(&routers, &costs, &layout)
        .run(&routers.eligible(PartitionChoice::Atlas2), 9)
        .unwrap();
    let path = temp_path("atlas2_9.debug");
    write_debug(&path, &ranks, &topo, &routers).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("Router 1000: (0, 0, 0)\n"));
    assert!(content.contains("\t Client: 1: (0, 0, 0), cost="));
    assert_eq!(content.lines().filter(|l| l.starts_with("Router")).count(), 9);
}
