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

use crate::groups::{
    all_lnets, group_letter, lnet_of, module_group, GROUP_MODULES, LNET_BASE, NUM_GROUPS,
};
use crate::router::RouterTable;
use crate::test::{router_nid, synthetic_topology};
use crate::topology::Topology;
use crate::types::{Cname, Interface, Partition, PartitionChoice, PlannerError};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

#[test]
fn group_table_shape() {
    let mut seen = HashSet::new();
    for modules in &GROUP_MODULES {
        for name in modules {
            let cname = Cname::parse(name).unwrap();
            assert_eq!(cname.n, None, "{name} is not a module name");
            assert!(seen.insert(*name), "{name} appears twice");
        }
    }
    assert_eq!(seen.len(), 108);
}

#[test]
fn module_lookup() {
    assert_eq!(module_group("c7-2c2s0"), Some((0, 0)));
    assert_eq!(module_group("c10-1c1s2"), Some((8, 11)));
    assert_eq!(module_group("c0-0c0s0"), None);
    assert_eq!(group_letter(0), 'A');
    assert_eq!(group_letter(8), 'I');
}

#[test]
fn lnet_derivation_covers_all_lnets_once() {
    let mut seen = HashSet::new();
    for group in 0..NUM_GROUPS {
        for interface in Interface::ALL {
            let lnet = lnet_of(group, interface);
            let step = match interface {
                Interface::N0 => 0,
                Interface::N2 => 9,
                Interface::N1 => 18,
                Interface::N3 => 27,
            };
            assert_eq!(lnet, LNET_BASE + step + group as u16);
            assert!(seen.insert(lnet));
        }
    }
    assert_eq!(seen, all_lnets().collect::<HashSet<u16>>());
}

#[test]
fn classify_finds_every_interface() {
    let topo = synthetic_topology(&[]);
    let routers = RouterTable::classify(&topo).unwrap();
    assert_eq!(routers.len(), 432);
    assert_eq!(routers.of_partition(Partition::Atlas1).len(), 216);
    assert_eq!(routers.of_partition(Partition::Atlas2).len(), 216);
    assert_eq!(routers.eligible(PartitionChoice::Atlas).len(), 432);

    for router in routers.iter() {
        assert_eq!(router.partition, router.interface.partition());
        assert_eq!(router.lnet, lnet_of(router.group, router.interface));
    }

    // c7-2c2s0 is the first module of group A; its n0 serves LNET 201
    let first = routers.by_nid(router_nid(0, 0, 0)).unwrap();
    assert_eq!(first.name(), "c7-2c2s0n0");
    assert_eq!(first.group, 0);
    assert_eq!(first.lnet, 201);
    assert_eq!(first.partition, Partition::Atlas1);
}

#[test]
fn classify_rejects_unknown_interface() {
    let map = "42 c7-2c2s0n7 service 0 0 0\n";
    let topo = Topology::parse(map, "bad.map").unwrap();
    assert!(matches!(
        RouterTable::classify(&topo),
        Err(PlannerError::UnknownInterface(_))
    ));
}

#[test]
fn classification_order_follows_the_map() {
    let topo = synthetic_topology(&[]);
    let routers = RouterTable::classify(&topo).unwrap();
    let atlas2: Vec<_> = routers
        .of_partition(Partition::Atlas2)
        .iter()
        .map(|&id| routers.get(id).nid)
        .collect();
    // n1 before n3 within a module, modules in group-major order
    assert_eq!(atlas2[0], router_nid(0, 0, 1));
    assert_eq!(atlas2[1], router_nid(0, 0, 3));
    assert_eq!(atlas2[2], router_nid(0, 1, 1));
}
