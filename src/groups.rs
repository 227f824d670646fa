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

//! The built-in router-group table.
//!
//! The machine carries 108 router modules organized in 9 groups of 12. The
//! membership is cabling, not configuration, so the table is compiled in.
//! Each group splits into four subgroups of three modules, in list order;
//! the subgroup boundaries matter to the primary-router selection in
//! [`crate::routegen`].

use crate::types::Interface;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Number of router groups (A through I).
pub const NUM_GROUPS: usize = 9;

/// Router modules per group.
pub const MODULES_PER_GROUP: usize = 12;

/// Modules per subgroup.
pub const SUBGROUP_SIZE: usize = 3;

/// Subgroups per group.
pub const NUM_SUBGROUPS: usize = 4;

/// First LNET; LNETs span `[LNET_BASE, LNET_BASE + NUM_LNETS)`.
pub const LNET_BASE: u16 = 201;

/// One LNET per (group, interface) combination.
pub const NUM_LNETS: usize = 36;

/// The 108 router modules, grouped: `GROUP_MODULES[group][position]`.
pub const GROUP_MODULES: [[&str; MODULES_PER_GROUP]; NUM_GROUPS] = [
    // group A
    [
        "c7-2c2s0", "c23-2c1s7", "c10-2c0s0", "c3-6c0s2", "c19-6c2s2", "c14-6c1s5",
        "c7-5c2s5", "c23-5c1s2", "c10-5c0s5", "c3-1c1s4", "c19-1c0s3", "c14-1c2s3",
    ],
    // group B
    [
        "c5-0c0s5", "c19-0c1s2", "c12-0c2s5", "c1-4c2s7", "c15-4c0s7", "c16-4c1s0",
        "c5-7c1s5", "c19-7c2s2", "c12-7c0s2", "c1-3c2s0", "c15-3c0s0", "c16-3c1s7",
    ],
    // group C
    [
        "c5-0c2s1", "c19-0c0s1", "c12-0c1s6", "c1-4c1s4", "c15-4c2s3", "c16-4c0s3",
        "c5-7c2s6", "c19-7c0s6", "c12-7c1s1", "c1-3c0s4", "c15-3c1s3", "c16-3c2s4",
    ],
    // group D
    [
        "c13-0c1s5", "c22-0c2s2", "c4-0c0s2", "c9-4c0s4", "c23-4c1s3", "c8-4c2s4",
        "c13-7c1s0", "c22-7c2s7", "c4-7c0s7", "c9-3c2s5", "c23-3c0s5", "c8-3c1s2",
    ],
    // group E
    [
        "c13-0c2s6", "c22-0c0s6", "c4-0c1s1", "c9-4c2s0", "c23-4c0s0", "c8-4c1s7",
        "c13-7c0s3", "c22-7c1s4", "c4-7c2s3", "c9-3c1s6", "c23-3c2s1", "c8-3c0s1",
    ],
    // group F
    [
        "c3-2c1s0", "c21-2c0s7", "c14-2c2s7", "c0-6c1s6", "c17-6c0s1", "c18-6c2s1",
        "c3-5c0s4", "c21-5c2s4", "c14-5c1s3", "c0-1c2s2", "c17-1c1s5", "c18-1c0s2",
    ],
    // group G
    [
        "c3-2c2s3", "c21-2c1s4", "c14-2c0s3", "c0-6c0s5", "c17-6c2s5", "c18-6c1s2",
        "c3-5c1s7", "c21-5c0s0", "c14-5c2s0", "c0-1c1s1", "c17-1c0s6", "c18-1c2s6",
    ],
    // group H
    [
        "c11-2c0s6", "c20-2c2s6", "c6-2c1s1", "c7-6c0s0", "c24-6c2s0", "c10-6c1s7",
        "c11-5c2s3", "c20-5c1s4", "c6-5c0s3", "c7-1c1s6", "c24-1c0s1", "c10-1c2s1",
    ],
    // group I
    [
        "c11-2c1s5", "c20-2c0s2", "c6-2c2s2", "c7-6c2s4", "c24-6c1s3", "c10-6c0s4",
        "c11-5c1s0", "c20-5c0s7", "c6-5c2s7", "c7-1c0s5", "c24-1c2s5", "c10-1c1s2",
    ],
];

lazy_static! {
    static ref MODULE_INDEX: HashMap<&'static str, (usize, usize)> = {
        let mut index = HashMap::with_capacity(NUM_GROUPS * MODULES_PER_GROUP);
        for (group, modules) in GROUP_MODULES.iter().enumerate() {
            for (position, name) in modules.iter().enumerate() {
                index.insert(*name, (group, position));
            }
        }
        index
    };
}

/// Group letter (`'A'` for group 0).
pub fn group_letter(group: usize) -> char {
    (b'A' + group as u8) as char
}

/// Locate a router module by name: `(group index, position in group)`.
pub fn module_group(name: &str) -> Option<(usize, usize)> {
    MODULE_INDEX.get(name).copied()
}

/// The LNET served by `interface` of any module in `group`.
pub fn lnet_of(group: usize, interface: Interface) -> u16 {
    LNET_BASE + interface.lnet_step() + (group % NUM_GROUPS) as u16
}

/// All LNETs in ascending order.
pub fn all_lnets() -> impl Iterator<Item = u16> {
    LNET_BASE..LNET_BASE + NUM_LNETS as u16
}
