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

//! The arithmetic OST/LNET layout.
//!
//! Which LNET serves which OST is pure arithmetic on the OST index: the
//! atlas1 half `[0, 1008)` maps into LNETs `[201, 219)`, and atlas2
//! repeats the same layout shifted by 1008 OSTs and 18 LNETs. Every LNET
//! ends up with exactly 56 OSTs. Computed once at startup, no I/O.

use crate::groups::{LNET_BASE, NUM_LNETS};
use std::collections::VecDeque;

/// Total number of OSTs across both partitions.
pub const NUM_OSTS: usize = 2016;

/// OSTs per partition; atlas2 OSTs are `[1008, 2016)`.
pub const OSTS_PER_PARTITION: u16 = 1008;

/// Every LNET serves exactly this many OSTs.
pub const OSTS_PER_LNET: usize = 56;

/// Bidirectional OST/LNET layout.
#[derive(Debug, Clone)]
pub struct OstLayout {
    lnet2ost: Vec<Vec<u16>>,
    ost2lnet: Vec<u16>,
}

impl OstLayout {
    /// Populate both directions of the mapping.
    pub fn new() -> Self {
        let mut lnet2ost = vec![Vec::with_capacity(OSTS_PER_LNET); NUM_LNETS];
        let mut ost2lnet = vec![0u16; NUM_OSTS];
        for ost in 0..OSTS_PER_PARTITION {
            let base = ost % 144 / 72 * 9;
            let offset = (ost + 4) / 8 % 9;
            let lnet = LNET_BASE + base + offset;
            lnet2ost[(lnet - LNET_BASE) as usize].push(ost);
            ost2lnet[ost as usize] = lnet;

            // atlas2 mirrors the layout 1008 OSTs and 18 LNETs up
            let (ost, lnet) = (ost + OSTS_PER_PARTITION, lnet + 18);
            lnet2ost[(lnet - LNET_BASE) as usize].push(ost);
            ost2lnet[ost as usize] = lnet;
        }
        OstLayout { lnet2ost, ost2lnet }
    }

    /// The LNET serving `ost`. `ost` must be below [`NUM_OSTS`].
    pub fn lnet_of(&self, ost: u16) -> u16 {
        self.ost2lnet[ost as usize]
    }

    /// The OSTs of `lnet`, in ascending order. `lnet` must be in
    /// `[201, 237)`.
    pub fn osts(&self, lnet: u16) -> &[u16] {
        &self.lnet2ost[(lnet - LNET_BASE) as usize]
    }

    /// A working copy of the per-LNET rings for the scheduler, indexed by
    /// `lnet - LNET_BASE`.
    pub(crate) fn rings(&self) -> Vec<VecDeque<u16>> {
        self.lnet2ost
            .iter()
            .map(|osts| osts.iter().copied().collect())
            .collect()
    }
}

impl Default for OstLayout {
    fn default() -> Self {
        Self::new()
    }
}
