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

#![deny(missing_docs, missing_debug_implementations)]

//! # FgrPlan
//!
//! A placement planner for machines whose compute fabric is a 3D torus and
//! whose Lustre file system is reached through a fixed set of in-fabric
//! routers ("fine-grained routing"). Given the physical machine map, the
//! planner decides which router is primary for each of the 36 object
//! networks of every compute node, and selects clients for a benchmark run
//! such that torus cost is minimal and load spreads evenly over routers
//! and object storage targets.
//!
//! ## Main concepts
//!
//! The [`topology::Topology`] is the parsed machine map; everything else
//! borrows it read-only. [`router::RouterTable`] classifies the router
//! interfaces the built-in group table ([`groups`]) names.
//! [`routegen`] picks primary routers and produces the routing map, and
//! [`cost::CostIndex`] turns a routing map back into the cost indices the
//! [`placement::Scheduler`] consumes. [`ostmap::OstLayout`] is the pure
//! arithmetic layout tying LNETs to OSTs. The file formats all live in
//! [`output`].
//!
//! ## Example
//!
//! ```
//! use fgrplan::prelude::*;
//!
//! let layout = OstLayout::new();
//! assert_eq!(layout.lnet_of(0), 201);
//! assert_eq!(layout.osts(201).len(), 56);
//!
//! // wrap-around torus distance: 0 and 24 are neighbors on a ring of 25
//! assert_eq!(dist(0, 24, 25), 1);
//! ```

pub mod cost;
pub mod groups;
pub mod ostmap;
pub mod output;
pub mod placement;
pub mod prelude;
pub mod routegen;
pub mod router;
pub mod topology;
pub mod types;

#[cfg(test)]
mod test;
