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

//! Re-exports of everything needed to drive the planner.

pub use crate::cost::{dist, route_cost, CostIndex};
pub use crate::ostmap::OstLayout;
pub use crate::placement::{random_sample, Placement, Rank, Scheduler};
pub use crate::routegen::{for_client, RouteEntry, RouteTable};
pub use crate::router::{Router, RouterTable};
pub use crate::topology::{Node, NodeType, Topology};
pub use crate::types::{
    Cname, Interface, Nid, Partition, PartitionChoice, PlannerError, RouterId, Strategy,
};
