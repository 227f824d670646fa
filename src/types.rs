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

//! Module containing all type definitions shared across the planner.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Numeric identifier of a node on the internal network.
pub type Nid = u32;

/// Router identification: an index into the router arena
/// ([`crate::router::RouterTable`]).
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct RouterId(pub(crate) u32);

impl RouterId {
    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Cabinet-style structured node name, `c<col>-<row>c<cage>s<slot>[n<n>]`.
///
/// Router modules are named without the trailing `n<n>` part; the four
/// interface nodes of a module carry `n0` through `n3`.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub struct Cname {
    /// Cabinet column.
    pub col: u8,
    /// Cabinet row.
    pub row: u8,
    /// Cage within the cabinet.
    pub cage: u8,
    /// Slot within the cage.
    pub slot: u8,
    /// Node within the slot, absent for module-level names.
    pub n: Option<u8>,
}

impl Cname {
    /// Parse a cname. Both node names (`c0-2c1s7n0`) and module names
    /// (`c0-2c1s7`) are accepted.
    pub fn parse(s: &str) -> Result<Self, PlannerError> {
        fn number(s: &str) -> Option<(u8, &str)> {
            let end = s
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(s.len());
            let value = s[..end].parse().ok()?;
            Some((value, &s[end..]))
        }
        let malformed = || PlannerError::MalformedCname(s.to_string());
        let rest = s.strip_prefix('c').ok_or_else(malformed)?;
        let (col, rest) = number(rest).ok_or_else(malformed)?;
        let rest = rest.strip_prefix('-').ok_or_else(malformed)?;
        let (row, rest) = number(rest).ok_or_else(malformed)?;
        let rest = rest.strip_prefix('c').ok_or_else(malformed)?;
        let (cage, rest) = number(rest).ok_or_else(malformed)?;
        let rest = rest.strip_prefix('s').ok_or_else(malformed)?;
        let (slot, rest) = number(rest).ok_or_else(malformed)?;
        let n = if rest.is_empty() {
            None
        } else {
            let rest = rest.strip_prefix('n').ok_or_else(malformed)?;
            let (n, tail) = number(rest).ok_or_else(malformed)?;
            if !tail.is_empty() {
                return Err(malformed());
            }
            Some(n)
        };
        Ok(Cname {
            col,
            row,
            cage,
            slot,
            n,
        })
    }

    /// The module-level name, with the node part stripped.
    pub fn module(self) -> Cname {
        Cname { n: None, ..self }
    }

    /// The same name with node part `n`.
    pub fn with_n(self, n: u8) -> Cname {
        Cname { n: Some(n), ..self }
    }
}

impl FromStr for Cname {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Cname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}-{}c{}s{}", self.col, self.row, self.cage, self.slot)?;
        if let Some(n) = self.n {
            write!(f, "n{n}")?;
        }
        Ok(())
    }
}

/// One of the four interfaces of a router module.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum Interface {
    /// Interface `n0`, serving atlas1.
    N0,
    /// Interface `n1`, serving atlas2.
    N1,
    /// Interface `n2`, serving atlas1.
    N2,
    /// Interface `n3`, serving atlas2.
    N3,
}

impl Interface {
    /// All four interfaces, in node order.
    pub const ALL: [Interface; 4] = [
        Interface::N0,
        Interface::N1,
        Interface::N2,
        Interface::N3,
    ];

    /// The interface backed by node `n` of a module, if `n < 4`.
    pub fn from_n(n: u8) -> Option<Interface> {
        match n {
            0 => Some(Interface::N0),
            1 => Some(Interface::N1),
            2 => Some(Interface::N2),
            3 => Some(Interface::N3),
            _ => None,
        }
    }

    /// The node index of this interface within its module.
    pub fn index(self) -> u8 {
        match self {
            Interface::N0 => 0,
            Interface::N1 => 1,
            Interface::N2 => 2,
            Interface::N3 => 3,
        }
    }

    /// The Lustre partition this interface is cabled to.
    pub fn partition(self) -> Partition {
        match self {
            Interface::N0 | Interface::N2 => Partition::Atlas1,
            Interface::N1 | Interface::N3 => Partition::Atlas2,
        }
    }

    /// LNET offset from the group base: `n0 -> 0`, `n2 -> +9`, `n1 -> +18`,
    /// `n3 -> +27`.
    pub fn lnet_step(self) -> u16 {
        match self {
            Interface::N0 => 0,
            Interface::N2 => 9,
            Interface::N1 => 18,
            Interface::N3 => 27,
        }
    }

    /// Interface label as it appears in node names.
    pub fn as_str(self) -> &'static str {
        match self {
            Interface::N0 => "n0",
            Interface::N1 => "n1",
            Interface::N2 => "n2",
            Interface::N3 => "n3",
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two Lustre partitions.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum Partition {
    /// The atlas1 partition, OSTs `[0, 1008)`.
    Atlas1,
    /// The atlas2 partition, OSTs `[1008, 2016)`.
    Atlas2,
}

impl Partition {
    /// Partition name as used in paths and map files.
    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Atlas1 => "atlas1",
            Partition::Atlas2 => "atlas2",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition selector on the command line; `atlas` addresses both.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum PartitionChoice {
    /// Place on atlas1 only.
    Atlas1,
    /// Place on atlas2 only.
    Atlas2,
    /// Place on both partitions.
    Atlas,
}

impl PartitionChoice {
    /// Parse a partition selector.
    pub fn parse(s: &str) -> Result<Self, PlannerError> {
        match s {
            "atlas1" => Ok(PartitionChoice::Atlas1),
            "atlas2" => Ok(PartitionChoice::Atlas2),
            "atlas" => Ok(PartitionChoice::Atlas),
            _ => Err(PlannerError::UnknownPartition(s.to_string())),
        }
    }

    /// Whether routers of `partition` are eligible under this selector.
    pub fn includes(self, partition: Partition) -> bool {
        match self {
            PartitionChoice::Atlas1 => partition == Partition::Atlas1,
            PartitionChoice::Atlas2 => partition == Partition::Atlas2,
            PartitionChoice::Atlas => true,
        }
    }

    /// Selector name as used in output file names.
    pub fn as_str(self) -> &'static str {
        match self {
            PartitionChoice::Atlas1 => "atlas1",
            PartitionChoice::Atlas2 => "atlas2",
            PartitionChoice::Atlas => "atlas",
        }
    }
}

impl FromStr for PartitionChoice {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PartitionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rank placement strategy.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Strategy {
    /// Uniform random client sample, no OST control.
    Random,
    /// Cost-driven placement, round-robin across routers.
    Hybrid,
}

impl Strategy {
    /// Parse a strategy name.
    pub fn parse(s: &str) -> Result<Self, PlannerError> {
        match s {
            "random" => Ok(Strategy::Random),
            "hybrid" => Ok(Strategy::Hybrid),
            _ => Err(PlannerError::UnknownStrategy(s.to_string())),
        }
    }

    /// Strategy name as used in output file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Random => "random",
            Strategy::Hybrid => "hybrid",
        }
    }
}

impl FromStr for Strategy {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any error raised while planning a placement.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Reading an input file failed.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Writing an output file failed.
    #[error("cannot write {path}: {source}")]
    OutputIo {
        /// The file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A line of an input file does not follow its format.
    #[error("{path}:{line}: {reason}")]
    ParseLine {
        /// The offending file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },
    /// A name does not follow the `c<col>-<row>c<cage>s<slot>[n<n>]` scheme.
    #[error("malformed cname {0:?}")]
    MalformedCname(String),
    /// A router-module node carries an interface outside `n0..n3`.
    #[error("unrecognized router interface {0:?}")]
    UnknownInterface(String),
    /// A router node required by the built-in group table is absent.
    #[error("router node {0} is not in the topology map")]
    MissingRouterNode(String),
    /// A NID was referenced that the topology map does not contain.
    #[error("NID {0} is not in the topology map")]
    UnknownNid(Nid),
    /// The requested partition name is not known.
    #[error("unknown partition {0:?}")]
    UnknownPartition(String),
    /// The requested placement strategy is not known.
    #[error("unknown strategy {0:?}")]
    UnknownStrategy(String),
    /// No subgroup of a router group matches the Y-window rule for a node.
    #[error("no router for node {cname} in group {group}")]
    NoRouterForNode {
        /// The compute node that could not be routed.
        cname: String,
        /// The router group letter.
        group: char,
    },
    /// More ranks were requested than clients are available.
    #[error("requested {requested} ranks but only {available} clients are available")]
    NotEnoughClients {
        /// Ranks requested on the command line.
        requested: usize,
        /// Clients left after failed-node and node-list filtering.
        available: usize,
    },
    /// A router ran out of candidate clients with ranks still unassigned.
    #[error("router {router} has no clients left ({selected} of {requested} ranks assigned)")]
    SchedulerExhausted {
        /// NID of the drained router.
        router: Nid,
        /// Ranks assigned so far.
        selected: usize,
        /// Ranks requested.
        requested: usize,
    },
    /// The same client was selected for two ranks.
    #[error("client {0} was selected more than once")]
    DuplicateSelection(Nid),
    /// An internal invariant was violated. This is a bug in the planner.
    #[error("planner bug: {0}")]
    PlannerBug(String),
}
