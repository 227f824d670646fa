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

//! Writers for every artifact the planner puts on disk.
//!
//! The formats are fixed contracts parsed byte-wise by existing consumers.
//! In particular the double newline between `lnet2ost.map` records and the
//! bias baked into the reported costs must not change.

use crate::cost::CostIndex;
use crate::groups;
use crate::ostmap::{OstLayout, NUM_OSTS, OSTS_PER_PARTITION};
use crate::placement::{Placement, Rank};
use crate::router::RouterTable;
use crate::routegen::{RouteEntry, RouteTable};
use crate::topology::Topology;
use crate::types::{Nid, Partition, PartitionChoice, PlannerError, Strategy};
use chrono::Local;
use itertools::Itertools;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// What the IOR shell writer needs to know about the run.
#[derive(Debug, Clone)]
pub struct ShellSpec<'a> {
    /// Partition selector of the run.
    pub partition: PartitionChoice,
    /// Placement strategy of the run.
    pub strategy: Strategy,
    /// Number of ranks to launch.
    pub numranks: usize,
    /// User owning the Lustre test directories.
    pub username: &'a str,
    /// Path of the IOR binary on the machine.
    pub iorbin: &'a str,
    /// IOR transfer size, for example `1m`.
    pub stripesize: &'a str,
}

fn create(path: &Path) -> Result<BufWriter<File>, PlannerError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| PlannerError::OutputIo {
            path: path.to_path_buf(),
            source,
        })
}

fn write_err(path: &Path) -> impl Fn(std::io::Error) -> PlannerError + '_ {
    move |source| PlannerError::OutputIo {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `lnet2ost.map`: one record per LNET, records separated by a
/// blank line.
pub fn write_lnet2ost(path: &Path, layout: &OstLayout) -> Result<(), PlannerError> {
    let err = write_err(path);
    let mut w = create(path)?;
    for lnet in groups::all_lnets() {
        let osts = layout.osts(lnet).iter().join(" ");
        writeln!(w, "{lnet} {osts}\n").map_err(&err)?;
    }
    w.flush().map_err(&err)?;
    log::info!("generated {}", path.display());
    Ok(())
}

/// Write `ost2lnet.map`: `<ost> <lnet>` per line, ascending OST.
pub fn write_ost2lnet(path: &Path, layout: &OstLayout) -> Result<(), PlannerError> {
    let err = write_err(path);
    let mut w = create(path)?;
    for ost in 0..NUM_OSTS as u16 {
        writeln!(w, "{} {}", ost, layout.lnet_of(ost)).map_err(&err)?;
    }
    w.flush().map_err(&err)?;
    log::info!("generated {}", path.display());
    Ok(())
}

/// Write one partition's router map: `<partition> <lnet> <name> <x> <y> <z>`
/// per router, in classification order.
pub fn write_router_map(
    path: &Path,
    routers: &RouterTable,
    partition: Partition,
) -> Result<(), PlannerError> {
    let err = write_err(path);
    let mut w = create(path)?;
    for &rid in routers.of_partition(partition) {
        let r = routers.get(rid);
        writeln!(
            w,
            "{} {} {} {} {} {}",
            r.partition,
            r.lnet,
            r.name(),
            r.x,
            r.y,
            r.z
        )
        .map_err(&err)?;
    }
    w.flush().map_err(&err)?;
    log::info!("generated {}", path.display());
    Ok(())
}

/// Write `rtr2client.map`: `<router_nid> <client count>` per router,
/// ascending NID.
pub fn write_rtr2client(path: &Path, costs: &CostIndex) -> Result<(), PlannerError> {
    let err = write_err(path);
    let mut w = create(path)?;
    let mut loads: Vec<(Nid, usize)> = costs.router_loads().collect();
    loads.sort_unstable_by_key(|&(nid, _)| nid);
    for (nid, count) in loads {
        writeln!(w, "{nid} {count}").map_err(&err)?;
    }
    w.flush().map_err(&err)?;
    log::info!("generated {}", path.display());
    Ok(())
}

/// One routing-map line: `<nid> o2ib<lnet>:<router> ...`.
pub fn routing_map_line(nid: Nid, entries: &[RouteEntry]) -> String {
    let pairs = entries
        .iter()
        .map(|e| format!("o2ib{}:{}", e.lnet, e.router))
        .join(" ");
    format!("{nid} {pairs}")
}

/// Write the routing map for every client, in client order.
pub fn write_routing_map(
    path: &Path,
    topo: &Topology,
    table: &RouteTable,
) -> Result<(), PlannerError> {
    let err = write_err(path);
    let mut w = create(path)?;
    for &nid in topo.clients() {
        let entries = table.get(nid).ok_or_else(|| {
            PlannerError::PlannerBug(format!("client {nid} missing from route table"))
        })?;
        writeln!(w, "{}", routing_map_line(nid, entries)).map_err(&err)?;
    }
    w.flush().map_err(&err)?;
    log::info!("generated {}", path.display());
    Ok(())
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d.%H%M%S").to_string()
}

fn lustre_dir(partition: &str, username: &str, ts: &str) -> String {
    format!("/lustre/{partition}/test/{username}/{ts}")
}

/// Write the PBS batch script launching IOR over the placed ranks.
///
/// For the hybrid strategy every rank gets an `lfs setstripe` line pinning
/// its file to its OST; the random strategy only pins the node list.
pub fn write_shell(
    path: &Path,
    spec: &ShellSpec<'_>,
    placement: &Placement,
    routers: &RouterTable,
) -> Result<(), PlannerError> {
    let err = write_err(path);
    let ts = timestamp();
    let mut w = create(path)?;
    writeln!(w, "#!/bin/bash").map_err(&err)?;
    writeln!(w, "#PBS -N ior-{}-placement", spec.partition).map_err(&err)?;
    writeln!(w, "#PBS -j oe").map_err(&err)?;
    writeln!(w, "#PBS -q batch").map_err(&err)?;
    writeln!(w, "#PBS -V").map_err(&err)?;
    writeln!(w, "#PBS -A STF008").map_err(&err)?;
    writeln!(w, "#PBS -l walltime=01:00:00").map_err(&err)?;
    writeln!(w, "#PBS -l nodes=18688").map_err(&err)?;
    writeln!(w, r#"[[ "$PBS_JOBID" ]] || PBS_JOBID=$(date +%s)"#).map_err(&err)?;
    writeln!(w, r#"[[ "$PBS_O_WORKDIR" ]] && cd $PBS_O_WORKDIR"#).map_err(&err)?;

    let dirs: Vec<String> = match spec.partition {
        PartitionChoice::Atlas => vec![
            lustre_dir("atlas1", spec.username, &ts),
            lustre_dir("atlas2", spec.username, &ts),
        ],
        choice => vec![lustre_dir(choice.as_str(), spec.username, &ts)],
    };
    for dir in &dirs {
        writeln!(w, "rm -rf {dir}").map_err(&err)?;
    }
    for dir in &dirs {
        writeln!(w, "mkdir -p {dir}").map_err(&err)?;
    }

    if let Placement::Hybrid(ranks) = placement {
        for (idx, rank) in ranks.iter().take(spec.numranks).enumerate() {
            let dir = match spec.partition {
                PartitionChoice::Atlas => lustre_dir(
                    routers.get(rank.router).partition.as_str(),
                    spec.username,
                    &ts,
                ),
                choice => lustre_dir(choice.as_str(), spec.username, &ts),
            };
            writeln!(
                w,
                "lfs setstripe -c 1 -i {} {}/file.{:08}",
                rank.ost % OSTS_PER_PARTITION,
                dir,
                idx
            )
            .map_err(&err)?;
        }
    }

    let opath = match spec.partition {
        PartitionChoice::Atlas => format!(
            "{}/file@{}/file",
            lustre_dir("atlas1", spec.username, &ts),
            lustre_dir("atlas2", spec.username, &ts)
        ),
        choice => format!("{}/file", lustre_dir(choice.as_str(), spec.username, &ts)),
    };
    let clients = placement.clients();
    writeln!(
        w,
        "aprun -n {} -N 1 -L {} {} -a POSIX -b 32g -e -E -F -i 1 -k -t {} -vv -w -D 30 -o {}",
        spec.numranks,
        clients.iter().join(","),
        spec.iorbin,
        spec.stripesize,
        opath
    )
    .map_err(&err)?;
    w.flush().map_err(&err)?;
    log::info!("generated {}", path.display());
    Ok(())
}

/// Write the per-router placement report: every router with its selected
/// clients, coordinates, and costs, in selection order.
pub fn write_debug(
    path: &Path,
    ranks: &[Rank],
    topo: &Topology,
    routers: &RouterTable,
) -> Result<(), PlannerError> {
    let err = write_err(path);
    let mut order = Vec::new();
    let mut by_router: HashMap<Nid, Vec<&Rank>> = HashMap::new();
    for rank in ranks {
        let nid = routers.get(rank.router).nid;
        by_router
            .entry(nid)
            .or_insert_with(|| {
                order.push(nid);
                Vec::new()
            })
            .push(rank);
    }
    let mut w = create(path)?;
    for nid in order {
        let Some(router) = routers.by_nid(nid) else {
            continue;
        };
        writeln!(w, "Router {}: ({}, {}, {})", nid, router.x, router.y, router.z)
            .map_err(&err)?;
        for rank in &by_router[&nid] {
            let client = topo.node(rank.client)?;
            writeln!(
                w,
                "\t Client: {}: ({}, {}, {}), cost={}",
                rank.client, client.x, client.y, client.z, rank.cost
            )
            .map_err(&err)?;
        }
    }
    w.flush().map_err(&err)?;
    log::info!("generated {}", path.display());
    Ok(())
}
