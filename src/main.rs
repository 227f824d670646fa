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

//! The `fgr` command-line front end.

use clap::{Args, Parser, Subcommand};
use fgrplan::output::{self, ShellSpec};
use fgrplan::prelude::*;
use fgrplan::routegen;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser, Debug)]
#[command(
    name = "fgr",
    version,
    about = "Fine-grained-routing placement planner"
)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct MapArgs {
    /// Machine map file
    #[arg(long, default_value = "titan.map")]
    map: PathBuf,

    /// Routing map; input for mapinfo and placement, output for rtgens
    /// and rtgenp
    #[arg(long, default_value = "routing.map")]
    fgrfile: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the lnet2ost, ost2lnet, router and rtr2client map files
    Mapinfo {
        #[command(flatten)]
        files: MapArgs,
    },
    /// Generate an IOR launch shell for N ranks
    Placement {
        #[command(flatten)]
        files: MapArgs,

        /// Number of ranks to place
        #[arg(long, default_value_t = 1008)]
        numranks: usize,

        /// Partition to place on
        #[arg(long, default_value = "atlas2", value_parser = PartitionChoice::parse)]
        partition: PartitionChoice,

        /// Placement strategy
        #[arg(long, default_value = "hybrid", value_parser = Strategy::parse)]
        strategy: Strategy,

        /// IOR transfer size
        #[arg(long, default_value = "1m")]
        stripesize: String,

        /// User owning the Lustre test directories
        #[arg(long, default_value = "fwang2")]
        username: String,

        /// Path of the IOR binary
        #[arg(
            long,
            default_value = "/lustre/atlas2/test/fwang2/iotests/ior-test/IOR.posix"
        )]
        iorbin: String,

        /// Failed compute NIDs to exclude
        #[arg(long, num_args = 1.., value_name = "NID")]
        failed: Vec<Nid>,

        /// Node-list file replacing the compute set
        #[arg(long)]
        nodefile: Option<PathBuf>,

        /// Fixed seed for the random strategy (system entropy if absent)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Generate the routing map serially
    Rtgens {
        #[command(flatten)]
        files: MapArgs,
    },
    /// Generate the routing map with one worker per cabinet row
    Rtgenp {
        #[command(flatten)]
        files: MapArgs,
    },
    /// Print the 36-LNET routing table of one compute NID
    Nidinfo {
        /// The NID to look up
        nid: Nid,

        #[command(flatten)]
        files: MapArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
    if let Err(err) = run(cli.command) {
        log::error!("{err}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<(), PlannerError> {
    match command {
        Command::Mapinfo { files } => cmd_mapinfo(&files),
        Command::Placement {
            files,
            numranks,
            partition,
            strategy,
            stripesize,
            username,
            iorbin,
            failed,
            nodefile,
            seed,
        } => cmd_placement(
            &files, numranks, partition, strategy, &stripesize, &username, &iorbin, &failed,
            nodefile.as_deref(), seed,
        ),
        Command::Rtgens { files } => cmd_rtgen(&files, false),
        Command::Rtgenp { files } => cmd_rtgen(&files, true),
        Command::Nidinfo { nid, files } => cmd_nidinfo(nid, &files),
    }
}

fn cmd_mapinfo(files: &MapArgs) -> Result<(), PlannerError> {
    let topo = Topology::load(&files.map)?;
    let routers = RouterTable::classify(&topo)?;
    let layout = OstLayout::new();
    let costs = CostIndex::from_fgr_file(&files.fgrfile, &topo)?;
    output::write_lnet2ost(Path::new("lnet2ost.map"), &layout)?;
    output::write_ost2lnet(Path::new("ost2lnet.map"), &layout)?;
    output::write_router_map(Path::new("atlas1-rtr.map"), &routers, Partition::Atlas1)?;
    output::write_router_map(Path::new("atlas2-rtr.map"), &routers, Partition::Atlas2)?;
    output::write_rtr2client(Path::new("rtr2client.map"), &costs)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_placement(
    files: &MapArgs,
    numranks: usize,
    partition: PartitionChoice,
    strategy: Strategy,
    stripesize: &str,
    username: &str,
    iorbin: &str,
    failed: &[Nid],
    nodefile: Option<&Path>,
    seed: Option<u64>,
) -> Result<(), PlannerError> {
    let mut topo = Topology::load(&files.map)?;
    if let Some(nodefile) = nodefile {
        topo.replace_clients_from(nodefile)?;
    }
    if !failed.is_empty() {
        topo.remove_failed(failed);
    }
    let routers = RouterTable::classify(&topo)?;
    let layout = OstLayout::new();
    let placement = match strategy {
        Strategy::Hybrid => {
            let costs = CostIndex::from_fgr_file(&files.fgrfile, &topo)?;
            let eligible = routers.eligible(partition);
            let ranks = Scheduler::new(&routers, &costs, &layout).run(&eligible, numranks)?;
            Placement::Hybrid(ranks)
        }
        Strategy::Random => Placement::Random(random_sample(&topo, numranks, seed)?),
    };
    let spec = ShellSpec {
        partition,
        strategy,
        numranks,
        username,
        iorbin,
        stripesize,
    };
    let shell = format!("{partition}_{strategy}_{numranks}.sh");
    output::write_shell(Path::new(&shell), &spec, &placement, &routers)?;
    if let Placement::Hybrid(ranks) = &placement {
        let report = format!("{partition}_{numranks}.debug");
        output::write_debug(Path::new(&report), ranks, &topo, &routers)?;
    }
    Ok(())
}

fn cmd_rtgen(files: &MapArgs, parallel: bool) -> Result<(), PlannerError> {
    let topo = Topology::load(&files.map)?;
    if parallel {
        routegen::generate_parallel(&topo, &files.fgrfile)
    } else {
        let table = RouteTable::generate(&topo)?;
        output::write_routing_map(&files.fgrfile, &topo, &table)
    }
}

fn cmd_nidinfo(nid: Nid, files: &MapArgs) -> Result<(), PlannerError> {
    let topo = Topology::load(&files.map)?;
    let node = topo.node(nid)?;
    let entries = for_client(&topo, nid)?;
    println!("{} {}", nid, node.cname);
    for entry in &entries {
        let router = topo.node(entry.router)?;
        println!(
            "  o2ib{}: {} {} gni {}",
            entry.lnet, entry.router, router.cname, entry.gni
        );
    }
    Ok(())
}
