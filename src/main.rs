mod analysis;
mod config;
mod engine;
mod field;
mod forager;
mod manager;
mod model;
mod stats;

use crate::engine::{Brush, PaintCommand};
use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Create,

    Resume {
        #[arg(long)]
        run_idx: usize,
    },

    Paint {
        #[arg(long)]
        run_idx: usize,
        #[arg(long, value_enum)]
        brush: Brush,
        #[arg(long)]
        col: usize,
        #[arg(long)]
        row: usize,
        #[arg(long, default_value_t = 0)]
        radius: usize,
        #[arg(long, default_value_t = 100)]
        amount: u32,
    },

    Reset {
        #[arg(long)]
        run_idx: usize,
    },

    Analyze,

    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.sim_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Create => mgr.run_simulation(None)?,
        Command::Resume { run_idx } => mgr.run_simulation(Some(run_idx))?,
        Command::Paint {
            run_idx,
            brush,
            col,
            row,
            radius,
            amount,
        } => {
            let cmd = PaintCommand {
                brush,
                col,
                row,
                radius,
                amount,
            };
            mgr.paint_run(run_idx, &cmd)?
        }
        Command::Reset { run_idx } => mgr.reset_run(run_idx)?,
        Command::Analyze => mgr.run_analysis()?,
        Command::Clean => mgr.clean_sim()?,
    }

    Ok(())
}
