//! gitlab-sweeper CLI: delete outdated job artifacts; use --dry-run to only report them.

use anyhow::Result;
use clap::Parser;
use gitlab_sweeper::engine::arg_parser::Cli;
use gitlab_sweeper::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
