//! Top-level entry point: validates the CLI into [`crate::config::Options`],
//! constructs the [`crate::runner::Runner`], and drives it to completion on
//! a multi-threaded Tokio runtime.

use crate::commands::base::Cli;
use crate::config::Options;
use crate::error::{Result, RunnerError};
use crate::runner::Runner;

pub fn execute(cli: Cli) -> Result<()> {
    let options = Options::build(&cli)?;
    let runner = Runner::new(options)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| RunnerError::resolver_init_error(format!("failed to start async runtime: {e}")))?;

    rt.block_on(runner.run())
}
