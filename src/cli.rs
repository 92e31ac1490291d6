use clap::Parser;

use crate::cmd::Commands;

/// Task health reports over a Lark / Feishu base.
/// Settings are read from environment variables (LARK_APP_ID, TASK_TABLE_ID, ...).
#[derive(Parser)]
#[command(name = "base-report", version, about = "Overdue alerts and progress reports for a task base")]
pub struct Cli {
    /// Log debug output (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
