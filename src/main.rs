//! # base-report - task health reports for a Lark / Feishu base
//!
//! Reads a task table and a customer table from a Lark (Feishu) base over the
//! open API, and turns them into:
//!
//! - **Overdue alerts**: open tasks past due, plus unstarted tasks due within
//!   3 days (urgent) or 7 days (warning).
//! - **Weekly progress**: completion per active customer, overdue counts, what
//!   was finished this week and what falls due next week.
//! - **Category completion**: done/total per category or WBS prefix,
//!   optionally written back into the base.
//!
//! Reports are printed to stdout; `--notify` also posts a summary to a bot
//! webhook.
//!
//! ## Quick Start
//!
//! ```bash
//! export LARK_APP_ID=cli_xxx LARK_APP_SECRET=xxx
//! export LARK_BASE_APP_TOKEN=bascnXXX TASK_TABLE_ID=tblXXX CUSTOMER_TABLE_ID=tblYYY
//!
//! base-report overdue
//! base-report overdue --notify
//! base-report weekly --notify
//! base-report categories --by wbs --write-back
//! ```
//!
//! Set `RUST_LOG` or pass `--verbose` for diagnostics on stderr.

use clap::Parser;

pub mod classify;
pub mod cli;
pub mod client;
pub mod cmd;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod fields;
pub mod notify;
pub mod report;
pub mod rollup;
pub mod store;
pub mod task;
pub mod throttle;
pub mod writeback;

use cli::Cli;
use cmd::*;
use config::Config;

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::default()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    // Completions need no configuration
    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return;
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Overdue { notify, json } => cmd_overdue(&config, notify, json),
        Commands::Weekly { notify } => cmd_weekly(&config, notify),
        Commands::Categories { by, separator, write_back } => {
            cmd_categories(&config, by, separator, write_back)
        }
        Commands::View { id } => cmd_view(&config, &id),
        Commands::Completions { .. } => unreachable!("completions handled above"),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
