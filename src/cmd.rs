//! Command implementations for the CLI interface.
//!
//! Each handler checks the configuration it needs before touching the
//! network, fetches through a rate-limited client, prints its report to
//! stdout and optionally pushes a summary to the webhook.

use chrono::{Local, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::classify::{classify, classify_task, Snapshot};
use crate::client::BaseClient;
use crate::config::Config;
use crate::error::{AppError, FetchError};
use crate::fetcher::fetch_all;
use crate::fields::CategoryBy;
use crate::notify::deliver;
use crate::report::*;
use crate::rollup::{category_rollup, weekly_rollup, CategoryRule, DEFAULT_WBS_SEPARATOR};
use crate::store::RecordStore;
use crate::task::{active_customers, Customer, Task};
use crate::throttle::RateGate;
use crate::writeback::{write_category_table, write_task_rates};

#[derive(Subcommand)]
pub enum Commands {
    /// Report overdue tasks and unstarted tasks due soon.
    Overdue {
        /// Send an alert to the webhook when anything is overdue or urgent.
        #[arg(long)]
        notify: bool,
        /// Print a JSON summary instead of the console report.
        #[arg(long)]
        json: bool,
    },

    /// Weekly progress report across active customers.
    Weekly {
        /// Send the weekly summary to the webhook.
        #[arg(long)]
        notify: bool,
    },

    /// Completion rate per category.
    Categories {
        /// Group by the category field or by the WBS number's leading segment.
        #[arg(long, value_enum, default_value_t = CategoryBy::Field)]
        by: CategoryBy,
        /// Separator between WBS segments.
        #[arg(long, default_value_t = DEFAULT_WBS_SEPARATOR)]
        separator: char,
        /// Write the computed figures back into the base.
        #[arg(long)]
        write_back: bool,
    },

    /// Show one task and how it is classified today.
    View {
        /// Record id of the task.
        id: String,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn connect(config: &Config) -> Result<RateGate<BaseClient>, AppError> {
    let client = BaseClient::new(config)?;
    Ok(RateGate::new(client, config.request_interval))
}

fn today_label() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn load_tasks(store: &RateGate<BaseClient>, table: &str) -> Result<Vec<Task>, AppError> {
    let records = fetch_all(store, table)?;
    Ok(records.iter().map(Task::from).collect())
}

fn load_customers(store: &RateGate<BaseClient>, table: &str) -> Result<Vec<Customer>, AppError> {
    let records = fetch_all(store, table)?;
    Ok(records.iter().map(Customer::from).collect())
}

/// Overdue / urgent / warning check.
pub fn cmd_overdue(config: &Config, notify: bool, json: bool) -> Result<(), AppError> {
    config.require_base()?;
    let task_table = config.require_task_table()?;
    let customer_table = config.require_customer_table()?;

    let store = connect(config)?;
    let tasks = load_tasks(&store, task_table)?;
    let customers = load_customers(&store, customer_table)?;
    log::info!("loaded {} tasks and {} customers", tasks.len(), customers.len());

    let snapshot = Snapshot::today();
    let report = classify(&snapshot, &tasks);
    let directory = CustomerDirectory::new(&customers);

    if json {
        let summary = AlertJson::new(Utc::now(), &report, &directory);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", format_urgency_console(&report, &directory));
    }

    if notify {
        if report.needs_alert() {
            let message =
                format_alert_message(&today_label(), &report, &directory, &config.base_url());
            deliver(config.webhook_url.clone(), &message);
        } else {
            log::info!("nothing overdue or urgent, no alert sent");
        }
    }
    Ok(())
}

/// Weekly progress report.
pub fn cmd_weekly(config: &Config, notify: bool) -> Result<(), AppError> {
    config.require_base()?;
    let task_table = config.require_task_table()?;
    let customer_table = config.require_customer_table()?;

    let store = connect(config)?;
    let tasks = load_tasks(&store, task_table)?;
    let customer_records = fetch_all(&store, customer_table)?;
    let all_customers: Vec<Customer> = customer_records.iter().map(Customer::from).collect();
    let active = active_customers(&customer_records);
    log::info!("{} of {} customers active", active.len(), all_customers.len());

    let snapshot = Snapshot::today();
    let weekly = weekly_rollup(&snapshot, &tasks, &active);
    let directory = CustomerDirectory::new(&all_customers);

    println!("{}", format_weekly_console(&weekly, &directory));

    if notify {
        let message = format_weekly_message(&today_label(), &weekly, &directory, &config.base_url());
        deliver(config.webhook_url.clone(), &message);
    }
    Ok(())
}

/// Category completion rollup, optionally written back into the base.
pub fn cmd_categories(
    config: &Config,
    by: CategoryBy,
    separator: char,
    write_back: bool,
) -> Result<(), AppError> {
    config.require_base()?;
    let task_table = config.require_task_table()?;
    // Checked up front so a missing table never costs a fetch.
    let category_table = match (by, write_back) {
        (CategoryBy::Wbs, true) => Some(config.require_category_table()?),
        _ => None,
    };

    let rule = match by {
        CategoryBy::Field => CategoryRule::Field,
        CategoryBy::Wbs => CategoryRule::WbsPrefix { separator },
    };

    let store = connect(config)?;
    let tasks = load_tasks(&store, task_table)?;
    let rollup = category_rollup(&tasks, rule);

    if rollup.is_empty() {
        println!("No categorised tasks.");
    } else {
        println!("{}", format_category_table(&rollup));
    }

    if !write_back {
        return Ok(());
    }
    let written = match category_table {
        Some(table) => {
            let categories = fetch_all(&store, table)?;
            write_category_table(&store, table, &categories, &rollup)?
        }
        None => write_task_rates(&store, task_table, &tasks, &rollup, rule)?,
    };
    println!("✓ Updated {written} record(s)");
    Ok(())
}

/// Show a single task with its customer and urgency.
pub fn cmd_view(config: &Config, id: &str) -> Result<(), AppError> {
    config.require_base()?;
    let task_table = config.require_task_table()?;

    let store = connect(config)?;
    let get = |table: &str, record_id: &str| {
        store
            .get_record(table, record_id)
            .map_err(|source| FetchError { table: table.to_string(), source })
    };

    let task = Task::from(&get(task_table, id)?);
    let customer = match (task.customer_id(), config.customer_table.as_deref()) {
        (Some(customer_id), Some(table)) => Some(Customer::from(&get(table, customer_id)?)),
        _ => None,
    };
    let directory = CustomerDirectory::new(customer.as_slice());
    let urgency = classify_task(&Snapshot::today(), &task);

    println!("{}", format_task_detail(&task, &directory, urgency));
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
