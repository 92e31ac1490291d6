//! Report text rendering.
//!
//! Every function here builds a `String` from already-computed results and
//! has no side effects. Console reports list everything; webhook messages
//! group by customer and cap each group's detail lines.

use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::classify::{DueSoonTask, OverdueTask, Urgency, UrgencyReport};
use crate::fields::format_task_status;
use crate::rollup::{CategoryRollup, WeeklyRollup};
use crate::task::{Customer, Task};

/// Detail lines shown per group in a webhook message.
pub const DETAIL_CAP: usize = 5;

const RULE: &str = "========================================";

pub const UNASSIGNED: &str = "Unassigned";
pub const UNKNOWN_CUSTOMER: &str = "Unknown customer";

/// Customer id to display name, built once per run.
#[derive(Debug, Default)]
pub struct CustomerDirectory {
    names: HashMap<String, String>,
}

impl CustomerDirectory {
    pub fn new(customers: &[Customer]) -> Self {
        CustomerDirectory {
            names: customers
                .iter()
                .map(|c| (c.id.clone(), c.company.clone()))
                .collect(),
        }
    }

    /// Display name of a task's customer.
    pub fn name_for<'a>(&'a self, task: &Task) -> &'a str {
        match task.customer_id() {
            None => UNASSIGNED,
            Some(id) => self.names.get(id).map(String::as_str).unwrap_or(UNKNOWN_CUSTOMER),
        }
    }
}

/// Format an instant as a local calendar date.
pub fn format_date(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

/// A ten-cell bar, one filled cell per ten percent (rounded).
pub fn progress_bar(rate: f64) -> String {
    let filled = ((rate * 10.0).round() as usize).min(10);
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

fn wbs(task: &Task) -> &str {
    task.wbs.as_deref().unwrap_or("-")
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{RULE}");
}

/// Console report for the overdue check.
pub fn format_urgency_console(report: &UrgencyReport<'_>, directory: &CustomerDirectory) -> String {
    let mut out = String::new();

    section(&mut out, &format!("[Overdue] {}", report.overdue.len()));
    for item in &report.overdue {
        let t = item.task;
        let _ = writeln!(out, "  ❌ [{}] {}", wbs(t), t.name);
        let _ = writeln!(
            out,
            "     Customer: {} | {} day(s) overdue | {} | Owner: {}",
            directory.name_for(t),
            item.days_overdue,
            format_task_status(t.status),
            t.assignee.as_deref().unwrap_or("-")
        );
    }

    let due_soon = [
        ("[Urgent: due within 3 days, not started]", "⚠️ ", &report.urgent),
        ("[Warning: due within 7 days, not started]", "📋", &report.warning),
    ];
    for (title, marker, items) in due_soon {
        out.push('\n');
        section(&mut out, &format!("{title} {}", items.len()));
        for item in items.iter() {
            let t = item.task;
            let _ = writeln!(out, "  {marker} [{}] {}", wbs(t), t.name);
            let _ = writeln!(
                out,
                "     Customer: {} | {} day(s) left | Owner: {}",
                directory.name_for(t),
                item.days_remaining,
                t.assignee.as_deref().unwrap_or("-")
            );
        }
    }

    out.push('\n');
    section(&mut out, "[Summary]");
    let _ = writeln!(out, "  Overdue:      {}", report.overdue.len());
    let _ = writeln!(out, "  Urgent (3d):  {}", report.urgent.len());
    let _ = writeln!(out, "  Warning (7d): {}", report.warning.len());
    out
}

/// Group items by customer name, groups in first-seen order.
fn group_by_customer<'r, T, F>(
    items: &'r [T],
    directory: &'r CustomerDirectory,
    task_of: F,
) -> Vec<(&'r str, Vec<&'r T>)>
where
    F: Fn(&T) -> &Task,
{
    let mut groups: Vec<(&str, Vec<&T>)> = Vec::new();
    for item in items {
        let name = directory.name_for(task_of(item));
        match groups.iter_mut().find(|(n, _)| *n == name) {
            Some((_, members)) => members.push(item),
            None => groups.push((name, vec![item])),
        }
    }
    groups
}

fn push_capped<T>(out: &mut String, items: &[&T], line: impl Fn(&T) -> String) {
    for item in items.iter().take(DETAIL_CAP) {
        let _ = writeln!(out, "• {}", line(*item));
    }
    if items.len() > DETAIL_CAP {
        let _ = writeln!(out, "  …and {} more", items.len() - DETAIL_CAP);
    }
}

/// Webhook message for the overdue check: overdue and urgent tasks grouped
/// by customer.
pub fn format_alert_message(
    date: &str,
    report: &UrgencyReport<'_>,
    directory: &CustomerDirectory,
    base_url: &str,
) -> String {
    let mut out = format!("📊 Task alert ({date})\n\n");

    if !report.overdue.is_empty() {
        let _ = writeln!(out, "🔴 Overdue: {}", report.overdue.len());
        for (customer, tasks) in group_by_customer(&report.overdue, directory, |o: &OverdueTask| o.task) {
            let _ = writeln!(out, "\n{customer} ({})", tasks.len());
            push_capped(&mut out, &tasks, |o: &OverdueTask| {
                format!("[{}] {} ({} day(s) overdue)", wbs(o.task), o.task.name, o.days_overdue)
            });
        }
    }

    if !report.urgent.is_empty() {
        let _ = writeln!(out, "\n🟡 Urgent (within 3 days): {}", report.urgent.len());
        for (customer, tasks) in group_by_customer(&report.urgent, directory, |d: &DueSoonTask| d.task) {
            let _ = writeln!(out, "\n{customer} ({})", tasks.len());
            push_capped(&mut out, &tasks, |d: &DueSoonTask| {
                format!("[{}] {} ({} day(s) left)", wbs(d.task), d.task.name, d.days_remaining)
            });
        }
    }

    let _ = write!(out, "\n📋 Open in base: {base_url}");
    out
}

#[derive(Debug, Serialize)]
pub struct AlertSummary {
    pub overdue: usize,
    pub urgent: usize,
    pub warning: usize,
}

#[derive(Debug, Serialize)]
pub struct AlertEntry {
    pub wbs: Option<String>,
    pub name: String,
    pub customer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_overdue: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
}

/// Machine-readable result of the overdue check.
#[derive(Debug, Serialize)]
pub struct AlertJson {
    pub timestamp: String,
    pub summary: AlertSummary,
    pub overdue_tasks: Vec<AlertEntry>,
    pub urgent_tasks: Vec<AlertEntry>,
}

impl AlertJson {
    pub fn new(timestamp: DateTime<Utc>, report: &UrgencyReport<'_>, directory: &CustomerDirectory) -> Self {
        let entry = |task: &Task, days_overdue, days_remaining| AlertEntry {
            wbs: task.wbs.clone(),
            name: task.name.clone(),
            customer: directory.name_for(task).to_string(),
            days_overdue,
            days_remaining,
        };
        AlertJson {
            timestamp: timestamp.to_rfc3339(),
            summary: AlertSummary {
                overdue: report.overdue.len(),
                urgent: report.urgent.len(),
                warning: report.warning.len(),
            },
            overdue_tasks: report
                .overdue
                .iter()
                .map(|o| entry(o.task, Some(o.days_overdue), None))
                .collect(),
            urgent_tasks: report
                .urgent
                .iter()
                .map(|d| entry(d.task, None, Some(d.days_remaining)))
                .collect(),
        }
    }
}

/// Console report for the weekly progress summary.
pub fn format_weekly_console(weekly: &WeeklyRollup<'_>, directory: &CustomerDirectory) -> String {
    let mut out = String::new();
    let g = &weekly.global;

    section(&mut out, "[Overall]");
    let _ = writeln!(out, "  Active customers:    {}", weekly.active_customers);
    let _ = writeln!(out, "  Tasks:               {}", g.completion.total);
    let _ = writeln!(out, "  Completed:           {}", g.completion.completed);
    let _ = writeln!(out, "  Completion rate:     {:.1}%", g.completion.rate() * 100.0);
    let _ = writeln!(out, "  Overdue:             {}", g.overdue);
    let _ = writeln!(out, "  Completed this week: {}", g.this_week_completed.len());
    let _ = writeln!(out, "  Due next week:       {}", g.next_week_due.len());

    out.push('\n');
    section(&mut out, "[Progress by customer] (lowest first)");
    for c in &weekly.customers {
        let rate = c.completion.rate();
        let _ = writeln!(out, "\n  {}", c.customer.company);
        let _ = writeln!(out, "    {} {:.1}%", progress_bar(rate), rate * 100.0);
        let _ = writeln!(
            out,
            "    Done: {}/{} | Overdue: {} | Done this week: {} | Due next week: {}",
            c.completion.completed,
            c.completion.total,
            c.overdue,
            c.this_week_completed,
            c.next_week_due.len()
        );
    }

    out.push('\n');
    section(&mut out, "[Due next week]");
    for t in &g.next_week_due {
        let due = t.due.map(format_date).unwrap_or_else(|| "-".into());
        let _ = writeln!(out, "  📅 {due} | {}", directory.name_for(t));
        let _ = writeln!(out, "     [{}] {}", wbs(t), t.name);
    }
    out
}

/// Webhook message for the weekly progress summary.
pub fn format_weekly_message(
    date: &str,
    weekly: &WeeklyRollup<'_>,
    directory: &CustomerDirectory,
    base_url: &str,
) -> String {
    let g = &weekly.global;
    let mut out = format!("📊 Weekly progress report ({date})\n\n");

    let _ = writeln!(out, "■ Overall");
    let _ = writeln!(out, "• Active customers: {}", weekly.active_customers);
    let _ = writeln!(
        out,
        "• Completion: {:.1}% ({}/{})",
        g.completion.rate() * 100.0,
        g.completion.completed,
        g.completion.total
    );
    let _ = writeln!(out, "• Overdue: {}", g.overdue);
    let _ = writeln!(out, "• Completed this week: {}", g.this_week_completed.len());
    let _ = writeln!(out, "• Due next week: {}\n", g.next_week_due.len());

    let _ = writeln!(out, "■ Progress by customer (lowest first)");
    for c in weekly.customers.iter().take(DETAIL_CAP) {
        let rate = c.completion.rate();
        let _ = writeln!(out, "{}: {} {:.0}%", c.customer.company, progress_bar(rate), rate * 100.0);
    }
    if weekly.customers.len() > DETAIL_CAP {
        let _ = writeln!(out, "  …and {} more", weekly.customers.len() - DETAIL_CAP);
    }

    if !g.next_week_due.is_empty() {
        let _ = writeln!(out, "\n■ Due next week");
        push_capped(&mut out, &g.next_week_due, |t: &Task| {
            let date = t.due.map(format_date).unwrap_or_else(|| "-".into());
            format!("{date} | {} | {}", directory.name_for(t), t.name)
        });
    }

    let _ = write!(out, "\n📋 Open in base: {base_url}");
    out
}

/// Detail view of one task.
pub fn format_task_detail(task: &Task, directory: &CustomerDirectory, urgency: Option<Urgency>) -> String {
    let due = match (task.due, urgency) {
        (None, _) => "-".to_string(),
        (Some(d), Some(Urgency::Overdue { days_overdue })) => {
            format!("{} ({days_overdue} day(s) overdue)", format_date(d))
        }
        (Some(d), Some(Urgency::Urgent { days_remaining } | Urgency::Warning { days_remaining })) => {
            format!("{} ({days_remaining} day(s) left)", format_date(d))
        }
        (Some(d), None) => format_date(d),
    };
    let flag = match urgency {
        Some(Urgency::Overdue { .. }) => "Overdue",
        Some(Urgency::Urgent { .. }) => "Urgent",
        Some(Urgency::Warning { .. }) => "Warning",
        None => "-",
    };

    let mut out = String::new();
    let _ = writeln!(out, "ID:        {}", task.id);
    let _ = writeln!(out, "Name:      {}", task.name);
    let _ = writeln!(out, "WBS:       {}", wbs(task));
    let _ = writeln!(out, "Category:  {}", task.category.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Status:    {}", format_task_status(task.status));
    let _ = writeln!(out, "Due:       {due}");
    let _ = writeln!(out, "Alert:     {flag}");
    let _ = writeln!(out, "Owner:     {}", task.assignee.as_deref().unwrap_or("-"));
    let _ = write!(out, "Customer:  {}", directory.name_for(task));
    out
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Category completion table.
pub fn format_category_table(rollup: &CategoryRollup) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<20} {:>6} {:>6} {:>6}", "Category", "Done", "Total", "Rate");
    for (key, c) in rollup.iter() {
        let _ = writeln!(
            out,
            "{:<20} {:>6} {:>6} {:>5}%",
            truncate(key, 20),
            c.completed,
            c.total,
            c.percent()
        );
    }
    out
}
