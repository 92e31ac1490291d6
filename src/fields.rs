//! Enumerations and field types for base records.
//!
//! This module defines the structured values read out of the task and customer
//! tables: task status, customer lifecycle status, and the category key rules
//! accepted on the command line. Each status enum knows the option labels the
//! base stores for it and maps them at the ingestion boundary.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task progress status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Done,
    OnHold,
    Blocked,
    /// A missing or unrecognised label. Open, but never counted as not started.
    Unknown,
}

impl TaskStatus {
    /// Map a single-select option label to a status.
    ///
    /// Accepts the option names configured in the task table as well as the
    /// kebab-case names used in JSON output.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "未着手" | "not-started" => Some(TaskStatus::NotStarted),
            "進行中" | "in-progress" => Some(TaskStatus::InProgress),
            "完了" | "done" => Some(TaskStatus::Done),
            "保留" | "on-hold" => Some(TaskStatus::OnHold),
            "ブロック中" | "blocked" => Some(TaskStatus::Blocked),
            _ => None,
        }
    }

    /// Closed tasks never take part in urgency classification.
    pub fn is_closed(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::OnHold)
    }
}

/// Format a task status for display.
pub fn format_task_status(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::NotStarted => "Not started",
        TaskStatus::InProgress => "In progress",
        TaskStatus::Done => "Done",
        TaskStatus::OnHold => "On hold",
        TaskStatus::Blocked => "Blocked",
        TaskStatus::Unknown => "Unknown",
    }
}

/// Customer lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CustomerStatus {
    Preparing,
    InProgress,
    Opened,
    OnHold,
    Cancelled,
}

impl CustomerStatus {
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "準備中" | "preparing" => Some(CustomerStatus::Preparing),
            "進行中" | "in-progress" => Some(CustomerStatus::InProgress),
            "開業済" | "opened" => Some(CustomerStatus::Opened),
            "保留" | "on-hold" => Some(CustomerStatus::OnHold),
            "解約" | "cancelled" => Some(CustomerStatus::Cancelled),
            _ => None,
        }
    }

    /// Only customers still being onboarded are reported on.
    pub fn is_active(self) -> bool {
        matches!(self, CustomerStatus::Preparing | CustomerStatus::InProgress)
    }
}

/// How tasks are grouped into categories.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CategoryBy {
    /// The task's category field.
    Field,
    /// The leading segment of the task's WBS number.
    Wbs,
}
