//! Typed task and customer records.
//!
//! Raw records arrive as open maps of field name to JSON value. This module
//! turns them into `Task` and `Customer` structs with explicit optional fields
//! so the classifier and rollups never look at raw field maps.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::fields::*;
use crate::store::Record;

/// Field names in the task table.
pub mod task_field {
    pub const NAME: &str = "タスク名";
    pub const WBS: &str = "WBS番号";
    pub const CATEGORY: &str = "カテゴリ";
    pub const STATUS: &str = "ステータス";
    pub const DUE: &str = "期限";
    pub const ASSIGNEE: &str = "担当者";
    pub const CUSTOMER: &str = "顧客";
    pub const UPDATED: &str = "更新時間";
    pub const COMPLETION_RATE: &str = "完了率";
}

/// Field names in the customer table.
pub mod customer_field {
    pub const COMPANY: &str = "会社名";
    pub const STATUS: &str = "ステータス";
    pub const OPENING_DATE: &str = "開業予定日";
}

/// A unit of work read from the task table.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub wbs: Option<String>,
    pub category: Option<String>,
    pub status: TaskStatus,
    pub due: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
    /// Linked customer record ids, in link order.
    pub customer_ids: Vec<String>,
    pub updated: Option<DateTime<Utc>>,
}

impl Task {
    /// The customer a task belongs to. Only the first link is honoured.
    pub fn customer_id(&self) -> Option<&str> {
        self.customer_ids.first().map(String::as_str)
    }
}

impl From<&Record> for Task {
    fn from(record: &Record) -> Self {
        let f = &record.fields;
        let status = match text_field(f, task_field::STATUS) {
            None => TaskStatus::Unknown,
            Some(label) => TaskStatus::from_label(&label).unwrap_or_else(|| {
                log::warn!("task {}: unrecognised status '{label}'", record.record_id);
                TaskStatus::Unknown
            }),
        };

        Task {
            id: record.record_id.clone(),
            name: text_field(f, task_field::NAME).unwrap_or_default(),
            wbs: text_field(f, task_field::WBS),
            category: text_field(f, task_field::CATEGORY),
            status,
            due: instant_field(f, task_field::DUE),
            assignee: text_field(f, task_field::ASSIGNEE),
            customer_ids: link_field(f, task_field::CUSTOMER),
            updated: instant_field(f, task_field::UPDATED),
        }
    }
}

/// A client record read from the customer table.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: String,
    pub company: String,
    pub status: Option<CustomerStatus>,
    pub opening_date: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn is_active(&self) -> bool {
        self.status.is_some_and(CustomerStatus::is_active)
    }
}

impl From<&Record> for Customer {
    fn from(record: &Record) -> Self {
        let f = &record.fields;
        let status = text_field(f, customer_field::STATUS).and_then(|label| {
            let parsed = CustomerStatus::from_label(&label);
            if parsed.is_none() {
                log::warn!("customer {}: unrecognised status '{label}'", record.record_id);
            }
            parsed
        });

        Customer {
            id: record.record_id.clone(),
            company: text_field(f, customer_field::COMPANY).unwrap_or_default(),
            status,
            opening_date: instant_field(f, customer_field::OPENING_DATE),
        }
    }
}

/// Keep only customers that count as active for reporting, in fetch order.
pub fn active_customers(records: &[Record]) -> Vec<Customer> {
    records
        .iter()
        .map(Customer::from)
        .filter(Customer::is_active)
        .collect()
}

/// Read a text-like field.
///
/// Plain text and single-select fields arrive as strings; rich text arrives as
/// an array of segments whose `text` parts are concatenated. Blank values are
/// treated as absent.
pub fn text_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    let text = match fields.get(name)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(segments) => segments
            .iter()
            .filter_map(|seg| match seg {
                Value::String(s) => Some(s.as_str()),
                Value::Object(o) => o.get("text").and_then(Value::as_str),
                _ => None,
            })
            .collect(),
        Value::Object(o) => o.get("text").and_then(Value::as_str)?.to_string(),
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Read a date or timestamp field.
///
/// Dates are stored as epoch milliseconds. ISO strings are accepted too: a
/// full RFC 3339 timestamp as is, a bare `YYYY-MM-DD` as local midnight.
pub fn instant_field(fields: &Map<String, Value>, name: &str) -> Option<DateTime<Utc>> {
    match fields.get(name)? {
        Value::Number(n) => {
            let ms = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(ms)
        }
        Value::String(s) => parse_instant(s),
        _ => None,
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Local
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Read a link field as a list of linked record ids.
///
/// Handles the shapes the API returns for links: a list of id strings, a list
/// of link objects carrying `record_ids`, or an object with `link_record_ids`.
pub fn link_field(fields: &Map<String, Value>, name: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let Some(value) = fields.get(name) else {
        return ids;
    };

    let push_ids = |list: &Value, ids: &mut Vec<String>| {
        if let Some(items) = list.as_array() {
            ids.extend(items.iter().filter_map(Value::as_str).map(str::to_string));
        }
    };

    match value {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(id) => ids.push(id.clone()),
                    Value::Object(o) => {
                        if let Some(list) = o.get("record_ids") {
                            push_ids(list, &mut ids);
                        } else if let Some(id) = o.get("record_id").and_then(Value::as_str) {
                            ids.push(id.to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
        Value::Object(o) => {
            if let Some(list) = o.get("link_record_ids") {
                push_ids(list, &mut ids);
            }
        }
        _ => {}
    }
    ids
}
