//! Record store abstraction.
//!
//! The base is reached through the `RecordStore` trait so that fetching and
//! write-back can run against the HTTP client, a rate-limited wrapper around
//! it, or an in-memory fake in tests.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// A raw record: its id plus the open map of field name to field value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub record_id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// One page of a table listing.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Record>,
    pub next_page_token: Option<String>,
}

pub trait RecordStore {
    fn list_records(&self, table: &str, page_token: Option<&str>) -> Result<Page, StoreError>;

    fn get_record(&self, table: &str, record_id: &str) -> Result<Record, StoreError>;

    fn update_record(
        &self,
        table: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn list_records(&self, table: &str, page_token: Option<&str>) -> Result<Page, StoreError> {
        (**self).list_records(table, page_token)
    }

    fn get_record(&self, table: &str, record_id: &str) -> Result<Record, StoreError> {
        (**self).get_record(table, record_id)
    }

    fn update_record(
        &self,
        table: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        (**self).update_record(table, record_id, fields)
    }
}
