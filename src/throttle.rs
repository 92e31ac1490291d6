//! Fixed-interval request gate.
//!
//! Wraps any `RecordStore` and spaces consecutive calls at least `interval`
//! apart, sleeping the calling thread when needed. Business logic never sees
//! the delay.

use std::cell::Cell;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::store::{Page, Record, RecordStore};

pub struct RateGate<S> {
    inner: S,
    interval: Duration,
    last_call: Cell<Option<Instant>>,
}

impl<S: RecordStore> RateGate<S> {
    pub fn new(inner: S, interval: Duration) -> Self {
        RateGate { inner, interval, last_call: Cell::new(None) }
    }

    /// Block until the interval since the previous call has elapsed.
    fn wait_turn(&self) {
        if let Some(last) = self.last_call.get() {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                let pause = self.interval - elapsed;
                log::debug!("throttling API call for {} ms", pause.as_millis());
                thread::sleep(pause);
            }
        }
        self.last_call.set(Some(Instant::now()));
    }
}

impl<S: RecordStore> RecordStore for RateGate<S> {
    fn list_records(&self, table: &str, page_token: Option<&str>) -> Result<Page, StoreError> {
        self.wait_turn();
        self.inner.list_records(table, page_token)
    }

    fn get_record(&self, table: &str, record_id: &str) -> Result<Record, StoreError> {
        self.wait_turn();
        self.inner.get_record(table, record_id)
    }

    fn update_record(
        &self,
        table: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.wait_turn();
        self.inner.update_record(table, record_id, fields)
    }
}
