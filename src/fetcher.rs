//! Paginated table retrieval.

use crate::error::{FetchError, StoreError};
use crate::store::{Record, RecordStore};

/// Fetch every record of `table`, following continuation tokens until the
/// store stops returning one. Records keep the order the store returned them
/// in. Any failed page, or a store that hands back the token it was just
/// given, aborts the whole fetch.
pub fn fetch_all<S: RecordStore>(store: &S, table: &str) -> Result<Vec<Record>, FetchError> {
    let mut records = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = store
            .list_records(table, page_token.as_deref())
            .map_err(|source| FetchError { table: table.to_string(), source })?;
        pages += 1;
        log::debug!("table {table}: page {pages} returned {} record(s)", page.items.len());
        records.extend(page.items);

        match page.next_page_token {
            // An empty token is treated as the end of the listing.
            Some(token) if !token.is_empty() => {
                if page_token.as_deref() == Some(token.as_str()) {
                    return Err(FetchError {
                        table: table.to_string(),
                        source: StoreError::Malformed(format!("page token {token} repeated")),
                    });
                }
                page_token = Some(token);
            }
            _ => break,
        }
    }

    log::info!("fetched {} record(s) from table {table}", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{record, MemoryStore};
    use crate::store::Page;
    use serde_json::{json, Map, Value};

    fn records(n: usize) -> Vec<Record> {
        (0..n).map(|i| record(&format!("rec{i}"), json!({ "n": i }))).collect()
    }

    #[test]
    fn test_follows_tokens_and_preserves_order() {
        let store = MemoryStore::with_table("tasks", records(7), 3);
        let all = fetch_all(&store, "tasks").unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, ["rec0", "rec1", "rec2", "rec3", "rec4", "rec5", "rec6"]);
        assert_eq!(*store.list_calls.borrow(), 3);
    }

    #[test]
    fn test_empty_table_is_not_an_error() {
        let store = MemoryStore::with_table("tasks", Vec::new(), 3);
        assert!(fetch_all(&store, "tasks").unwrap().is_empty());
    }

    #[test]
    fn test_failed_page_discards_partial_results() {
        let mut store = MemoryStore::with_table("tasks", records(7), 3);
        store.fail_on_page = Some(("tasks".to_string(), 1));

        let err = fetch_all(&store, "tasks").unwrap_err();
        assert_eq!(err.table, "tasks");
        assert!(err.to_string().contains("Fail"));
    }

    struct StuckStore;

    impl RecordStore for StuckStore {
        fn list_records(&self, _table: &str, _token: Option<&str>) -> Result<Page, StoreError> {
            Ok(Page {
                items: vec![record("rec0", json!({}))],
                next_page_token: Some("same".to_string()),
            })
        }

        fn get_record(&self, _table: &str, _id: &str) -> Result<Record, StoreError> {
            unimplemented!()
        }

        fn update_record(&self, _: &str, _: &str, _: Map<String, Value>) -> Result<(), StoreError> {
            unimplemented!()
        }
    }

    #[test]
    fn test_repeated_page_token_is_an_error() {
        let err = fetch_all(&StuckStore, "tasks").unwrap_err();
        assert_eq!(err.table, "tasks");
        assert!(matches!(err.source, StoreError::Malformed(_)));
    }

    #[test]
    fn test_unknown_table_reports_table_name() {
        let store = MemoryStore::with_table("tasks", records(1), 3);
        let err = fetch_all(&store, "tblMissing").unwrap_err();
        assert!(err.to_string().contains("tblMissing"));
    }
}
