//! Persisting category completion figures back into the base.

use serde_json::{json, Map, Value};

use crate::error::WriteError;
use crate::rollup::{CategoryRollup, CategoryRule};
use crate::store::{Record, RecordStore};
use crate::task::{task_field, text_field, Task};

/// Field names in the WBS category table.
pub mod category_field {
    pub const WBS: &str = "WBS番号";
    pub const NAME: &str = "カテゴリ名";
    pub const TASK_COUNT: &str = "タスク数";
    pub const COMPLETED_COUNT: &str = "完了タスク数";
    pub const COMPLETION_RATE: &str = "完了率";
}

/// Write task count, completed count and a `"N%"` rate into every record of
/// the category table, keyed by the record's WBS number.
///
/// Returns the number of records updated. Stops at the first failed update.
pub fn write_category_table<S: RecordStore>(
    store: &S,
    table: &str,
    categories: &[Record],
    rollup: &CategoryRollup,
) -> Result<usize, WriteError> {
    let mut written = 0;
    for record in categories {
        let Some(wbs) = text_field(&record.fields, category_field::WBS) else {
            log::debug!("category {} has no WBS number, skipped", record.record_id);
            continue;
        };
        let counts = rollup.get(&wbs);

        let mut fields = Map::new();
        fields.insert(category_field::TASK_COUNT.to_string(), json!(counts.total));
        fields.insert(category_field::COMPLETED_COUNT.to_string(), json!(counts.completed));
        fields.insert(
            category_field::COMPLETION_RATE.to_string(),
            Value::String(format!("{}%", counts.percent())),
        );

        update(store, table, &record.record_id, fields)?;
        written += 1;

        let name = text_field(&record.fields, category_field::NAME).unwrap_or(wbs);
        log::info!("{name}: {}/{} ({}%)", counts.completed, counts.total, counts.percent());
    }
    Ok(written)
}

/// Write each task's category completion rate (a fraction) into its own
/// completion-rate field. Tasks without a category key are left alone.
pub fn write_task_rates<S: RecordStore>(
    store: &S,
    table: &str,
    tasks: &[Task],
    rollup: &CategoryRollup,
    rule: CategoryRule,
) -> Result<usize, WriteError> {
    let mut written = 0;
    for task in tasks {
        let Some(key) = rule.key(task) else { continue };
        let rate = rollup.get(&key).rate();

        let mut fields = Map::new();
        fields.insert(task_field::COMPLETION_RATE.to_string(), json!(rate));
        update(store, table, &task.id, fields)?;

        written += 1;
        if written % 10 == 0 {
            log::info!("{written} tasks updated");
        }
    }
    Ok(written)
}

fn update<S: RecordStore>(
    store: &S,
    table: &str,
    record_id: &str,
    fields: Map<String, Value>,
) -> Result<(), WriteError> {
    store.update_record(table, record_id, fields).map_err(|source| WriteError {
        table: table.to_string(),
        record_id: record_id.to_string(),
        source,
    })
}
