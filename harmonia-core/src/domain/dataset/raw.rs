// harmonia-core/src/domain/dataset/raw.rs

use std::collections::BTreeMap;

use super::value::Value;

pub type Row = BTreeMap<String, Value>;

/// A source-tagged table as delivered by ingestion. Column names and types are
/// source-specific; the dataset is consumed once by the schema mapper.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawDataset {
    pub source_id: String,
    pub rows: Vec<Row>,
}

impl RawDataset {
    pub fn new(source_id: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            source_id: source_id.into(),
            rows,
        }
    }

    /// Builds a dataset from a header and positional rows (short rows are padded with null).
    pub fn from_columns(
        source_id: impl Into<String>,
        columns: &[&str],
        rows: Vec<Vec<Value>>,
    ) -> Self {
        let rows = rows
            .into_iter()
            .map(|cells| {
                let mut cells = cells.into_iter();
                columns
                    .iter()
                    .map(|c| (c.to_string(), cells.next().unwrap_or_default()))
                    .collect()
            })
            .collect();
        Self::new(source_id, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
