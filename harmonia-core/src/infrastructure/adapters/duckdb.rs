// harmonia-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use duckdb::types::Value as DuckValue;
use duckdb::{Config, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument};

use crate::domain::dataset::{RawDataset, Row, Value};
use crate::domain::project::{SourceConfig, SourceFormat};
use crate::error::HarmoniaError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::source::SourceReader;

/// Reads CSV and Parquet sources through an embedded DuckDB.
///
/// Each source is registered as a view named after its id. Reads clone the
/// connection and run on the blocking pool, so sources of a run load in parallel.
pub struct DuckDbSourceReader {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbSourceReader {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();
        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, InfrastructureError> {
        Self::new(":memory:")
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, HarmoniaError> {
        self.conn
            .lock()
            .map_err(|_| HarmoniaError::InternalError("DuckDB Mutex Poisoned".into()))
    }

    fn fetch_columns(conn: &Connection, view: &str) -> Result<Vec<String>, InfrastructureError> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info('{}')", view.replace('\'', "''")))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>("name"))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    fn read_blocking(
        conn: &Connection,
        source_id: &str,
        reader: &str,
        path: &Path,
    ) -> Result<RawDataset, HarmoniaError> {
        let view = format!("src_{}", source_id);
        conn.execute(
            &format!(
                "CREATE OR REPLACE VIEW {} AS SELECT * FROM {}({})",
                quote_ident(&view),
                reader,
                quote_literal(&path.to_string_lossy())
            ),
            [],
        )
        .map_err(InfrastructureError::from)?;

        let columns = Self::fetch_columns(conn, &view)?;
        let mut stmt = conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(&view)))
            .map_err(InfrastructureError::from)?;
        let mut result = stmt.query([]).map_err(InfrastructureError::from)?;

        let mut rows: Vec<Row> = Vec::new();
        while let Some(row) = result.next().map_err(InfrastructureError::from)? {
            let mut values = BTreeMap::new();
            for (i, column) in columns.iter().enumerate() {
                let cell: DuckValue = row.get(i).map_err(InfrastructureError::from)?;
                values.insert(column.clone(), to_value(cell));
            }
            rows.push(values);
        }

        debug!(rows = rows.len(), columns = columns.len(), "Source read");
        Ok(RawDataset::new(source_id.to_string(), rows))
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// DuckDB cell to core value. Non-finite floats become null.
fn to_value(cell: DuckValue) -> Value {
    let number = |n: f64| {
        if n.is_finite() {
            Value::Number(n)
        } else {
            Value::Null
        }
    };
    match cell {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(n) => Value::Number(n.into()),
        DuckValue::SmallInt(n) => Value::Number(n.into()),
        DuckValue::Int(n) => Value::Number(n.into()),
        DuckValue::BigInt(n) => Value::Number(n as f64),
        DuckValue::HugeInt(n) => Value::Number(n as f64),
        DuckValue::UTinyInt(n) => Value::Number(n.into()),
        DuckValue::USmallInt(n) => Value::Number(n.into()),
        DuckValue::UInt(n) => Value::Number(n.into()),
        DuckValue::UBigInt(n) => Value::Number(n as f64),
        DuckValue::Float(n) => number(n.into()),
        DuckValue::Double(n) => number(n),
        DuckValue::Decimal(d) => d.to_string().parse().map(number).unwrap_or(Value::Null),
        DuckValue::Text(s) => Value::Text(s),
        DuckValue::Enum(s) => Value::Text(s),
        other => Value::Text(format!("{:?}", other)),
    }
}

#[async_trait]
impl SourceReader for DuckDbSourceReader {
    #[instrument(skip(self, project_dir), fields(source = %source.id))]
    async fn read(
        &self,
        source: &SourceConfig,
        project_dir: &Path,
    ) -> Result<RawDataset, HarmoniaError> {
        let raw_path = Path::new(&source.path);
        let absolute_path = if raw_path.is_absolute() {
            raw_path.to_path_buf()
        } else {
            project_dir.join(raw_path)
        };
        if !absolute_path.exists() {
            return Err(InfrastructureError::SourceNotFound(
                absolute_path.display().to_string(),
            )
            .into());
        }

        let reader = match source.resolved_format() {
            SourceFormat::Csv => "read_csv_auto",
            SourceFormat::Parquet => "read_parquet",
        };

        // Each read gets its own connection to the shared database, off the runtime threads
        let conn = self
            .lock()?
            .try_clone()
            .map_err(InfrastructureError::from)?;
        let source_id = source.id.clone();
        tokio::task::spawn_blocking(move || {
            Self::read_blocking(&conn, &source_id, reader, &absolute_path)
        })
        .await
        .map_err(|e| HarmoniaError::InternalError(format!("Source read task panicked: {}", e)))?
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}
