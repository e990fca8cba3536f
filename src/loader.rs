// 📥 Table Loader - CSV / JSON files into an in-memory Table (and back to CSV)
//
// CSV: header row = column names, every cell a string (empty cell → Null).
// JSON: an array of objects; scalars and arrays of scalars are accepted,
// anything nested deeper is a hard failure.

use crate::error::{CleanerError, Result};
use crate::record::{Record, Table, Value};
use csv::{ReaderBuilder, Writer};
use serde_json::Value as JsonValue;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::info;

/// Load by file extension (`.csv` or `.json`, case-insensitive)
pub fn load_table(path: &Path) -> Result<Table> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let table = match extension.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        other => {
            return Err(CleanerError::Config(format!(
                "unsupported input format '{}' for {}",
                other,
                path.display()
            )))
        }
    };

    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns.len(),
        "table loaded"
    );
    Ok(table)
}

pub fn load_csv(path: &Path) -> Result<Table> {
    read_csv(File::open(path)?)
}

pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let line = result?;
        let record = columns
            .iter()
            .enumerate()
            .fold(Record::new(), |record, (i, column)| {
                let value = match line.get(i) {
                    Some(cell) if !cell.is_empty() => Value::from(cell),
                    _ => Value::Null,
                };
                record.with(column.as_str(), value)
            });
        rows.push(record);
    }

    Table::new(columns, rows)
}

pub fn load_json(path: &Path) -> Result<Table> {
    let file = File::open(path)?;
    let json: JsonValue = serde_json::from_reader(BufReader::new(file))?;
    table_from_json(json)
}

pub fn table_from_json(json: JsonValue) -> Result<Table> {
    let items = match json {
        JsonValue::Array(items) => items,
        _ => {
            return Err(CleanerError::InvalidTable(
                "expected a JSON array of objects".into(),
            ))
        }
    };

    // Column order = order of first appearance across all objects
    let mut columns: Vec<String> = Vec::new();
    for (row, item) in items.iter().enumerate() {
        let object = item.as_object().ok_or_else(|| {
            CleanerError::InvalidTable(format!("row {} is not a JSON object", row + 1))
        })?;
        for key in object.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut rows = Vec::with_capacity(items.len());
    for (row, item) in items.into_iter().enumerate() {
        let JsonValue::Object(mut object) = item else {
            continue;
        };
        let mut record = Record::new();
        for column in &columns {
            let value = match object.remove(column) {
                Some(cell) => to_value(cell, row + 1, column)?,
                None => Value::Null,
            };
            record = record.with(column.as_str(), value);
        }
        rows.push(record);
    }

    Table::new(columns, rows)
}

/// Write the table as CSV in column order; Null cells are empty
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(table.columns.iter().map(|column| row.text(column)))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_csv(table: &Table, path: &Path) -> Result<()> {
    write_csv(table, File::create(path)?)
}

fn to_value(cell: JsonValue, row: usize, column: &str) -> Result<Value> {
    let unsupported = |kind: &str| CleanerError::UnsupportedValue {
        row,
        column: column.to_string(),
        kind: kind.to_string(),
    };

    match cell {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Bool(b)),
        JsonValue::Number(n) => n
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| unsupported("number out of range")),
        JsonValue::String(s) => Ok(Value::String(s)),
        JsonValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                JsonValue::Array(_) => Err(unsupported("nested array")),
                JsonValue::Object(_) => Err(unsupported("object inside array")),
                scalar => to_value(scalar, row, column),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        JsonValue::Object(_) => Err(unsupported("object")),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::Builder;

    #[test]
    fn test_read_csv_keeps_text_and_empty_cells() {
        let data = "name,phone,email\nAli,0501234567,\nSara,,sara@x.com\n";
        let table = read_csv(data.as_bytes()).unwrap();

        assert_eq!(table.columns, vec!["name", "phone", "email"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].get("phone"), Some(&Value::from("0501234567")));
        assert_eq!(table.rows[0].get("email"), Some(&Value::Null));
        assert_eq!(table.rows[1].get("phone"), Some(&Value::Null));
    }

    #[test]
    fn test_short_csv_rows_are_padded() {
        let table = read_csv("a,b,c\n1\n".as_bytes()).unwrap();
        assert_eq!(table.rows[0].get("c"), Some(&Value::Null));
    }

    #[test]
    fn test_json_scalars_and_lists() {
        let json = serde_json::json!([
            {"name": "Ali", "employees": 12, "active": true},
            {"name": "Sara", "tags": ["a", 1], "extra": null}
        ]);
        let table = table_from_json(json).unwrap();

        assert_eq!(table.columns, vec!["name", "employees", "active", "tags", "extra"]);
        assert_eq!(table.rows[0].get("employees"), Some(&Value::Number(12.0)));
        assert_eq!(table.rows[0].get("tags"), Some(&Value::Null));
        assert_eq!(
            table.rows[1].get("tags"),
            Some(&Value::List(vec![Value::from("a"), Value::Number(1.0)]))
        );
    }

    #[test]
    fn test_nested_object_is_a_hard_failure() {
        let json = serde_json::json!([{"name": "Ali"}, {"name": {"first": "Sara"}}]);
        match table_from_json(json) {
            Err(CleanerError::UnsupportedValue { row, column, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "name");
            }
            other => panic!("expected UnsupportedValue, got {:?}", other),
        }

        assert!(table_from_json(serde_json::json!({"name": "Ali"})).is_err());
    }

    #[test]
    fn test_load_table_dispatches_on_extension() {
        let mut csv_file = Builder::new().suffix(".CSV").tempfile().unwrap();
        writeln!(csv_file, "phone\n966501234567").unwrap();
        let table = load_table(csv_file.path()).unwrap();
        assert_eq!(table.len(), 1);

        let mut json_file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(json_file, r#"[{{"phone": "966501234567"}}]"#).unwrap();
        assert_eq!(load_table(json_file.path()).unwrap().columns, vec!["phone"]);

        let other = Builder::new().suffix(".xlsx").tempfile().unwrap();
        assert!(matches!(load_table(other.path()), Err(CleanerError::Config(_))));
    }

    #[test]
    fn test_write_csv_follows_column_order() {
        let table = Table::new(
            vec!["phone".into(), "phone_clean".into(), "is_duplicate".into()],
            vec![Record::new()
                .with("phone", "0501234567")
                .with("is_duplicate", false)
                .with("phone_clean", "966501234567")],
        )
        .unwrap();

        let mut out = Vec::new();
        write_csv(&table, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "phone,phone_clean,is_duplicate\n0501234567,966501234567,false\n"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_table(Path::new("/nonexistent/contacts.csv"));
        assert!(matches!(result, Err(CleanerError::Io(_))));
    }
}
