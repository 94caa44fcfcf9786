//! Reading candidate rows from spreadsheet exports (CSV) or JSON arrays.
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

use crate::model::CandidateRow;

/// Read rows from a CSV export. The first record is the header row; fully
/// blank records are skipped, and every kept row remembers its line so
/// validation errors point at the right spreadsheet row.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<CandidateRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers().context("failed to read CSV header")?.clone();

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("bad CSV record {}", i + 1))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let mut row = CandidateRow::from_cells(headers.iter().zip(record.iter()));
        row.line = record.position().map(|pos| pos.line() as usize);
        rows.push(row);
    }
    Ok(rows)
}

/// Read rows from a JSON array of objects. Numbers and booleans keep their
/// textual form; arrays of strings become pipe-delimited cells.
pub fn read_json(content: &str) -> Result<Vec<CandidateRow>> {
    let value: Value = serde_json::from_str(content).context("invalid JSON input")?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("products") {
            Some(Value::Array(items)) => items,
            _ => return Err(anyhow!("expected a JSON array or an object with `products`")),
        },
        _ => return Err(anyhow!("expected a JSON array of products")),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(obj) => Ok(CandidateRow::from(obj)),
            other => Err(anyhow!("product {} is not an object: {}", i + 1, other)),
        })
        .collect()
}

/// Load rows from `path`, choosing the format by extension (`.json` or CSV).
pub fn load_rows(path: &Path) -> Result<Vec<CandidateRow>> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        read_json(&content)
    } else {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        read_csv(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_keep_raw_text() {
        let data = "Name,Price,SKU,Sizes,Is Featured\n\
                    Mug, 12.50 ,007,S|M,yes\n\
                    ,,,,\n\
                    Plate,abc,,,\n";
        let rows = read_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].price.as_deref(), Some("12.50"));
        assert_eq!(rows[0].sku.as_deref(), Some("007"));
        assert_eq!(rows[0].sizes.as_deref(), Some("S|M"));
        assert_eq!(rows[0].is_featured.as_deref(), Some("yes"));
        assert_eq!(rows[1].price.as_deref(), Some("abc"));
        assert!(rows[1].sku.is_none());
    }

    #[test]
    fn rows_after_blank_lines_keep_their_line() {
        let data = "Name,Price\nMug,1\n,\nPlate,abc\n";
        let rows = read_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, Some(2));
        assert_eq!(rows[1].line, Some(4));

        let v = crate::validate::validate(
            &rows,
            &crate::category::CategoryTable::default(),
            &Default::default(),
        );
        assert_eq!(v.errors.len(), 1);
        assert_eq!(v.errors[0].to_string(), "Row 4: Valid price is required");
    }

    #[test]
    fn json_values_become_text() {
        let rows = read_json(
            r#"[{"name":"Mug","price":12.5,"is_active":false,"tags":["a","b"],"sku":null}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].price.as_deref(), Some("12.5"));
        assert_eq!(rows[0].is_active.as_deref(), Some("false"));
        assert_eq!(rows[0].tags.as_deref(), Some("a|b"));
        assert!(rows[0].sku.is_none());
    }

    #[test]
    fn json_accepts_products_envelope_and_rejects_scalars() {
        let rows = read_json(r#"{"products":[{"name":"Mug"}]}"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(read_json("[1]").is_err());
        assert!(read_json("\"x\"").is_err());
    }
}
