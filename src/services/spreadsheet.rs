//! xlsx codec and the row mapping used by item and BOM import/export.
//!
//! A row is a JSON object keyed by header name. Only the first sheet is
//! read; the first row is the header. Empty cells and empty strings are
//! treated as absent in both directions. A blank row decodes to an empty
//! row and importers skip it.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Number, Value};
use tracing::{info, instrument};

use crate::{
    errors::ServiceError,
    metrics::REGISTRY_METRICS,
    services::{
        bom::{BomLineDraft, BomService},
        code_generator::ItemDraft,
        items::ItemService,
        BulkResult,
    },
};

pub type Row = Map<String, Value>;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const ITEM_NUMERIC_FIELDS: &[&str] = &["sequenceNo", "no"];
const BOM_NUMERIC_FIELDS: &[&str] = &["lineNo", "no", "level", "quantity"];

#[derive(Debug, thiserror::Error)]
pub enum SpreadsheetError {
    #[error("cannot read workbook: {0}")]
    Read(String),
    #[error("workbook has no sheets")]
    NoSheet,
    #[error("cannot write workbook: {0}")]
    Write(String),
    #[error("row {index}: {message}")]
    Row { index: usize, message: String },
}

impl From<SpreadsheetError> for ServiceError {
    fn from(err: SpreadsheetError) -> Self {
        ServiceError::Spreadsheet(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for SpreadsheetError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        SpreadsheetError::Write(err.to_string())
    }
}

fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(Value::String(s.clone())),
        Data::Int(i) => Some(Value::from(*i)),
        Data::Float(f) => {
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                Some(Value::from(*f as i64))
            } else {
                Number::from_f64(*f).map(Value::Number)
            }
        }
        Data::Bool(b) => Some(Value::Bool(*b)),
        other => Some(Value::String(other.to_string())),
    }
}

/// Reads the first sheet into rows.
pub fn decode(bytes: &[u8]) -> Result<Vec<Row>, SpreadsheetError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| SpreadsheetError::Read(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoSheet)?
        .map_err(|e| SpreadsheetError::Read(e.to_string()))?;

    let mut lines = range.rows();
    let Some(header_cells) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<Option<String>> = header_cells
        .iter()
        .map(|cell| {
            let name = cell.to_string();
            let name = name.trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect();

    let mut rows = lines
        .map(|cells| {
            cells
                .iter()
                .zip(headers.iter())
                .filter_map(|(cell, header)| {
                    let header = header.as_ref()?;
                    cell_value(cell).map(|value| (header.clone(), value))
                })
                .collect::<Row>()
        })
        .collect::<Vec<Row>>();

    // Blank rows inside the data keep their slot so row indexes match the
    // sheet; trailing ones carry nothing.
    while rows.last().is_some_and(Row::is_empty) {
        rows.pop();
    }
    Ok(rows)
}

/// Writes rows to a single-sheet workbook. Header order is the order in
/// which field names are first seen across the rows.
pub fn encode(rows: &[Row], sheet_name: &str) -> Result<Vec<u8>, SpreadsheetError> {
    let mut headers: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key);
            }
        }
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name)?;

        for (col, header) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        }

        for (index, row) in rows.iter().enumerate() {
            let line = index as u32 + 1;
            for (col, header) in headers.iter().enumerate() {
                let col = col as u16;
                match row.get(*header) {
                    None | Some(Value::Null) => {}
                    Some(Value::String(s)) if s.is_empty() => {}
                    Some(Value::String(s)) => {
                        sheet.write_string(line, col, s)?;
                    }
                    Some(Value::Number(n)) => {
                        let number = n.as_f64().ok_or_else(|| SpreadsheetError::Row {
                            index,
                            message: format!("{} is not representable as a number", header),
                        })?;
                        sheet.write_number(line, col, number)?;
                    }
                    Some(Value::Bool(b)) => {
                        sheet.write_boolean(line, col, *b)?;
                    }
                    Some(nested) => {
                        sheet.write_string(line, col, nested.to_string())?;
                    }
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Serializes records into rows using their JSON field names.
pub fn to_rows<T: Serialize>(records: &[T]) -> Result<Vec<Row>, SpreadsheetError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| match serde_json::to_value(record) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(SpreadsheetError::Row {
                index,
                message: "record is not an object".to_string(),
            }),
            Err(e) => Err(SpreadsheetError::Row {
                index,
                message: e.to_string(),
            }),
        })
        .collect()
}

/// Cells typed by the spreadsheet rarely match the target field: a model
/// number comes back as an integer, a quantity as text. Numeric fields get
/// numbers, everything else gets strings.
fn coerce(row: &Row, numeric_fields: &[&str]) -> Value {
    let coerced = row
        .iter()
        .map(|(key, value)| {
            let value = if numeric_fields.contains(&key.as_str()) {
                match value {
                    Value::String(s) => s
                        .trim()
                        .parse::<i64>()
                        .map(Value::from)
                        .ok()
                        .or_else(|| {
                            s.trim()
                                .parse::<f64>()
                                .ok()
                                .and_then(Number::from_f64)
                                .map(Value::Number)
                        })
                        .unwrap_or_else(|| value.clone()),
                    _ => value.clone(),
                }
            } else {
                match value {
                    Value::Number(n) => Value::String(n.to_string()),
                    Value::Bool(b) => Value::String(b.to_string()),
                    _ => value.clone(),
                }
            };
            (key.clone(), value)
        })
        .collect::<Row>();
    Value::Object(coerced)
}

fn from_row<T: DeserializeOwned>(
    row: &Row,
    index: usize,
    numeric_fields: &[&str],
) -> Result<T, SpreadsheetError> {
    serde_json::from_value(coerce(row, numeric_fields)).map_err(|e| SpreadsheetError::Row {
        index,
        message: e.to_string(),
    })
}

pub fn row_to_item_draft(row: &Row, index: usize) -> Result<ItemDraft, SpreadsheetError> {
    from_row(row, index, ITEM_NUMERIC_FIELDS)
}

pub fn row_to_bom_draft(row: &Row, index: usize) -> Result<BomLineDraft, SpreadsheetError> {
    from_row(row, index, BOM_NUMERIC_FIELDS)
}

/// Imports an item workbook row by row. Rows carrying `sequenceNo` keep it;
/// the rest are auto-numbered.
#[instrument(skip(service, bytes), fields(size = bytes.len()))]
pub async fn import_items(service: &ItemService, bytes: &[u8]) -> Result<BulkResult, ServiceError> {
    let rows = decode(bytes)?;
    let mut result = BulkResult::default();

    for (index, row) in rows.iter().enumerate() {
        if row.is_empty() {
            continue;
        }
        let outcome = match row_to_item_draft(row, index) {
            Ok(draft) => service.create_from_draft(draft).await.map(|item| item.id),
            Err(e) => Err(e.into()),
        };
        result.record(index, None, outcome);
    }

    REGISTRY_METRICS
        .spreadsheet_rows_imported
        .inc_by(result.succeeded.len() as u64);
    info!(
        rows = rows.len(),
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        "Item workbook imported"
    );
    Ok(result)
}

#[instrument(skip(service, bytes), fields(size = bytes.len()))]
pub async fn import_bom_lines(service: &BomService, bytes: &[u8]) -> Result<BulkResult, ServiceError> {
    let rows = decode(bytes)?;
    let mut result = BulkResult::default();

    for (index, row) in rows.iter().enumerate() {
        if row.is_empty() {
            continue;
        }
        let outcome = match row_to_bom_draft(row, index) {
            Ok(draft) => service.create_line(draft).await.map(|line| line.id),
            Err(e) => Err(e.into()),
        };
        result.record(index, None, outcome);
    }

    REGISTRY_METRICS
        .spreadsheet_rows_imported
        .inc_by(result.succeeded.len() as u64);
    info!(
        rows = rows.len(),
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        "BOM workbook imported"
    );
    Ok(result)
}

/// Encodes any list of records as a workbook.
pub fn export<T: Serialize>(records: &[T], sheet_name: &str) -> Result<Vec<u8>, ServiceError> {
    let rows = to_rows(records)?;
    Ok(encode(&rows, sheet_name)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn round_trip_preserves_scalar_cells() {
        let rows = vec![
            row(json!({"name": "Busbar", "qty": 3, "ratio": 0.25, "active": true})),
            row(json!({"name": "Tab", "qty": -12, "ratio": 1.5, "active": false})),
            row(json!({"name": "Cell", "note": "only here"})),
        ];
        let bytes = encode(&rows, "Items").unwrap();
        assert_eq!(decode(&bytes).unwrap(), rows);
    }

    #[test]
    fn blank_rows_keep_their_slot() {
        let rows = vec![
            row(json!({"name": "Busbar"})),
            Row::new(),
            row(json!({"name": "Tab"})),
        ];
        let decoded = decode(&encode(&rows, "S").unwrap()).unwrap();
        assert_eq!(decoded.len(), 3);
        assert!(decoded[1].is_empty());
        assert_eq!(decoded[2]["name"], "Tab");
    }

    #[test]
    fn header_follows_first_seen_order() {
        let rows = vec![
            row(json!({"b": "1", "a": "2"})),
            row(json!({"c": "3", "a": "4"})),
        ];
        let decoded = decode(&encode(&rows, "Sheet1").unwrap()).unwrap();
        let keys: Vec<&str> = decoded[1].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "c"]);
        let first: Vec<&str> = decoded[0].keys().map(String::as_str).collect();
        assert_eq!(first, vec!["b", "a"]);
    }

    #[test]
    fn integral_floats_decode_as_integers() {
        let rows = vec![row(json!({"n": 2.0}))];
        let decoded = decode(&encode(&rows, "S").unwrap()).unwrap();
        assert_eq!(decoded[0]["n"], json!(2));
    }

    #[test]
    fn empty_values_are_omitted() {
        let rows = vec![row(json!({"a": "x", "b": "", "c": null}))];
        let decoded = decode(&encode(&rows, "S").unwrap()).unwrap();
        assert_eq!(decoded, vec![row(json!({"a": "x"}))]);
    }

    #[test]
    fn garbage_bytes_are_a_read_error() {
        assert_matches!(decode(b"not a workbook"), Err(SpreadsheetError::Read(_)));
        let err: ServiceError = SpreadsheetError::NoSheet.into();
        assert_matches!(err, ServiceError::Spreadsheet(_));
    }

    #[test]
    fn invalid_sheet_name_is_a_write_error() {
        assert_matches!(encode(&[], "bad/name"), Err(SpreadsheetError::Write(_)));
    }

    #[test]
    fn item_rows_coerce_cell_types() {
        let draft = row_to_item_draft(
            &row(json!({
                "no": "17",
                "division": "A",
                "industry": "E",
                "partGroup": "B00",
                "itemName": "Busbar",
                "model": 4680,
                "electronicCode": "ignored"
            })),
            0,
        )
        .unwrap();
        assert_eq!(draft.sequence_no, Some(17));
        assert_eq!(draft.model.as_deref(), Some("4680"));
        assert_eq!(draft.industry_code, "E");
    }

    #[test]
    fn bom_rows_coerce_quantity_and_level() {
        let draft = row_to_bom_draft(
            &row(json!({
                "lineNo": 3,
                "level": "2",
                "quantity": 0.5,
                "electronicCode": "A-E-A00-00001A",
                "itemName": "S/Can"
            })),
            0,
        )
        .unwrap();
        assert_eq!(draft.level, Some(2));
        assert_eq!(draft.quantity, Some(rust_decimal_macros::dec!(0.5)));
    }

    #[test]
    fn bad_row_reports_its_index() {
        let err = row_to_bom_draft(&row(json!({"level": "high"})), 4).unwrap_err();
        assert_matches!(err, SpreadsheetError::Row { index: 4, .. });
    }
}
