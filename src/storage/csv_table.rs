//! CSV decoding with per-column type inference

use crate::error::StorageError;
use crate::storage::table::{Cell, Column, ColumnType, Table};
use csv::{ReaderBuilder, StringRecord, Trim};

/// Parse CSV bytes into a typed table.
///
/// A column is integer when every non-empty cell parses as `i64`, float
/// when every non-empty cell parses as `f64`, and text otherwise. Empty
/// cells are NULL and turn an integer column into a float one.
pub fn parse_csv(bytes: &[u8]) -> Result<Table, StorageError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(StorageError::Csv("no header row".into()));
    }

    let records = reader
        .records()
        .collect::<Result<Vec<StringRecord>, _>>()?;

    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| Column {
            name: name.to_string(),
            ty: infer_type(records.iter().map(|r| r.get(i).unwrap_or(""))),
        })
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .enumerate()
                .map(|(i, column)| to_cell(record.get(i).unwrap_or(""), column.ty))
                .collect()
        })
        .collect();

    Ok(Table { columns, rows })
}

fn infer_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut integer = true;
    let mut float = true;
    let mut has_null = false;

    for value in values {
        if value.is_empty() {
            has_null = true;
            continue;
        }
        if integer && value.parse::<i64>().is_err() {
            integer = false;
        }
        if float && value.parse::<f64>().is_err() {
            float = false;
        }
        if !float {
            return ColumnType::Text;
        }
    }

    if integer && !has_null {
        ColumnType::Integer
    } else {
        ColumnType::Float
    }
}

fn to_cell(value: &str, ty: ColumnType) -> Cell {
    if value.is_empty() {
        return Cell::Null;
    }
    match ty {
        ColumnType::Integer => value.parse().map(Cell::Int).unwrap_or(Cell::Null),
        ColumnType::Float => value.parse().map(Cell::Float).unwrap_or(Cell::Null),
        ColumnType::Text => Cell::Text(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "age,anaemia,platelets,note,DEATH_EVENT\n\
                          75,0,265000,a,1\n\
                          55,0,263358.03,,0\n\
                          65,1,162000,c,\n";

    #[test]
    fn test_parses_headers_and_rows() {
        let table = parse_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            table.column_names(),
            vec!["age", "anaemia", "platelets", "note", "DEATH_EVENT"]
        );
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_infers_column_types() {
        let table = parse_csv(SAMPLE.as_bytes()).unwrap();
        let types: Vec<ColumnType> = table.columns.iter().map(|c| c.ty).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::Integer,
                ColumnType::Integer,
                ColumnType::Float,
                ColumnType::Text,
                // empty cell forces float
                ColumnType::Float,
            ]
        );
        assert_eq!(table.rows[0][0], Cell::Int(75));
        assert_eq!(table.rows[1][2], Cell::Float(263358.03));
        assert_eq!(table.rows[1][3], Cell::Null);
        assert_eq!(table.rows[2][4], Cell::Null);
        assert_eq!(table.rows[0][4], Cell::Float(1.0));
    }

    #[test]
    fn test_header_only_csv_has_no_rows() {
        let table = parse_csv(b"age,sex\n").unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.columns.len(), 2);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(parse_csv(b""), Err(StorageError::Csv(_))));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        assert!(parse_csv(b"a,b\n1,2\n3\n").is_err());
    }
}
