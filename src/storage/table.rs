//! Column-typed tabular data written to the record table

use crate::types::record::RawRecord;
use bytes::BytesMut;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

/// Inferred column type, mapped onto SQL like a dataframe writer would
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
}

impl ColumnType {
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Cell {
    /// Convert a JSON value; nested values are stored as their JSON text
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Int(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
            },
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    fn column_type(&self) -> ColumnType {
        match self {
            Cell::Int(_) => ColumnType::Integer,
            Cell::Float(_) | Cell::Null => ColumnType::Float,
            Cell::Text(_) => ColumnType::Text,
        }
    }
}

impl ToSql for Cell {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Cell::Null => Ok(IsNull::Yes),
            Cell::Int(v) => match *ty {
                Type::INT8 => v.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ => v.to_string().to_sql(ty, out),
            },
            Cell::Float(v) => match *ty {
                Type::FLOAT8 => v.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => v.to_string().to_sql(ty, out),
                Type::INT8 | Type::INT4 => match whole_number(*v) {
                    Some(i) => Cell::Int(i).to_sql(ty, out),
                    None => Err(format!("cannot store float {} in a {} column", v, ty).into()),
                },
                _ => Err(format!("cannot store float {} in a {} column", v, ty).into()),
            },
            Cell::Text(v) => match *ty {
                Type::TEXT | Type::VARCHAR => v.to_sql(ty, out),
                _ => Err(format!("cannot store text {:?} in a {} column", v, ty).into()),
            },
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT8 | Type::INT4 | Type::FLOAT8 | Type::FLOAT4 | Type::TEXT | Type::VARCHAR
        )
    }

    to_sql_checked!();
}

/// Integral floats (e.g. 65.0) fit integer columns, as an SQL assignment cast
fn whole_number(v: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

/// Named, typed columns and row-major cells
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Single-row table from a record, columns in record order
    pub fn from_record(record: &RawRecord) -> Self {
        let cells: Vec<Cell> = record.values().map(Cell::from_json).collect();
        let columns = record
            .keys()
            .zip(&cells)
            .map(|(name, cell)| Column {
                name: name.clone(),
                ty: cell.column_type(),
            })
            .collect();

        Self {
            columns,
            rows: vec![cells],
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Double-quoted SQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
