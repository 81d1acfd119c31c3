//! PgRow 解码
//!
//! 按列的 PostgreSQL 类型名解码为 [`Value`]，SQL NULL 统一为 `Value::Null`，
//! 数组元素中的 NULL 同样如此。

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgHasArrayType, PgRow};
use sqlx::{Column, Decode, Row as _, Type, TypeInfo, ValueRef};
use uuid::Uuid;

/// 结果集的列名
pub fn column_names(row: &PgRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// 解码第 `index` 列
///
/// 无法按类型解码的列（INET、多维数组、自定义类型等）返回驱动给出的原始字节 `Value::Bytes`。
pub fn decode_column(row: &PgRow, index: usize) -> Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    match decode_typed(row, index, raw.type_info().name())? {
        Some(value) => Ok(value),
        None => Ok(Value::Bytes(
            raw.as_bytes().map_err(sqlx::Error::Decode)?.to_vec(),
        )),
    }
}

fn decode_typed(row: &PgRow, index: usize, type_name: &str) -> Result<Option<Value>> {
    let value = match type_name {
        "BOOL" => Value::Bool(row.try_get::<bool, _>(index)?),
        "INT2" => Value::Int(row.try_get::<i16, _>(index)?.into()),
        "INT4" => Value::Int(row.try_get::<i32, _>(index)?.into()),
        "INT8" => Value::Int(row.try_get::<i64, _>(index)?),
        "FLOAT4" => Value::Float(row.try_get::<f32, _>(index)?.into()),
        "FLOAT8" => Value::Float(row.try_get::<f64, _>(index)?),
        "NUMERIC" => Value::Numeric(row.try_get::<BigDecimal, _>(index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Value::Text(row.try_get::<String, _>(index)?),
        // 单字节的 "char"
        "\"CHAR\"" => Value::Text(char::from(row.try_get::<i8, _>(index)? as u8).to_string()),
        "BYTEA" => Value::Bytes(row.try_get::<Vec<u8>, _>(index)?),
        "UUID" => Value::Uuid(row.try_get::<Uuid, _>(index)?),
        "TIMESTAMPTZ" => Value::Timestamp(row.try_get::<DateTime<Utc>, _>(index)?),
        "TIMESTAMP" => Value::DateTime(row.try_get::<NaiveDateTime, _>(index)?),
        "DATE" => Value::Date(row.try_get::<NaiveDate, _>(index)?),
        "TIME" => Value::Time(row.try_get::<NaiveTime, _>(index)?),
        "INTERVAL" => {
            let interval = row.try_get::<PgInterval, _>(index)?;
            Value::Text(format_interval(
                interval.months,
                interval.days,
                interval.microseconds,
            ))
        }
        "JSON" | "JSONB" => Value::Json(row.try_get::<serde_json::Value, _>(index)?),
        "BOOL[]" => return decode_array::<bool>(row, index),
        "INT2[]" => return decode_array::<i16>(row, index),
        "INT4[]" => return decode_array::<i32>(row, index),
        "INT8[]" => return decode_array::<i64>(row, index),
        "FLOAT4[]" => return decode_array::<f32>(row, index),
        "FLOAT8[]" => return decode_array::<f64>(row, index),
        "NUMERIC[]" => return decode_array::<BigDecimal>(row, index),
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => return decode_array::<String>(row, index),
        "UUID[]" => return decode_array::<Uuid>(row, index),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// 一维数组，元素 NULL 对应 `Value::Null`；多维数组返回 `None`
fn decode_array<T>(row: &PgRow, index: usize) -> Result<Option<Value>>
where
    T: for<'r> Decode<'r, sqlx::Postgres> + Type<sqlx::Postgres> + PgHasArrayType + Into<Value>,
{
    match row.try_get::<Vec<Option<T>>, _>(index) {
        Ok(items) => Ok(Some(Value::Array(
            items.into_iter().map(Value::from).collect(),
        ))),
        Err(sqlx::Error::ColumnDecode { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// INTERVAL 按 ISO 8601 时长格式输出，如 `P1Y2M3DT4H5M6.5S`
pub fn format_interval(months: i32, days: i32, microseconds: i64) -> String {
    if months == 0 && days == 0 && microseconds == 0 {
        return "PT0S".to_string();
    }

    let mut out = String::from("P");
    let (years, months) = (months / 12, months % 12);
    if years != 0 {
        out.push_str(&format!("{}Y", years));
    }
    if months != 0 {
        out.push_str(&format!("{}M", months));
    }
    if days != 0 {
        out.push_str(&format!("{}D", days));
    }
    if microseconds == 0 {
        return out;
    }

    out.push('T');
    let sign = if microseconds < 0 { "-" } else { "" };
    let micros = microseconds.unsigned_abs();
    let hours = micros / 3_600_000_000;
    let minutes = micros / 60_000_000 % 60;
    let seconds = micros / 1_000_000 % 60;
    let fraction = micros % 1_000_000;
    if hours != 0 {
        out.push_str(&format!("{}{}H", sign, hours));
    }
    if minutes != 0 {
        out.push_str(&format!("{}{}M", sign, minutes));
    }
    if seconds != 0 || fraction != 0 {
        out.push_str(sign);
        out.push_str(&seconds.to_string());
        if fraction != 0 {
            let digits = format!("{:06}", fraction);
            out.push('.');
            out.push_str(digits.trim_end_matches('0'));
        }
        out.push('S');
    }
    out
}

/// 按列位置解码整行
pub fn decode_values(row: &PgRow) -> Result<Vec<Value>> {
    (0..row.len()).map(|i| decode_column(row, i)).collect()
}

/// 解码为列名 -> 值的 `Row`
pub fn decode_row(row: &PgRow) -> Result<Row> {
    let mut out = Row::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        out.insert(column.name(), decode_column(row, index)?);
    }
    Ok(out)
}

/// 解码整个结果集
pub fn decode_rows(rows: &[PgRow]) -> Result<Vec<Row>> {
    rows.iter().map(decode_row).collect()
}
