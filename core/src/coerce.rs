//! 值转换：把 `Value` 变成可以绑定到 sqlx 查询上的 `BindValue`
//!
//! 标量原样透传（包括 NULL），复合值（JSON / 数组 / 嵌套 Row）先序列化为 JSON。

use crate::error::{DalError, Result};
use crate::value::Value;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgTypeInfo, Postgres};
use uuid::Uuid;

/// 绑定值，用于安全地传递参数
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Numeric(BigDecimal),
    /// 以 TEXT 类型绑定。参数总是以二进制格式发送，无法再由服务端推断为
    /// date、uuid 等类型；这类列请使用对应的 `Value` 变体，或在 SQL 中写 `$1::date`
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    /// 复合值序列化后的 JSON，以 JSONB 参数绑定
    Json(serde_json::Value),
}

impl BindValue {
    /// SQL 字面量形式，仅用于日志与调试
    pub fn to_sql_value(&self) -> String {
        match self {
            BindValue::Null => "NULL".to_string(),
            BindValue::Bool(b) => b.to_string(),
            BindValue::Int(i) => i.to_string(),
            BindValue::Float(f) => f.to_string(),
            BindValue::Numeric(d) => d.to_string(),
            BindValue::Text(s) => quote_literal(s),
            BindValue::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
                format!("'\\x{}'", hex)
            }
            BindValue::Uuid(u) => format!("'{}'", u),
            BindValue::Timestamp(t) => format!("'{}'", t.to_rfc3339()),
            BindValue::DateTime(t) => format!("'{}'", t),
            BindValue::Date(d) => format!("'{}'", d),
            BindValue::Time(t) => format!("'{}'", t),
            BindValue::Json(v) => quote_literal(&v.to_string()),
        }
    }

    /// JSON 值的规范文本编码
    pub fn json_text(&self) -> Option<String> {
        match self {
            BindValue::Json(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// 转换单个值；`column` 只用于错误信息
pub fn coerce(column: &str, value: &Value) -> Result<BindValue> {
    let bind = match value {
        Value::Null => BindValue::Null,
        Value::Bool(b) => BindValue::Bool(*b),
        Value::Int(i) => BindValue::Int(*i),
        Value::Float(f) => BindValue::Float(*f),
        Value::Numeric(d) => BindValue::Numeric(d.clone()),
        Value::Text(s) => BindValue::Text(s.clone()),
        Value::Bytes(b) => BindValue::Bytes(b.clone()),
        Value::Uuid(u) => BindValue::Uuid(*u),
        Value::Timestamp(t) => BindValue::Timestamp(*t),
        Value::DateTime(t) => BindValue::DateTime(*t),
        Value::Date(d) => BindValue::Date(*d),
        Value::Time(t) => BindValue::Time(*t),
        Value::Json(_) | Value::Array(_) | Value::Map(_) => {
            let json = value.to_json().map_err(|source| DalError::Serialization {
                column: column.to_string(),
                source,
            })?;
            BindValue::Json(json)
        }
    };
    Ok(bind)
}

/// 转换原始 SQL 的参数列表，错误信息中以 `$n` 标识参数
pub fn coerce_params(params: &[Value]) -> Result<Vec<BindValue>> {
    params
        .iter()
        .enumerate()
        .map(|(i, value)| coerce(&crate::placeholder::placeholder(i + 1), value))
        .collect()
}

/// 不带类型的 NULL：参数类型 OID 为 0，由 PostgreSQL 根据上下文推断，
/// 因此可以写入任意类型的列
struct UntypedNull;

impl sqlx::Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl sqlx::Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(
        &self,
        _buf: &mut PgArgumentBuffer,
    ) -> std::result::Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// 将绑定值按顺序应用到查询中
pub(crate) fn apply_binds<'q>(
    mut query: sqlx::query::Query<'q, Postgres, PgArguments>,
    binds: &'q [BindValue],
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    for bind in binds {
        query = match bind {
            BindValue::Null => query.bind(UntypedNull),
            BindValue::Bool(b) => query.bind(*b),
            BindValue::Int(i) => query.bind(*i),
            BindValue::Float(f) => query.bind(*f),
            BindValue::Numeric(d) => query.bind(d),
            BindValue::Text(s) => query.bind(s.as_str()),
            BindValue::Bytes(b) => query.bind(b.as_slice()),
            BindValue::Uuid(u) => query.bind(*u),
            BindValue::Timestamp(t) => query.bind(*t),
            BindValue::DateTime(t) => query.bind(*t),
            BindValue::Date(d) => query.bind(*d),
            BindValue::Time(t) => query.bind(*t),
            BindValue::Json(v) => query.bind(sqlx::types::Json(v)),
        };
    }
    query
}
