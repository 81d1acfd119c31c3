//! 动态值类型
//!
//! `Value` 是列值的带标签变体表示，替代 "任意类型" 容器；
//! `FromValue` / `ToValue` 负责与记录字段类型之间的转换。

use crate::row::Row;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// 列值
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Numeric(BigDecimal),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    /// TIMESTAMPTZ
    Timestamp(DateTime<Utc>),
    /// TIMESTAMP（无时区）
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    /// TIME（无时区）
    Time(NaiveTime),
    Json(serde_json::Value),
    Array(Vec<Value>),
    Map(Row),
}

impl Value {
    /// 值的类型名，用于错误信息和跳过报告
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Numeric(_) => "numeric",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Timestamp(_) => "timestamptz",
            Value::DateTime(_) => "timestamp",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 复合值在绑定前需要序列化为 JSON
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Json(_) | Value::Array(_) | Value::Map(_))
    }

    /// 转换为 serde_json::Value
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Value::Json(v) => Ok(v.clone()),
            other => serde_json::to_value(other),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_value!(
    bool => Bool,
    i64 => Int,
    i32 => Int,
    i16 => Int,
    i8 => Int,
    u32 => Int,
    u16 => Int,
    u8 => Int,
    f64 => Float,
    f32 => Float,
    BigDecimal => Numeric,
    String => Text,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
    NaiveDateTime => DateTime,
    NaiveDate => Date,
    NaiveTime => Time,
    serde_json::Value => Json,
    Vec<Value> => Array,
    Row => Map,
);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// 字段赋值时的类型不匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMismatch {
    pub expected: &'static str,
    pub found: &'static str,
}

impl TypeMismatch {
    pub fn new(expected: &'static str, found: &Value) -> Self {
        Self {
            expected,
            found: found.kind(),
        }
    }
}

/// 从 `Value` 还原为字段类型
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, TypeMismatch>;
}

/// 将字段转换为 `Value`，用于 Record -> Row
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl<T> ToValue for T
where
    T: Clone + Into<Value>,
{
    fn to_value(&self) -> Value {
        self.clone().into()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! impl_from_value_exact {
    ($($ty:ty => $variant:ident, $name:literal);* $(;)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, TypeMismatch> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(TypeMismatch::new($name, &other)),
                    }
                }
            }
        )*
    };
}

impl_from_value_exact!(
    bool => Bool, "bool";
    i64 => Int, "int";
    String => Text, "text";
    Vec<u8> => Bytes, "bytes";
    Uuid => Uuid, "uuid";
    DateTime<Utc> => Timestamp, "timestamptz";
    NaiveDateTime => DateTime, "timestamp";
    NaiveDate => Date, "date";
    NaiveTime => Time, "time";
);

// 窄整数：超出范围视为不匹配
macro_rules! impl_from_value_narrow_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, TypeMismatch> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i).map_err(|_| TypeMismatch {
                            expected: $name,
                            found: "int (out of range)",
                        }),
                        other => Err(TypeMismatch::new($name, &other)),
                    }
                }
            }
        )*
    };
}

impl_from_value_narrow_int!(
    i32 => "int4",
    i16 => "int2",
    i8 => "int1",
    u32 => "uint4",
    u16 => "uint2",
    u8 => "uint1",
);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => Err(TypeMismatch::new("float", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Float(f) => Ok(f as f32),
            Value::Int(i) => Ok(i as f32),
            other => Err(TypeMismatch::new("float", &other)),
        }
    }
}

impl FromValue for BigDecimal {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Numeric(d) => Ok(d),
            Value::Int(i) => Ok(BigDecimal::from(i)),
            other => Err(TypeMismatch::new("numeric", &other)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Json(v) => Ok(v),
            other => other
                .to_json()
                .map_err(|_| TypeMismatch::new("json", &other)),
        }
    }
}

impl FromValue for Row {
    fn from_value(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Map(row) => Ok(row),
            other => Err(TypeMismatch::new("map", &other)),
        }
    }
}
