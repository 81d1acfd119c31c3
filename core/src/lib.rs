//! PostgreSQL 通用数据访问层
//!
//! 根据表名和松散类型的输入（`Row` 或带 `#[derive(Record)]` 的结构体）生成参数化 SQL，
//! 并把结果集转换回 `Row` 或 Record。

pub mod coerce;
pub mod columns;
pub mod condition;
pub mod config;
pub mod database;
pub mod error;
pub mod mapper;
pub mod placeholder;
pub mod postgres;
pub mod record;
pub mod row;
pub mod statement;
pub mod utils;
pub mod value;

pub use coerce::BindValue;
pub use columns::{ColumnPolicy, ColumnSet};
pub use config::PgConfig;
pub use database::{Database, ExecResult};
pub use postgres::Postgres;
pub use record::{records_from_rows, FieldMeta, FieldSkip, Mapped, MappingMode, Record, RecordMapper};
pub use row::Row;
pub use statement::Statement;
pub use value::{FromValue, ToValue, TypeMismatch, Value};

// 重新导出 derive 宏
pub use error::{DalError, Result};
pub use pgdal_derive::*;
