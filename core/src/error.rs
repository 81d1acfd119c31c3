use thiserror::Error;

#[derive(Debug, Error)]
pub enum DalError {
    /// 建立连接池或 ping 失败
    #[error("Database connection error: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// 在 connect 之前调用了需要连接的操作
    #[error("Database is not connected, call connect() first")]
    NotConnected,
    #[error("{0} requires at least one column")]
    EmptyInput(&'static str),
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    /// 严格列策略下，批量中的某一行与第一行的列集合不一致
    #[error("Row {row} of batch does not match the column set at column {column:?}")]
    InconsistentBatch { row: usize, column: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// 复合值（JSON / 数组 / 嵌套 Row）序列化失败
    #[error("Failed to serialize value of column {column:?}: {source}")]
    Serialization {
        column: String,
        #[source]
        source: serde_json::Error,
    },
    /// 严格映射模式下字段类型不匹配
    #[error(
        "Row {row}: column {column:?} cannot be assigned to field `{field}` (expected {expected}, found {found})"
    )]
    TypeMismatch {
        row: usize,
        column: String,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, DalError>;
