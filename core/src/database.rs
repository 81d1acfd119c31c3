//! 数据访问门面

use crate::error::Result;
use crate::record::{Mapped, Record};
use crate::row::Row;
use crate::value::Value;
use async_trait::async_trait;

/// 写操作的执行结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
}

impl From<sqlx::postgres::PgQueryResult> for ExecResult {
    fn from(result: sqlx::postgres::PgQueryResult) -> Self {
        Self {
            rows_affected: result.rows_affected(),
        }
    }
}

/// 通用数据访问接口
///
/// 在 `connect` 成功之前，除 `connect` / `close` / `is_connected` 外的所有操作
/// 都返回 `DalError::NotConnected`。表名、列名与空输入在发往数据库之前校验。
#[async_trait]
pub trait Database: Send + Sync {
    /// 建立连接池；已连接时不做任何事
    async fn connect(&mut self) -> Result<()>;

    /// 关闭连接池，回到未连接状态
    async fn close(&mut self);

    fn is_connected(&self) -> bool;

    /// 插入一行，返回 `RETURNING *` 的结果
    async fn create(&self, table: &str, row: &Row) -> Result<Row>;

    /// 插入一个 Record，跳过 `skip_insert` 字段
    async fn create_with_record<R: Record>(&self, table: &str, record: &R) -> Result<Row>;

    /// 插入一个 Record，与 `conflict_columns` 冲突时更新其余列
    async fn create_or_update<R: Record>(
        &self,
        table: &str,
        record: &R,
        conflict_columns: &[&str],
    ) -> Result<Row>;

    /// 批量插入
    async fn create_batch(&self, table: &str, rows: &[Row]) -> Result<ExecResult>;

    /// 批量插入，与 `conflict_column` 冲突时更新其余列；各行的列集合必须一致
    async fn create_or_update_batch(
        &self,
        table: &str,
        rows: &[Row],
        conflict_column: &str,
    ) -> Result<ExecResult>;

    async fn update(&self, table: &str, set: &Row, filter: &Row) -> Result<ExecResult>;

    async fn delete(&self, table: &str, filter: &Row) -> Result<ExecResult>;

    /// 全表查询，`limit < 0` 表示不分页
    async fn get_all_to_map(&self, table: &str, limit: i64, offset: i64) -> Result<Vec<Row>>;

    async fn get_all_to_record<R: Record>(
        &self,
        table: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Mapped<R>>;

    /// 执行任意查询，参数按 `$1, $2, ...` 顺序绑定
    async fn execute_select_to_map(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    async fn execute_select_to_record<R: Record>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Mapped<R>>;

    /// 执行任意写语句
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult>;
}
