//! PostgreSQL 实现

use crate::coerce::{apply_binds, coerce_params};
use crate::columns::ColumnPolicy;
use crate::config::PgConfig;
use crate::database::{Database, ExecResult};
use crate::error::{DalError, Result};
use crate::mapper;
use crate::record::{Mapped, MappingMode, Record, RecordMapper};
use crate::row::Row;
use crate::statement::{self, Statement};
use crate::value::Value;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};

/// 基于 sqlx 连接池的 [`Database`] 实现
///
/// ```rust,ignore
/// let mut db = Postgres::new(PgConfig::from_env()?);
/// db.connect().await?;
/// let user = db.create("users", &row! { "name" => "a" }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Postgres {
    config: PgConfig,
    pool: Option<PgPool>,
    column_policy: ColumnPolicy,
    mapping_mode: MappingMode,
}

impl Postgres {
    pub fn new(config: PgConfig) -> Self {
        Self {
            config,
            pool: None,
            column_policy: ColumnPolicy::default(),
            mapping_mode: MappingMode::default(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(PgConfig::from_env()?))
    }

    /// 使用已有连接池，直接处于已连接状态
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool: Some(pool),
            ..Self::new(PgConfig::default())
        }
    }

    /// 批量插入的列策略，批量插入或更新始终按严格策略
    pub fn with_column_policy(mut self, policy: ColumnPolicy) -> Self {
        self.column_policy = policy;
        self
    }

    /// Record 映射的类型不匹配处理方式
    pub fn with_mapping_mode(mut self, mode: MappingMode) -> Self {
        self.mapping_mode = mode;
        self
    }

    pub fn config(&self) -> &PgConfig {
        &self.config
    }

    pub fn pool(&self) -> Result<&PgPool> {
        self.pool.as_ref().ok_or(DalError::NotConnected)
    }

    async fn fetch_all(&self, stmt: &Statement) -> Result<Vec<PgRow>> {
        let pool = self.pool()?;
        tracing::debug!(sql = %stmt.sql, binds = stmt.binds.len(), "Executing query");
        apply_binds(sqlx::query(&stmt.sql), &stmt.binds)
            .fetch_all(pool)
            .await
            .map_err(|e| driver_error(stmt, e))
    }

    async fn fetch_one(&self, stmt: &Statement) -> Result<PgRow> {
        let pool = self.pool()?;
        tracing::debug!(sql = %stmt.sql, binds = stmt.binds.len(), "Executing query");
        apply_binds(sqlx::query(&stmt.sql), &stmt.binds)
            .fetch_one(pool)
            .await
            .map_err(|e| driver_error(stmt, e))
    }

    async fn run(&self, stmt: &Statement) -> Result<ExecResult> {
        let pool = self.pool()?;
        tracing::debug!(sql = %stmt.sql, binds = stmt.binds.len(), "Executing statement");
        let result = apply_binds(sqlx::query(&stmt.sql), &stmt.binds)
            .execute(pool)
            .await
            .map_err(|e| driver_error(stmt, e))?;
        Ok(result.into())
    }

    async fn fetch_rows(&self, stmt: &Statement) -> Result<Vec<Row>> {
        let rows = self.fetch_all(stmt).await?;
        mapper::decode_rows(&rows)
    }

    async fn fetch_records<R: Record>(&self, stmt: &Statement) -> Result<Mapped<R>> {
        let rows = self.fetch_all(stmt).await?;
        let Some(first) = rows.first() else {
            return Ok(Mapped::default());
        };

        let columns = mapper::column_names(first);
        let values = rows
            .iter()
            .map(mapper::decode_values)
            .collect::<Result<Vec<_>>>()?;
        RecordMapper::<R>::new(&columns, self.mapping_mode).map_all(values)
    }

    fn raw(&self, sql: &str, params: &[Value]) -> Result<Statement> {
        self.pool()?;
        statement::check_bind_count(params.len())?;
        Ok(Statement::new(sql, coerce_params(params)?))
    }
}

fn driver_error(stmt: &Statement, error: sqlx::Error) -> DalError {
    tracing::error!(sql = %stmt.sql, error = %error, "Statement failed");
    DalError::Database(error)
}

#[async_trait]
impl Database for Postgres {
    async fn connect(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let options = self.config.connect_options()?;
        let host = options.get_host().to_string();
        let database = options.get_database().map(str::to_string);

        let pool = self
            .config
            .pool_options()?
            .connect_with(options)
            .await
            .map_err(DalError::Connection)?;
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(DalError::Connection)?;

        tracing::info!(host = %host, database = ?database, "Connected to PostgreSQL");
        self.pool = Some(pool);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            tracing::info!("PostgreSQL connection pool closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    async fn create(&self, table: &str, row: &Row) -> Result<Row> {
        self.pool()?;
        let stmt = statement::insert(table, row)?;
        let row = self.fetch_one(&stmt).await?;
        mapper::decode_row(&row)
    }

    async fn create_with_record<R: Record>(&self, table: &str, record: &R) -> Result<Row> {
        self.create(table, &record.to_row()).await
    }

    async fn create_or_update<R: Record>(
        &self,
        table: &str,
        record: &R,
        conflict_columns: &[&str],
    ) -> Result<Row> {
        self.pool()?;
        let stmt = statement::upsert(table, &record.to_row(), conflict_columns)?;
        let row = self.fetch_one(&stmt).await?;
        mapper::decode_row(&row)
    }

    async fn create_batch(&self, table: &str, rows: &[Row]) -> Result<ExecResult> {
        self.pool()?;
        let stmt = statement::insert_batch(table, rows, self.column_policy)?;
        self.run(&stmt).await
    }

    async fn create_or_update_batch(
        &self,
        table: &str,
        rows: &[Row],
        conflict_column: &str,
    ) -> Result<ExecResult> {
        self.pool()?;
        let stmt = statement::upsert_batch(table, rows, &[conflict_column])?;
        self.run(&stmt).await
    }

    async fn update(&self, table: &str, set: &Row, filter: &Row) -> Result<ExecResult> {
        self.pool()?;
        let stmt = statement::update(table, set, filter)?;
        self.run(&stmt).await
    }

    async fn delete(&self, table: &str, filter: &Row) -> Result<ExecResult> {
        self.pool()?;
        let stmt = statement::delete(table, filter)?;
        self.run(&stmt).await
    }

    async fn get_all_to_map(&self, table: &str, limit: i64, offset: i64) -> Result<Vec<Row>> {
        self.pool()?;
        let stmt = statement::select_all(table, limit, offset)?;
        self.fetch_rows(&stmt).await
    }

    async fn get_all_to_record<R: Record>(
        &self,
        table: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Mapped<R>> {
        self.pool()?;
        let stmt = statement::select_all(table, limit, offset)?;
        self.fetch_records(&stmt).await
    }

    async fn execute_select_to_map(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let stmt = self.raw(sql, params)?;
        self.fetch_rows(&stmt).await
    }

    async fn execute_select_to_record<R: Record>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Mapped<R>> {
        let stmt = self.raw(sql, params)?;
        self.fetch_records(&stmt).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        let stmt = self.raw(sql, params)?;
        self.run(&stmt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[tokio::test]
    async fn test_operations_require_connect() {
        let db = Postgres::new(PgConfig::default());
        assert!(!db.is_connected());

        let err = db.create("users", &row! { "a" => 1 }).await.unwrap_err();
        assert!(matches!(err, DalError::NotConnected));

        let err = db.execute("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, DalError::NotConnected));

        let err = db.get_all_to_map("users", -1, 0).await.unwrap_err();
        assert!(matches!(err, DalError::NotConnected));
    }

    #[tokio::test]
    async fn test_not_connected_checked_before_validation() {
        let db = Postgres::new(PgConfig::default());
        let err = db.delete("users", &Row::new()).await.unwrap_err();
        assert!(matches!(err, DalError::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let mut db = Postgres::new(PgConfig::from_url("mysql://localhost/db"));
        let err = db.connect().await.unwrap_err();
        assert!(matches!(err, DalError::Config(_)));
        assert!(!db.is_connected());
    }

    #[tokio::test]
    async fn test_close_when_disconnected() {
        let mut db = Postgres::new(PgConfig::default());
        db.close().await;
        assert!(!db.is_connected());
    }

    #[tokio::test]
    async fn test_raw_params_over_limit() {
        // 懒连接池：参数个数在访问数据库之前就被拒绝
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/pgdal")
            .unwrap();
        let db = Postgres::from_pool(pool);
        let params = vec![Value::Int(1); statement::MAX_BINDS + 1];
        let err = db.execute("SELECT 1", &params).await.unwrap_err();
        assert!(matches!(err, DalError::InvalidArgument(_)));
    }

    #[test]
    fn test_builder_options() {
        let db = Postgres::new(PgConfig::default())
            .with_column_policy(ColumnPolicy::Strict)
            .with_mapping_mode(MappingMode::Strict);
        assert_eq!(db.column_policy, ColumnPolicy::Strict);
        assert_eq!(db.mapping_mode, MappingMode::Strict);
        assert!(matches!(db.pool(), Err(DalError::NotConnected)));
    }
}
