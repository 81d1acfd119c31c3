//! 语句构建
//!
//! 所有构建函数都是同步的：先校验表名、列名和输入是否为空，再生成 SQL 与绑定值。
//! 同一条语句内占位符编号从 `$1` 开始连续递增。

use crate::coerce::{coerce, BindValue};
use crate::columns::{ColumnPolicy, ColumnSet};
use crate::condition::{build_clause, Joiner};
use crate::error::{DalError, Result};
use crate::placeholder::Placeholders;
use crate::row::Row;
use crate::utils::{check_column, check_table};

/// 单条语句允许的绑定参数上限（协议中参数个数为 u16）
pub const MAX_BINDS: usize = u16::MAX as usize;

/// 绑定参数超过 [`MAX_BINDS`] 时返回 `InvalidArgument`
pub fn check_bind_count(count: usize) -> Result<()> {
    if count > MAX_BINDS {
        return Err(DalError::InvalidArgument(format!(
            "statement needs {} bind parameters, at most {} are allowed",
            count, MAX_BINDS
        )));
    }
    Ok(())
}

/// 生成好的语句：SQL 文本与按占位符顺序排列的绑定值
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, binds: Vec<BindValue>) -> Self {
        Self {
            sql: sql.into(),
            binds,
        }
    }

    /// 追加 ` RETURNING *`
    pub fn returning_all(mut self) -> Self {
        self.sql.push_str(" RETURNING *");
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }
}

/// 单行插入：`INSERT INTO t(a, b) VALUES ($1, $2) RETURNING *`
pub fn insert(table: &str, row: &Row) -> Result<Statement> {
    check_table(table)?;
    if row.is_empty() {
        return Err(DalError::EmptyInput("insert"));
    }
    check_bind_count(row.len())?;

    let mut placeholders = Placeholders::new();
    let mut columns = Vec::with_capacity(row.len());
    let mut markers = Vec::with_capacity(row.len());
    let mut binds = Vec::with_capacity(row.len());

    for (column, value) in row.iter() {
        check_column(column)?;
        columns.push(column);
        markers.push(placeholders.next_marker());
        binds.push(coerce(column, value)?);
    }

    let sql = format!(
        "INSERT INTO {}({}) VALUES ({})",
        table,
        columns.join(", "),
        markers.join(", ")
    );
    Ok(Statement::new(sql, binds).returning_all())
}

/// 批量插入：`INSERT INTO t(cols) VALUES (...), (...)`
///
/// 列清单由 [`ColumnSet`] 决定；某行缺少的列写入 `DEFAULT`，不占用占位符。
pub fn insert_batch(table: &str, rows: &[Row], policy: ColumnPolicy) -> Result<Statement> {
    check_table(table)?;
    let columns = ColumnSet::from_rows(rows, policy)?;
    let (values, binds) = batch_values(rows, &columns)?;

    let sql = format!(
        "INSERT INTO {}({}) VALUES {}",
        table,
        columns.joined(),
        values
    );
    Ok(Statement::new(sql, binds))
}

/// 批量插入或更新：在批量插入后追加
/// `ON CONFLICT (k) DO UPDATE SET c = EXCLUDED.c, ...`
///
/// SET 包含除冲突列以外的全部列；没有剩余列时生成 `DO NOTHING`。
/// 各行必须具有相同的列集合，否则返回 `InconsistentBatch`：
/// 缺列处的 `DEFAULT` 会在冲突时覆盖已有值。
pub fn upsert_batch(table: &str, rows: &[Row], conflict_columns: &[&str]) -> Result<Statement> {
    check_table(table)?;
    if conflict_columns.is_empty() {
        return Err(DalError::EmptyInput("upsert conflict target"));
    }
    for column in conflict_columns {
        check_column(column)?;
    }

    let columns = ColumnSet::from_rows(rows, ColumnPolicy::Strict)?;
    let (values, binds) = batch_values(rows, &columns)?;

    let updates: Vec<String> = columns
        .columns()
        .iter()
        .filter(|c| !conflict_columns.contains(&c.as_str()))
        .map(|c| format!("{} = EXCLUDED.{}", c, c))
        .collect();

    let action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    let sql = format!(
        "INSERT INTO {}({}) VALUES {} ON CONFLICT ({}) {}",
        table,
        columns.joined(),
        values,
        conflict_columns.join(", "),
        action
    );
    Ok(Statement::new(sql, binds))
}

/// 单行插入或更新，返回写入后的行
pub fn upsert(table: &str, row: &Row, conflict_columns: &[&str]) -> Result<Statement> {
    let rows = std::slice::from_ref(row);
    Ok(upsert_batch(table, rows, conflict_columns)?.returning_all())
}

fn batch_values(rows: &[Row], columns: &ColumnSet) -> Result<(String, Vec<BindValue>)> {
    let count = rows
        .iter()
        .map(|row| columns.columns().iter().filter(|c| row.contains_key(c)).count())
        .sum();
    check_bind_count(count)?;

    let mut placeholders = Placeholders::new();
    let mut tuples = Vec::with_capacity(rows.len());
    let mut binds = Vec::with_capacity(rows.len() * columns.len());

    for row in rows {
        let mut slots = Vec::with_capacity(columns.len());
        for column in columns.columns() {
            match row.get(column) {
                Some(value) => {
                    slots.push(placeholders.next_marker());
                    binds.push(coerce(column, value)?);
                }
                None => slots.push("DEFAULT".to_string()),
            }
        }
        tuples.push(format!("({})", slots.join(", ")));
    }

    Ok((tuples.join(", "), binds))
}

/// 更新：`UPDATE t SET a = $1 WHERE b = $2`，WHERE 编号紧接 SET
pub fn update(table: &str, set: &Row, filter: &Row) -> Result<Statement> {
    check_table(table)?;
    if set.is_empty() {
        return Err(DalError::EmptyInput("update set"));
    }
    if filter.is_empty() {
        return Err(DalError::EmptyInput("update condition"));
    }

    check_bind_count(set.len() + filter.len())?;
    let mut placeholders = Placeholders::new();
    let set_clause = build_clause(set, Joiner::Comma, &mut placeholders)?;
    let where_clause = build_clause(filter, Joiner::And, &mut placeholders)?;

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        table, set_clause.sql, where_clause.sql
    );
    let mut binds = set_clause.binds;
    binds.extend(where_clause.binds);
    Ok(Statement::new(sql, binds))
}

/// 删除：`DELETE FROM t WHERE a = $1 AND b = $2`
pub fn delete(table: &str, filter: &Row) -> Result<Statement> {
    check_table(table)?;
    if filter.is_empty() {
        return Err(DalError::EmptyInput("delete condition"));
    }
    check_bind_count(filter.len())?;

    let mut placeholders = Placeholders::new();
    let where_clause = build_clause(filter, Joiner::And, &mut placeholders)?;

    let sql = format!("DELETE FROM {} WHERE {}", table, where_clause.sql);
    Ok(Statement::new(sql, where_clause.binds))
}

/// 全表查询：`limit < 0` 不分页，否则追加 `LIMIT n OFFSET m`
pub fn select_all(table: &str, limit: i64, offset: i64) -> Result<Statement> {
    check_table(table)?;

    let mut sql = format!("SELECT * FROM {}", table);
    if limit >= 0 {
        if offset < 0 {
            return Err(DalError::InvalidArgument(format!(
                "offset must not be negative, got {}",
                offset
            )));
        }
        sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
    }
    Ok(Statement::new(sql, Vec::new()))
}
