//! 条件子句构建
//!
//! 把 `Row` 变成 `col = $n` 片段，用 `AND`（WHERE）或 `,`（SET）连接。

use crate::coerce::{coerce, BindValue};
use crate::error::Result;
use crate::placeholder::Placeholders;
use crate::row::Row;
use crate::utils::check_column;

/// 片段连接方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    /// WHERE 子句
    And,
    /// SET 子句
    Comma,
}

impl Joiner {
    fn separator(self) -> &'static str {
        match self {
            Joiner::And => " AND ",
            Joiner::Comma => ", ",
        }
    }
}

/// 构建好的子句及其绑定值
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

impl Clause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// 按 `row` 的顺序生成 `col = $n` 片段，编号从 `placeholders` 当前位置继续
///
/// 空 `row` 产生空子句，由调用方决定是否允许。
pub fn build_clause(row: &Row, joiner: Joiner, placeholders: &mut Placeholders) -> Result<Clause> {
    let mut parts = Vec::with_capacity(row.len());
    let mut binds = Vec::with_capacity(row.len());

    for (column, value) in row.iter() {
        check_column(column)?;
        parts.push(format!("{} = {}", column, placeholders.next_marker()));
        binds.push(coerce(column, value)?);
    }

    Ok(Clause {
        sql: parts.join(joiner.separator()),
        binds,
    })
}
