//! 批量插入的列集合归一化
//!
//! 一个批次中的各行可能有不同的列（可选列）。这里决定整条 INSERT 使用的列清单，
//! 该清单统一应用到每一行。

use crate::error::{DalError, Result};
use crate::row::Row;
use crate::utils::check_column;
use serde::Deserialize;

/// 批次列策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPolicy {
    /// 所有行列名的并集（按首次出现顺序）；缺列的行在该位置写入 `DEFAULT`
    #[default]
    Union,
    /// 每一行必须与第一行的列集合完全一致
    Strict,
}

/// 批次使用的有序列清单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet {
    columns: Vec<String>,
}

impl ColumnSet {
    pub fn from_rows(rows: &[Row], policy: ColumnPolicy) -> Result<Self> {
        let first = rows.first().ok_or(DalError::EmptyInput("batch insert"))?;

        let columns: Vec<String> = match policy {
            ColumnPolicy::Union => {
                let mut columns: Vec<String> = Vec::new();
                for row in rows {
                    for column in row.columns() {
                        if !columns.iter().any(|c| c == column) {
                            columns.push(column.to_string());
                        }
                    }
                }
                columns
            }
            ColumnPolicy::Strict => {
                let columns: Vec<String> = first.columns().map(str::to_string).collect();
                for (index, row) in rows.iter().enumerate().skip(1) {
                    if let Some(missing) = columns.iter().find(|c| !row.contains_key(c)) {
                        return Err(DalError::InconsistentBatch {
                            row: index,
                            column: missing.clone(),
                        });
                    }
                    if let Some(extra) = row.columns().find(|c| !columns.iter().any(|k| k == c)) {
                        return Err(DalError::InconsistentBatch {
                            row: index,
                            column: extra.to_string(),
                        });
                    }
                }
                columns
            }
        };

        if columns.is_empty() {
            return Err(DalError::EmptyInput("batch insert"));
        }
        for column in &columns {
            check_column(column)?;
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// `a, b, c` 形式
    pub fn joined(&self) -> String {
        self.columns.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[test]
    fn test_union_keeps_first_seen_order() {
        let rows = vec![
            row! { "name" => "a", "email" => "x@y.com" },
            row! { "name" => "b", "phone" => "123" },
        ];
        let set = ColumnSet::from_rows(&rows, ColumnPolicy::Union).unwrap();
        assert_eq!(set.columns(), ["name", "email", "phone"]);
        assert_eq!(set.joined(), "name, email, phone");
    }

    #[test]
    fn test_union_is_not_widest_row() {
        // 最宽的行缺少其他行的列时，并集依然包含全部列
        let rows = vec![
            row! { "a" => 1 },
            row! { "b" => 1, "c" => 2 },
        ];
        let set = ColumnSet::from_rows(&rows, ColumnPolicy::Union).unwrap();
        assert_eq!(set.columns(), ["a", "b", "c"]);
    }

    #[test]
    fn test_strict_accepts_reordered_rows() {
        let rows = vec![
            row! { "a" => 1, "b" => 2 },
            row! { "b" => 3, "a" => 4 },
        ];
        let set = ColumnSet::from_rows(&rows, ColumnPolicy::Strict).unwrap();
        assert_eq!(set.columns(), ["a", "b"]);
    }

    #[test]
    fn test_strict_rejects_missing_column() {
        let rows = vec![row! { "a" => 1, "b" => 2 }, row! { "a" => 3 }];
        let err = ColumnSet::from_rows(&rows, ColumnPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            DalError::InconsistentBatch { row: 1, ref column } if column == "b"
        ));
    }

    #[test]
    fn test_strict_rejects_extra_column() {
        let rows = vec![row! { "a" => 1 }, row! { "a" => 3, "z" => 0 }];
        let err = ColumnSet::from_rows(&rows, ColumnPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            DalError::InconsistentBatch { row: 1, ref column } if column == "z"
        ));
    }

    #[test]
    fn test_empty_batch() {
        let err = ColumnSet::from_rows(&[], ColumnPolicy::Union).unwrap_err();
        assert!(matches!(err, DalError::EmptyInput(_)));

        let err = ColumnSet::from_rows(&[Row::new()], ColumnPolicy::Union).unwrap_err();
        assert!(matches!(err, DalError::EmptyInput(_)));
    }

    #[test]
    fn test_unsafe_column_rejected() {
        let rows = vec![row! { "a; --" => 1 }];
        let err = ColumnSet::from_rows(&rows, ColumnPolicy::Union).unwrap_err();
        assert!(matches!(err, DalError::InvalidIdentifier(_)));
    }
}
