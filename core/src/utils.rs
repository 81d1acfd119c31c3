//! 工具函数模块

use crate::error::{DalError, Result};

/// 验证表名是否安全，允许 `schema.table` 形式
pub fn is_safe_table_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_safe_field_name)
}

/// 验证字段名是否安全
pub fn is_safe_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn check_table(name: &str) -> Result<()> {
    if is_safe_table_name(name) {
        Ok(())
    } else {
        Err(DalError::InvalidIdentifier(name.to_string()))
    }
}

pub(crate) fn check_column(name: &str) -> Result<()> {
    if is_safe_field_name(name) {
        Ok(())
    } else {
        Err(DalError::InvalidIdentifier(name.to_string()))
    }
}
