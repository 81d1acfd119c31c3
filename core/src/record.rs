//! Record：带列标注的结构体与行之间的映射
//!
//! `#[derive(Record)]` 在编译期生成字段 -> 列的对照表 [`Record::FIELDS`]，
//! 结果集的列在每次查询中只解析一次，之后逐行按字段序号赋值。

use crate::error::{DalError, Result};
use crate::row::Row;
use crate::value::{TypeMismatch, Value};
use serde::Deserialize;
use std::marker::PhantomData;

/// 单个字段的元数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    /// Rust 字段名
    pub field: &'static str,
    /// 对应的列名
    pub column: &'static str,
    /// 插入时跳过（例如数据库生成的自增主键）
    pub skip_insert: bool,
}

/// 可以与行互相转换的结构体
///
/// 通常由 `#[derive(Record)]` 实现：
///
/// ```rust,ignore
/// #[derive(Debug, Default, Record)]
/// struct User {
///     #[column(skip_insert)]
///     id: i64,
///     #[column(name = "user_name")]
///     name: String,
///     #[column]
///     email: Option<String>,
/// }
/// ```
pub trait Record: Default + Send + Sync + Sized {
    /// 按声明顺序排列的映射字段
    const FIELDS: &'static [FieldMeta];

    /// 按声明顺序展开映射字段，不包含 `skip_insert` 字段
    fn to_row(&self) -> Row;

    /// 给第 `index` 个映射字段赋值
    fn assign(&mut self, index: usize, value: Value) -> std::result::Result<(), TypeMismatch>;

    /// 列名对应的字段序号
    fn field_index(column: &str) -> Option<usize> {
        Self::FIELDS.iter().position(|f| f.column == column)
    }
}

/// 字段类型不匹配时的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMode {
    /// 保留字段默认值，并记录到 [`Mapped::skipped`]
    #[default]
    Lenient,
    /// 返回 [`DalError::TypeMismatch`]
    Strict,
}

/// 宽松模式下被跳过的字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSkip {
    pub row: usize,
    pub column: String,
    pub field: &'static str,
    pub mismatch: TypeMismatch,
}

/// 映射结果
#[derive(Debug, Clone, PartialEq)]
pub struct Mapped<R> {
    pub records: Vec<R>,
    /// 结果集中没有对应字段的列
    pub unmapped_columns: Vec<String>,
    pub skipped: Vec<FieldSkip>,
}

impl<R> Mapped<R> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 没有被跳过的字段
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

impl<R> Default for Mapped<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            unmapped_columns: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// 结果集列到字段序号的解析结果
#[derive(Debug)]
pub struct RecordMapper<R: Record> {
    columns: Vec<String>,
    targets: Vec<Option<usize>>,
    mode: MappingMode,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RecordMapper<R> {
    pub fn new<S: AsRef<str>>(columns: &[S], mode: MappingMode) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let targets = columns.iter().map(|c| R::field_index(c)).collect();
        Self {
            columns,
            targets,
            mode,
            _record: PhantomData,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn unmapped_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.targets)
            .filter(|(_, target)| target.is_none())
            .map(|(column, _)| column.clone())
            .collect()
    }

    /// 按列位置映射一行，`values` 与构造时的列一一对应
    pub fn map_values(
        &self,
        row: usize,
        values: Vec<Value>,
        skipped: &mut Vec<FieldSkip>,
    ) -> Result<R> {
        let mut record = R::default();
        for (position, value) in values.into_iter().enumerate() {
            if let Some(Some(index)) = self.targets.get(position) {
                self.apply(&mut record, row, position, *index, value, skipped)?;
            }
        }
        Ok(record)
    }

    /// 按列名映射一行，行中可以缺少部分列
    pub fn map_row(&self, row: usize, values: Row, skipped: &mut Vec<FieldSkip>) -> Result<R> {
        let mut record = R::default();
        for (column, value) in values {
            let Some(position) = self.columns.iter().position(|c| *c == column) else {
                continue;
            };
            if let Some(index) = self.targets[position] {
                self.apply(&mut record, row, position, index, value, skipped)?;
            }
        }
        Ok(record)
    }

    fn apply(
        &self,
        record: &mut R,
        row: usize,
        position: usize,
        index: usize,
        value: Value,
        skipped: &mut Vec<FieldSkip>,
    ) -> Result<()> {
        let Err(mismatch) = record.assign(index, value) else {
            return Ok(());
        };
        let column = self.columns[position].clone();
        let field = R::FIELDS[index].field;
        match self.mode {
            MappingMode::Strict => Err(DalError::TypeMismatch {
                row,
                column,
                field,
                expected: mismatch.expected,
                found: mismatch.found,
            }),
            MappingMode::Lenient => {
                tracing::warn!(
                    row,
                    column = %column,
                    field,
                    expected = mismatch.expected,
                    found = mismatch.found,
                    "Skipping field with mismatched type"
                );
                skipped.push(FieldSkip {
                    row,
                    column,
                    field,
                    mismatch,
                });
                Ok(())
            }
        }
    }

    /// 映射按列位置解码好的全部行
    pub fn map_all<I>(&self, rows: I) -> Result<Mapped<R>>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        let mut skipped = Vec::new();
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(row, values)| self.map_values(row, values, &mut skipped))
            .collect::<Result<Vec<_>>>()?;
        Ok(Mapped {
            records,
            unmapped_columns: self.unmapped_columns(),
            skipped,
        })
    }
}

/// 把已解码的 `Row` 映射为 Record
///
/// 列按各行首次出现的顺序收集，只解析一次。
pub fn records_from_rows<R: Record>(rows: Vec<Row>, mode: MappingMode) -> Result<Mapped<R>> {
    let mut columns: Vec<String> = Vec::new();
    for row in &rows {
        for column in row.columns() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
    }

    let mapper = RecordMapper::<R>::new(&columns, mode);
    let mut skipped = Vec::new();
    let records = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| mapper.map_row(index, row, &mut skipped))
        .collect::<Result<Vec<_>>>()?;

    Ok(Mapped {
        records,
        unmapped_columns: mapper.unmapped_columns(),
        skipped,
    })
}
