//! 占位符编号
//!
//! PostgreSQL 使用 `$1, $2, ...` 作为位置参数。同一条语句内编号单调递增，
//! 前一个子句结束时的编号就是下一个子句的起始编号（例如 UPDATE 的 SET 与 WHERE）。

/// 生成单个占位符，`index` 从 1 开始
pub fn placeholder(index: usize) -> String {
    format!("${}", index)
}

/// 单条语句内的占位符计数器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholders {
    next: usize,
}

impl Placeholders {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// 从指定编号开始（用于拼接到已有参数之后）
    pub fn starting_at(index: usize) -> Self {
        Self {
            next: index.max(1),
        }
    }

    /// 返回下一个占位符并递增
    pub fn next_marker(&mut self) -> String {
        let marker = placeholder(self.next);
        self.next += 1;
        marker
    }

    /// 下一个将要分配的编号
    pub fn position(&self) -> usize {
        self.next
    }

    /// 已分配的占位符数量
    pub fn issued(&self) -> usize {
        self.next - 1
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self::new()
    }
}
