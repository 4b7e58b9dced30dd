//! 记录处理上下文
//!
//! 封装"我正在处理整批中的第几条记录"这一信息

use std::fmt::Display;

/// 记录处理上下文
///
/// 仅用于日志显示，不参与任何业务判断
#[derive(Debug, Clone, Copy)]
pub struct RecordCtx {
    /// 记录在整批中的序号（从1开始）
    pub record_index: usize,

    /// 本轮待处理记录总数
    pub total: usize,

    /// 所属并发波序号（从1开始）
    pub wave_num: usize,
}

impl RecordCtx {
    /// 创建新的记录上下文
    pub fn new(record_index: usize, total: usize, wave_num: usize) -> Self {
        Self {
            record_index,
            total,
            wave_num,
        }
    }
}

impl Display for RecordCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[记录 {}/{}]", self.record_index, self.total)
    }
}
