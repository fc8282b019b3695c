// ==========================================
// 校园考勤核心 - 备注长度策略
// ==========================================
// 职责: 在调用 set_remarks 之前校验备注长度（按字符计）
// ==========================================

use crate::engine::change_tracker::EditError;

/// 默认备注最大字符数
pub const DEFAULT_REMARKS_MAX_CHARS: usize = 200;

/// 备注长度策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemarksPolicy {
    max_chars: usize,
}

impl RemarksPolicy {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// 校验备注
    pub fn validate(&self, remarks: &str) -> Result<(), EditError> {
        let actual = remarks.chars().count();
        if actual > self.max_chars {
            return Err(EditError::RemarksTooLong {
                max: self.max_chars,
                actual,
            });
        }
        Ok(())
    }
}

impl Default for RemarksPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_REMARKS_MAX_CHARS)
    }
}
