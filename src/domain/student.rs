// ==========================================
// 校园考勤核心 - 学生实体
// ==========================================
// 职责: 名册中的学生（只读，归名册数据源所有）
// ==========================================

use serde::{Deserialize, Serialize};

/// 学生
///
/// 名册数据源提供，核心只读取不修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// 学生ID（考勤条目的关联键）
    pub id: String,
    /// 显示名称
    pub display_name: String,
    /// 学籍号等外部编号
    pub external_student_id: String,
}

impl Student {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        external_student_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            external_student_id: external_student_id.into(),
        }
    }
}
