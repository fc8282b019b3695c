// ==========================================
// 校园考勤核心 - 离开拦截
// ==========================================
// 职责: 把"离开页面"建模为需要先经守卫批准的状态转换
// 规则:
//   - 工作集为脏 → 拦截，调用方只能二选一: 放弃(Discard) / 留下(Stay)
//   - 所有离开路径都必须经过守卫（返回键、会话过期跳转、程序化跳转）
// 红线: 守卫不做 I/O，不持有状态
// ==========================================

use crate::domain::WorkingSet;
use crate::engine::change_tracker::ChangeTracker;
use serde::Serialize;
use tracing::info;

/// 离开原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    /// 用户点击返回
    BackAction,
    /// 会话过期，需跳转到登录
    SessionExpired,
    /// 其他程序化跳转
    Redirect,
}

/// 守卫判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    /// 可以直接离开
    Proceed,
    /// 存在未保存修改，需用户选择
    Blocked,
}

/// 被拦截后的用户选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitResolution {
    /// 放弃修改并离开
    Discard,
    /// 取消离开
    Stay,
}

/// 离开拦截守卫
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationGuard;

impl NavigationGuard {
    /// 是否需要拦截离开
    pub fn should_block_exit(ws: &WorkingSet) -> bool {
        ChangeTracker::is_dirty(ws)
    }

    /// 评估一次离开请求；尚未构建工作集时总是放行
    pub fn evaluate(ws: Option<&WorkingSet>, reason: ExitReason) -> ExitDecision {
        match ws {
            Some(ws) if Self::should_block_exit(ws) => {
                info!(
                    "离开被拦截: reason={:?}, class_id={}, date={}, dirty_entries={}",
                    reason,
                    ws.class_id(),
                    ws.date(),
                    ws.summary().dirty
                );
                ExitDecision::Blocked
            }
            _ => ExitDecision::Proceed,
        }
    }

    /// 应用用户的选择
    ///
    /// # 返回
    /// - Some(ws'): 放弃修改，返回清除 dirty 后的工作集，离开继续
    /// - None: 留下，工作集保持原样
    pub fn resolve(ws: &WorkingSet, resolution: ExitResolution) -> Option<WorkingSet> {
        match resolution {
            ExitResolution::Discard => Some(ChangeTracker::clear_dirty(ws)),
            ExitResolution::Stay => None,
        }
    }
}
