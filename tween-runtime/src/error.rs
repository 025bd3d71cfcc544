//! # Error 模块
//!
//! 定义 tween-runtime 中使用的错误类型。

use thiserror::Error;

use crate::call::CallId;

/// Tween 值错误
///
/// 展开（expansion）阶段无法把起止值解析为数值形式时产生。
/// 对应的动画调用会被丢弃，不会尝试任何写入。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TweenError {
    /// 起始值无法从当前渲染状态读取
    #[error("属性 '{property}' 的起始值无法解析")]
    UnresolvedStart { property: String },

    /// 起止值的分量数量不一致
    #[error("属性 '{property}' 的起止值分量数量不一致：起始 {start}，目标 {end}")]
    ComponentMismatch {
        property: String,
        start: usize,
        end: usize,
    },

    /// 模板引用了不存在的分量
    #[error("属性 '{property}' 的模板引用了分量 {index}，但只有 {count} 个分量")]
    PatternComponentOutOfRange {
        property: String,
        index: usize,
        count: usize,
    },

    /// 多分量值缺少模板
    #[error("属性 '{property}' 有 {count} 个分量，但没有提供模板")]
    MissingPattern { property: String, count: usize },

    /// 非有限数值（NaN / 无穷）
    #[error("属性 '{property}' 包含非有限数值")]
    NonFinite { property: String },

    /// 模板语法错误
    #[error("无效的模板 '{pattern}'：{message}")]
    InvalidPattern { pattern: String, message: String },
}

/// 生命周期钩子返回的错误
///
/// 钩子失败只影响自身，不会中断当前 tick。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 调度器操作错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// 调用不存在（已完成或从未提交）
    #[error("动画调用 {call:?} 不存在")]
    UnknownCall { call: CallId },

    /// 当前状态不允许此操作
    #[error("动画调用 {call:?} 当前状态不允许此操作：{message}")]
    InvalidState { call: CallId, message: String },
}

/// tween-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TweenRuntimeError {
    /// Tween 值错误
    #[error("Tween 错误: {0}")]
    Tween(#[from] TweenError),

    /// 调度器错误
    #[error("调度器错误: {0}")]
    Scheduler(#[from] SchedulerError),

    /// 钩子错误
    #[error("钩子错误: {0}")]
    Hook(#[from] HookError),
}

/// Result 类型别名
pub type TweenResult<T> = Result<T, TweenRuntimeError>;
