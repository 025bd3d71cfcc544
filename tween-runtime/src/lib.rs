//! # Tween Runtime
//!
//! 帧驱动的属性动画调度核心。
//!
//! ## 架构概述
//!
//! `tween-runtime` 是纯逻辑核心，不依赖真实时钟或渲染层。
//! 宿主每帧把时间传入 [`Scheduler::tick`]，调度器通过 [`PropertyTarget`]
//! 读取起始值、写入插值结果，并返回是否需要下一帧：
//!
//! ```text
//! Host                               Runtime
//!   │                                   │
//!   │──── enqueue(AnimationCall) ──────►│ 元素队列 / 注册表
//!   │──── tick(now) ───────────────────►│ 展开 → 求值 → 钩子
//!   │◄─── ScheduleDecision ─────────────│
//!   │◄─── write(element, property) ─────│ (PropertyTarget)
//!   │                                   │
//! ```
//!
//! ## 核心类型
//!
//! - [`Tween`]：单个属性的插值状态
//! - [`AnimationCall`]：一个元素上的一次动画请求
//! - [`Scheduler`]：注册表、元素队列和 tick 循环
//! - [`PropertyTarget`]：值规范化协作方接口
//!
//! ## 使用示例
//!
//! ```ignore
//! use tween_runtime::{AnimationCall, ElementId, MemoryTarget, ScheduleDecision, Scheduler, Tween};
//!
//! let mut scheduler = Scheduler::new(MemoryTarget::new());
//! scheduler.enqueue(
//!     AnimationCall::new(ElementId::new(1))
//!         .with_tween(Tween::new("opacity", 1.0))
//!         .with_duration(300.0),
//! );
//! scheduler.start_ticking();
//!
//! let mut now = 0.0;
//! while scheduler.tick(now) == ScheduleDecision::RequestFrame {
//!     now += 16.0;
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`tween`]：Tween、值与模板
//! - [`easing`]：缓动函数与注册表
//! - [`call`]：AnimationCall 与生命周期状态
//! - [`scheduler`]：调度器与 tick
//! - [`actions`]：stop / finish / pause / resume 等组合动作
//! - [`target`]：协作方接口
//! - [`config`]：调度器配置
//! - [`error`]：错误类型定义

pub mod actions;
pub mod call;
pub mod config;
pub mod easing;
pub mod error;
mod queue;
mod registry;
pub mod scheduler;
pub mod target;
pub mod tween;

// 重导出核心类型
pub use actions::QueueSelector;
pub use call::{
    AnimationCall, CallHook, CallId, CallState, Direction, Hooks, PauseState, Progress,
    ProgressHook, QueueName, Resolver, TimeStart,
};
pub use config::{MockMode, SchedulerConfig};
pub use easing::{Easing, EasingFunction, EasingRegistry};
pub use error::{HookError, SchedulerError, TweenError, TweenResult, TweenRuntimeError};
pub use scheduler::{
    CallSelector, CompletionKind, HookKind, ScheduleDecision, Scheduler, SchedulerEvent,
};
pub use target::{ElementId, MemoryTarget, PropertyTarget, PropertyValue, StoredValue, WriteOutcome};
pub use tween::{Pattern, Tween, TweenValue, ValueFormat, TWEEN_PROPERTY};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        // 验证所有公共类型都可以正常使用
        let _call = AnimationCall::new(ElementId::new(1))
            .with_tween(Tween::new("opacity", 1.0))
            .with_queue(QueueName::Parallel);

        let _selector = QueueSelector::Default;

        let _config = SchedulerConfig::default();

        let scheduler = Scheduler::new(MemoryTarget::new());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_error_conversion() {
        let err: TweenRuntimeError = HookError::new("boom").into();
        assert_eq!(err.to_string(), "钩子错误: boom");

        let err: TweenRuntimeError = TweenError::NonFinite {
            property: "left".to_string(),
        }
        .into();
        assert!(matches!(err, TweenRuntimeError::Tween(_)));
    }
}
