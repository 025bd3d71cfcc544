//! # Driver 模块
//!
//! 帧驱动：把调度器的"请求下一帧"决策接到帧来源上。
//!
//! 调度器以 `Rc<RefCell<_>>` 共享，钩子或其他宿主代码可以持有它。
//! 每次处理帧都通过 `try_borrow_mut` 获取调度器；如果此时已有一帧在处理
//! （例如某个钩子里触发了可见性切换），嵌套的处理会被拒绝并返回
//! [`DriverStep::Busy`]，不会重入 tick。

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info, warn};
use tween_runtime::{PropertyTarget, ScheduleDecision, Scheduler};

use crate::clock::{DisplaySync, FallbackTimer, FrameSource, SourceKind};
use crate::config::DriverConfig;

/// 共享的调度器
pub type SharedScheduler<T> = Rc<RefCell<Scheduler<T>>>;

/// 一次驱动操作的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStep {
    /// 已布置计时，等待下一帧
    Armed,
    /// 处理了一帧
    Ran(ScheduleDecision),
    /// 已有一帧在处理中，本次被拒绝
    Busy,
    /// 调度器没有在计时
    Idle,
}

/// 帧驱动
pub struct FrameDriver<T> {
    scheduler: SharedScheduler<T>,
    display: Box<dyn FrameSource>,
    fallback: Box<dyn FrameSource>,
    hidden: bool,
    now: f64,
    frames: u64,
}

impl<T: PropertyTarget> FrameDriver<T> {
    /// 按配置创建（模拟显示器同步 + 后备定时器）
    pub fn new(scheduler: SharedScheduler<T>, config: &DriverConfig) -> Self {
        Self::with_sources(
            scheduler,
            Box::new(DisplaySync::new(config.refresh_interval_ms)),
            Box::new(FallbackTimer::new(config.fallback_interval_ms)),
        )
    }

    /// 使用自定义帧来源
    pub fn with_sources(
        scheduler: SharedScheduler<T>,
        display: Box<dyn FrameSource>,
        fallback: Box<dyn FrameSource>,
    ) -> Self {
        Self {
            scheduler,
            display,
            fallback,
            hidden: false,
            now: 0.0,
            frames: 0,
        }
    }

    pub fn scheduler(&self) -> &SharedScheduler<T> {
        &self.scheduler
    }

    /// 当前时间（最近一帧的时间戳）
    pub fn now(&self) -> f64 {
        self.now
    }

    /// 已处理的帧数
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// 当前使用的帧来源
    pub fn source_kind(&self) -> SourceKind {
        self.source().kind()
    }

    fn source(&self) -> &dyn FrameSource {
        if self.hidden {
            self.fallback.as_ref()
        } else {
            self.display.as_ref()
        }
    }

    fn source_mut(&mut self) -> &mut dyn FrameSource {
        if self.hidden {
            self.fallback.as_mut()
        } else {
            self.display.as_mut()
        }
    }

    /// 提交动画之后调用：布置计时，下一帧开始处理
    pub fn start(&mut self) -> DriverStep {
        let Ok(mut scheduler) = self.scheduler.try_borrow_mut() else {
            warn!("调度器正忙，无法布置计时");
            return DriverStep::Busy;
        };
        if scheduler.is_empty() {
            return DriverStep::Idle;
        }
        if scheduler.start_ticking() {
            debug!(now = self.now, "布置计时");
        }
        DriverStep::Armed
    }

    /// 等待下一帧并处理
    pub fn step(&mut self) -> DriverStep {
        let shared = self.scheduler.clone();
        let Ok(mut scheduler) = shared.try_borrow_mut() else {
            warn!(now = self.now, "已有一帧在处理中，拒绝嵌套 tick");
            return DriverStep::Busy;
        };
        if !scheduler.is_ticking() {
            return DriverStep::Idle;
        }

        let now = self.now;
        self.now = self.source_mut().next_frame(now);
        let decision = scheduler.tick(self.now);
        self.frames += 1;
        DriverStep::Ran(decision)
    }

    /// 在当前时间立即处理一帧（不等待帧来源）
    pub fn force_tick(&mut self) -> DriverStep {
        let Ok(mut scheduler) = self.scheduler.try_borrow_mut() else {
            warn!(now = self.now, "已有一帧在处理中，拒绝嵌套 tick");
            return DriverStep::Busy;
        };
        if !scheduler.is_ticking() {
            return DriverStep::Idle;
        }
        let decision = scheduler.tick(self.now);
        self.frames += 1;
        DriverStep::Ran(decision)
    }

    /// 空闲时推进时间（没有帧需要处理）
    pub fn advance_to(&mut self, time: f64) {
        if time > self.now {
            self.now = time;
        }
    }

    /// 宿主可见性变化
    ///
    /// 切换帧来源。转为不可见时，显示器回调已被挂起，
    /// 若调度器仍在计时则立即在当前时间处理一帧以重新接上后备定时器。
    ///
    /// # 返回
    /// 发生了重新启动时返回该帧的结果
    pub fn set_hidden(&mut self, hidden: bool) -> Option<DriverStep> {
        if self.hidden == hidden {
            return None;
        }
        self.hidden = hidden;
        info!(hidden, source = ?self.source_kind(), "帧来源切换");

        if hidden { Some(self.force_tick()) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tween_runtime::{AnimationCall, EasingFunction, ElementId, MemoryTarget, Tween};

    fn shared() -> SharedScheduler<MemoryTarget> {
        let mut target = MemoryTarget::new();
        target.add_element(ElementId::new(1));
        target.set(ElementId::new(1), "opacity", 0.0);
        Rc::new(RefCell::new(Scheduler::new(target)))
    }

    fn fade(duration: f64) -> AnimationCall {
        AnimationCall::new(ElementId::new(1))
            .with_tween(Tween::new("opacity", 1.0).with_easing(EasingFunction::Linear))
            .with_duration(duration)
    }

    #[test]
    fn test_idle_without_calls() {
        let mut driver = FrameDriver::new(shared(), &DriverConfig::default());
        assert_eq!(driver.start(), DriverStep::Idle);
        assert_eq!(driver.step(), DriverStep::Idle);
        assert_eq!(driver.frames(), 0);
    }

    #[test]
    fn test_runs_until_idle() {
        let scheduler = shared();
        scheduler.borrow_mut().enqueue(fade(100.0));

        let mut driver = FrameDriver::new(scheduler.clone(), &DriverConfig::default());
        assert_eq!(driver.start(), DriverStep::Armed);

        let mut steps = 0;
        while driver.step() == DriverStep::Ran(ScheduleDecision::RequestFrame) {
            steps += 1;
            assert!(steps < 100);
        }
        assert_eq!(driver.step(), DriverStep::Idle);
        assert!(scheduler.borrow().is_empty());
        assert_eq!(
            scheduler.borrow().target().number(ElementId::new(1), "opacity"),
            Some(1.0)
        );
    }

    #[test]
    fn test_busy_while_borrowed() {
        let scheduler = shared();
        scheduler.borrow_mut().enqueue(fade(100.0));
        let mut driver = FrameDriver::new(scheduler.clone(), &DriverConfig::default());
        driver.start();

        let guard = scheduler.borrow_mut();
        assert_eq!(driver.step(), DriverStep::Busy);
        assert_eq!(driver.force_tick(), DriverStep::Busy);
        // 被拒绝的帧不推进时间
        assert_eq!(driver.now(), 0.0);
        drop(guard);

        assert!(matches!(driver.step(), DriverStep::Ran(_)));
    }

    #[test]
    fn test_hidden_switches_to_fallback() {
        let scheduler = shared();
        scheduler.borrow_mut().enqueue(fade(1000.0));
        let mut driver = FrameDriver::new(scheduler, &DriverConfig::default());
        driver.start();
        driver.step();
        assert_eq!(driver.source_kind(), SourceKind::Display);

        // 切到后备定时器时立即重新处理一帧
        let restart = driver.set_hidden(true);
        assert_eq!(restart, Some(DriverStep::Ran(ScheduleDecision::RequestFrame)));
        assert_eq!(driver.source_kind(), SourceKind::Fallback);
        assert_eq!(driver.set_hidden(true), None);

        let before = driver.now();
        driver.step();
        assert_eq!(driver.now(), before + 16.0);

        assert_eq!(driver.set_hidden(false), None);
        assert_eq!(driver.source_kind(), SourceKind::Display);
    }
}
