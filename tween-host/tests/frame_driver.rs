//! # 帧驱动集成测试
//!
//! 测试 FrameDriver 与共享调度器之间的交互，包括钩子中触发的嵌套处理。

use std::cell::RefCell;
use std::rc::Rc;

use tween_host::{DriverConfig, DriverStep, FrameDriver, FrameSource, SharedScheduler, SourceKind};
use tween_runtime::{
    AnimationCall, EasingFunction, ElementId, HookError, MemoryTarget, ScheduleDecision, Scheduler,
    SchedulerEvent, Tween,
};

fn shared_scheduler() -> SharedScheduler<MemoryTarget> {
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

/// 固定时间表的帧来源
struct Scripted {
    times: Vec<f64>,
}

impl FrameSource for Scripted {
    fn kind(&self) -> SourceKind {
        SourceKind::Display
    }

    fn next_frame(&mut self, now: f64) -> f64 {
        if self.times.is_empty() {
            now + 20.0
        } else {
            self.times.remove(0)
        }
    }
}

/// 测试钩子中触发可见性切换时，嵌套处理被拒绝而不是重入 tick
#[test]
fn test_nested_tick_from_hook_is_refused() {
    let scheduler = shared_scheduler();
    let nested = Rc::new(RefCell::new(FrameDriver::new(
        scheduler.clone(),
        &DriverConfig::default(),
    )));
    let observed = Rc::new(RefCell::new(Vec::new()));

    let (n, o) = (nested.clone(), observed.clone());
    scheduler
        .borrow_mut()
        .enqueue(fade(100.0).on_progress(move |_, _, _| {
            let step = n.borrow_mut().set_hidden(true);
            o.borrow_mut().push(step);
            Ok(())
        }));

    let mut driver = FrameDriver::new(scheduler.clone(), &DriverConfig::default());
    assert_eq!(driver.start(), DriverStep::Armed);
    assert_eq!(driver.step(), DriverStep::Ran(ScheduleDecision::RequestFrame));

    // 第一次切换尝试了重新处理，但调度器正在 tick 中
    assert_eq!(observed.borrow()[0], Some(DriverStep::Busy));
    assert!(nested.borrow().is_hidden());

    // 外层驱动不受影响，动画正常完成
    while driver.step() == DriverStep::Ran(ScheduleDecision::RequestFrame) {}
    assert!(scheduler.borrow().is_empty());
    assert!(observed.borrow()[1..].iter().all(Option::is_none));
    assert_eq!(
        scheduler.borrow().target().number(ElementId::new(1), "opacity"),
        Some(1.0)
    );
}

/// 测试钩子错误不会中断驱动
#[test]
fn test_hook_failure_surfaces_as_event() {
    let scheduler = shared_scheduler();
    scheduler
        .borrow_mut()
        .enqueue(fade(40.0).on_begin(|_, _| Err(HookError::new("boom"))));

    let mut driver = FrameDriver::new(scheduler.clone(), &DriverConfig::default());
    driver.start();
    while let DriverStep::Ran(ScheduleDecision::RequestFrame) = driver.step() {}

    let events = scheduler.borrow_mut().drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        SchedulerEvent::HookFailed { error, .. } if error.message == "boom"
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, SchedulerEvent::Completed { .. })));
}

/// 测试抖动的帧时间：过短的帧被跳过，进度仍然单调
#[test]
fn test_jittery_frames() {
    let scheduler = shared_scheduler();
    scheduler.borrow_mut().enqueue(fade(100.0));

    let source = Scripted {
        times: vec![10.0, 20.0, 45.0, 50.0, 90.0, 91.0, 130.0],
    };
    let mut driver = FrameDriver::with_sources(
        scheduler.clone(),
        Box::new(source),
        Box::new(tween_host::FallbackTimer::new(16.0)),
    );
    driver.start();

    let mut last = 0.0;
    let mut processed = Vec::new();
    while let DriverStep::Ran(decision) = driver.step() {
        let value = scheduler
            .borrow()
            .target()
            .number(ElementId::new(1), "opacity")
            .unwrap();
        assert!(value >= last);
        if value > last {
            processed.push(driver.now());
        }
        last = value;
        if decision == ScheduleDecision::Idle {
            break;
        }
    }

    // 10 → 45 → 90 → 130 被处理，其余间隔不足最小帧间隔
    assert_eq!(processed, vec![10.0, 45.0, 90.0, 130.0]);
    assert_eq!(last, 1.0);
}
