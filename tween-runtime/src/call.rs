//! # Call 模块
//!
//! 动画调用：一个元素上的一次动画请求。
//!
//! 调用持有属性到 [`Tween`] 的映射、计时状态和生命周期标记。
//! 它在不同时刻分别挂在元素队列（等待中）或全局注册表（活跃中）上，
//! 两种链接都以 [`CallId`] 句柄表示，调用本体存放在调度器的 arena 里。
//!
//! 一次针对多个元素的请求会展开成每个元素一个调用，它们共享一个 [`CallGroup`]：
//! begin 钩子在第一个成员开始时触发，progress 只由最先开始的成员报告，
//! complete 钩子和完成信号在最后一个成员结束时各触发一次。
//!
//! ## 生命周期
//!
//! ```text
//! Pending(队列中) -> Active(注册表中，未开始) -> Running -> [Paused <-> Running] -> Complete | Stopped
//! ```

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::easing::Easing;
use crate::error::HookError;
use crate::target::ElementId;
use crate::tween::{TWEEN_PROPERTY, Tween};

new_key_type! {
    /// 动画调用句柄
    ///
    /// 调用结束后句柄失效，不会被新调用复用。
    pub struct CallId;

    /// 请求组句柄
    pub(crate) struct GroupId;
}

/// 队列名称
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueName {
    /// 不排队，提交后立即进入注册表，与元素上的其他调用并行
    Parallel,
    /// 命名 FIFO，空字符串为默认队列
    Named(String),
}

impl Default for QueueName {
    fn default() -> Self {
        Self::Named(String::new())
    }
}

impl QueueName {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// 命名队列的名称，`Parallel` 返回 `None`
    pub fn as_named(&self) -> Option<&str> {
        match self {
            Self::Parallel => None,
            Self::Named(name) => Some(name),
        }
    }
}

/// 计时起点
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TimeStart {
    /// 尚未被 tick 处理过
    #[default]
    Unset,
    /// 帧时钟上的起点（毫秒）
    At(f64),
    /// 下一次 tick 直接视为 100% 完成
    ForceFinish,
}

/// 暂停状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PauseState {
    /// 正常运行
    #[default]
    Running,
    /// 已暂停：跳过求值，并把计时起点随时间后移
    Paused,
    /// 刚恢复：下一次 tick 清回 `Running`
    ResumingThisTick,
}

/// 播放方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    /// 反向：进度从目标值回到起始值（loop 的往返段）
    Backward,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// 调用当前所在的结构
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Membership {
    /// 不在任何结构中（刚创建，或被 `dequeue(skip_promote)` 弹出）
    #[default]
    Detached,
    /// 在元素队列中等待
    Pending,
    /// 在全局注册表中
    Active,
}

/// 调用状态（外部可观察）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// 在元素队列中等待
    Pending,
    /// 已进入注册表，尚未开始（首次 tick 或延迟中）
    Active,
    /// 正在播放
    Running,
    /// 已暂停
    Paused,
}

/// progress 钩子参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// 完成百分比（0.0 - 1.0）
    pub percent_complete: f64,
    /// 剩余毫秒数
    pub ms_remaining: f64,
    /// 计时起点
    pub time_start: f64,
    /// 伪属性 `"tween"` 的当前值
    pub progress_value: Option<f64>,
}

/// begin / complete 钩子
pub type CallHook = Rc<dyn Fn(&[ElementId], &AnimationCall) -> Result<(), HookError>>;

/// progress 钩子
pub type ProgressHook = Rc<dyn Fn(&[ElementId], &Progress, &AnimationCall) -> Result<(), HookError>>;

/// 完成信号，只会被调用一次
pub type Resolver = Box<dyn FnOnce(&[ElementId])>;

/// 生命周期钩子
#[derive(Clone, Default)]
pub struct Hooks {
    pub begin: Option<CallHook>,
    pub progress: Option<ProgressHook>,
    pub complete: Option<CallHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("begin", &self.begin.is_some())
            .field("progress", &self.progress.is_some())
            .field("complete", &self.complete.is_some())
            .finish()
    }
}

/// 同一请求展开出的调用共享的钩子与计数
pub(crate) struct CallGroup {
    pub(crate) hooks: Hooks,
    pub(crate) resolver: Option<Resolver>,
    /// 尚未结束的成员，按提交顺序
    pub(crate) members: Vec<CallId>,
    /// 负责报告进度的成员，`None` 表示还没有成员开始
    pub(crate) first: Option<CallId>,
}

impl CallGroup {
    /// 从模板调用上取走钩子和完成信号
    pub(crate) fn take_from(call: &mut AnimationCall) -> Self {
        Self {
            hooks: std::mem::take(&mut call.hooks),
            resolver: call.resolver.take(),
            members: Vec::new(),
            first: None,
        }
    }

    /// 成员开始
    ///
    /// # 返回
    /// 第一个开始的成员返回组的 begin 钩子
    pub(crate) fn begin(&mut self, id: CallId) -> Option<CallHook> {
        if self.first.is_some() {
            return None;
        }
        self.first = Some(id);
        self.hooks.begin.clone()
    }

    /// 是否由该成员报告进度
    pub(crate) fn reports_progress(&self, id: CallId) -> bool {
        self.hooks.progress.is_some() && self.first == Some(id)
    }

    /// 成员结束，报告进度的成员结束时交给下一个未结束的成员
    ///
    /// # 返回
    /// 是否是最后一个成员
    pub(crate) fn leave(&mut self, id: CallId) -> bool {
        self.members.retain(|&member| member != id);
        if self.first == Some(id) {
            self.first = self.members.first().copied();
        }
        self.members.is_empty()
    }
}

/// 动画调用
pub struct AnimationCall {
    pub(crate) element: ElementId,
    pub(crate) elements: Rc<[ElementId]>,
    pub(crate) tweens: Vec<Tween>,
    pub(crate) queue: QueueName,
    pub(crate) easing: Option<Easing>,
    pub(crate) requested_duration: Option<f64>,
    pub(crate) duration: f64,
    pub(crate) delay: f64,
    pub(crate) speed: f64,
    pub(crate) loop_count: u32,
    pub(crate) repeat_count: u32,
    /// loop 每折返一次时恢复的 repeat 次数
    pub(crate) repeat_again: u32,
    pub(crate) terminal: Vec<(String, f64)>,
    pub(crate) hooks: Hooks,
    pub(crate) resolver: Option<Resolver>,
    pub(crate) group: Option<GroupId>,

    pub(crate) time_start: TimeStart,
    pub(crate) started: bool,
    pub(crate) begin_fired: bool,
    pub(crate) pause: PauseState,
    pub(crate) percent_complete: f64,
    pub(crate) elapsed: f64,
    pub(crate) direction: Direction,
    pub(crate) expanded: bool,

    pub(crate) membership: Membership,
    pub(crate) prev: Option<CallId>,
    pub(crate) next: Option<CallId>,
    pub(crate) queue_next: Option<CallId>,
}

impl fmt::Debug for AnimationCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationCall")
            .field("element", &self.element)
            .field("queue", &self.queue)
            .field("tweens", &self.tweens.len())
            .field("duration", &self.duration)
            .field("delay", &self.delay)
            .field("speed", &self.speed)
            .field("time_start", &self.time_start)
            .field("started", &self.started)
            .field("pause", &self.pause)
            .field("percent_complete", &self.percent_complete)
            .field("membership", &self.membership)
            .finish()
    }
}

impl AnimationCall {
    /// 创建针对单个元素的调用
    pub fn new(element: ElementId) -> Self {
        Self {
            element,
            elements: Rc::from(vec![element]),
            tweens: Vec::new(),
            queue: QueueName::default(),
            easing: None,
            requested_duration: None,
            duration: 0.0,
            delay: 0.0,
            speed: 1.0,
            loop_count: 0,
            repeat_count: 0,
            repeat_again: 0,
            terminal: Vec::new(),
            hooks: Hooks::default(),
            resolver: None,
            group: None,
            time_start: TimeStart::Unset,
            started: false,
            begin_fired: false,
            pause: PauseState::Running,
            percent_complete: 0.0,
            elapsed: 0.0,
            direction: Direction::Forward,
            expanded: false,
            membership: Membership::Detached,
            prev: None,
            next: None,
            queue_next: None,
        }
    }

    /// 添加 tween（同名属性会被替换）
    pub fn with_tween(mut self, tween: Tween) -> Self {
        self.tweens.retain(|t| t.property() != tween.property());
        self.tweens.push(tween);
        self
    }

    /// 设置时长（毫秒），未设置时使用调度器默认值
    pub fn with_duration(mut self, ms: f64) -> Self {
        self.requested_duration = Some(ms.max(0.0));
        self
    }

    /// 设置延迟（毫秒）
    pub fn with_delay(mut self, ms: f64) -> Self {
        self.delay = ms.max(0.0);
        self
    }

    /// 设置速度倍率（0 = 冻结，1 = 实时）
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed.max(0.0);
        self
    }

    /// 设置调用级别的默认缓动
    pub fn with_easing(mut self, easing: impl Into<Easing>) -> Self {
        self.easing = Some(easing.into());
        self
    }

    /// 设置队列
    pub fn with_queue(mut self, queue: QueueName) -> Self {
        self.queue = queue;
        self
    }

    /// 往返次数（每次往返在终点反向）
    pub fn with_loop(mut self, count: u32) -> Self {
        self.loop_count = count;
        self
    }

    /// 重复次数（每次从起点重新播放）
    pub fn with_repeat(mut self, count: u32) -> Self {
        self.repeat_count = count;
        self.repeat_again = count;
        self
    }

    /// 自然完成时额外写入的终态值
    pub fn with_terminal(mut self, property: impl Into<String>, value: f64) -> Self {
        self.terminal.push((property.into(), value));
        self
    }

    pub fn on_begin(
        mut self,
        f: impl Fn(&[ElementId], &AnimationCall) -> Result<(), HookError> + 'static,
    ) -> Self {
        self.hooks.begin = Some(Rc::new(f));
        self
    }

    pub fn on_progress(
        mut self,
        f: impl Fn(&[ElementId], &Progress, &AnimationCall) -> Result<(), HookError> + 'static,
    ) -> Self {
        self.hooks.progress = Some(Rc::new(f));
        self
    }

    pub fn on_complete(
        mut self,
        f: impl Fn(&[ElementId], &AnimationCall) -> Result<(), HookError> + 'static,
    ) -> Self {
        self.hooks.complete = Some(Rc::new(f));
        self
    }

    /// 完成信号（整个请求完成、停止或丢弃时恰好调用一次）
    pub fn on_resolve(mut self, f: impl FnOnce(&[ElementId]) + 'static) -> Self {
        self.resolver = Some(Box::new(f));
        self
    }

    // ========== 查询 ==========

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn elements(&self) -> &[ElementId] {
        &self.elements
    }

    pub fn queue(&self) -> &QueueName {
        &self.queue
    }

    pub fn tweens(&self) -> &[Tween] {
        &self.tweens
    }

    pub fn tween(&self, property: &str) -> Option<&Tween> {
        self.tweens.iter().find(|t| t.property() == property)
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    pub fn time_start(&self) -> TimeStart {
        self.time_start
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn pause_state(&self) -> PauseState {
        self.pause
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn percent_complete(&self) -> f64 {
        self.percent_complete
    }

    /// 自计时起点以来的毫秒数
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// 伪属性 `"tween"` 的当前值
    pub fn progress_value(&self) -> Option<f64> {
        self.tween(TWEEN_PROPERTY).and_then(Tween::current_number)
    }

    pub fn state(&self) -> CallState {
        match self.membership {
            Membership::Detached | Membership::Pending => CallState::Pending,
            Membership::Active if !self.started => CallState::Active,
            Membership::Active if self.pause == PauseState::Paused => CallState::Paused,
            Membership::Active => CallState::Running,
        }
    }

    /// 按模板复制出针对另一个元素的调用，不带钩子和运行状态
    pub(crate) fn fork(&self, element: ElementId, elements: Rc<[ElementId]>) -> Self {
        Self {
            elements,
            tweens: self.tweens.clone(),
            queue: self.queue.clone(),
            easing: self.easing.clone(),
            requested_duration: self.requested_duration,
            delay: self.delay,
            speed: self.speed,
            loop_count: self.loop_count,
            repeat_count: self.repeat_count,
            repeat_again: self.repeat_again,
            terminal: self.terminal.clone(),
            ..Self::new(element)
        }
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.pause == PauseState::Paused
    }

    /// 重新布置为下一段播放（loop / repeat）
    ///
    /// # 返回
    /// - `true`: 还有剩余次数，已重置计时
    /// - `false`: 次数用尽，应正常结束
    pub(crate) fn rearm(&mut self) -> bool {
        if self.repeat_count > 0 {
            self.repeat_count -= 1;
        } else if self.loop_count > 0 {
            self.loop_count -= 1;
            self.repeat_count = self.repeat_again;
            self.direction = self.direction.flipped();
        } else {
            return false;
        }

        self.time_start = TimeStart::Unset;
        self.started = false;
        self.percent_complete = 0.0;
        self.elapsed = 0.0;
        true
    }
}
