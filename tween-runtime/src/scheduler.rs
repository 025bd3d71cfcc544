//! # Scheduler 模块
//!
//! 帧驱动的调度器：持有调用 arena、全局注册表和元素队列，
//! 每帧由宿主调用一次 [`Scheduler::tick`]。
//!
//! ## 单次 tick
//!
//! 1. 帧门限：距上次处理不足最小帧间隔时直接跳过（仍请求下一帧）
//! 2. 展开：上次 tick 之后进入注册表的调用，从目标读取起始值
//! 3. 求值：从 `first` 走到本轮 `first_new` 边界，推进计时并写入属性
//! 4. 钩子：先 progress，再完成处理，均按注册表顺序
//! 5. 重新布置：注册表非空时请求下一帧，否则停止计时
//!
//! 钩子和完成信号按请求组触发，一个组对应一次 [`Scheduler::enqueue`] 或
//! [`Scheduler::enqueue_group`]，参见 [`crate::call`] 模块说明。
//!
//! tick 是纯函数式的一步：时间由调用方传入，"请求下一帧"的副作用由宿主负责。

use std::fmt;
use std::rc::Rc;

use slotmap::SlotMap;
use tracing::{debug, trace, warn};

use crate::call::{
    AnimationCall, CallGroup, CallId, Direction, GroupId, Membership, PauseState, Progress,
    QueueName, TimeStart,
};
use crate::config::{MockMode, SchedulerConfig};
use crate::easing::{EasingFunction, EasingRegistry, ResolvedEasing};
use crate::error::{HookError, SchedulerError, TweenError};
use crate::queue::{ElementQueues, Enqueued};
use crate::registry::Registry;
use crate::target::{ElementId, PropertyTarget, PropertyValue, WriteOutcome};

/// tick 之后宿主应执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// 请求下一帧
    RequestFrame,
    /// 没有活跃调用，停止计时
    Idle,
}

/// 调用结束的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    /// 到达 100%（或强制完成）
    Natural,
    /// 用户停止：不触发 complete 钩子，不写入终态
    Stopped,
    /// 目标元素已失效
    Stale,
    /// tween 展开失败
    Rejected,
}

/// 钩子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Begin,
    Progress,
    Complete,
}

/// 调度器事件
///
/// 通过 [`Scheduler::drain_events`] 取出。
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// 调用开始（每个调用只有一次）
    Began { call: CallId, element: ElementId },
    /// loop / repeat 重新开始下一段
    Rearmed {
        call: CallId,
        element: ElementId,
        direction: Direction,
    },
    /// 自然完成
    Completed { call: CallId, element: ElementId },
    /// 被停止
    Stopped { call: CallId, element: ElementId },
    /// 目标失效，已静默结束
    StaleTarget { call: CallId, element: ElementId },
    /// tween 展开失败，调用被丢弃
    TweenRejected {
        call: CallId,
        element: ElementId,
        error: TweenError,
    },
    /// 钩子返回错误
    HookFailed {
        call: CallId,
        element: ElementId,
        hook: HookKind,
        error: HookError,
    },
}

/// 暂停 / 恢复的目标
pub enum CallSelector<'a> {
    /// 单个调用（可以是等待中的）
    Call(CallId),
    /// 注册表中满足条件的调用
    Matching(Box<dyn Fn(&AnimationCall) -> bool + 'a>),
}

impl<'a> CallSelector<'a> {
    pub fn matching(predicate: impl Fn(&AnimationCall) -> bool + 'a) -> Self {
        Self::Matching(Box::new(predicate))
    }
}

impl From<CallId> for CallSelector<'_> {
    fn from(id: CallId) -> Self {
        Self::Call(id)
    }
}

/// 单个调用在本轮求值中的结果
enum Step {
    /// 跳过（暂停、延迟中或已不存在）
    Skipped,
    /// 目标已失效
    Stale,
    /// 已求值，`deferred` 表示有写入等待刷新
    Evaluated { deferred: bool },
}

/// 调度器
pub struct Scheduler<T> {
    target: T,
    config: SchedulerConfig,
    easings: EasingRegistry,
    calls: SlotMap<CallId, AnimationCall>,
    groups: SlotMap<GroupId, CallGroup>,
    registry: Registry,
    queues: ElementQueues,
    ticking: bool,
    /// 上次处理的帧时间，`None` 表示下一帧使用名义帧间隔作为 delta
    last_tick: Option<f64>,
    /// 最近一次处理的帧时间，用于记录队列的结束时间
    clock: f64,
    progress_batch: Vec<CallId>,
    complete_batch: Vec<CallId>,
    events: Vec<SchedulerEvent>,
}

impl<T> fmt::Debug for Scheduler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("calls", &self.calls.len())
            .field("groups", &self.groups.len())
            .field("active", &self.registry.len())
            .field("ticking", &self.ticking)
            .field("last_tick", &self.last_tick)
            .finish()
    }
}

impl<T: PropertyTarget> Scheduler<T> {
    /// 使用默认配置创建调度器
    pub fn new(target: T) -> Self {
        Self::with_config(target, SchedulerConfig::default())
    }

    pub fn with_config(target: T, config: SchedulerConfig) -> Self {
        if EasingFunction::from_name(&config.default_easing).is_none() {
            warn!(easing = %config.default_easing, "默认缓动不是内置名称，需要在使用前注册");
        }
        Self {
            target,
            config,
            easings: EasingRegistry::new(),
            calls: SlotMap::with_key(),
            groups: SlotMap::with_key(),
            registry: Registry::default(),
            queues: ElementQueues::default(),
            ticking: false,
            last_tick: None,
            clock: 0.0,
            progress_batch: Vec::new(),
            complete_batch: Vec::new(),
            events: Vec::new(),
        }
    }

    // ========== 访问器 ==========

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// 注册自定义缓动
    pub fn register_easing(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(f64, f64, f64, &str) -> f64 + 'static,
    ) {
        self.easings.register(name, f);
    }

    pub fn call(&self, id: CallId) -> Option<&AnimationCall> {
        self.calls.get(id)
    }

    pub(crate) fn call_mut(&mut self, id: CallId) -> Option<&mut AnimationCall> {
        self.calls.get_mut(id)
    }

    /// 是否已布置计时
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// 注册表中的调用数量
    pub fn active_len(&self) -> usize {
        self.registry.len()
    }

    /// 所有尚未结束的调用数量（包括等待中的）
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// 按注册表顺序列出活跃调用
    pub fn active_calls(&self) -> Vec<CallId> {
        self.registry.ids(&self.calls)
    }

    /// 列出元素某个队列上等待中的调用
    pub fn pending(&self, element: ElementId, queue: &QueueName) -> Vec<CallId> {
        match queue.as_named() {
            Some(name) => self.queues.pending(&self.calls, element, name),
            None => Vec::new(),
        }
    }

    /// 元素上所有非空闲的命名队列
    pub fn queue_names(&self, element: ElementId) -> Vec<QueueName> {
        self.queues
            .names(element)
            .into_iter()
            .map(QueueName::Named)
            .collect()
    }

    /// 有队列记录的所有元素
    pub fn queued_elements(&self) -> Vec<ElementId> {
        self.queues.elements()
    }

    /// 取出累积的事件
    pub fn drain_events(&mut self) -> Vec<SchedulerEvent> {
        std::mem::take(&mut self.events)
    }

    // ========== 提交与队列 ==========

    /// 提交调用
    ///
    /// - `Parallel`: 立即进入注册表
    /// - 命名队列空闲: 立即进入注册表并占用队列
    /// - 否则排在队尾
    ///
    /// 不会自动布置计时，调用方需要随后调用 [`Scheduler::start_ticking`]。
    pub fn enqueue(&mut self, mut call: AnimationCall) -> CallId {
        let group = self.groups.insert(CallGroup::take_from(&mut call));
        self.submit(call, group)
    }

    /// 提交针对一组元素的请求
    ///
    /// 模板调用按顺序为每个元素复制一份（模板自身的元素被忽略），
    /// 各自按 [`Scheduler::enqueue`] 的规则进入队列或注册表。
    /// 模板上的钩子和完成信号由整组共享：begin 只在第一个开始的成员上触发，
    /// progress 只由该成员报告，complete 和完成信号在最后一个成员结束时触发。
    ///
    /// 元素集合为空时立即发出完成信号，返回空列表。
    pub fn enqueue_group(
        &mut self,
        elements: &[ElementId],
        mut call: AnimationCall,
    ) -> Vec<CallId> {
        let set: Rc<[ElementId]> = Rc::from(elements);
        let mut group = CallGroup::take_from(&mut call);
        if set.is_empty() {
            if let Some(resolve) = group.resolver.take() {
                resolve(&set);
            }
            return Vec::new();
        }

        let group = self.groups.insert(group);
        let mut ids = Vec::with_capacity(set.len());
        for &element in set.iter() {
            let member = call.fork(element, set.clone());
            ids.push(self.submit(member, group));
        }
        debug!(group = ?group, members = ids.len(), "提交成组请求");
        ids
    }

    fn submit(&mut self, mut call: AnimationCall, group: GroupId) -> CallId {
        self.prepare(&mut call);
        call.group = Some(group);
        let element = call.element;
        let queue = call.queue.clone();
        let id = self.calls.insert(call);
        if let Some(group) = self.groups.get_mut(group) {
            group.members.push(id);
        }

        let promoted = match queue.as_named() {
            None => true,
            Some(name) => {
                self.queues.push(&mut self.calls, element, name, id) == Enqueued::Promote
            }
        };
        if promoted {
            self.registry.append(&mut self.calls, id);
        }

        debug!(call = ?id, element = %element, queue = ?queue, promoted, "提交动画调用");
        id
    }

    /// 弹出队首调用
    ///
    /// `skip_promote` 为假时把它放入注册表；为真时调用处于脱离状态，
    /// 调用方可以随后 [`Scheduler::cancel`] 它。
    /// 队列被占用但没有排队者时，队列转为空闲并返回 `None`。
    pub fn dequeue(
        &mut self,
        element: ElementId,
        queue: &QueueName,
        skip_promote: bool,
    ) -> Option<CallId> {
        let name = queue.as_named()?;
        let id = self.queues.pop(&mut self.calls, element, name)?;
        if !skip_promote {
            self.registry.append(&mut self.calls, id);
        }
        trace!(call = ?id, element = %element, skip_promote, "队首调用出队");
        Some(id)
    }

    /// 布置计时（幂等）
    ///
    /// # 返回
    /// 本次是否新布置
    pub fn start_ticking(&mut self) -> bool {
        if self.ticking {
            return false;
        }
        self.ticking = true;
        true
    }

    // ========== 运行中修改 ==========

    /// 取消调用
    ///
    /// - `force_finish`: 下一次 tick 视为 100% 完成，正常触发 complete 钩子
    /// - 否则立即停止：不触发 complete 钩子，队列继续推进，完成信号照常发出
    pub fn cancel(&mut self, id: CallId, force_finish: bool) -> Result<(), SchedulerError> {
        let call = self
            .calls
            .get_mut(id)
            .ok_or(SchedulerError::UnknownCall { call: id })?;

        if force_finish {
            call.time_start = TimeStart::ForceFinish;
            call.delay = 0.0;
            call.loop_count = 0;
            call.repeat_count = 0;
            debug!(call = ?id, "强制完成");
        } else {
            self.complete_call(id, CompletionKind::Stopped);
        }
        Ok(())
    }

    /// 暂停或恢复
    ///
    /// # 返回
    /// 状态实际发生变化的调用数量
    pub fn set_paused<'a>(
        &mut self,
        selector: impl Into<CallSelector<'a>>,
        paused: bool,
    ) -> Result<usize, SchedulerError> {
        match selector.into() {
            CallSelector::Call(id) => {
                let call = self
                    .calls
                    .get_mut(id)
                    .ok_or(SchedulerError::UnknownCall { call: id })?;
                Ok(usize::from(apply_pause(call, paused)))
            }
            CallSelector::Matching(predicate) => {
                let mut count = 0;
                let mut cursor = self.registry.first();
                while let Some(id) = cursor {
                    let Some(call) = self.calls.get_mut(id) else {
                        break;
                    };
                    cursor = call.next;
                    if predicate(call) && apply_pause(call, paused) {
                        count += 1;
                    }
                }
                Ok(count)
            }
        }
    }

    /// 修改速度倍率
    pub fn set_speed(&mut self, id: CallId, speed: f64) -> Result<(), SchedulerError> {
        let call = self
            .calls
            .get_mut(id)
            .ok_or(SchedulerError::UnknownCall { call: id })?;
        call.speed = speed.max(0.0);
        Ok(())
    }

    /// 修改延迟（仅对尚未开始的调用有效）
    pub fn set_delay(&mut self, id: CallId, delay_ms: f64) -> Result<(), SchedulerError> {
        let call = self
            .calls
            .get_mut(id)
            .ok_or(SchedulerError::UnknownCall { call: id })?;
        if call.started {
            return Err(SchedulerError::InvalidState {
                call: id,
                message: "调用已开始，延迟不再生效".to_string(),
            });
        }
        call.delay = self.config.scale_time(delay_ms.max(0.0));
        Ok(())
    }

    // ========== tick ==========

    /// 处理一帧
    pub fn tick(&mut self, now: f64) -> ScheduleDecision {
        let delta = match self.last_tick {
            Some(last) => now - last,
            None => self.config.frame_time_ms,
        };
        if self.last_tick.is_some() && delta < self.config.min_frame_time_ms() {
            trace!(now, delta, "帧间隔过短，跳过");
            return ScheduleDecision::RequestFrame;
        }
        self.last_tick = Some(now);
        self.clock = now;

        self.expand_new_calls();
        self.evaluate(now, delta);
        self.dispatch_hooks(now);

        if self.registry.is_empty() {
            self.ticking = false;
            self.last_tick = None;
            debug!(now, "注册表已空，停止计时");
            ScheduleDecision::Idle
        } else {
            ScheduleDecision::RequestFrame
        }
    }

    /// 展开上次 tick 之后进入注册表的调用
    fn expand_new_calls(&mut self) {
        let Some(mut cursor) = self.registry.take_first_new() else {
            return;
        };
        let Some(end) = self.registry.last() else {
            return;
        };
        let default_easing = self.default_easing();

        loop {
            let next = self.calls.get(cursor).and_then(|call| call.next);
            if let Err(error) = self.expand_call(cursor, &default_easing) {
                let element = self.calls.get(cursor).map(|call| call.element);
                if let Some(element) = element {
                    warn!(call = ?cursor, element = %element, error = %error, "tween 展开失败，丢弃动画调用");
                    self.events.push(SchedulerEvent::TweenRejected {
                        call: cursor,
                        element,
                        error,
                    });
                }
                self.complete_call(cursor, CompletionKind::Rejected);
            }
            if cursor == end {
                break;
            }
            match next {
                Some(id) => cursor = id,
                None => break,
            }
        }
    }

    fn expand_call(
        &mut self,
        id: CallId,
        default_easing: &ResolvedEasing,
    ) -> Result<(), TweenError> {
        let Some(call) = self.calls.get_mut(id) else {
            return Ok(());
        };
        // 失效目标留给求值阶段清理
        if call.expanded || !self.target.is_live(call.element) {
            return Ok(());
        }

        let call_easing = match &call.easing {
            None => default_easing.clone(),
            Some(easing) => self.easings.resolve(easing).unwrap_or_else(|| {
                warn!(call = ?id, easing = ?easing, "未注册的缓动，使用默认缓动");
                default_easing.clone()
            }),
        };

        let element = call.element;
        for tween in &mut call.tweens {
            tween.expand(element, &self.target, &self.easings, &call_easing)?;
        }
        call.expanded = true;
        Ok(())
    }

    fn default_easing(&self) -> ResolvedEasing {
        self.easings
            .lookup(&self.config.default_easing)
            .unwrap_or(ResolvedEasing::Builtin(EasingFunction::Swing))
    }

    /// 求值阶段
    fn evaluate(&mut self, now: f64, delta: f64) {
        self.progress_batch.clear();
        self.complete_batch.clear();
        let mut deferred = false;

        let mut cursor = self.registry.first();
        while let Some(id) = cursor {
            if Some(id) == self.registry.first_new() {
                break;
            }
            cursor = self.calls.get(id).and_then(|call| call.next);

            match self.step_call(id, now, delta) {
                Step::Skipped => {}
                Step::Stale => self.complete_call(id, CompletionKind::Stale),
                Step::Evaluated { deferred: d } => deferred |= d,
            }
        }

        if deferred {
            self.target.flush();
        }
    }

    fn step_call(&mut self, id: CallId, now: f64, delta: f64) -> Step {
        let Some(call) = self.calls.get_mut(id) else {
            return Step::Skipped;
        };
        let element = call.element;
        if !self.target.is_live(element) {
            return Step::Stale;
        }

        let forced = call.time_start == TimeStart::ForceFinish;
        let first_frame = call.time_start == TimeStart::Unset || !call.started;
        let mut time_start = match call.time_start {
            TimeStart::At(t) => t,
            TimeStart::ForceFinish => now - call.duration,
            TimeStart::Unset => {
                let start = now - delta;
                match call
                    .queue
                    .as_named()
                    .and_then(|name| self.queues.last_finished(element, name))
                {
                    Some(finished) => start.max(finished),
                    None => start,
                }
            }
        };

        if forced {
            call.pause = PauseState::Running;
        }
        match call.pause {
            PauseState::Paused => {
                call.time_start = TimeStart::At(time_start + delta);
                return Step::Skipped;
            }
            PauseState::ResumingThisTick => call.pause = PauseState::Running,
            PauseState::Running => {}
        }

        if !call.started {
            if call.delay > 0.0 && !forced {
                if time_start + call.delay / call.speed > now {
                    call.time_start = TimeStart::At(time_start);
                    return Step::Skipped;
                }
                time_start = now - delta;
            }
            call.started = true;

            if !call.begin_fired {
                call.begin_fired = true;
                self.events.push(SchedulerEvent::Began { call: id, element });
                // 整组只在第一个开始的成员上触发 begin
                let begin = call
                    .group
                    .and_then(|group| self.groups.get_mut(group))
                    .and_then(|group| group.begin(id));
                let view: &AnimationCall = call;
                let result = begin.map(|hook| hook(view.elements(), view));
                if let Some(Err(error)) = result {
                    report_hook_failure(&mut self.events, id, element, HookKind::Begin, error);
                }
            }
        }

        // 延迟中和运行中的速度处理不同：延迟按 delay / speed 折算，运行中按帧平移起点
        if call.speed != 1.0 && !forced {
            let shift = delta.min(now - time_start);
            if call.speed == 0.0 {
                time_start += shift;
            } else {
                time_start += shift * (1.0 - call.speed);
            }
        }
        call.time_start = TimeStart::At(time_start);

        let elapsed = now - time_start;
        call.elapsed = elapsed;
        let percent = if forced || self.config.mock == MockMode::Instant || call.duration <= 0.0 {
            1.0
        } else {
            (elapsed / call.duration).clamp(0.0, 1.0)
        };
        let percent = percent.max(call.percent_complete);
        call.percent_complete = percent;

        let reverse = call.direction == Direction::Backward;
        let mut deferred = false;
        for tween in &mut call.tweens {
            let changed = tween.evaluate(percent, reverse);
            if tween.is_progress_pseudo() || !(changed || first_frame) {
                continue;
            }
            if self.target.write(element, tween.property(), tween.value()) == WriteOutcome::Deferred
            {
                deferred = true;
            }
        }

        let reports = call
            .group
            .and_then(|group| self.groups.get(group))
            .is_some_and(|group| group.reports_progress(id));
        if reports {
            self.progress_batch.push(id);
        }
        if percent >= 1.0 {
            self.complete_batch.push(id);
        }
        Step::Evaluated { deferred }
    }

    /// 钩子阶段：所有写入完成后再执行
    fn dispatch_hooks(&mut self, now: f64) {
        let progress = std::mem::take(&mut self.progress_batch);
        for &id in &progress {
            let Some(call) = self.calls.get(id) else {
                continue;
            };
            let Some(hook) = call
                .group
                .and_then(|group| self.groups.get(group))
                .and_then(|group| group.hooks.progress.clone())
            else {
                continue;
            };
            let time_start = match call.time_start {
                TimeStart::At(t) => t,
                _ => now,
            };
            let info = Progress {
                percent_complete: call.percent_complete,
                ms_remaining: (time_start + call.duration - now).max(0.0),
                time_start,
                progress_value: call.progress_value(),
            };
            let element = call.element;
            if let Err(error) = hook(call.elements(), &info, call) {
                report_hook_failure(&mut self.events, id, element, HookKind::Progress, error);
            }
        }
        self.progress_batch = progress;

        let complete = std::mem::take(&mut self.complete_batch);
        for &id in &complete {
            self.complete_call(id, CompletionKind::Natural);
        }
        self.complete_batch = complete;
    }

    // ========== 生命周期 ==========

    /// 结束调用
    ///
    /// 自然完成且还有 loop / repeat 次数时，原地重新布置而不结束。
    /// 否则：摘除、（自然完成时）写入终态、推进元素队列、释放空闲的队列记录。
    /// 调用是请求组的最后一个成员时，（自然完成时）触发 complete 钩子并发出完成信号。
    ///
    /// 目标失效时，元素上所有排队中的调用一并以 `Stale` 结束，不再逐个提升。
    pub fn complete_call(&mut self, id: CallId, kind: CompletionKind) {
        let Some(call) = self.calls.get_mut(id) else {
            return;
        };
        let element = call.element;

        if kind == CompletionKind::Natural && call.rearm() {
            let direction = call.direction;
            debug!(call = ?id, element = %element, direction = ?direction, "重新开始下一段");
            self.events.push(SchedulerEvent::Rearmed {
                call: id,
                element,
                direction,
            });
            return;
        }

        let membership = call.membership;
        let queue = call.queue.clone();
        let group = call.group;
        match membership {
            Membership::Active => self.free(id),
            Membership::Pending => {
                if let Some(name) = queue.as_named() {
                    self.queues.remove(&mut self.calls, element, name, id);
                }
            }
            Membership::Detached => {}
        }
        let closed = group.and_then(|group| self.leave_group(group, id));

        if kind == CompletionKind::Natural {
            self.apply_terminal(id);
            if let (Some(group), Some(call)) = (&closed, self.calls.get(id)) {
                let result = group
                    .hooks
                    .complete
                    .clone()
                    .map(|hook| hook(call.elements(), call));
                if let Some(Err(error)) = result {
                    report_hook_failure(&mut self.events, id, element, HookKind::Complete, error);
                }
            }
        }

        // 只有占用队列的调用结束时才推进队列
        if membership == Membership::Active {
            if kind == CompletionKind::Stale {
                self.drain_stale(element);
            }
            self.dequeue(element, &queue, false);
        }
        self.queues.prune(element);

        let Some(call) = self.calls.remove(id) else {
            return;
        };
        if let Some(resolve) = closed.and_then(|mut group| group.resolver.take()) {
            resolve(call.elements());
        }

        let event = match kind {
            CompletionKind::Natural => {
                debug!(call = ?id, element = %element, "动画完成");
                Some(SchedulerEvent::Completed { call: id, element })
            }
            CompletionKind::Stopped => {
                debug!(call = ?id, element = %element, "动画停止");
                Some(SchedulerEvent::Stopped { call: id, element })
            }
            CompletionKind::Stale => {
                debug!(call = ?id, element = %element, "目标已失效，结束动画");
                Some(SchedulerEvent::StaleTarget { call: id, element })
            }
            CompletionKind::Rejected => None,
        };
        self.events.extend(event);
    }

    /// 成员离开请求组，最后一个成员离开时取出整个组
    fn leave_group(&mut self, group: GroupId, id: CallId) -> Option<CallGroup> {
        let last = self.groups.get_mut(group)?.leave(id);
        if last { self.groups.remove(group) } else { None }
    }

    /// 结束已失效元素上所有排队中的调用
    fn drain_stale(&mut self, element: ElementId) {
        let pending: Vec<CallId> = self
            .queues
            .names(element)
            .iter()
            .flat_map(|name| self.queues.pending(&self.calls, element, name))
            .collect();
        if !pending.is_empty() {
            debug!(element = %element, count = pending.len(), "目标已失效，清空排队中的调用");
        }
        for id in pending {
            self.complete_call(id, CompletionKind::Stale);
        }
    }

    /// 从注册表摘除，并记录队列的结束时间
    fn free(&mut self, id: CallId) {
        self.registry.unlink(&mut self.calls, id);
        if let Some(call) = self.calls.get(id) {
            if let Some(name) = call.queue.as_named() {
                self.queues.record_finished(call.element, name, self.clock);
            }
        }
    }

    /// 写入终态值
    fn apply_terminal(&mut self, id: CallId) {
        let Some(call) = self.calls.get(id) else {
            return;
        };
        if call.terminal.is_empty() {
            return;
        }
        let mut deferred = false;
        for (property, value) in &call.terminal {
            let outcome = self
                .target
                .write(call.element, property, PropertyValue::Number(*value));
            deferred |= outcome == WriteOutcome::Deferred;
        }
        if deferred {
            self.target.flush();
        }
    }

    /// 提交时确定时长并套用模拟模式
    fn prepare(&self, call: &mut AnimationCall) {
        let duration = call
            .requested_duration
            .unwrap_or(self.config.default_duration_ms);
        match self.config.mock {
            MockMode::Instant => {
                call.duration = 0.0;
                call.delay = 0.0;
            }
            _ => {
                call.duration = self.config.scale_time(duration);
                call.delay = self.config.scale_time(call.delay);
            }
        }
    }
}

fn apply_pause(call: &mut AnimationCall, paused: bool) -> bool {
    let next = match (paused, call.pause) {
        (true, PauseState::Paused) | (false, PauseState::Running) => return false,
        (true, _) => PauseState::Paused,
        (false, PauseState::Paused) => PauseState::ResumingThisTick,
        (false, PauseState::ResumingThisTick) => return false,
    };
    call.pause = next;
    true
}

fn report_hook_failure(
    events: &mut Vec<SchedulerEvent>,
    call: CallId,
    element: ElementId,
    hook: HookKind,
    error: HookError,
) {
    warn!(call = ?call, element = %element, hook = ?hook, error = %error, "钩子执行失败");
    events.push(SchedulerEvent::HookFailed {
        call,
        element,
        hook,
        error,
    });
}
