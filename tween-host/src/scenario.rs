//! # Scenario 模块
//!
//! headless 播放用的场景文件。
//!
//! 场景描述元素的初始属性、按时间提交的动画调用和按时间触发的动作，
//! 由 [`Player`] 在内存目标上逐帧播放，并记录每帧的属性值与事件。
//!
//! ```json
//! {
//!   "elements": [{ "id": 1, "properties": { "opacity": 0 } }],
//!   "calls": [
//!     { "label": "A", "element": 1, "duration": 200,
//!       "tweens": [{ "property": "opacity", "to": 1, "easing": "linear" }] }
//!   ],
//!   "actions": [{ "at": 100, "action": "pause", "elements": [1] }]
//! }
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use tween_runtime::{
    AnimationCall, CallId, Easing, ElementId, MemoryTarget, Pattern, QueueName,
    QueueSelector, ScheduleDecision, Scheduler, SchedulerEvent, StoredValue, Tween, TweenError,
    TweenValue, actions,
};

use crate::config::AppConfig;
use crate::driver::{DriverStep, FrameDriver, SharedScheduler};

/// 场景错误
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("场景文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("场景文件解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("调用 '{label}' 引用了未声明的元素 {element}")]
    UnknownElement { label: String, element: u64 },

    #[error("调用 '{label}' 的 tween 无效: {source}")]
    InvalidTween {
        label: String,
        #[source]
        source: TweenError,
    },
}

/// 场景
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
    #[serde(default)]
    pub calls: Vec<CallSpec>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

/// 元素及其初始属性
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSpec {
    pub id: u64,
    #[serde(default)]
    pub properties: BTreeMap<String, f64>,
}

/// 一次动画提交
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSpec {
    /// 提交时间（毫秒）
    #[serde(default)]
    pub at: f64,
    /// 事件输出中使用的名称，缺省为 `#序号`
    #[serde(default)]
    pub label: Option<String>,
    pub element: u64,
    /// 与 `element` 共享同一请求的其他元素（钩子按整组触发）
    #[serde(default)]
    pub group: Vec<u64>,
    pub tweens: Vec<TweenSpec>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub delay: f64,
    #[serde(default)]
    pub queue: QueueName,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default, rename = "loop")]
    pub loop_count: u32,
    #[serde(default)]
    pub repeat: u32,
    #[serde(default)]
    pub easing: Option<String>,
    /// 在事件中输出每帧进度
    #[serde(default)]
    pub report_progress: bool,
}

fn default_speed() -> f64 {
    1.0
}

/// 单个属性的 tween
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweenSpec {
    pub property: String,
    pub to: ValueSpec,
    #[serde(default)]
    pub from: Option<ValueSpec>,
    #[serde(default)]
    pub easing: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub round: bool,
    /// 多分量值的输出模板，如 `"rgba({0!}, {1!}, {2!}, {3})"`
    #[serde(default)]
    pub pattern: Option<String>,
}

/// 数值或分量列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSpec {
    Number(f64),
    Components(Vec<f64>),
}

impl From<ValueSpec> for TweenValue {
    fn from(value: ValueSpec) -> Self {
        match value {
            ValueSpec::Number(n) => TweenValue::Number(n),
            ValueSpec::Components(c) => TweenValue::Components(c),
        }
    }
}

/// 按时间触发的动作
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(default)]
    pub at: f64,
    #[serde(flatten)]
    pub action: Action,
}

/// 场景动作
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Stop {
        #[serde(default)]
        elements: Option<Vec<u64>>,
        #[serde(default)]
        queue: QueueSelector,
        #[serde(default)]
        clear_queue: bool,
    },
    Finish {
        #[serde(default)]
        elements: Option<Vec<u64>>,
        #[serde(default)]
        queue: QueueSelector,
    },
    FinishAll {
        #[serde(default)]
        elements: Option<Vec<u64>>,
        #[serde(default)]
        queue: QueueSelector,
    },
    Pause {
        #[serde(default)]
        elements: Option<Vec<u64>>,
        #[serde(default)]
        queue: QueueSelector,
    },
    Resume {
        #[serde(default)]
        elements: Option<Vec<u64>>,
        #[serde(default)]
        queue: QueueSelector,
    },
    PauseAll,
    ResumeAll,
    /// 从目标中移除元素
    RemoveElement { element: u64 },
    /// 宿主可见性变化
    SetHidden { hidden: bool },
}

impl Scenario {
    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(content)?)
    }
}

/// 一帧的记录
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub index: usize,
    pub time: f64,
    pub decision: ScheduleDecision,
    /// `(元素, 属性, 值)`，值缺失时为 `"-"`
    pub values: Vec<(ElementId, String, String)>,
    /// 本帧（以及上一帧之后的动作）产生的事件
    pub events: Vec<String>,
}

impl fmt::Display for FrameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>4}] t={:>8.2}", self.index, self.time)?;
        for (element, property, value) in &self.values {
            write!(f, " {}.{}={}", element, property, value)?;
        }
        for event in &self.events {
            write!(f, " | {}", event)?;
        }
        Ok(())
    }
}

/// 待处理的时间点
enum Cue {
    Call(Box<AnimationCall>, Vec<ElementId>, String),
    Action(Action),
}

/// 场景播放器
pub struct Player {
    driver: FrameDriver<MemoryTarget>,
    cues: Vec<(f64, Cue)>,
    labels: HashMap<CallId, String>,
    watched: Vec<(ElementId, String)>,
    hook_log: Rc<RefCell<Vec<String>>>,
}

impl Player {
    /// 根据场景与配置创建播放器
    pub fn new(scenario: Scenario, config: &AppConfig) -> Result<Self, ScenarioError> {
        let mut target = MemoryTarget::new();
        let mut watched = Vec::new();
        for spec in &scenario.elements {
            let element = ElementId::new(spec.id);
            target.add_element(element);
            for (property, value) in &spec.properties {
                target.set(element, property, *value);
                watched.push((element, property.clone()));
            }
        }

        let hook_log = Rc::new(RefCell::new(Vec::new()));
        let mut cues = Vec::new();
        for (index, spec) in scenario.calls.into_iter().enumerate() {
            let label = spec.label.clone().unwrap_or_else(|| format!("#{}", index));
            let ids: Vec<u64> = std::iter::once(spec.element)
                .chain(spec.group.iter().copied())
                .collect();
            if let Some(&missing) = ids
                .iter()
                .find(|&&id| !scenario.elements.iter().any(|e| e.id == id))
            {
                return Err(ScenarioError::UnknownElement {
                    label,
                    element: missing,
                });
            }
            let elements: Vec<ElementId> = ids.into_iter().map(ElementId::new).collect();
            for &element in &elements {
                for tween in &spec.tweens {
                    let key = (element, tween.property.clone());
                    if tween.property != tween_runtime::TWEEN_PROPERTY && !watched.contains(&key) {
                        watched.push(key);
                    }
                }
            }
            let at = spec.at;
            let call = build_call(spec, &label, &hook_log)?;
            cues.push((at, Cue::Call(Box::new(call), elements, label)));
        }
        for spec in scenario.actions {
            cues.push((spec.at, Cue::Action(spec.action)));
        }
        // 稳定排序：同一时刻按声明顺序，提交先于动作
        cues.sort_by(|a, b| a.0.total_cmp(&b.0));
        cues.reverse();

        let scheduler: SharedScheduler<MemoryTarget> = Rc::new(RefCell::new(
            Scheduler::with_config(target, config.scheduler.clone()),
        ));
        let driver = FrameDriver::new(scheduler, &config.driver);

        Ok(Self {
            driver,
            cues,
            labels: HashMap::new(),
            watched,
            hook_log,
        })
    }

    pub fn driver(&self) -> &FrameDriver<MemoryTarget> {
        &self.driver
    }

    pub fn scheduler(&self) -> &SharedScheduler<MemoryTarget> {
        self.driver.scheduler()
    }

    /// 播放直到没有活跃调用且没有剩余的时间点，最多 `max_frames` 帧
    pub fn run(&mut self, max_frames: usize) -> Vec<FrameRecord> {
        let mut records = Vec::new();
        let mut pending_events = Vec::new();

        while records.len() < max_frames {
            self.apply_due(&mut pending_events);

            match self.driver.step() {
                DriverStep::Ran(decision) => {
                    pending_events.extend(self.collect_events());
                    records.push(self.record(records.len(), decision, &mut pending_events));
                }
                DriverStep::Idle => match self.cues.last() {
                    Some((at, _)) => {
                        let at = *at;
                        self.driver.advance_to(at);
                    }
                    None => break,
                },
                DriverStep::Busy | DriverStep::Armed => {
                    warn!(now = self.driver.now(), "帧驱动未能处理帧，停止播放");
                    break;
                }
            }
        }

        info!(frames = records.len(), now = self.driver.now(), "场景播放结束");
        records
    }

    /// 执行所有已到时间的提交和动作
    fn apply_due(&mut self, pending_events: &mut Vec<String>) {
        let now = self.driver.now();
        let mut submitted = false;

        while self.cues.last().is_some_and(|(at, _)| *at <= now) {
            let Some((_, cue)) = self.cues.pop() else {
                break;
            };
            match cue {
                Cue::Call(call, elements, label) => {
                    let ids = self
                        .scheduler()
                        .borrow_mut()
                        .enqueue_group(&elements, *call);
                    debug!(calls = ?ids, label = %label, now, "场景提交调用");
                    for id in ids {
                        self.labels.insert(id, label.clone());
                    }
                    submitted = true;
                }
                Cue::Action(action) => self.apply_action(action),
            }
        }

        if submitted {
            self.driver.start();
        }
        pending_events.extend(self.collect_events());
    }

    fn apply_action(&mut self, action: Action) {
        debug!(?action, now = self.driver.now(), "场景动作");
        if let Action::SetHidden { hidden } = action {
            self.driver.set_hidden(hidden);
            return;
        }

        let shared = self.scheduler().clone();
        let mut guard = shared.borrow_mut();
        let scheduler = &mut *guard;
        let ids = |list: &Option<Vec<u64>>| {
            list.as_ref()
                .map(|l| l.iter().copied().map(ElementId::new).collect::<Vec<_>>())
        };

        match &action {
            Action::Stop {
                elements,
                queue,
                clear_queue,
            } => {
                let elements = ids(elements);
                actions::stop(scheduler, elements.as_deref(), queue, *clear_queue);
            }
            Action::Finish { elements, queue } => {
                let elements = ids(elements);
                actions::finish(scheduler, elements.as_deref(), queue);
            }
            Action::FinishAll { elements, queue } => {
                let elements = ids(elements);
                actions::finish_all(scheduler, elements.as_deref(), queue);
            }
            Action::Pause { elements, queue } => {
                let elements = ids(elements);
                actions::pause(scheduler, elements.as_deref(), queue);
            }
            Action::Resume { elements, queue } => {
                let elements = ids(elements);
                actions::resume(scheduler, elements.as_deref(), queue);
            }
            Action::PauseAll => {
                actions::pause_all(scheduler);
            }
            Action::ResumeAll => {
                actions::resume_all(scheduler);
            }
            Action::RemoveElement { element } => {
                scheduler.target_mut().remove_element(ElementId::new(*element));
            }
            Action::SetHidden { .. } => {}
        }
    }

    /// 取出调度器事件和钩子输出，转换为文本
    fn collect_events(&mut self) -> Vec<String> {
        let events = self.scheduler().borrow_mut().drain_events();
        let mut out: Vec<String> = self.hook_log.borrow_mut().drain(..).collect();
        for event in events {
            out.push(self.describe(&event));
        }
        out
    }

    fn label(&self, id: CallId) -> &str {
        self.labels.get(&id).map(String::as_str).unwrap_or("?")
    }

    fn describe(&self, event: &SchedulerEvent) -> String {
        match event {
            SchedulerEvent::Began { call, .. } => format!("began {}", self.label(*call)),
            SchedulerEvent::Rearmed {
                call, direction, ..
            } => format!("rearmed {} {:?}", self.label(*call), direction),
            SchedulerEvent::Completed { call, .. } => format!("completed {}", self.label(*call)),
            SchedulerEvent::Stopped { call, .. } => format!("stopped {}", self.label(*call)),
            SchedulerEvent::StaleTarget { call, .. } => format!("stale {}", self.label(*call)),
            SchedulerEvent::TweenRejected { call, error, .. } => {
                format!("rejected {}: {}", self.label(*call), error)
            }
            SchedulerEvent::HookFailed {
                call, hook, error, ..
            } => format!("hook {:?} failed {}: {}", hook, self.label(*call), error),
        }
    }

    fn record(
        &self,
        index: usize,
        decision: ScheduleDecision,
        pending_events: &mut Vec<String>,
    ) -> FrameRecord {
        let scheduler = self.scheduler().borrow();
        let values = self
            .watched
            .iter()
            .map(|(element, property)| {
                let value = match scheduler.target().get(*element, property) {
                    Some(StoredValue::Number(n)) => format!("{:.3}", n),
                    Some(StoredValue::Text(s)) => s.clone(),
                    None => "-".to_string(),
                };
                (*element, property.clone(), value)
            })
            .collect();

        FrameRecord {
            index,
            time: self.driver.now(),
            decision,
            values,
            events: std::mem::take(pending_events),
        }
    }
}

fn build_call(
    spec: CallSpec,
    label: &str,
    hook_log: &Rc<RefCell<Vec<String>>>,
) -> Result<AnimationCall, ScenarioError> {
    let mut call = AnimationCall::new(ElementId::new(spec.element))
        .with_delay(spec.delay)
        .with_queue(spec.queue)
        .with_speed(spec.speed)
        .with_loop(spec.loop_count)
        .with_repeat(spec.repeat);
    if let Some(duration) = spec.duration {
        call = call.with_duration(duration);
    }
    if let Some(name) = &spec.easing {
        call = call.with_easing(Easing::named(name));
    }

    for tween_spec in spec.tweens {
        let mut tween = Tween::new(tween_spec.property, tween_spec.to);
        if let Some(from) = tween_spec.from {
            tween = tween.from(from);
        }
        if let Some(name) = &tween_spec.easing {
            tween = tween.with_easing(Easing::named(name));
        }
        if let Some(source) = &tween_spec.pattern {
            let pattern = Pattern::parse(source).map_err(|source| ScenarioError::InvalidTween {
                label: label.to_string(),
                source,
            })?;
            tween = tween.with_pattern(pattern);
        } else {
            if let Some(unit) = tween_spec.unit {
                tween = tween.with_unit(unit);
            }
            if tween_spec.round {
                tween = tween.rounded();
            }
        }
        call = call.with_tween(tween);
    }

    if spec.report_progress {
        let log = hook_log.clone();
        let label = label.to_string();
        call = call.on_progress(move |_, progress, _| {
            let mut line = format!(
                "progress {} {:.3} remaining={:.1}",
                label, progress.percent_complete, progress.ms_remaining
            );
            if let Some(value) = progress.progress_value {
                line.push_str(&format!(" tween={:.3}", value));
            }
            log.borrow_mut().push(line);
            Ok(())
        });
    }

    Ok(call)
}
