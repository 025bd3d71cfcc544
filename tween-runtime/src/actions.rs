//! # Actions 模块
//!
//! 由调度器基本操作组合出的常用动作：停止、完成、暂停、恢复。
//!
//! 每个动作都接受一个元素过滤（`None` 表示所有元素）和一个队列选择器。

use serde::{Deserialize, Serialize};

use crate::call::{AnimationCall, CallId, QueueName};
use crate::scheduler::{CallSelector, Scheduler};
use crate::target::{ElementId, PropertyTarget};

/// 队列选择器
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueSelector {
    /// 默认队列（`""`）
    #[default]
    Default,
    /// 任意队列，包括并行调用
    All,
    /// 只选并行调用
    Parallel,
    /// 指定名称的队列
    Named(String),
}

impl QueueSelector {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// 调用所在的队列是否被选中
    pub fn matches(&self, queue: &QueueName) -> bool {
        match self {
            Self::All => true,
            Self::Default => queue.as_named() == Some(""),
            Self::Parallel => *queue == QueueName::Parallel,
            Self::Named(name) => queue.as_named() == Some(name.as_str()),
        }
    }

    /// 元素上被选中的命名队列
    fn queues<T: PropertyTarget>(
        &self,
        scheduler: &Scheduler<T>,
        element: ElementId,
    ) -> Vec<QueueName> {
        match self {
            Self::All => scheduler.queue_names(element),
            Self::Default => vec![QueueName::default()],
            Self::Parallel => Vec::new(),
            Self::Named(name) => vec![QueueName::Named(name.clone())],
        }
    }
}

fn selected(
    elements: Option<&[ElementId]>,
    call: &AnimationCall,
    selector: &QueueSelector,
) -> bool {
    elements.is_none_or(|list| list.contains(&call.element())) && selector.matches(call.queue())
}

fn element_list<T: PropertyTarget>(
    scheduler: &Scheduler<T>,
    elements: Option<&[ElementId]>,
) -> Vec<ElementId> {
    match elements {
        Some(list) => list.to_vec(),
        None => scheduler.queued_elements(),
    }
}

fn matching_active<T: PropertyTarget>(
    scheduler: &Scheduler<T>,
    elements: Option<&[ElementId]>,
    selector: &QueueSelector,
) -> Vec<CallId> {
    scheduler
        .active_calls()
        .into_iter()
        .filter(|id| {
            scheduler
                .call(*id)
                .is_some_and(|call| selected(elements, call, selector))
        })
        .collect()
}

/// 立即停止匹配的活跃调用
///
/// `clear_queue` 为真时，先移除匹配队列中所有等待中的调用（它们的完成信号照常发出）。
/// 被停止的调用不触发 complete 钩子；元素队列中的下一个调用会被提升。
///
/// # 返回
/// 被停止的调用数量（包括被清除的等待调用）
pub fn stop<T: PropertyTarget>(
    scheduler: &mut Scheduler<T>,
    elements: Option<&[ElementId]>,
    selector: &QueueSelector,
    clear_queue: bool,
) -> usize {
    let mut count = 0;

    if clear_queue {
        for element in element_list(scheduler, elements) {
            for queue in selector.queues(scheduler, element) {
                for id in scheduler.pending(element, &queue) {
                    if scheduler.cancel(id, false).is_ok() {
                        count += 1;
                    }
                }
            }
        }
    }

    for id in matching_active(scheduler, elements, selector) {
        if scheduler.cancel(id, false).is_ok() {
            count += 1;
        }
    }
    count
}

/// 强制完成匹配的活跃调用（下一次 tick 跳到终点并触发 complete 钩子）
pub fn finish<T: PropertyTarget>(
    scheduler: &mut Scheduler<T>,
    elements: Option<&[ElementId]>,
    selector: &QueueSelector,
) -> usize {
    let mut count = 0;
    for id in matching_active(scheduler, elements, selector) {
        if scheduler.cancel(id, true).is_ok() {
            count += 1;
        }
    }
    count
}

/// 完成匹配的活跃调用以及队列中所有等待的调用
///
/// 等待中的调用被提升为并行调用后一起强制完成，下一次 tick 全部到达终点。
pub fn finish_all<T: PropertyTarget>(
    scheduler: &mut Scheduler<T>,
    elements: Option<&[ElementId]>,
    selector: &QueueSelector,
) -> usize {
    let mut drained = Vec::new();
    for element in element_list(scheduler, elements) {
        for queue in selector.queues(scheduler, element) {
            while let Some(id) = scheduler.dequeue(element, &queue, false) {
                if let Some(call) = scheduler.call_mut(id) {
                    call.queue = QueueName::Parallel;
                }
                drained.push(id);
            }
        }
    }

    let mut targets = matching_active(scheduler, elements, selector);
    targets.retain(|id| !drained.contains(id));
    targets.extend(drained);

    let mut count = 0;
    for id in targets {
        if scheduler.cancel(id, true).is_ok() {
            count += 1;
        }
    }
    count
}

/// 暂停匹配的活跃调用
pub fn pause<T: PropertyTarget>(
    scheduler: &mut Scheduler<T>,
    elements: Option<&[ElementId]>,
    selector: &QueueSelector,
) -> usize {
    set_paused(scheduler, elements, selector, true)
}

/// 恢复匹配的活跃调用
pub fn resume<T: PropertyTarget>(
    scheduler: &mut Scheduler<T>,
    elements: Option<&[ElementId]>,
    selector: &QueueSelector,
) -> usize {
    set_paused(scheduler, elements, selector, false)
}

/// 暂停所有活跃调用
pub fn pause_all<T: PropertyTarget>(scheduler: &mut Scheduler<T>) -> usize {
    set_paused(scheduler, None, &QueueSelector::All, true)
}

/// 恢复所有活跃调用
pub fn resume_all<T: PropertyTarget>(scheduler: &mut Scheduler<T>) -> usize {
    set_paused(scheduler, None, &QueueSelector::All, false)
}

fn set_paused<T: PropertyTarget>(
    scheduler: &mut Scheduler<T>,
    elements: Option<&[ElementId]>,
    selector: &QueueSelector,
    paused: bool,
) -> usize {
    let predicate = CallSelector::matching(|call| selected(elements, call, selector));
    scheduler.set_paused(predicate, paused).unwrap_or_default()
}
