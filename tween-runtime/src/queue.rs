//! # Queue 模块
//!
//! 每个元素、每个命名队列上的 FIFO。
//!
//! 一个命名队列有三种状态：
//!
//! - 空闲：没有记录，新调用直接进入注册表
//! - 占用：有调用正在注册表中运行，但没有排队者
//! - 排队：占用且有等待中的调用（`head` .. `tail`，通过 `queue_next` 链接）
//!
//! 队列还记录上一个调用结束的时间，用于把下一个调用的计时起点
//! 钳制在它之后，避免同一队列上的动画在时间上重叠。

use std::collections::HashMap;

use slotmap::SlotMap;

use crate::call::{AnimationCall, CallId, Membership};
use crate::target::ElementId;

/// 占用中的队列
#[derive(Debug, Default, Clone, Copy)]
struct Occupied {
    head: Option<CallId>,
    tail: Option<CallId>,
}

/// 单个元素上的所有命名队列
#[derive(Debug, Default)]
pub struct ElementQueue {
    slots: HashMap<String, Occupied>,
    last_finished: HashMap<String, f64>,
}

impl ElementQueue {
    fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// 入队结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Enqueued {
    /// 队列空闲，调用应立即进入注册表
    Promote,
    /// 排在已有调用之后
    Waiting,
}

/// 所有元素的队列表
#[derive(Debug, Default)]
pub(crate) struct ElementQueues {
    elements: HashMap<ElementId, ElementQueue>,
}

impl ElementQueues {
    /// 把调用放入命名队列
    pub(crate) fn push(
        &mut self,
        calls: &mut SlotMap<CallId, AnimationCall>,
        element: ElementId,
        name: &str,
        id: CallId,
    ) -> Enqueued {
        let queue = self.elements.entry(element).or_default();

        let Some(slot) = queue.slots.get_mut(name) else {
            queue.slots.insert(name.to_string(), Occupied::default());
            return Enqueued::Promote;
        };

        if let Some(call) = calls.get_mut(id) {
            debug_assert_eq!(call.membership, Membership::Detached);
            call.membership = Membership::Pending;
            call.queue_next = None;
        }

        match slot.tail {
            Some(tail) => {
                if let Some(tail_call) = calls.get_mut(tail) {
                    tail_call.queue_next = Some(id);
                }
            }
            None => slot.head = Some(id),
        }
        slot.tail = Some(id);
        Enqueued::Waiting
    }

    /// 弹出队首
    ///
    /// 队列占用但无排队者时，转为空闲并返回 `None`。
    /// 弹出的调用处于脱离状态，由调用方决定是否放入注册表。
    pub(crate) fn pop(
        &mut self,
        calls: &mut SlotMap<CallId, AnimationCall>,
        element: ElementId,
        name: &str,
    ) -> Option<CallId> {
        let queue = self.elements.get_mut(&element)?;
        let slot = queue.slots.get_mut(name)?;

        let Some(head) = slot.head else {
            queue.slots.remove(name);
            return None;
        };

        let next = calls.get_mut(head).and_then(|call| {
            call.membership = Membership::Detached;
            call.queue_next.take()
        });
        slot.head = next;
        if next.is_none() {
            slot.tail = None;
        }
        Some(head)
    }

    /// 从队列中间移除一个等待中的调用
    pub(crate) fn remove(
        &mut self,
        calls: &mut SlotMap<CallId, AnimationCall>,
        element: ElementId,
        name: &str,
        id: CallId,
    ) -> bool {
        let Some(slot) = self
            .elements
            .get_mut(&element)
            .and_then(|queue| queue.slots.get_mut(name))
        else {
            return false;
        };

        let mut prev: Option<CallId> = None;
        let mut cursor = slot.head;
        while let Some(current) = cursor {
            let next = calls.get(current).and_then(|call| call.queue_next);
            if current == id {
                match prev {
                    Some(p) => {
                        if let Some(prev_call) = calls.get_mut(p) {
                            prev_call.queue_next = next;
                        }
                    }
                    None => slot.head = next,
                }
                if slot.tail == Some(id) {
                    slot.tail = prev;
                }
                if let Some(call) = calls.get_mut(id) {
                    call.queue_next = None;
                    call.membership = Membership::Detached;
                }
                return true;
            }
            prev = cursor;
            cursor = next;
        }
        false
    }

    /// 按顺序列出等待中的调用
    pub(crate) fn pending(
        &self,
        calls: &SlotMap<CallId, AnimationCall>,
        element: ElementId,
        name: &str,
    ) -> Vec<CallId> {
        let mut out = Vec::new();
        let mut cursor = self
            .elements
            .get(&element)
            .and_then(|queue| queue.slots.get(name))
            .and_then(|slot| slot.head);
        while let Some(id) = cursor {
            out.push(id);
            cursor = calls.get(id).and_then(|call| call.queue_next);
        }
        out
    }

    /// 元素上所有非空闲队列的名称
    pub(crate) fn names(&self, element: ElementId) -> Vec<String> {
        self.elements
            .get(&element)
            .map(|queue| queue.slots.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// 所有有队列记录的元素
    pub(crate) fn elements(&self) -> Vec<ElementId> {
        self.elements.keys().copied().collect()
    }

    pub(crate) fn is_occupied(&self, element: ElementId, name: &str) -> bool {
        self.elements
            .get(&element)
            .is_some_and(|queue| queue.slots.contains_key(name))
    }

    pub(crate) fn record_finished(&mut self, element: ElementId, name: &str, at: f64) {
        self.elements
            .entry(element)
            .or_default()
            .last_finished
            .insert(name.to_string(), at);
    }

    pub(crate) fn last_finished(&self, element: ElementId, name: &str) -> Option<f64> {
        self.elements
            .get(&element)
            .and_then(|queue| queue.last_finished.get(name).copied())
    }

    /// 元素的所有队列都空闲时丢弃它的记录（包括结束时间）
    pub(crate) fn prune(&mut self, element: ElementId) {
        if self.elements.get(&element).is_some_and(ElementQueue::is_empty) {
            self.elements.remove(&element);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(n: usize) -> (SlotMap<CallId, AnimationCall>, Vec<CallId>) {
        let mut calls = SlotMap::with_key();
        let ids = (0..n)
            .map(|_| calls.insert(AnimationCall::new(ElementId::new(1))))
            .collect();
        (calls, ids)
    }

    #[test]
    fn test_first_push_promotes() {
        let (mut calls, ids) = setup(3);
        let mut queues = ElementQueues::default();
        let el = ElementId::new(1);

        assert_eq!(queues.push(&mut calls, el, "", ids[0]), Enqueued::Promote);
        assert!(queues.is_occupied(el, ""));
        // 第一个调用不进入等待链
        assert_eq!(calls[ids[0]].membership, Membership::Detached);

        assert_eq!(queues.push(&mut calls, el, "", ids[1]), Enqueued::Waiting);
        assert_eq!(queues.push(&mut calls, el, "", ids[2]), Enqueued::Waiting);
        assert_eq!(queues.pending(&calls, el, ""), vec![ids[1], ids[2]]);
        assert_eq!(calls[ids[1]].membership, Membership::Pending);

        // 不同队列名互不影响
        assert_eq!(queues.push(&mut calls, el, "fx", ids[0]), Enqueued::Promote);
    }

    #[test]
    fn test_pop_order_and_idle() {
        let (mut calls, ids) = setup(3);
        let mut queues = ElementQueues::default();
        let el = ElementId::new(1);
        for id in &ids {
            queues.push(&mut calls, el, "", *id);
        }

        assert_eq!(queues.pop(&mut calls, el, ""), Some(ids[1]));
        assert_eq!(queues.pop(&mut calls, el, ""), Some(ids[2]));
        // 仍被占用（最后弹出的调用在运行）
        assert!(queues.is_occupied(el, ""));
        assert_eq!(queues.pop(&mut calls, el, ""), None);
        assert!(!queues.is_occupied(el, ""));
        assert_eq!(queues.pop(&mut calls, el, ""), None);

        // 空闲后再次入队会立即提升
        assert_eq!(queues.push(&mut calls, el, "", ids[0]), Enqueued::Promote);
    }

    #[test]
    fn test_remove_pending() {
        let (mut calls, ids) = setup(4);
        let mut queues = ElementQueues::default();
        let el = ElementId::new(1);
        for id in &ids {
            queues.push(&mut calls, el, "", *id);
        }

        // 移除尾部
        assert!(queues.remove(&mut calls, el, "", ids[3]));
        assert_eq!(queues.pending(&calls, el, ""), vec![ids[1], ids[2]]);
        // 移除头部
        assert!(queues.remove(&mut calls, el, "", ids[1]));
        assert_eq!(queues.pending(&calls, el, ""), vec![ids[2]]);
        assert!(!queues.remove(&mut calls, el, "", ids[1]));

        // 尾指针正确，追加仍然生效
        queues.push(&mut calls, el, "", ids[3]);
        assert_eq!(queues.pending(&calls, el, ""), vec![ids[2], ids[3]]);
    }

    #[test]
    fn test_last_finished_and_prune() {
        let (mut calls, ids) = setup(1);
        let mut queues = ElementQueues::default();
        let el = ElementId::new(1);

        queues.push(&mut calls, el, "", ids[0]);
        queues.record_finished(el, "", 120.0);
        assert_eq!(queues.last_finished(el, ""), Some(120.0));
        assert_eq!(queues.last_finished(el, "fx"), None);

        // 仍被占用时不会被清理
        queues.prune(el);
        assert_eq!(queues.names(el), vec![String::new()]);

        queues.pop(&mut calls, el, "");
        queues.prune(el);
        assert!(queues.elements().is_empty());
    }
}
