//! # Registry 模块
//!
//! 活跃调用的双向链表，链接字段存放在 arena 中的调用上。
//!
//! `first_new` 把链表分成两段：之前的调用已展开、可以求值；
//! 从它开始的调用是上次 tick 之后才加入的，本次 tick 先展开、下次才求值。

use slotmap::SlotMap;

use crate::call::{AnimationCall, CallId, Membership};

#[derive(Debug, Default)]
pub(crate) struct Registry {
    first: Option<CallId>,
    last: Option<CallId>,
    first_new: Option<CallId>,
    len: usize,
}

impl Registry {
    pub(crate) fn first(&self) -> Option<CallId> {
        self.first
    }

    pub(crate) fn last(&self) -> Option<CallId> {
        self.last
    }

    pub(crate) fn first_new(&self) -> Option<CallId> {
        self.first_new
    }

    /// 取走新调用段的起点，之后追加的调用开启新的一段
    pub(crate) fn take_first_new(&mut self) -> Option<CallId> {
        self.first_new.take()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// 追加到链表尾部
    pub(crate) fn append(&mut self, calls: &mut SlotMap<CallId, AnimationCall>, id: CallId) {
        let prev = self.last;
        let Some(call) = calls.get_mut(id) else {
            return;
        };
        debug_assert_eq!(
            call.membership,
            Membership::Detached,
            "调用不能同时处于队列和注册表中"
        );
        call.membership = Membership::Active;
        call.prev = prev;
        call.next = None;

        match prev.and_then(|p| calls.get_mut(p)) {
            Some(prev_call) => prev_call.next = Some(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);
        if self.first_new.is_none() {
            self.first_new = Some(id);
        }
        self.len += 1;
    }

    /// 从链表中摘除（O(1)）
    pub(crate) fn unlink(&mut self, calls: &mut SlotMap<CallId, AnimationCall>, id: CallId) {
        let Some(call) = calls.get_mut(id) else {
            return;
        };
        debug_assert_eq!(call.membership, Membership::Active);
        let (prev, next) = (call.prev.take(), call.next.take());
        call.membership = Membership::Detached;

        match prev {
            Some(p) => {
                if let Some(prev_call) = calls.get_mut(p) {
                    prev_call.next = next;
                }
            }
            None => self.first = next,
        }
        match next {
            Some(n) => {
                if let Some(next_call) = calls.get_mut(n) {
                    next_call.prev = prev;
                }
            }
            None => self.last = prev,
        }
        if self.first_new == Some(id) {
            self.first_new = next;
        }
        self.len -= 1;
    }

    /// 按链表顺序收集所有调用
    pub(crate) fn ids(&self, calls: &SlotMap<CallId, AnimationCall>) -> Vec<CallId> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.first;
        while let Some(id) = cursor {
            out.push(id);
            cursor = calls.get(id).and_then(|call| call.next);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::ElementId;

    fn setup(n: usize) -> (SlotMap<CallId, AnimationCall>, Vec<CallId>) {
        let mut calls = SlotMap::with_key();
        let ids = (0..n)
            .map(|i| calls.insert(AnimationCall::new(ElementId::new(i as u64))))
            .collect();
        (calls, ids)
    }

    #[test]
    fn test_append_order() {
        let (mut calls, ids) = setup(3);
        let mut registry = Registry::default();
        for id in &ids {
            registry.append(&mut calls, *id);
        }

        assert_eq!(registry.ids(&calls), ids);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.first(), Some(ids[0]));
        assert_eq!(registry.last(), Some(ids[2]));
        // first_new 指向本轮第一个追加的调用
        assert_eq!(registry.first_new(), Some(ids[0]));
        assert_eq!(calls[ids[1]].membership, Membership::Active);
    }

    #[test]
    fn test_unlink_middle_and_ends() {
        let (mut calls, ids) = setup(4);
        let mut registry = Registry::default();
        for id in &ids {
            registry.append(&mut calls, *id);
        }

        registry.unlink(&mut calls, ids[1]);
        assert_eq!(registry.ids(&calls), vec![ids[0], ids[2], ids[3]]);

        registry.unlink(&mut calls, ids[0]);
        assert_eq!(registry.first(), Some(ids[2]));

        registry.unlink(&mut calls, ids[3]);
        assert_eq!(registry.last(), Some(ids[2]));
        assert_eq!(registry.ids(&calls), vec![ids[2]]);

        registry.unlink(&mut calls, ids[2]);
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(calls[ids[2]].membership, Membership::Detached);
    }

    #[test]
    fn test_first_new_boundary() {
        let (mut calls, ids) = setup(4);
        let mut registry = Registry::default();
        registry.append(&mut calls, ids[0]);
        registry.append(&mut calls, ids[1]);

        assert_eq!(registry.take_first_new(), Some(ids[0]));
        assert_eq!(registry.first_new(), None);

        // 新的一段从 ids[2] 开始
        registry.append(&mut calls, ids[2]);
        registry.append(&mut calls, ids[3]);
        assert_eq!(registry.first_new(), Some(ids[2]));

        // 摘除边界调用时边界后移
        registry.unlink(&mut calls, ids[2]);
        assert_eq!(registry.first_new(), Some(ids[3]));
        registry.unlink(&mut calls, ids[3]);
        assert_eq!(registry.first_new(), None);
    }
}
