//! # Target 模块
//!
//! 调度器与"值规范化"协作方之间的接口定义。
//!
//! ## 核心概念
//!
//! - `ElementId`: 动画目标的不透明标识，调度器只关心身份和存活性
//! - `PropertyTarget`: 协作方接口（读取初始值 / 写入 / 批量刷新）
//! - `MemoryTarget`: 基于内存表的简单实现，用于测试和无头运行

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::tween::TweenValue;

/// 元素标识符
///
/// 由宿主分配，调度器不解释其含义。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl ElementId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// 获取内部 ID 值
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

/// 每帧写入的属性值
///
/// 文本形式借用 tween 内部的缓冲区，避免每帧分配。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue<'a> {
    /// 纯数值（无单位）
    Number(f64),
    /// 带单位或模板拼接后的文本
    Text(&'a str),
}

impl PropertyValue<'_> {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// 写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// 已直接生效
    Applied,
    /// 复合属性写入被缓存，等待本帧结束时的 [`PropertyTarget::flush`]
    Deferred,
}

/// 值规范化协作方接口
///
/// 调度器不解析属性名，也不做单位换算；这些都由实现方负责。
/// 每个 tick 中：
/// - 展开阶段通过 `read` 获取缺失的起始值
/// - 求值阶段对每个 tween 调用 `write`
/// - 若本帧有任何 `Deferred` 写入，帧末调用一次 `flush`
pub trait PropertyTarget {
    /// 元素是否仍然存活
    fn is_live(&self, element: ElementId) -> bool;

    /// 读取属性当前渲染值
    ///
    /// # 返回
    /// - `Some(value)`: 读取成功
    /// - `None`: 无法解析为数值
    fn read(&self, element: ElementId, property: &str) -> Option<TweenValue>;

    /// 写入属性值
    fn write(
        &mut self,
        element: ElementId,
        property: &str,
        value: PropertyValue<'_>,
    ) -> WriteOutcome;

    /// 刷新本帧缓存的复合属性写入
    fn flush(&mut self) {}
}

/// 内存中存储的属性值
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Number(f64),
    Text(String),
}

impl StoredValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// 简单的内存实现
///
/// 属性以 `(ElementId, 属性名)` 为键保存，读取时只识别纯数值。
/// 名称出现在 `deferred` 集合中的属性写入返回 [`WriteOutcome::Deferred`]。
#[derive(Debug, Default)]
pub struct MemoryTarget {
    live: HashSet<ElementId>,
    values: HashMap<(ElementId, String), StoredValue>,
    deferred: HashSet<String>,
    write_count: usize,
    flush_count: usize,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个存活元素
    pub fn add_element(&mut self, element: ElementId) {
        self.live.insert(element);
    }

    /// 移除元素（之后的 tick 会把它视为失效目标）
    pub fn remove_element(&mut self, element: ElementId) {
        self.live.remove(&element);
        self.values.retain(|(e, _), _| *e != element);
    }

    /// 直接设置属性值（不经过动画）
    pub fn set(&mut self, element: ElementId, property: &str, value: f64) {
        self.values
            .insert((element, property.to_string()), StoredValue::Number(value));
    }

    /// 获取属性值
    pub fn get(&self, element: ElementId, property: &str) -> Option<&StoredValue> {
        self.values.get(&(element, property.to_string()))
    }

    /// 获取纯数值属性
    pub fn number(&self, element: ElementId, property: &str) -> Option<f64> {
        self.get(element, property).and_then(StoredValue::as_number)
    }

    /// 标记某属性为延迟写入（模拟 transform 一类的复合属性）
    pub fn defer_property(&mut self, property: impl Into<String>) {
        self.deferred.insert(property.into());
    }

    /// 累计写入次数
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// 累计刷新次数
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }
}

impl PropertyTarget for MemoryTarget {
    fn is_live(&self, element: ElementId) -> bool {
        self.live.contains(&element)
    }

    fn read(&self, element: ElementId, property: &str) -> Option<TweenValue> {
        self.number(element, property).map(TweenValue::Number)
    }

    fn write(
        &mut self,
        element: ElementId,
        property: &str,
        value: PropertyValue<'_>,
    ) -> WriteOutcome {
        self.write_count += 1;
        let stored = match value {
            PropertyValue::Number(n) => StoredValue::Number(n),
            PropertyValue::Text(s) => StoredValue::Text(s.to_string()),
        };
        self.values.insert((element, property.to_string()), stored);

        if self.deferred.contains(property) {
            WriteOutcome::Deferred
        } else {
            WriteOutcome::Applied
        }
    }

    fn flush(&mut self) {
        self.flush_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_id() {
        let id1 = ElementId::new(1);
        let id2 = ElementId::new(2);

        assert_ne!(id1, id2);
        assert_eq!(id1.value(), 1);
        assert_eq!(id1.to_string(), "ElementId(1)");
    }

    #[test]
    fn test_memory_target_read_write() {
        let mut target = MemoryTarget::new();
        let el = ElementId::new(1);
        target.add_element(el);

        assert!(target.is_live(el));
        assert_eq!(target.read(el, "opacity"), None);

        target.set(el, "opacity", 0.5);
        assert_eq!(target.read(el, "opacity"), Some(TweenValue::Number(0.5)));

        let outcome = target.write(el, "width", PropertyValue::Text("10px"));
        assert_eq!(outcome, WriteOutcome::Applied);
        assert_eq!(target.get(el, "width").and_then(|v| v.as_text()), Some("10px"));
        // 文本值不能作为数值读回
        assert_eq!(target.read(el, "width"), None);
        assert_eq!(target.write_count(), 1);
    }

    #[test]
    fn test_memory_target_deferred() {
        let mut target = MemoryTarget::new();
        let el = ElementId::new(1);
        target.defer_property("translateX");

        let outcome = target.write(el, "translateX", PropertyValue::Number(3.0));
        assert_eq!(outcome, WriteOutcome::Deferred);

        target.flush();
        assert_eq!(target.flush_count(), 1);
    }

    #[test]
    fn test_memory_target_remove_element() {
        let mut target = MemoryTarget::new();
        let el = ElementId::new(7);
        target.add_element(el);
        target.set(el, "left", 1.0);

        target.remove_element(el);
        assert!(!target.is_live(el));
        assert_eq!(target.get(el, "left"), None);
    }
}
