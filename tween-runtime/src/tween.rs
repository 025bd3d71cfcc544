//! # Tween 模块
//!
//! 单个属性的插值描述。
//!
//! 一个 tween 在提交时只需要目标值；起始值可以留空，等调用第一次被激活
//! 时（展开阶段）再从当前渲染状态读取，这样拿到的是最新的值而不是提交时的旧值。
//!
//! 复合值（例如 `rgba(...)`）按分量插值，再通过 [`Pattern`] 拼回文本。

use std::fmt::Write as _;

use tracing::warn;

use crate::easing::{Easing, EasingRegistry, ResolvedEasing};
use crate::error::TweenError;
use crate::target::{ElementId, PropertyTarget, PropertyValue};

/// 伪属性：只参与求值、不写入目标，其值通过 progress 钩子暴露
pub const TWEEN_PROPERTY: &str = "tween";

/// 属性值（数值或多分量数值）
#[derive(Debug, Clone, PartialEq)]
pub enum TweenValue {
    Number(f64),
    Components(Vec<f64>),
}

impl TweenValue {
    /// 分量数量
    pub fn len(&self) -> usize {
        match self {
            Self::Number(_) => 1,
            Self::Components(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 转换为分量列表
    pub fn into_components(self) -> Vec<f64> {
        match self {
            Self::Number(n) => vec![n],
            Self::Components(c) => c,
        }
    }
}

impl From<f64> for TweenValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Vec<f64>> for TweenValue {
    fn from(c: Vec<f64>) -> Self {
        Self::Components(c)
    }
}

/// 模板片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternPart {
    /// 原样输出的文本
    Literal(String),
    /// 分量占位符 `{n}`，`{n!}` 表示取整
    Component { index: usize, round: bool },
}

/// 复合值模板
///
/// 语法：`{n}` 引用第 n 个分量，`{n!}` 引用并取整；其余字符原样输出。
///
/// ```text
/// "rgba({0!}, {1!}, {2!}, {3})"
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    parts: Vec<PatternPart>,
}

impl Pattern {
    /// 解析模板
    pub fn parse(source: &str) -> Result<Self, TweenError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            match parse_placeholder(after) {
                Some((index, round, consumed)) => {
                    if !literal.is_empty() {
                        parts.push(PatternPart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(PatternPart::Component { index, round });
                    rest = &after[consumed..];
                }
                None => {
                    // 不是占位符，按普通字符处理
                    literal.push('{');
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(PatternPart::Literal(literal));
        }

        if !parts
            .iter()
            .any(|p| matches!(p, PatternPart::Component { .. }))
        {
            return Err(TweenError::InvalidPattern {
                pattern: source.to_string(),
                message: "模板中没有任何分量占位符".to_string(),
            });
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    /// 原始模板文本
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parts(&self) -> &[PatternPart] {
        &self.parts
    }

    /// 引用到的最大分量下标
    pub fn max_index(&self) -> Option<usize> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                PatternPart::Component { index, .. } => Some(*index),
                PatternPart::Literal(_) => None,
            })
            .max()
    }

    /// 分量是否被任一占位符标记为取整
    pub fn rounds(&self, index: usize) -> bool {
        self.parts.iter().any(|p| {
            matches!(p, PatternPart::Component { index: i, round: true } if *i == index)
        })
    }

    /// 把分量拼接进 `out`（先清空）
    pub fn render(&self, values: &[f64], out: &mut String) {
        out.clear();
        for part in &self.parts {
            match part {
                PatternPart::Literal(s) => out.push_str(s),
                PatternPart::Component { index, .. } => {
                    let _ = write!(out, "{}", values[*index]);
                }
            }
        }
    }
}

/// 解析 `{` 之后的 `digits(!)?}`，返回 (下标, 是否取整, 消耗的字节数)
fn parse_placeholder(s: &str) -> Option<(usize, bool, usize)> {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let index = s[..digits].parse().ok()?;
    let mut consumed = digits;
    let round = s[consumed..].starts_with('!');
    if round {
        consumed += 1;
    }
    if !s[consumed..].starts_with('}') {
        return None;
    }
    Some((index, round, consumed + 1))
}

/// 值的输出格式
#[derive(Debug, Clone, PartialEq)]
pub enum ValueFormat {
    /// 单个数值，可带单位后缀
    Number { unit: Option<String>, round: bool },
    /// 按模板拼接多个分量
    Pattern(Pattern),
}

impl Default for ValueFormat {
    fn default() -> Self {
        Self::Number {
            unit: None,
            round: false,
        }
    }
}

/// 展开后的插值数据
#[derive(Debug, Clone)]
struct Resolved {
    start: Vec<f64>,
    end: Vec<f64>,
    round: Vec<bool>,
    easing: ResolvedEasing,
}

/// 单个属性的插值状态
#[derive(Debug, Clone)]
pub struct Tween {
    property: String,
    start: Option<TweenValue>,
    end: TweenValue,
    easing: Option<Easing>,
    format: ValueFormat,
    resolved: Option<Resolved>,
    /// 上次写入的分量
    current: Vec<f64>,
    /// 文本输出缓冲区（带单位或模板时使用）
    text: String,
}

impl Tween {
    /// 创建 tween，起始值在展开时从目标读取
    pub fn new(property: impl Into<String>, end: impl Into<TweenValue>) -> Self {
        Self {
            property: property.into(),
            start: None,
            end: end.into(),
            easing: None,
            format: ValueFormat::default(),
            resolved: None,
            current: Vec::new(),
            text: String::new(),
        }
    }

    /// 显式指定起始值
    pub fn from(mut self, start: impl Into<TweenValue>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// 覆盖调用级别的默认缓动
    pub fn with_easing(mut self, easing: impl Into<Easing>) -> Self {
        self.easing = Some(easing.into());
        self
    }

    /// 设置单位后缀（如 `"px"`）
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        let round = matches!(self.format, ValueFormat::Number { round: true, .. });
        self.format = ValueFormat::Number {
            unit: Some(unit.into()),
            round,
        };
        self
    }

    /// 单值取整
    pub fn rounded(mut self) -> Self {
        if let ValueFormat::Number { round, .. } = &mut self.format {
            *round = true;
        }
        self
    }

    /// 使用模板输出多分量值
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.format = ValueFormat::Pattern(pattern);
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn format(&self) -> &ValueFormat {
        &self.format
    }

    /// 是否为进度伪属性
    pub fn is_progress_pseudo(&self) -> bool {
        self.property == TWEEN_PROPERTY
    }

    /// 是否已展开
    pub fn is_expanded(&self) -> bool {
        self.resolved.is_some()
    }

    /// 解析后的起始分量
    pub fn start_components(&self) -> Option<&[f64]> {
        self.resolved.as_ref().map(|r| r.start.as_slice())
    }

    /// 解析后的目标分量
    pub fn end_components(&self) -> Option<&[f64]> {
        self.resolved.as_ref().map(|r| r.end.as_slice())
    }

    /// 当前分量
    pub fn current(&self) -> &[f64] {
        &self.current
    }

    /// 第一个分量的当前值
    pub fn current_number(&self) -> Option<f64> {
        self.current.first().copied()
    }

    /// 展开：解析起始值和缓动，校验分量
    pub(crate) fn expand<T: PropertyTarget + ?Sized>(
        &mut self,
        element: ElementId,
        target: &T,
        easings: &EasingRegistry,
        default_easing: &ResolvedEasing,
    ) -> Result<(), TweenError> {
        let start = match &self.start {
            Some(v) => v.clone(),
            None => target
                .read(element, &self.property)
                .ok_or_else(|| TweenError::UnresolvedStart {
                    property: self.property.clone(),
                })?,
        };
        let start = start.into_components();
        let end = self.end.clone().into_components();

        if start.len() != end.len() || start.is_empty() {
            return Err(TweenError::ComponentMismatch {
                property: self.property.clone(),
                start: start.len(),
                end: end.len(),
            });
        }
        if start.iter().chain(end.iter()).any(|v| !v.is_finite()) {
            return Err(TweenError::NonFinite {
                property: self.property.clone(),
            });
        }

        let round = match &self.format {
            ValueFormat::Number { round, .. } => {
                if end.len() != 1 {
                    return Err(TweenError::MissingPattern {
                        property: self.property.clone(),
                        count: end.len(),
                    });
                }
                vec![*round]
            }
            ValueFormat::Pattern(pattern) => {
                if let Some(index) = pattern.max_index().filter(|i| *i >= end.len()) {
                    return Err(TweenError::PatternComponentOutOfRange {
                        property: self.property.clone(),
                        index,
                        count: end.len(),
                    });
                }
                (0..end.len()).map(|i| pattern.rounds(i)).collect()
            }
        };

        let easing = match &self.easing {
            None => default_easing.clone(),
            Some(e) => easings.resolve(e).unwrap_or_else(|| {
                warn!(property = %self.property, easing = ?e, "未注册的缓动，使用默认缓动");
                default_easing.clone()
            }),
        };

        self.current = start.clone();
        self.text.clear();
        self.resolved = Some(Resolved {
            start,
            end,
            round,
            easing,
        });
        Ok(())
    }

    /// 计算 `percent` 时刻的值
    ///
    /// `reverse` 为真时按反向进度求值（从目标值回到起始值）。
    /// 到达 100% 时直接使用端点值，不受缓动误差影响。
    ///
    /// # 返回
    /// 值是否发生变化（未展开时返回 `false`）
    pub(crate) fn evaluate(&mut self, percent: f64, reverse: bool) -> bool {
        let Some(resolved) = &self.resolved else {
            return false;
        };

        let t = if reverse { 1.0 - percent } else { percent };
        let mut changed = false;

        for (i, current) in self.current.iter_mut().enumerate() {
            let mut value = if percent >= 1.0 {
                if reverse {
                    resolved.start[i]
                } else {
                    resolved.end[i]
                }
            } else {
                resolved
                    .easing
                    .value(t, resolved.start[i], resolved.end[i], &self.property)
            };
            if resolved.round[i] {
                value = value.round();
            }
            if *current != value {
                changed = true;
                *current = value;
            }
        }

        if changed || self.text.is_empty() {
            self.render();
        }
        changed
    }

    /// 更新文本缓冲区
    fn render(&mut self) {
        match &self.format {
            ValueFormat::Number { unit: None, .. } => {}
            ValueFormat::Number {
                unit: Some(unit), ..
            } => {
                self.text.clear();
                let _ = write!(self.text, "{}{}", self.current[0], unit);
            }
            ValueFormat::Pattern(pattern) => pattern.render(&self.current, &mut self.text),
        }
    }

    /// 当前应写入目标的值
    pub fn value(&self) -> PropertyValue<'_> {
        match &self.format {
            ValueFormat::Number { unit: None, .. } => {
                PropertyValue::Number(self.current.first().copied().unwrap_or_default())
            }
            _ => PropertyValue::Text(&self.text),
        }
    }
}
