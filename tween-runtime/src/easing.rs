//! # Easing 模块
//!
//! 缓动函数库，用于 tween 的时间插值。
//!
//! - [`EasingFunction`]：内置缓动曲线，输入输出都是 0.0 - 1.0 的进度
//! - [`Easing`]：tween 上携带的缓动引用（内置 / 按名称 / 自定义函数）
//! - [`EasingRegistry`]：名称到缓动的注册表，展开阶段用它解析名称引用

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;
use std::rc::Rc;

/// 自定义缓动函数
///
/// 参数依次为 `(t, start, end, property)`，返回该时刻的属性值。
pub type EasingFn = Rc<dyn Fn(f64, f64, f64, &str) -> f64>;

/// 缓动函数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EasingFunction {
    /// 线性（匀速）
    Linear,
    /// 摆动（0.5 - cos(πt)/2）
    #[default]
    Swing,
    /// 缓入（先慢后快）
    EaseIn,
    /// 缓出（先快后慢）
    EaseOut,
    /// 缓入缓出（两头慢中间快）
    EaseInOut,
    /// 二次缓入
    EaseInQuad,
    /// 二次缓出
    EaseOutQuad,
    /// 二次缓入缓出
    EaseInOutQuad,
    /// 三次缓入
    EaseInCubic,
    /// 三次缓出
    EaseOutCubic,
    /// 三次缓入缓出
    EaseInOutCubic,
    /// 正弦缓入
    EaseInSine,
    /// 正弦缓出
    EaseOutSine,
    /// 正弦缓入缓出
    EaseInOutSine,
    /// 弹性缓出
    EaseOutElastic,
    /// 弹跳缓出
    EaseOutBounce,
}

impl EasingFunction {
    /// 所有内置缓动及其注册名称
    pub const BUILTIN: [(&'static str, EasingFunction); 16] = [
        ("linear", EasingFunction::Linear),
        ("swing", EasingFunction::Swing),
        ("ease-in", EasingFunction::EaseIn),
        ("ease-out", EasingFunction::EaseOut),
        ("ease-in-out", EasingFunction::EaseInOut),
        ("ease-in-quad", EasingFunction::EaseInQuad),
        ("ease-out-quad", EasingFunction::EaseOutQuad),
        ("ease-in-out-quad", EasingFunction::EaseInOutQuad),
        ("ease-in-cubic", EasingFunction::EaseInCubic),
        ("ease-out-cubic", EasingFunction::EaseOutCubic),
        ("ease-in-out-cubic", EasingFunction::EaseInOutCubic),
        ("ease-in-sine", EasingFunction::EaseInSine),
        ("ease-out-sine", EasingFunction::EaseOutSine),
        ("ease-in-out-sine", EasingFunction::EaseInOutSine),
        ("ease-out-elastic", EasingFunction::EaseOutElastic),
        ("ease-out-bounce", EasingFunction::EaseOutBounce),
    ];

    /// 按名称查找内置缓动
    pub fn from_name(name: &str) -> Option<Self> {
        Self::BUILTIN
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, f)| *f)
    }

    /// 计算缓动值
    ///
    /// # 参数
    /// - `t`: 时间进度 (0.0 - 1.0)
    ///
    /// # 返回
    /// - 缓动后的进度值（弹性曲线可能略微越界）
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            EasingFunction::Linear => t,
            EasingFunction::Swing => 0.5 - (t * PI).cos() / 2.0,
            EasingFunction::EaseIn => ease_in(t),
            EasingFunction::EaseOut => ease_out(t),
            EasingFunction::EaseInOut => ease_in_out(t),
            EasingFunction::EaseInQuad => t * t,
            EasingFunction::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            EasingFunction::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            EasingFunction::EaseInCubic => t * t * t,
            EasingFunction::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            EasingFunction::EaseInOutCubic => ease_in_out(t),
            EasingFunction::EaseInSine => 1.0 - (t * PI / 2.0).cos(),
            EasingFunction::EaseOutSine => (t * PI / 2.0).sin(),
            EasingFunction::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            EasingFunction::EaseOutElastic => ease_out_elastic(t),
            EasingFunction::EaseOutBounce => ease_out_bounce(t),
        }
    }
}

/// 缓入（Cubic）
fn ease_in(t: f64) -> f64 {
    t * t * t
}

/// 缓出（Cubic）
fn ease_out(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// 缓入缓出（Cubic）
fn ease_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// 弹性缓出
fn ease_out_elastic(t: f64) -> f64 {
    if t == 0.0 {
        0.0
    } else if t == 1.0 {
        1.0
    } else {
        let c4 = (2.0 * PI) / 3.0;
        2.0_f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
    }
}

/// 弹跳缓出
fn ease_out_bounce(t: f64) -> f64 {
    let n1 = 7.5625;
    let d1 = 2.75;

    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984375
    }
}

/// Tween 上携带的缓动引用
#[derive(Clone)]
pub enum Easing {
    /// 内置曲线
    Builtin(EasingFunction),
    /// 按名称引用，展开时通过 [`EasingRegistry`] 解析
    Named(String),
    /// 自定义函数
    Custom(EasingFn),
}

impl Easing {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn custom(f: impl Fn(f64, f64, f64, &str) -> f64 + 'static) -> Self {
        Self::Custom(Rc::new(f))
    }
}

impl From<EasingFunction> for Easing {
    fn from(f: EasingFunction) -> Self {
        Self::Builtin(f)
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(e) => f.debug_tuple("Builtin").field(e).finish(),
            Self::Named(n) => f.debug_tuple("Named").field(n).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// 已解析的缓动
///
/// 展开阶段把 [`Easing`] 解析成它，之后每帧求值不再查表。
#[derive(Clone)]
pub enum ResolvedEasing {
    Builtin(EasingFunction),
    Custom(EasingFn),
}

impl ResolvedEasing {
    /// 计算 `t` 时刻从 `start` 到 `end` 的值
    pub fn value(&self, t: f64, start: f64, end: f64, property: &str) -> f64 {
        match self {
            Self::Builtin(f) => start + (end - start) * f.apply(t),
            Self::Custom(f) => f(t, start, end, property),
        }
    }
}

impl fmt::Debug for ResolvedEasing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(e) => f.debug_tuple("Builtin").field(e).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// 缓动注册表
///
/// 自定义注册的名称优先于内置名称。
#[derive(Default)]
pub struct EasingRegistry {
    custom: HashMap<String, EasingFn>,
}

impl fmt::Debug for EasingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EasingRegistry")
            .field("custom", &self.custom.len())
            .finish()
    }
}

impl EasingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册自定义缓动
    pub fn register(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(f64, f64, f64, &str) -> f64 + 'static,
    ) {
        self.custom.insert(name.into(), Rc::new(f));
    }

    /// 按名称解析
    pub fn lookup(&self, name: &str) -> Option<ResolvedEasing> {
        if let Some(f) = self.custom.get(name) {
            return Some(ResolvedEasing::Custom(f.clone()));
        }
        EasingFunction::from_name(name).map(ResolvedEasing::Builtin)
    }

    /// 解析缓动引用
    ///
    /// 名称未注册时返回 `None`。
    pub fn resolve(&self, easing: &Easing) -> Option<ResolvedEasing> {
        match easing {
            Easing::Builtin(f) => Some(ResolvedEasing::Builtin(*f)),
            Easing::Named(name) => self.lookup(name),
            Easing::Custom(f) => Some(ResolvedEasing::Custom(f.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear() {
        let easing = EasingFunction::Linear;
        assert_eq!(easing.apply(0.0), 0.0);
        assert_eq!(easing.apply(0.5), 0.5);
        assert_eq!(easing.apply(1.0), 1.0);
    }

    #[test]
    fn test_swing() {
        let easing = EasingFunction::Swing;
        assert!(easing.apply(0.0).abs() < 1e-12);
        assert!((easing.apply(0.5) - 0.5).abs() < 1e-12);
        assert!((easing.apply(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ease_in_out() {
        let easing = EasingFunction::EaseInOut;
        assert_eq!(easing.apply(0.0), 0.0);
        assert_eq!(easing.apply(1.0), 1.0);
        // 中点应该是 0.5
        let mid = easing.apply(0.5);
        assert!((mid - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_clamp() {
        let easing = EasingFunction::Linear;
        // 超出范围应该被限制
        assert_eq!(easing.apply(-0.5), 0.0);
        assert_eq!(easing.apply(1.5), 1.0);
    }

    #[test]
    fn test_ease_out_bounce() {
        let easing = EasingFunction::EaseOutBounce;
        assert_eq!(easing.apply(0.0), 0.0);
        assert!((easing.apply(1.0) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            EasingFunction::from_name("ease-out-quad"),
            Some(EasingFunction::EaseOutQuad)
        );
        assert_eq!(EasingFunction::from_name("nope"), None);
    }

    #[test]
    fn test_registry_custom_overrides_builtin() {
        let mut registry = EasingRegistry::new();
        registry.register("linear", |_, _, end, _| end);

        let resolved = registry.lookup("linear").unwrap();
        // 自定义版本直接跳到终点
        assert_eq!(resolved.value(0.1, 0.0, 10.0, "x"), 10.0);
    }

    #[test]
    fn test_registry_resolve() {
        let registry = EasingRegistry::new();

        let builtin = registry.resolve(&EasingFunction::Linear.into()).unwrap();
        assert_eq!(builtin.value(0.25, 0.0, 100.0, "left"), 25.0);

        let named = registry.resolve(&Easing::named("linear")).unwrap();
        assert_eq!(named.value(0.5, 10.0, 20.0, "left"), 15.0);

        assert!(registry.resolve(&Easing::named("missing")).is_none());

        let custom = registry
            .resolve(&Easing::custom(|t, s, e, p| {
                assert_eq!(p, "top");
                s + (e - s) * t * t
            }))
            .unwrap();
        assert_eq!(custom.value(0.5, 0.0, 8.0, "top"), 2.0);
    }
}
