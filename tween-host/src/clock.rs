//! # Clock 模块
//!
//! 帧时间来源。
//!
//! 宿主可见时帧由显示器的垂直同步驱动；不可见时显示器回调会被挂起，
//! 改用固定间隔的后备定时器，避免动画在恢复可见时一次性跳到终点。
//!
//! headless 模式下两种来源都是模拟的：给定当前时间，返回下一帧的时间戳。

/// 帧来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// 显示器同步
    Display,
    /// 后备定时器
    Fallback,
}

/// 帧时间来源
pub trait FrameSource {
    fn kind(&self) -> SourceKind;

    /// 从 `now` 开始等待下一帧，返回该帧的时间戳（毫秒）
    fn next_frame(&mut self, now: f64) -> f64;
}

/// 模拟的显示器同步来源
///
/// 帧时间对齐到刷新间隔的整数倍，与真实垂直同步一致：
/// 无论何时请求，下一帧总在下一个刷新边界上。
#[derive(Debug, Clone)]
pub struct DisplaySync {
    refresh_interval_ms: f64,
}

impl DisplaySync {
    pub fn new(refresh_interval_ms: f64) -> Self {
        Self {
            refresh_interval_ms: refresh_interval_ms.max(f64::EPSILON),
        }
    }
}

impl FrameSource for DisplaySync {
    fn kind(&self) -> SourceKind {
        SourceKind::Display
    }

    fn next_frame(&mut self, now: f64) -> f64 {
        let interval = self.refresh_interval_ms;
        let next = ((now / interval).floor() + 1.0) * interval;
        // 浮点舍入可能落回当前边界
        if next <= now { next + interval } else { next }
    }
}

/// 固定间隔的后备定时器
#[derive(Debug, Clone)]
pub struct FallbackTimer {
    interval_ms: f64,
}

impl FallbackTimer {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms: interval_ms.max(0.0),
        }
    }
}

impl FrameSource for FallbackTimer {
    fn kind(&self) -> SourceKind {
        SourceKind::Fallback
    }

    fn next_frame(&mut self, now: f64) -> f64 {
        now + self.interval_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_sync_aligns_to_refresh() {
        let mut source = DisplaySync::new(10.0);
        assert_eq!(source.next_frame(0.0), 10.0);
        assert_eq!(source.next_frame(10.0), 20.0);
        // 非边界时刻请求，等到下一个边界
        assert_eq!(source.next_frame(13.0), 20.0);
        assert_eq!(source.kind(), SourceKind::Display);
    }

    #[test]
    fn test_fallback_fixed_interval() {
        let mut source = FallbackTimer::new(16.0);
        assert_eq!(source.next_frame(0.0), 16.0);
        assert_eq!(source.next_frame(13.0), 29.0);
        assert_eq!(source.kind(), SourceKind::Fallback);
    }
}
