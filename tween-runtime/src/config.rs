//! # Config 模块
//!
//! 调度器配置。所有字段都有默认值，可以从宿主的配置文件中部分覆盖。

use serde::{Deserialize, Serialize};

/// 模拟模式（测试用）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", tag = "mode", content = "factor")]
pub enum MockMode {
    /// 正常计时
    #[default]
    Off,
    /// 所有调用在第一次求值时直接完成
    Instant,
    /// 提交时把延迟和时长乘以该系数
    Scale(f64),
}

/// 调度器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 帧率上限
    #[serde(default = "default_fps_limit")]
    pub fps_limit: f64,

    /// 名义帧间隔（毫秒），首帧没有上一帧时间时用作 delta
    #[serde(default = "default_frame_time_ms")]
    pub frame_time_ms: f64,

    /// 调用未指定时长时使用的默认时长（毫秒）
    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: f64,

    /// 默认缓动名称
    #[serde(default = "default_easing")]
    pub default_easing: String,

    /// 模拟模式
    #[serde(default)]
    pub mock: MockMode,
}

fn default_fps_limit() -> f64 {
    60.0
}

fn default_frame_time_ms() -> f64 {
    1000.0 / 60.0
}

fn default_duration_ms() -> f64 {
    400.0
}

fn default_easing() -> String {
    "swing".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fps_limit: default_fps_limit(),
            frame_time_ms: default_frame_time_ms(),
            default_duration_ms: default_duration_ms(),
            default_easing: default_easing(),
            mock: MockMode::default(),
        }
    }
}

impl SchedulerConfig {
    /// 最小帧间隔
    ///
    /// 比名义帧间隔略小（98%），以容忍显示器时钟抖动。
    pub fn min_frame_time_ms(&self) -> f64 {
        if self.fps_limit > 0.0 {
            980.0 / self.fps_limit
        } else {
            0.0
        }
    }

    /// 按模拟模式换算提交时的时间值
    pub fn scale_time(&self, ms: f64) -> f64 {
        match self.mock {
            MockMode::Scale(factor) if factor >= 0.0 => ms * factor,
            _ => ms,
        }
    }
}
