//! # Config 模块
//!
//! 宿主配置管理，集中管理调度器、帧驱动和日志的配置项。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use tween_runtime::{MockMode, SchedulerConfig};

/// 宿主配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// 调度器配置
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// 帧驱动配置
    #[serde(default)]
    pub driver: DriverConfig,

    /// 日志级别（trace / debug / info / warn / error）
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// 帧驱动配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// 宿主不可见时，后备定时器的间隔（毫秒）
    #[serde(default = "default_fallback_interval_ms")]
    pub fallback_interval_ms: f64,

    /// 显示器刷新间隔（毫秒），headless 模式下模拟垂直同步
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: f64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fallback_interval_ms() -> f64 {
    16.0
}

fn default_refresh_interval_ms() -> f64 {
    1000.0 / 60.0
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            fallback_interval_ms: default_fallback_interval_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并打印警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scheduler = &self.scheduler;

        if !scheduler.fps_limit.is_finite() || scheduler.fps_limit < 0.0 {
            return Err(ConfigError::ValidationFailed(format!(
                "帧率上限必须是非负数: {}",
                scheduler.fps_limit
            )));
        }

        if !(scheduler.frame_time_ms > 0.0) {
            return Err(ConfigError::ValidationFailed(format!(
                "名义帧间隔必须大于 0: {}",
                scheduler.frame_time_ms
            )));
        }

        if !(scheduler.default_duration_ms >= 0.0) {
            return Err(ConfigError::ValidationFailed(format!(
                "默认时长不能为负: {}",
                scheduler.default_duration_ms
            )));
        }

        if let MockMode::Scale(factor) = scheduler.mock {
            if !(factor >= 0.0) {
                return Err(ConfigError::ValidationFailed(format!(
                    "模拟缩放系数不能为负: {}",
                    factor
                )));
            }
        }

        if !(self.driver.fallback_interval_ms > 0.0) || !(self.driver.refresh_interval_ms > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "帧驱动间隔必须大于 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "未知的日志级别: {}",
                self.log_level
            )));
        }

        Ok(())
    }
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    IoError(String),
    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.driver.fallback_interval_ms, 16.0);
        assert_eq!(config.scheduler.fps_limit, 60.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "scheduler": { "mock": { "mode": "instant" } } }"#).unwrap();
        assert_eq!(config.scheduler.mock, MockMode::Instant);
        assert_eq!(config.scheduler.default_duration_ms, 400.0);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.driver.fallback_interval_ms = 20.0;
        config.log_level = "debug".to_string();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();

        // 文件不存在
        let missing = AppConfig::load(dir.path().join("missing.json"));
        assert_eq!(missing, AppConfig::default());

        // 解析失败
        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert_eq!(AppConfig::load(&broken), AppConfig::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        // 无效日志级别
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
        config.log_level = "WARN".to_string();
        assert!(config.validate().is_ok());

        // 负缩放系数
        config.scheduler.mock = MockMode::Scale(-1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
        config.scheduler.mock = MockMode::Off;

        // 后备间隔为 0
        config.driver.fallback_interval_ms = 0.0;
        assert!(config.validate().is_err());
    }
}
