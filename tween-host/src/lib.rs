//! # Tween Host
//!
//! tween-runtime 的宿主层。
//!
//! 调度器本身只处理"给定时间的一帧"，宿主负责：
//!
//! - 帧来源：显示器同步，不可见时切换到后备定时器
//! - 帧驱动：根据调度器的决策请求下一帧，并防止 tick 重入
//! - 配置加载与日志初始化
//! - headless 场景播放（CLI 与集成测试使用）
//!
//! ## 模块结构
//!
//! - [`config`]：宿主配置
//! - [`clock`]：帧来源
//! - [`driver`]：帧驱动
//! - [`scenario`]：场景文件与播放器

pub mod clock;
pub mod config;
pub mod driver;
pub mod scenario;

pub use clock::{DisplaySync, FallbackTimer, FrameSource, SourceKind};
pub use config::{AppConfig, ConfigError, DriverConfig};
pub use driver::{DriverStep, FrameDriver, SharedScheduler};
pub use scenario::{FrameRecord, Player, Scenario, ScenarioError};
