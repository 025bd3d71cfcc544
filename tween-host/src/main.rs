//! Tween Host - headless 场景播放器
//!
//! 读取场景文件，逐帧驱动调度器并打印每帧的属性值与事件。
//!
//! 使用方法:
//!   tween-host --scenario scenes/fade.json
//!   tween-host --scenario scenes/fade.json --config config.json --frames 600 --log-level debug

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tween_host::{AppConfig, Player, Scenario};

#[derive(Parser)]
#[command(name = "tween-host")]
#[command(about = "headless 补间动画场景播放器", version, author)]
struct Args {
    /// 场景文件 (JSON)
    #[arg(short, long)]
    scenario: PathBuf,

    /// 配置文件
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,

    /// 最多播放的帧数
    #[arg(short, long, default_value = "1000")]
    frames: usize,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = real_main(args) {
        eprintln!("错误: {:#}", e);
        std::process::exit(1);
    }
}

fn real_main(args: Args) -> Result<()> {
    // 日志级别来自配置，加载配置期间的日志先用默认级别输出
    let mut config = tracing::subscriber::with_default(
        tracing_subscriber::fmt().with_writer(std::io::stderr).finish(),
        || AppConfig::load(&args.config),
    );
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    config.validate().context("配置无效")?;
    init_tracing(&config.log_level)?;

    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("无法加载场景 {:?}", args.scenario))?;
    let mut player = Player::new(scenario, &config).context("无法创建播放器")?;

    info!(scenario = %args.scenario.display(), max_frames = args.frames, "开始播放");
    let frames = player.run(args.frames);
    for frame in &frames {
        println!("{}", frame);
    }

    let remaining = player.scheduler().borrow().len();
    if remaining > 0 {
        println!("-- 达到帧数上限，仍有 {} 个调用未完成", remaining);
    } else {
        println!("-- 共 {} 帧，t = {:.2} ms", frames.len(), player.driver().now());
    }
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    let filter: LevelFilter = level
        .parse()
        .with_context(|| format!("未知的日志级别: {}", level))?;
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
