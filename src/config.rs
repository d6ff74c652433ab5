// 该文件是 Kanjian （看见） 项目的一部分。
// src/config.rs - 项目参数配置
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIDENCE: f32 = 0.4;
pub const DEFAULT_WARMUP_SECS: f64 = 2.0;
pub const DEFAULT_INPUT: &str = "camera://0";
pub const DEFAULT_WINDOW_TITLE: &str = "Object Detection";
pub const DEFAULT_MAX_FAILURES: u32 = 100;

/// Kanjian 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// Caffe 部署描述文件（prototxt）路径
  #[arg(short, long, value_name = "FILE")]
  pub prototxt: PathBuf,

  /// Caffe 预训练权重文件（caffemodel）路径
  #[arg(short, long, value_name = "FILE")]
  pub model: PathBuf,

  /// 置信度阈值 (0.0 - 1.0)，只有严格大于该值的检测结果才会显示
  #[arg(
    short,
    long,
    default_value_t = DEFAULT_CONFIDENCE,
    value_name = "THRESHOLD",
    allow_negative_numbers = true
  )]
  pub confidence: f32,

  /// 输入来源
  /// 支持格式:
  /// - 摄像头: camera://0
  /// - 图片: image:///path/to/frame.jpg
  #[arg(short, long, default_value = DEFAULT_INPUT, value_name = "SOURCE")]
  pub input: Url,

  /// 启动输入源后的预热时间（秒）
  #[arg(
    long,
    default_value_t = DEFAULT_WARMUP_SECS,
    value_name = "SECS",
    allow_negative_numbers = true
  )]
  pub warmup: f64,

  /// 以普通窗口而非全屏方式显示
  #[arg(long)]
  pub windowed: bool,

  /// 不打开显示窗口，使用 Ctrl-C 退出
  #[arg(long)]
  pub headless: bool,

  /// 显示窗口标题
  #[arg(long, default_value = DEFAULT_WINDOW_TITLE, value_name = "TITLE")]
  pub window_title: String,

  /// 类别标签文件，每行一个类别名称
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 颜色表随机种子
  #[arg(long, value_name = "SEED")]
  pub color_seed: Option<u64>,

  /// 最大处理帧数（0 表示无限制）
  #[arg(long, default_value_t = 0, value_name = "COUNT")]
  pub max_frames: u64,

  /// 连续异常帧数上限，超过后任务失败退出
  #[arg(long, default_value_t = DEFAULT_MAX_FAILURES, value_name = "COUNT")]
  pub max_failures: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
  Fullscreen,
  Windowed,
  Headless,
}

/// 启动时确定、运行期间只读的配置
#[derive(Debug, Clone)]
pub struct Config {
  pub prototxt: PathBuf,
  pub model: PathBuf,
  pub confidence: f32,
  pub input: Url,
  pub warmup: Duration,
  pub display: DisplayMode,
  pub window_title: String,
  pub labels: Option<PathBuf>,
  pub color_seed: Option<u64>,
  pub max_frames: Option<u64>,
  pub max_failures: u32,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("置信度阈值必须在 [0, 1] 范围内, 实际为 {0}")]
  ConfidenceOutOfRange(f32),
  #[error("预热时间无效: {0}")]
  InvalidWarmup(f64),
  #[error("连续异常帧数上限必须大于 0")]
  ZeroMaxFailures,
}

impl TryFrom<Args> for Config {
  type Error = ConfigError;

  fn try_from(args: Args) -> Result<Self, Self::Error> {
    if !(0.0..=1.0).contains(&args.confidence) {
      return Err(ConfigError::ConfidenceOutOfRange(args.confidence));
    }
    if !args.warmup.is_finite() || args.warmup < 0.0 {
      return Err(ConfigError::InvalidWarmup(args.warmup));
    }
    if args.max_failures == 0 {
      return Err(ConfigError::ZeroMaxFailures);
    }

    let display = if args.headless {
      DisplayMode::Headless
    } else if args.windowed {
      DisplayMode::Windowed
    } else {
      DisplayMode::Fullscreen
    };

    Ok(Config {
      prototxt: args.prototxt,
      model: args.model,
      confidence: args.confidence,
      input: args.input,
      warmup: Duration::from_secs_f64(args.warmup),
      display,
      window_title: args.window_title,
      labels: args.labels,
      color_seed: args.color_seed,
      max_frames: Some(args.max_frames).filter(|n| *n > 0),
      max_failures: args.max_failures,
    })
  }
}
