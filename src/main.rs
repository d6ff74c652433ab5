// 该文件是 Kanjian （看见） 项目的一部分。
// src/main.rs - 实时目标检测演示程序
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

use std::thread;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use kanjian::{
  FromUrl,
  config::{Args, Config, DisplayMode},
  detect::Detector,
  input::InputWrapper,
  labels::{ColorTable, LabelTable},
  model::MobileNetSsdBuilder,
  output::OutputWrapper,
  task::{LiveTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let config = Config::try_from(Args::parse())?;
  info!("配置: {:?}", config);

  let labels = match &config.labels {
    Some(path) => LabelTable::from_file(path)?,
    None => LabelTable::default(),
  };
  let colors = ColorTable::for_labels(&labels, config.color_seed);

  info!("加载模型...");
  let model = MobileNetSsdBuilder::new(&config.prototxt, &config.model).build()?;
  let detector = Detector::new(model, labels, colors, config.confidence);

  info!("启动视频流...");
  let input = InputWrapper::from_url(&config.input)?.start()?;
  thread::sleep(config.warmup);

  let output = match config.display {
    DisplayMode::Fullscreen => OutputWrapper::window(&config.window_title, true)?,
    DisplayMode::Windowed => OutputWrapper::window(&config.window_title, false)?,
    DisplayMode::Headless => OutputWrapper::headless()?,
  };

  let task = LiveTask::default()
    .with_max_frames(config.max_frames)
    .with_max_failures(config.max_failures);
  task.run_task(input, detector, output)?;
  Ok(())
}
