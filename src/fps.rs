// 该文件是 Kanjian （看见） 项目的一部分。
// src/fps.rs - 帧率统计
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

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::info;

/// 帧率计数器：记录处理帧数与起止时间
#[derive(Debug, Default)]
pub struct FpsMeter {
  start: Option<Instant>,
  end: Option<Instant>,
  started_at: Option<DateTime<Local>>,
  frames: u64,
}

impl FpsMeter {
  pub fn start(&mut self) -> &mut Self {
    self.start = Some(Instant::now());
    self.started_at = Some(Local::now());
    self.end = None;
    self.frames = 0;
    self
  }

  pub fn update(&mut self) {
    self.frames += 1;
  }

  pub fn stop(&mut self) {
    if self.end.is_none() {
      self.end = Some(Instant::now());
    }
  }

  pub fn frames(&self) -> u64 {
    self.frames
  }

  /// 未停止时按当前时刻计算
  pub fn elapsed(&self) -> Duration {
    match self.start {
      Some(start) => self.end.unwrap_or_else(Instant::now).duration_since(start),
      None => Duration::ZERO,
    }
  }

  pub fn fps(&self) -> f64 {
    self.report().fps()
  }

  pub fn report(&self) -> FpsReport {
    FpsReport {
      frames: self.frames,
      elapsed: self.elapsed(),
      started_at: self.started_at,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsReport {
  pub frames: u64,
  pub elapsed: Duration,
  pub started_at: Option<DateTime<Local>>,
}

impl FpsReport {
  pub fn fps(&self) -> f64 {
    let secs = self.elapsed.as_secs_f64();
    if secs > 0.0 {
      self.frames as f64 / secs
    } else {
      0.0
    }
  }

  pub fn elapsed_line(&self) -> String {
    format!("elapsed time: {:.2}", self.elapsed.as_secs_f64())
  }

  pub fn fps_line(&self) -> String {
    format!("approx. FPS: {:.2}", self.fps())
  }

  pub fn log(&self) {
    if let Some(started_at) = self.started_at {
      info!("开始时间: {}", started_at.to_rfc3339());
    }
    info!("处理帧数: {}", self.frames);
    info!("{}", self.elapsed_line());
    info!("{}", self.fps_line());
  }
}
