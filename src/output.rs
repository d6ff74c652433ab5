// 该文件是 Kanjian （看见） 项目的一部分。
// src/output.rs - 输出定义
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

use std::time::Duration;

use thiserror::Error;

/// 退出按键
pub const QUIT_KEY: char = 'q';

/// 显示输出：展示标注后的帧，并轮询退出按键
pub trait Render<Frame> {
  type Error;

  fn show(&mut self, frame: &Frame) -> Result<(), Self::Error>;
  /// 最多等待 `timeout`，返回期间按下的键
  fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>, Self::Error>;
  /// 释放显示资源，重复调用无副作用
  fn close(&mut self) -> Result<(), Self::Error>;
}

pub mod draw;

mod headless;
pub use self::headless::Headless;

#[cfg(feature = "highgui_output")]
mod highgui_window;
#[cfg(feature = "highgui_output")]
pub use self::highgui_window::{HighGuiError, HighGuiWindow};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "highgui_output")]
  #[error("显示窗口错误: {0}")]
  HighGuiError(#[from] HighGuiError),
  #[error("无法注册 Ctrl-C 处理函数: {0}")]
  SignalError(#[from] ctrlc::Error),
}

impl From<std::convert::Infallible> for OutputError {
  fn from(err: std::convert::Infallible) -> Self {
    match err {}
  }
}

pub enum OutputWrapper {
  #[cfg(feature = "highgui_output")]
  Window(HighGuiWindow),
  Headless(Headless),
}

impl OutputWrapper {
  #[cfg(feature = "highgui_output")]
  pub fn window(title: &str, fullscreen: bool) -> Result<Self, OutputError> {
    Ok(OutputWrapper::Window(HighGuiWindow::open(title, fullscreen)?))
  }

  pub fn headless() -> Result<Self, OutputError> {
    Ok(OutputWrapper::Headless(Headless::with_ctrlc()?))
  }
}

#[cfg(feature = "highgui_output")]
impl Render<opencv::core::Mat> for OutputWrapper {
  type Error = OutputError;

  fn show(&mut self, frame: &opencv::core::Mat) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Window(output) => output.show(frame).map_err(OutputError::from),
      OutputWrapper::Headless(output) => output.show(frame).map_err(OutputError::from),
    }
  }

  fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>, Self::Error> {
    match self {
      OutputWrapper::Window(output) => output.poll_key(timeout).map_err(OutputError::from),
      OutputWrapper::Headless(output) => {
        <Headless as Render<opencv::core::Mat>>::poll_key(output, timeout)
          .map_err(OutputError::from)
      }
    }
  }

  fn close(&mut self) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Window(output) => output.close().map_err(OutputError::from),
      OutputWrapper::Headless(output) => {
        <Headless as Render<opencv::core::Mat>>::close(output).map_err(OutputError::from)
      }
    }
  }
}
