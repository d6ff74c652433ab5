// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/highgui_window.rs - OpenCV 显示窗口
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

use opencv::{core::Mat, highgui};
use thiserror::Error;
use tracing::{info, warn};

use crate::output::Render;

#[derive(Error, Debug)]
pub enum HighGuiError {
  #[error("OpenCV 错误: {0}")]
  OpenCvError(#[from] opencv::Error),
  #[error("窗口已关闭")]
  Closed,
}

pub struct HighGuiWindow {
  title: String,
  closed: bool,
}

impl HighGuiWindow {
  pub fn open(title: &str, fullscreen: bool) -> Result<Self, HighGuiError> {
    info!("创建显示窗口: {}", title);
    if fullscreen {
      highgui::named_window(title, highgui::WINDOW_NORMAL)?;
      highgui::set_window_property(
        title,
        highgui::WND_PROP_FULLSCREEN,
        highgui::WINDOW_FULLSCREEN as f64,
      )?;
    } else {
      highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
    }

    Ok(Self {
      title: title.to_string(),
      closed: false,
    })
  }

  pub fn title(&self) -> &str {
    &self.title
  }
}

impl Render<Mat> for HighGuiWindow {
  type Error = HighGuiError;

  fn show(&mut self, frame: &Mat) -> Result<(), Self::Error> {
    if self.closed {
      return Err(HighGuiError::Closed);
    }
    highgui::imshow(&self.title, frame)?;
    Ok(())
  }

  fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>, Self::Error> {
    // wait_key(0) 会无限等待
    let delay = timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
    let key = highgui::wait_key(delay)?;
    if key < 0 {
      return Ok(None);
    }
    Ok(Some(char::from((key & 0xFF) as u8)))
  }

  fn close(&mut self) -> Result<(), Self::Error> {
    if self.closed {
      return Ok(());
    }
    self.closed = true;
    info!("关闭显示窗口");
    highgui::destroy_all_windows()?;
    Ok(())
  }
}

impl Drop for HighGuiWindow {
  fn drop(&mut self) {
    if let Err(e) = self.close() {
      warn!("关闭显示窗口失败: {}", e);
    }
  }
}
