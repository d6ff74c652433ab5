// 该文件是 Kanjian （看见） 项目的一部分。
// src/input/camera.rs - OpenCV 摄像头输入
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

use opencv::{
  core::Mat,
  prelude::*,
  videoio::{self, VideoCapture},
};
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{Capture, StreamError, VideoStream},
};

#[derive(Error, Debug)]
pub enum CameraError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("无效的摄像头设备: {0}")]
  InvalidDevice(String),
  #[error("无法打开摄像头 #{0}")]
  NotOpened(i32),
  #[error("摄像头已断开")]
  Disconnected,
  #[error("OpenCV 错误: {0}")]
  OpenCvError(#[from] opencv::Error),
}

/// 解析 `0` 或 `/dev/video0` 形式的设备编号
pub(crate) fn parse_device_index(device: &str) -> Option<i32> {
  if let Ok(index) = device.parse::<i32>() {
    return Some(index);
  }
  device
    .strip_prefix("/dev/video")
    .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
    .and_then(|rest| rest.parse().ok())
}

/// 摄像头输入，`camera://0` 或 `camera:///dev/video0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraInput {
  index: i32,
}

impl FromUrlWithScheme for CameraInput {
  const SCHEME: &'static str = "camera";
}

impl FromUrl for CameraInput {
  type Error = CameraError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(CameraError::SchemeMismatch);
    }

    let device = match url.host_str() {
      Some(host) if !host.is_empty() => host,
      _ => url.path(),
    };
    let device = if device.is_empty() { "0" } else { device };
    let index =
      parse_device_index(device).ok_or_else(|| CameraError::InvalidDevice(device.to_string()))?;

    Ok(CameraInput { index })
  }
}

impl CameraInput {
  pub fn index(&self) -> i32 {
    self.index
  }

  /// 启动后台采集线程
  pub fn start(self) -> Result<VideoStream<Mat>, StreamError<CameraError>> {
    info!("打开摄像头 #{}", self.index);
    VideoStream::start(move || CameraCapture::open(self.index))
  }
}

pub struct CameraCapture {
  capture: VideoCapture,
}

impl CameraCapture {
  pub fn open(index: i32) -> Result<Self, CameraError> {
    let capture = VideoCapture::new(index, videoio::CAP_ANY)?;
    if !capture.is_opened()? {
      return Err(CameraError::NotOpened(index));
    }
    Ok(Self { capture })
  }
}

impl Capture for CameraCapture {
  type Frame = Mat;
  type Error = CameraError;

  fn grab(&mut self) -> Result<Option<Self::Frame>, Self::Error> {
    let mut frame = Mat::default();
    if !self.capture.read(&mut frame)? {
      return Err(CameraError::Disconnected);
    }
    if frame.empty() {
      return Ok(None);
    }
    Ok(Some(frame))
  }

  fn release(&mut self) {
    if let Err(e) = self.capture.release() {
      warn!("释放摄像头失败: {}", e);
    }
  }
}
