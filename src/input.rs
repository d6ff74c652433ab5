// 该文件是 Kanjian （看见） 项目的一部分。
// src/input.rs - 视频/图像输入
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

/// 拉取式帧源
pub trait FrameSource {
  type Frame;
  type Error;

  /// 返回当前最新的一帧，暂时没有可用帧时返回 `None`
  fn read(&mut self) -> Result<Option<Self::Frame>, Self::Error>;
  /// 停止采集并释放设备，重复调用无副作用
  fn stop(&mut self);
}

mod stream;
pub use self::stream::{Capture, StreamError, VideoStream};

#[cfg(feature = "camera_input")]
mod camera;
#[cfg(feature = "camera_input")]
pub use self::camera::{CameraCapture, CameraError, CameraInput};

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(any(feature = "camera_input", feature = "read_image_file"))]
pub use self::wrapper::{InputError, InputWrapper, StartedInput};

#[cfg(any(feature = "camera_input", feature = "read_image_file"))]
mod wrapper {
  use opencv::core::Mat;
  use thiserror::Error;
  use url::Url;

  #[cfg(feature = "camera_input")]
  use super::{CameraError, CameraInput, StreamError, VideoStream};
  #[cfg(feature = "read_image_file")]
  use super::{ImageFileInput, ImageFileInputError};
  use super::FrameSource;
  use crate::{FromUrl, FromUrlWithScheme};

  #[derive(Error, Debug)]
  pub enum InputError {
    #[cfg(feature = "camera_input")]
    #[error("摄像头输入错误: {0}")]
    CameraError(#[from] CameraError),
    #[cfg(feature = "camera_input")]
    #[error("采集线程错误: {0}")]
    StreamError(#[from] StreamError<CameraError>),
    #[cfg(feature = "read_image_file")]
    #[error("图像文件输入错误: {0}")]
    ImageFileInputError(#[from] ImageFileInputError),
    #[error("URI 方案不匹配: {0}")]
    SchemeMismatch(String),
  }

  /// 尚未启动的输入源
  pub enum InputWrapper {
    #[cfg(feature = "camera_input")]
    Camera(CameraInput),
    #[cfg(feature = "read_image_file")]
    ReadImageFile(ImageFileInput),
  }

  impl FromUrl for InputWrapper {
    type Error = InputError;

    fn from_url(url: &Url) -> Result<Self, Self::Error> {
      match url.scheme() {
        #[cfg(feature = "camera_input")]
        CameraInput::SCHEME => Ok(InputWrapper::Camera(CameraInput::from_url(url)?)),
        #[cfg(feature = "read_image_file")]
        ImageFileInput::SCHEME => Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?)),
        other => Err(InputError::SchemeMismatch(other.to_string())),
      }
    }
  }

  impl InputWrapper {
    pub fn start(self) -> Result<StartedInput, InputError> {
      match self {
        #[cfg(feature = "camera_input")]
        InputWrapper::Camera(input) => Ok(StartedInput::Camera(input.start()?)),
        #[cfg(feature = "read_image_file")]
        InputWrapper::ReadImageFile(input) => Ok(StartedInput::ReadImageFile(input)),
      }
    }
  }

  /// 已启动的输入源
  pub enum StartedInput {
    #[cfg(feature = "camera_input")]
    Camera(VideoStream<Mat>),
    #[cfg(feature = "read_image_file")]
    ReadImageFile(ImageFileInput),
  }

  impl FrameSource for StartedInput {
    type Frame = Mat;
    type Error = InputError;

    fn read(&mut self) -> Result<Option<Self::Frame>, Self::Error> {
      match self {
        #[cfg(feature = "camera_input")]
        StartedInput::Camera(input) => match input.read() {
          Ok(frame) => Ok(frame),
          Err(never) => match never {},
        },
        #[cfg(feature = "read_image_file")]
        StartedInput::ReadImageFile(input) => input.read().map_err(InputError::from),
      }
    }

    fn stop(&mut self) {
      match self {
        #[cfg(feature = "camera_input")]
        StartedInput::Camera(input) => input.stop(),
        #[cfg(feature = "read_image_file")]
        StartedInput::ReadImageFile(input) => input.stop(),
      }
    }
  }
}
