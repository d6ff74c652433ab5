// 该文件是 Kanjian （看见） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use opencv::{core::Mat, imgcodecs, prelude::*};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::FrameSource};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemaMismatch,
  #[error("无法解码图像文件: {0}")]
  DecodeFailed(String),
  #[error("OpenCV 错误: {0}")]
  OpenCvError(#[from] opencv::Error),
}

/// 静态图像输入：每次读取都返回同一张图像的副本
pub struct ImageFileInput {
  path: String,
  image: Mat,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url.path().to_string();
    let image = imgcodecs::imread(&path, imgcodecs::IMREAD_COLOR)?;
    if image.empty() {
      return Err(ImageFileInputError::DecodeFailed(path));
    }
    info!(
      "读取图像文件 {} ({}x{})",
      path,
      image.cols(),
      image.rows()
    );

    Ok(ImageFileInput { path, image })
  }
}

impl ImageFileInput {
  pub fn path(&self) -> &str {
    &self.path
  }
}

impl FrameSource for ImageFileInput {
  type Frame = Mat;
  type Error = ImageFileInputError;

  fn read(&mut self) -> Result<Option<Self::Frame>, Self::Error> {
    // 标注直接画在帧上，原图需要保持干净
    Ok(Some(self.image.try_clone()?))
  }

  fn stop(&mut self) {}
}
