// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/mobilenet_ssd.rs - MobileNet-SSD (Caffe) 模型
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

use std::path::{Path, PathBuf};

use opencv::{
  core::{CV_32F, Mat, Scalar, Size},
  dnn::{self, Net},
  prelude::*,
};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::model::{BlobSpec, Model, RawTensor};

#[derive(Error, Debug)]
pub enum MobileNetSsdError {
  #[error("模型文件不存在: {0}")]
  ModelNotFound(PathBuf),
  #[error("模型路径无法转换为 UTF-8: {0}")]
  ModelPathError(PathBuf),
  #[error("模型为空: {0}")]
  ModelEmpty(PathBuf),
  #[error("OpenCV 错误: {0}")]
  OpenCvError(#[from] opencv::Error),
}

pub struct MobileNetSsdBuilder {
  prototxt: PathBuf,
  weights: PathBuf,
  blob: BlobSpec,
}

impl MobileNetSsdBuilder {
  pub fn new(prototxt: impl Into<PathBuf>, weights: impl Into<PathBuf>) -> Self {
    Self {
      prototxt: prototxt.into(),
      weights: weights.into(),
      blob: BlobSpec::default(),
    }
  }

  pub fn build(self) -> Result<MobileNetSsd, MobileNetSsdError> {
    let prototxt = path_str(&self.prototxt)?;
    let weights = path_str(&self.weights)?;

    info!("加载模型结构: {}", prototxt);
    info!("加载模型权重: {}", weights);
    let net = dnn::read_net_from_caffe(prototxt, weights).map_err(|e| {
      error!("Caffe 模型加载失败: {}", e);
      MobileNetSsdError::OpenCvError(e)
    })?;

    if net.empty()? {
      return Err(MobileNetSsdError::ModelEmpty(self.weights));
    }
    debug!("模型层数: {}", net.get_layer_names()?.len());
    info!("模型加载完成");

    Ok(MobileNetSsd {
      net,
      blob: self.blob,
    })
  }
}

fn path_str(path: &Path) -> Result<&str, MobileNetSsdError> {
  if !path.is_file() {
    error!("模型文件不存在: {}", path.display());
    return Err(MobileNetSsdError::ModelNotFound(path.to_path_buf()));
  }
  path
    .to_str()
    .ok_or_else(|| MobileNetSsdError::ModelPathError(path.to_path_buf()))
}

pub struct MobileNetSsd {
  net: Net,
  blob: BlobSpec,
}

impl MobileNetSsd {
  fn blob_from_frame(&self, frame: &Mat) -> Result<Mat, MobileNetSsdError> {
    let blob = dnn::blob_from_image(
      frame,
      self.blob.scale,
      Size::new(self.blob.width, self.blob.height),
      Scalar::all(self.blob.mean),
      self.blob.swap_rb,
      false,
      CV_32F,
    )?;
    Ok(blob)
  }
}

impl Model for MobileNetSsd {
  type Input = Mat;
  type Output = RawTensor;
  type Error = MobileNetSsdError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("构造输入 blob");
    let blob = self.blob_from_frame(input)?;

    debug!("执行模型推理");
    self.net.set_input(&blob, "", 1.0, Scalar::default())?;
    let output = self.net.forward_single("")?;

    let shape: Vec<i32> = output.mat_size().iter().copied().collect();
    let data = output.data_typed::<f32>()?.to_vec();
    debug!("模型输出形状: {:?}", shape);

    Ok(RawTensor { shape, data })
  }
}
