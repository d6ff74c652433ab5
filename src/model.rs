// 该文件是 Kanjian （看见） 项目的一部分。
// src/model.rs - 模型
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

use thiserror::Error;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 输入预处理参数，必须与模型训练时保持一致
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobSpec {
  pub width: i32,
  pub height: i32,
  pub scale: f64,
  pub mean: f64,
  pub swap_rb: bool,
}

/// MobileNet-SSD (Caffe) 的预处理参数：(pixel - 127.5) * 0.007843，缩放到 300x300，交换 R/B
pub const MOBILENET_SSD_BLOB: BlobSpec = BlobSpec {
  width: 300,
  height: 300,
  scale: 0.007843,
  mean: 127.5,
  swap_rb: true,
};

impl Default for BlobSpec {
  fn default() -> Self {
    MOBILENET_SSD_BLOB
  }
}

/// 检测张量最后一维的字段数: [batch, class_id, confidence, x1, y1, x2, y2]
pub const DETECTION_FIELDS: usize = 7;

#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
  #[error("检测张量长度 {0} 不是 7 的整数倍")]
  RaggedLength(usize),
  #[error("检测张量形状不符: {0:?}")]
  UnexpectedShape(Vec<i32>),
}

/// 单个候选检测，坐标为 [0, 1] 归一化值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub batch: f32,
  pub class_id: f32,
  pub confidence: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

/// 推理引擎返回的原始输出
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTensor {
  pub shape: Vec<i32>,
  pub data: Vec<f32>,
}

/// 一次推理输出的检测张量 `[1, 1, N, 7]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionTensor {
  data: Box<[f32]>,
}

impl DetectionTensor {
  pub fn from_raw(data: Vec<f32>) -> Result<Self, TensorError> {
    if data.len() % DETECTION_FIELDS != 0 {
      return Err(TensorError::RaggedLength(data.len()));
    }
    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }

  /// 按 `[1, 1, N, 7]` 形状校验后构造
  pub fn from_shape(shape: &[i32], data: Vec<f32>) -> Result<Self, TensorError> {
    let valid = shape.len() == 4
      && shape[3] as usize == DETECTION_FIELDS
      && shape.iter().all(|d| *d >= 0)
      && shape.iter().map(|d| *d as usize).product::<usize>() == data.len();
    if !valid {
      return Err(TensorError::UnexpectedShape(shape.to_vec()));
    }
    Self::from_raw(data)
  }

  pub fn from_candidates(candidates: &[Candidate]) -> Self {
    let data: Vec<f32> = candidates
      .iter()
      .flat_map(|c| {
        [
          c.batch,
          c.class_id,
          c.confidence,
          c.bbox[0],
          c.bbox[1],
          c.bbox[2],
          c.bbox[3],
        ]
      })
      .collect();
    Self {
      data: data.into_boxed_slice(),
    }
  }

  pub fn len(&self) -> usize {
    self.data.len() / DETECTION_FIELDS
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// 按引擎返回顺序遍历候选
  pub fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
    self.data.chunks_exact(DETECTION_FIELDS).map(|row| Candidate {
      batch: row[0],
      class_id: row[1],
      confidence: row[2],
      bbox: [row[3], row[4], row[5], row[6]],
    })
  }
}

impl TryFrom<RawTensor> for DetectionTensor {
  type Error = TensorError;

  fn try_from(raw: RawTensor) -> Result<Self, Self::Error> {
    Self::from_shape(&raw.shape, raw.data)
  }
}

#[cfg(feature = "caffe_model")]
mod mobilenet_ssd;
#[cfg(feature = "caffe_model")]
pub use self::mobilenet_ssd::{MobileNetSsd, MobileNetSsdBuilder, MobileNetSsdError};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rows_map_to_named_fields() {
    let tensor = DetectionTensor::from_raw(vec![
      0.0, 15.0, 0.9, 0.1, 0.2, 0.5, 0.6, //
      0.0, 7.0, 0.3, 0.0, 0.0, 1.0, 1.0,
    ])
    .unwrap();
    let candidates: Vec<_> = tensor.candidates().collect();
    assert_eq!(tensor.len(), 2);
    assert_eq!(candidates[0].class_id, 15.0);
    assert_eq!(candidates[0].confidence, 0.9);
    assert_eq!(candidates[0].bbox, [0.1, 0.2, 0.5, 0.6]);
    assert_eq!(candidates[1].class_id, 7.0);
  }

  #[test]
  fn ragged_output_is_rejected() {
    assert_eq!(
      DetectionTensor::from_raw(vec![0.0; 10]).unwrap_err(),
      TensorError::RaggedLength(10)
    );
  }

  #[test]
  fn shape_must_end_with_seven_fields() {
    assert!(DetectionTensor::from_shape(&[1, 1, 2, 7], vec![0.0; 14]).is_ok());
    assert!(DetectionTensor::from_shape(&[1, 1, 0, 7], vec![]).unwrap().is_empty());
    assert_eq!(
      DetectionTensor::from_shape(&[1, 2, 7], vec![0.0; 14]).unwrap_err(),
      TensorError::UnexpectedShape(vec![1, 2, 7])
    );
    assert!(DetectionTensor::from_shape(&[1, 1, 3, 7], vec![0.0; 14]).is_err());
  }

  #[test]
  fn raw_engine_output_converts_when_well_formed() {
    let raw = RawTensor {
      shape: vec![1, 1, 1, 7],
      data: vec![0.0, 15.0, 0.9, 0.1, 0.2, 0.5, 0.6],
    };
    assert_eq!(DetectionTensor::try_from(raw).unwrap().len(), 1);

    let raw = RawTensor {
      shape: vec![1, 1, 1, 5],
      data: vec![0.0; 5],
    };
    assert!(DetectionTensor::try_from(raw).is_err());
  }

  #[test]
  fn candidates_round_trip_through_rows() {
    let candidate = Candidate {
      batch: 0.0,
      class_id: 3.0,
      confidence: 0.5,
      bbox: [0.25, 0.25, 0.75, 0.75],
    };
    let tensor = DetectionTensor::from_candidates(&[candidate]);
    assert_eq!(tensor.candidates().next(), Some(candidate));
  }
}
