// 该文件是 Kanjian （看见） 项目的一部分。
// src/detect.rs - 检测结果解析与标注
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

//! 单帧检测流程：推理 -> 过滤 -> 标注 -> 绘制。
//!
//! [`Detector`] 持有模型、标签表、颜色表和置信度阈值，在启动时构造一次，
//! 之后每一帧都通过它完成处理。

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  frame::FrameShape,
  labels::{Color, ColorTable, LabelTable},
  model::{DetectionTensor, Model, RawTensor, TensorError},
  output::draw::{Canvas, paint},
};

/// 标签相对于边框上沿的偏移（像素）
pub const LABEL_OFFSET: i32 = 15;

/// 像素坐标下的边框
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
  pub x1: i32,
  pub y1: i32,
  pub x2: i32,
  pub y2: i32,
}

impl PixelBox {
  /// 将归一化坐标按 (w, h, w, h) 放大并四舍五入
  pub fn denormalize(bbox: [f32; 4], width: u32, height: u32) -> Self {
    let (w, h) = (width as f64, height as f64);
    let scale = |v: f32, s: f64| (v as f64 * s).round() as i32;
    Self {
      x1: scale(bbox[0], w),
      y1: scale(bbox[1], h),
      x2: scale(bbox[2], w),
      y2: scale(bbox[3], h),
    }
  }
}

/// 标签文字的纵坐标：边框太靠近画面顶部时放到上沿下方
pub fn label_y(start_y: i32) -> i32 {
  let above = start_y.saturating_sub(LABEL_OFFSET);
  if above > LABEL_OFFSET {
    above
  } else {
    start_y.saturating_add(LABEL_OFFSET)
  }
}

pub fn format_label(name: &str, confidence: f32) -> String {
  format!("{}: {:.2}%", name, confidence * 100.0)
}

/// 一条通过阈值的检测结果及其绘制参数
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
  pub class_index: usize,
  pub confidence: f32,
  pub label: String,
  pub bbox: PixelBox,
  pub label_origin: (i32, i32),
  pub color: Color,
}

#[derive(Error, Debug)]
pub enum DetectError<ME, CE> {
  #[error("模型推理错误: {0}")]
  Model(ME),
  #[error("检测张量异常: {0}")]
  Tensor(#[from] TensorError),
  #[error("绘制错误: {0}")]
  Canvas(CE),
}

pub struct Detector<M> {
  model: M,
  labels: LabelTable,
  colors: ColorTable,
  threshold: f32,
}

impl<M> Detector<M> {
  pub fn new(model: M, labels: LabelTable, colors: ColorTable, threshold: f32) -> Self {
    if labels.len() != colors.len() {
      warn!(
        "标签表长度 {} 与颜色表长度 {} 不一致",
        labels.len(),
        colors.len()
      );
    }
    Self {
      model,
      labels,
      colors,
      threshold,
    }
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  /// 过滤并解析检测张量，按引擎顺序输出，每条结果记录一次日志
  pub fn annotate(&self, tensor: &DetectionTensor, width: u32, height: u32) -> Vec<Annotation> {
    let mut annotations = Vec::new();

    for candidate in tensor.candidates() {
      if !(candidate.confidence > self.threshold) {
        continue;
      }

      let class_id = candidate.class_id;
      let lookup = (class_id.is_finite() && class_id >= 0.0)
        .then(|| class_id as usize)
        .and_then(|idx| Some((idx, self.labels.get(idx)?, self.colors.get(idx)?)));
      let Some((class_index, name, color)) = lookup else {
        warn!("类别编号 {} 超出标签表范围，跳过该检测", class_id);
        continue;
      };

      if !candidate.bbox.iter().all(|v| v.is_finite()) {
        warn!("边框坐标无效 {:?}，跳过该检测", candidate.bbox);
        continue;
      }

      let bbox = PixelBox::denormalize(candidate.bbox, width, height);
      let label = format_label(name, candidate.confidence);
      info!("检测到目标: {}", label);

      annotations.push(Annotation {
        class_index,
        confidence: candidate.confidence,
        label,
        bbox,
        label_origin: (bbox.x1, label_y(bbox.y1)),
        color,
      });
    }

    annotations
  }
}

impl<M> Detector<M>
where
  M: Model<Output = RawTensor>,
  M::Input: FrameShape + Canvas,
{
  /// 处理一帧：尺寸取自当前帧，标注直接绘制在该帧上
  pub fn process(
    &mut self,
    frame: &mut M::Input,
  ) -> Result<Vec<Annotation>, DetectError<M::Error, <M::Input as Canvas>::Error>> {
    let (width, height) = (frame.width(), frame.height());

    let raw = self.model.infer(frame).map_err(DetectError::Model)?;
    let tensor = DetectionTensor::try_from(raw)?;
    debug!("候选检测数: {}", tensor.len());

    let annotations = self.annotate(&tensor, width, height);
    paint(frame, &annotations).map_err(DetectError::Canvas)?;
    Ok(annotations)
  }
}
