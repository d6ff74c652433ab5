// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use crate::{
  detect::{Annotation, PixelBox},
  labels::Color,
};

// 绘制常量
pub const BOX_THICKNESS: i32 = 2;
pub const LABEL_FONT_SCALE: f64 = 0.5;
pub const LABEL_THICKNESS: i32 = 2;

/// 可在其上直接绘制的帧
pub trait Canvas {
  type Error;

  fn draw_box(&mut self, bbox: &PixelBox, color: Color) -> Result<(), Self::Error>;
  fn draw_label(&mut self, text: &str, origin: (i32, i32), color: Color) -> Result<(), Self::Error>;
}

/// 边框覆盖的像素矩形 (x, y, 宽, 高)，包含两端坐标
#[cfg_attr(not(feature = "opencv"), allow(dead_code))]
pub(crate) fn box_extent(bbox: &PixelBox) -> (i32, i32, i32, i32) {
  let (x_min, x_max) = (bbox.x1.min(bbox.x2), bbox.x1.max(bbox.x2));
  let (y_min, y_max) = (bbox.y1.min(bbox.y2), bbox.y1.max(bbox.y2));
  (
    x_min,
    y_min,
    x_max.saturating_sub(x_min).saturating_add(1),
    y_max.saturating_sub(y_min).saturating_add(1),
  )
}

/// 按顺序绘制每条检测的边框和标签
pub fn paint<C: Canvas + ?Sized>(canvas: &mut C, annotations: &[Annotation]) -> Result<(), C::Error> {
  for annotation in annotations {
    canvas.draw_box(&annotation.bbox, annotation.color)?;
    canvas.draw_label(&annotation.label, annotation.label_origin, annotation.color)?;
  }
  Ok(())
}

#[cfg(feature = "opencv")]
mod mat {
  use opencv::{
    core::{Mat, Point, Rect, Scalar},
    imgproc,
  };

  use super::*;

  // OpenCV 使用 BGR 通道顺序
  fn to_scalar(color: Color) -> Scalar {
    Scalar::new(color.b() as f64, color.g() as f64, color.r() as f64, 0.0)
  }

  impl Canvas for Mat {
    type Error = opencv::Error;

    fn draw_box(&mut self, bbox: &PixelBox, color: Color) -> Result<(), Self::Error> {
      let (x, y, width, height) = box_extent(bbox);
      let rect = Rect::new(x, y, width, height);
      imgproc::rectangle(
        self,
        rect,
        to_scalar(color),
        BOX_THICKNESS,
        imgproc::LINE_8,
        0,
      )
    }

    fn draw_label(&mut self, text: &str, origin: (i32, i32), color: Color) -> Result<(), Self::Error> {
      imgproc::put_text(
        self,
        text,
        Point::new(origin.0, origin.1),
        imgproc::FONT_HERSHEY_SIMPLEX,
        LABEL_FONT_SCALE,
        to_scalar(color),
        LABEL_THICKNESS,
        imgproc::LINE_8,
        false,
      )
    }
  }
}
