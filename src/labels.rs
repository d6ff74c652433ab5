// 该文件是 Kanjian （看见） 项目的一部分。
// src/labels.rs - 类别标签与颜色表
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

use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::info;

/// MobileNet-SSD 类别名称，下标即模型输出的类别编号
pub const MOBILENET_SSD_CLASSES: [&str; 22] = [
  "aeroplane",
  "background",
  "bicycle",
  "bird",
  "boat",
  "bottle",
  "bus",
  "car",
  "cat",
  "chair",
  "cow",
  "diningtable",
  "dog",
  "horse",
  "motorbike",
  "person",
  "pottedplant",
  "sheep",
  "sofa",
  "train",
  "tvmonitor",
  "mobile",
];

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("无法读取标签文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件为空")]
  Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
  names: Box<[String]>,
}

impl Default for LabelTable {
  fn default() -> Self {
    Self {
      names: MOBILENET_SSD_CLASSES.iter().map(|s| s.to_string()).collect(),
    }
  }
}

impl LabelTable {
  pub fn from_names<I, S>(names: I) -> Result<Self, LabelError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let names: Box<[String]> = names.into_iter().map(Into::into).collect();
    if names.is_empty() {
      return Err(LabelError::Empty);
    }
    Ok(Self { names })
  }

  /// 从文本文件读取标签，每行一个，忽略空行
  pub fn from_file(path: &Path) -> Result<Self, LabelError> {
    info!("加载标签文件: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Self::from_names(
      content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty()),
    )
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.names.get(index).map(String::as_str)
  }
}

/// RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

impl Color {
  pub fn r(&self) -> u8 {
    self.0[0]
  }

  pub fn g(&self) -> u8 {
    self.0[1]
  }

  pub fn b(&self) -> u8 {
    self.0[2]
  }
}

/// 与标签表平行的颜色表，每个类别一种颜色
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
  colors: Box<[Color]>,
}

impl ColorTable {
  pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
    let colors = (0..len)
      .map(|_| Color([rng.gen_range(0..=255), rng.gen_range(0..=255), rng.gen_range(0..=255)]))
      .collect();
    Self { colors }
  }

  pub fn seeded(len: usize, seed: u64) -> Self {
    Self::random(len, &mut ChaCha8Rng::seed_from_u64(seed))
  }

  /// 按标签表生成颜色表，未指定种子时使用系统随机源
  pub fn for_labels(labels: &LabelTable, seed: Option<u64>) -> Self {
    match seed {
      Some(seed) => Self::seeded(labels.len(), seed),
      None => Self::random(labels.len(), &mut rand::thread_rng()),
    }
  }

  pub fn len(&self) -> usize {
    self.colors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.colors.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<Color> {
    self.colors.get(index).copied()
  }
}
