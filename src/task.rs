// 该文件是 Kanjian （看见） 项目的一部分。
// src/task.rs - 实时检测任务循环
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

use std::{error::Error as StdError, time::Duration};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  config::DEFAULT_MAX_FAILURES,
  detect::{DetectError, Detector},
  fps::{FpsMeter, FpsReport},
  frame::FrameShape,
  input::FrameSource,
  model::{Model, RawTensor},
  output::{QUIT_KEY, Render, draw::Canvas},
};

/// 没有可用帧时的等待时间，默认上限下约 5 秒无帧才会失败
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(50);

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

fn boxed<E: StdError + Send + Sync + 'static>(err: E) -> BoxError {
  Box::new(err)
}

pub trait Task<I, D, O>: Sized {
  type Error;
  fn run_task(self, input: I, detector: D, output: O) -> Result<FpsReport, Self::Error>;
}

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("输入源错误: {0}")]
  Source(BoxError),
  #[error("模型推理错误: {0}")]
  Model(BoxError),
  #[error("绘制错误: {0}")]
  Canvas(BoxError),
  #[error("显示输出错误: {0}")]
  Output(BoxError),
  #[error("连续 {0} 帧异常，退出任务")]
  TooManyFailures(u32),
}

/// 逐帧执行 读取 -> 推理 -> 标注 -> 显示 -> 轮询按键，直到按下退出键
#[derive(Debug, Clone)]
pub struct LiveTask {
  max_frames: Option<u64>,
  max_failures: u32,
  poll_timeout: Duration,
  retry_delay: Duration,
}

impl Default for LiveTask {
  fn default() -> Self {
    Self {
      max_frames: None,
      max_failures: DEFAULT_MAX_FAILURES,
      poll_timeout: Duration::from_millis(1),
      retry_delay: DEFAULT_RETRY_DELAY,
    }
  }
}

impl LiveTask {
  pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
    self.max_frames = max_frames;
    self
  }

  pub fn with_max_failures(mut self, max_failures: u32) -> Self {
    self.max_failures = max_failures.max(1);
    self
  }

  pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
    self.poll_timeout = poll_timeout;
    self
  }

  pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
    self.retry_delay = retry_delay;
    self
  }

  fn record_anomaly(&self, failures: &mut u32) -> Result<(), TaskError> {
    *failures += 1;
    if *failures >= self.max_failures {
      error!("连续 {} 帧异常，放弃处理", failures);
      return Err(TaskError::TooManyFailures(*failures));
    }
    Ok(())
  }

  fn run_loop<I, M, O>(
    &self,
    input: &mut I,
    detector: &mut Detector<M>,
    output: &mut O,
    fps: &mut FpsMeter,
  ) -> Result<(), TaskError>
  where
    I: FrameSource<Frame = M::Input>,
    I::Error: StdError + Send + Sync + 'static,
    M: Model<Output = RawTensor>,
    M::Input: FrameShape + Canvas,
    M::Error: StdError + Send + Sync + 'static,
    <M::Input as Canvas>::Error: StdError + Send + Sync + 'static,
    O: Render<M::Input>,
    O::Error: StdError + Send + Sync + 'static,
  {
    let mut failures = 0u32;

    loop {
      let shown = match input.read().map_err(|e| TaskError::Source(boxed(e)))? {
        Some(mut frame) => {
          match detector.process(&mut frame) {
            Ok(annotations) => {
              failures = 0;
              debug!("第 {} 帧标注数: {}", fps.frames() + 1, annotations.len());
            }
            Err(DetectError::Tensor(e)) => {
              warn!("检测张量异常，本帧不做标注: {}", e);
              self.record_anomaly(&mut failures)?;
            }
            Err(DetectError::Model(e)) => return Err(TaskError::Model(boxed(e))),
            Err(DetectError::Canvas(e)) => return Err(TaskError::Canvas(boxed(e))),
          }
          output
            .show(&frame)
            .map_err(|e| TaskError::Output(boxed(e)))?;
          true
        }
        None => {
          warn!("暂无可用帧");
          self.record_anomaly(&mut failures)?;
          false
        }
      };

      let timeout = if shown {
        self.poll_timeout
      } else {
        self.retry_delay
      };
      let key = output
        .poll_key(timeout)
        .map_err(|e| TaskError::Output(boxed(e)))?;
      if key == Some(QUIT_KEY) {
        info!("收到退出按键，结束任务循环");
        return Ok(());
      }

      if shown {
        fps.update();
        if self.max_frames.is_some_and(|n| fps.frames() >= n) {
          info!("达到指定帧数 {}, 退出任务循环", fps.frames());
          return Ok(());
        }
      }
    }
  }
}

impl<I, M, O> Task<I, Detector<M>, O> for LiveTask
where
  I: FrameSource<Frame = M::Input>,
  I::Error: StdError + Send + Sync + 'static,
  M: Model<Output = RawTensor>,
  M::Input: FrameShape + Canvas,
  M::Error: StdError + Send + Sync + 'static,
  <M::Input as Canvas>::Error: StdError + Send + Sync + 'static,
  O: Render<M::Input>,
  O::Error: StdError + Send + Sync + 'static,
{
  type Error = TaskError;

  fn run_task(
    self,
    mut input: I,
    mut detector: Detector<M>,
    mut output: O,
  ) -> Result<FpsReport, Self::Error> {
    info!("开始任务...");
    let mut fps = FpsMeter::default();
    fps.start();

    let result = self.run_loop(&mut input, &mut detector, &mut output, &mut fps);

    // 无论循环如何结束，以下清理只执行一次
    fps.stop();
    let report = fps.report();
    report.log();
    let closed = output.close().map_err(|e| TaskError::Output(boxed(e)));
    if let Err(e) = &closed {
      warn!("关闭显示输出失败: {}", e);
    }
    input.stop();
    info!("任务完成，退出");

    result?;
    closed?;
    Ok(report)
  }
}
