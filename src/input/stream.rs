// 该文件是 Kanjian （看见） 项目的一部分。
// src/input/stream.rs - 后台采集线程与最新帧缓存
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

//! 后台线程持续采集，只保留最新的一帧。
//!
//! 读取方不会排队等待：推理比采集慢时，旧帧直接被新帧覆盖。

use std::{
  convert::Infallible,
  sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
    mpsc,
  },
  thread::{self, JoinHandle},
  time::Duration,
};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::input::FrameSource;

const IDLE_BACKOFF: Duration = Duration::from_millis(5);

/// 在采集线程中运行的设备
pub trait Capture {
  type Frame;
  type Error;

  /// 采集下一帧；设备暂时没有数据时返回 `Ok(None)`
  fn grab(&mut self) -> Result<Option<Self::Frame>, Self::Error>;
  /// 释放设备
  fn release(&mut self) {}
}

#[derive(Error, Debug)]
pub enum StreamError<E> {
  #[error("打开采集设备失败: {0}")]
  Open(E),
  #[error("无法创建采集线程: {0}")]
  Spawn(std::io::Error),
  #[error("采集线程在启动过程中退出")]
  ThreadExited,
}

struct Shared<F> {
  latest: Mutex<Option<F>>,
  running: AtomicBool,
}

pub struct VideoStream<F> {
  shared: Arc<Shared<F>>,
  handle: Option<JoinHandle<()>>,
}

impl<F: Clone + Send + 'static> VideoStream<F> {
  /// 在采集线程中打开设备并开始采集，打开失败会同步返回
  pub fn start<C, O>(open: O) -> Result<Self, StreamError<C::Error>>
  where
    C: Capture<Frame = F> + 'static,
    C::Error: std::fmt::Display + Send + 'static,
    O: FnOnce() -> Result<C, C::Error> + Send + 'static,
  {
    let shared = Arc::new(Shared {
      latest: Mutex::new(None),
      running: AtomicBool::new(true),
    });
    let (tx, rx) = mpsc::channel();

    let worker = shared.clone();
    let handle = thread::Builder::new()
      .name("kanjian-capture".to_string())
      .spawn(move || {
        let capture = match open() {
          Ok(capture) => {
            let _ = tx.send(Ok(()));
            capture
          }
          Err(e) => {
            let _ = tx.send(Err(e));
            return;
          }
        };
        capture_loop(capture, &worker);
      })
      .map_err(StreamError::Spawn)?;

    match rx.recv() {
      Ok(Ok(())) => {
        info!("采集线程已启动");
        Ok(Self {
          shared,
          handle: Some(handle),
        })
      }
      Ok(Err(e)) => {
        let _ = handle.join();
        Err(StreamError::Open(e))
      }
      Err(_) => {
        let _ = handle.join();
        Err(StreamError::ThreadExited)
      }
    }
  }

  pub fn is_running(&self) -> bool {
    self.shared.running.load(Ordering::SeqCst)
  }
}

fn capture_loop<C>(mut capture: C, shared: &Shared<C::Frame>)
where
  C: Capture,
  C::Error: std::fmt::Display,
{
  while shared.running.load(Ordering::SeqCst) {
    match capture.grab() {
      Ok(Some(frame)) => {
        *shared.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
      }
      Ok(None) => thread::sleep(IDLE_BACKOFF),
      Err(e) => {
        warn!("采集失败，停止采集线程: {}", e);
        shared.latest.lock().unwrap_or_else(PoisonError::into_inner).take();
        shared.running.store(false, Ordering::SeqCst);
        break;
      }
    }
  }
  capture.release();
  debug!("采集线程退出");
}

impl<F: Clone> FrameSource for VideoStream<F> {
  type Frame = F;
  type Error = Infallible;

  fn read(&mut self) -> Result<Option<Self::Frame>, Self::Error> {
    Ok(
      self
        .shared
        .latest
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone(),
    )
  }

  fn stop(&mut self) {
    let Some(handle) = self.handle.take() else {
      return;
    };
    info!("停止采集线程");
    self.shared.running.store(false, Ordering::SeqCst);
    if handle.join().is_err() {
      warn!("采集线程异常退出");
    }
    self.shared.latest.lock().unwrap_or_else(PoisonError::into_inner).take();
  }
}

impl<F> Drop for VideoStream<F> {
  fn drop(&mut self) {
    if let Some(handle) = self.handle.take() {
      self.shared.running.store(false, Ordering::SeqCst);
      let _ = handle.join();
    }
  }
}
