// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/headless.rs - 无窗口输出
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

use std::{
  convert::Infallible,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::Duration,
};

use tracing::{debug, info, warn};

use crate::output::{QUIT_KEY, Render};

const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);

/// 不显示画面，收到中断信号后报告退出按键
pub struct Headless {
  quit: Arc<AtomicBool>,
  shown: u64,
}

impl Headless {
  pub fn new(quit: Arc<AtomicBool>) -> Self {
    Self { quit, shown: 0 }
  }

  pub fn with_ctrlc() -> Result<Self, ctrlc::Error> {
    let quit = Arc::new(AtomicBool::new(false));
    let flag = quit.clone();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      flag.store(true, Ordering::SeqCst);
      thread::spawn(|| {
        thread::sleep(FORCE_EXIT_AFTER);
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;

    Ok(Self::new(quit))
  }

  pub fn shown(&self) -> u64 {
    self.shown
  }
}

impl<F> Render<F> for Headless {
  type Error = Infallible;

  fn show(&mut self, _frame: &F) -> Result<(), Self::Error> {
    self.shown += 1;
    debug!("无窗口模式，跳过第 {} 帧显示", self.shown);
    Ok(())
  }

  fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>, Self::Error> {
    thread::sleep(timeout);
    Ok(self.quit.load(Ordering::SeqCst).then_some(QUIT_KEY))
  }

  fn close(&mut self) -> Result<(), Self::Error> {
    Ok(())
  }
}
