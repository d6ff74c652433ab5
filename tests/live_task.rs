// 该文件是 Kanjian （看见） 项目的一部分。
// tests/live_task.rs - 任务循环集成测试
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
  cell::RefCell,
  collections::VecDeque,
  convert::Infallible,
  rc::Rc,
  time::Duration,
};

use kanjian::{
  detect::{Detector, PixelBox},
  frame::FrameShape,
  input::FrameSource,
  labels::{Color, ColorTable, LabelTable},
  model::{Model, RawTensor},
  output::{Render, draw::Canvas},
  task::{LiveTask, Task, TaskError},
};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
struct FakeFrame {
  width: u32,
  height: u32,
  boxes: Vec<PixelBox>,
  labels: Vec<(String, (i32, i32))>,
}

impl FakeFrame {
  fn new(width: u32, height: u32) -> Self {
    Self {
      width,
      height,
      ..Default::default()
    }
  }
}

impl FrameShape for FakeFrame {
  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }
}

impl Canvas for FakeFrame {
  type Error = Infallible;

  fn draw_box(&mut self, bbox: &PixelBox, _color: Color) -> Result<(), Self::Error> {
    self.boxes.push(*bbox);
    Ok(())
  }

  fn draw_label(&mut self, text: &str, origin: (i32, i32), _color: Color) -> Result<(), Self::Error> {
    self.labels.push((text.to_string(), origin));
    Ok(())
  }
}

#[derive(Debug, Default)]
struct Log {
  reads: usize,
  stops: usize,
  closes: usize,
  shown: Vec<FakeFrame>,
  sizes_seen: Vec<(u32, u32)>,
  timeouts: Vec<Duration>,
}

type SharedLog = Rc<RefCell<Log>>;

/// 按脚本返回帧，脚本耗尽后重复最后一个结果
struct ScriptedSource {
  script: VecDeque<Option<FakeFrame>>,
  last: Option<FakeFrame>,
  log: SharedLog,
}

impl ScriptedSource {
  fn new(script: Vec<Option<FakeFrame>>, log: &SharedLog) -> Self {
    Self {
      script: script.into(),
      last: None,
      log: log.clone(),
    }
  }
}

impl FrameSource for ScriptedSource {
  type Frame = FakeFrame;
  type Error = Infallible;

  fn read(&mut self) -> Result<Option<FakeFrame>, Infallible> {
    self.log.borrow_mut().reads += 1;
    if let Some(next) = self.script.pop_front() {
      self.last = next;
    }
    Ok(self.last.clone())
  }

  fn stop(&mut self) {
    self.log.borrow_mut().stops += 1;
  }
}

#[derive(Error, Debug)]
#[error("engine crashed")]
struct EngineCrash;

/// 按脚本返回推理结果，脚本耗尽后重复最后一个结果
struct ScriptedModel {
  script: VecDeque<Result<RawTensor, ()>>,
  last: Result<RawTensor, ()>,
  log: SharedLog,
}

impl ScriptedModel {
  fn new(script: Vec<Result<RawTensor, ()>>, log: &SharedLog) -> Self {
    Self {
      script: script.into(),
      last: Ok(RawTensor::default()),
      log: log.clone(),
    }
  }
}

impl Model for ScriptedModel {
  type Input = FakeFrame;
  type Output = RawTensor;
  type Error = EngineCrash;

  fn infer(&mut self, input: &FakeFrame) -> Result<RawTensor, EngineCrash> {
    self
      .log
      .borrow_mut()
      .sizes_seen
      .push((input.width, input.height));
    if let Some(next) = self.script.pop_front() {
      self.last = next;
    }
    self.last.clone().map_err(|()| EngineCrash)
  }
}

/// 记录显示的帧，按脚本返回按键
struct RecordingRender {
  keys: VecDeque<Option<char>>,
  log: SharedLog,
}

impl RecordingRender {
  fn new(keys: Vec<Option<char>>, log: &SharedLog) -> Self {
    Self {
      keys: keys.into(),
      log: log.clone(),
    }
  }
}

impl Render<FakeFrame> for RecordingRender {
  type Error = Infallible;

  fn show(&mut self, frame: &FakeFrame) -> Result<(), Infallible> {
    self.log.borrow_mut().shown.push(frame.clone());
    Ok(())
  }

  fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>, Infallible> {
    self.log.borrow_mut().timeouts.push(timeout);
    Ok(self.keys.pop_front().flatten())
  }

  fn close(&mut self) -> Result<(), Infallible> {
    self.log.borrow_mut().closes += 1;
    Ok(())
  }
}

fn tensor(rows: &[[f32; 7]]) -> RawTensor {
  RawTensor {
    shape: vec![1, 1, rows.len() as i32, 7],
    data: rows.iter().flatten().copied().collect(),
  }
}

fn detector(model: ScriptedModel, threshold: f32) -> Detector<ScriptedModel> {
  let labels = LabelTable::default();
  let colors = ColorTable::seeded(labels.len(), 7);
  Detector::new(model, labels, colors, threshold)
}

fn task() -> LiveTask {
  LiveTask::default().with_poll_timeout(Duration::ZERO)
}

const PERSON: [f32; 7] = [0.0, 15.0, 0.9, 0.1, 0.2, 0.5, 0.6];
const FAINT_CAT: [f32; 7] = [0.0, 8.0, 0.4, 0.0, 0.0, 1.0, 1.0];

#[test]
fn single_frame_yields_one_box_with_expected_label() {
  let log = SharedLog::default();
  let source = ScriptedSource::new(vec![Some(FakeFrame::new(300, 200))], &log);
  let model = ScriptedModel::new(vec![Ok(tensor(&[PERSON, FAINT_CAT]))], &log);
  let output = RecordingRender::new(vec![], &log);

  let report = task()
    .with_max_frames(Some(1))
    .run_task(source, detector(model, 0.4), output)
    .unwrap();

  let log = log.borrow();
  assert_eq!(report.frames, 1);
  assert_eq!(log.shown.len(), 1);
  assert_eq!(
    log.shown[0].boxes,
    vec![PixelBox {
      x1: 30,
      y1: 40,
      x2: 150,
      y2: 120
    }]
  );
  assert_eq!(
    log.shown[0].labels,
    vec![("person: 90.00%".to_string(), (30, 25))]
  );
  assert_eq!(log.sizes_seen, vec![(300, 200)]);
}

#[test]
fn quit_on_first_frame_shuts_down_exactly_once() {
  let log = SharedLog::default();
  let source = ScriptedSource::new(vec![Some(FakeFrame::new(64, 48))], &log);
  let model = ScriptedModel::new(vec![Ok(tensor(&[]))], &log);
  let output = RecordingRender::new(vec![Some('q')], &log);

  let report = task()
    .run_task(source, detector(model, 0.4), output)
    .unwrap();

  let log = log.borrow();
  assert_eq!(log.shown.len(), 1);
  assert_eq!(log.closes, 1);
  assert_eq!(log.stops, 1);
  assert_eq!(report.frames, 0);
}

#[test]
fn other_keys_do_not_stop_the_loop() {
  let log = SharedLog::default();
  let source = ScriptedSource::new(vec![Some(FakeFrame::new(64, 48))], &log);
  let model = ScriptedModel::new(vec![Ok(tensor(&[]))], &log);
  let output = RecordingRender::new(vec![Some('a'), Some('Q'), None, Some('q')], &log);

  let report = task()
    .run_task(source, detector(model, 0.4), output)
    .unwrap();

  assert_eq!(log.borrow().shown.len(), 4);
  assert_eq!(report.frames, 3);
}

#[test]
fn frame_without_passing_detections_is_still_shown() {
  let log = SharedLog::default();
  let source = ScriptedSource::new(vec![Some(FakeFrame::new(300, 200))], &log);
  let model = ScriptedModel::new(vec![Ok(tensor(&[PERSON, FAINT_CAT]))], &log);
  let output = RecordingRender::new(vec![], &log);

  task()
    .with_max_frames(Some(1))
    .run_task(source, detector(model, 0.95), output)
    .unwrap();

  let log = log.borrow();
  assert_eq!(log.shown.len(), 1);
  assert!(log.shown[0].boxes.is_empty());
  assert!(log.shown[0].labels.is_empty());
}

#[test]
fn max_frames_bounds_the_run() {
  let log = SharedLog::default();
  let source = ScriptedSource::new(vec![Some(FakeFrame::new(10, 10))], &log);
  let model = ScriptedModel::new(vec![Ok(tensor(&[PERSON]))], &log);
  let output = RecordingRender::new(vec![], &log);

  let report = task()
    .with_max_frames(Some(5))
    .run_task(source, detector(model, 0.4), output)
    .unwrap();

  let log = log.borrow();
  assert_eq!(report.frames, 5);
  assert_eq!(log.shown.len(), 5);
  assert_eq!(log.closes, 1);
  assert_eq!(log.stops, 1);
}

#[test]
fn missing_frames_are_skipped_until_one_arrives() {
  let log = SharedLog::default();
  let source = ScriptedSource::new(vec![None, None, Some(FakeFrame::new(300, 200))], &log);
  let model = ScriptedModel::new(vec![Ok(tensor(&[PERSON]))], &log);
  let output = RecordingRender::new(vec![], &log);

  let report = task()
    .with_max_frames(Some(1))
    .with_max_failures(3)
    .run_task(source, detector(model, 0.4), output)
    .unwrap();

  let log = log.borrow();
  assert_eq!(log.reads, 3);
  assert_eq!(log.shown.len(), 1);
  assert_eq!(report.frames, 1);
}

#[test]
fn consecutive_missing_frames_become_fatal() {
  let log = SharedLog::default();
  let source = ScriptedSource::new(vec![None], &log);
  let model = ScriptedModel::new(vec![], &log);
  let output = RecordingRender::new(vec![], &log);

  let err = task()
    .with_max_failures(4)
    .run_task(source, detector(model, 0.4), output)
    .unwrap_err();

  assert!(matches!(err, TaskError::TooManyFailures(4)));
  let log = log.borrow();
  assert_eq!(log.reads, 4);
  assert!(log.shown.is_empty());
  assert_eq!(log.closes, 1);
  assert_eq!(log.stops, 1);
}

#[test]
fn malformed_tensor_shows_frame_unannotated() {
  let log = SharedLog::default();
  let source = ScriptedSource::new(vec![Some(FakeFrame::new(300, 200))], &log);
  let malformed = RawTensor {
    shape: vec![1, 1, 1, 6],
    data: vec![0.0; 6],
  };
  let model = ScriptedModel::new(vec![Ok(malformed), Ok(tensor(&[PERSON]))], &log);
  let output = RecordingRender::new(vec![], &log);

  let report = task()
    .with_max_frames(Some(2))
    .run_task(source, detector(model, 0.4), output)
    .unwrap();

  let log = log.borrow();
  assert_eq!(report.frames, 2);
  assert!(log.shown[0].boxes.is_empty());
  assert_eq!(log.shown[1].boxes.len(), 1);
}

#[test]
fn engine_error_is_fatal_but_still_shuts_down() {
  let log = SharedLog::default();
  let source = ScriptedSource::new(vec![Some(FakeFrame::new(300, 200))], &log);
  let model = ScriptedModel::new(vec![Ok(tensor(&[PERSON])), Err(())], &log);
  let output = RecordingRender::new(vec![], &log);

  let err = task()
    .run_task(source, detector(model, 0.4), output)
    .unwrap_err();

  assert!(matches!(err, TaskError::Model(_)));
  let log = log.borrow();
  assert_eq!(log.shown.len(), 1);
  assert_eq!(log.closes, 1);
  assert_eq!(log.stops, 1);
}

#[test]
fn dimensions_come_from_the_frame_being_processed() {
  let log = SharedLog::default();
  let source = ScriptedSource::new(
    vec![
      Some(FakeFrame::new(300, 200)),
      Some(FakeFrame::new(600, 400)),
    ],
    &log,
  );
  let model = ScriptedModel::new(vec![Ok(tensor(&[PERSON]))], &log);
  let output = RecordingRender::new(vec![], &log);

  task()
    .with_max_frames(Some(2))
    .run_task(source, detector(model, 0.4), output)
    .unwrap();

  let log = log.borrow();
  assert_eq!(log.sizes_seen, vec![(300, 200), (600, 400)]);
  assert_eq!(log.shown[0].boxes[0].x2, 150);
  assert_eq!(log.shown[1].boxes[0].x2, 300);
}

#[test]
fn missing_frames_wait_longer_before_retrying() {
  let log = SharedLog::default();
  let source = ScriptedSource::new(vec![None, None, Some(FakeFrame::new(300, 200))], &log);
  let model = ScriptedModel::new(vec![Ok(tensor(&[]))], &log);
  let output = RecordingRender::new(vec![], &log);

  task()
    .with_retry_delay(Duration::from_millis(50))
    .with_max_frames(Some(1))
    .run_task(source, detector(model, 0.4), output)
    .unwrap();

  assert_eq!(
    log.borrow().timeouts,
    vec![
      Duration::from_millis(50),
      Duration::from_millis(50),
      Duration::ZERO
    ]
  );
}
