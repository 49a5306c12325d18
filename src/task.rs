// 该文件是 Huakuang （画框） 项目的一部分。
// src/task.rs - 检测任务
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

use std::fmt::Display;

use tracing::{error, info};

use crate::{
  detect::{Detector, Slot, SlotDetector},
  mask::AlphaFrame,
  output::Render,
  template::{FrameAnalysis, Template, TemplateCatalog, TemplateStore},
};

pub trait Task<I, D, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, detector: D, output: O) -> Result<Self::Output, Self::Error>;
}

/// 取一帧，检测并输出调试结果；调试输出失败不影响检测结果
pub struct OneShotTask;

impl<DE, RE, I, D, O> Task<I, D, O> for OneShotTask
where
  DE: std::error::Error + Sync + Send + 'static,
  RE: Display,
  I: Iterator<Item = AlphaFrame>,
  D: Detector<AlphaFrame, Output = Vec<Slot>, Error = DE>,
  O: Render<AlphaFrame, Vec<Slot>, Error = RE>,
{
  type Output = FrameAnalysis;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, detector: D, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("读取相框: {}", frame.source().display());
    let now = std::time::Instant::now();
    let slots = detector.detect(&frame)?;
    info!("检测完成，找到 {} 个槽位，耗时: {:.2?}", slots.len(), now.elapsed());

    if let Err(e) = output.render_result(&frame, &slots) {
      error!("调试输出失败: {}", e);
    }

    Ok(FrameAnalysis::new(&frame, slots))
  }
}

/// 分析整个模板目录并写入存储；指定 `only` 时只刷新一个模板
pub struct PrepareTask<'s, S: ?Sized> {
  store: &'s S,
  only: Option<u32>,
}

impl<'s, S: TemplateStore + ?Sized> PrepareTask<'s, S> {
  pub fn new(store: &'s S) -> Self {
    Self { store, only: None }
  }

  pub fn with_only(mut self, id: Option<u32>) -> Self {
    self.only = id;
    self
  }
}

impl<'c, 's, S, O> Task<&'c TemplateCatalog, SlotDetector, O> for PrepareTask<'s, S>
where
  S: TemplateStore + ?Sized,
  O: Render<AlphaFrame, Vec<Slot>> + Sync,
  O::Error: Display,
{
  type Output = Vec<Template>;
  type Error = anyhow::Error;

  fn run_task(
    self,
    catalog: &'c TemplateCatalog,
    detector: SlotDetector,
    output: O,
  ) -> Result<Self::Output, Self::Error> {
    let now = std::time::Instant::now();
    let templates = match self.only {
      Some(id) => vec![catalog.refresh(id, &detector, self.store, &output)?],
      None => catalog.populate(&detector, self.store, &output)?,
    };
    info!(
      "处理 {} 个模板，其中 {} 个没有槽位，耗时: {:.2?}",
      templates.len(),
      templates.iter().filter(|t| t.slots.is_empty()).count(),
      now.elapsed()
    );
    Ok(templates)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{detect::tests::mask_with_holes, output::NullOutput, template::MemoryTemplateStore};

  struct FailingOutput;

  impl Render<AlphaFrame, Vec<Slot>> for FailingOutput {
    type Error = std::io::Error;

    fn render_result(&self, _frame: &AlphaFrame, _result: &Vec<Slot>) -> Result<(), Self::Error> {
      Err(std::io::Error::other("disk full"))
    }
  }

  #[test]
  fn one_shot_survives_render_failure() {
    let frame = AlphaFrame::new("1.png", mask_with_holes(100, 100, &[(30, 30, 40, 40)]));
    let analysis = OneShotTask
      .run_task(
        std::iter::once(frame),
        SlotDetector::default(),
        FailingOutput,
      )
      .unwrap();
    assert_eq!(analysis.photo_slots, 1);
    assert_eq!((analysis.width, analysis.height), (100, 100));
  }

  #[test]
  fn one_shot_without_input_fails() {
    let result = OneShotTask.run_task(std::iter::empty(), SlotDetector::default(), NullOutput);
    assert!(result.is_err());
  }

  #[test]
  fn prepare_task_registers_every_template() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = TemplateCatalog::builtin(dir.path());
    let store = MemoryTemplateStore::new();
    let templates = PrepareTask::new(&store)
      .run_task(&catalog, SlotDetector::default(), NullOutput)
      .unwrap();
    assert_eq!(templates.len(), 4);
    assert_eq!(store.all().unwrap().len(), 4);
  }
}
