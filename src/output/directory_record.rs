// 该文件是 Huakuang （画框） 项目的一部分。
// src/output/directory_record.rs - 分析缓存目录输出
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

use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  detect::Slot,
  mask::AlphaFrame,
  output::{
    Render,
    draw::{DebugRenderer, RenderError},
  },
  template::FrameAnalysis,
  url_to_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("渲染错误: {0}")]
  RenderError(#[from] RenderError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("找不到相框分析记录: {0}")]
  NotFound(PathBuf),
}

/// 每帧写出 `debug_<文件名>` 调试图和 `<文件名>.json` 分析记录。
///
/// 查询参数 `no_debug` / `no_record` 可分别关闭其中一项。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  renderer: DebugRenderer,
  debug_image: bool,
  record: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let debug_image = !uri.query_pairs().any(|(k, _)| k == "no_debug");
    let record = !uri.query_pairs().any(|(k, _)| k == "no_record");

    Ok(DirectoryRecordOutput {
      directory: url_to_path(uri),
      renderer: DebugRenderer::default(),
      debug_image,
      record,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      renderer: DebugRenderer::default(),
      debug_image: true,
      record: true,
    }
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn debug_image_path(&self, frame: &AlphaFrame) -> PathBuf {
    self.directory.join(format!("debug_{}", frame.file_name()))
  }

  pub fn record_path(&self, frame: &AlphaFrame) -> PathBuf {
    record_path(&self.directory, &frame.file_name())
  }
}

fn record_path(directory: &Path, file_name: &str) -> PathBuf {
  directory.join(format!("{}.json", file_name))
}

impl Render<AlphaFrame, Vec<Slot>> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &AlphaFrame, result: &Vec<Slot>) -> Result<(), Self::Error> {
    std::fs::create_dir_all(&self.directory)?;

    if self.debug_image {
      let path = self.debug_image_path(frame);
      std::fs::write(&path, self.renderer.render(frame, result)?)?;
      debug!("写入调试图像: {}", path.display());
    }

    if self.record {
      let path = self.record_path(frame);
      let analysis = FrameAnalysis::new(frame, result.clone());
      std::fs::write(&path, serde_json::to_vec_pretty(&analysis)?)?;
      debug!("写入分析记录: {}", path.display());
    }

    Ok(())
  }
}

/// 按相框路径的文件名查找已缓存的分析记录
pub fn read_frame_analysis(
  directory: impl AsRef<Path>,
  frame_path: impl AsRef<Path>,
) -> Result<FrameAnalysis, DirectoryRecordOutputError> {
  let file_name = frame_path
    .as_ref()
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default();
  let path = record_path(directory.as_ref(), &file_name);

  let data = match std::fs::read(&path) {
    Ok(data) => data,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      return Err(DirectoryRecordOutputError::NotFound(path));
    }
    Err(e) => return Err(e.into()),
  };
  Ok(serde_json::from_slice(&data)?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    detect::{Detector, SlotDetector},
    detect::tests::mask_with_holes,
  };

  #[test]
  fn writes_debug_image_and_record() {
    let dir = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(dir.path().join(".cache"));
    let frame = AlphaFrame::new(
      "/public/assets/frames/2.png",
      mask_with_holes(64, 64, &[(4, 4, 24, 24), (36, 4, 24, 24)]),
    );
    let slots = SlotDetector::default().detect(&frame).unwrap();

    output.render_result(&frame, &slots).unwrap();

    assert!(dir.path().join(".cache/debug_2.png").exists());
    let analysis = read_frame_analysis(output.directory(), "/assets/frames/2.png").unwrap();
    assert_eq!(analysis.photo_slots, 2);
    assert_eq!(analysis.slots, slots);
    assert_eq!((analysis.width, analysis.height), (64, 64));
  }

  #[test]
  fn query_flags_disable_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}?no_debug", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let frame = AlphaFrame::new("3.png", mask_with_holes(30, 30, &[]));

    output.render_result(&frame, &Vec::new()).unwrap();

    assert!(!output.debug_image_path(&frame).exists());
    assert!(output.record_path(&frame).exists());
  }

  #[test]
  fn missing_record_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
      read_frame_analysis(dir.path(), "/assets/frames/9.png"),
      Err(DirectoryRecordOutputError::NotFound(_))
    ));
  }
}
