// 该文件是 Huakuang （画框） 项目的一部分。
// src/output/save_image_file.rs - 保存调试图像文件
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
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detect::Slot,
  mask::AlphaFrame,
  output::{
    Render,
    draw::{DebugRenderer, RenderError},
  },
  url_to_path,
};

pub struct SaveImageFileOutput {
  path: PathBuf,
  renderer: DebugRenderer,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("渲染错误: {0}")]
  RenderError(#[from] RenderError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput::new(url_to_path(uri)))
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      renderer: DebugRenderer::default(),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn save_image(&self, bytes: &[u8]) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&self.path, bytes)?;

    info!("保存调试图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<AlphaFrame, Vec<Slot>> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &AlphaFrame, result: &Vec<Slot>) -> Result<(), Self::Error> {
    let bytes = self.renderer.render(frame, result)?;
    self.save_image(&bytes)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detect::tests::mask_with_holes;

  #[test]
  fn writes_png_and_creates_parent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/debug.png");
    let output = SaveImageFileOutput::new(&path);
    let frame = AlphaFrame::new("1.png", mask_with_holes(40, 40, &[(5, 5, 25, 25)]));
    let slots = vec![Slot {
      x: 5,
      y: 5,
      width: 25,
      height: 25,
    }];

    output.render_result(&frame, &slots).unwrap();

    let decoded = image::open(&path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 40));
  }

  #[test]
  fn scheme_mismatch() {
    let url = Url::parse("folder:///tmp/out").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }
}
