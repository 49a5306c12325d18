// 该文件是 Huakuang （画框） 项目的一部分。
// src/input/read_image_file.rs - 相框图像文件输入
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

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  mask::{AlphaFrame, AlphaMask},
  url_to_path,
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemaMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("图像没有透明通道: {0}")]
  MissingAlpha(PathBuf),
}

/// 读取一张带透明通道的相框图像，只保留透明度
pub struct ImageFileInput {
  frame: Option<AlphaFrame>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    Self::open(url_to_path(url))
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let frame = load_alpha_frame(path.as_ref())?;
    Ok(ImageFileInput { frame: Some(frame) })
  }

  pub fn into_frames(self) -> ImageFileInputFrames {
    ImageFileInputFrames { inner: self }
  }
}

pub struct ImageFileInputFrames {
  inner: ImageFileInput,
}

impl Iterator for ImageFileInputFrames {
  type Item = AlphaFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.inner.frame.take()
  }
}

/// 解码图像并提取透明通道
pub fn load_alpha_frame(path: &Path) -> Result<AlphaFrame, ImageFileInputError> {
  let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
  debug!(
    "读取图像: {} ({}x{}, {:?})",
    path.display(),
    image.width(),
    image.height(),
    image.color()
  );

  if !image.color().has_alpha() {
    return Err(ImageFileInputError::MissingAlpha(path.to_path_buf()));
  }

  let mask = AlphaMask::from(&image.to_rgba8());
  Ok(AlphaFrame::new(path, mask))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mask::AsAlphaMask;
  use image::{Rgb, RgbImage, Rgba, RgbaImage};

  #[test]
  fn reads_alpha_channel() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    let mut image = RgbaImage::from_pixel(4, 3, Rgba([200, 0, 0, 255]));
    image.put_pixel(2, 1, Rgba([0, 0, 0, 0]));
    image.save(&path).unwrap();

    let url = Url::from_file_path(&path).unwrap();
    let url = Url::parse(&url.as_str().replacen("file", "image", 1)).unwrap();
    let frame = ImageFileInput::from_url(&url)
      .unwrap()
      .into_frames()
      .next()
      .unwrap();
    assert_eq!(frame.dimensions(), (4, 3));
    assert_eq!(frame.mask().get(2, 1), Some(0));
    assert_eq!(frame.mask().get(0, 0), Some(255));
    assert_eq!(frame.file_name(), "frame.png");
  }

  #[test]
  fn yields_single_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.png");
    RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]))
      .save(&path)
      .unwrap();
    let mut frames = ImageFileInput::open(&path).unwrap().into_frames();
    assert!(frames.next().is_some());
    assert!(frames.next().is_none());
  }

  #[test]
  fn opaque_format_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rgb.png");
    RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])).save(&path).unwrap();
    assert!(matches!(
      ImageFileInput::open(&path),
      Err(ImageFileInputError::MissingAlpha(_))
    ));
  }

  #[test]
  fn missing_file_is_io_error() {
    assert!(matches!(
      ImageFileInput::open("/nonexistent/frames/1.png"),
      Err(ImageFileInputError::IoError(_))
    ));
  }

  #[test]
  fn wrong_scheme() {
    let url = Url::parse("folder:///tmp/frame.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }
}
