// 该文件是 Huakuang （画框） 项目的一部分。
// src/mask.rs - 单通道透明度蒙版定义
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

use image::RgbaImage;

use crate::detect::DetectError;

/// 以行优先顺序读取透明度采样
pub trait AsAlphaMask {
  /// (宽, 高)
  fn dimensions(&self) -> (u32, u32);
  fn alpha_samples(&self) -> &[u8];
}

/// 校验采样长度是否等于 宽×高
pub fn check_mask_len(width: u32, height: u32, len: usize) -> Result<(), DetectError> {
  let expected = (width as usize).checked_mul(height as usize);
  if expected != Some(len) {
    return Err(DetectError::InvalidMask {
      width,
      height,
      len,
    });
  }
  Ok(())
}

/// 已校验的透明度蒙版，构造后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaMask {
  width: u32,
  height: u32,
  samples: Box<[u8]>,
}

impl AlphaMask {
  pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, DetectError> {
    check_mask_len(width, height, samples.len())?;
    Ok(Self {
      width,
      height,
      samples: samples.into_boxed_slice(),
    })
  }

  /// 所有像素取同一透明度
  pub fn filled(width: u32, height: u32, alpha: u8) -> Self {
    let size = width as usize * height as usize;
    Self {
      width,
      height,
      samples: vec![alpha; size].into_boxed_slice(),
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn get(&self, x: u32, y: u32) -> Option<u8> {
    if x >= self.width || y >= self.height {
      return None;
    }
    Some(self.samples[y as usize * self.width as usize + x as usize])
  }

  pub fn as_mask_ref(&self) -> AlphaMaskRef<'_> {
    AlphaMaskRef {
      width: self.width,
      height: self.height,
      samples: &self.samples,
    }
  }
}

impl AsAlphaMask for AlphaMask {
  fn dimensions(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  fn alpha_samples(&self) -> &[u8] {
    &self.samples
  }
}

impl From<&RgbaImage> for AlphaMask {
  fn from(image: &RgbaImage) -> Self {
    let (width, height) = image.dimensions();
    let samples: Vec<u8> = image.pixels().map(|pixel| pixel[3]).collect();
    Self {
      width,
      height,
      samples: samples.into_boxed_slice(),
    }
  }
}

/// 借用外部解码结果的原始蒙版，未经校验；检测时才检查长度
#[derive(Debug, Clone, Copy)]
pub struct AlphaMaskRef<'a> {
  pub width: u32,
  pub height: u32,
  pub samples: &'a [u8],
}

impl<'a> AlphaMaskRef<'a> {
  pub fn new(width: u32, height: u32, samples: &'a [u8]) -> Self {
    Self {
      width,
      height,
      samples,
    }
  }
}

impl AsAlphaMask for AlphaMaskRef<'_> {
  fn dimensions(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  fn alpha_samples(&self) -> &[u8] {
    self.samples
  }
}

/// 带来源路径的蒙版，一帧相框图像对应一个
#[derive(Debug, Clone)]
pub struct AlphaFrame {
  source: PathBuf,
  mask: AlphaMask,
}

impl AlphaFrame {
  pub fn new(source: impl Into<PathBuf>, mask: AlphaMask) -> Self {
    Self {
      source: source.into(),
      mask,
    }
  }

  pub fn source(&self) -> &Path {
    &self.source
  }

  pub fn mask(&self) -> &AlphaMask {
    &self.mask
  }

  pub fn into_mask(self) -> AlphaMask {
    self.mask
  }

  /// 来源文件名，用于命名调试输出
  pub fn file_name(&self) -> String {
    self
      .source
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| "frame.png".to_string())
  }
}

impl AsAlphaMask for AlphaFrame {
  fn dimensions(&self) -> (u32, u32) {
    self.mask.dimensions()
  }

  fn alpha_samples(&self) -> &[u8] {
    self.mask.alpha_samples()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgba;

  #[test]
  fn new_rejects_wrong_length() {
    let err = AlphaMask::new(4, 4, vec![0; 15]).unwrap_err();
    assert!(matches!(
      err,
      DetectError::InvalidMask {
        width: 4,
        height: 4,
        len: 15
      }
    ));
  }

  #[test]
  fn get_is_row_major() {
    let mask = AlphaMask::new(3, 2, vec![0, 1, 2, 3, 4, 5]).unwrap();
    assert_eq!(mask.get(2, 0), Some(2));
    assert_eq!(mask.get(0, 1), Some(3));
    assert_eq!(mask.get(3, 0), None);
    assert_eq!(mask.get(0, 2), None);
  }

  #[test]
  fn from_rgba_keeps_only_alpha() {
    let mut image = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
    image.put_pixel(1, 0, Rgba([10, 20, 30, 0]));
    let mask = AlphaMask::from(&image);
    assert_eq!(mask.alpha_samples(), &[255, 0, 255, 255]);
  }

  #[test]
  fn frame_file_name_falls_back() {
    let frame = AlphaFrame::new("/assets/frames/3.png", AlphaMask::filled(1, 1, 255));
    assert_eq!(frame.file_name(), "3.png");
    let frame = AlphaFrame::new("", AlphaMask::filled(1, 1, 255));
    assert_eq!(frame.file_name(), "frame.png");
  }
}
