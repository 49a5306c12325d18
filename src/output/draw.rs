// 该文件是 Huakuang （画框） 项目的一部分。
// src/output/draw.rs - 槽位检测结果可视化
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

use std::io::Cursor;

use image::{ImageFormat, Pixel, Rgba, RgbaImage};
use imageproc::drawing::{Blend, draw_filled_rect_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::{
  detect::{DetectError, Slot},
  mask::{AsAlphaMask, check_mask_len},
};

const BACKGROUND_COLOR: [u8; 4] = [0, 0, 0, 255]; // 不透明黑色
const SLOT_COLOR: [u8; 4] = [255, 0, 0, 128]; // 半透明红色

#[derive(Error, Debug)]
pub enum RenderError {
  #[error("蒙版无效: {0}")]
  InvalidMask(#[from] DetectError),
  #[error("图像编码错误: {0}")]
  EncodeError(#[from] image::ImageError),
}

/// 调试图：黑色底图叠加灰度透明度，再叠加每个槽位的半透明红色矩形
#[derive(Debug, Clone)]
pub struct DebugRenderer {
  background: Rgba<u8>,
  slot_color: Rgba<u8>,
}

impl Default for DebugRenderer {
  fn default() -> Self {
    Self {
      background: Rgba(BACKGROUND_COLOR),
      slot_color: Rgba(SLOT_COLOR),
    }
  }
}

impl DebugRenderer {
  pub fn with_slot_color(mut self, color: [u8; 4]) -> Self {
    self.slot_color = Rgba(color);
    self
  }

  pub fn draw<M: AsAlphaMask + ?Sized>(
    &self,
    mask: &M,
    slots: &[Slot],
  ) -> Result<RgbaImage, RenderError> {
    let (width, height) = mask.dimensions();
    let samples = mask.alpha_samples();
    check_mask_len(width, height, samples.len())?;

    // 单通道叠加层按灰度处理，且完全不透明
    let mut image = RgbaImage::from_pixel(width, height, self.background);
    for (pixel, &alpha) in image.pixels_mut().zip(samples) {
      pixel.blend(&Rgba([alpha, alpha, alpha, 255]));
    }

    let mut canvas = Blend(image);
    for slot in slots {
      if slot.width == 0 || slot.height == 0 {
        continue;
      }
      let rect = Rect::at(slot.x as i32, slot.y as i32).of_size(slot.width, slot.height);
      draw_filled_rect_mut(&mut canvas, rect, self.slot_color);
    }

    // `Rgba::blend` 会让 alpha 略低于 255，调试图整体保持不透明
    let mut image = canvas.0;
    for pixel in image.pixels_mut() {
      pixel[3] = u8::MAX;
    }
    Ok(image)
  }

  /// 编码为 PNG 字节
  pub fn render<M: AsAlphaMask + ?Sized>(
    &self,
    mask: &M,
    slots: &[Slot],
  ) -> Result<Vec<u8>, RenderError> {
    let image = self.draw(mask, slots)?;
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detect::tests::mask_with_holes;
  use crate::mask::AlphaMaskRef;

  #[test]
  fn alpha_becomes_grey_and_slots_turn_red() {
    let mask = mask_with_holes(10, 10, &[(2, 2, 4, 4)]);
    let slots = [Slot {
      x: 2,
      y: 2,
      width: 4,
      height: 4,
    }];
    let image = DebugRenderer::default().draw(&mask, &slots).unwrap();

    assert_eq!(image.dimensions(), (10, 10));
    assert_eq!(*image.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    let inside = image.get_pixel(3, 3);
    assert!(inside[0] > 100);
    assert_eq!(inside[1], 0);
    assert_eq!(inside[2], 0);
    assert_eq!(inside[3], 255);
  }

  #[test]
  fn every_pixel_is_opaque() {
    let mask = mask_with_holes(40, 40, &[(5, 5, 25, 25)]);
    let slots = [Slot {
      x: 5,
      y: 5,
      width: 25,
      height: 25,
    }];
    let image = DebugRenderer::default().draw(&mask, &slots).unwrap();
    assert!(image.pixels().all(|pixel| pixel[3] == 255));
  }

  #[test]
  fn slot_outside_image_is_clipped() {
    let mask = mask_with_holes(8, 8, &[]);
    let slots = [Slot {
      x: 6,
      y: 6,
      width: 10,
      height: 10,
    }];
    let image = DebugRenderer::default().draw(&mask, &slots).unwrap();
    assert_eq!(image.dimensions(), (8, 8));
    assert!(image.get_pixel(7, 7)[1] < 255);
  }

  #[test]
  fn render_produces_png() {
    let mask = mask_with_holes(6, 6, &[(1, 1, 2, 2)]);
    let bytes = DebugRenderer::default().render(&mask, &[]).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(*decoded.get_pixel(1, 1), Rgba([0, 0, 0, 255]));
  }

  #[test]
  fn malformed_mask_is_render_error() {
    let samples = [0u8; 3];
    let raw = AlphaMaskRef::new(2, 2, &samples);
    assert!(matches!(
      DebugRenderer::default().draw(&raw, &[]),
      Err(RenderError::InvalidMask(_))
    ));
  }
}
