// 该文件是 Huakuang （画框） 项目的一部分。
// src/detect.rs - 相框透明槽位检测
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  mask::AsAlphaMask,
};

mod filter;
mod order;
mod region;

pub use self::filter::filter_regions;
pub use self::order::{order_regions, reading_order};
pub use self::region::find_regions;

pub const DEFAULT_ALPHA_THRESHOLD: u8 = 10;
pub const DEFAULT_MIN_SLOT_SIZE: u32 = 20;
pub const DEFAULT_ROW_BAND_TOLERANCE: u32 = 10;

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("蒙版数据长度不匹配: {width}x{height}, 实际长度 {len}")]
  InvalidMask { width: u32, height: u32, len: usize },
  #[error("检测参数无效: {key}={value}")]
  InvalidConfig { key: String, value: String },
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub trait Detector<Input: ?Sized> {
  type Output;
  type Error;

  fn detect(&self, input: &Input) -> Result<Self::Output, Self::Error>;
}

/// 一个连通透明区域的包围盒，闭区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
  pub min_x: u32,
  pub max_x: u32,
  pub min_y: u32,
  pub max_y: u32,
}

impl Region {
  pub fn seed(x: u32, y: u32) -> Self {
    Self {
      min_x: x,
      max_x: x,
      min_y: y,
      max_y: y,
    }
  }

  pub fn include(&mut self, x: u32, y: u32) {
    self.min_x = self.min_x.min(x);
    self.max_x = self.max_x.max(x);
    self.min_y = self.min_y.min(y);
    self.max_y = self.max_y.max(y);
  }

  pub fn width(&self) -> u32 {
    self.max_x - self.min_x + 1
  }

  pub fn height(&self) -> u32 {
    self.max_y - self.min_y + 1
  }
}

/// 放置照片的槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

impl From<Region> for Slot {
  fn from(region: Region) -> Self {
    Slot {
      x: region.min_x,
      y: region.min_y,
      width: region.width(),
      height: region.height(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectConfig {
  /// 透明度低于该值的像素视为透明
  pub threshold: u8,
  /// 宽和高都必须严格大于该值
  pub min_size: u32,
  /// 纵坐标差小于该值的槽位视为同一行
  pub row_band_tolerance: u32,
}

impl Default for DetectConfig {
  fn default() -> Self {
    Self {
      threshold: DEFAULT_ALPHA_THRESHOLD,
      min_size: DEFAULT_MIN_SLOT_SIZE,
      row_band_tolerance: DEFAULT_ROW_BAND_TOLERANCE,
    }
  }
}

impl DetectConfig {
  pub fn with_threshold(mut self, threshold: u8) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn with_min_size(mut self, min_size: u32) -> Self {
    self.min_size = min_size;
    self
  }

  pub fn with_row_band_tolerance(mut self, tolerance: u32) -> Self {
    self.row_band_tolerance = tolerance;
    self
  }
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DetectError> {
  value.parse().map_err(|_| DetectError::InvalidConfig {
    key: key.to_string(),
    value: value.to_string(),
  })
}

impl FromUrlWithScheme for DetectConfig {
  const SCHEME: &'static str = "slots";
}

impl FromUrl for DetectConfig {
  type Error = DetectError;

  /// 例如 `slots://?threshold=16&min_size=30&row_band=12`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DetectError::SchemeMismatch(format!(
        "期望检测方式 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let mut config = DetectConfig::default();
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "threshold" => config.threshold = parse_param(&key, &value)?,
        "min_size" => config.min_size = parse_param(&key, &value)?,
        "row_band" | "row_band_tolerance" => {
          config.row_band_tolerance = parse_param(&key, &value)?
        }
        _ => warn!("忽略未知检测参数: {}={}", key, value),
      }
    }
    Ok(config)
  }
}

/// 完整检测流程：连通区域 -> 尺寸过滤 -> 阅读顺序排序
pub fn detect_slots<M: AsAlphaMask + ?Sized>(
  mask: &M,
  config: &DetectConfig,
) -> Result<Vec<Slot>, DetectError> {
  let regions = find_regions(mask, config.threshold)?;
  let found = regions.len();
  let regions = filter_regions(regions, config.min_size);
  debug!(
    "连通区域 {} 个，过滤后保留 {} 个",
    found,
    regions.len()
  );
  Ok(order_regions(regions, config.row_band_tolerance))
}

/// 无状态检测器，可在多个线程间共享
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotDetector {
  config: DetectConfig,
}

impl SlotDetector {
  pub fn new(config: DetectConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &DetectConfig {
    &self.config
  }
}

impl FromUrl for SlotDetector {
  type Error = DetectError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    DetectConfig::from_url(url).map(SlotDetector::new)
  }
}

impl<M: AsAlphaMask + ?Sized> Detector<M> for SlotDetector {
  type Output = Vec<Slot>;
  type Error = DetectError;

  fn detect(&self, input: &M) -> Result<Self::Output, Self::Error> {
    let (width, height) = input.dimensions();
    debug!("检测槽位: {}x{}, 参数 {:?}", width, height, self.config);
    let slots = detect_slots(input, &self.config)?;
    debug!("检测到 {} 个槽位", slots.len());
    Ok(slots)
  }
}
