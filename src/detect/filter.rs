// 该文件是 Huakuang （画框） 项目的一部分。
// src/detect/filter.rs - 噪声区域过滤
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

use tracing::trace;

use crate::detect::Region;

/// 仅保留宽、高都严格大于 `min_size` 的区域，去掉抗锯齿边缘等零碎透明像素
pub fn filter_regions(regions: Vec<Region>, min_size: u32) -> Vec<Region> {
  regions
    .into_iter()
    .filter(|region| {
      let keep = region.width() > min_size && region.height() > min_size;
      if !keep {
        trace!(
          "丢弃过小区域: {}x{} at ({}, {})",
          region.width(),
          region.height(),
          region.min_x,
          region.min_y
        );
      }
      keep
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn region(x: u32, y: u32, width: u32, height: u32) -> Region {
    Region {
      min_x: x,
      max_x: x + width - 1,
      min_y: y,
      max_y: y + height - 1,
    }
  }

  #[test]
  fn boundary_is_exclusive() {
    let regions = vec![
      region(0, 0, 21, 21),
      region(0, 0, 20, 21),
      region(0, 0, 21, 20),
      region(0, 0, 1, 1),
    ];
    assert_eq!(filter_regions(regions, 20), vec![region(0, 0, 21, 21)]);
  }

  #[test]
  fn keeps_input_order() {
    let regions = vec![region(90, 0, 30, 30), region(5, 0, 2, 2), region(0, 40, 30, 30)];
    assert_eq!(
      filter_regions(regions, 20),
      vec![region(90, 0, 30, 30), region(0, 40, 30, 30)]
    );
  }

  #[test]
  fn zero_min_size_keeps_everything() {
    let regions = vec![region(0, 0, 1, 1), region(3, 3, 1, 2)];
    assert_eq!(filter_regions(regions.clone(), 0), regions);
  }
}
