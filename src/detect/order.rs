// 该文件是 Huakuang （画框） 项目的一部分。
// src/detect/order.rs - 槽位阅读顺序
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

use std::cmp::Ordering;

use crate::detect::{Region, Slot};

use self::tim_sort::tim_sort;

mod tim_sort;

/// 纵坐标差小于 `row_band_tolerance` 时视为同一行按 x 升序，否则按 y 升序。
///
/// 三个以上纵坐标交错的槽位可能不满足传递性，因此不能交给 `sort_by`。
pub fn reading_order(a: &Slot, b: &Slot, row_band_tolerance: u32) -> Ordering {
  if a.y.abs_diff(b.y) < row_band_tolerance {
    a.x.cmp(&b.x)
  } else {
    a.y.cmp(&b.y)
  }
}

/// 区域转换为槽位并按阅读顺序稳定排序；比较序列与 V8 的 `Array.prototype.sort` 相同
pub fn order_regions(regions: Vec<Region>, row_band_tolerance: u32) -> Vec<Slot> {
  let mut slots: Vec<Slot> = regions.into_iter().map(Slot::from).collect();
  tim_sort(&mut slots, |a, b| reading_order(a, b, row_band_tolerance));
  slots
}
