// 该文件是 Huakuang （画框） 项目的一部分。
// src/detect/region.rs - 四连通透明区域标记
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

use crate::{
  detect::{DetectError, Region},
  mask::{AsAlphaMask, check_mask_len},
};

/// 按行优先顺序扫描蒙版，对每个未访问的透明像素做一次洪水填充。
///
/// 返回的区域按种子像素首次出现的顺序排列。
/// 每个像素最多被访问一次，总开销为 O(宽×高)。
pub fn find_regions<M: AsAlphaMask + ?Sized>(
  mask: &M,
  threshold: u8,
) -> Result<Vec<Region>, DetectError> {
  let (width, height) = mask.dimensions();
  let samples = mask.alpha_samples();
  check_mask_len(width, height, samples.len())?;

  let mut visited = vec![false; samples.len()];
  let mut stack = Vec::new();
  let mut regions = Vec::new();

  for (idx, &alpha) in samples.iter().enumerate() {
    if alpha < threshold && !visited[idx] {
      let region = flood_fill(
        samples,
        &mut visited,
        &mut stack,
        (width, height),
        idx,
        threshold,
      );
      trace!("区域 #{}: {:?}", regions.len(), region);
      regions.push(region);
    }
  }

  Ok(regions)
}

/// 显式栈实现，避免大图递归过深。
///
/// 不透明的邻居也会被标记为已访问，但不向外扩展，也不计入包围盒。
fn flood_fill(
  samples: &[u8],
  visited: &mut [bool],
  stack: &mut Vec<usize>,
  (width, height): (u32, u32),
  seed: usize,
  threshold: u8,
) -> Region {
  let w = width as usize;
  let mut region = Region::seed((seed % w) as u32, (seed / w) as u32);

  stack.clear();
  stack.push(seed);

  while let Some(idx) = stack.pop() {
    if visited[idx] {
      continue;
    }
    visited[idx] = true;

    if samples[idx] >= threshold {
      continue;
    }

    let x = (idx % w) as u32;
    let y = (idx / w) as u32;
    region.include(x, y);

    if x > 0 {
      stack.push(idx - 1);
    }
    if x + 1 < width {
      stack.push(idx + 1);
    }
    if y > 0 {
      stack.push(idx - w);
    }
    if y + 1 < height {
      stack.push(idx + w);
    }
  }

  region
}
