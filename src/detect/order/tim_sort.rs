// 该文件是 Huakuang （画框） 项目的一部分。
// src/detect/order/tim_sort.rs - 与 V8 Array.prototype.sort 逐步一致的 TimSort
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

//! 稳定排序，比较序列与 V8 的 TimSort 完全相同。
//!
//! 阅读顺序比较器不传递，结果依赖于具体的比较顺序；标准库排序在这种
//! 比较器下还可能 panic。这里逐步复现：自然 run 检测（严格降序时翻转）、
//! 二分插入补足最小 run 长度、run 栈合并规则以及 galloping 合并。

use std::cmp::Ordering;

const MIN_GALLOP: usize = 7;

pub fn tim_sort<T, F>(items: &mut [T], compare: F)
where
  T: Copy,
  F: FnMut(&T, &T) -> Ordering,
{
  let len = items.len();
  if len < 2 {
    return;
  }

  let mut state = MergeState {
    items,
    compare,
    min_gallop: MIN_GALLOP,
    runs: Vec::new(),
  };

  let min_run = min_run_length(len);
  let mut low = 0;
  let mut remaining = len;
  while remaining != 0 {
    let mut run = state.count_and_make_run(low, low + remaining);
    if run < min_run {
      let forced = min_run.min(remaining);
      state.binary_insertion_sort(low, low + run, low + forced);
      run = forced;
    }
    state.runs.push((low, run));
    state.merge_collapse();
    low += run;
    remaining -= run;
  }
  state.merge_force_collapse();
}

fn min_run_length(mut n: usize) -> usize {
  let mut r = 0;
  while n >= 64 {
    r |= n & 1;
    n >>= 1;
  }
  n + r
}

fn lt<T, F>(compare: &mut F, a: &T, b: &T) -> bool
where
  F: FnMut(&T, &T) -> Ordering,
{
  compare(a, b) == Ordering::Less
}

/// `run` 中第一个不小于 `key` 的位置，从 `hint` 开始倍增查找
fn gallop_left<T, F>(compare: &mut F, key: &T, run: &[T], hint: usize) -> usize
where
  F: FnMut(&T, &T) -> Ordering,
{
  let len = run.len() as isize;
  let hint = hint as isize;
  let mut last_ofs: isize = 0;
  let mut ofs: isize = 1;

  if lt(compare, &run[hint as usize], key) {
    let max_ofs = len - hint;
    while ofs < max_ofs {
      if !lt(compare, &run[(hint + ofs) as usize], key) {
        break;
      }
      last_ofs = ofs;
      ofs = (ofs << 1) + 1;
    }
    ofs = ofs.min(max_ofs);
    last_ofs += hint;
    ofs += hint;
  } else {
    let max_ofs = hint + 1;
    while ofs < max_ofs {
      if lt(compare, &run[(hint - ofs) as usize], key) {
        break;
      }
      last_ofs = ofs;
      ofs = (ofs << 1) + 1;
    }
    ofs = ofs.min(max_ofs);
    (last_ofs, ofs) = (hint - ofs, hint - last_ofs);
  }

  last_ofs += 1;
  while last_ofs < ofs {
    let m = last_ofs + ((ofs - last_ofs) >> 1);
    if lt(compare, &run[m as usize], key) {
      last_ofs = m + 1;
    } else {
      ofs = m;
    }
  }
  ofs as usize
}

/// `run` 中第一个大于 `key` 的位置，从 `hint` 开始倍增查找
fn gallop_right<T, F>(compare: &mut F, key: &T, run: &[T], hint: usize) -> usize
where
  F: FnMut(&T, &T) -> Ordering,
{
  let len = run.len() as isize;
  let hint = hint as isize;
  let mut last_ofs: isize = 0;
  let mut ofs: isize = 1;

  if lt(compare, key, &run[hint as usize]) {
    let max_ofs = hint + 1;
    while ofs < max_ofs {
      if !lt(compare, key, &run[(hint - ofs) as usize]) {
        break;
      }
      last_ofs = ofs;
      ofs = (ofs << 1) + 1;
    }
    ofs = ofs.min(max_ofs);
    (last_ofs, ofs) = (hint - ofs, hint - last_ofs);
  } else {
    let max_ofs = len - hint;
    while ofs < max_ofs {
      if lt(compare, key, &run[(hint + ofs) as usize]) {
        break;
      }
      last_ofs = ofs;
      ofs = (ofs << 1) + 1;
    }
    ofs = ofs.min(max_ofs);
    last_ofs += hint;
    ofs += hint;
  }

  last_ofs += 1;
  while last_ofs < ofs {
    let m = last_ofs + ((ofs - last_ofs) >> 1);
    if lt(compare, key, &run[m as usize]) {
      ofs = m;
    } else {
      last_ofs = m + 1;
    }
  }
  ofs as usize
}

/// 合并的收尾方式
enum MergeTail {
  /// 把暂存区剩余元素整体拷回
  Drain,
  /// 暂存 run 只剩一个元素，它属于合并结果的一端
  PlaceLast,
}

struct MergeState<'a, T, F> {
  items: &'a mut [T],
  compare: F,
  min_gallop: usize,
  runs: Vec<(usize, usize)>,
}

impl<T, F> MergeState<'_, T, F>
where
  T: Copy,
  F: FnMut(&T, &T) -> Ordering,
{
  fn count_and_make_run(&mut self, low_arg: usize, high: usize) -> usize {
    let low = low_arg + 1;
    if low == high {
      return 1;
    }

    let mut run = 2;
    let descending = lt(&mut self.compare, &self.items[low], &self.items[low - 1]);
    let mut previous = low;
    for idx in low + 1..high {
      let less = lt(&mut self.compare, &self.items[idx], &self.items[previous]);
      if descending {
        if !less {
          break;
        }
      } else if less {
        break;
      }
      previous = idx;
      run += 1;
    }

    if descending {
      self.items[low_arg..low_arg + run].reverse();
    }
    run
  }

  fn binary_insertion_sort(&mut self, low: usize, start: usize, high: usize) {
    let mut start = if low == start { start + 1 } else { start };
    while start < high {
      let pivot = self.items[start];
      let mut left = low;
      let mut right = start;
      while left < right {
        let mid = left + ((right - left) >> 1);
        if lt(&mut self.compare, &pivot, &self.items[mid]) {
          right = mid;
        } else {
          left = mid + 1;
        }
      }
      self.items.copy_within(left..start, left + 1);
      self.items[left] = pivot;
      start += 1;
    }
  }

  fn run_invariant_established(&self, n: usize) -> bool {
    if n < 2 {
      return true;
    }
    self.runs[n - 2].1 > self.runs[n - 1].1 + self.runs[n].1
  }

  fn merge_collapse(&mut self) {
    while self.runs.len() > 1 {
      let mut n = self.runs.len() - 2;
      if !self.run_invariant_established(n + 1) || !self.run_invariant_established(n) {
        if self.runs[n - 1].1 < self.runs[n + 1].1 {
          n -= 1;
        }
        self.merge_at(n);
      } else if self.runs[n].1 <= self.runs[n + 1].1 {
        self.merge_at(n);
      } else {
        break;
      }
    }
  }

  fn merge_force_collapse(&mut self) {
    while self.runs.len() > 1 {
      let mut n = self.runs.len() - 2;
      if n > 0 && self.runs[n - 1].1 < self.runs[n + 1].1 {
        n -= 1;
      }
      self.merge_at(n);
    }
  }

  fn merge_at(&mut self, i: usize) {
    let (mut base_a, mut len_a) = self.runs[i];
    let (base_b, len_b) = self.runs[i + 1];
    self.runs[i].1 = len_a + len_b;
    self.runs.remove(i + 1);

    // A 中不大于 B 首元素的前缀已在最终位置
    let k = gallop_right(
      &mut self.compare,
      &self.items[base_b],
      &self.items[base_a..base_a + len_a],
      0,
    );
    base_a += k;
    len_a -= k;
    if len_a == 0 {
      return;
    }

    // B 中不小于 A 末元素的后缀同理
    let len_b = gallop_left(
      &mut self.compare,
      &self.items[base_a + len_a - 1],
      &self.items[base_b..base_b + len_b],
      len_b - 1,
    );
    if len_b == 0 {
      return;
    }

    if len_a <= len_b {
      self.merge_low(base_a, len_a, base_b, len_b);
    } else {
      self.merge_high(base_a, len_a, base_b, len_b);
    }
  }

  fn merge_low(&mut self, base_a: usize, mut len_a: usize, base_b: usize, mut len_b: usize) {
    let temp: Vec<T> = self.items[base_a..base_a + len_a].to_vec();
    let mut dest = base_a;
    let mut cursor_temp = 0;
    let mut cursor_b = base_b;

    self.items[dest] = self.items[cursor_b];
    dest += 1;
    cursor_b += 1;
    len_b -= 1;

    let tail = 'merge: {
      if len_b == 0 {
        break 'merge MergeTail::Drain;
      }
      if len_a == 1 {
        break 'merge MergeTail::PlaceLast;
      }

      let mut min_gallop = self.min_gallop;
      loop {
        let mut wins_a = 0;
        let mut wins_b = 0;

        loop {
          if lt(&mut self.compare, &self.items[cursor_b], &temp[cursor_temp]) {
            self.items[dest] = self.items[cursor_b];
            dest += 1;
            cursor_b += 1;
            wins_b += 1;
            wins_a = 0;
            len_b -= 1;
            if len_b == 0 {
              break 'merge MergeTail::Drain;
            }
            if wins_b >= min_gallop {
              break;
            }
          } else {
            self.items[dest] = temp[cursor_temp];
            dest += 1;
            cursor_temp += 1;
            wins_a += 1;
            wins_b = 0;
            len_a -= 1;
            if len_a == 1 {
              break 'merge MergeTail::PlaceLast;
            }
            if wins_a >= min_gallop {
              break;
            }
          }
        }

        min_gallop += 1;
        let mut first_iteration = true;
        while wins_a >= MIN_GALLOP || wins_b >= MIN_GALLOP || first_iteration {
          first_iteration = false;
          min_gallop = min_gallop.saturating_sub(1).max(1);
          self.min_gallop = min_gallop;

          wins_a = gallop_right(
            &mut self.compare,
            &self.items[cursor_b],
            &temp[cursor_temp..cursor_temp + len_a],
            0,
          );
          if wins_a > 0 {
            self.items[dest..dest + wins_a]
              .copy_from_slice(&temp[cursor_temp..cursor_temp + wins_a]);
            dest += wins_a;
            cursor_temp += wins_a;
            len_a -= wins_a;
            if len_a == 1 {
              break 'merge MergeTail::PlaceLast;
            }
            // 比较器不一致时可能出现
            if len_a == 0 {
              break 'merge MergeTail::Drain;
            }
          }
          self.items[dest] = self.items[cursor_b];
          dest += 1;
          cursor_b += 1;
          len_b -= 1;
          if len_b == 0 {
            break 'merge MergeTail::Drain;
          }

          wins_b = gallop_left(
            &mut self.compare,
            &temp[cursor_temp],
            &self.items[cursor_b..cursor_b + len_b],
            0,
          );
          if wins_b > 0 {
            self.items.copy_within(cursor_b..cursor_b + wins_b, dest);
            dest += wins_b;
            cursor_b += wins_b;
            len_b -= wins_b;
            if len_b == 0 {
              break 'merge MergeTail::Drain;
            }
          }
          self.items[dest] = temp[cursor_temp];
          dest += 1;
          cursor_temp += 1;
          len_a -= 1;
          if len_a == 1 {
            break 'merge MergeTail::PlaceLast;
          }
        }

        min_gallop += 1;
        self.min_gallop = min_gallop;
      }
    };

    match tail {
      MergeTail::Drain => {
        if len_a > 0 {
          self.items[dest..dest + len_a]
            .copy_from_slice(&temp[cursor_temp..cursor_temp + len_a]);
        }
      }
      MergeTail::PlaceLast => {
        self.items.copy_within(cursor_b..cursor_b + len_b, dest);
        self.items[dest + len_b] = temp[cursor_temp];
      }
    }
  }

  fn merge_high(&mut self, base_a: usize, mut len_a: usize, base_b: usize, mut len_b: usize) {
    let temp: Vec<T> = self.items[base_b..base_b + len_b].to_vec();
    // 从右往左合并，游标可能越过左端一格
    let mut dest = (base_b + len_b - 1) as isize;
    let mut cursor_temp = len_b as isize - 1;
    let mut cursor_a = (base_a + len_a - 1) as isize;

    self.items[dest as usize] = self.items[cursor_a as usize];
    dest -= 1;
    cursor_a -= 1;
    len_a -= 1;

    let tail = 'merge: {
      if len_a == 0 {
        break 'merge MergeTail::Drain;
      }
      if len_b == 1 {
        break 'merge MergeTail::PlaceLast;
      }

      let mut min_gallop = self.min_gallop;
      loop {
        let mut wins_a = 0;
        let mut wins_b = 0;

        loop {
          if lt(
            &mut self.compare,
            &temp[cursor_temp as usize],
            &self.items[cursor_a as usize],
          ) {
            self.items[dest as usize] = self.items[cursor_a as usize];
            dest -= 1;
            cursor_a -= 1;
            wins_a += 1;
            wins_b = 0;
            len_a -= 1;
            if len_a == 0 {
              break 'merge MergeTail::Drain;
            }
            if wins_a >= min_gallop {
              break;
            }
          } else {
            self.items[dest as usize] = temp[cursor_temp as usize];
            dest -= 1;
            cursor_temp -= 1;
            wins_b += 1;
            wins_a = 0;
            len_b -= 1;
            if len_b == 1 {
              break 'merge MergeTail::PlaceLast;
            }
            if wins_b >= min_gallop {
              break;
            }
          }
        }

        min_gallop += 1;
        let mut first_iteration = true;
        while wins_a >= MIN_GALLOP || wins_b >= MIN_GALLOP || first_iteration {
          first_iteration = false;
          min_gallop = min_gallop.saturating_sub(1).max(1);
          self.min_gallop = min_gallop;

          let k = gallop_right(
            &mut self.compare,
            &temp[cursor_temp as usize],
            &self.items[base_a..base_a + len_a],
            len_a - 1,
          );
          wins_a = len_a - k;
          if wins_a > 0 {
            dest -= wins_a as isize;
            cursor_a -= wins_a as isize;
            let from = (cursor_a + 1) as usize;
            self
              .items
              .copy_within(from..from + wins_a, (dest + 1) as usize);
            len_a -= wins_a;
            if len_a == 0 {
              break 'merge MergeTail::Drain;
            }
          }
          self.items[dest as usize] = temp[cursor_temp as usize];
          dest -= 1;
          cursor_temp -= 1;
          len_b -= 1;
          if len_b == 1 {
            break 'merge MergeTail::PlaceLast;
          }

          let k = gallop_left(
            &mut self.compare,
            &self.items[cursor_a as usize],
            &temp[..len_b],
            len_b - 1,
          );
          wins_b = len_b - k;
          if wins_b > 0 {
            dest -= wins_b as isize;
            cursor_temp -= wins_b as isize;
            let from = (cursor_temp + 1) as usize;
            let to = (dest + 1) as usize;
            self.items[to..to + wins_b].copy_from_slice(&temp[from..from + wins_b]);
            len_b -= wins_b;
            if len_b == 1 {
              break 'merge MergeTail::PlaceLast;
            }
            // 比较器不一致时可能出现
            if len_b == 0 {
              break 'merge MergeTail::Drain;
            }
          }
          self.items[dest as usize] = self.items[cursor_a as usize];
          dest -= 1;
          cursor_a -= 1;
          len_a -= 1;
          if len_a == 0 {
            break 'merge MergeTail::Drain;
          }
        }

        min_gallop += 1;
        self.min_gallop = min_gallop;
      }
    };

    match tail {
      MergeTail::Drain => {
        if len_b > 0 {
          let to = (dest - (len_b as isize - 1)) as usize;
          self.items[to..to + len_b].copy_from_slice(&temp[..len_b]);
        }
      }
      MergeTail::PlaceLast => {
        dest -= len_a as isize;
        cursor_a -= len_a as isize;
        let from = (cursor_a + 1) as usize;
        self
          .items
          .copy_within(from..from + len_a, (dest + 1) as usize);
        self.items[dest as usize] = temp[cursor_temp as usize];
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn min_run_matches_v8() {
    assert_eq!(min_run_length(3), 3);
    assert_eq!(min_run_length(63), 63);
    assert_eq!(min_run_length(64), 32);
    assert_eq!(min_run_length(65), 33);
    assert_eq!(min_run_length(1000), 63);
  }

  #[test]
  fn strictly_descending_run_is_reversed() {
    let mut items = vec![5, 4, 3, 2, 1];
    tim_sort(&mut items, |a, b| a.cmp(b));
    assert_eq!(items, vec![1, 2, 3, 4, 5]);
  }

  #[test]
  fn large_input_matches_std_stable_sort() {
    // (键, 原始位置)，只按键比较以检查稳定性
    let original: Vec<(u32, usize)> = (0..1000)
      .map(|i| (((i * 7919) % 13) as u32, i))
      .collect();

    let mut expected = original.clone();
    expected.sort_by_key(|&(key, _)| key);

    let mut items = original;
    tim_sort(&mut items, |a, b| a.0.cmp(&b.0));
    assert_eq!(items, expected);
  }

  #[test]
  fn long_presorted_runs_gallop() {
    // 两段各自有序、交错很少的长 run，合并时会进入 galloping
    let mut items: Vec<u32> = (0..200).map(|i| i * 2).collect();
    items.extend((0..200).map(|i| i * 2 + 1));
    items.extend(1000..1300);
    let mut expected = items.clone();
    expected.sort();

    tim_sort(&mut items, |a, b| a.cmp(b));
    assert_eq!(items, expected);
  }

  #[test]
  fn inconsistent_comparator_does_not_panic() {
    let mut items: Vec<u32> = (0..500).map(|i| (i * 7_919) % 1_009).collect();
    tim_sort(&mut items, |a, b| {
      if a.abs_diff(*b) < 300 {
        b.cmp(a)
      } else {
        a.cmp(b)
      }
    });
    assert_eq!(items.len(), 500);
  }
}
