// 该文件是 Huakuang （画框） 项目的一部分。
// tests/template_preparation.rs - 模板准备集成测试
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

use std::path::Path;

use huakuang::{
  FromUrl,
  detect::SlotDetector,
  output::OutputWrapper,
  task::{PrepareTask, Task},
  template::{
    JsonFileTemplateStore, StoreError, TemplateCatalog, TemplateSpec, TemplateStore,
  },
};
use image::{Rgba, RgbaImage};

fn write_frame(path: &Path, holes: &[(u32, u32, u32, u32)]) {
  let mut image = RgbaImage::from_pixel(160, 120, Rgba([255, 255, 255, 255]));
  for &(x, y, w, h) in holes {
    for row in y..y + h {
      for col in x..x + w {
        image.put_pixel(col, row, Rgba([255, 255, 255, 0]));
      }
    }
  }
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  image.save(path).unwrap();
}

#[cfg(feature = "directory_record")]
#[test]
fn populate_persists_catalog_with_debug_output() {
  let dir = tempfile::tempdir().unwrap();
  let public = dir.path().join("public");
  write_frame(&public.join("assets/frames/1.png"), &[(10, 10, 60, 100)]);
  write_frame(&public.join("assets/frames/2.png"), &[(10, 10, 60, 40), (90, 10, 60, 40), (10, 70, 140, 40)]);
  write_frame(&public.join("assets/frames/3.png"), &[]);
  // 4.png 缺失

  let catalog = TemplateCatalog::builtin(&public);
  let store = JsonFileTemplateStore::new(dir.path().join(".cache/templates.json"));
  let output =
    OutputWrapper::from_url(&url::Url::parse(&format!("folder://{}/.cache", dir.path().display())).unwrap())
      .unwrap();

  let templates = PrepareTask::new(&store)
    .run_task(&catalog, SlotDetector::default(), output)
    .unwrap();

  let counts: Vec<usize> = templates.iter().map(|t| t.photo_slots).collect();
  assert_eq!(counts, vec![1, 3, 0, 0]);
  assert_eq!((templates[2].width, templates[2].height), (160, 120));
  assert_eq!((templates[3].width, templates[3].height), (0, 0));

  assert_eq!(store.all().unwrap(), templates);
  assert!(dir.path().join(".cache/debug_2.png").exists());
  assert!(dir.path().join(".cache/2.png.json").exists());
  assert!(!dir.path().join(".cache/debug_4.png").exists());
}

#[test]
fn refresh_picks_up_replaced_frame() {
  let dir = tempfile::tempdir().unwrap();
  let public = dir.path().join("public");
  let catalog = TemplateCatalog::new(
    &public,
    vec![
      TemplateSpec::new(10, "Strip", "/frames/strip.png"),
      TemplateSpec::new(11, "Square", "/frames/square.png"),
    ],
  );
  let store = JsonFileTemplateStore::new(dir.path().join("templates.json"));
  assert!(matches!(store.all(), Err(StoreError::Unavailable)));

  let null = OutputWrapper::from_url(&url::Url::parse("null://").unwrap()).unwrap();
  PrepareTask::new(&store)
    .run_task(&catalog, SlotDetector::default(), null)
    .unwrap();
  assert_eq!(store.get(11).unwrap().photo_slots, 0);

  write_frame(&public.join("frames/square.png"), &[(30, 20, 100, 80)]);
  let null = OutputWrapper::from_url(&url::Url::parse("null://").unwrap()).unwrap();
  let refreshed = PrepareTask::new(&store)
    .with_only(Some(11))
    .run_task(&catalog, SlotDetector::default(), null)
    .unwrap();

  assert_eq!(refreshed.len(), 1);
  assert_eq!(store.get(11).unwrap().photo_slots, 1);
  assert_eq!(store.get(10).unwrap().photo_slots, 0);
  let ids: Vec<u32> = store.all().unwrap().iter().map(|t| t.id).collect();
  assert_eq!(ids, vec![10, 11]);
}
