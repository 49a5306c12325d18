// 该文件是 Huakuang （画框） 项目的一部分。
// src/bin/prepare_templates.rs - 模板准备
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use huakuang::{
  FromUrl,
  detect::SlotDetector,
  output::OutputWrapper,
  task::{PrepareTask, Task},
  template::{JsonFileTemplateStore, TemplateCatalog},
};
use tracing::{info, warn};

/// 分析模板目录中的所有相框，并把模板写入存储
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 静态资源根目录，相框路径相对于它解析
  #[arg(long, value_name = "DIR", default_value = "public")]
  pub public: PathBuf,
  /// 模板目录 JSON 文件；不指定时使用内置的四个相框
  #[arg(long, value_name = "FILE")]
  pub catalog: Option<PathBuf>,
  /// 模板存储，例如 store:///srv/.cache/templates.json
  #[arg(long, value_name = "STORE")]
  pub store: Url,
  /// 检测参数
  #[arg(long, value_name = "DETECTOR", default_value = "slots://")]
  pub detector: Url,
  /// 调试输出，例如 folder:///srv/.cache
  #[arg(long, value_name = "OUTPUT", default_value = "null://")]
  pub output: Url,
  /// 只重新分析该 id 的模板
  #[arg(long, value_name = "ID")]
  pub refresh: Option<u32>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("静态资源目录: {}", args.public.display());
  info!("模板存储: {}", args.store);
  info!("输出路径: {}", args.output);

  let catalog = match &args.catalog {
    Some(path) => TemplateCatalog::from_json_file(path, &args.public)?,
    None => TemplateCatalog::builtin(&args.public),
  };
  let store = JsonFileTemplateStore::from_url(&args.store)?;
  let detector = SlotDetector::from_url(&args.detector)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let templates = PrepareTask::new(&store)
    .with_only(args.refresh)
    .run_task(&catalog, detector, output)?;

  for template in &templates {
    if template.slots.is_empty() {
      warn!("模板 {} ({}) 没有可用槽位", template.name, template.id);
    } else {
      info!(
        "模板 {} ({}): {}x{}, {} 个槽位",
        template.name, template.id, template.width, template.height, template.photo_slots
      );
    }
  }

  Ok(())
}
