// 该文件是 Huakuang （画框） 项目的一部分。
// src/bin/detect_slots.rs - 单张相框槽位检测
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use huakuang::{
  FromUrl,
  detect::SlotDetector,
  input::ImageFileInput,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};
use tracing::info;

/// 检测一张相框图像中的透明槽位，结果以 JSON 打印到标准输出
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 相框图像，例如 image:///srv/public/assets/frames/1.png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 检测参数，例如 slots://?threshold=10&min_size=20&row_band=10
  #[arg(long, value_name = "DETECTOR", default_value = "slots://")]
  pub detector: Url,
  /// 调试输出：image:///tmp/debug.png、folder:///srv/.cache 或 null://
  #[arg(long, value_name = "OUTPUT", default_value = "null://")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt().with_writer(std::io::stderr).init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("检测参数: {}", args.detector);
  info!("输出路径: {}", args.output);

  let input = ImageFileInput::from_url(&args.input)?;
  let detector = SlotDetector::from_url(&args.detector)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let analysis = OneShotTask.run_task(input.into_frames(), detector, output)?;
  println!("{}", serde_json::to_string_pretty(&analysis)?);

  Ok(())
}
