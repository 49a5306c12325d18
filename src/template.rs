// 该文件是 Huakuang （画框） 项目的一部分。
// src/template.rs - 相框模板、模板存储与模板目录
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

use std::{
  collections::BTreeMap,
  fmt::Display,
  path::{Path, PathBuf},
  sync::{Mutex, RwLock},
};

use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detect::{DetectError, Detector, Slot, SlotDetector},
  input::{ImageFileInputError, load_alpha_frame},
  mask::{AlphaFrame, AsAlphaMask},
  output::Render,
  url_to_path,
};

/// 模板目录中的一项：尚未分析的相框
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSpec {
  pub id: u32,
  pub name: String,
  pub frame_src: String,
}

impl TemplateSpec {
  pub fn new(id: u32, name: impl Into<String>, frame_src: impl Into<String>) -> Self {
    Self {
      id,
      name: name.into(),
      frame_src: frame_src.into(),
    }
  }
}

/// 一帧相框的分析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameAnalysis {
  pub photo_slots: usize,
  pub slots: Vec<Slot>,
  pub width: u32,
  pub height: u32,
  pub analyzed_at: String,
}

impl FrameAnalysis {
  pub fn new<M: AsAlphaMask + ?Sized>(mask: &M, slots: Vec<Slot>) -> Self {
    let (width, height) = mask.dimensions();
    Self {
      photo_slots: slots.len(),
      slots,
      width,
      height,
      analyzed_at: Utc::now().to_rfc3339(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
  pub id: u32,
  pub name: String,
  pub frame_src: String,
  pub width: u32,
  pub height: u32,
  pub photo_slots: usize,
  pub slots: Vec<Slot>,
}

impl Template {
  /// 分析失败的模板仍然登记，但没有槽位
  pub fn without_slots(spec: &TemplateSpec) -> Self {
    Self {
      id: spec.id,
      name: spec.name.clone(),
      frame_src: spec.frame_src.clone(),
      width: 0,
      height: 0,
      photo_slots: 0,
      slots: Vec::new(),
    }
  }

  pub fn from_analysis(spec: &TemplateSpec, analysis: &FrameAnalysis) -> Self {
    Self {
      id: spec.id,
      name: spec.name.clone(),
      frame_src: spec.frame_src.clone(),
      width: analysis.width,
      height: analysis.height,
      photo_slots: analysis.photo_slots,
      slots: analysis.slots.clone(),
    }
  }
}

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("模板尚未准备")]
  Unavailable,
  #[error("找不到模板: {0}")]
  NotFound(u32),
  #[error("模板存储锁已损坏")]
  Poisoned,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 以模板 id 为键的模板缓存，由调用方显式传入
pub trait TemplateStore: Send + Sync {
  /// 整体替换
  fn put_all(&self, templates: &[Template]) -> Result<(), StoreError>;
  fn all(&self) -> Result<Vec<Template>, StoreError>;

  fn get(&self, id: u32) -> Result<Template, StoreError> {
    self
      .all()?
      .into_iter()
      .find(|template| template.id == id)
      .ok_or(StoreError::NotFound(id))
  }

  /// 替换同 id 的模板，没有则追加
  fn put(&self, template: Template) -> Result<(), StoreError> {
    let mut templates = match self.all() {
      Ok(templates) => templates,
      Err(StoreError::Unavailable) => Vec::new(),
      Err(e) => return Err(e),
    };
    match templates.iter_mut().find(|t| t.id == template.id) {
      Some(existing) => *existing = template,
      None => templates.push(template),
    }
    self.put_all(&templates)
  }
}

/// 进程内存储，按 id 排序
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
  templates: RwLock<Option<BTreeMap<u32, Template>>>,
}

impl MemoryTemplateStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl TemplateStore for MemoryTemplateStore {
  fn put_all(&self, templates: &[Template]) -> Result<(), StoreError> {
    let map = templates
      .iter()
      .map(|template| (template.id, template.clone()))
      .collect();
    *self.templates.write().map_err(|_| StoreError::Poisoned)? = Some(map);
    Ok(())
  }

  fn all(&self) -> Result<Vec<Template>, StoreError> {
    let guard = self.templates.read().map_err(|_| StoreError::Poisoned)?;
    guard
      .as_ref()
      .map(|map| map.values().cloned().collect())
      .ok_or(StoreError::Unavailable)
  }

  fn get(&self, id: u32) -> Result<Template, StoreError> {
    let guard = self.templates.read().map_err(|_| StoreError::Poisoned)?;
    let map = guard.as_ref().ok_or(StoreError::Unavailable)?;
    map.get(&id).cloned().ok_or(StoreError::NotFound(id))
  }

  fn put(&self, template: Template) -> Result<(), StoreError> {
    let mut guard = self.templates.write().map_err(|_| StoreError::Poisoned)?;
    guard
      .get_or_insert_with(BTreeMap::new)
      .insert(template.id, template);
    Ok(())
  }
}

/// 以 JSON 文件持久化的存储，例如 `store:///var/cache/huakuang/templates.json`
///
/// 读改写在同一把锁内完成；同一文件只应由一个实例写入。
#[derive(Debug)]
pub struct JsonFileTemplateStore {
  path: PathBuf,
  lock: Mutex<()>,
}

impl FromUrlWithScheme for JsonFileTemplateStore {
  const SCHEME: &'static str = "store";
}

impl FromUrl for JsonFileTemplateStore {
  type Error = StoreError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(StoreError::SchemeMismatch(format!(
        "期望存储方式 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Ok(Self::new(url_to_path(url)))
  }
}

impl JsonFileTemplateStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      lock: Mutex::new(()),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn write(&self, templates: &[Template]) -> Result<(), StoreError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(templates)?;
    // 先写临时文件再改名，读者不会看到写了一半的文件
    let tmp = self.path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, &self.path)?;
    debug!("写入 {} 个模板到 {}", templates.len(), self.path.display());
    Ok(())
  }

  fn read(&self) -> Result<Vec<Template>, StoreError> {
    let data = match std::fs::read(&self.path) {
      Ok(data) => data,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(StoreError::Unavailable),
      Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&data)?)
  }
}

impl TemplateStore for JsonFileTemplateStore {
  fn put_all(&self, templates: &[Template]) -> Result<(), StoreError> {
    let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
    self.write(templates)
  }

  fn all(&self) -> Result<Vec<Template>, StoreError> {
    let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
    self.read()
  }

  fn put(&self, template: Template) -> Result<(), StoreError> {
    let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
    let mut templates = match self.read() {
      Ok(templates) => templates,
      Err(StoreError::Unavailable) => Vec::new(),
      Err(e) => return Err(e),
    };
    match templates.iter_mut().find(|t| t.id == template.id) {
      Some(existing) => *existing = template,
      None => templates.push(template),
    }
    self.write(&templates)
  }
}

#[derive(Error, Debug)]
pub enum PrepareError {
  #[error("相框解码失败: {0}")]
  Decode(#[from] ImageFileInputError),
  #[error("槽位检测失败: {0}")]
  Detect(#[from] DetectError),
}

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("模板目录中没有 id 为 {0} 的模板")]
  UnknownTemplate(u32),
  #[error("读取模板目录失败: {0}")]
  IoError(#[from] std::io::Error),
  #[error("模板目录格式错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("模板存储错误: {0}")]
  Store(#[from] StoreError),
}

/// 已知相框的目录；`frame_src` 相对于 `public_root` 解析
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
  public_root: PathBuf,
  specs: Vec<TemplateSpec>,
}

impl TemplateCatalog {
  pub fn new(public_root: impl Into<PathBuf>, specs: Vec<TemplateSpec>) -> Self {
    Self {
      public_root: public_root.into(),
      specs,
    }
  }

  /// 随应用发布的四个相框
  pub fn builtin(public_root: impl Into<PathBuf>) -> Self {
    Self::new(
      public_root,
      vec![
        TemplateSpec::new(1, "Pop and Go Frame", "/assets/frames/1.png"),
        TemplateSpec::new(2, "Classic Frame", "/assets/frames/2.png"),
        TemplateSpec::new(3, "Red Quad Frame", "/assets/frames/3.png"),
        TemplateSpec::new(4, "Red Dual Frame", "/assets/frames/4.png"),
      ],
    )
  }

  /// 从 JSON 数组读取，元素形如 `{"id": 1, "name": "...", "frameSrc": "/assets/frames/1.png"}`
  pub fn from_json_file(
    path: impl AsRef<Path>,
    public_root: impl Into<PathBuf>,
  ) -> Result<Self, CatalogError> {
    let data = std::fs::read(path.as_ref())?;
    let specs: Vec<TemplateSpec> = serde_json::from_slice(&data)?;
    Ok(Self::new(public_root, specs))
  }

  pub fn specs(&self) -> &[TemplateSpec] {
    &self.specs
  }

  pub fn frame_path(&self, spec: &TemplateSpec) -> PathBuf {
    self.public_root.join(spec.frame_src.trim_start_matches('/'))
  }

  /// 解码并检测一帧；调试输出失败只记录日志
  pub fn analyze<O>(
    &self,
    spec: &TemplateSpec,
    detector: &SlotDetector,
    output: &O,
  ) -> Result<FrameAnalysis, PrepareError>
  where
    O: Render<AlphaFrame, Vec<Slot>>,
    O::Error: Display,
  {
    let path = self.frame_path(spec);
    let frame = load_alpha_frame(&path)?;
    let slots = detector.detect(&frame)?;

    if let Err(e) = output.render_result(&frame, &slots) {
      error!("模板 {} 调试输出失败: {}", spec.id, e);
    }

    Ok(FrameAnalysis::new(&frame, slots))
  }

  /// 分析失败时退化为没有槽位的模板
  pub fn prepare<O>(&self, spec: &TemplateSpec, detector: &SlotDetector, output: &O) -> Template
  where
    O: Render<AlphaFrame, Vec<Slot>>,
    O::Error: Display,
  {
    info!("分析模板相框: {} (ID: {})", spec.name, spec.id);
    match self.analyze(spec, detector, output) {
      Ok(analysis) => {
        info!(
          "模板 {} 分析完成: 找到 {} 个槽位",
          spec.name, analysis.photo_slots
        );
        Template::from_analysis(spec, &analysis)
      }
      Err(e) => {
        error!("模板 {} 分析失败: {}", spec.id, e);
        Template::without_slots(spec)
      }
    }
  }

  /// 并行分析所有模板，按目录顺序写入存储
  pub fn populate<S, O>(
    &self,
    detector: &SlotDetector,
    store: &S,
    output: &O,
  ) -> Result<Vec<Template>, CatalogError>
  where
    S: TemplateStore + ?Sized,
    O: Render<AlphaFrame, Vec<Slot>> + Sync,
    O::Error: Display,
  {
    info!("分析相框并准备模板, 共 {} 个", self.specs.len());
    let templates: Vec<Template> = self
      .specs
      .par_iter()
      .map(|spec| self.prepare(spec, detector, output))
      .collect();

    store.put_all(&templates)?;
    info!("模板准备完成");
    Ok(templates)
  }

  /// 重新分析单个模板（例如相框文件被替换后）
  pub fn refresh<S, O>(
    &self,
    id: u32,
    detector: &SlotDetector,
    store: &S,
    output: &O,
  ) -> Result<Template, CatalogError>
  where
    S: TemplateStore + ?Sized,
    O: Render<AlphaFrame, Vec<Slot>>,
    O::Error: Display,
  {
    let spec = self
      .specs
      .iter()
      .find(|spec| spec.id == id)
      .ok_or(CatalogError::UnknownTemplate(id))?;
    let template = self.prepare(spec, detector, output);
    store.put(template.clone())?;
    Ok(template)
  }
}
