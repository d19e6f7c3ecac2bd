// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use config::{Config, File};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

use crate::config::settings::Settings;
use crate::domain::models::site_spec::{validate_sites, SiteSpec};
use crate::utils::errors::SiteConfigError;

/// 站点列表来源
///
/// 调度器在每次 tick 前调用，返回已校验的站点列表
#[async_trait]
pub trait SiteSource: Send + Sync {
    async fn load_sites(&self) -> Result<Vec<SiteSpec>, SiteConfigError>;
}

/// 固定站点列表
pub struct StaticSiteSource {
    sites: Vec<SiteSpec>,
}

impl StaticSiteSource {
    pub fn new(sites: Vec<SiteSpec>) -> Self {
        Self { sites }
    }
}

#[async_trait]
impl SiteSource for StaticSiteSource {
    async fn load_sites(&self) -> Result<Vec<SiteSpec>, SiteConfigError> {
        validate_sites(&self.sites)?;
        Ok(self.sites.clone())
    }
}

/// 每次重新加载完整配置，取其中的 `sites`
pub struct SettingsSiteSource;

#[async_trait]
impl SiteSource for SettingsSiteSource {
    async fn load_sites(&self) -> Result<Vec<SiteSpec>, SiteConfigError> {
        let settings = Settings::new()?;
        validate_sites(&settings.sites)?;
        debug!(count = settings.sites.len(), "loaded sites from settings");
        Ok(settings.sites)
    }
}

#[derive(Debug, Deserialize)]
struct SiteFile {
    #[serde(default)]
    sites: Vec<SiteSpec>,
}

/// 独立站点文件（toml/json/yaml，按扩展名识别），包含 `sites` 数组
pub struct FileSiteSource {
    path: PathBuf,
}

impl FileSiteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SiteSource for FileSiteSource {
    async fn load_sites(&self) -> Result<Vec<SiteSpec>, SiteConfigError> {
        let file: SiteFile = Config::builder()
            .add_source(File::from(self.path.as_path()))
            .build()?
            .try_deserialize()?;
        validate_sites(&file.sites)?;
        debug!(path = %self.path.display(), count = file.sites.len(), "loaded sites from file");
        Ok(file.sites)
    }
}
