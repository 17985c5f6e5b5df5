use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;

use crate::models::attrs::ModuleAttrs;

/// 应用配置（YAML）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub title: String,
    /// 文章数据文件（YAML 或 JSON）
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    /// 列表页面的根路径，生成筛选和分页链接时使用
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    /// 列表模块属性
    #[serde(default)]
    pub module: ModuleAttrs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PreviewConfig {
    /// REST 根地址，例如 http://localhost:4000
    pub endpoint: Option<String>,
}

fn default_data_file() -> PathBuf {
    PathBuf::from("posts.yml")
}

fn default_base_url() -> String {
    "/".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Turbo Blog".to_string(),
            data_file: default_data_file(),
            base_url: default_base_url(),
            server: ServerConfig::default(),
            preview: PreviewConfig::default(),
            module: ModuleAttrs::default(),
        }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，文件不存在时使用默认配置
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// 数据文件路径，相对路径以配置文件所在目录为基准
    pub fn data_path(&self, config_path: &Path) -> PathBuf {
        if self.data_file.is_absolute() {
            return self.data_file.clone();
        }
        config_path
            .parent()
            .map(|dir| dir.join(&self.data_file))
            .unwrap_or_else(|| self.data_file.clone())
    }
}
