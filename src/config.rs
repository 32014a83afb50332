use crate::error::{Result, VibeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "qwen-max-latest";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    /// 既定システムプロンプトのファイル（未設定なら組み込みプロンプト）
    pub system_prompt_path: Option<PathBuf>,
    /// セッションログの出力先（未設定なら ~/.config/vibewriting/logs）
    pub log_dir: Option<PathBuf>,
    pub session_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout_seconds: 120,
            system_prompt_path: None,
            log_dir: None,
            session_log: true,
        }
    }
}

impl Config {
    /// 設定ファイルを読み込み、環境変数で上書きする
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// API_KEY / BASE_URL / MODEL_NAME を優先
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("API_KEY").filter(|v| !v.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = var("BASE_URL").filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(model) = var("MODEL_NAME").filter(|v| !v.is_empty()) {
            self.model = model;
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| VibeError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("vibewriting"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("logs")),
        }
    }

    pub fn get_api_key(&self) -> Result<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(VibeError::MissingApiKey)
    }
}
