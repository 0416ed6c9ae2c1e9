// 应用状态

use crate::config::AppConfig;
use crate::persistence::FileMetaStore;
use crate::storage::LocalObjectStorage;
use std::sync::Arc;

/// 应用全局状态
#[derive(Clone)]
pub struct AppState {
    /// 对象存储
    pub storage: Arc<LocalObjectStorage>,
    /// 元数据存储
    pub file_store: Arc<FileMetaStore>,
    /// 应用配置
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// 创建新的应用状态（从默认路径加载配置）
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::load_or_default("config/app.toml").await;
        Self::with_config(config)
    }

    /// 用给定配置创建应用状态
    pub fn with_config(config: AppConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.storage.data_dir)?;

        let storage = Arc::new(LocalObjectStorage::new(
            config.storage.data_dir.clone(),
            config.storage.public_base_url.clone(),
        ));
        let file_store = Arc::new(FileMetaStore::new(&config.database.db_path)?);

        Ok(Self {
            storage,
            file_store,
            config: Arc::new(config),
        })
    }
}
