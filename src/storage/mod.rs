//! 对象存储模块
//!
//! 上传接口把原始字节写入对象存储，键按上传时间与原始文件名派生。
//! 默认实现落在本地磁盘，由静态文件服务对外提供访问。

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 对象存储接口
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// 写入对象，返回可公开访问的 URL
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String>;
}

/// 本地磁盘对象存储
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    /// 存储根目录
    root: PathBuf,
    /// 对外访问的基础 URL（不带尾部斜杠）
    public_base_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 计算对象的公开 URL，逐段做百分号编码
    pub fn url_for(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        format!("{}/{}", self.public_base_url, encoded.join("/"))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        // 拒绝路径穿越
        if key.split('/').any(|seg| seg == ".." || seg.is_empty()) {
            bail!("非法的对象键: {}", key);
        }

        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        debug!("对象已写入: key={}, size={}", key, bytes.len());
        Ok(self.url_for(key))
    }
}

/// 生成对象键：uploads/{毫秒时间戳}-{清洗后的文件名}
pub fn object_key(name: &str) -> String {
    let ts = chrono::Utc::now().timestamp_millis();
    format!("uploads/{}-{}", ts, sanitize_filename(name))
}

/// 清洗文件名：仅保留字母数字与 . _ -，其余替换为下划线
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('_').is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_writes_file_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path(), "http://127.0.0.1:8080/storage/");

        let url = storage
            .put("uploads/1-a.png", b"hello", "image/png")
            .await
            .unwrap();

        assert_eq!(url, "http://127.0.0.1:8080/storage/uploads/1-a.png");
        let on_disk = std::fs::read(dir.path().join("uploads/1-a.png")).unwrap();
        assert_eq!(on_disk, b"hello");
    }

    #[tokio::test]
    async fn test_put_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path(), "http://h/storage");

        assert!(storage.put("../evil", b"x", "text/plain").await.is_err());
        assert!(storage.put("a//b", b"x", "text/plain").await.is_err());
    }

    #[test]
    fn test_url_encoding() {
        let storage = LocalObjectStorage::new("/tmp/s", "http://h/storage");
        assert_eq!(
            storage.url_for("uploads/1-a b.png"),
            "http://h/storage/uploads/1-a%20b.png"
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("my file (1).png"), "my_file__1_.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename(""), "unnamed");
    }

    #[test]
    fn test_object_key_shape() {
        let key = object_key("a.png");
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with("-a.png"));
    }
}
