// 上传条目定义
//
// 状态机：Pending -> Uploading -> Completed / Error
// 重试时由 Error 回到 Pending，绝不跳过 Uploading

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::uploader::preview::PreviewHandle;

/// 条目状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// 等待中
    Pending,
    /// 上传中
    Uploading,
    /// 已完成
    Completed,
    /// 失败
    Error,
}

/// 文件载荷（原始字节 + 元信息）
///
/// 字节以 Arc 共享，克隆载荷不复制文件内容
#[derive(Debug, Clone)]
pub struct FilePayload {
    /// 原始文件名
    pub name: String,
    /// 字节大小
    pub size: u64,
    /// MIME 类型
    pub mime: String,
    /// 文件内容
    pub bytes: Arc<Vec<u8>>,
}

impl FilePayload {
    /// 创建文件载荷，大小取自字节长度
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        let bytes = Arc::new(bytes);
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime: mime.into(),
            bytes,
        }
    }

    /// 是否为图片类型（决定是否派生本地预览）
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// 上传条目
///
/// 由校验器创建，仅由队列管理器与上传任务推进状态。
/// 预览句柄随条目销毁而释放。
#[derive(Debug)]
pub struct UploadEntry {
    /// 条目ID（按值比较，避免依赖对象同一性）
    pub id: Uuid,
    /// 文件载荷
    pub payload: FilePayload,
    /// 条目状态
    pub status: EntryStatus,
    /// 进度百分比 (0-100，尽力而为)
    pub progress: u8,
    /// 上传成功后的资源地址
    pub url: Option<String>,
    /// 错误信息
    pub error: Option<String>,
    /// 本地预览句柄（仅图片）
    pub preview: Option<PreviewHandle>,
    /// 创建时间 (Unix 毫秒)
    pub created_at: i64,
    /// 开始时间 (Unix 毫秒)
    pub started_at: Option<i64>,
    /// 完成时间 (Unix 毫秒)
    pub completed_at: Option<i64>,
}

impl UploadEntry {
    /// 创建新的上传条目
    pub fn new(payload: FilePayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            status: EntryStatus::Pending,
            progress: 0,
            url: None,
            error: None,
            preview: None,
            created_at: chrono::Utc::now().timestamp_millis(),
            started_at: None,
            completed_at: None,
        }
    }

    /// 创建带预览句柄的条目
    pub fn with_preview(payload: FilePayload, preview: PreviewHandle) -> Self {
        let mut entry = Self::new(payload);
        entry.preview = Some(preview);
        entry
    }

    /// 标记为上传中
    pub fn mark_uploading(&mut self) {
        self.status = EntryStatus::Uploading;
        if self.started_at.is_none() {
            self.started_at = Some(chrono::Utc::now().timestamp_millis());
        }
    }

    /// 标记为已完成
    pub fn mark_completed(&mut self, url: String) {
        self.status = EntryStatus::Completed;
        self.progress = 100;
        self.url = Some(url);
        self.error = None;
        self.completed_at = Some(chrono::Utc::now().timestamp_millis());
    }

    /// 标记为失败（进度保持在最后已知值）
    pub fn mark_failed(&mut self, error: String) {
        self.status = EntryStatus::Error;
        self.error = Some(error);
    }

    /// 重置为等待中（手动重试），进度归零
    pub fn mark_pending(&mut self) {
        self.status = EntryStatus::Pending;
        self.progress = 0;
        self.error = None;
    }

    /// 生成展示用快照（不携带字节与预览句柄）
    pub fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            id: self.id,
            name: self.payload.name.clone(),
            size: self.payload.size,
            mime: self.payload.mime.clone(),
            status: self.status,
            progress: self.progress,
            url: self.url.clone(),
            error: self.error.clone(),
            has_preview: self.preview.is_some(),
            created_at: self.created_at,
        }
    }
}

/// 条目快照（用于列表展示）
#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub id: Uuid,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime: String,
    pub status: EntryStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub has_preview: bool,
    pub created_at: i64,
}
