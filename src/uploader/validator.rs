// 批量文件校验
//
// 按大小上限与 MIME 白名单把一批候选文件切分为接受/拒绝两个不相交集合。
// 校验不做 I/O、不会阻塞，失败只影响单个文件。

use serde::Serialize;
use std::fmt;

use crate::config::UploadConfig;
use crate::uploader::entry::{FilePayload, UploadEntry};
use crate::uploader::preview::PreviewStore;

/// 单文件大小上限：10 MiB
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// 允许的 MIME 类型白名单
pub const ACCEPTED_FILE_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// 拒绝原因
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum RejectReason {
    /// 超过大小上限
    #[serde(rename = "too large")]
    TooLarge,
    /// 类型不在白名单内
    #[serde(rename = "unsupported type")]
    UnsupportedType,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TooLarge => write!(f, "too large"),
            RejectReason::UnsupportedType => write!(f, "unsupported type"),
        }
    }
}

/// 被拒绝的文件（保留原始载荷供调用方提示）
#[derive(Debug, Clone)]
pub struct RejectedFile {
    pub payload: FilePayload,
    pub reason: RejectReason,
}

/// 校验结果：接受与拒绝两个集合不相交，合并后等于输入批次
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub accepted: Vec<UploadEntry>,
    pub rejected: Vec<RejectedFile>,
}

/// 文件校验器
#[derive(Debug, Clone)]
pub struct Validator {
    max_file_size: u64,
    accepted_types: Vec<String>,
    previews: PreviewStore,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            accepted_types: ACCEPTED_FILE_TYPES.iter().map(|s| s.to_string()).collect(),
            previews: PreviewStore::new(),
        }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从上传配置创建校验器
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            accepted_types: config.accepted_types.clone(),
            previews: PreviewStore::new(),
        }
    }

    /// 校验一批候选文件
    ///
    /// 图片类型额外派生本地预览句柄，句柄归条目所有
    pub fn check_batch(&self, batch: Vec<FilePayload>) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();

        for payload in batch {
            if payload.size > self.max_file_size {
                outcome.rejected.push(RejectedFile {
                    payload,
                    reason: RejectReason::TooLarge,
                });
                continue;
            }
            if !self.accepted_types.iter().any(|t| t == &payload.mime) {
                outcome.rejected.push(RejectedFile {
                    payload,
                    reason: RejectReason::UnsupportedType,
                });
                continue;
            }

            let entry = if payload.is_image() {
                let handle = self.previews.register(&payload);
                UploadEntry::with_preview(payload, handle)
            } else {
                UploadEntry::new(payload)
            };
            outcome.accepted.push(entry);
        }

        outcome
    }

    /// 预览注册表（供展示层读取预览数据）
    pub fn preview_store(&self) -> &PreviewStore {
        &self.previews
    }
}
