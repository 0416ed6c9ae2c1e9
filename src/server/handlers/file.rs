// 文件API处理器

use crate::persistence::{FileListPage, FileRecord};
use crate::server::AppState;
use crate::storage::{object_key, ObjectStorage};
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

/// 上传成功响应
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub key: String,
}

/// 文件列表查询参数
#[derive(Debug, Deserialize)]
pub struct FileListQuery {
    /// 页码（从 1 开始）
    #[serde(default = "default_page")]
    pub page: u32,
    /// 每页数量
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// 上传文件
///
/// POST /api/upload（multipart 表单，字段名为 file）
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, Json<Value>)> {
    // 从 multipart 表单中取出 file 字段
    let mut file_part = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("file") {
                    let name = field
                        .file_name()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "unnamed".to_string());
                    let mime = field
                        .content_type()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "application/octet-stream".to_string());
                    match field.bytes().await {
                        Ok(bytes) => {
                            file_part = Some((name, mime, bytes));
                            break;
                        }
                        Err(e) => {
                            error!("读取上传内容失败: {}", e);
                            return Err((
                                StatusCode::INTERNAL_SERVER_ERROR,
                                Json(json!({ "error": "Upload failed" })),
                            ));
                        }
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("解析 multipart 表单失败: {}", e);
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "No file provided" })),
                ));
            }
        }
    }

    let (name, mime, bytes) = match file_part {
        Some(part) => part,
        None => {
            warn!("上传请求缺少 file 字段");
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "No file provided" })),
            ));
        }
    };

    let size = bytes.len() as u64;
    info!("API: 上传文件 name={}, size={}, type={}", name, size, mime);

    // 写入对象存储
    let key = object_key(&name);
    let url = match state.storage.put(&key, &bytes, &mime).await {
        Ok(url) => url,
        Err(e) => {
            error!("写入对象存储失败: {}", e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Upload failed" })),
            ));
        }
    };

    // 记录文件元数据
    let record = FileRecord::new(name, url.clone(), size, mime);
    if let Err(e) = state.file_store.insert(&record) {
        error!("保存文件记录失败: {}", e);
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Upload failed" })),
        ));
    }

    info!("文件上传成功: key={}", key);
    Ok(Json(UploadResponse {
        success: true,
        url,
        key,
    }))
}

/// 获取文件列表（按上传时间倒序分页）
///
/// GET /api/files?page=1&limit=10
pub async fn list_files(
    State(state): State<AppState>,
    Query(params): Query<FileListQuery>,
) -> Result<Json<FileListPage>, (StatusCode, Json<Value>)> {
    info!("API: 获取文件列表 page={}, limit={}", params.page, params.limit);

    match state.file_store.list_page(params.page, params.limit) {
        Ok(page) => Ok(Json(page)),
        Err(e) => {
            error!("查询文件列表失败: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch files" })),
            ))
        }
    }
}
