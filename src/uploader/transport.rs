// 单文件上传传输
//
// 包装一次到远端上传接口的 multipart 提交。
// 传输内部不做重试，重试由队列管理器在调用方显式触发时执行。

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::uploader::entry::FilePayload;

/// 上传成功的回执
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    /// 资源地址
    pub url: String,
    /// 对象存储键
    pub key: String,
}

/// 传输错误
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    /// 请求构建失败（非法 MIME 等）
    #[error("构建上传请求失败: {0}")]
    Request(String),
    /// 网络层错误
    #[error("网络请求失败: {0}")]
    Network(String),
    /// 服务端返回非 2xx
    #[error("服务端拒绝 (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    /// 2xx 但响应体不可解析或缺少字段
    #[error("响应解析失败: {0}")]
    MalformedResponse(String),
}

/// 上传传输接口
///
/// 队列管理器只依赖该接口，测试用受控实现替换真实 HTTP
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// 执行单次上传
    async fn upload(&self, payload: &FilePayload) -> Result<UploadReceipt, TransferError>;
}

/// 上传接口响应体
///
/// 成功: {"success": true, "url": "...", "key": "..."}
/// 失败: {"error": "..."}
#[derive(Debug, Deserialize)]
struct UploadResponseBody {
    #[serde(default)]
    success: bool,
    url: Option<String>,
    key: Option<String>,
    error: Option<String>,
}

/// 基于 reqwest 的 HTTP 上传实现
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    upload_url: String,
}

impl HttpTransport {
    /// 创建 HTTP 传输
    ///
    /// # 参数
    /// * `upload_url` - 上传接口地址，如 `http://host/api/upload`
    pub fn new(upload_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: upload_url.into(),
        }
    }

    /// 复用既有客户端（连接池共享）
    pub fn with_client(client: reqwest::Client, upload_url: impl Into<String>) -> Self {
        Self {
            client,
            upload_url: upload_url.into(),
        }
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn upload(&self, payload: &FilePayload) -> Result<UploadReceipt, TransferError> {
        let part = multipart::Part::bytes(payload.bytes.as_ref().clone())
            .file_name(payload.name.clone())
            .mime_str(&payload.mime)
            .map_err(|e| TransferError::Request(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        debug!(
            "上传响应: name={}, status={}, body_len={}",
            payload.name,
            status,
            body.len()
        );

        decode_response(status.as_u16(), &body)
    }
}

/// 解析上传接口响应
fn decode_response(status: u16, body: &str) -> Result<UploadReceipt, TransferError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<UploadResponseBody>(body)
            .ok()
            .and_then(|r| r.error)
            .unwrap_or_else(|| "Upload failed".to_string());
        return Err(TransferError::Rejected { status, message });
    }

    let parsed: UploadResponseBody = serde_json::from_str(body)
        .map_err(|e| TransferError::MalformedResponse(format!("status={}: {}", status, e)))?;

    if !parsed.success {
        return Err(TransferError::MalformedResponse(
            "响应缺少 success 标记".to_string(),
        ));
    }
    match (parsed.url, parsed.key) {
        (Some(url), Some(key)) => Ok(UploadReceipt { url, key }),
        _ => Err(TransferError::MalformedResponse(
            "响应缺少 url/key 字段".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_success() {
        let receipt = decode_response(
            200,
            r#"{"success": true, "url": "http://h/storage/uploads/1-a.png", "key": "uploads/1-a.png"}"#,
        )
        .unwrap();
        assert_eq!(receipt.key, "uploads/1-a.png");
        assert_eq!(receipt.url, "http://h/storage/uploads/1-a.png");
    }

    #[test]
    fn test_decode_error_body() {
        let err = decode_response(400, r#"{"error": "No file provided"}"#).unwrap_err();
        match err {
            TransferError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "No file provided");
            }
            other => panic!("意外的错误类型: {:?}", other),
        }
    }

    #[test]
    fn test_decode_non_json_error_body() {
        let err = decode_response(502, "Bad Gateway").unwrap_err();
        match err {
            TransferError::Rejected { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Upload failed");
            }
            other => panic!("意外的错误类型: {:?}", other),
        }
    }

    #[test]
    fn test_decode_malformed_success_body() {
        assert!(matches!(
            decode_response(200, "not json"),
            Err(TransferError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_response(200, r#"{"success": true}"#),
            Err(TransferError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_response(200, r#"{"success": false, "url": "u", "key": "k"}"#),
            Err(TransferError::MalformedResponse(_))
        ));
    }
}
