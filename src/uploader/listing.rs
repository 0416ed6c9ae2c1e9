// 已上传文件列表客户端
//
// 消费服务端的分页列表接口；分页视图持有当前页状态，
// 拉取失败时保留上一次成功的数据（陈旧但一致）。

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::persistence::FileListPage;

/// 默认每页条数
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// 列表获取错误
#[derive(Debug, Clone, Error)]
pub enum ListingError {
    #[error("网络请求失败: {0}")]
    Network(String),
    #[error("服务端返回错误状态: HTTP {0}")]
    Status(u16),
    #[error("响应解析失败: {0}")]
    MalformedResponse(String),
}

/// 列表数据源
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// 拉取一页记录
    async fn list_page(&self, page: u32, limit: u32) -> Result<FileListPage, ListingError>;
}

/// 基于 reqwest 的列表客户端
#[derive(Debug, Clone)]
pub struct FileListClient {
    client: reqwest::Client,
    files_url: String,
}

impl FileListClient {
    /// # 参数
    /// * `files_url` - 列表接口地址，如 `http://host/api/files`
    pub fn new(files_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            files_url: files_url.into(),
        }
    }
}

#[async_trait]
impl ListingSource for FileListClient {
    async fn list_page(&self, page: u32, limit: u32) -> Result<FileListPage, ListingError> {
        let url = format!("{}?page={}&limit={}", self.files_url, page, limit);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ListingError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListingError::Status(status.as_u16()));
        }

        response
            .json::<FileListPage>()
            .await
            .map_err(|e| ListingError::MalformedResponse(e.to_string()))
    }
}

/// 分页视图
///
/// 页码从 1 开始；翻页与上传成功后由调用方触发 refresh
pub struct PagedView<S: ListingSource> {
    source: S,
    page_size: u32,
    page: u32,
    current: Option<FileListPage>,
}

impl<S: ListingSource> PagedView<S> {
    pub fn new(source: S, page_size: u32) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            page: 1,
            current: None,
        }
    }

    /// 重新拉取当前页
    ///
    /// 失败时仅记录日志，保留已展示的数据
    pub async fn refresh(&mut self) {
        match self.source.list_page(self.page, self.page_size).await {
            Ok(page) => {
                self.page = page.page.max(1);
                self.current = Some(page);
            }
            Err(e) => {
                warn!("获取文件列表失败，保留当前页: {}", e);
            }
        }
    }

    /// 翻到下一页（到尾页时无操作）
    pub async fn next_page(&mut self) {
        let total_pages = self.total_pages();
        if self.page < total_pages {
            self.page += 1;
            self.refresh().await;
        }
    }

    /// 翻到上一页（首页时无操作）
    pub async fn prev_page(&mut self) {
        if self.page > 1 {
            self.page -= 1;
            self.refresh().await;
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.current.as_ref().map(|p| p.total_pages).unwrap_or(0)
    }

    /// 当前展示的数据（从未成功拉取时为 None）
    pub fn current(&self) -> Option<&FileListPage> {
        self.current.as_ref()
    }
}
