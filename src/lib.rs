// Filebox Rust Library
// 文件上传服务核心库

// 配置管理模块
pub mod config;

// 日志系统模块
pub mod logging;

// 元数据持久化模块
pub mod persistence;

// Web服务器模块
pub mod server;

// 对象存储模块
pub mod storage;

// 上传队列模块
pub mod uploader;

// 导出常用类型
pub use config::AppConfig;
pub use persistence::{FileListPage, FileMetaStore, FileRecord};
pub use server::AppState;
pub use storage::{LocalObjectStorage, ObjectStorage};
pub use uploader::{
    EntrySnapshot, EntryStatus, FileListClient, FilePayload, HttpTransport, PagedView,
    RejectReason, TransferError, UploadEntry, UploadEvent, UploadQueue, UploadReceipt,
    UploadTransport, Validator,
};
