// 上传队列模块
//
// 客户端侧的有界并发上传编排：
// - 批量校验（大小上限 + MIME 白名单）
// - FIFO 等待队列 + 槽位并发控制
// - 单文件传输任务、失败重试与软取消

pub mod entry;
pub mod events;
pub mod listing;
pub mod preview;
pub mod queue;
pub mod transport;
pub mod validator;

pub use entry::{EntrySnapshot, EntryStatus, FilePayload, UploadEntry};
pub use events::{EventPublisher, UploadEvent};
pub use listing::{FileListClient, ListingError, ListingSource, PagedView, DEFAULT_PAGE_SIZE};
pub use preview::{PreviewHandle, PreviewStore};
pub use queue::{QueuePolicy, UploadQueue};
pub use transport::{HttpTransport, TransferError, UploadReceipt, UploadTransport};
pub use validator::{
    RejectReason, RejectedFile, ValidationOutcome, Validator, ACCEPTED_FILE_TYPES, MAX_FILE_SIZE,
};

/// 默认最大并发上传数
pub const DEFAULT_MAX_CONCURRENT: usize = 2;
