// 本地预览存储
//
// 图片条目在校验通过时派生一个进程内预览句柄（无网络调用）。
// 句柄生命周期归条目所有：条目被移除时释放，重复释放与泄漏都要防住。

use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tracing::warn;
use uuid::Uuid;

use crate::uploader::entry::FilePayload;

/// 预览数据注册表
///
/// 预览字节与载荷共享同一块 Arc，注册不复制文件内容
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    inner: Arc<DashMap<Uuid, Arc<Vec<u8>>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为载荷注册预览，返回持有释放责任的句柄
    pub fn register(&self, payload: &FilePayload) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.inner.insert(id, Arc::clone(&payload.bytes));
        PreviewHandle {
            id,
            store: Arc::downgrade(&self.inner),
            released: false,
        }
    }

    /// 读取预览数据
    pub fn get(&self, id: Uuid) -> Option<Arc<Vec<u8>>> {
        self.inner.get(&id).map(|v| Arc::clone(&v))
    }

    /// 当前注册的预览数量
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// 预览句柄
///
/// 释放是幂等的：第二次 release 仅记录告警，不会破坏其他句柄的数据。
/// Drop 时兜底释放，防止泄漏。
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    store: Weak<DashMap<Uuid, Arc<Vec<u8>>>>,
    released: bool,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// 释放预览数据
    pub fn release(&mut self) {
        if self.released {
            warn!("预览句柄重复释放: id={}", self.id);
            return;
        }
        if let Some(store) = self.store.upgrade() {
            store.remove(&self.id);
        }
        self.released = true;
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if !self.released {
            if let Some(store) = self.store.upgrade() {
                store.remove(&self.id);
            }
            self.released = true;
        }
    }
}
