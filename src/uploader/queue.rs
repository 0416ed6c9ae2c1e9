// 上传队列管理器
//
// 负责批量上传条目的编排：
// - FIFO 等待队列，先入队先获得槽位
// - 槽位并发控制：在途上传数始终满足 0 <= active <= max_concurrent
// - 失败重试（重新入队尾）与任意状态移除（软取消）
//
// 所有簿记在同一把锁内同步完成，不跨越挂起点；
// 槽位释放与补位在一个临界区内执行，保证"先减计数再补位"的原子性。
// 锁序固定：先 state 锁，后 entries 表，避免死锁。

use anyhow::{bail, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::uploader::entry::{EntrySnapshot, EntryStatus, FilePayload, UploadEntry};
use crate::uploader::events::{EventPublisher, UploadEvent};
use crate::uploader::transport::{TransferError, UploadReceipt, UploadTransport};
use crate::uploader::DEFAULT_MAX_CONCURRENT;

/// 队列策略
#[derive(Debug, Clone, Copy)]
pub struct QueuePolicy {
    /// 上传成功后是否在可见列表中保留条目
    /// false 沿用"成功即移出"的行为，true 保留到调用方手动移除
    pub keep_completed: bool,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            keep_completed: false,
        }
    }
}

/// 队列簿记状态（单锁独占）
struct QueueState {
    /// 等待中的条目ID（FIFO）
    queue: VecDeque<Uuid>,
    /// 在途上传数
    active: usize,
}

struct QueueInner {
    /// 可见条目集合（id -> 条目）
    entries: DashMap<Uuid, UploadEntry>,
    /// 队列与活跃计数
    state: Mutex<QueueState>,
    /// 上传传输实现
    transport: Arc<dyn UploadTransport>,
    /// 最大并发上传数
    max_concurrent: usize,
    /// 队列策略
    policy: QueuePolicy,
    /// 事件发布器
    events: EventPublisher,
    /// 关闭令牌：关闭后在途上传的完成回调不再生效
    shutdown: CancellationToken,
}

/// 上传队列
///
/// 显式实例化，无进程级单例；克隆共享同一个队列。
#[derive(Clone)]
pub struct UploadQueue {
    inner: Arc<QueueInner>,
}

impl UploadQueue {
    /// 创建队列（默认并发上限与策略）
    pub fn new(transport: Arc<dyn UploadTransport>) -> Self {
        Self::with_policy(transport, DEFAULT_MAX_CONCURRENT, QueuePolicy::default())
    }

    /// 创建队列
    ///
    /// # 参数
    /// * `transport` - 上传传输实现
    /// * `max_concurrent` - 最大并发上传数（最小为 1）
    /// * `policy` - 队列策略
    pub fn with_policy(
        transport: Arc<dyn UploadTransport>,
        max_concurrent: usize,
        policy: QueuePolicy,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        info!(
            "创建上传队列: max_concurrent={}, keep_completed={}",
            max_concurrent, policy.keep_completed
        );
        Self {
            inner: Arc::new(QueueInner {
                entries: DashMap::new(),
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    active: 0,
                }),
                transport,
                max_concurrent,
                policy,
                events: EventPublisher::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// 从上传配置创建队列
    ///
    /// 映射 `max_concurrent_tasks` 与 `keep_completed` 两项配置
    pub fn from_config(config: &UploadConfig, transport: Arc<dyn UploadTransport>) -> Self {
        Self::with_policy(
            transport,
            config.max_concurrent_tasks,
            QueuePolicy {
                keep_completed: config.keep_completed,
            },
        )
    }

    /// 订阅上传事件流
    pub fn subscribe(&self) -> UnboundedReceiver<UploadEvent> {
        self.inner.events.subscribe()
    }

    /// 条目入队（追加到队尾），不自动开始上传
    pub fn enqueue(&self, entries: Vec<UploadEntry>) {
        let mut st = self.inner.state.lock();
        for entry in entries {
            self.inner.events.publish(UploadEvent::Enqueued {
                id: entry.id,
                name: entry.payload.name.clone(),
                size: entry.payload.size,
            });
            st.queue.push_back(entry.id);
            self.inner.entries.insert(entry.id, entry);
        }
    }

    /// 推进队列：在并发上限内从队头取条目启动上传
    ///
    /// 已达上限或队列为空时是无操作，不是错误
    pub fn drain(&self) {
        let launches = {
            let mut st = self.inner.state.lock();
            self.inner.collect_launches(&mut st)
        };
        self.inner.spawn_all(launches);
    }

    /// 重试失败条目：重置为等待中并追加到队尾
    pub fn retry(&self, id: Uuid) -> Result<()> {
        {
            let mut st = self.inner.state.lock();
            let Some(mut entry) = self.inner.entries.get_mut(&id) else {
                bail!("条目不存在: {}", id);
            };
            if entry.status != EntryStatus::Error {
                bail!("仅失败状态的条目可重试: id={}, status={:?}", id, entry.status);
            }
            entry.mark_pending();
            let name = entry.payload.name.clone();
            drop(entry);
            st.queue.push_back(id);
            self.inner.events.publish(UploadEvent::Retried { id, name });
        }
        self.drain();
        Ok(())
    }

    /// 移除条目（任意状态）
    ///
    /// 等待中的条目立即出队，保证之后不会为其启动上传；
    /// 在途上传不中止，完成回调发现条目缺失后丢弃结果（软取消）。
    /// 条目持有的预览句柄随移除释放。
    pub fn remove(&self, id: Uuid) -> Option<EntrySnapshot> {
        let removed = {
            let mut st = self.inner.state.lock();
            st.queue.retain(|qid| *qid != id);
            self.inner.entries.remove(&id)
        };
        removed.map(|(_, mut entry)| {
            if let Some(preview) = entry.preview.as_mut() {
                preview.release();
            }
            let snap = entry.snapshot();
            self.inner.events.publish(UploadEvent::Removed {
                id,
                name: snap.name.clone(),
            });
            snap
        })
    }

    /// 可见条目快照，按创建先后排序
    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        let mut snaps: Vec<EntrySnapshot> = self
            .inner
            .entries
            .iter()
            .map(|e| e.value().snapshot())
            .collect();
        snaps.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        snaps
    }

    /// 读取单个条目快照
    pub fn get(&self, id: Uuid) -> Option<EntrySnapshot> {
        self.inner.entries.get(&id).map(|e| e.snapshot())
    }

    /// 当前在途上传数
    pub fn active_count(&self) -> usize {
        self.inner.state.lock().active
    }

    /// 等待队列长度
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// 可见条目数量
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// 并发上限
    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// 关闭队列：在途上传的完成回调不再生效
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}

impl QueueInner {
    /// 持锁收集可启动的条目：弹出队头、标记上传中并占用槽位
    fn collect_launches(&self, st: &mut QueueState) -> Vec<(Uuid, FilePayload)> {
        let mut launches = Vec::new();
        while st.active < self.max_concurrent {
            let Some(id) = st.queue.pop_front() else { break };
            // 条目可能在入队后被移除：跳过，不占用槽位
            let Some(mut entry) = self.entries.get_mut(&id) else {
                continue;
            };
            // 非等待状态不重复启动
            if entry.status != EntryStatus::Pending {
                continue;
            }
            entry.mark_uploading();
            st.active += 1;
            launches.push((id, entry.payload.clone()));
        }
        launches
    }

    /// 为收集到的条目启动传输任务
    fn spawn_all(self: &Arc<Self>, launches: Vec<(Uuid, FilePayload)>) {
        for (id, payload) in launches {
            self.events.publish(UploadEvent::Started {
                id,
                name: payload.name.clone(),
            });
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                let result = inner.transport.upload(&payload).await;
                inner.finish_upload(id, &payload.name, result);
            });
        }
    }

    /// 完成回调：释放槽位并在同一临界区内补位
    fn finish_upload(
        self: &Arc<Self>,
        id: Uuid,
        name: &str,
        result: Result<UploadReceipt, TransferError>,
    ) {
        if self.shutdown.is_cancelled() {
            debug!("队列已关闭，丢弃上传结果: id={}", id);
            return;
        }

        let next = {
            let mut st = self.state.lock();
            st.active = st.active.saturating_sub(1);

            match result {
                Ok(receipt) => {
                    let present = match self.entries.get_mut(&id) {
                        Some(mut entry) => {
                            entry.mark_completed(receipt.url.clone());
                            true
                        }
                        None => false,
                    };
                    if present {
                        if !self.policy.keep_completed {
                            // 成功即移出可见列表，预览句柄随条目销毁释放
                            self.entries.remove(&id);
                        }
                        self.events.publish(UploadEvent::Completed {
                            id,
                            name: name.to_string(),
                            url: receipt.url,
                        });
                    } else {
                        // 软取消：条目已被移除，不复活
                        debug!("上传完成但条目已被移除，丢弃结果: id={}", id);
                    }
                }
                Err(err) => {
                    if let Some(mut entry) = self.entries.get_mut(&id) {
                        entry.mark_failed(err.to_string());
                        self.events.publish(UploadEvent::Failed {
                            id,
                            name: name.to_string(),
                            error: err.to_string(),
                        });
                    } else {
                        debug!("上传失败但条目已被移除，丢弃结果: id={}", id);
                    }
                }
            }

            self.collect_launches(&mut st)
        };
        self.spawn_all(next);
    }
}
