// 上传事件
//
// 队列管理器向调用方上报状态变化的通道。
// 未订阅时发布为无操作，订阅方断开也不影响队列运转。

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// 上传任务事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum UploadEvent {
    /// 条目入队
    Enqueued { id: Uuid, name: String, size: u64 },
    /// 开始上传
    Started { id: Uuid, name: String },
    /// 上传完成（调用方收到后应刷新已上传文件列表）
    Completed { id: Uuid, name: String, url: String },
    /// 上传失败
    Failed { id: Uuid, name: String, error: String },
    /// 手动重试
    Retried { id: Uuid, name: String },
    /// 条目被移除
    Removed { id: Uuid, name: String },
}

/// 事件发布器
#[derive(Debug, Default)]
pub struct EventPublisher {
    sender: RwLock<Option<UnboundedSender<UploadEvent>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅事件流，重复订阅会替换旧的接收端
    pub fn subscribe(&self) -> UnboundedReceiver<UploadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.write() = Some(tx);
        rx
    }

    /// 发布事件，未订阅或接收端已关闭时静默丢弃
    pub fn publish(&self, event: UploadEvent) {
        if let Some(tx) = &*self.sender.read() {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscriber_is_noop() {
        let publisher = EventPublisher::new();
        publisher.publish(UploadEvent::Started {
            id: Uuid::new_v4(),
            name: "a.png".to_string(),
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.subscribe();

        let id = Uuid::new_v4();
        publisher.publish(UploadEvent::Enqueued {
            id,
            name: "a.png".to_string(),
            size: 3,
        });

        match rx.recv().await {
            Some(UploadEvent::Enqueued { id: got, size, .. }) => {
                assert_eq!(got, id);
                assert_eq!(size, 3);
            }
            other => panic!("收到意外事件: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_after_receiver_dropped() {
        let publisher = EventPublisher::new();
        let rx = publisher.subscribe();
        drop(rx);
        // 接收端关闭后发布不应出错
        publisher.publish(UploadEvent::Removed {
            id: Uuid::new_v4(),
            name: "a.png".to_string(),
        });
    }
}
