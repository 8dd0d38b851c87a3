//! BrokerChannel port - AMQP 風 broker channel の抽象化
//!
//! 接続の確立・認証・再接続は呼び出し側の責務です。
//! core が必要とするのは既に open 済みの channel に対する 5 つの操作だけです。
//!
//! # 設計原則
//! - 狭い interface（publish / bind / open-stream / ack / reject）
//! - 実 broker なしで InMemoryChannel に対してテストできる
//! - 1 つの channel を複数スレッドから同時に publish/consume しない（同期は呼び出し側）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Broker 側の失敗。core はこれを包み直さずにそのまま呼び出し側へ返す。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("channel is closed")]
    ChannelClosed,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("broker operation failed: {0}")]
    OperationFailed(String),
}

/// AMQP delivery-mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryMode {
    Transient,
    Persistent,
}

impl DeliveryMode {
    /// AMQP 0-9-1 上の値（1 = transient, 2 = persistent）
    pub fn as_u8(self) -> u8 {
        match self {
            DeliveryMode::Transient => 1,
            DeliveryMode::Persistent => 2,
        }
    }
}

/// 送信メッセージの properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageProperties {
    pub delivery_mode: DeliveryMode,
    pub content_type: String,
    pub content_encoding: String,
    pub timestamp: DateTime<Utc>,
}

/// 送信メッセージ（properties + body）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publishing {
    pub properties: MessageProperties,
    pub body: Vec<u8>,
}

/// queue から受け取ったメッセージ 1 件。明示的な ack が必要。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub body: Vec<u8>,
}

/// delivery stream を開くときのオプション
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    /// 空文字なら broker が採番する
    pub consumer_tag: String,
    /// true なら broker は auto-ack しない
    pub manual_ack: bool,
    pub exclusive: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            consumer_tag: String::new(),
            manual_ack: true,
            exclusive: false,
        }
    }
}

/// delivery の受信側。broker が stream を閉じたら `None`。
#[async_trait]
pub trait DeliveryStream: Send {
    async fn next_delivery(&mut self) -> Option<Delivery>;
}

#[async_trait]
impl DeliveryStream for mpsc::Receiver<Delivery> {
    async fn next_delivery(&mut self) -> Option<Delivery> {
        self.recv().await
    }
}

#[async_trait]
impl DeliveryStream for mpsc::UnboundedReceiver<Delivery> {
    async fn next_delivery(&mut self) -> Option<Delivery> {
        self.recv().await
    }
}

/// 既に open 済みの broker channel
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    type Deliveries: DeliveryStream;

    /// fire-and-forget。broker の受領確認は待たない。
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: Publishing,
    ) -> Result<(), BrokerError>;

    async fn queue_bind(
        &self,
        queue: &str,
        routing_key: &str,
        exchange: &str,
    ) -> Result<(), BrokerError>;

    async fn open_delivery_stream(
        &self,
        queue: &str,
        options: StreamOptions,
    ) -> Result<Self::Deliveries, BrokerError>;

    /// 単一 delivery の ack（multiple = false）
    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError>;

    /// 単一 delivery の reject。`requeue = false` なら dead-letter 側へ。
    async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), BrokerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_mode_maps_to_amqp_values() {
        assert_eq!(DeliveryMode::Transient.as_u8(), 1);
        assert_eq!(DeliveryMode::Persistent.as_u8(), 2);
    }

    #[tokio::test]
    async fn bounded_receiver_yields_deliveries_until_sender_drops() {
        let (tx, mut rx) = mpsc::channel::<Delivery>(1);
        let delivery = Delivery {
            delivery_tag: 7,
            redelivered: true,
            body: b"{}".to_vec(),
        };

        tx.send(delivery.clone()).await.unwrap();
        drop(tx);

        assert_eq!(rx.next_delivery().await, Some(delivery));
        assert_eq!(rx.next_delivery().await, None);
    }
}
