//! Publisher - Task を broker message として送る
//!
//! # フロー
//! 1. codec::encode（失敗したら何も送らずに返す）
//! 2. Publishing を組み立てる（persistent, application/json, utf-8, timestamp = Clock::now()）
//! 3. BrokerChannel::publish を 1 回だけ呼ぶ（受領確認は待たない）

use tracing::debug;

use crate::codec;
use crate::domain::{Task, TaskError};
use crate::ports::{
    BrokerChannel, Clock, DeliveryMode, MessageProperties, Publishing, SystemClock,
};

use super::options::PublishOptions;

pub const CONTENT_TYPE: &str = "application/json";
pub const CONTENT_ENCODING: &str = "utf-8";

/// Publisher は送信時刻の Clock を持つ
#[derive(Debug, Clone, Default)]
pub struct Publisher<K = SystemClock> {
    clock: K,
}

impl Publisher<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<K: Clock> Publisher<K> {
    pub fn with_clock(clock: K) -> Self {
        Self { clock }
    }

    /// Task から送信メッセージを作る
    pub fn publishing(&self, task: &Task) -> Result<Publishing, TaskError> {
        let body = codec::encode(task)?;
        Ok(Publishing {
            properties: MessageProperties {
                delivery_mode: DeliveryMode::Persistent,
                content_type: CONTENT_TYPE.to_string(),
                content_encoding: CONTENT_ENCODING.to_string(),
                timestamp: self.clock.now(),
            },
            body,
        })
    }

    pub async fn publish<C: BrokerChannel>(
        &self,
        channel: &C,
        exchange: &str,
        routing_key: &str,
        task: &Task,
    ) -> Result<(), TaskError> {
        let message = self.publishing(task)?;
        debug!(
            exchange,
            routing_key,
            task_id = %task.id(),
            task = %task.name(),
            bytes = message.body.len(),
            "publishing task"
        );
        channel.publish(exchange, routing_key, message).await?;
        Ok(())
    }

    pub async fn publish_with<C: BrokerChannel>(
        &self,
        channel: &C,
        options: &PublishOptions,
        task: &Task,
    ) -> Result<(), TaskError> {
        self.publish(channel, &options.exchange, &options.routing_key, task)
            .await
    }
}

/// `SystemClock` を使う publish
pub async fn publish<C: BrokerChannel>(
    channel: &C,
    exchange: &str,
    routing_key: &str,
    task: &Task,
) -> Result<(), TaskError> {
    Publisher::new()
        .publish(channel, exchange, routing_key, task)
        .await
}
