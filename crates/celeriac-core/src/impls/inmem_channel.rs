//! InMemoryChannel - 開発用・テスト用の broker channel
//!
//! 実 broker なしで publish / consume の契約を検証するための AMQP 風スタブです。
//!
//! # 振る舞い
//! - default exchange（""）は routing key と同名の queue へ直接配送
//! - それ以外は `queue_bind` された (exchange, routing_key) に一致する queue へ配送
//! - どこにも届かないメッセージは捨てる（mandatory = false 相当）
//! - delivery tag は channel ごとに 1 から採番
//! - 同じ queue に複数 consumer がいればラウンドロビン
//! - `close()` 後の操作はすべて `BrokerError::ChannelClosed`
//!
//! 呼び出しはすべて記録され、テストから `publications()` / `acks()` などで参照できます。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::ports::{BrokerChannel, BrokerError, Delivery, Publishing, StreamOptions};

/// 記録された publish 呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPublish {
    pub exchange: String,
    pub routing_key: String,
    pub message: Publishing,
}

/// 記録された queue_bind 呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBind {
    pub queue: String,
    pub routing_key: String,
    pub exchange: String,
}

/// 記録された open_delivery_stream 呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStreamOpen {
    pub queue: String,
    pub options: StreamOptions,
}

/// consumer に渡る前のメッセージ
#[derive(Debug, Clone)]
struct Pending {
    body: Vec<u8>,
    redelivered: bool,
}

#[derive(Debug, Default)]
struct QueueSlot {
    ready: VecDeque<Pending>,
    consumers: Vec<mpsc::UnboundedSender<Delivery>>,
    next_consumer: usize,
}

#[derive(Debug, Default)]
struct ChannelState {
    closed: bool,
    next_tag: u64,
    queues: HashMap<String, QueueSlot>,
    bindings: Vec<RecordedBind>,
    /// delivery_tag -> (queue, message)
    unacked: HashMap<u64, (String, Pending)>,

    publications: Vec<RecordedPublish>,
    bind_calls: Vec<RecordedBind>,
    stream_opens: Vec<RecordedStreamOpen>,
    acks: Vec<u64>,
    rejects: Vec<(u64, bool)>,

    fail_next_bind: Option<BrokerError>,
    fail_next_stream_open: Option<BrokerError>,
    fail_next_publish: Option<BrokerError>,
}

impl ChannelState {
    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed {
            Err(BrokerError::ChannelClosed)
        } else {
            Ok(())
        }
    }

    fn route(&self, exchange: &str, routing_key: &str) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        if exchange.is_empty() && self.queues.contains_key(routing_key) {
            targets.push(routing_key.to_string());
        }
        for binding in &self.bindings {
            if binding.exchange == exchange
                && binding.routing_key == routing_key
                && !targets.contains(&binding.queue)
            {
                targets.push(binding.queue.clone());
            }
        }
        targets
    }

    /// queue にメッセージを積み、consumer がいれば渡す
    fn enqueue(&mut self, queue: &str, message: Pending) {
        let Some(slot) = self.queues.get_mut(queue) else {
            return;
        };
        slot.ready.push_back(message);
        Self::drain(slot, queue, &mut self.next_tag, &mut self.unacked);
    }

    fn drain(
        slot: &mut QueueSlot,
        queue: &str,
        next_tag: &mut u64,
        unacked: &mut HashMap<u64, (String, Pending)>,
    ) {
        while let Some(message) = slot.ready.pop_front() {
            let mut handed_off = false;
            while !slot.consumers.is_empty() {
                let idx = slot.next_consumer % slot.consumers.len();
                let tag = *next_tag + 1;
                let delivery = Delivery {
                    delivery_tag: tag,
                    redelivered: message.redelivered,
                    body: message.body.clone(),
                };
                if slot.consumers[idx].send(delivery).is_ok() {
                    *next_tag = tag;
                    unacked.insert(tag, (queue.to_string(), message.clone()));
                    slot.next_consumer = idx + 1;
                    handed_off = true;
                    break;
                }
                // 受信側が drop された consumer は外す
                slot.consumers.remove(idx);
            }
            if !handed_off {
                slot.ready.push_front(message);
                return;
            }
        }
    }
}

/// 開発用の in-memory broker channel
///
/// `Clone` は同じ channel へのハンドルを複製する（状態は共有）。
#[derive(Debug, Clone, Default)]
pub struct InMemoryChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// queue を作る（既にあれば何もしない）
    pub async fn declare_queue(&self, queue: &str) {
        let mut state = self.state.lock().await;
        state.queues.entry(queue.to_string()).or_default();
    }

    /// 次の queue_bind を失敗させる
    pub async fn fail_bind(&self, err: BrokerError) {
        self.state.lock().await.fail_next_bind = Some(err);
    }

    /// 次の open_delivery_stream を失敗させる
    pub async fn fail_stream_open(&self, err: BrokerError) {
        self.state.lock().await.fail_next_stream_open = Some(err);
    }

    /// 次の publish を失敗させる
    pub async fn fail_publish(&self, err: BrokerError) {
        self.state.lock().await.fail_next_publish = Some(err);
    }

    /// queue の consumer をすべて外す（broker 側からの consumer cancel 相当）。
    /// channel 自体は開いたままなので、受信済み delivery の ack は引き続きできる。
    pub async fn cancel_consumers(&self, queue: &str) {
        let mut state = self.state.lock().await;
        if let Some(slot) = state.queues.get_mut(queue) {
            slot.consumers.clear();
        }
    }

    /// channel を閉じる。未 ack の delivery は redelivered として queue に戻る。
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;

        let mut unacked: Vec<_> = state.unacked.drain().collect();
        unacked.sort_by_key(|(tag, _)| *tag);
        for (_, (queue, mut message)) in unacked.into_iter().rev() {
            message.redelivered = true;
            if let Some(slot) = state.queues.get_mut(&queue) {
                slot.ready.push_front(message);
            }
        }
        for slot in state.queues.values_mut() {
            slot.consumers.clear();
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// consumer に渡されていないメッセージ数
    pub async fn ready_count(&self, queue: &str) -> usize {
        let state = self.state.lock().await;
        state.queues.get(queue).map_or(0, |slot| slot.ready.len())
    }

    pub async fn publications(&self) -> Vec<RecordedPublish> {
        self.state.lock().await.publications.clone()
    }

    pub async fn bind_calls(&self) -> Vec<RecordedBind> {
        self.state.lock().await.bind_calls.clone()
    }

    pub async fn stream_open_calls(&self) -> Vec<RecordedStreamOpen> {
        self.state.lock().await.stream_opens.clone()
    }

    pub async fn acks(&self) -> Vec<u64> {
        self.state.lock().await.acks.clone()
    }

    /// (delivery_tag, requeue)
    pub async fn rejects(&self) -> Vec<(u64, bool)> {
        self.state.lock().await.rejects.clone()
    }
}

#[async_trait]
impl BrokerChannel for InMemoryChannel {
    type Deliveries = mpsc::UnboundedReceiver<Delivery>;

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: Publishing,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        if let Some(err) = state.fail_next_publish.take() {
            return Err(err);
        }

        let targets = state.route(exchange, routing_key);
        if targets.is_empty() {
            debug!(exchange, routing_key, "message is unroutable, dropping");
        }
        for queue in &targets {
            state.enqueue(
                queue,
                Pending {
                    body: message.body.clone(),
                    redelivered: false,
                },
            );
        }

        state.publications.push(RecordedPublish {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            message,
        });
        Ok(())
    }

    async fn queue_bind(
        &self,
        queue: &str,
        routing_key: &str,
        exchange: &str,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;

        let binding = RecordedBind {
            queue: queue.to_string(),
            routing_key: routing_key.to_string(),
            exchange: exchange.to_string(),
        };
        state.bind_calls.push(binding.clone());
        if let Some(err) = state.fail_next_bind.take() {
            return Err(err);
        }

        state.queues.entry(queue.to_string()).or_default();
        if !state.bindings.contains(&binding) {
            state.bindings.push(binding);
        }
        Ok(())
    }

    async fn open_delivery_stream(
        &self,
        queue: &str,
        options: StreamOptions,
    ) -> Result<Self::Deliveries, BrokerError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;

        state.stream_opens.push(RecordedStreamOpen {
            queue: queue.to_string(),
            options,
        });
        if let Some(err) = state.fail_next_stream_open.take() {
            return Err(err);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let ChannelState {
            queues,
            next_tag,
            unacked,
            ..
        } = &mut *state;
        let slot = queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::NotFound(format!("no queue '{queue}'")))?;
        slot.consumers.push(tx);
        ChannelState::drain(slot, queue, next_tag, unacked);

        Ok(rx)
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;

        if state.unacked.remove(&delivery_tag).is_none() {
            return Err(BrokerError::OperationFailed(format!(
                "unknown delivery tag {delivery_tag}"
            )));
        }
        state.acks.push(delivery_tag);
        Ok(())
    }

    async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;

        let Some((queue, mut message)) = state.unacked.remove(&delivery_tag) else {
            return Err(BrokerError::OperationFailed(format!(
                "unknown delivery tag {delivery_tag}"
            )));
        };
        state.rejects.push((delivery_tag, requeue));
        if requeue {
            message.redelivered = true;
            state.enqueue(&queue, message);
        }
        Ok(())
    }
}
