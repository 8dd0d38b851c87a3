//! Consumer - broker の delivery stream を Task の stream に変換する
//!
//! # 状態遷移
//! `Unbound → Bound → Streaming → Closed`
//! - Unbound → Bound: `queue_bind` を 1 回だけ。失敗したらそのエラーで終了（stream は開かない）
//! - Bound → Streaming: `open_delivery_stream`（manual ack, non-exclusive）。失敗したら終了
//! - Streaming: receive → decode → emit → ack を到着順に繰り返す
//! - Closed: broker 側が stream を閉じたら `Ok(())`
//!
//! # Backpressure
//! delivery 待ちと output（bounded の場合）への emit の 2 箇所で止まる。
//! 遅い受け手は ack を遅らせる。
//!
//! # キャンセル
//! 専用の仕組みはない。途中で止めたい場合は外から channel / connection を閉じる。

use tracing::{debug, error, info, warn};

use crate::codec;
use crate::domain::TaskError;
use crate::ports::{BrokerChannel, Delivery, DeliveryStream, StreamOptions};

use super::options::{ConsumeOptions, DecodeFailurePolicy};
use super::sink::TaskSink;

/// queue を bind して delivery を decode し、`output` へ順番に流す
///
/// - decode できた Task は emit してから、その delivery 1 件だけを ack する
/// - decode できない delivery は `options.on_decode_failure` に従って ack か reject。出力には流さない
/// - `output` が閉じていたら、その delivery は ack せずに `TaskError::OutputClosed` で終了
/// - ack / reject の失敗は `TaskError::Broker` で終了
pub async fn consume<C, S>(
    channel: &C,
    options: &ConsumeOptions,
    mut output: S,
) -> Result<(), TaskError>
where
    C: BrokerChannel,
    S: TaskSink,
{
    let queue = options.queue.as_str();

    debug!(
        queue,
        exchange = %options.exchange,
        routing_key = %options.routing_key,
        "binding queue"
    );
    if let Err(e) = channel
        .queue_bind(queue, &options.routing_key, &options.exchange)
        .await
    {
        error!(queue, error = %e, "queue bind failed");
        return Err(e.into());
    }

    let stream_options = StreamOptions {
        consumer_tag: options.consumer_tag.clone(),
        manual_ack: true,
        exclusive: false,
    };
    let mut deliveries = match channel.open_delivery_stream(queue, stream_options).await {
        Ok(deliveries) => deliveries,
        Err(e) => {
            error!(queue, error = %e, "failed to open delivery stream");
            return Err(e.into());
        }
    };

    info!(queue, "consuming");
    let mut emitted: u64 = 0;
    let mut dropped: u64 = 0;

    while let Some(delivery) = deliveries.next_delivery().await {
        if handle_delivery(channel, options, &mut output, delivery).await? {
            emitted += 1;
        } else {
            dropped += 1;
        }
    }

    info!(queue, emitted, dropped, "delivery stream closed");
    Ok(())
}

/// 1 件処理する。emit したら true、decode 失敗で捨てたら false。
async fn handle_delivery<C, S>(
    channel: &C,
    options: &ConsumeOptions,
    output: &mut S,
    delivery: Delivery,
) -> Result<bool, TaskError>
where
    C: BrokerChannel,
    S: TaskSink,
{
    let tag = delivery.delivery_tag;

    let task = match codec::decode(&delivery.body) {
        Ok(task) => task,
        Err(err) => {
            warn!(
                delivery_tag = tag,
                redelivered = delivery.redelivered,
                policy = ?options.on_decode_failure,
                error = %err,
                "dropping undecodable delivery"
            );
            match options.on_decode_failure {
                DecodeFailurePolicy::AckAndSkip => channel.ack(tag).await?,
                DecodeFailurePolicy::Reject => channel.reject(tag, false).await?,
            }
            return Ok(false);
        }
    };

    debug!(
        delivery_tag = tag,
        task_id = %task.id(),
        task = %task.name(),
        "received task"
    );

    if let Err(err) = output.emit(task).await {
        // ack しないので broker が再配送する
        warn!(delivery_tag = tag, "task output closed, leaving delivery unacked");
        return Err(err);
    }

    channel.ack(tag).await?;
    Ok(true)
}
