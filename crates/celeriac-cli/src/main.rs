use std::sync::Arc;

use celeriac_core::impls::InMemoryChannel;
use celeriac_core::ports::{Clock, SystemClock};
use celeriac_core::{ConsumeOptions, PublishOptions, Publisher, Task, consume};
use chrono::Duration;
use serde_json::Map;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// consumer 側：受け取った Task を表示するだけ（実行はしない）
async fn print_loop(mut rx: mpsc::Receiver<Task>, expected: usize, clock: SystemClock) {
    for _ in 0..expected {
        let Some(task) = rx.recv().await else {
            break;
        };
        let now = clock.now();
        tracing::info!(
            task = %task.name(),
            id = %task.id(),
            args = ?task.args(),
            kwargs = %serde_json::Value::Object(task.kwargs().clone()),
            retries = task.retries(),
            due = task.is_due_at(now),
            expired = task.is_expired_at(now),
            "received"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // (A) channel を用意（本番ではここが RabbitMQ などへの接続になる）
    let channel = Arc::new(InMemoryChannel::new());
    let publish_opts = PublishOptions::default();
    let consume_opts = ConsumeOptions::new("celery", "celery", &publish_opts.routing_key);

    // (B) consumer を起動（bind が終わってから publish したいので先に待つ）
    let queue = consume_opts.queue.clone();
    let (tx, rx) = mpsc::channel(16);
    let consumer = tokio::spawn({
        let channel = Arc::clone(&channel);
        async move { consume(channel.as_ref(), &consume_opts, tx).await }
    });
    while channel.stream_open_calls().await.is_empty() {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    // (C) タスク投入（default exchange → queue "celery"）
    let clock = SystemClock;
    let publisher = Publisher::new();
    let tasks = vec![
        Task::new("tasks.add", vec!["2".into(), "3".into()], Map::new())?,
        Task::new("tasks.send_email", vec![], Map::new())?
            .with_kwarg("to", "someone@example.com")?
            .with_kwarg("attachments", 2)?,
        Task::new("tasks.cleanup", vec![], Map::new())?
            .with_retries(1)
            .with_eta(clock.now() + Duration::minutes(5))
            .with_expires(clock.now() + Duration::hours(1)),
    ];
    let expected = tasks.len();
    for task in &tasks {
        publisher.publish_with(channel.as_ref(), &publish_opts, task).await?;
        tracing::info!(id = %task.id(), task = %task.name(), "published");
    }

    // (D) 受け取った Task を表示
    print_loop(rx, expected, clock).await;

    // (E) broker 側から stream を閉じて consumer を終わらせる
    channel.cancel_consumers(&queue).await;
    consumer.await??;
    tracing::info!(acks = channel.acks().await.len(), "done");

    Ok(())
}
