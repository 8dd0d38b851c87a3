//! celeriac-core
//!
//! Celery 互換の task message を AMQP 風 broker channel 上で publish / consume するための
//! client 側 adapter です。broker / worker pool / タスク実行は持ちません。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（Task, TaskId, TaskName, TaskError）
//! - **codec**: wire format（JSON）との相互変換と時刻形式
//! - **ports**: 抽象化レイヤー（BrokerChannel, DeliveryStream, IdGenerator, Clock）
//! - **app**: publish / consume
//! - **impls**: 実装（InMemoryChannel など開発用）
//!
//! # 例
//! ```ignore
//! let task = Task::new("tasks.add", vec!["2".into(), "3".into()], Map::new())?;
//! publish(&channel, "", "celery", &task).await?;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! tokio::spawn(async move { consume(&channel, &ConsumeOptions::default(), tx).await });
//! while let Some(task) = rx.recv().await {
//!     // ...
//! }
//! ```

pub mod app;
pub mod codec;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{ConsumeOptions, DecodeFailurePolicy, PublishOptions, Publisher, TaskSink, consume, publish};
pub use domain::{Task, TaskError, TaskId, TaskName};
pub use ports::{BrokerChannel, BrokerError, Delivery, DeliveryStream, IdGenerator};
