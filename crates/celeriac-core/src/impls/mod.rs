//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryChannel**: 開発用の broker channel
//!
//! # 本番用実装
//! 実 broker（RabbitMQ など）への接続は呼び出し側が用意し、
//! `BrokerChannel` を実装して渡します。

pub mod inmem_channel;

// 主要な型を再エクスポート
pub use self::inmem_channel::{InMemoryChannel, RecordedBind, RecordedPublish, RecordedStreamOpen};
