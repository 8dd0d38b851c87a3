//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて publish / consume を実装します。
//!
//! # 主要コンポーネント
//! - **Publisher**: Task を encode して broker に送る
//! - **consume**: bind → stream → decode → emit → ack のループ
//! - **TaskSink**: consume の出力先（tokio mpsc）
//! - **options**: PublishOptions / ConsumeOptions / DecodeFailurePolicy

pub mod consumer;
pub mod options;
pub mod publisher;
pub mod sink;

// 主要な型を再エクスポート
pub use self::consumer::consume;
pub use self::options::{ConsumeOptions, DecodeFailurePolicy, PublishOptions};
pub use self::publisher::{CONTENT_ENCODING, CONTENT_TYPE, Publisher, publish};
pub use self::sink::TaskSink;
