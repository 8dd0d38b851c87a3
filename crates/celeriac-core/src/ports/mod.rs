//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部の能力（broker channel, 乱数源, 時計）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod broker_channel;
pub mod clock;
pub mod id_generator;

// 主要な trait を再エクスポート
pub use self::broker_channel::{
    BrokerChannel, BrokerError, Delivery, DeliveryMode, DeliveryStream, MessageProperties,
    Publishing, StreamOptions,
};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, SequentialIdGenerator, UuidGenerator};
