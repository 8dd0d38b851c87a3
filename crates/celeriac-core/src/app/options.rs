//! publish / consume の設定
//!
//! ファイルや環境変数は読まない。埋め込む側のアプリが自前の設定から
//! deserialize できるように serde だけ derive しておく。

use serde::{Deserialize, Serialize};

/// Celery producer の既定値（exchange = "", routing_key = "celery"）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishOptions {
    pub exchange: String,
    pub routing_key: String,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            exchange: String::new(),
            routing_key: "celery".to_string(),
        }
    }
}

/// 解析できなかった delivery の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailurePolicy {
    /// ログに残して ack、出力には流さない
    #[default]
    AckAndSkip,
    /// ログに残して reject（requeue = false）。dead-letter 設定があればそちらへ。
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumeOptions {
    pub queue: String,
    pub exchange: String,
    pub routing_key: String,
    /// 空文字なら broker が採番する
    pub consumer_tag: String,
    pub on_decode_failure: DecodeFailurePolicy,
}

impl ConsumeOptions {
    pub fn new(
        queue: impl Into<String>,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            queue: queue.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            ..Self::default()
        }
    }

    pub fn with_consumer_tag(mut self, tag: impl Into<String>) -> Self {
        self.consumer_tag = tag.into();
        self
    }

    pub fn on_decode_failure(mut self, policy: DecodeFailurePolicy) -> Self {
        self.on_decode_failure = policy;
        self
    }
}

impl Default for ConsumeOptions {
    fn default() -> Self {
        Self {
            queue: "celery".to_string(),
            exchange: "celery".to_string(),
            routing_key: "celery".to_string(),
            consumer_tag: String::new(),
            on_decode_failure: DecodeFailurePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_defaults_match_celery() {
        let opts = PublishOptions::default();
        assert_eq!(opts.exchange, "");
        assert_eq!(opts.routing_key, "celery");
    }

    #[test]
    fn consume_options_load_from_partial_config() {
        let opts: ConsumeOptions = serde_json::from_str(
            r#"{"queue": "emails", "on_decode_failure": "reject"}"#,
        )
        .unwrap();

        assert_eq!(opts.queue, "emails");
        assert_eq!(opts.exchange, "celery");
        assert_eq!(opts.routing_key, "celery");
        assert_eq!(opts.on_decode_failure, DecodeFailurePolicy::Reject);
    }

    #[test]
    fn builder_overrides() {
        let opts = ConsumeOptions::new("q", "ex", "rk")
            .with_consumer_tag("ctag-1")
            .on_decode_failure(DecodeFailurePolicy::Reject);

        assert_eq!(opts.queue, "q");
        assert_eq!(opts.exchange, "ex");
        assert_eq!(opts.routing_key, "rk");
        assert_eq!(opts.consumer_tag, "ctag-1");
        assert_eq!(opts.on_decode_failure, DecodeFailurePolicy::Reject);
    }
}
