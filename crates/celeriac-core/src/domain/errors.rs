//! Errors - エラー型と分類
//!
//! すべてのエラーは直接の呼び出し側へ返す。core 内でのリトライや黙った回復はしない。
//!
//! # 分類
//! - IdGeneration: 乱数源の失敗（その publish は中止）
//! - Encoding: Task を JSON にできない（何も送らない）
//! - MalformedMessage: body が JSON として不正
//! - TimeFormat: `eta` / `expires` が正規形式でない
//! - Broker: channel 由来のエラー（そのまま透過）
//! - OutputClosed: consume の出力先が閉じられた

use thiserror::Error;

use crate::ports::BrokerError;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to generate task id: {0}")]
    IdGeneration(String),

    #[error("failed to encode task: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("malformed task message: {0}")]
    MalformedMessage(#[source] serde_json::Error),

    #[error("invalid time format for `{field}`: {value:?} (expected YYYY-MM-DDTHH:MM:SS.ffffff)")]
    TimeFormat { field: &'static str, value: String },

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("task output was closed by the receiver")]
    OutputClosed,
}

impl TaskError {
    /// broker 由来のエラーなら取り出す
    pub fn as_broker(&self) -> Option<&BrokerError> {
        match self {
            TaskError::Broker(e) => Some(e),
            _ => None,
        }
    }
}
