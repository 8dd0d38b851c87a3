use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::errors::TaskError;
use super::ids::{TaskId, TaskName};
use crate::codec::ensure_finite;
use crate::ports::{IdGenerator, UuidGenerator};

/// 1 回分のタスク呼び出し。
///
/// - `id` は生成時に一度だけ採番され、以後変更できない（setter なし）
/// - `eta` / `expires` は常に UTC で保持する。未設定は `None` で、epoch などの番兵値は使わない
/// - `retries` は情報としてのみ運ぶ（core にリトライロジックはない）
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    name: TaskName,
    id: TaskId,
    args: Vec<String>,
    kwargs: Map<String, Value>,
    retries: u32,
    eta: Option<DateTime<Utc>>,
    expires: Option<DateTime<Utc>>,
}

impl Task {
    /// 新しい id を `UuidGenerator` から採番して Task を作る
    pub fn new(
        name: impl Into<TaskName>,
        args: Vec<String>,
        kwargs: Map<String, Value>,
    ) -> Result<Self, TaskError> {
        Self::new_with(&UuidGenerator, name, args, kwargs)
    }

    /// 注入された IdGenerator で採番する
    pub fn new_with(
        id_gen: &dyn IdGenerator,
        name: impl Into<TaskName>,
        args: Vec<String>,
        kwargs: Map<String, Value>,
    ) -> Result<Self, TaskError> {
        let id = id_gen.generate_task_id()?;
        Ok(Self::from_parts(name.into(), id, args, kwargs, 0, None, None))
    }

    /// decode 側の再構築用
    pub(crate) fn from_parts(
        name: TaskName,
        id: TaskId,
        args: Vec<String>,
        kwargs: Map<String, Value>,
        retries: u32,
        eta: Option<DateTime<Utc>>,
        expires: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            name,
            id,
            args,
            kwargs,
            retries,
            eta,
            expires,
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// kwargs に 1 件追加する。JSON にできない値（NaN / Inf を含む）なら `TaskError::Encoding`。
    pub fn with_kwarg<V: Serialize>(
        mut self,
        key: impl Into<String>,
        value: V,
    ) -> Result<Self, TaskError> {
        ensure_finite(&value).map_err(TaskError::Encoding)?;
        let value = serde_json::to_value(value).map_err(TaskError::Encoding)?;
        self.kwargs.insert(key.into(), value);
        Ok(self)
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// どのタイムゾーンで渡されても UTC に変換して保持する
    pub fn with_eta<Tz: TimeZone>(mut self, eta: DateTime<Tz>) -> Self {
        self.eta = Some(eta.with_timezone(&Utc));
        self
    }

    pub fn with_expires<Tz: TimeZone>(mut self, expires: DateTime<Tz>) -> Self {
        self.expires = Some(expires.with_timezone(&Utc));
        self
    }

    pub fn name(&self) -> &TaskName {
        &self.name
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.kwargs
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn eta(&self) -> Option<DateTime<Utc>> {
        self.eta
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    /// ETA がない、または ETA を過ぎていれば実行してよい
    pub fn is_due_at(&self, now: DateTime<Utc>) -> bool {
        self.eta.is_none_or(|eta| eta <= now)
    }

    /// Expires を過ぎたタスクは無効
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires < now)
    }
}
