//! IdGenerator port - タスク ID 生成の抽象化
//!
//! Celery の wire contract では `id` は UUID v4 の文字列表現です。
//! プロセス全体の乱数源を隠れたグローバルにせず、trait として注入できるようにしています。
//!
//! # 実装
//! - **UuidGenerator**: OS 乱数源からの UUID v4（本番用）
//! - **SequentialIdGenerator**: 決定的な連番（テスト用）

use std::sync::atomic::{AtomicU64, Ordering};

use rand::RngCore;
use rand::rngs::OsRng;
use uuid::Builder;

use crate::domain::errors::TaskError;
use crate::domain::ids::TaskId;

/// IdGenerator は一意なタスク ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
///
/// # 失敗
/// 乱数源が使えない場合は `TaskError::IdGeneration` を返す。
/// デフォルト値で黙って埋めてはいけない。
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> Result<TaskId, TaskError>;
}

/// UuidGenerator は OS の乱数源から UUID v4 を作る
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl UuidGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for UuidGenerator {
    fn generate_task_id(&self) -> Result<TaskId, TaskError> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| TaskError::IdGeneration(e.to_string()))?;

        let uuid = Builder::from_random_bytes(bytes).into_uuid();
        Ok(TaskId::new(uuid.hyphenated().to_string()))
    }
}

/// SequentialIdGenerator は `{prefix}-{n}` を順番に返す
///
/// n は 1 から始まる。
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate_task_id(&self) -> Result<TaskId, TaskError> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Ok(TaskId::new(format!("{}-{}", self.prefix, n)))
    }
}
