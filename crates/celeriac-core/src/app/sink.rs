//! TaskSink - consume が decode 済み Task を渡す先
//!
//! bounded / unbounded は呼び出し側が選ぶ。bounded が満杯なら emit で待つので、
//! そのぶん ack も遅れる（broker 側の redelivery タイマーに影響する）。

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{Task, TaskError};

#[async_trait]
pub trait TaskSink: Send {
    /// 受け手が閉じていたら `TaskError::OutputClosed`
    async fn emit(&mut self, task: Task) -> Result<(), TaskError>;
}

#[async_trait]
impl TaskSink for mpsc::Sender<Task> {
    async fn emit(&mut self, task: Task) -> Result<(), TaskError> {
        self.send(task).await.map_err(|_| TaskError::OutputClosed)
    }
}

#[async_trait]
impl TaskSink for mpsc::UnboundedSender<Task> {
    async fn emit(&mut self, task: Task) -> Result<(), TaskError> {
        self.send(task).map_err(|_| TaskError::OutputClosed)
    }
}
