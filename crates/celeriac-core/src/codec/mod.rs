//! Codec - Task と Celery wire message（JSON, UTF-8）の相互変換
//!
//! ```text
//! {
//!   "task": string,       // 必須
//!   "id": string,         // 必須
//!   "args": [string],     // 空なら省略
//!   "kwargs": {..},       // 空なら省略
//!   "retries": integer,   // 0 なら省略
//!   "eta": "YYYY-MM-DDTHH:MM:SS.ffffff",      // UTC, 未設定なら省略
//!   "expires": "YYYY-MM-DDTHH:MM:SS.ffffff"   // UTC, 未設定なら省略
//! }
//! ```

pub mod finite;
pub mod time_format;
pub mod wire;

pub use self::finite::ensure_finite;
pub use self::time_format::{format_wire_time, parse_wire_time};
pub use self::wire::{decode, encode};
