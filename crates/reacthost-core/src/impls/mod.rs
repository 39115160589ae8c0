//! Impls - 実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **FileStorage**: JSON ファイルへの snapshot 保存（本番用デフォルト）
//! - **MemoryStorage**: テスト・埋め込み用
//! - **MemoryChat**: 呼び出しを記録する ChatClient（テスト用）
//!
//! 実際のチャットプラットフォーム用の ChatClient は埋め込む側のバイナリに置く。

pub mod fs_storage;
pub mod memory_chat;
pub mod memory_storage;

pub use self::fs_storage::FileStorage;
pub use self::memory_chat::{ChatCall, MemoryChat};
pub use self::memory_storage::MemoryStorage;
