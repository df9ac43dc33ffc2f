//! flowsnap-core
//!
//! Core building blocks for turning workflow-definition JSON documents into
//! PNG snapshots through a headless browser, resumably.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（task, result, outcome, report, settings, events, ids）
//! - **ports**: 抽象化レイヤー（RenderBackend/BackendFactory, Clock, ProgressSink, completion）
//! - **scheduler**: Dispatcher（sequential / pool の 2 モード）
//! - **backend**: RenderBackend 実装（ResilientRenderer リトライ adapter、
//!   feature `chrome` で ChromeBackend + PageServer）
//! - **state**: JobStateStore（レポートファイルの load / prune / persist）
//! - **reconcile**: 前回レポートと今回結果の純粋マージ
//! - **scanner**: ドキュメント探索と検証
//! - **retry**: RetryPolicy

pub mod backend;
pub mod domain;
pub mod error;
pub mod ports;
pub mod reconcile;
pub mod retry;
pub mod scanner;
pub mod scheduler;
pub mod state;

pub use error::{Error, Result};
