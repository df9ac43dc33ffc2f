//! Ports - 抽象化レイヤー
//!
//! 外部リソース（ブラウザセッション、時刻、完了通知、進捗リスナー）への
//! インターフェース。実装詳細はここに漏らさない。
//!
//! # 設計原則
//! - RenderBackend は「1回の描画試行」だけを契約する（リトライは adapter 側）
//! - Scheduler はプール機構に依存せず Pending/Completer の契約だけを見る
//! - Clock は差し替え可能（テストでは FixedClock）

pub mod backend;
pub mod clock;
pub mod completion;
pub mod id_generator;
pub mod progress;

pub use self::backend::{BackendFactory, RenderBackend};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::completion::{Completer, Pending, PollOutcome, completion};
pub use self::id_generator::RunIdGenerator;
pub use self::progress::{NoopSink, ProgressSink};
