//! # Minber インフラ層
//!
//! 通知配信エンジンが依存する外部リソースへのアクセスを提供する。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: リポジトリとメール送信はすべて trait で抽象化し、
//!   notify クレートからは `Arc<dyn ...>` として注入する
//! - **読み取り中心**: 通知エンジンが書き込むのは notification_logs のみ。
//!   テンプレート・プロフィール・ロスターはすべて読み取り専用
//! - **テスト用モック**: `test-utils` feature でインメモリ実装を公開する
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL 接続プール
//! - [`error`] - インフラ層エラー（SpanTrace 自動捕捉）
//! - [`repository`] - テンプレート・プロフィール・ロスター・通知ログ
//! - [`notification`] - メール送信（SMTP / SES / Noop）
//! - [`mock`] - テスト用インメモリ実装（`test-utils` feature）

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod repository;

pub use error::InfraError;
