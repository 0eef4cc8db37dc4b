//! # Minber ドメイン層
//!
//! 通知配信エンジンの中核を担うドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! このクレートは DDD（ドメイン駆動設計）の原則に従い、以下を提供する:
//!
//! - **エンティティ**: 一意の識別子を持つオブジェクト（例: NotificationTemplate,
//!   ImamProfile）
//! - **値オブジェクト**: 識別子を持たない不変オブジェクト（例: Email,
//!   TriggerRule）
//! - **ドメインエラー**: ビジネスルール違反を表現するエラー型
//!
//! ## 依存関係の方向
//!
//! ```text
//! notify → infra → domain → shared
//! ```
//!
//! ドメイン層はインフラ層（DB、メール送信基盤）には一切依存しない。
//! これにより、トリガー判定や受信者解決のロジックが純粋に保たれる。
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`template`] - 通知テンプレートとトリガールール
//! - [`notification`] - 通知コンテキストと配信結果
//! - [`profile`] - イマームプロフィール
//! - [`user`] - ユーザーとメールアドレス
//! - [`conversation`] - 会話（メッセージファンアウト用）の識別子
//! - [`clock`] - テスト注入可能な時刻プロバイダ

#[macro_use]
mod macros;

pub mod clock;
pub mod conversation;
pub mod error;
pub mod notification;
pub mod profile;
pub mod template;
pub mod user;

pub use error::DomainError;
