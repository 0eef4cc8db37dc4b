//! # リポジトリ
//!
//! 通知配信エンジンが参照・記録する永続データへのアクセスを定義する。
//!
//! ## モジュール構成
//!
//! - [`template_repository`] - 通知テンプレート（読み取り専用）
//! - [`profile_repository`] - イマームプロフィール（読み取り専用）
//! - [`user_repository`] - ユーザー・管理者ロスター（読み取り専用）
//! - [`conversation_repository`] - 会話参加者（読み取り専用）
//! - [`notification_log_repository`] - 通知ログ（書き込みのみ）

pub mod conversation_repository;
pub mod notification_log_repository;
pub mod profile_repository;
pub mod template_repository;
pub mod user_repository;

pub use conversation_repository::{ConversationRepository, PostgresConversationRepository};
pub use notification_log_repository::{
    NotificationLog,
    NotificationLogRepository,
    PostgresNotificationLogRepository,
};
pub use profile_repository::{PostgresProfileRepository, ProfileRepository};
pub use template_repository::{PostgresTemplateRepository, TemplateRepository};
pub use user_repository::{PostgresUserRepository, UserRepository};
