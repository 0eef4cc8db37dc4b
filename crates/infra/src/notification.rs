//! # 通知送信
//!
//! メール通知の送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **3 つの実装**: SMTP（Mailpit 開発用）、SES（本番用）、Noop（テスト用）
//! - **環境変数切替**: `NOTIFY_BACKEND` でランタイム選択

mod noop;
mod ses;
mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use minber_domain::notification::{EmailMessage, NotificationError};
pub use noop::NoopNotificationSender;
pub use ses::SesNotificationSender;
pub use smtp::SmtpNotificationSender;

/// メール送信トレイト
///
/// 通知基盤の中核。メール送信の具体的な方法を抽象化する。
/// SMTP / SES / Noop の 3 実装を環境変数で切り替える。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError>;
}

/// 設定値から送信バックエンドを構築する
///
/// # 引数
///
/// - `backend`: `"smtp"` | `"ses"` | `"noop"`。不明な値は警告を出して Noop
/// - `smtp_host` / `smtp_port`: backend=smtp の場合に使用
/// - `from_address`: 送信元メールアドレス（SES では検証済みであること）
pub async fn build_sender(
    backend: &str,
    smtp_host: &str,
    smtp_port: u16,
    from_address: String,
) -> Arc<dyn NotificationSender> {
    match backend {
        "smtp" => Arc::new(SmtpNotificationSender::new(
            smtp_host,
            smtp_port,
            from_address,
        )),
        "ses" => {
            let sdk_config =
                aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let client = aws_sdk_sesv2::Client::new(&sdk_config);
            Arc::new(SesNotificationSender::new(client, from_address))
        }
        "noop" => Arc::new(NoopNotificationSender),
        other => {
            tracing::warn!(backend = other, "不明な通知バックエンド。Noop を使用");
            Arc::new(NoopNotificationSender)
        }
    }
}
