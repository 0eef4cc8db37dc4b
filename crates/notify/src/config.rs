//! # 通知エンジン設定
//!
//! 環境変数から通知エンジンの設定を読み込む。

use std::{env, time::Duration};

/// 通知エンジンの設定
///
/// `NOTIFY_BACKEND` 環境変数で送信バックエンドを切り替える:
/// - `smtp`: Mailpit（開発）/ SMTP サーバー経由で送信
/// - `ses`: Amazon SES v2 経由で送信（本番）
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// 送信バックエンド（"smtp" | "ses" | "noop"）
    pub backend:      String,
    /// SMTP ホスト（backend=smtp の場合に使用）
    pub smtp_host:    String,
    /// SMTP ポート（backend=smtp の場合に使用）
    pub smtp_port:    u16,
    /// 送信元メールアドレス
    pub from_address: String,
    /// アプリケーションのベース URL（背景画像 URL の書き換えと合成に使用）
    pub base_url:     String,
    /// 管理者受信者の上書きリスト（非空の場合はロスターより優先される）
    pub admin_recipients: Vec<String>,
    /// 管理者受信者の最終フォールバックリスト
    /// （上書きリストもロスターも空の場合のみ使用）
    pub admin_fallback_recipients: Vec<String>,
    /// 受信者 1 件あたりの送信タイムアウト
    pub send_timeout: Duration,
    /// 同時に処理する `notify()` 呼び出しの上限
    pub max_concurrent: usize,
}

impl NotifyConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Self {
        Self {
            backend:      env::var("NOTIFY_BACKEND").unwrap_or_else(|_| "noop".to_string()),
            smtp_host:    env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            smtp_port:    env::var("SMTP_PORT")
                .unwrap_or_else(|_| "1025".to_string())
                .parse()
                .expect("SMTP_PORT は有効なポート番号である必要があります"),
            from_address: env::var("NOTIFY_FROM_ADDRESS")
                .unwrap_or_else(|_| "noreply@minber.example.com".to_string()),
            base_url:     env::var("NOTIFY_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            admin_recipients: env::var("NOTIFY_ADMIN_RECIPIENTS")
                .map(|raw| parse_address_list(&raw))
                .unwrap_or_default(),
            admin_fallback_recipients: env::var("NOTIFY_ADMIN_FALLBACK_RECIPIENTS")
                .map(|raw| parse_address_list(&raw))
                .unwrap_or_default(),
            send_timeout: Duration::from_secs(
                env::var("NOTIFY_SEND_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .expect("NOTIFY_SEND_TIMEOUT_SECS は秒数である必要があります"),
            ),
            max_concurrent: env::var("NOTIFY_MAX_CONCURRENT")
                .unwrap_or_else(|_| "16".to_string())
                .parse()
                .expect("NOTIFY_MAX_CONCURRENT は正の整数である必要があります"),
        }
    }
}

impl Default for NotifyConfig {
    /// 開発環境向けのデフォルト設定（テストでも使用する）
    fn default() -> Self {
        Self {
            backend:      "noop".to_string(),
            smtp_host:    "localhost".to_string(),
            smtp_port:    1025,
            from_address: "noreply@minber.example.com".to_string(),
            base_url:     "http://localhost:5173".to_string(),
            admin_recipients: Vec::new(),
            admin_fallback_recipients: Vec::new(),
            send_timeout: Duration::from_secs(30),
            max_concurrent: 16,
        }
    }
}

/// カンマ区切りのアドレスリストをパースする
///
/// 空要素と前後の空白は取り除く。
fn parse_address_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
