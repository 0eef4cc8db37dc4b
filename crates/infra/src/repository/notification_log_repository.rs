//! # NotificationLogRepository
//!
//! 通知ログの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **fire-and-forget ログ**: 送信成功・失敗どちらも記録する
//! - **記録失敗は致命的ではない**: INSERT の失敗は呼び出し側がログ出力のみで
//!   握りつぶし、配信自体の成否には影響させない

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use minber_domain::notification::NotificationLogId;
use sqlx::PgPool;

use crate::error::InfraError;

/// 通知ログ（リポジトリ INSERT 用データ型）
///
/// 受信者 × テンプレートごとの配信試行 1 件に対応する。
/// 管理画面の配信履歴ビュー（本クレートの範囲外）が参照する。
#[derive(Debug, Clone)]
pub struct NotificationLog {
    pub id: NotificationLogId,
    pub table_name: String,
    pub action: String,
    pub template_name: String,
    pub recipient_email: String,
    pub subject: String,
    pub status: String,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// 通知ログリポジトリトレイト
#[async_trait]
pub trait NotificationLogRepository: Send + Sync {
    /// 通知ログを挿入する
    async fn insert(&self, log: &NotificationLog) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の NotificationLogRepository
#[derive(Debug, Clone)]
pub struct PostgresNotificationLogRepository {
    pool: PgPool,
}

impl PostgresNotificationLogRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLogRepository for PostgresNotificationLogRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn insert(&self, log: &NotificationLog) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO notification_logs (
                id, table_name, action, template_name,
                recipient_email, subject, status, error_message, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(log.id.as_uuid())
        .bind(&log.table_name)
        .bind(&log.action)
        .bind(&log.template_name)
        .bind(&log.recipient_email)
        .bind(&log.subject)
        .bind(&log.status)
        .bind(&log.error_message)
        .bind(log.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
