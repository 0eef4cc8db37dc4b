//! # TemplateRepository
//!
//! 通知テンプレートの読み取りを担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **読み取り専用**: テンプレートの作成・編集は管理画面側の CRUD が担う
//! - **作成順の新しい順**: 同一トリガーに複数テンプレートが一致した場合の
//!   タイブレークは「最も新しく作成されたもの」。`ORDER BY created_at DESC,
//!   id DESC`（UUID v7 のため id 降順も作成順）で明示する
//! - **不正トリガーのスキップ**: `triggers` JSON がパースできない行は
//!   警告ログを出して読み飛ばし、他のテンプレートの判定は継続する

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use minber_domain::template::{NotificationTemplate, RecipientSlot, TemplateId, TriggerRule};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// 通知テンプレートリポジトリトレイト
///
/// 通知エンジンはトリガー判定のたびに有効なテンプレート全件を取得し、
/// notify クレート側で型付きインデックスを構築する。
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// 有効なテンプレートを作成順の新しい順で全件取得する
    ///
    /// # 戻り値
    ///
    /// - `Ok(Vec<NotificationTemplate>)`: 有効テンプレート一覧
    ///   （トリガー定義が不正な行は含まれない）
    /// - `Err(_)`: データベースエラー
    async fn find_all_active(&self) -> Result<Vec<NotificationTemplate>, InfraError>;
}

/// DB の notification_templates テーブルの行を表す中間構造体
///
/// `query_as` が SQL 結果を直接マッピングする対象。
/// `TryFrom` で `NotificationTemplate` への変換ロジックを一箇所に集約する。
#[derive(sqlx::FromRow)]
struct TemplateRow {
    id: Uuid,
    name: String,
    recipient_slot: String,
    triggers: serde_json::Value,
    subject: String,
    body: String,
    active: bool,
    login_url: Option<String>,
    background_image_url: Option<String>,
    has_background_image: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TemplateRow> for NotificationTemplate {
    type Error = InfraError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        let recipient_slot = row
            .recipient_slot
            .parse::<RecipientSlot>()
            .map_err(|e| InfraError::unexpected(format!("受信者区分が不正: {e}")))?;

        let triggers: Vec<TriggerRule> = serde_json::from_value(row.triggers)?;

        Ok(NotificationTemplate {
            id: TemplateId::from_uuid(row.id),
            name: row.name,
            recipient_slot,
            triggers,
            subject: row.subject,
            body: row.body,
            active: row.active,
            login_url: row.login_url,
            background_image_url: row.background_image_url,
            has_background_image: row.has_background_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL 実装の TemplateRepository
#[derive(Debug, Clone)]
pub struct PostgresTemplateRepository {
    pool: PgPool,
}

impl PostgresTemplateRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateRepository for PostgresTemplateRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all_active(&self) -> Result<Vec<NotificationTemplate>, InfraError> {
        let rows = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT
                id,
                name,
                recipient_slot,
                triggers,
                subject,
                body,
                active,
                login_url,
                background_image_url,
                (background_image IS NOT NULL) AS has_background_image,
                created_at,
                updated_at
            FROM notification_templates
            WHERE active = TRUE
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        // トリガー定義が不正な行は警告を出してスキップし、
        // 他のテンプレートの判定を止めない
        let templates = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                match NotificationTemplate::try_from(row) {
                    Ok(template) => Some(template),
                    Err(e) => {
                        tracing::warn!(
                            template_id = %id,
                            error = %e,
                            "トリガー定義が不正なテンプレートをスキップ"
                        );
                        None
                    }
                }
            })
            .collect();

        Ok(templates)
    }
}
