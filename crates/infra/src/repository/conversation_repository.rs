//! # ConversationRepository
//!
//! 会話参加者の読み取りを担当するリポジトリ。
//!
//! メッセージ作成イベントのファンアウト（送信者を除く全参加者への
//! 個別配信）でのみ使用される。会話・メッセージ本体の CRUD は
//! プラットフォーム側が担う。

use async_trait::async_trait;
use minber_domain::{conversation::ConversationId, user::UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// 会話参加者リポジトリトレイト
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// 会話の参加者ユーザー ID 一覧を取得
    ///
    /// 参加順で返す。送信者の除外は受信者解決側が行う。
    async fn participant_ids(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<UserId>, InfraError>;
}

/// PostgreSQL 実装の ConversationRepository
#[derive(Debug, Clone)]
pub struct PostgresConversationRepository {
    pool: PgPool,
}

impl PostgresConversationRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for PostgresConversationRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn participant_ids(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<UserId>, InfraError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT user_id
            FROM conversation_participants
            WHERE conversation_id = $1
            ORDER BY joined_at
            "#,
        )
        .bind(conversation_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| UserId::from_uuid(id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresConversationRepository>();
    }
}
