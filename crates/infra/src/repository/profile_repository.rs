//! # ProfileRepository
//!
//! イマームプロフィールの読み取りを担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **読み取り専用**: プロフィールの CRUD はプラットフォーム側が担う
//! - **メールアドレスの欠損許容**: email が NULL または不正な形式の行は
//!   `email: None` として返し、受信者解決側がスキップと警告を判断する

use async_trait::async_trait;
use minber_domain::{
    profile::{ImamProfile, ProfileId},
    user::{Email, UserId},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// イマームプロフィールリポジトリトレイト
///
/// 変数抽出（氏名・整理番号）と imam 受信者区分の
/// メールアドレス解決で使用される。
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// ID でプロフィールを検索
    ///
    /// # 戻り値
    ///
    /// - `Ok(Some(profile))`: プロフィールが見つかった場合
    /// - `Ok(None)`: プロフィールが見つからない場合
    /// - `Err(_)`: データベースエラー
    async fn find_by_id(&self, id: &ProfileId) -> Result<Option<ImamProfile>, InfraError>;

    /// ログインユーザー ID でプロフィールを検索
    ///
    /// 会話ファンアウトで参加者のメールアドレスを
    /// プロフィール優先で解決するために使用する。
    async fn find_by_user_id(&self, user_id: &UserId)
    -> Result<Option<ImamProfile>, InfraError>;
}

/// DB の imam_profiles テーブルの行を表す中間構造体
#[derive(sqlx::FromRow)]
struct ProfileRow {
    id:          Uuid,
    user_id:     Option<Uuid>,
    name:        String,
    surname:     String,
    email:       Option<String>,
    file_number: Option<String>,
}

impl From<ProfileRow> for ImamProfile {
    fn from(row: ProfileRow) -> Self {
        // 不正な形式のメールアドレスは未登録と同じ扱いにする
        let email = row.email.and_then(|e| Email::new(e).ok());

        ImamProfile {
            id: ProfileId::from_uuid(row.id),
            user_id: row.user_id.map(UserId::from_uuid),
            name: row.name,
            surname: row.surname,
            email,
            file_number: row.file_number,
        }
    }
}

/// PostgreSQL 実装の ProfileRepository
#[derive(Debug, Clone)]
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id,
        user_id,
        name,
        surname,
        email,
        file_number
    FROM imam_profiles
"#;

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_id(&self, id: &ProfileId) -> Result<Option<ImamProfile>, InfraError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ImamProfile::from))
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<ImamProfile>, InfraError> {
        let row =
            sqlx::query_as::<_, ProfileRow>(&format!("{SELECT_COLUMNS} WHERE user_id = $1"))
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(ImamProfile::from))
    }
}
