//! # UserRepository
//!
//! ユーザー情報の読み取りを担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **管理者ロスター**: admin 受信者区分は「有効 かつ 管理者ロール」の
//!   ユーザー一覧から解決する（設定の上書きリストがない場合）
//! - **メールアドレスの欠損許容**: email が NULL の行もユーザーとして返し、
//!   受信者解決側が空メールを除外する

use async_trait::async_trait;
use minber_domain::user::{Email, User, UserId, UserRole, UserStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// ユーザーリポジトリトレイト
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ID でユーザーを検索
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError>;

    /// 有効な管理者ユーザーの一覧を取得
    ///
    /// admin 受信者区分のロスター解決で使用する。
    /// ステータスが `active` かつロールが `admin` のユーザーのみを返す。
    async fn find_active_admins(&self) -> Result<Vec<User>, InfraError>;
}

/// DB の users テーブルの行を表す中間構造体
#[derive(sqlx::FromRow)]
struct UserRow {
    id:     Uuid,
    name:   String,
    email:  Option<String>,
    role:   String,
    status: String,
}

impl TryFrom<UserRow> for User {
    type Error = InfraError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<UserRole>()
            .map_err(|e| InfraError::unexpected(format!("ユーザーロールが不正: {e}")))?;
        let status = row
            .status
            .parse::<UserStatus>()
            .map_err(|e| InfraError::unexpected(format!("ユーザー状態が不正: {e}")))?;

        Ok(User {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email.and_then(|e| Email::new(e).ok()),
            role,
            status,
        })
    }
}

/// PostgreSQL 実装の UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, status
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_active_admins(&self) -> Result<Vec<User>, InfraError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, status
            FROM users
            WHERE role = 'admin' AND status = 'active'
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }
}
