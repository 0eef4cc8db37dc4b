//! # 受信者解決
//!
//! 受信者区分（imam / admin / both）と通知コンテキストから、
//! 送信先メールアドレスの一覧を構築する。
//!
//! ## 設計方針
//!
//! - **重複排除 + 順序保存**: 返すリストは重複なし。初出の順序を保存する
//!   ことでテストの決定性を確保する
//! - **解決失敗は孤立**: プロフィールやロスターの取得失敗は警告ログを出し、
//!   その区分が 0 件になるだけで他の区分の解決は継続する
//! - **上書きリストが正**: admin 区分は設定の上書きリストが非空なら
//!   それだけを使い、ロスターは参照しない

use std::sync::Arc;

use itertools::Itertools as _;
use minber_domain::{notification::NotificationContext, template::RecipientSlot, user::UserId};
use minber_infra::repository::{ConversationRepository, ProfileRepository, UserRepository};

use crate::{config::NotifyConfig, tables};

/// 受信者解決器
pub struct RecipientResolver {
    profile_repo:      Arc<dyn ProfileRepository>,
    user_repo:         Arc<dyn UserRepository>,
    conversation_repo: Arc<dyn ConversationRepository>,
    admin_recipients:          Vec<String>,
    admin_fallback_recipients: Vec<String>,
}

impl RecipientResolver {
    pub fn new(
        profile_repo: Arc<dyn ProfileRepository>,
        user_repo: Arc<dyn UserRepository>,
        conversation_repo: Arc<dyn ConversationRepository>,
        config: &NotifyConfig,
    ) -> Self {
        Self {
            profile_repo,
            user_repo,
            conversation_repo,
            admin_recipients: config.admin_recipients.clone(),
            admin_fallback_recipients: config.admin_fallback_recipients.clone(),
        }
    }

    /// 受信者区分に応じた送信先アドレス一覧を解決する
    ///
    /// 重複は除去され、初出の順序が保存される。
    pub async fn resolve_slot(
        &self,
        slot: RecipientSlot,
        ctx: &NotificationContext,
    ) -> Vec<String> {
        let addresses = match slot {
            RecipientSlot::Imam => self.resolve_imam(ctx).await,
            RecipientSlot::Admin => self.resolve_admin().await,
            RecipientSlot::Both => {
                let mut combined = self.resolve_imam(ctx).await;
                combined.extend(self.resolve_admin().await);
                combined
            }
        };

        addresses.into_iter().unique().collect()
    }

    /// imam 区分: レコードが参照するプロフィールのメールアドレス
    async fn resolve_imam(&self, ctx: &NotificationContext) -> Vec<String> {
        let Some(profile_id) = tables::profile_id_of(ctx) else {
            tracing::warn!(
                table = %ctx.table_name,
                "レコードにプロフィール外部キーがないため imam 区分は 0 件"
            );
            return Vec::new();
        };

        match self.profile_repo.find_by_id(&profile_id).await {
            Ok(Some(profile)) => match profile.email {
                Some(email) => vec![email.into_string()],
                None => {
                    tracing::warn!(
                        profile_id = %profile_id,
                        "プロフィールにメールアドレスが未登録のため imam 区分は 0 件"
                    );
                    Vec::new()
                }
            },
            Ok(None) => {
                tracing::warn!(profile_id = %profile_id, "プロフィールが存在しない");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(
                    profile_id = %profile_id,
                    error = %e,
                    "プロフィールの取得に失敗。imam 区分は 0 件として続行"
                );
                Vec::new()
            }
        }
    }

    /// admin 区分: 上書きリスト → ロスター → フォールバックリスト の順
    async fn resolve_admin(&self) -> Vec<String> {
        // 上書きリストが非空なら、それだけが正でロスターは参照しない
        if !self.admin_recipients.is_empty() {
            return self.admin_recipients.clone();
        }

        let roster = match self.user_repo.find_active_admins().await {
            Ok(users) => users
                .into_iter()
                .filter_map(|u| u.email.map(|e| e.into_string()))
                .collect::<Vec<_>>(),
            Err(e) => {
                tracing::warn!(error = %e, "管理者ロスターの取得に失敗");
                Vec::new()
            }
        };

        if !roster.is_empty() {
            return roster;
        }

        if self.admin_fallback_recipients.is_empty() {
            tracing::warn!("admin 区分の受信者がどのソースからも解決できなかった");
        }
        self.admin_fallback_recipients.clone()
    }

    /// 会話ファンアウト: 送信者を除く全参加者のアドレスを解決する
    ///
    /// 参加者ごとにプロフィールのメールアドレスを優先し、なければ
    /// ユーザーのメールアドレスを使う。どちらもない参加者は警告を出して
    /// スキップする。送信者自身は参加者 ID でもアドレスでも除外される。
    pub async fn resolve_conversation(&self, ctx: &NotificationContext) -> Vec<String> {
        let Some(conversation_id) = tables::conversation_id_of(ctx) else {
            tracing::warn!(table = %ctx.table_name, "レコードに conversation_id がない");
            return Vec::new();
        };
        let sender_id = tables::sender_id_of(ctx);

        let participants = match self.conversation_repo.participant_ids(&conversation_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    error = %e,
                    "会話参加者の取得に失敗"
                );
                return Vec::new();
            }
        };

        // 送信者自身のアドレスも解決し、参加者 ID だけでなく
        // アドレスの一致でも除外できるようにする
        let sender_address = match &sender_id {
            Some(id) => self.resolve_participant_email(id).await,
            None => None,
        };

        let mut addresses = Vec::new();
        for participant_id in participants {
            if sender_id.as_ref() == Some(&participant_id) {
                continue;
            }

            match self.resolve_participant_email(&participant_id).await {
                Some(address) => {
                    if sender_address.as_deref() == Some(address.as_str()) {
                        continue;
                    }
                    addresses.push(address);
                }
                None => {
                    tracing::warn!(
                        participant_id = %participant_id,
                        conversation_id = %conversation_id,
                        "参加者のメールアドレスが解決できないためスキップ"
                    );
                }
            }
        }

        addresses.into_iter().unique().collect()
    }

    /// 参加者のメールアドレスを解決する（プロフィール優先、次にユーザー）
    async fn resolve_participant_email(&self, user_id: &UserId) -> Option<String> {
        match self.profile_repo.find_by_user_id(user_id).await {
            Ok(Some(profile)) if profile.email.is_some() => {
                return profile.email.map(|e| e.into_string());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "プロフィール参照に失敗");
            }
        }

        match self.user_repo.find_by_id(user_id).await {
            Ok(Some(user)) => user.email.map(|e| e.into_string()),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "ユーザー参照に失敗");
                None
            }
        }
    }
}
