//! # テスト用モックリポジトリ
//!
//! 通知エンジンのユニットテストで使用するインメモリモック実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! minber-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use minber_domain::{
    conversation::ConversationId,
    notification::{EmailMessage, NotificationError},
    profile::{ImamProfile, ProfileId},
    template::NotificationTemplate,
    user::{User, UserId},
};

use crate::{
    error::InfraError,
    notification::NotificationSender,
    repository::{
        ConversationRepository,
        NotificationLog,
        NotificationLogRepository,
        ProfileRepository,
        TemplateRepository,
        UserRepository,
    },
};

// ===== MockTemplateRepository =====

/// テスト用のモック TemplateRepository
///
/// `find_all_active` は PostgreSQL 実装と同じ順序
/// （作成日時の降順、同時刻なら ID 降順）で返す。
#[derive(Clone, Default)]
pub struct MockTemplateRepository {
    templates: Arc<Mutex<Vec<NotificationTemplate>>>,
}

impl MockTemplateRepository {
    pub fn new() -> Self {
        Self {
            templates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn add_template(&self, template: NotificationTemplate) {
        self.templates.lock().unwrap().push(template);
    }
}

#[async_trait]
impl TemplateRepository for MockTemplateRepository {
    async fn find_all_active(&self) -> Result<Vec<NotificationTemplate>, InfraError> {
        let mut templates: Vec<_> = self
            .templates
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.active)
            .cloned()
            .collect();

        templates.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });

        Ok(templates)
    }
}

// ===== MockProfileRepository =====

#[derive(Clone, Default)]
pub struct MockProfileRepository {
    profiles: Arc<Mutex<Vec<ImamProfile>>>,
}

impl MockProfileRepository {
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn add_profile(&self, profile: ImamProfile) {
        self.profiles.lock().unwrap().push(profile);
    }
}

#[async_trait]
impl ProfileRepository for MockProfileRepository {
    async fn find_by_id(&self, id: &ProfileId) -> Result<Option<ImamProfile>, InfraError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == *id)
            .cloned())
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<ImamProfile>, InfraError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.user_id.as_ref() == Some(user_id))
            .cloned())
    }
}

// ===== MockUserRepository =====

#[derive(Clone, Default)]
pub struct MockUserRepository {
    users: Arc<Mutex<Vec<User>>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == *id)
            .cloned())
    }

    async fn find_active_admins(&self) -> Result<Vec<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.is_active() && u.is_admin())
            .cloned()
            .collect())
    }
}

// ===== MockConversationRepository =====

#[derive(Clone, Default)]
pub struct MockConversationRepository {
    participants: Arc<Mutex<HashMap<ConversationId, Vec<UserId>>>>,
}

impl MockConversationRepository {
    pub fn new() -> Self {
        Self {
            participants: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn set_participants(&self, conversation_id: ConversationId, user_ids: Vec<UserId>) {
        self.participants
            .lock()
            .unwrap()
            .insert(conversation_id, user_ids);
    }
}

#[async_trait]
impl ConversationRepository for MockConversationRepository {
    async fn participant_ids(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<UserId>, InfraError> {
        Ok(self
            .participants
            .lock()
            .unwrap()
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ===== MockNotificationLogRepository =====

#[derive(Clone, Default)]
pub struct MockNotificationLogRepository {
    logs: Arc<Mutex<Vec<NotificationLog>>>,
}

impl MockNotificationLogRepository {
    pub fn new() -> Self {
        Self {
            logs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 記録されたログのスナップショットを取得する
    pub fn logs(&self) -> Vec<NotificationLog> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationLogRepository for MockNotificationLogRepository {
    async fn insert(&self, log: &NotificationLog) -> Result<(), InfraError> {
        self.logs.lock().unwrap().push(log.clone());
        Ok(())
    }
}

// ===== MockNotificationSender =====

/// テスト用のモック NotificationSender
///
/// 送信メッセージを記録する。`fail_for()` で指定した宛先への送信は
/// 失敗させられるため、受信者ごとの失敗分離のテストに使用できる。
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    sent:    Arc<Mutex<Vec<EmailMessage>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self {
            sent:    Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// 指定した宛先への送信を失敗させる
    pub fn fail_for(&self, address: impl Into<String>) {
        self.failing.lock().unwrap().insert(address.into());
    }

    /// 送信に成功したメッセージのスナップショットを取得する
    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        if self.failing.lock().unwrap().contains(&email.to) {
            return Err(NotificationError::SendFailed(format!(
                "モック送信失敗: {}",
                email.to
            )));
        }

        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
