//! # 変数抽出
//!
//! 通知コンテキストのレコードから、テンプレート置換用の
//! フラットな文字列変数マップを構築する。
//!
//! ## 設計方針
//!
//! - **欠損は空文字列**: マッピングされたフィールドがレコードに存在しない
//!   場合は空文字列になる。エラーにも省略にもしない（レンダリングが常に
//!   置換値を持てるようにする）
//! - **プロフィール参照の失敗は孤立**: プロフィールの取得に失敗しても
//!   警告ログを出すだけで、他の変数の抽出は継続する
//! - **決定的な順序**: `BTreeMap` を使い、テストでの比較を安定させる

use std::{collections::BTreeMap, sync::Arc};

use chrono::DateTime;
use minber_domain::notification::NotificationContext;
use minber_infra::repository::ProfileRepository;

use crate::tables::{self, TopicSource};

/// メッセージプレビューの最大文字数（超過分は省略記号で切り詰める）
const MESSAGE_PREVIEW_MAX_CHARS: usize = 120;

/// 変数抽出器
pub struct VariableExtractor {
    profile_repo: Arc<dyn ProfileRepository>,
}

impl VariableExtractor {
    pub fn new(profile_repo: Arc<dyn ProfileRepository>) -> Self {
        Self { profile_repo }
    }

    /// コンテキストから変数マップを構築する
    ///
    /// ## 常に含まれる変数
    ///
    /// | キー | 内容 |
    /// |---|---|
    /// | `imam_name` | プロフィールの氏名（名 + 姓） |
    /// | `imam_first_name` / `imam_surname` | 名 / 姓 |
    /// | `imam_email` | プロフィールのメールアドレス |
    /// | `file_number` | 整理番号 |
    /// | `submission_date` | `updated_at ?? created_at` の長い日付表記 |
    /// | `topic` | テーブル固有のトピック（なければ表示ラベル） |
    /// | `table_name` | テーブル名（生の識別子） |
    /// | `table_label` | 表示ラベル（辞書になければテーブル名） |
    pub async fn extract(&self, ctx: &NotificationContext) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();

        // プロフィール変数（参照できなくてもキー自体は空文字列で存在させる）
        for key in [
            "imam_name",
            "imam_first_name",
            "imam_surname",
            "imam_email",
            "file_number",
        ] {
            vars.insert(key.to_string(), String::new());
        }

        if let Some(profile_id) = tables::profile_id_of(ctx) {
            match self.profile_repo.find_by_id(&profile_id).await {
                Ok(Some(profile)) => {
                    vars.insert("imam_name".to_string(), profile.full_name());
                    vars.insert("imam_first_name".to_string(), profile.name.clone());
                    vars.insert("imam_surname".to_string(), profile.surname.clone());
                    vars.insert(
                        "imam_email".to_string(),
                        profile
                            .email
                            .as_ref()
                            .map(|e| e.as_str().to_string())
                            .unwrap_or_default(),
                    );
                    vars.insert(
                        "file_number".to_string(),
                        profile.file_number.clone().unwrap_or_default(),
                    );
                }
                Ok(None) => {
                    tracing::warn!(
                        profile_id = %profile_id,
                        table = %ctx.table_name,
                        "レコードが参照するプロフィールが存在しない"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        profile_id = %profile_id,
                        error = %e,
                        "プロフィールの取得に失敗。プロフィール変数なしで続行"
                    );
                }
            }
        }

        // 提出日（updated_at ?? created_at）
        vars.insert(
            "submission_date".to_string(),
            self.submission_date(ctx).unwrap_or_default(),
        );

        // テーブル固有のトピック
        let mapping = tables::mapping_for(&ctx.table_name);
        let topic = mapping.map(|m| self.topic_of(ctx, &m.topic)).unwrap_or_default();

        // 表示ラベル（辞書になければテーブル名そのもの）
        let label = mapping
            .map(|m| m.label.to_string())
            .unwrap_or_else(|| ctx.table_name.clone());

        // トピックが取り出せなかった場合はラベルで補う
        let topic = if topic.is_empty() { label.clone() } else { topic };

        vars.insert("topic".to_string(), topic);
        vars.insert("table_name".to_string(), ctx.table_name.clone());
        vars.insert("table_label".to_string(), label);

        vars
    }

    /// 提出日を長い日付表記で返す
    ///
    /// `updated_at` があればそれを、なければ `created_at` を使う。
    /// どちらも RFC 3339 でパースできない場合は `None`。
    fn submission_date(&self, ctx: &NotificationContext) -> Option<String> {
        let raw = ctx
            .field_str("updated_at")
            .or_else(|| ctx.field_str("created_at"))?;

        let parsed = DateTime::parse_from_rfc3339(&raw).ok()?;
        Some(parsed.format("%Y年%m月%d日").to_string())
    }

    /// マッピングの定義に従ってトピックを取り出す
    fn topic_of(&self, ctx: &NotificationContext, source: &TopicSource) -> String {
        match source {
            TopicSource::Field(field) => ctx.field_str(field).unwrap_or_default(),
            TopicSource::FullName => {
                let name = ctx.field_str("name").unwrap_or_default();
                let surname = ctx.field_str("surname").unwrap_or_default();
                format!("{name} {surname}").trim().to_string()
            }
            TopicSource::MessagePreview => ctx
                .field_str("body")
                .map(|body| preview(&body))
                .unwrap_or_default(),
        }
    }
}

/// 長いメッセージを固定長のプレビューに切り詰める
fn preview(body: &str) -> String {
    if body.chars().count() <= MESSAGE_PREVIEW_MAX_CHARS {
        return body.to_string();
    }

    let truncated: String = body.chars().take(MESSAGE_PREVIEW_MAX_CHARS).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use minber_domain::{
        profile::{ImamProfile, ProfileId},
        template::TriggerAction,
        user::Email,
    };
    use minber_infra::mock::MockProfileRepository;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn make_extractor() -> (VariableExtractor, MockProfileRepository) {
        let profile_repo = MockProfileRepository::new();
        let extractor = VariableExtractor::new(Arc::new(profile_repo.clone()));
        (extractor, profile_repo)
    }

    fn make_profile(profile_id: ProfileId) -> ImamProfile {
        ImamProfile {
            id:          profile_id,
            user_id:     None,
            name:        "Ahmet".to_string(),
            surname:     "Yılmaz".to_string(),
            email:       Some(Email::new("ahmet@minber.example.com").unwrap()),
            file_number: Some("D-1042".to_string()),
        }
    }

    #[tokio::test]
    async fn test_プロフィール変数が外部キー経由で解決される() {
        let (extractor, profile_repo) = make_extractor();
        let profile_id = ProfileId::new();
        profile_repo.add_profile(make_profile(profile_id.clone()));

        let ctx = NotificationContext::new(
            "Application_Forms",
            TriggerAction::Create,
            json!({
                "id": "x",
                "imam_profile_id": profile_id.as_uuid().to_string(),
                "topic": "休暇申請",
            }),
            None,
            None,
        );

        let vars = extractor.extract(&ctx).await;

        assert_eq!(vars["imam_name"], "Ahmet Yılmaz");
        assert_eq!(vars["imam_first_name"], "Ahmet");
        assert_eq!(vars["imam_surname"], "Yılmaz");
        assert_eq!(vars["imam_email"], "ahmet@minber.example.com");
        assert_eq!(vars["file_number"], "D-1042");
        assert_eq!(vars["topic"], "休暇申請");
        assert_eq!(vars["table_label"], "申請フォーム");
    }

    #[tokio::test]
    async fn test_imam_profiles_のトピックは氏名の連結() {
        let (extractor, _) = make_extractor();

        let ctx = NotificationContext::new(
            "Imam_Profiles",
            TriggerAction::Update,
            json!({"name": "Ahmet", "surname": "Yılmaz"}),
            None,
            None,
        );

        let vars = extractor.extract(&ctx).await;

        assert_eq!(vars["topic"], "Ahmet Yılmaz");
        assert_eq!(vars["table_name"], "Imam_Profiles");
    }

    #[tokio::test]
    async fn test_メッセージのトピックは本文のプレビュー() {
        let (extractor, _) = make_extractor();
        let long_body = "あ".repeat(200);

        let ctx = NotificationContext::new(
            "Messages",
            TriggerAction::Create,
            json!({"body": long_body}),
            None,
            None,
        );

        let vars = extractor.extract(&ctx).await;

        assert_eq!(vars["topic"].chars().count(), MESSAGE_PREVIEW_MAX_CHARS + 1);
        assert!(vars["topic"].ends_with('…'));
    }

    #[tokio::test]
    async fn test_短いメッセージは切り詰められない() {
        let (extractor, _) = make_extractor();

        let ctx = NotificationContext::new(
            "Messages",
            TriggerAction::Create,
            json!({"body": "短いメッセージ"}),
            None,
            None,
        );

        let vars = extractor.extract(&ctx).await;

        assert_eq!(vars["topic"], "短いメッセージ");
    }

    #[tokio::test]
    async fn test_欠損フィールドは空文字列になる() {
        let (extractor, _) = make_extractor();

        // topic フィールドのないレコード
        let ctx = NotificationContext::new(
            "Application_Forms",
            TriggerAction::Create,
            json!({"id": "x"}),
            None,
            None,
        );

        let vars = extractor.extract(&ctx).await;

        assert_eq!(vars["imam_name"], "");
        assert_eq!(vars["file_number"], "");
        // トピックが取り出せない場合は表示ラベルで補われる
        assert_eq!(vars["topic"], "申請フォーム");
    }

    #[tokio::test]
    async fn test_未知のテーブルはテーブル名がラベルになる() {
        let (extractor, _) = make_extractor();

        let ctx = NotificationContext::new(
            "Unknown_Table",
            TriggerAction::Create,
            json!({}),
            None,
            None,
        );

        let vars = extractor.extract(&ctx).await;

        assert_eq!(vars["table_label"], "Unknown_Table");
        assert_eq!(vars["topic"], "Unknown_Table");
    }

    #[tokio::test]
    async fn test_提出日はupdated_at優先でフォーマットされる() {
        let (extractor, _) = make_extractor();

        let ctx = NotificationContext::new(
            "Bonus_Requests",
            TriggerAction::Update,
            json!({
                "created_at": "2026-01-05T09:00:00+00:00",
                "updated_at": "2026-03-18T12:30:00+00:00",
            }),
            None,
            None,
        );

        let vars = extractor.extract(&ctx).await;

        assert_eq!(vars["submission_date"], "2026年03月18日");
    }

    #[tokio::test]
    async fn test_提出日はupdated_atがなければcreated_atを使う() {
        let (extractor, _) = make_extractor();

        let ctx = NotificationContext::new(
            "Bonus_Requests",
            TriggerAction::Create,
            json!({"created_at": "2026-01-05T09:00:00+00:00"}),
            None,
            None,
        );

        let vars = extractor.extract(&ctx).await;

        assert_eq!(vars["submission_date"], "2026年01月05日");
    }

    #[tokio::test]
    async fn test_プロフィールが存在しなくても他の変数は抽出される() {
        let (extractor, _) = make_extractor();

        let ctx = NotificationContext::new(
            "Application_Forms",
            TriggerAction::Create,
            json!({
                "imam_profile_id": ProfileId::new().as_uuid().to_string(),
                "topic": "住居手当",
            }),
            None,
            None,
        );

        let vars = extractor.extract(&ctx).await;

        assert_eq!(vars["imam_name"], "");
        assert_eq!(vars["topic"], "住居手当");
    }
}
