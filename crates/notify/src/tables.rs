//! # ドメインテーブルの静的マッピング
//!
//! テーブル名 → 表示ラベル・トピックの取り出し方・プロフィール外部キーの
//! 静的対応表。変数抽出と受信者解決の両方から参照される。
//!
//! 未知のテーブルはマッピングなしとして扱い、ラベルはテーブル名そのもの、
//! テーブル固有の変数は空文字列になる。

use minber_domain::{
    conversation::ConversationId,
    notification::NotificationContext,
    profile::ProfileId,
    user::UserId,
};
use uuid::Uuid;

/// メッセージテーブル名（会話ファンアウトの特別扱い対象）
pub(crate) const MESSAGES_TABLE: &str = "Messages";

/// トピック変数の取り出し方
pub(crate) enum TopicSource {
    /// レコードの単一フィールドをそのままコピー
    Field(&'static str),
    /// `name` + 半角スペース + `surname` の連結（プロフィール系テーブル）
    FullName,
    /// `body` フィールドの先頭を固定長に切り詰めたプレビュー
    MessagePreview,
}

/// テーブルごとの静的マッピング
pub(crate) struct TableMapping {
    /// 人間可読の表示ラベル
    pub label:      &'static str,
    /// トピック変数の取り出し方
    pub topic:      TopicSource,
    /// プロフィールエンティティへの外部キーのフィールド名
    pub profile_fk: Option<&'static str>,
}

/// テーブル名 → マッピングの静的対応表
static MAPPINGS: &[(&str, TableMapping)] = &[
    (
        "Imam_Profiles",
        TableMapping {
            label:      "イマームプロフィール",
            topic:      TopicSource::FullName,
            profile_fk: Some("id"),
        },
    ),
    (
        "Application_Forms",
        TableMapping {
            label:      "申請フォーム",
            topic:      TopicSource::Field("topic"),
            profile_fk: Some("imam_profile_id"),
        },
    ),
    (
        "Bonus_Requests",
        TableMapping {
            label:      "ボーナス申請",
            topic:      TopicSource::Field("title"),
            profile_fk: Some("imam_profile_id"),
        },
    ),
    (
        "Trainings",
        TableMapping {
            label:      "研修",
            topic:      TopicSource::Field("description"),
            profile_fk: Some("imam_profile_id"),
        },
    ),
    (
        MESSAGES_TABLE,
        TableMapping {
            label:      "メッセージ",
            topic:      TopicSource::MessagePreview,
            profile_fk: None,
        },
    ),
];

/// テーブル名からマッピングを引く
pub(crate) fn mapping_for(table_name: &str) -> Option<&'static TableMapping> {
    MAPPINGS
        .iter()
        .find(|(name, _)| *name == table_name)
        .map(|(_, mapping)| mapping)
}

/// コンテキストのレコードからプロフィール ID を導出する
///
/// テーブルマッピングが外部キーを持たない、またはフィールドが
/// UUID としてパースできない場合は `None`。
pub(crate) fn profile_id_of(ctx: &NotificationContext) -> Option<ProfileId> {
    let fk = mapping_for(&ctx.table_name)?.profile_fk?;
    let raw = ctx.field_str(fk)?;
    Uuid::parse_str(&raw).ok().map(ProfileId::from_uuid)
}

/// コンテキストのレコードから会話 ID を導出する
pub(crate) fn conversation_id_of(ctx: &NotificationContext) -> Option<ConversationId> {
    let raw = ctx.field_str("conversation_id")?;
    Uuid::parse_str(&raw).ok().map(ConversationId::from_uuid)
}

/// コンテキストのレコードから送信者ユーザー ID を導出する
pub(crate) fn sender_id_of(ctx: &NotificationContext) -> Option<UserId> {
    let raw = ctx.field_str("sender_id")?;
    Uuid::parse_str(&raw).ok().map(UserId::from_uuid)
}
