//! # 通知テンプレート
//!
//! テンプレート駆動の通知配信を構成するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 意味 |
//! |---|------------|------|
//! | [`NotificationTemplate`] | 通知テンプレート | トリガールール・受信者区分・件名/本文を持つ永続レコード |
//! | [`TriggerRule`] | トリガールール | `(テーブル, アクション, 任意のステータス ID)` の組 |
//! | [`RecipientSlot`] | 受信者区分 | `imam` / `admin` / `both` の宛先カテゴリ |
//!
//! ## 設計方針
//!
//! - **読み取り専用**: テンプレートの作成・編集は管理画面側の CRUD が担い、
//!   通知エンジンからは一切変更しない
//! - **型付きトリガー**: トリガーは JSON カラムからロード時に一度だけ
//!   [`TriggerRule`] へデシリアライズし、判定処理で再パースしない
//! - **ステータス優先の非対称性**: ある `(テーブル, アクション)` にステータス
//!   指定ルールが 1 件でも存在する場合、汎用ルールはその組に対して適用されない
//!   （判定ロジックは notify クレートの TemplateResolver が担う）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

define_uuid_id! {
    /// 通知テンプレート ID（一意識別子）
    ///
    /// notification_templates テーブルの主キー。UUID v7 を使用するため、
    /// ID の降順ソートがそのまま作成順の新しい順になる。
    pub struct TemplateId;
}

/// 受信者区分
///
/// テンプレートの宛先カテゴリ。notification_templates テーブルの
/// `recipient_slot` カラムに snake_case で格納される。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecipientSlot {
    /// イマーム個人（対象レコードに紐づくプロフィールのメールアドレス）
    Imam,
    /// 管理者ロスター（設定の上書きリスト、または管理者ロールの全ユーザー）
    Admin,
    /// 両方（imam と admin の和集合。見つかった場合は単独で使用される）
    Both,
}

/// トリガーアクション
///
/// ドメインテーブルへの書き込み種別。トリガールールの `action` と
/// 通知コンテキストの `action` の両方で使用される。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum TriggerAction {
    /// レコード作成
    Create,
    /// レコード更新（ステータス遷移を含む）
    Update,
    /// レコード削除
    Delete,
}

/// トリガールール
///
/// テンプレートが発火する条件。`status_id` を持つルールは特定の
/// ステータス遷移でのみ発火し、持たないルールは汎用ルールとなる。
///
/// notification_templates テーブルの `triggers` JSON カラム
/// （ルールの配列）としてシリアライズされる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    /// 対象のドメインテーブル名（例: "Imam_Profiles"）
    pub table_name: String,
    /// 書き込み種別
    pub action:     TriggerAction,
    /// ステータス遷移指定（省略時は汎用ルール）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_id:  Option<i32>,
}

/// 通知テンプレート
///
/// 管理者が管理画面で作成・編集する永続レコード。
/// 通知エンジンはこれを読み取り専用で参照する。
#[derive(Debug, Clone)]
pub struct NotificationTemplate {
    /// テンプレート ID
    pub id: TemplateId,
    /// 表示ラベル（一意ではない）
    pub name: String,
    /// 受信者区分
    pub recipient_slot: RecipientSlot,
    /// トリガールール（型付き。ロード時に JSON から一度だけパース済み）
    pub triggers: Vec<TriggerRule>,
    /// 件名（`{{name}}` / `((name))` プレースホルダを含む）
    pub subject: String,
    /// 本文（HTML。プレースホルダを含む）
    pub body: String,
    /// 有効フラグ。無効のテンプレートは選択されない
    pub active: bool,
    /// ログイン URL（`login_url` プレースホルダの置換元）
    pub login_url: Option<String>,
    /// 背景画像の表示リンク（開発ホストの場合はレンダリング時に書き換え）
    pub background_image_url: Option<String>,
    /// バイナリ画像データが行に存在するか（表示リンクがない場合の URL 合成用）
    pub has_background_image: bool,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
}

impl NotificationTemplate {
    /// 指定の `(テーブル, アクション)` に一致するトリガーを列挙する
    pub fn triggers_for(
        &self,
        table_name: &str,
        action: TriggerAction,
    ) -> impl Iterator<Item = &TriggerRule> {
        self.triggers
            .iter()
            .filter(move |t| t.table_name == table_name && t.action == action)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn recipient_slot_の文字列変換が正しい() {
        assert_eq!(RecipientSlot::Imam.to_string(), "imam");
        assert_eq!(RecipientSlot::Admin.to_string(), "admin");
        assert_eq!(RecipientSlot::Both.to_string(), "both");

        assert_eq!(
            RecipientSlot::from_str("imam").unwrap(),
            RecipientSlot::Imam
        );
        assert_eq!(
            RecipientSlot::from_str("both").unwrap(),
            RecipientSlot::Both
        );
        assert!(RecipientSlot::from_str("everyone").is_err());
    }

    #[test]
    fn trigger_action_の文字列変換が正しい() {
        assert_eq!(TriggerAction::Create.to_string(), "CREATE");
        assert_eq!(TriggerAction::Update.to_string(), "UPDATE");
        assert_eq!(TriggerAction::Delete.to_string(), "DELETE");

        assert_eq!(
            TriggerAction::from_str("UPDATE").unwrap(),
            TriggerAction::Update
        );
        assert!(TriggerAction::from_str("update").is_err());
    }

    #[test]
    fn trigger_rule_はstatus_id省略のjsonをパースできる() {
        let rule: TriggerRule = serde_json::from_str(
            r#"{"table_name": "Imam_Profiles", "action": "CREATE"}"#,
        )
        .unwrap();

        assert_eq!(rule.table_name, "Imam_Profiles");
        assert_eq!(rule.action, TriggerAction::Create);
        assert_eq!(rule.status_id, None);
    }

    #[test]
    fn trigger_rule_はstatus_id付きのjsonをパースできる() {
        let rule: TriggerRule = serde_json::from_str(
            r#"{"table_name": "Application_Forms", "action": "UPDATE", "status_id": 2}"#,
        )
        .unwrap();

        assert_eq!(rule.status_id, Some(2));
    }

    #[test]
    fn triggers_for_はテーブルとアクションの両方で絞り込む() {
        let template = NotificationTemplate {
            id: TemplateId::new(),
            name: "テスト".to_string(),
            recipient_slot: RecipientSlot::Imam,
            triggers: vec![
                TriggerRule {
                    table_name: "Imam_Profiles".to_string(),
                    action:     TriggerAction::Update,
                    status_id:  Some(2),
                },
                TriggerRule {
                    table_name: "Imam_Profiles".to_string(),
                    action:     TriggerAction::Create,
                    status_id:  None,
                },
                TriggerRule {
                    table_name: "Messages".to_string(),
                    action:     TriggerAction::Update,
                    status_id:  None,
                },
            ],
            subject: String::new(),
            body: String::new(),
            active: true,
            login_url: None,
            background_image_url: None,
            has_background_image: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let matched: Vec<_> = template
            .triggers_for("Imam_Profiles", TriggerAction::Update)
            .collect();

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].status_id, Some(2));
    }
}
