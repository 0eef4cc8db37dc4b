//! # 通知
//!
//! 通知配信に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 意味 |
//! |---|------------|------|
//! | [`NotificationContext`] | 通知コンテキスト | 1 回の `notify()` 呼び出しの入力（呼び出しスタックだけが所有） |
//! | [`DeliveryResult`] | 配信結果 | 受信者 × テンプレートごとの送信成否 |
//! | [`DispatchOutcome`] | ディスパッチ結果 | 1 回の呼び出し全体の観測可能な結末 |
//!
//! ## 設計方針
//!
//! - **fire-and-forget**: 通知配信の失敗は元の書き込み操作に影響しない。
//!   ここで定義する結果型はログとテストのためにあり、呼び出し元へは返らない
//! - **エフェメラル**: コンテキストと結果は 1 回の呼び出し内で生成・破棄され、
//!   呼び出しをまたいで共有される可変状態は存在しない

use serde_json::Value;
use thiserror::Error;

use crate::template::TriggerAction;

define_uuid_id! {
    /// 通知ログ ID（一意識別子）
    ///
    /// notification_logs テーブルの主キー。UUID v7 を使用。
    pub struct NotificationLogId;
}

/// 通知処理エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    /// テンプレート内容が不正（トリガー JSON のパース失敗など）
    #[error("テンプレート内容が不正: {0}")]
    TemplateFailed(String),

    /// 依存先の参照（プロフィール、ロスター）に失敗
    #[error("参照に失敗: {0}")]
    LookupFailed(String),

    /// 通知ログの記録に失敗
    #[error("通知ログの記録に失敗: {0}")]
    LogFailed(String),
}

/// メールメッセージ
///
/// レンダリングの出力。NotificationSender に渡される。
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:        String,
    /// 件名
    pub subject:   String,
    /// HTML 本文
    pub html_body: String,
}

/// 通知コンテキスト
///
/// コミット済みの書き込み 1 件に対する通知判定の入力。
/// `notify()` 呼び出しごとに構築され、呼び出し内で破棄される。
#[derive(Debug, Clone)]
pub struct NotificationContext {
    /// 書き込みが発生したドメインテーブル名
    pub table_name: String,
    /// 書き込み種別
    pub action: TriggerAction,
    /// コミット後のレコード（生成 ID・タイムスタンプを含む）
    pub record: Value,
    /// 更新前のレコード（UPDATE の場合のみ）
    pub previous_record: Option<Value>,
    /// ステータス遷移先（`record.status_id` が `previous_record.status_id`
    /// と異なる場合のみ導出される）
    pub status_id: Option<i32>,
    /// 呼び出し元指定の受信者（指定時は受信者区分の解決を完全にバイパス）
    pub explicit_recipients: Option<Vec<String>>,
}

impl NotificationContext {
    /// 通知コンテキストを構築する
    ///
    /// ステータス遷移は `record.status_id` と `previous_record.status_id` の
    /// 比較で導出する。遷移がない場合（値が同一、または previous がない場合）
    /// は `status_id` を持たないコンテキストになる。
    pub fn new(
        table_name: impl Into<String>,
        action: TriggerAction,
        record: Value,
        previous_record: Option<Value>,
        explicit_recipients: Option<Vec<String>>,
    ) -> Self {
        let status_id = derive_status_transition(&record, previous_record.as_ref());

        Self {
            table_name: table_name.into(),
            action,
            record,
            previous_record,
            status_id,
            explicit_recipients,
        }
    }

    /// レコードのフィールドを参照する
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.record.get(key)
    }

    /// レコードのフィールドを文字列として取得する
    ///
    /// 文字列はそのまま、数値は 10 進表記に変換して返す。
    /// フィールドが存在しない・null の場合は `None`。
    pub fn field_str(&self, key: &str) -> Option<String> {
        value_to_string(self.record.get(key)?)
    }
}

/// ステータス遷移を導出する
///
/// 遷移とみなすのは「previous が存在し、かつ新旧の `status_id` が異なる」
/// 場合のみ。CREATE（previous なし）はステータス付きでも遷移ではない。
fn derive_status_transition(record: &Value, previous: Option<&Value>) -> Option<i32> {
    let previous = previous?;
    let new_status = value_to_i32(record.get("status_id")?);
    let old_status = previous.get("status_id").and_then(value_to_i32);

    if new_status == old_status { None } else { new_status }
}

/// JSON 値を i32 に強制変換する
///
/// レガシーデータではステータス ID が数値と数値文字列の両方で
/// 格納されているため、どちらも受け付ける。
pub fn value_to_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// JSON 値を文字列に変換する
///
/// 文字列はそのまま、数値・真偽値は表記化。null と複合値は `None`。
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 配信結果（受信者 × テンプレートごとに 1 件）
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    /// 送信先メールアドレス
    pub recipient:     String,
    /// 使用したテンプレートの表示ラベル
    pub template_name: String,
    /// 送信成否
    pub success:       bool,
    /// 失敗時のエラー内容
    pub error:         Option<String>,
}

/// ディスパッチ結果
///
/// 1 回の `notify()` 呼び出し全体の結末。ログとテストからのみ観測され、
/// 元の書き込みを行った呼び出し元には決して返らない。
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// トリガーに一致する有効なテンプレートがなかった（エラーではない）
    NoActiveTemplate,
    /// テンプレートは一致したが受信者が 1 件も解決できなかった（エラーではない）
    RecipientResolutionEmpty,
    /// 配信を実行した
    Dispatched {
        /// 成功した配信数
        sent:    usize,
        /// 失敗した配信数
        failed:  usize,
        /// 受信者ごとの配信結果
        results: Vec<DeliveryResult>,
    },
}

impl DispatchOutcome {
    /// 少なくとも 1 件の配信が成功したか
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Dispatched { sent, .. } if *sent > 0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_update_でステータスが変化した場合のみ遷移を導出する() {
        let ctx = NotificationContext::new(
            "Imam_Profiles",
            TriggerAction::Update,
            json!({"id": "x", "status_id": 2}),
            Some(json!({"id": "x", "status_id": 1})),
            None,
        );

        assert_eq!(ctx.status_id, Some(2));
    }

    #[test]
    fn test_update_でステータスが同一なら遷移なし() {
        let ctx = NotificationContext::new(
            "Imam_Profiles",
            TriggerAction::Update,
            json!({"id": "x", "status_id": 2}),
            Some(json!({"id": "x", "status_id": 2})),
            None,
        );

        assert_eq!(ctx.status_id, None);
    }

    #[test]
    fn test_create_はステータス付きでも遷移なし() {
        let ctx = NotificationContext::new(
            "Application_Forms",
            TriggerAction::Create,
            json!({"id": "x", "status_id": 1}),
            None,
            None,
        );

        assert_eq!(ctx.status_id, None);
    }

    #[test]
    fn test_ステータスidは数値文字列からも強制変換される() {
        let ctx = NotificationContext::new(
            "Bonus_Requests",
            TriggerAction::Update,
            json!({"status_id": "3"}),
            Some(json!({"status_id": 1})),
            None,
        );

        assert_eq!(ctx.status_id, Some(3));
    }

    #[test]
    fn test_value_to_i32_は数値と数値文字列を受け付ける() {
        assert_eq!(value_to_i32(&json!(5)), Some(5));
        assert_eq!(value_to_i32(&json!(" 7 ")), Some(7));
        assert_eq!(value_to_i32(&json!("abc")), None);
        assert_eq!(value_to_i32(&json!(null)), None);
    }

    #[test]
    fn test_field_str_は数値フィールドも表記化する() {
        let ctx = NotificationContext::new(
            "Imam_Profiles",
            TriggerAction::Create,
            json!({"name": "Ahmet", "file_number": 1042}),
            None,
            None,
        );

        assert_eq!(ctx.field_str("name"), Some("Ahmet".to_string()));
        assert_eq!(ctx.field_str("file_number"), Some("1042".to_string()));
        assert_eq!(ctx.field_str("missing"), None);
    }

    #[test]
    fn test_dispatch_outcome_は1件でも成功すれば配信成功とみなす() {
        let outcome = DispatchOutcome::Dispatched {
            sent:    1,
            failed:  2,
            results: Vec::new(),
        };
        assert!(outcome.is_delivered());

        let outcome = DispatchOutcome::Dispatched {
            sent:    0,
            failed:  3,
            results: Vec::new(),
        };
        assert!(!outcome.is_delivered());

        assert!(!DispatchOutcome::NoActiveTemplate.is_delivered());
    }
}
