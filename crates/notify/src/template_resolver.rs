//! # テンプレートリゾルバ
//!
//! トリガー（テーブル・アクション・任意のステータス遷移）と受信者区分から、
//! 適用すべきテンプレートを 1 件決定する。
//!
//! ## 設計方針
//!
//! - **型付きインデックス**: ロード済みテンプレートから
//!   `(テーブル, アクション)` → ルール一覧 のインデックスを一度だけ構築し、
//!   判定のたびの JSON パースや全件走査を行わない
//! - **ステータス優先の非対称性**: ある `(テーブル, アクション)` に
//!   ステータス指定ルールが 1 件でも存在する場合（どのテンプレート・
//!   どの受信者区分にあっても）、その組に対して汎用ルールは一切適用しない。
//!   汎用ルールが適用されるのは、ステータス指定ルールがその組に
//!   まったく存在しない場合だけ
//! - **新しい順の先勝ち**: 同一条件に複数テンプレートが一致した場合は
//!   最も新しく作成されたものを選ぶ（リポジトリが作成日時の降順で返し、
//!   その順序をインデックスが保存する）

use std::collections::HashMap;

use minber_domain::template::{NotificationTemplate, RecipientSlot, TriggerAction};

/// インデックスの 1 エントリ
///
/// `template_idx` は [`TemplateResolver::templates`] 上の位置。
/// テンプレートは新しい順に並んでいるため、小さいほど新しい。
struct IndexEntry {
    status_id:    Option<i32>,
    slot:         RecipientSlot,
    template_idx: usize,
}

/// テンプレートリゾルバ
///
/// 1 回の通知処理の間だけ生きる。テンプレート一覧を受け取って
/// インデックスを構築し、受信者区分ごとの解決に答える。
pub struct TemplateResolver {
    templates: Vec<NotificationTemplate>,
    index:     HashMap<(String, TriggerAction), Vec<IndexEntry>>,
}

impl TemplateResolver {
    /// テンプレート一覧からリゾルバを構築する
    ///
    /// `templates` は作成日時の降順（リポジトリの返却順）であること。
    /// 無効なテンプレートはインデックスに載せない。
    pub fn new(templates: Vec<NotificationTemplate>) -> Self {
        let mut index: HashMap<(String, TriggerAction), Vec<IndexEntry>> = HashMap::new();

        for (template_idx, template) in templates.iter().enumerate() {
            if !template.active {
                continue;
            }
            for rule in &template.triggers {
                index
                    .entry((rule.table_name.clone(), rule.action))
                    .or_default()
                    .push(IndexEntry {
                        status_id: rule.status_id,
                        slot: template.recipient_slot,
                        template_idx,
                    });
            }
        }

        Self { templates, index }
    }

    /// 適用すべきテンプレートを 1 件解決する
    ///
    /// ## 判定ルール
    ///
    /// `(table_name, action)` のルール集合に対して:
    ///
    /// 1. ステータス指定ルールが 1 件でも存在する場合、`status_id` が
    ///    その指定値と完全一致するルールだけが候補になる。遷移がない、
    ///    または一致するステータスがない場合は汎用ルールへ
    ///    フォールバックせず `None` を返す
    /// 2. ステータス指定ルールが存在しない場合、汎用ルール（status なし）が
    ///    候補になる
    /// 3. 候補のうち指定の受信者区分を持つ、最も新しいテンプレートを返す
    pub fn resolve(
        &self,
        table_name: &str,
        action: TriggerAction,
        status_id: Option<i32>,
        slot: RecipientSlot,
    ) -> Option<&NotificationTemplate> {
        let entries = self.index.get(&(table_name.to_string(), action))?;

        // 受信者区分をまたいで 1 件でもステータス指定があれば、
        // この (テーブル, アクション) では汎用ルールは無効
        let has_status_specific = entries.iter().any(|e| e.status_id.is_some());

        let wanted_status = if has_status_specific {
            Some(status_id?)
        } else {
            None
        };

        entries
            .iter()
            .filter(|e| e.slot == slot && e.status_id == wanted_status)
            .map(|e| e.template_idx)
            .min()
            .map(|idx| &self.templates[idx])
    }
}
