//! # 通知フック
//!
//! コラボレータ（CRUD ユースケース層）が書き込みコミット後に呼ぶ
//! 唯一のエントリポイント。
//!
//! ## 設計方針
//!
//! - **fire-and-forget**: [`NotificationHook::notify`] は即座に制御を返し、
//!   テンプレート解決から送信までの処理は呼び出し元から切り離された
//!   タスクとして実行される。内部のあらゆる失敗はログに記録されるだけで、
//!   元の書き込みの結果を変えることは決してない
//! - **セマフォによる上限**: 同時に処理する `notify()` 呼び出し数は
//!   設定値で制限し、送信先が多いイベントの連続発生で無制限にタスクが
//!   積み上がらないようにする
//! - **依存性注入**: リポジトリと送信基盤はすべて trait で注入され、
//!   インメモリモックでユニットテストできる
//!
//! ## 処理フロー
//!
//! 1. ステータス遷移を導出（新旧レコードの `status_id` 比較）
//! 2. `both` 区分のテンプレートを先に解決。見つかればそれだけを使い、
//!    なければ `imam` / `admin` を独立に解決
//! 3. 変数抽出 → 受信者解決（呼び出し元指定があれば全テンプレートに
//!    それを使用）→ レンダリング → 並行送信
//! 4. 配信結果を notification_logs に記録

use std::{collections::HashMap, sync::Arc};

use minber_domain::{
    clock::Clock,
    notification::{
        DeliveryResult,
        DispatchOutcome,
        NotificationContext,
        NotificationLogId,
    },
    template::{NotificationTemplate, RecipientSlot, TriggerAction},
};
use minber_infra::{
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
use minber_shared::{event_log::event, log_business_event};
use tokio::sync::Semaphore;

use crate::{
    config::NotifyConfig,
    dispatcher::{Dispatcher, RenderedMessage},
    recipient_resolver::RecipientResolver,
    renderer::Renderer,
    tables,
    template_resolver::TemplateResolver,
    variable_extractor::VariableExtractor,
};

/// 通知フック
///
/// プラットフォームの各ユースケースが共有する単一のインスタンス。
/// 呼び出しをまたいで共有される可変状態は持たない（セマフォの許可
/// カウント以外）。
pub struct NotificationHook {
    template_repo: Arc<dyn TemplateRepository>,
    log_repo:      Arc<dyn NotificationLogRepository>,
    extractor:          VariableExtractor,
    recipient_resolver: RecipientResolver,
    renderer:           Renderer,
    dispatcher:         Dispatcher,
    clock:     Arc<dyn Clock>,
    semaphore: Arc<Semaphore>,
}

impl NotificationHook {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        template_repo: Arc<dyn TemplateRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        user_repo: Arc<dyn UserRepository>,
        conversation_repo: Arc<dyn ConversationRepository>,
        log_repo: Arc<dyn NotificationLogRepository>,
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
        config: &NotifyConfig,
    ) -> Self {
        let extractor = VariableExtractor::new(Arc::clone(&profile_repo));
        let recipient_resolver =
            RecipientResolver::new(profile_repo, user_repo, conversation_repo, config);
        let renderer = Renderer::new(config.base_url.clone());
        let dispatcher = Dispatcher::new(sender, config.send_timeout);

        Self {
            template_repo,
            log_repo,
            extractor,
            recipient_resolver,
            renderer,
            dispatcher,
            clock,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        }
    }

    /// 通知を依頼する（fire-and-forget）
    ///
    /// コミット済みのレコードを受け取り、即座に制御を返す。
    /// 処理は切り離されたタスクで実行され、結果は呼び出し元に返らない。
    ///
    /// # 呼び出し元の契約
    ///
    /// - `record` はコミット後の行（生成 ID・タイムスタンプを含む）であること
    /// - UPDATE では `previous_record` に書き込み前の行を渡すこと
    ///   （ステータス遷移の検出に使用する）
    /// - 書き込みが永続化される前に呼ばないこと
    pub fn notify(
        self: &Arc<Self>,
        table_name: impl Into<String>,
        action: TriggerAction,
        record: serde_json::Value,
        previous_record: Option<serde_json::Value>,
        explicit_recipients: Option<Vec<String>>,
    ) {
        let ctx = NotificationContext::new(
            table_name,
            action,
            record,
            previous_record,
            explicit_recipients,
        );

        let hook = Arc::clone(self);
        tokio::spawn(async move {
            let Ok(_permit) = hook.semaphore.clone().acquire_owned().await else {
                // セマフォはフックと同じ寿命のため close されない
                return;
            };
            hook.process(ctx).await;
        });
    }

    /// 通知処理の本体
    ///
    /// `notify()` から切り離されたタスクとして呼ばれる。
    /// テストからは直接 await して結果を検証できる。
    pub async fn process(&self, ctx: NotificationContext) -> DispatchOutcome {
        let templates = match self.template_repo.find_all_active().await {
            Ok(templates) => templates,
            Err(e) => {
                tracing::error!(error = %e, "テンプレートの取得に失敗。通知をスキップ");
                Vec::new()
            }
        };
        let resolver = TemplateResolver::new(templates);

        // both を先に解決。見つかればそれだけを使い、imam / admin の
        // 個別テンプレートは同一イベントに対して併用しない
        let selected = self.select_templates(&resolver, &ctx);

        if selected.is_empty() {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_SKIPPED,
                event.entity_type = event::entity_type::NOTIFICATION_TEMPLATE,
                event.result = event::result::FAILURE,
                reason = "no_active_template",
                table = %ctx.table_name,
                action = %ctx.action,
                "トリガーに一致する有効なテンプレートなし"
            );
            return DispatchOutcome::NoActiveTemplate;
        }

        let variables = self.extractor.extract(&ctx).await;
        let messages = self.build_messages(&selected, &variables, &ctx).await;

        // 記録用にレンダリング済み件名を控えてからディスパッチする
        let subjects: HashMap<String, String> = messages
            .iter()
            .map(|m| (m.template_name.clone(), m.subject.clone()))
            .collect();

        let outcome = self.dispatcher.dispatch(messages).await;

        if let DispatchOutcome::Dispatched { results, .. } = &outcome {
            self.record_results(&ctx, &subjects, results).await;
        }

        outcome
    }

    /// 受信者区分の優先順位に従ってテンプレートを選択する
    fn select_templates<'a>(
        &self,
        resolver: &'a TemplateResolver,
        ctx: &NotificationContext,
    ) -> Vec<&'a NotificationTemplate> {
        if let Some(both) = resolver.resolve(
            &ctx.table_name,
            ctx.action,
            ctx.status_id,
            RecipientSlot::Both,
        ) {
            return vec![both];
        }

        [RecipientSlot::Imam, RecipientSlot::Admin]
            .into_iter()
            .filter_map(|slot| {
                resolver.resolve(&ctx.table_name, ctx.action, ctx.status_id, slot)
            })
            .collect()
    }

    /// テンプレートと受信者からレンダリング済みメッセージを構築する
    async fn build_messages(
        &self,
        selected: &[&NotificationTemplate],
        variables: &std::collections::BTreeMap<String, String>,
        ctx: &NotificationContext,
    ) -> Vec<RenderedMessage> {
        let mut messages = Vec::new();

        // メッセージ作成イベントは会話ファンアウト: 受信者ごとに独立した
        // メッセージとしてレンダリング・送信し、1 人の失敗が他を妨げない
        if ctx.table_name == tables::MESSAGES_TABLE && ctx.explicit_recipients.is_none() {
            let recipients = self.recipient_resolver.resolve_conversation(ctx).await;
            for template in selected {
                for recipient in &recipients {
                    let rendered = self.renderer.render(template, variables);
                    messages.push(RenderedMessage {
                        template_name: template.name.clone(),
                        subject:       rendered.subject,
                        body:          rendered.body,
                        recipients:    vec![recipient.clone()],
                    });
                }
            }
            return messages;
        }

        for template in selected {
            // 呼び出し元指定の受信者は、この呼び出しで送るすべての
            // テンプレートにそのまま使われる
            let recipients = match &ctx.explicit_recipients {
                Some(explicit) => explicit.clone(),
                None => {
                    self.recipient_resolver
                        .resolve_slot(template.recipient_slot, ctx)
                        .await
                }
            };

            let rendered = self.renderer.render(template, variables);
            messages.push(RenderedMessage {
                template_name: template.name.clone(),
                subject: rendered.subject,
                body: rendered.body,
                recipients,
            });
        }

        messages
    }

    /// 配信結果を notification_logs に記録する
    ///
    /// 記録の失敗はログ出力のみで握りつぶす。
    async fn record_results(
        &self,
        ctx: &NotificationContext,
        subjects: &HashMap<String, String>,
        results: &[DeliveryResult],
    ) {
        let now = self.clock.now();
        for result in results {
            let log = NotificationLog {
                id: NotificationLogId::new(),
                table_name: ctx.table_name.clone(),
                action: ctx.action.to_string(),
                template_name: result.template_name.clone(),
                recipient_email: result.recipient.clone(),
                subject: subjects
                    .get(&result.template_name)
                    .cloned()
                    .unwrap_or_default(),
                status: if result.success { "sent" } else { "failed" }.to_string(),
                error_message: result.error.clone(),
                sent_at: now,
            };

            if let Err(e) = self.log_repo.insert(&log).await {
                tracing::error!(error = %e, "通知ログの記録に失敗");
            }
        }
    }
}
