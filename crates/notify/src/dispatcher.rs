//! # ディスパッチャ
//!
//! レンダリング済みメッセージを受信者ごとに並行送信し、
//! 配信結果を集計する。
//!
//! ## 設計方針
//!
//! - **受信者ごとの失敗分離**: 1 件の送信失敗は失敗として記録されるだけで、
//!   他の受信者への送信を中断も遅延もさせない
//! - **送信タイムアウト**: トランスポートは外部ネットワーク呼び出しのため、
//!   受信者 1 件ごとに上限時間を設ける。ハングした送信が後続イベントの
//!   並行処理を積み上げないようにする
//! - **順序保証なし**: 受信者間の配信順序は観測不能であり、保証しない

use std::{sync::Arc, time::Duration};

use minber_domain::notification::{DeliveryResult, DispatchOutcome, EmailMessage};
use minber_infra::notification::NotificationSender;
use minber_shared::{event_log::event, log_business_event};
use tokio::task::JoinSet;

/// レンダリング済みメッセージ（送信先一覧付き）
#[derive(Debug, Clone)]
pub struct RenderedMessage {
    /// 使用したテンプレートの表示ラベル
    pub template_name: String,
    /// 件名
    pub subject:       String,
    /// HTML 本文
    pub body:          String,
    /// 送信先アドレス一覧
    pub recipients:    Vec<String>,
}

/// ディスパッチャ
pub struct Dispatcher {
    sender:       Arc<dyn NotificationSender>,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>, send_timeout: Duration) -> Self {
        Self {
            sender,
            send_timeout,
        }
    }

    /// 全メッセージを受信者ごとに並行送信する
    ///
    /// 受信者の総数が 0 の場合は送信を一切行わず
    /// [`DispatchOutcome::RecipientResolutionEmpty`] を返す。
    /// それ以外は全送信の完了を待ち、成功・失敗を集計して返す。
    pub async fn dispatch(&self, messages: Vec<RenderedMessage>) -> DispatchOutcome {
        let total: usize = messages.iter().map(|m| m.recipients.len()).sum();

        if total == 0 {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_SKIPPED,
                event.result = event::result::FAILURE,
                reason = "recipient_resolution_empty",
                "受信者が 1 件も解決できなかったため送信なし"
            );
            return DispatchOutcome::RecipientResolutionEmpty;
        }

        let mut join_set = JoinSet::new();

        for message in messages {
            let RenderedMessage {
                template_name,
                subject,
                body,
                recipients,
            } = message;

            for recipient in recipients {
                let sender = Arc::clone(&self.sender);
                let send_timeout = self.send_timeout;
                let template_name = template_name.clone();
                let subject = subject.clone();
                let body = body.clone();

                join_set.spawn(async move {
                    let email = EmailMessage {
                        to:        recipient.clone(),
                        subject,
                        html_body: body,
                    };

                    match tokio::time::timeout(send_timeout, sender.send_email(&email)).await {
                        Ok(Ok(())) => DeliveryResult {
                            recipient,
                            template_name,
                            success: true,
                            error: None,
                        },
                        Ok(Err(e)) => DeliveryResult {
                            recipient,
                            template_name,
                            success: false,
                            error: Some(e.to_string()),
                        },
                        Err(_) => DeliveryResult {
                            recipient,
                            template_name,
                            success: false,
                            error: Some(format!(
                                "送信タイムアウト（{} 秒超過）",
                                send_timeout.as_secs()
                            )),
                        },
                    }
                });
            }
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(error = %e, "送信タスクの join に失敗");
                }
            }
        }

        let sent = results.iter().filter(|r| r.success).count();
        let failed = results.len() - sent;

        for result in results.iter().filter(|r| !r.success) {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_FAILED,
                event.result = event::result::FAILURE,
                notification.recipient = %result.recipient,
                notification.template = %result.template_name,
                error = result.error.as_deref().unwrap_or(""),
                "通知メール送信失敗"
            );
        }

        if sent > 0 {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_SENT,
                event.result = event::result::SUCCESS,
                notification.sent = sent,
                notification.failed = failed,
                "通知メール送信完了"
            );
        }

        DispatchOutcome::Dispatched {
            sent,
            failed,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use minber_domain::notification::NotificationError;
    use minber_infra::mock::MockNotificationSender;
    use pretty_assertions::assert_eq;

    use super::*;

    /// 遅い送信をシミュレートするテスト用センダー
    struct SlowSender {
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl NotificationSender for SlowSender {
        async fn send_email(&self, _email: &EmailMessage) -> Result<(), NotificationError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }

    fn make_message(recipients: &[&str]) -> RenderedMessage {
        RenderedMessage {
            template_name: "テスト通知".to_string(),
            subject:       "件名".to_string(),
            body:          "<p>本文</p>".to_string(),
            recipients:    recipients.iter().map(ToString::to_string).collect(),
        }
    }

    #[tokio::test]
    async fn test_受信者0件では送信せずrecipient_resolution_emptyを返す() {
        let sender = MockNotificationSender::new();
        let dispatcher = Dispatcher::new(Arc::new(sender.clone()), Duration::from_secs(5));

        let outcome = dispatcher.dispatch(vec![make_message(&[])]).await;

        assert!(matches!(outcome, DispatchOutcome::RecipientResolutionEmpty));
        assert!(sender.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn test_全受信者への送信が成功する() {
        let sender = MockNotificationSender::new();
        let dispatcher = Dispatcher::new(Arc::new(sender.clone()), Duration::from_secs(5));

        let outcome = dispatcher
            .dispatch(vec![make_message(&["a@x.com", "b@x.com", "c@x.com"])])
            .await;

        let DispatchOutcome::Dispatched { sent, failed, results } = outcome else {
            panic!("Dispatched であること");
        };
        assert_eq!(sent, 3);
        assert_eq!(failed, 0);
        assert_eq!(results.len(), 3);
        assert_eq!(sender.sent_emails().len(), 3);
    }

    #[tokio::test]
    async fn test_1件の送信失敗が他の受信者への配信を妨げない() {
        let sender = MockNotificationSender::new();
        sender.fail_for("b@x.com");
        let dispatcher = Dispatcher::new(Arc::new(sender.clone()), Duration::from_secs(5));

        let outcome = dispatcher
            .dispatch(vec![make_message(&["a@x.com", "b@x.com", "c@x.com"])])
            .await;

        let DispatchOutcome::Dispatched { sent, failed, results } = outcome else {
            panic!("Dispatched であること");
        };
        assert_eq!(sent, 2);
        assert_eq!(failed, 1);

        let failed_result = results.iter().find(|r| !r.success).unwrap();
        assert_eq!(failed_result.recipient, "b@x.com");
        assert!(failed_result.error.is_some());

        // 失敗した宛先以外の 2 件は実際に送信されている
        let sent_to: Vec<_> = sender.sent_emails().iter().map(|e| e.to.clone()).collect();
        assert!(sent_to.contains(&"a@x.com".to_string()));
        assert!(sent_to.contains(&"c@x.com".to_string()));
    }

    #[tokio::test]
    async fn test_複数メッセージの受信者がすべて送信される() {
        let sender = MockNotificationSender::new();
        let dispatcher = Dispatcher::new(Arc::new(sender.clone()), Duration::from_secs(5));

        let outcome = dispatcher
            .dispatch(vec![
                make_message(&["a@x.com"]),
                make_message(&["b@x.com", "c@x.com"]),
            ])
            .await;

        let DispatchOutcome::Dispatched { sent, .. } = outcome else {
            panic!("Dispatched であること");
        };
        assert_eq!(sent, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_タイムアウトした送信は失敗として記録される() {
        let slow = SlowSender {
            delay: Duration::from_secs(60),
        };
        let dispatcher = Dispatcher::new(Arc::new(slow), Duration::from_secs(1));

        let outcome = dispatcher.dispatch(vec![make_message(&["a@x.com"])]).await;

        let DispatchOutcome::Dispatched { sent, failed, results } = outcome else {
            panic!("Dispatched であること");
        };
        assert_eq!(sent, 0);
        assert_eq!(failed, 1);
        assert!(
            results[0]
                .error
                .as_deref()
                .unwrap_or("")
                .contains("タイムアウト")
        );
    }

    #[tokio::test]
    async fn test_失敗はdelivery_resultに集約され例外にならない() {
        let sender = MockNotificationSender::new();
        sender.fail_for("only@x.com");
        let dispatcher = Dispatcher::new(Arc::new(sender), Duration::from_secs(5));

        // 全滅しても DispatchOutcome が返る（panic もエラー伝播もしない）
        let outcome = dispatcher.dispatch(vec![make_message(&["only@x.com"])]).await;

        let DispatchOutcome::Dispatched { sent, failed, .. } = outcome else {
            panic!("Dispatched であること");
        };
        assert_eq!(sent, 0);
        assert_eq!(failed, 1);
    }
}
