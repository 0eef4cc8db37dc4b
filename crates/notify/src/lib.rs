//! # Minber 通知配信エンジン
//!
//! ドメインレコードの作成・更新・削除を契機に、テンプレート駆動で
//! メール通知を配信するエンジン。プラットフォームの CRUD ユースケースが
//! 書き込みコミット後に [`NotificationHook::notify`] を呼ぶだけで、
//! テンプレート解決から送信までがすべて呼び出し元から切り離されて実行される。
//!
//! ## 設計方針
//!
//! - **fire-and-forget**: 通知のあらゆる失敗は元の書き込みの結果を変えない。
//!   これがこのサブシステム全体の中心的な不変条件
//! - **型付きトリガーインデックス**: テンプレートのトリガーはロード時に
//!   一度だけ型付きルールへ変換し、判定のたびの JSON パースを行わない
//! - **依存性注入**: DB と送信基盤はすべて trait で注入され、
//!   インメモリモックでユニットテストできる
//!
//! ## パイプライン
//!
//! ```text
//! notify() ─▶ ステータス遷移の導出
//!          ─▶ TemplateResolver   (both 優先、なければ imam / admin)
//!          ─▶ VariableExtractor  (プロフィール・提出日・トピック)
//!          ─▶ RecipientResolver  (区分解決 / 明示指定 / 会話ファンアウト)
//!          ─▶ Renderer           ({{name}} と ((name)) の単一パス置換)
//!          ─▶ Dispatcher         (受信者ごとに並行送信、失敗分離)
//!          ─▶ notification_logs  (配信結果の記録)
//! ```

pub mod config;
pub mod dispatcher;
pub mod hook;
pub mod recipient_resolver;
pub mod renderer;
mod tables;
pub mod template_resolver;
pub mod variable_extractor;

pub use config::NotifyConfig;
pub use dispatcher::{Dispatcher, RenderedMessage};
pub use hook::NotificationHook;
pub use recipient_resolver::RecipientResolver;
pub use renderer::{RenderedEmail, Renderer};
pub use template_resolver::TemplateResolver;
pub use variable_extractor::VariableExtractor;
