//! # 会話
//!
//! メッセージ機能の会話識別子を定義する。
//!
//! メッセージ作成イベントのファンアウト（送信者を除く全参加者への
//! 個別配信）で、参加者一覧の取得キーとして使用される。
//! 会話・メッセージ本体の CRUD はプラットフォーム側が担う。

define_uuid_id! {
    /// 会話 ID（一意識別子）
    ///
    /// conversations テーブルの主キー。Messages レコードの
    /// `conversation_id` フィールドが参照する。
    pub struct ConversationId;
}
