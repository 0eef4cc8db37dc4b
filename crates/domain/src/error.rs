//! # ドメイン層エラー定義
//!
//! ビジネスルール違反やドメイン固有の例外状態を表現するエラー型。
//!
//! ## 設計方針
//!
//! - **型による分類**: エラーの種類を列挙型で明示し、パターンマッチで処理可能に
//! - **thiserror 活用**: `#[error(...)]` マクロでエラーメッセージを自動生成

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// 値オブジェクトの生成やドメインロジックの実行中に発生する
/// 例外状態を表現する。
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値がビジネスルールに違反している場合に使用する。
    ///
    /// # 例
    ///
    /// - メールアドレスの形式不正
    /// - 文字数制限の超過
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    ///
    /// 指定された ID のエンティティが存在しない場合に使用する。
    /// `entity_type` にはエンティティの種類（"ImamProfile" など）を指定し、
    /// エラーメッセージを具体的にする。
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"NotificationTemplate", "ImamProfile" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },
}
