//! # ユーザー
//!
//! プラットフォーム利用者（管理者・職員・イマーム）のエンティティと
//! 値オブジェクトを定義する。
//!
//! ## 設計方針
//!
//! - **Newtype パターン**: UserId は UUID をラップし、型安全性を確保
//! - **バリデーション**: Email は生成時に検証ロジックを実行
//! - **読み取り専用**: 通知エンジンはユーザーを参照するだけで変更しない

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::DomainError;

define_uuid_id! {
    /// ユーザー ID（一意識別子）
    ///
    /// users テーブルの主キー。会話参加者の識別にも使用される。
    pub struct UserId;
}

/// メールアドレス（値オブジェクト）
///
/// 生成時にバリデーションを実行し、不正な値の作成を防ぐ。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// メールアドレスを作成する
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - `local@domain` の形式（両側が非空）
    /// - 最大 255 文字
    ///
    /// # エラー
    ///
    /// バリデーションに失敗した場合は `DomainError::Validation` を返す。
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }

        let Some((local, domain)) = value.split_once('@') else {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        };

        if local.is_empty() || domain.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        }

        if value.chars().count() > 255 {
            return Err(DomainError::Validation(
                "メールアドレスは 255 文字以内である必要があります".to_string(),
            ));
        }

        Ok(Self(value))
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所有権を持つ文字列に変換する
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ユーザーロール
///
/// users テーブルの `role` カラムに snake_case で格納される。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    /// 管理者（admin 受信者区分のロスター対象）
    Admin,
    /// 事務職員
    Staff,
    /// イマーム
    Imam,
}

/// ユーザー状態
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserStatus {
    /// 有効
    Active,
    /// 無効（退職・異動によるアクセス停止）
    Inactive,
}

/// ユーザー
///
/// 通知エンジンからは、管理者ロスターの解決と会話参加者の
/// メールアドレス解決のために読み取り専用で参照される。
#[derive(Debug, Clone)]
pub struct User {
    /// ユーザー ID
    pub id:     UserId,
    /// 表示名
    pub name:   String,
    /// メールアドレス（未登録の場合あり）
    pub email:  Option<Email>,
    /// ロール
    pub role:   UserRole,
    /// 状態
    pub status: UserStatus,
}

impl User {
    /// ユーザーが有効か
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// 管理者ロールか
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_email_は正常な形式を受け付ける() {
        let email = Email::new("hoca@minber.example.com").unwrap();
        assert_eq!(email.as_str(), "hoca@minber.example.com");
    }

    #[test]
    fn test_email_は前後の空白を除去する() {
        let email = Email::new("  hoca@minber.example.com  ").unwrap();
        assert_eq!(email.as_str(), "hoca@minber.example.com");
    }

    #[rstest]
    #[case("")]
    #[case("no-at-sign")]
    #[case("@domain.com")]
    #[case("local@")]
    fn test_email_は不正な形式を拒否する(#[case] value: &str) {
        assert!(Email::new(value).is_err());
    }

    #[test]
    fn test_email_は255文字を超えると拒否する() {
        let long_local = "a".repeat(250);
        assert!(Email::new(format!("{long_local}@example.com")).is_err());
    }

    #[test]
    fn test_is_admin_はロールで判定する() {
        let user = User {
            id:     UserId::new(),
            name:   "管理者".to_string(),
            email:  Some(Email::new("admin@minber.example.com").unwrap()),
            role:   UserRole::Admin,
            status: UserStatus::Active,
        };

        assert!(user.is_admin());
        assert!(user.is_active());
    }

    #[test]
    fn test_user_role_の文字列変換が正しい() {
        use std::str::FromStr;

        assert_eq!(UserRole::Admin.to_string(), "admin");
        assert_eq!(UserRole::from_str("imam").unwrap(), UserRole::Imam);
        assert_eq!(UserStatus::Active.to_string(), "active");
    }
}
