//! # イマームプロフィール
//!
//! ケース管理の中心エンティティであるイマームプロフィールを定義する。
//! 通知エンジンからは、変数抽出（氏名・整理番号）と imam 受信者区分の
//! メールアドレス解決のために読み取り専用で参照される。

use crate::user::{Email, UserId};

define_uuid_id! {
    /// イマームプロフィール ID（一意識別子）
    ///
    /// imam_profiles テーブルの主キー。申請フォームやボーナス申請などの
    /// ドメインレコードが外部キーで参照する。
    pub struct ProfileId;
}

/// イマームプロフィール
#[derive(Debug, Clone)]
pub struct ImamProfile {
    /// プロフィール ID
    pub id:          ProfileId,
    /// 紐づくログインユーザー（未紐づけの場合あり）
    pub user_id:     Option<UserId>,
    /// 名
    pub name:        String,
    /// 姓
    pub surname:     String,
    /// メールアドレス（未登録の場合あり）
    pub email:       Option<Email>,
    /// 整理番号
    pub file_number: Option<String>,
}

impl ImamProfile {
    /// 氏名（名 + 半角スペース + 姓）を返す
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}
