//! # レンダラー
//!
//! テンプレートの件名・本文に変数を置換し、送信可能なメールを生成する。
//!
//! ## 設計方針
//!
//! - **2 つのプレースホルダ記法**: 歴史的経緯により `{{name}}` と `((name))`
//!   の両方が件名・本文ともに有効
//! - **単一パスのトークナイザ置換**: 正規表現 1 本の `replace_all` で
//!   両記法を一度に処理する。置換後のテキストは再走査しないため、
//!   変数値に含まれるリテラルの `{{` / `((` が二重置換されることはない
//! - **未解決のプレースホルダは空文字列**: 変数マップにないプレースホルダは
//!   そのまま残さず空文字列に落とす

use std::{collections::BTreeMap, sync::LazyLock};

use minber_domain::template::NotificationTemplate;
use regex::{Captures, Regex};
use url::Url;

/// `{{name}}` と `((name))` の両記法に一致するパターン
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}|\(\(\s*([A-Za-z0-9_]+)\s*\)\)")
        .expect("プレースホルダ正規表現は不変")
});

/// レンダリング済みメール
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    /// 件名
    pub subject: String,
    /// HTML 本文
    pub body:    String,
}

/// レンダラー
pub struct Renderer {
    base_url: String,
}

impl Renderer {
    /// 新しいレンダラーを作成する
    ///
    /// # 引数
    ///
    /// - `base_url`: アプリケーションのベース URL
    ///   （例: `https://app.minber.example.com`）。背景画像 URL の
    ///   書き換えと合成に使用する
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    /// テンプレートに変数を適用して件名・本文を生成する
    ///
    /// 呼び出し元が渡した変数に加えて、以下のテンプレート由来の変数を
    /// 上書きで追加する:
    ///
    /// - `background_image`: 背景画像 URL（[`Self::resolve_background_url`] 参照）
    /// - `login_url`: テンプレートのログイン URL フィールド
    pub fn render(
        &self,
        template: &NotificationTemplate,
        variables: &BTreeMap<String, String>,
    ) -> RenderedEmail {
        let mut vars = variables.clone();
        vars.insert(
            "background_image".to_string(),
            self.resolve_background_url(template).unwrap_or_default(),
        );
        vars.insert(
            "login_url".to_string(),
            template.login_url.clone().unwrap_or_default(),
        );

        RenderedEmail {
            subject: substitute(&template.subject, &vars),
            body:    substitute(&template.body, &vars),
        }
    }

    /// 背景画像 URL を解決する
    ///
    /// - 保存済みの表示リンクがあり、ホストがループバック/開発ホストの場合は
    ///   パスだけを残してベース URL に付け替える
    /// - 表示リンクがそれ以外のホストならそのまま使う
    /// - 表示リンクがなく、バイナリ画像データが行に存在する場合は
    ///   ID から正規の「画像表示 URL」を合成する
    fn resolve_background_url(&self, template: &NotificationTemplate) -> Option<String> {
        if let Some(stored) = &template.background_image_url {
            return match Url::parse(stored) {
                Ok(url) if is_dev_host(&url) => {
                    Some(format!("{}{}", self.base_url, url.path()))
                }
                _ => Some(stored.clone()),
            };
        }

        if template.has_background_image {
            return Some(format!(
                "{}/api/notification-templates/{}/image",
                self.base_url, template.id
            ));
        }

        None
    }
}

/// ループバック/開発ホストか
fn is_dev_host(url: &Url) -> bool {
    matches!(
        url.host_str(),
        Some("localhost" | "127.0.0.1" | "0.0.0.0" | "::1" | "[::1]")
    )
}

/// 単一パスのプレースホルダ置換
///
/// 入力テキストを一度だけ走査し、各プレースホルダを変数マップの値
/// （なければ空文字列）に置き換える。置換結果は再走査されない。
fn substitute(text: &str, vars: &BTreeMap<String, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            vars.get(name).cloned().unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use minber_domain::template::{RecipientSlot, TemplateId};
    use pretty_assertions::assert_eq;

    use super::*;

    fn make_template(subject: &str, body: &str) -> NotificationTemplate {
        NotificationTemplate {
            id: TemplateId::new(),
            name: "テスト".to_string(),
            recipient_slot: RecipientSlot::Imam,
            triggers: Vec::new(),
            subject: subject.to_string(),
            body: body.to_string(),
            active: true,
            login_url: None,
            background_image_url: None,
            has_background_image: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_波括弧記法と丸括弧記法の両方が置換される() {
        let template = make_template(
            "{{imam_name}} 様",
            "<p>((imam_name)) 様の {{topic}} について</p>",
        );
        let renderer = Renderer::new("http://localhost:5173");

        let rendered = renderer.render(
            &template,
            &vars(&[("imam_name", "Ahmet Yılmaz"), ("topic", "休暇申請")]),
        );

        assert_eq!(rendered.subject, "Ahmet Yılmaz 様");
        assert_eq!(
            rendered.body,
            "<p>Ahmet Yılmaz 様の 休暇申請 について</p>"
        );
    }

    #[test]
    fn test_プレースホルダ内の空白は許容される() {
        let template = make_template("{{ topic }}", "(( topic ))");
        let renderer = Renderer::new("http://localhost:5173");

        let rendered = renderer.render(&template, &vars(&[("topic", "研修")]));

        assert_eq!(rendered.subject, "研修");
        assert_eq!(rendered.body, "研修");
    }

    #[test]
    fn test_変数値に含まれるプレースホルダは再置換されない() {
        // 置換は単一パス: 値の中の {{admin}} はそのまま残る
        let template = make_template("Hello {{name}}", "");
        let renderer = Renderer::new("http://localhost:5173");

        let rendered = renderer.render(
            &template,
            &vars(&[("name", "{{admin}}"), ("admin", "ここには展開されない")]),
        );

        assert_eq!(rendered.subject, "Hello {{admin}}");
    }

    #[test]
    fn test_変数値の丸括弧記法も再置換されない() {
        let template = make_template("{{name}}", "");
        let renderer = Renderer::new("http://localhost:5173");

        let rendered = renderer.render(
            &template,
            &vars(&[("name", "((nested))"), ("nested", "X")]),
        );

        assert_eq!(rendered.subject, "((nested))");
    }

    #[test]
    fn test_未解決のプレースホルダは空文字列になる() {
        let template = make_template("[{{unknown}}]", "<p>((missing))</p>");
        let renderer = Renderer::new("http://localhost:5173");

        let rendered = renderer.render(&template, &BTreeMap::new());

        assert_eq!(rendered.subject, "[]");
        assert_eq!(rendered.body, "<p></p>");
    }

    // ===== 背景画像 URL =====

    #[test]
    fn test_開発ホストの表示リンクはベースurlに付け替えられる() {
        let mut template = make_template("", "{{background_image}}");
        template.background_image_url =
            Some("http://localhost:3000/uploads/bg-42.png".to_string());
        let renderer = Renderer::new("https://app.minber.example.com");

        let rendered = renderer.render(&template, &BTreeMap::new());

        assert_eq!(
            rendered.body,
            "https://app.minber.example.com/uploads/bg-42.png"
        );
    }

    #[test]
    fn test_本番ホストの表示リンクはそのまま使われる() {
        let mut template = make_template("", "((background_image))");
        template.background_image_url =
            Some("https://cdn.minber.example.com/uploads/bg-42.png".to_string());
        let renderer = Renderer::new("https://app.minber.example.com");

        let rendered = renderer.render(&template, &BTreeMap::new());

        assert_eq!(
            rendered.body,
            "https://cdn.minber.example.com/uploads/bg-42.png"
        );
    }

    #[test]
    fn test_表示リンクがなく画像データがある場合はurlを合成する() {
        let mut template = make_template("", "{{background_image}}");
        template.has_background_image = true;
        let template_id = template.id.clone();
        let renderer = Renderer::new("https://app.minber.example.com");

        let rendered = renderer.render(&template, &BTreeMap::new());

        assert_eq!(
            rendered.body,
            format!(
                "https://app.minber.example.com/api/notification-templates/{template_id}/image"
            )
        );
    }

    #[test]
    fn test_画像がない場合は空文字列になる() {
        let template = make_template("", "[{{background_image}}]");
        let renderer = Renderer::new("https://app.minber.example.com");

        let rendered = renderer.render(&template, &BTreeMap::new());

        assert_eq!(rendered.body, "[]");
    }

    #[test]
    fn test_login_urlはテンプレートのフィールドから置換される() {
        let mut template = make_template("", r#"<a href="{{login_url}}">ログイン</a>"#);
        template.login_url = Some("https://app.minber.example.com/login".to_string());
        let renderer = Renderer::new("https://app.minber.example.com");

        let rendered = renderer.render(&template, &BTreeMap::new());

        assert_eq!(
            rendered.body,
            r#"<a href="https://app.minber.example.com/login">ログイン</a>"#
        );
    }

    #[test]
    fn test_background_imageは両記法で置換される() {
        let mut template = make_template("{{background_image}}", "((background_image))");
        template.background_image_url =
            Some("http://127.0.0.1:3000/uploads/bg.png".to_string());
        let renderer = Renderer::new("https://app.minber.example.com");

        let rendered = renderer.render(&template, &BTreeMap::new());

        assert_eq!(
            rendered.subject,
            "https://app.minber.example.com/uploads/bg.png"
        );
        assert_eq!(rendered.subject, rendered.body);
    }
}
