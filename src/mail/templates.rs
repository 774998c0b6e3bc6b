use askama::Template;
use reqwest::Url;

use crate::errors::AppError;
use crate::models::EmailData;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailAction {
    Signup,
    Recovery,
    MagicLink,
    Other(String),
}

impl EmailAction {
    pub fn parse(action: &str) -> Self {
        match action.trim() {
            "signup" => EmailAction::Signup,
            "recovery" => EmailAction::Recovery,
            "magiclink" => EmailAction::MagicLink,
            other => EmailAction::Other(other.to_string()),
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            EmailAction::Signup => "Подтвердите регистрацию на HARDY Portal",
            EmailAction::Recovery => "Восстановление пароля HARDY Portal",
            EmailAction::MagicLink => "Вход на HARDY Portal",
            EmailAction::Other(_) => "Подтверждение действия на HARDY Portal",
        }
    }
}

#[derive(Template)]
#[template(path = "email/signup.html")]
struct SignupEmail<'a> {
    link: &'a str,
    token: &'a str,
}

#[derive(Template)]
#[template(path = "email/recovery.html")]
struct RecoveryEmail<'a> {
    link: &'a str,
    token: &'a str,
}

#[derive(Template)]
#[template(path = "email/magiclink.html")]
struct MagicLinkEmail<'a> {
    link: &'a str,
    token: &'a str,
}

#[derive(Template)]
#[template(path = "email/generic.html")]
struct GenericEmail<'a> {
    action: &'a str,
    link: &'a str,
    token: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// `{auth_base_url}/auth/v1/verify?token=..&type=..&redirect_to=..`
pub fn verification_link(auth_base_url: &str, data: &EmailData) -> Result<String, AppError> {
    let base = format!("{}/auth/v1/verify", auth_base_url.trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .map_err(|e| AppError::Unexpected(format!("invalid auth base url '{auth_base_url}': {e}")))?;
    url.query_pairs_mut()
        .append_pair("token", &data.token_hash)
        .append_pair("type", &data.email_action_type)
        .append_pair("redirect_to", &data.redirect_to);
    Ok(url.into())
}

pub fn render(action: &EmailAction, link: &str, token: &str) -> Result<RenderedEmail, AppError> {
    let html = match action {
        EmailAction::Signup => SignupEmail { link, token }.render()?,
        EmailAction::Recovery => RecoveryEmail { link, token }.render()?,
        EmailAction::MagicLink => MagicLinkEmail { link, token }.render()?,
        EmailAction::Other(name) => GenericEmail { action: name, link, token }.render()?,
    };
    Ok(RenderedEmail { subject: action.subject().to_string(), html })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(action: &str) -> EmailData {
        EmailData {
            token: "123456".into(),
            token_hash: "hash-abc".into(),
            redirect_to: "https://portal.example/welcome?x=1".into(),
            email_action_type: action.into(),
            site_url: "https://portal.example".into(),
        }
    }

    #[test]
    fn actions_parse() {
        assert_eq!(EmailAction::parse("signup"), EmailAction::Signup);
        assert_eq!(EmailAction::parse("recovery"), EmailAction::Recovery);
        assert_eq!(EmailAction::parse("magiclink"), EmailAction::MagicLink);
        assert_eq!(EmailAction::parse("email_change"), EmailAction::Other("email_change".into()));
    }

    #[test]
    fn link_is_url_encoded() {
        let link = verification_link("https://auth.example/", &data("signup")).unwrap();
        assert_eq!(
            link,
            "https://auth.example/auth/v1/verify?token=hash-abc&type=signup\
             &redirect_to=https%3A%2F%2Fportal.example%2Fwelcome%3Fx%3D1"
        );
    }

    #[test]
    fn each_action_gets_its_own_template() {
        let signup = render(&EmailAction::Signup, "https://l", "111111").unwrap();
        assert!(signup.html.contains("Подтвердить email"));
        assert!(signup.html.contains("111111"));
        assert_eq!(signup.subject, EmailAction::Signup.subject());

        let recovery = render(&EmailAction::Recovery, "https://l", "1").unwrap();
        assert!(recovery.html.contains("Сбросить пароль"));

        let magic = render(&EmailAction::MagicLink, "https://l", "1").unwrap();
        assert!(magic.html.contains("Войти"));

        let other = render(&EmailAction::Other("invite".into()), "https://l", "1").unwrap();
        assert!(other.html.contains("invite"));
    }

    #[test]
    fn link_is_html_escaped_in_body() {
        let email = render(&EmailAction::Signup, "https://l/?a=1&b=2", "1").unwrap();
        assert!(email.html.contains("a=1&"));
        assert!(!email.html.contains("a=1&b=2"));
    }
}
