//! Authentication gate and identity resolution
//!
//! The server hands out a session id in an `atid` cookie. Synchronization does
//! not start until this step resolves.

use crate::config::{ClientConfig, IdentitySource};
use log::{info, warn};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::StatusCode;
use shared::PlayerIdentity;
use std::time::Duration;
use thiserror::Error;

pub const SESSION_COOKIE: &str = "atid";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("auth rejected with status {0}")]
    Rejected(StatusCode),
}

/// Session identity yielded by the auth step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Value for a `Cookie` request header, if there is a session.
    pub fn cookie_header(&self) -> Option<String> {
        self.token
            .as_ref()
            .map(|token| format!("{}={}", SESSION_COOKIE, token))
    }
}

/// Extracts the session id from a `Set-Cookie` header value.
pub fn parse_session_cookie(header: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

pub enum Authenticator {
    /// No auth request; an existing token may still be reused.
    Skip { token: Option<String> },
    Http(HttpAuthenticator),
}

impl Authenticator {
    pub fn from_config(config: &ClientConfig) -> Result<Self, AuthError> {
        if config.skip_auth {
            return Ok(Authenticator::Skip {
                token: config.session_token.clone(),
            });
        }

        Ok(Authenticator::Http(HttpAuthenticator::new(
            config.http_base(),
            config.session_token.clone(),
            config.request_timeout,
        )?))
    }

    pub async fn authenticate(&self) -> Result<Session, AuthError> {
        match self {
            Authenticator::Skip { token } => {
                info!("Skipping auth");
                Ok(Session {
                    token: token.clone(),
                })
            }
            Authenticator::Http(http) => http.authenticate().await,
        }
    }
}

pub struct HttpAuthenticator {
    http: reqwest::Client,
    base_url: String,
    existing_token: Option<String>,
}

impl HttpAuthenticator {
    pub fn new(
        base_url: impl Into<String>,
        existing_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            existing_token,
        })
    }

    pub async fn authenticate(&self) -> Result<Session, AuthError> {
        let url = format!("{}/auth", self.base_url);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.existing_token {
            request = request.header(COOKIE, format!("{}={}", SESSION_COOKIE, token));
        }

        info!("Authenticating with {}", url);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected(status));
        }

        let issued = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(parse_session_cookie);

        let token = match issued {
            Some(token) => {
                info!("Server issued a new session");
                Some(token)
            }
            None => self.existing_token.clone(),
        };

        Ok(Session { token })
    }
}

/// Picks the local player's identity from the configured source.
///
/// The session source needs a token; without one it falls back to the colour
/// parameter.
pub fn resolve_identity(
    source: IdentitySource,
    color_param: Option<&str>,
    session: &Session,
) -> PlayerIdentity {
    match (source, session.token()) {
        (IdentitySource::Session, Some(token)) => PlayerIdentity::new(token),
        (IdentitySource::Session, None) => {
            warn!("No session token to derive identity from, using colour parameter");
            PlayerIdentity::from_param(color_param)
        }
        (IdentitySource::Color, _) => PlayerIdentity::from_param(color_param),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_cookie() {
        assert_eq!(
            parse_session_cookie("atid=5b0c; Path=/;"),
            Some("5b0c".to_string())
        );
        assert_eq!(
            parse_session_cookie("theme=dark; atid=abc"),
            Some("abc".to_string())
        );
        assert_eq!(parse_session_cookie("atid=; Path=/"), None);
        assert_eq!(parse_session_cookie("other=1"), None);
    }

    #[test]
    fn test_cookie_header() {
        assert_eq!(Session::anonymous().cookie_header(), None);
        assert_eq!(
            Session::with_token("xyz").cookie_header(),
            Some("atid=xyz".to_string())
        );
    }

    #[test]
    fn test_resolve_identity_sources() {
        let session = Session::with_token("8c1f");

        assert_eq!(
            resolve_identity(IdentitySource::Session, Some("Red"), &session).as_str(),
            "8c1f"
        );
        assert_eq!(
            resolve_identity(IdentitySource::Color, Some("Red"), &session).as_str(),
            "Red"
        );
        assert_eq!(
            resolve_identity(IdentitySource::Color, None, &session).as_str(),
            "White"
        );
        assert_eq!(
            resolve_identity(IdentitySource::Session, None, &Session::anonymous()).as_str(),
            "White"
        );
    }

    #[tokio::test]
    async fn test_skip_auth_reuses_token() {
        let config = ClientConfig {
            skip_auth: true,
            session_token: Some("abc".to_string()),
            ..ClientConfig::default()
        };

        let authenticator = Authenticator::from_config(&config).unwrap();
        let session = tokio_test::assert_ok!(authenticator.authenticate().await);

        assert_eq!(session.token(), Some("abc"));
    }

    #[tokio::test]
    async fn test_http_auth_unreachable_server() {
        let authenticator =
            HttpAuthenticator::new("http://127.0.0.1:9", None, Duration::from_millis(200))
                .unwrap();

        let result = authenticator.authenticate().await;

        assert!(matches!(result, Err(AuthError::Http(_))));
    }
}
