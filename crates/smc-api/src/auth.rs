use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

/// Header carrying the session token on every request after login.
pub const SESSION_HEADER: &str = "X-Session-Token";

/// Credentials for authenticating with the management server.
#[derive(Debug, Clone)]
pub struct Credential {
    /// API client authentication key.
    /// Generated at: Administration > Access Rights > API Clients.
    pub api_key: SecretString,
    /// Administrative domain to log in to. `None` logs in to the
    /// shared domain.
    pub domain: Option<String>,
}

impl Credential {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            api_key: api_key.into(),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Login request body.
    pub(crate) fn login_body(&self) -> Value {
        let mut body = json!({ "authenticationkey": self.api_key.expose_secret() });
        if let Some(ref domain) = self.domain {
            body["domain"] = Value::String(domain.clone());
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_body_includes_domain_only_when_set() {
        let plain = Credential::new("k3y".to_string());
        assert_eq!(plain.login_body(), json!({ "authenticationkey": "k3y" }));

        let scoped = plain.with_domain("Branch");
        assert_eq!(scoped.login_body()["domain"], "Branch");
    }

    #[test]
    fn debug_redacts_key() {
        let cred = Credential::new("super-secret".to_string());
        assert!(!format!("{cred:?}").contains("super-secret"));
    }
}
