//! Authentication provider for the Agora client.
//!
//! Attaches bearer tokens to HTTP requests. Token issuance (email login or
//! Discord OAuth) happens server-side; this module only carries the result.

use crate::session::Session;

/// Authentication credentials for the Agora API.
///
/// # Examples
///
/// ```rust
/// use agora_link::AuthProvider;
///
/// let auth = AuthProvider::jwt_token("eyJhbGc...".to_string());
/// assert!(auth.is_authenticated());
///
/// let anonymous = AuthProvider::none();
/// assert!(!anonymous.is_authenticated());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthProvider {
    /// Bearer token authentication
    JwtToken(String),

    /// Anonymous access (public listings only)
    #[default]
    None,
}

impl AuthProvider {
    /// Create bearer token authentication
    pub fn jwt_token(token: String) -> Self {
        Self::JwtToken(token)
    }

    /// Anonymous access
    pub fn none() -> Self {
        Self::None
    }

    /// Attach authentication headers to an HTTP request builder
    ///
    /// - JwtToken: `Authorization: Bearer <token>`
    /// - None: No headers
    pub fn apply_to_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::JwtToken(token) => request.bearer_auth(token),
            Self::None => request,
        }
    }

    /// Check if authentication is configured
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Where a request takes its credentials from.
///
/// A session-backed source re-reads the session on every call so a sign-in
/// or sign-out is picked up by the next request or reconnect without
/// rebuilding the client.
#[derive(Debug, Clone)]
pub(crate) enum AuthSource {
    Static(AuthProvider),
    Session {
        session: Session,
        fallback: AuthProvider,
    },
}

impl AuthSource {
    pub(crate) fn resolve(&self) -> AuthProvider {
        match self {
            AuthSource::Static(provider) => provider.clone(),
            AuthSource::Session { session, fallback } => match session.token() {
                Some(token) => AuthProvider::JwtToken(token),
                None => fallback.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoginResponse, UserSummary};

    #[test]
    fn test_auth_provider_creation() {
        let jwt = AuthProvider::jwt_token("token123".to_string());
        assert!(jwt.is_authenticated());

        let none = AuthProvider::none();
        assert!(!none.is_authenticated());
        assert_eq!(AuthProvider::default(), AuthProvider::None);
    }

    #[test]
    fn test_apply_bearer_header() {
        let client = reqwest::Client::new();
        let request = AuthProvider::jwt_token("abc".into())
            .apply_to_request(client.get("http://localhost/api/posts"))
            .build()
            .unwrap();
        assert_eq!(request.headers()["authorization"], "Bearer abc");

        let anonymous = AuthProvider::none()
            .apply_to_request(client.get("http://localhost/api/posts"))
            .build()
            .unwrap();
        assert!(anonymous.headers().get("authorization").is_none());
    }

    #[test]
    fn test_session_source_follows_sign_in() {
        let session = Session::new();
        let source = AuthSource::Session {
            session: session.clone(),
            fallback: AuthProvider::none(),
        };
        assert_eq!(source.resolve(), AuthProvider::None);

        session.sign_in(LoginResponse {
            access_token: "fresh".into(),
            user: UserSummary {
                id: 1,
                username: "ada".into(),
                display_name: None,
                avatar_url: None,
            },
            expires_at: None,
        });
        assert_eq!(source.resolve(), AuthProvider::JwtToken("fresh".into()));

        session.sign_out();
        assert_eq!(source.resolve(), AuthProvider::None);
    }
}
