use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use finlink_core::errors::{Error, Result};
use finlink_core::identity::IdentityProvider;

use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::main_lib::AppState;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// Verifies HS256 bearer tokens and resolves them to their subject.
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        Self {
            decoding_key: DecodingKey::from_secret(&config.secret),
            validation,
        }
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn verify(&self, token: &str) -> Result<String> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|err| {
            let reason = match err.kind() {
                ErrorKind::ExpiredSignature => "token expired",
                ErrorKind::InvalidSignature => "invalid signature",
                ErrorKind::InvalidIssuer => "invalid issuer",
                ErrorKind::InvalidAudience => "invalid audience",
                ErrorKind::MissingRequiredClaim(_) => "missing required claim",
                _ => "invalid token",
            };
            Error::Unauthorized(reason.to_string())
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(Error::Unauthorized("empty subject".to_string()));
        }
        Ok(data.claims.sub)
    }
}

/// Subject of the verified bearer token, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    let mut parts = header.splitn(2, ' ');
    let (Some(scheme), Some(token)) = (parts.next(), parts.next()) else {
        return None;
    };
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn authenticate(state: &AppState, request: &Request<Body>) -> std::result::Result<String, ApiError> {
    let Some(identity) = state.identity.as_ref() else {
        return Err(ApiError::Unauthorized(
            "Authentication is not configured for this server".to_string(),
        ));
    };

    let token = bearer_token(request)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;
    Ok(identity.verify(token)?)
}

pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let user_id = authenticate(&state, &request)?;
    request.extensions_mut().insert(AuthenticatedUser(user_id));
    Ok(next.run(request).await)
}

/// Admits only subjects listed in `FL_OPERATOR_SUBJECTS`.
pub async fn require_operator(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let user_id = authenticate(&state, &request)?;
    if !state.operators.contains(&user_id) {
        tracing::warn!("Subject {} tried to run an operator task", user_id);
        return Err(ApiError::Forbidden("Operator access required".to_string()));
    }
    request.extensions_mut().insert(AuthenticatedUser(user_id));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &[u8] = b"test-secret-test-secret-test-sec";

    fn jwt_config(issuer: Option<&str>, audience: Option<&str>) -> JwtConfig {
        JwtConfig {
            secret: SECRET.to_vec(),
            issuer: issuer.map(str::to_string),
            audience: audience.map(str::to_string),
        }
    }

    fn token(claims: serde_json::Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn in_one_hour() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() + 3600
    }

    #[test]
    fn test_verify_returns_subject() {
        let provider = JwtIdentityProvider::new(&jwt_config(None, None));
        let token = token(serde_json::json!({ "sub": "user-1", "exp": in_one_hour() }));
        assert_eq!(provider.verify(&token).unwrap(), "user-1");
    }

    #[test]
    fn test_verify_rejects_expired_and_foreign_tokens() {
        let provider = JwtIdentityProvider::new(&jwt_config(None, None));

        let expired = token(serde_json::json!({ "sub": "user-1", "exp": 1_000 }));
        assert!(matches!(
            provider.verify(&expired),
            Err(Error::Unauthorized(_))
        ));

        let foreign = encode(
            &Header::default(),
            &serde_json::json!({ "sub": "user-1", "exp": in_one_hour() }),
            &EncodingKey::from_secret(b"another-secret"),
        )
        .unwrap();
        assert!(matches!(
            provider.verify(&foreign),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_verify_requires_subject() {
        let provider = JwtIdentityProvider::new(&jwt_config(None, None));
        let token = token(serde_json::json!({ "exp": in_one_hour() }));
        assert!(matches!(provider.verify(&token), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_verify_checks_configured_issuer_and_audience() {
        let provider = JwtIdentityProvider::new(&jwt_config(Some("finlink"), Some("web")));

        let good = token(serde_json::json!({
            "sub": "user-1", "exp": in_one_hour(), "iss": "finlink", "aud": "web"
        }));
        assert_eq!(provider.verify(&good).unwrap(), "user-1");

        let wrong_issuer = token(serde_json::json!({
            "sub": "user-1", "exp": in_one_hour(), "iss": "other", "aud": "web"
        }));
        assert!(provider.verify(&wrong_issuer).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let request = |value: &str| {
            Request::builder()
                .header(AUTHORIZATION, value)
                .body(Body::empty())
                .unwrap()
        };
        assert_eq!(bearer_token(&request("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&request("bearer  abc ")), Some("abc"));
        assert_eq!(bearer_token(&request("Basic abc")), None);
        assert_eq!(bearer_token(&request("Bearer ")), None);
    }
}
