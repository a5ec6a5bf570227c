//! Token authentication: `Authorization: Token <key>`.

use std::sync::Arc;

use api_ingress::problem::ProblemResponse;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, StatusCode};

use crate::api::rest::error::{from_parts, map_domain_error};
use crate::contract::model::{User, UserId};
use crate::domain::error::DomainError;
use crate::domain::service::Service;

const SCHEME: &str = "Token";

/// The authenticated caller. Rejects with 401 when no valid token is sent.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }
}

/// The caller if a token was sent. A token that is sent but unknown is
/// still rejected with 401.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<UserId> {
        self.0.as_ref().map(|u| u.id)
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let instance = parts.uri.path().to_owned();
        match resolve(parts).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(map_domain_error(&DomainError::Unauthenticated, &instance)),
        }
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolve(parts).await.map(MaybeUser)
    }
}

async fn resolve(parts: &Parts) -> Result<Option<User>, ProblemResponse> {
    let instance = parts.uri.path().to_owned();
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let token = header
        .to_str()
        .ok()
        .and_then(parse_token)
        .ok_or_else(|| map_domain_error(&DomainError::Unauthenticated, &instance))?
        .to_owned();

    let svc = parts
        .extensions
        .get::<Arc<Service>>()
        .cloned()
        .ok_or_else(|| {
            tracing::error!("Recipes service is not installed on this route");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "Internal error",
                "Authentication is unavailable",
                &instance,
            )
        })?;

    match svc.authenticate(&token).await {
        Ok(user) => Ok(Some(user)),
        Err(e) => {
            tracing::debug!("Token rejected: {}", e);
            Err(map_domain_error(&e, &instance))
        }
    }
}

fn parse_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case(SCHEME) && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::parse_token;

    #[test]
    fn token_header_parsing() {
        assert_eq!(parse_token("Token abc123"), Some("abc123"));
        assert_eq!(parse_token("token  abc123 "), Some("abc123"));
        assert_eq!(parse_token("Bearer abc123"), None);
        assert_eq!(parse_token("Token "), None);
        assert_eq!(parse_token("abc123"), None);
    }
}
