//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use tally_shared::types::UserId;
use uuid::Uuid;

use crate::error::ApiError;

/// Header naming the user on whose behalf the request is made.
pub const USER_HEADER: &str = "x-user-id";

/// Optional acting user, read from the `X-User-Id` header.
///
/// Identity is established upstream; this only carries it into
/// `created_by` and `posted_by`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Actor(pub Option<UserId>);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_HEADER) else {
            return Ok(Self(None));
        };

        value
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(|id| Self(Some(UserId::from_uuid(id))))
            .ok_or_else(|| ApiError::bad_request("INVALID_USER_ID", "X-User-Id must be a UUID"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<Actor, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_HEADER, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        assert_eq!(extract(None).await.unwrap(), Actor(None));
    }

    #[tokio::test]
    async fn test_valid_header() {
        let id = Uuid::now_v7();
        let actor = extract(Some(&id.to_string())).await.unwrap();
        assert_eq!(actor, Actor(Some(UserId::from_uuid(id))));
    }

    #[tokio::test]
    async fn test_malformed_header_rejected() {
        let err = extract(Some("not-a-uuid")).await.unwrap_err();
        assert_eq!(err.0.error_code(), "INVALID_USER_ID");
    }
}
