// Actor identity for incoming requests. The identity provider in front of
// this service puts the authenticated user id in the X-User-Id header;
// routes that mutate extract a Viewer and fail with 401 without one.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub user_id: i64,
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok());

        std::future::ready(match user_id {
            Some(id) if id > 0 => Ok(Viewer { user_id: id }),
            _ => Err(AppError::Unauthorized(
                "missing or invalid X-User-Id header".to_string(),
            )),
        })
    }
}
