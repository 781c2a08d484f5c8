//! Caller identity extraction.
//!
//! Authentication happens upstream; the proxy forwards the authenticated
//! user id in `x-user-id`. A missing or blank header means anonymous.

use crate::models::identity::Identity;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The optional caller identity. Never rejects a request.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<Identity>);

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(Identity::new);
        Ok(Caller(identity))
    }
}
