//! Principal resolution from gateway-forwarded identity headers.
//!
//! Token verification happens upstream. This module only trusts the headers
//! named in [`AuthConfig`] and turns them into a [`Principal`] request
//! extension that handlers pick up through [`MaybePrincipal`] or
//! [`RequirePrincipal`].

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chord_core::catalog::PrincipalId;
use chord_core::config::AuthConfig;
use tracing::warn;

use crate::error::ApiError;

/// Authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// Numeric user id
    pub id: PrincipalId,
    /// Whether the caller holds the admin role
    pub is_admin: bool,
}

impl Principal {
    /// Reads a principal from `headers`, or `None` for anonymous callers.
    ///
    /// A present but non-numeric id header is treated as anonymous.
    pub fn from_headers(headers: &HeaderMap, auth: &AuthConfig) -> Option<Self> {
        let raw_id = headers.get(auth.principal_header.as_str())?;
        let id = match raw_id.to_str().ok().and_then(|v| v.trim().parse().ok()) {
            Some(id) => id,
            None => {
                warn!("Ignoring malformed {} header", auth.principal_header);
                return None;
            }
        };

        let is_admin = headers
            .get(auth.role_header.as_str())
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case("admin"));

        Some(Self { id, is_admin })
    }
}

/// Middleware attaching the caller's [`Principal`] to the request, if any.
pub async fn identify_principal(
    State(auth): State<Arc<AuthConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(principal) = Principal::from_headers(request.headers(), &auth) {
        request.extensions_mut().insert(principal);
    }
    next.run(request).await
}

/// Extracts the caller's principal if one was supplied.
#[derive(Debug, Clone, Copy)]
pub struct MaybePrincipal(pub Option<Principal>);

impl MaybePrincipal {
    /// Principal id, if authenticated.
    pub fn id(&self) -> Option<PrincipalId> {
        self.0.map(|p| p.id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybePrincipal {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(parts.extensions.get::<Principal>().copied()))
    }
}

/// Extracts the caller's principal, rejecting anonymous requests with 401.
#[derive(Debug, Clone, Copy)]
pub struct RequirePrincipal(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for RequirePrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(RequirePrincipal)
            .ok_or(ApiError::Unauthorized)
    }
}
