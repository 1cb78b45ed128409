use std::{marker::PhantomData, sync::Arc};

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::{
    auth::{Claims, RequiredPermission, jwt::decode_token},
    error::AppError,
    services::ServiceContext,
    state::AppState,
};

// Auth guard: validate the bearer token and return its claims.
impl FromRequestParts<Arc<AppState>> for Claims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>().cloned() {
            return Ok(claims);
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized("Missing/invalid Authorization header"))?;

        let claims = decode_token(&state.jwt, token)?;
        parts.extensions.insert(claims.clone());
        Ok(claims)
    }
}

pub type AuthGuard = Claims;

/// Runs the capability gate for `P` before the handler body.
pub struct RequirePermission<P: RequiredPermission> {
    pub claims: Claims,
    _marker: PhantomData<P>,
}

impl<P> FromRequestParts<Arc<AppState>> for RequirePermission<P>
where
    P: RequiredPermission,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state).await?;

        ServiceContext::from_state(state)
            .capability_gate()
            .require(&claims.role, P::required())
            .await?;

        Ok(Self {
            claims,
            _marker: PhantomData,
        })
    }
}
