//! Cart owner resolution.
//!
//! A logged-in user owns their cart by user ID. Anyone else gets a guest key
//! minted on first use and kept in the session, so the same browser keeps
//! the same cart across requests.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use stockroom_core::{CartOwner, GuestKey};

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Extractor yielding the cart owner for the current request.
#[derive(Debug, Clone, Copy)]
pub struct CartIdentity(pub CartOwner);

impl<S> FromRequestParts<S> for CartIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        resolve_owner(session).await.map(Self)
    }
}

async fn resolve_owner(session: &Session) -> Result<CartOwner, AppError> {
    if let Some(user) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .map_err(session_error)?
    {
        return Ok(CartOwner::User(user.id));
    }

    let key = match session
        .get::<GuestKey>(session_keys::GUEST_CART_KEY)
        .await
        .map_err(session_error)?
    {
        Some(key) => key,
        None => {
            let key = GuestKey::generate();
            session
                .insert(session_keys::GUEST_CART_KEY, key)
                .await
                .map_err(session_error)?;
            tracing::debug!(guest_key = %key, "issued guest cart key");
            key
        }
    };
    Ok(CartOwner::Guest(key))
}

fn session_error(err: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {err}"))
}
