//! Bearer-token identity: the [`Authenticator`] seam, its JWT implementation and the axum
//! extractor that resolves the calling player.

use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{dao::models::PlayerId, error::AppError, state::SharedState};

/// Reasons a request could not be tied to a player.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization: Bearer` header was sent.
    #[error("missing bearer token")]
    MissingCredential,
    /// Signature, expiry or shape check failed.
    #[error("invalid bearer token")]
    InvalidCredential(#[source] jsonwebtoken::errors::Error),
    /// The token verified but carries an empty `sub`.
    #[error("token has no subject")]
    MissingSubject,
    /// Encoding a new token failed.
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Turns a credential into a stable player id.
pub trait Authenticator: Send + Sync {
    /// Resolve the player behind `credential`.
    fn verify(&self, credential: &str) -> Result<PlayerId, AuthError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: u64,
}

/// HS256 shared-secret JWT verification; the `sub` claim is the player id.
pub struct JwtAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Sign and verify with the shared `secret`.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Sign a token for `player_id` valid for `ttl_secs`.
    pub fn issue(&self, player_id: &str, ttl_secs: u64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: player_id.to_owned(),
            exp: get_current_timestamp() + ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Signing)
    }
}

impl Authenticator for JwtAuthenticator {
    fn verify(&self, credential: &str) -> Result<PlayerId, AuthError> {
        let data = decode::<Claims>(credential, &self.decoding, &self.validation)
            .map_err(AuthError::InvalidCredential)?;
        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::MissingSubject);
        }
        Ok(data.claims.sub)
    }
}

/// Player resolved from the `Authorization: Bearer` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPlayer(pub PlayerId);

impl FromRequestParts<SharedState> for AuthenticatedPlayer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingCredential)?;

        let player = state.authenticator().verify(bearer.token()).map_err(|err| {
            debug!(error = %err, "rejected bearer token");
            err
        })?;
        Ok(Self(player))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_round_trip_to_player_id() {
        let auth = JwtAuthenticator::new(b"secret");
        let token = auth.issue("player-1", 60).unwrap();
        assert_eq!(auth.verify(&token).unwrap(), "player-1");
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = JwtAuthenticator::new(b"other").issue("player-1", 60).unwrap();
        let err = JwtAuthenticator::new(b"secret").verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(JwtAuthenticator::new(b"secret").verify("not-a-jwt").is_err());
    }
}
