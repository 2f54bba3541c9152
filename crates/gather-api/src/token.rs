use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use thiserror::Error;
use uuid::Uuid;

use gather_types::api::Claims;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Mint an HS256 bearer token for a user. Expiry is fixed at issuance from
/// the configured TTL.
pub fn issue(user_id: Uuid, secret: &str, ttl: chrono::Duration) -> anyhow::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Check signature and expiry, returning the subject user id. Pure function
/// of token + secret + clock; no side effects.
pub fn verify(token: &str, secret: &str) -> Result<Uuid, TokenError> {
    let mut validation = Validation::default();
    // Validity is exactly signature + exp against the current time.
    validation.leeway = 0;

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(data.claims.sub),
        Err(e) => Err(match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issue_then_verify_resolves_subject() {
        let user_id = Uuid::new_v4();
        let token = issue(user_id, SECRET, chrono::Duration::hours(1)).unwrap();
        assert_eq!(verify(&token, SECRET), Ok(user_id));
    }

    #[test]
    fn expired_token_fails_with_expired() {
        let token = issue(Uuid::new_v4(), SECRET, chrono::Duration::seconds(-10)).unwrap();
        assert_eq!(verify(&token, SECRET), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_signature_fails_with_bad_signature() {
        let token = issue(Uuid::new_v4(), SECRET, chrono::Duration::hours(1)).unwrap();

        // Flip the last character of the signature segment.
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert_eq!(verify(&tampered, SECRET), Err(TokenError::BadSignature));
    }

    #[test]
    fn wrong_secret_fails_with_bad_signature() {
        let token = issue(Uuid::new_v4(), SECRET, chrono::Duration::hours(1)).unwrap();
        assert_eq!(verify(&token, "other-secret"), Err(TokenError::BadSignature));
    }

    #[test]
    fn garbage_fails_with_malformed() {
        assert_eq!(verify("not-a-token", SECRET), Err(TokenError::Malformed));
        assert_eq!(verify("", SECRET), Err(TokenError::Malformed));
    }
}
