use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::Claims;
use crate::error::AppError;

#[derive(Clone)]
pub struct JwtKeys {
    pub enc: EncodingKey,
    pub dec: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret),
            dec: DecodingKey::from_secret(secret),
        }
    }
}

pub fn now_unix() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as usize)
        .unwrap_or_default()
}

pub fn encode_token(keys: &JwtKeys, claims: &Claims) -> Result<String, AppError> {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".into());

    encode(&header, claims, &keys.enc)
        .map_err(|err| AppError::bad_request(format!("Token encoding failed: {err}")))
}

pub fn decode_token(keys: &JwtKeys, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    Ok(decode::<Claims>(token, &keys.dec, &validation)?.claims)
}

pub fn make_access_claims(subject: &str, workspace: Uuid, role: &str, ttl_secs: usize) -> Claims {
    let iat = now_unix();
    let exp = iat + ttl_secs;
    Claims {
        sub: subject.to_string(),
        workspace,
        role: role.to_string(),
        iat,
        exp,
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::bad_request(format!("Invalid or expired token: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{JwtKeys, decode_token, encode_token, make_access_claims};

    #[test]
    fn makes_claims_with_expected_workspace_role_and_ttl() {
        let workspace = Uuid::new_v4();
        let claims = make_access_claims("user-1", workspace, "editor", 60);

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.workspace, workspace);
        assert_eq!(claims.role, "editor");
        assert_eq!(claims.exp.saturating_sub(claims.iat), 60);
    }

    #[test]
    fn encoded_token_decodes_with_same_secret() {
        let keys = JwtKeys::from_secret(b"unit-test-secret");
        let claims = make_access_claims("user-1", Uuid::new_v4(), "admin", 600);
        let token = encode_token(&keys, &claims).expect("token should encode");

        let decoded = decode_token(&keys, &token).expect("token should decode");
        assert_eq!(decoded, claims);
    }

    #[test]
    fn foreign_secret_is_rejected_as_bad_request() {
        let claims = make_access_claims("user-1", Uuid::new_v4(), "admin", 600);
        let token = encode_token(&JwtKeys::from_secret(b"one"), &claims).expect("encode");

        let err = decode_token(&JwtKeys::from_secret(b"two"), &token).expect_err("should fail");
        assert!(
            err.message().starts_with("Invalid or expired token:"),
            "unexpected message: {}",
            err.message()
        );
    }
}
