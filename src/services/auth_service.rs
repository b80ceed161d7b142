use axum_extra::extract::cookie::{Cookie, SameSite};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::DatabaseConnection;

use crate::db::entities::user;
use crate::db::services::user_service;
use crate::validation::is_valid_email;
use crate::web::error::AppError;
use crate::web::models::{Claims, LoginRequest, SignupRequest};

pub const SESSION_COOKIE: &str = "session";

const SESSION_TTL_DAYS: i64 = 7;
const MIN_PASSWORD_LEN: usize = 6;

/// Single-user system: the first signup creates the account, every later
/// attempt is rejected outright.
pub async fn register_user(
    db: &DatabaseConnection,
    req: SignupRequest,
) -> Result<user::Model, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password are required".to_string(),
        ));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::InvalidInput("Invalid email format".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    if user_service::find_by_email(db, &req.email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }
    if user_service::count_users(db).await? > 0 {
        return Err(AppError::Conflict("Registration is closed".to_string()));
    }

    let password_hash = hash(&req.password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(format!("Failed to hash password: {e}")))?;

    Ok(user_service::create_user(db, &req.email, &password_hash).await?)
}

pub async fn login_user(
    db: &DatabaseConnection,
    req: LoginRequest,
) -> Result<user::Model, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password are required".to_string(),
        ));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::InvalidInput("Invalid email format".to_string()));
    }

    let user = user_service::find_by_email(db, &req.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}

/// HMAC-signed session token: the cookie carries the identity, the store
/// stays the source of truth on every request.
pub fn issue_session_token(user: &user::Model, jwt_secret: &str) -> Result<String, AppError> {
    let expiration = (Utc::now() + Duration::days(SESSION_TTL_DAYS)).timestamp() as usize;
    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(format!("Failed to sign session token: {e}")))
}

/// Decode result kept explicit so expiry and tampering are distinguishable
/// internally; both collapse to "no session" at the HTTP boundary.
#[derive(Debug)]
pub enum SessionToken {
    Valid(Claims),
    Expired,
    Malformed,
}

pub fn decode_session_token(token: &str, jwt_secret: &str) -> SessionToken {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    ) {
        Ok(data) => SessionToken::Valid(data.claims),
        Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => SessionToken::Expired,
        Err(_) => SessionToken::Malformed,
    }
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .build()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    const SECRET: &str = "test-secret";

    fn test_user() -> user::Model {
        user::Model {
            id: 1,
            email: "a@b.co".to_string(),
            password_hash: "irrelevant".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn tokens_round_trip() {
        let token = issue_session_token(&test_user(), SECRET).unwrap();
        match decode_session_token(&token, SECRET) {
            SessionToken::Valid(claims) => {
                assert_eq!(claims.user_id, 1);
                assert_eq!(claims.sub, "a@b.co");
            }
            other => panic!("expected Valid, got {other:?}"),
        }
    }

    #[test]
    fn tampered_tokens_are_malformed() {
        let mut token = issue_session_token(&test_user(), SECRET).unwrap();
        token.push('x');
        assert!(matches!(
            decode_session_token(&token, SECRET),
            SessionToken::Malformed
        ));
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let token = issue_session_token(&test_user(), SECRET).unwrap();
        assert!(matches!(
            decode_session_token(&token, "another-secret"),
            SessionToken::Malformed
        ));
    }

    #[test]
    fn expired_tokens_are_reported_as_expired() {
        let claims = Claims {
            sub: "a@b.co".to_string(),
            user_id: 1,
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_ref()),
        )
        .unwrap();
        assert!(matches!(
            decode_session_token(&token, SECRET),
            SessionToken::Expired
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            decode_session_token("not-a-jwt", SECRET),
            SessionToken::Malformed
        ));
    }

    fn signup(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn user_count_row(count: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::from(count))])
    }

    #[tokio::test]
    async fn registration_closes_after_the_first_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([vec![user_count_row(1)]])
            .into_connection();

        match register_user(&db, signup("b@c.co", "secret1")).await {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "Registration is closed"),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_user()]])
            .into_connection();

        match register_user(&db, signup("a@b.co", "secret1")).await {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "User already exists"),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn weak_or_malformed_credentials_never_reach_the_store() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        for (email, password) in [("", "secret1"), ("a@b.co", ""), ("not-an-email", "secret1"), ("a@b.co", "short")] {
            assert!(
                matches!(
                    register_user(&db, signup(email, password)).await,
                    Err(AppError::InvalidInput(_))
                ),
                "{email}/{password}"
            );
        }
        assert!(db.into_transaction_log().is_empty());
    }
}
