use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;

use crate::db::store::{UserRecord, UserStore};
use crate::web::error::AppError;
use crate::web::models::{Claims, LoginRequest, LoginResponse, RegisterRequest, UserResponse};

pub async fn register_user(
    users: &Arc<dyn UserStore>,
    req: RegisterRequest,
) -> Result<UserResponse, AppError> {
    if req.username.is_empty() || req.password.len() < 8 {
        return Err(AppError::InvalidInput(
            "Username must be set and password must be at least 8 characters.".to_string(),
        ));
    }

    let existing_user = users.get_user_by_username(&req.username).await?;
    if existing_user.is_some() {
        return Err(AppError::UserAlreadyExists(
            "Username is already taken.".to_string(),
        ));
    }

    let password_hash = hash(&req.password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(format!("Password hashing failed: {e}")))?;

    let user = users.create_user(req.username, password_hash).await?;

    Ok(UserResponse {
        id: user.id,
        username: user.username,
    })
}

pub async fn login_user(
    users: &Arc<dyn UserStore>,
    req: LoginRequest,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Username and password must not be empty.".to_string(),
        ));
    }

    let user = match users.get_user_by_username(&req.username).await? {
        Some(u) => u,
        None => return Err(AppError::UserNotFound),
    };

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;

    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    create_jwt_for_user(&user, jwt_secret)
}

pub fn create_jwt_for_user(
    user: &UserRecord,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    let now = Utc::now();
    let expiration = (now + Duration::hours(24 * 7)).timestamp() as usize;

    let claims = Claims {
        sub: user.username.clone(),
        user_id: user.id.clone(),
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(format!("Token creation failed: {e}")))?;

    Ok(LoginResponse {
        token,
        user_id: user.id.clone(),
        username: user.username.clone(),
    })
}
