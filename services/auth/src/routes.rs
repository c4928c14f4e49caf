//! User routes

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, info, warn};
use uuid::Uuid;

use common::{
    error::{ApiError, ApiResult, RepositoryError},
    middleware::{AuthUser, authorize},
    models::{NewUser, UpdateUser},
};

use crate::{
    AppState,
    cookies::refresh_token,
    models::{
        LoginRequest, LoginResponse, MessageResponse, ProfileResponse, RefreshResponse,
        ResetPasswordRequest, SignupRequest, UpdateUserRequest, UpdateUserResponse, UserQuery,
    },
    password::{hash_password_blocking, verify_password_blocking},
    validation::{validate_login, validate_reset, validate_signup, validate_update},
};

const USER_EXISTS: &str = "User already exists with the entered email address";
const UNKNOWN_EMAIL: &str =
    "User does not exist. Please check if the entered email address is correct.";
const USER_NOT_FOUND: &str = "User not found.";

/// Create the router for the user routes
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/get", get(get_user))
        .route("/update", patch(update_user))
        .route("/delete", delete(delete_user))
        .route_layer(from_fn_with_state(state.jwt_service.clone(), authorize));

    Router::new()
        .route("/new", post(signup))
        .route("/authenticate", post(authenticate))
        .route("/refresh", get(refresh))
        .route("/logout", post(logout))
        .route("/reset-password", patch(reset_password))
        .merge(protected)
        .with_state(state)
}

fn internal(context: &str) -> impl FnOnce(anyhow::Error) -> ApiError + '_ {
    move |e| {
        error!("{}: {}", context, e);
        ApiError::InternalServerError
    }
}

/// A conflicting email is reported with the signup wording
fn email_conflict(e: RepositoryError) -> ApiError {
    match e {
        RepositoryError::Conflict(_) => ApiError::Conflict(USER_EXISTS.to_string()),
        other => other.into(),
    }
}

/// `?id=` and body ids may only name the caller
fn ensure_caller(id: Option<String>, caller: Uuid) -> ApiResult<()> {
    match id.filter(|id| !id.trim().is_empty()) {
        None => Ok(()),
        Some(id) => {
            let id = Uuid::parse_str(id.trim())
                .map_err(|_| ApiError::BadRequest("Invalid user id".to_string()))?;
            if id == caller {
                Ok(())
            } else {
                warn!("User {} tried to act on user {}", caller, id);
                Err(ApiError::Forbidden)
            }
        }
    }
}

/// Sign up a new user
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let valid = validate_signup(payload)?;
    info!("Signup for {}", valid.email_address);

    if state.users.find_by_email(&valid.email_address).await?.is_some() {
        return Err(ApiError::Conflict(USER_EXISTS.to_string()));
    }

    let password_hash = hash_password_blocking(valid.password)
        .await
        .map_err(internal("Failed to hash password"))?;

    state
        .users
        .create(NewUser {
            name: valid.name,
            email_address: valid.email_address,
            password_hash,
        })
        .await
        .map_err(email_conflict)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Sign up successful")),
    ))
}

/// Log in and receive an access token plus the refresh cookie
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let valid = validate_login(payload)?;
    info!("Login attempt for {}", valid.email_address);

    if !state.rate_limiter.is_allowed(&valid.email_address).await {
        warn!("Login for {} is rate limited", valid.email_address);
        return Err(ApiError::TooManyRequests);
    }

    let Some(user) = state.users.find_by_email(&valid.email_address).await? else {
        state.rate_limiter.record_failure(&valid.email_address).await;
        return Err(ApiError::NotFound(UNKNOWN_EMAIL.to_string()));
    };

    let matches = verify_password_blocking(valid.password, user.password_hash.clone())
        .await
        .map_err(internal("Failed to verify password"))?;
    if !matches {
        state.rate_limiter.record_failure(&valid.email_address).await;
        return Err(ApiError::InvalidCredentials);
    }
    state.rate_limiter.reset(&valid.email_address).await;

    let token = state
        .jwt_service
        .generate_access_token(user.id)
        .map_err(internal("Failed to generate access token"))?;
    let refresh = state
        .jwt_service
        .generate_refresh_token(user.id)
        .map_err(internal("Failed to generate refresh token"))?;

    let jar = state.cookie_policy.issue(jar, refresh);
    let body = LoginResponse {
        message: "Logged in successfully".to_string(),
        token,
        user: (&user).into(),
    };

    Ok((jar, Json(body)))
}

/// Exchange the refresh cookie for a new access token
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> ApiResult<Response> {
    let Some(token) = refresh_token(&jar) else {
        return Err(ApiError::Unauthorized);
    };

    let claims = match state.jwt_service.validate_refresh_token(&token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("Rejected refresh token: {}", e);
            let jar = state.cookie_policy.clear(jar);
            return Ok((jar, ApiError::Forbidden).into_response());
        }
    };

    let Some(user) = state.users.find_by_id(claims.sub).await? else {
        return Err(ApiError::Unauthorized);
    };

    let token = state
        .jwt_service
        .generate_access_token(user.id)
        .map_err(internal("Failed to generate access token"))?;

    Ok(Json(RefreshResponse {
        token,
        user: (&user).into(),
    })
    .into_response())
}

/// Clear the refresh cookie
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> ApiResult<impl IntoResponse> {
    if refresh_token(&jar).is_none() {
        return Err(ApiError::Unauthorized);
    }

    let jar = state.cookie_policy.clear(jar);
    Ok((jar, Json(MessageResponse::new("Logged out successfully"))))
}

/// Set a new password for the account with the given email address
///
/// An empty password leaves the stored hash untouched.
pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let valid = validate_reset(payload)?;
    info!("Password reset for {}", valid.email_address);

    let Some(user) = state.users.find_by_email(&valid.email_address).await? else {
        return Err(ApiError::NotFound(UNKNOWN_EMAIL.to_string()));
    };

    if let Some(password) = valid.password {
        let password_hash = hash_password_blocking(password)
            .await
            .map_err(internal("Failed to hash password"))?;
        state
            .users
            .update(
                user.id,
                UpdateUser {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Password reset successful")),
    ))
}

/// Profile of the caller
pub async fn get_user(
    State(state): State<AppState>,
    caller: AuthUser,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    ensure_caller(query.id, caller.id)?;

    let user = state
        .users
        .find_by_id(caller.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

    Ok(Json(ProfileResponse {
        user: (&user).into(),
    }))
}

/// Update the caller's name, email address or password
pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(mut payload) = payload?;
    ensure_caller(payload.id.take(), caller.id)?;
    let valid = validate_update(payload)?;
    info!("Updating user {}", caller.id);

    let password_hash = match valid.password {
        Some(password) => Some(
            hash_password_blocking(password)
                .await
                .map_err(internal("Failed to hash password"))?,
        ),
        None => None,
    };

    let changes = UpdateUser {
        name: valid.name,
        email_address: valid.email_address,
        password_hash,
    };

    let user = state
        .users
        .update(caller.id, changes)
        .await
        .map_err(email_conflict)?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(UpdateUserResponse {
            message: "User details updated successfully".to_string(),
            user: (&user).into(),
        }),
    ))
}

/// Delete the caller's account with all notes and files
pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    jar: CookieJar,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    ensure_caller(query.id, caller.id)?;

    if state.users.find_by_id(caller.id).await?.is_none() {
        return Err(ApiError::NotFound(USER_NOT_FOUND.to_string()));
    }
    info!("Deleting user {}", caller.id);

    let notes = state.notes.list(caller.id).await?;
    let keys: Vec<String> = notes.iter().flat_map(|n| n.attachment_keys()).collect();
    let removed = state.storage.remove_all(&keys).await;
    if removed < keys.len() {
        warn!(
            "Kept {} of {} files of user {}",
            keys.len() - removed,
            keys.len(),
            caller.id
        );
    }
    state.storage.purge_owner(caller.id).await;

    state.notes.delete_all(caller.id).await?;
    state.users.delete(caller.id).await?;

    let jar = state.cookie_policy.clear(jar);
    Ok((jar, Json(MessageResponse::new("User successfully deleted"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_caller() {
        let caller = Uuid::new_v4();
        assert!(ensure_caller(None, caller).is_ok());
        assert!(ensure_caller(Some(" ".to_string()), caller).is_ok());
        assert!(ensure_caller(Some(caller.to_string()), caller).is_ok());
        assert!(matches!(
            ensure_caller(Some(Uuid::new_v4().to_string()), caller),
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            ensure_caller(Some("nope".to_string()), caller),
            Err(ApiError::BadRequest(_))
        ));
    }
}
