use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{Ack, DeleteAccountRequest, LoginRequest, PublicUser, RegisterRequest},
        extractors::{clear_session_cookie, session_cookie, session_token, AuthSession},
        session::Session,
    },
    error::Error,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/user", get(get_user))
        .route("/auth/delete-account", delete(delete_account))
}

fn with_session(state: &AppState, session: &Session, user: PublicUser) -> impl IntoResponse {
    let cookie = session_cookie(
        &state.config.session.cookie_name,
        &session.token,
        state.config.session.ttl(),
        state.config.session.secure,
    );
    (AppendHeaders([(header::SET_COOKIE, cookie)]), Json(user))
}

fn with_cleared_session(state: &AppState, ack: Ack) -> impl IntoResponse {
    let cookie = clear_session_cookie(&state.config.session.cookie_name, state.config.session.secure);
    (AppendHeaders([(header::SET_COOKIE, cookie)]), Json(ack))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, Error> {
    let (user, session) = state.auth.register(payload).await?;
    Ok(with_session(&state, &session, user))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, Error> {
    let (user, session) = state.auth.login(&payload.email, &payload.password).await?;
    Ok(with_session(&state, &session, user))
}

/// Destroys the current session if one is attached. Always clears the
/// cookie; logging out twice is not an error.
#[instrument(skip(state, headers))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, Error> {
    if let Some(token) = session_token(&headers, &state.config.session.cookie_name) {
        state.auth.logout(&token).await?;
    }
    Ok(with_cleared_session(
        &state,
        Ack {
            message: "Logged out successfully",
        },
    ))
}

#[instrument(skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<PublicUser>, Error> {
    let user = state.auth.current_user(&auth.token).await?;
    Ok(Json(user))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.user_id))]
pub async fn delete_account(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<impl IntoResponse, Error> {
    state
        .auth
        .delete_account(&auth.token, payload.password.as_deref())
        .await?;
    Ok(with_cleared_session(
        &state,
        Ack {
            message: "Account deleted successfully",
        },
    ))
}
