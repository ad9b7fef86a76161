//! Authentication service routes

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use common::database::health_check as store_health_check;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    cookies::set_cookie_headers,
    error::ApiError,
    mailer::{OutboundMail, verification_link},
    models::{Account, AccountResponse, NewAccount, Role},
    session::Authenticated,
    state::AppState,
    validation::{normalize_email, validate_email, validate_name},
};

/// Default page size of the account listing.
pub const DEFAULT_LIST_LIMIT: i64 = 32;

/// Request for account registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub programid: i64,
}

/// Request for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/verify", get(verify))
        .route("/api/auth/csrf", get(csrf))
        .route("/api/users", get(list_users))
        .route("/api/users/:id", get(get_user))
        .route("/api/programs", get(list_programs))
        .route("/api/programs/:id", get(get_program))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    debug!("Rejected request body: {}", rejection.body_text());
    ApiError::BadInput("Could not decode JSON body".to_string())
}

fn account_json(account: &Account) -> Result<Json<AccountResponse>, ApiError> {
    Ok(Json(AccountResponse::try_from(account)?))
}

/// Queue the verification mail for `account`.
fn send_verification(state: &AppState, account: &Account, token: &str) {
    let link = verification_link(&state.links.domain, token);
    state
        .outbox
        .enqueue(OutboundMail::verification(&account.email, &account.name, &link));
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match store_health_check(&state.db_pool).await {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "service": "campus-auth"
            })),
        ),
        Ok(false) | Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "unavailable",
                "service": "campus-auth"
            })),
        ),
    }
}

/// Account registration endpoint
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(bad_body)?;

    let email = normalize_email(&payload.email);
    validate_email(&email).map_err(ApiError::BadInput)?;
    validate_name(&payload.name).map_err(ApiError::BadInput)?;

    info!("Registration attempt for {}", email);

    let password_hash = state.credentials.hash_blocking(payload.password).await?;
    let token = state.verification.new_token();

    let account = state
        .accounts
        .create(
            &NewAccount {
                id: Uuid::new_v4().to_string(),
                email,
                name: payload.name.trim().to_string(),
                password_hash,
                role: Role::User,
                program_id: payload.programid,
                verification_token: token.clone(),
            },
            state.clock.now(),
        )
        .await?;

    send_verification(&state, &account, &token);
    info!("Registered account {}", account.id);

    Ok((StatusCode::CREATED, account_json(&account)?))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let email = normalize_email(&payload.email);

    let Some(account) = state.accounts.find_by_email(&email).await? else {
        state.credentials.verify_unknown_blocking(payload.password).await;
        info!("Login failed: unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !state
        .credentials
        .verify_blocking(payload.password, account.password_hash.clone())
        .await
    {
        info!("Login failed: wrong password for account {}", account.id);
        return Err(ApiError::InvalidCredentials);
    }

    if !account.verified {
        match state.verification.issue(&account.id).await {
            Ok(token) => send_verification(&state, &account, &token),
            Err(e) => error!("Failed to reissue verification token for {}: {}", account.id, e),
        }
        return Err(ApiError::NotVerified);
    }

    if account.verification_lapsed(state.clock.now()) {
        debug!("Account {} logged in past its verified_until", account.id);
    }

    let session = state.session_manager.create(&account.id).await?;
    let cookies = set_cookie_headers([state.session_manager.cookie(&session)]);
    info!("Account {} logged in", account.id);

    Ok((StatusCode::OK, cookies, account_json(&account)?))
}

/// Logout endpoint
///
/// Requires a valid session and a matching CSRF pair. Cookies are cleared
/// even when the session could not be resolved.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let auth = match state.session_manager.authenticate(&jar).await {
        Ok(auth) => auth,
        Err(e) => {
            let cookies = set_cookie_headers([state.session_manager.clear_cookie()]);
            return (cookies, ApiError::from(e)).into_response();
        }
    };

    if let Err(e) = state.csrf.check(&headers, &jar) {
        warn!("Logout rejected for account {}: {}", auth.account.id, e);
        return (set_cookie_headers([auth.cookie]), ApiError::from(e)).into_response();
    }

    if let Err(e) = state.session_manager.revoke(&auth.session.id).await {
        error!("Failed to delete session on logout: {}", e);
    }
    info!("Account {} logged out", auth.account.id);

    let cookies = set_cookie_headers([
        state.session_manager.clear_cookie(),
        state.csrf.clear_cookie(),
    ]);
    (StatusCode::NO_CONTENT, cookies).into_response()
}

/// Current account endpoint
pub async fn me(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    let Authenticated {
        account, cookie, ..
    } = state.session_manager.authenticate(&jar).await?;

    Ok((set_cookie_headers([cookie]), account_json(&account)).into_response())
}

/// Verification link target
pub async fn verify(
    State(state): State<AppState>,
    params: Result<Query<VerifyParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let token = params.map(|Query(params)| params.token).unwrap_or_default();

    let account = state.verification.redeem(&token).await?;
    info!("Account {} verified via link", account.id);

    Ok((
        StatusCode::FOUND,
        [(LOCATION, state.links.verified_redirect())],
    ))
}

/// CSRF token endpoint
pub async fn csrf(State(state): State<AppState>) -> impl IntoResponse {
    let (token, cookie) = state.csrf.issue();
    (
        set_cookie_headers([cookie]),
        Json(serde_json::json!({ "csrf": token })),
    )
}

/// Account listing (admin only)
pub async fn list_users(
    State(state): State<AppState>,
    jar: CookieJar,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let auth = state.session_manager.authenticate(&jar).await?;
    let cookies = set_cookie_headers([auth.cookie.clone()]);

    Ok((cookies, list_accounts(&state, &auth, params).await).into_response())
}

async fn list_accounts(
    state: &AppState,
    auth: &Authenticated,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    if !auth.account.is_admin() {
        return Err(ApiError::forbidden());
    }

    let Query(params) =
        params.map_err(|_| ApiError::BadInput("Invalid query parameters".to_string()))?;
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let offset = params.offset.unwrap_or(0);
    if limit < 0 || offset < 0 {
        return Err(ApiError::BadInput(
            "limit and offset must not be negative".to_string(),
        ));
    }

    let accounts = state.accounts.list(limit, offset).await?;
    let body = accounts
        .iter()
        .map(AccountResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(body))
}

/// Single account lookup (self or admin)
pub async fn get_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let auth = state.session_manager.authenticate(&jar).await?;
    let cookies = set_cookie_headers([auth.cookie.clone()]);

    Ok((cookies, find_account(&state, &auth, &id).await).into_response())
}

async fn find_account(
    state: &AppState,
    auth: &Authenticated,
    id: &str,
) -> Result<Json<AccountResponse>, ApiError> {
    if auth.account.id != id && !auth.account.is_admin() {
        return Err(ApiError::forbidden());
    }

    let account = state
        .accounts
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    account_json(&account)
}

/// Program catalogue
pub async fn list_programs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.programs.list().await?))
}

/// Single program
pub async fn get_program(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(|_| ApiError::BadInput("Invalid program id".to_string()))?;

    let program = state
        .programs
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Program not found".to_string()))?;
    Ok(Json(program))
}
