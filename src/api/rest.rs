use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Extension, Json, Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::api::auth::{AuthUser, JwtAuth, auth_middleware, hash_password, verify_password};
use crate::error::Error;
use crate::observability::metrics::REGISTRY;
use crate::persistence::sqlite::SqliteStore;
use crate::prices::cache::PriceCache;
use crate::types::alert::{Alert, AlertDraft};
use crate::types::item::{Item, ItemDraft};
use crate::types::user::{User, UserChanges, UserProfile};

pub struct AppState {
    pub cache: Arc<PriceCache>,
    pub store: SqliteStore,
    pub auth: JwtAuth,
    pub started_at: Instant,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/auth/profile", patch(update_profile))
        .route("/api/auth/account", delete(delete_account))
        .route("/api/items", get(list_items).post(create_item))
        .route("/api/items/sync", post(sync_items))
        .route("/api/items/:id", put(update_item).delete(delete_item))
        .route("/api/alerts", get(list_alerts).post(create_alert))
        .route("/api/alerts/:id/fired", patch(mark_alert_fired))
        .route("/api/alerts/:id", delete(delete_alert))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/prices", get(get_prices))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .merge(protected)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// `{"error": "..."}` body with the matching status, mirroring what the
/// frontend expects. Price subsystem errors never surface here; readers only
/// ever see the cache.
struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match e {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::EmailTaken => StatusCode::CONFLICT,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, e.to_string())
    }
}

fn bad_request(msg: &str) -> ApiError {
    ApiError(StatusCode::BAD_REQUEST, msg.to_string())
}

type ApiResult<T> = std::result::Result<T, ApiError>;

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}

async fn metrics_handler() -> ApiResult<String> {
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buf)
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    String::from_utf8(buf).map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

// ── prices ──

#[derive(Serialize)]
struct RatesBody {
    #[serde(rename = "USD")]
    usd: f64,
    #[serde(rename = "INR")]
    inr: f64,
    #[serde(rename = "AED")]
    aed: f64,
    #[serde(rename = "EUR")]
    eur: f64,
    #[serde(rename = "GBP")]
    gbp: f64,
}

#[derive(Serialize)]
struct PricesResponse {
    gold: f64,
    silver: f64,
    rates: RatesBody,
    #[serde(rename = "fetchedAt")]
    fetched_at: String,
}

/// Reads only the in-memory cache: synchronous, never blocks on a refresh,
/// never errors.
async fn get_prices(State(state): State<Arc<AppState>>) -> Json<PricesResponse> {
    let snap = state.cache.current();
    Json(PricesResponse {
        gold: snap.gold_usd,
        silver: snap.silver_usd,
        rates: RatesBody {
            usd: 1.0,
            inr: snap.usd_inr,
            aed: snap.usd_aed,
            eur: snap.usd_eur,
            gbp: snap.usd_gbp,
        },
        fetched_at: snap.fetched_at.to_rfc3339(),
    })
}

// ── auth ──

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    age: Option<i64>,
    country: Option<String>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct AuthResponse {
    token: String,
    user: UserProfile,
}

fn auth_response(state: &AppState, user: &User) -> ApiResult<AuthResponse> {
    let token = state.auth.generate_token(user.id, &user.email)?;
    Ok(AuthResponse {
        token,
        user: UserProfile::from(user),
    })
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    if req.email.is_empty() || req.first_name.is_empty() || req.last_name.is_empty() {
        return Err(bad_request("Missing required fields"));
    }
    if req.password.len() < 6 {
        return Err(bad_request("Password must be at least 6 characters"));
    }
    if !req.email.contains('@') {
        return Err(bad_request("Invalid email address"));
    }

    let user = state
        .store
        .create_user(
            req.email.trim().to_lowercase(),
            hash_password(&req.password),
            req.first_name.trim().to_string(),
            req.last_name.trim().to_string(),
            req.age,
            req.country,
        )
        .await?;
    Ok(Json(auth_response(&state, &user)?))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = state
        .store
        .find_user_by_email(req.email.trim().to_lowercase())
        .await?
        .ok_or(ApiError(
            StatusCode::UNAUTHORIZED,
            "No account found with that email".to_string(),
        ))?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError(
            StatusCode::UNAUTHORIZED,
            "Incorrect password".to_string(),
        ));
    }
    Ok(Json(auth_response(&state, &user)?))
}

async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<UserProfile>> {
    let user = state
        .store
        .get_user(auth.user_id)
        .await?
        .ok_or(Error::NotFound)?;
    Ok(Json(UserProfile::from(&user)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdateRequest {
    email: Option<String>,
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    age: Option<i64>,
    country: Option<String>,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ProfileUpdateRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let password_hash = match req.password.as_deref() {
        Some(p) if p.len() >= 6 => Some(hash_password(p)),
        _ => None,
    };
    let changes = UserChanges {
        email: req.email.map(|e| e.trim().to_lowercase()),
        password_hash,
        first_name: req.first_name,
        last_name: req.last_name,
        age: req.age,
        country: req.country,
    };
    let user = state.store.update_user(auth.user_id, changes).await?;
    // A fresh token so an email change takes effect immediately.
    Ok(Json(auth_response(&state, &user)?))
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.delete_user(auth.user_id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ── items ──

async fn list_items(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(state.store.list_items(auth.user_id).await?))
}

async fn create_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(draft): Json<ItemDraft>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    let item = state.store.insert_item(auth.user_id, draft).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(draft): Json<ItemDraft>,
) -> ApiResult<Json<Item>> {
    Ok(Json(state.store.update_item(auth.user_id, id, draft).await?))
}

async fn delete_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.delete_item(auth.user_id, id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Deserialize)]
struct SyncRequest {
    items: Vec<ItemDraft>,
}

async fn sync_items(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SyncRequest>,
) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(state.store.sync_items(auth.user_id, req.items).await?))
}

// ── alerts ──

async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Alert>>> {
    Ok(Json(state.store.list_alerts(auth.user_id).await?))
}

async fn create_alert(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(draft): Json<AlertDraft>,
) -> ApiResult<(StatusCode, Json<Alert>)> {
    if draft.price <= 0.0 {
        return Err(bad_request("Alert price must be positive"));
    }
    let alert = state.store.insert_alert(auth.user_id, draft).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

async fn mark_alert_fired(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.mark_alert_fired(auth.user_id, id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn delete_alert(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.delete_alert(auth.user_id, id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::prices::Snapshot;

    fn test_router() -> Router {
        let state = Arc::new(AppState {
            cache: Arc::new(PriceCache::new(Snapshot::default())),
            store: SqliteStore::open_in_memory().unwrap(),
            auth: JwtAuth::new("test-secret", 3600),
            started_at: Instant::now(),
        });
        create_router(state)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_uptime() {
        let router = test_router();
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn prices_endpoint_serves_the_cache_without_auth() {
        let router = test_router();
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/prices")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["gold"], 3320.0);
        assert_eq!(body["rates"]["USD"], 1.0);
        assert_eq!(body["rates"]["INR"], 83.5);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let router = test_router();
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/items")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_then_fetch_profile() {
        let router = test_router();

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/register")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "email": "Ada@Example.com",
                            "password": "hunter22",
                            "firstName": "Ada",
                            "lastName": "Lovelace"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let token = body["token"].as_str().unwrap().to_string();
        assert_eq!(body["user"]["email"], "ada@example.com");

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["firstName"], "Ada");
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let router = test_router();
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/register")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "email": "a@b.c",
                            "password": "short",
                            "firstName": "A",
                            "lastName": "B"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
