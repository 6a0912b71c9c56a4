//! Application (identity) management HTTP handlers.
//!
//! This module implements the onboarding API endpoints:
//! - GET /apps/list - List registered applications (authenticated)
//! - POST /apps/create - Register a new application and issue its key
//! - DELETE /apps/delete?id= - Revoke an application (authenticated)

use axum::{
    Extension, Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::app::{AppSummary, CreateAppRequest, RevokeAppParams},
};

/// List all registered applications.
///
/// # Endpoint
///
/// `GET /apps/list`
///
/// # Authentication
///
/// Requires `X-App-Name` and `X-API-Key` headers.
///
/// # Response
///
/// - **Success (200 OK)**: Array of `{id, name}`, never any key material
/// - **Error (401)**: Invalid API key
/// - **Error (500)**: Store error
///
/// ```json
/// [
///   { "id": 1, "name": "billing-service" },
///   { "id": 2, "name": "svc-a" }
/// ]
/// ```
pub async fn list_apps(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<AppSummary>>, AppError> {
    let apps = state.store.list_all().await?;
    tracing::debug!(caller = %auth.app_name, count = apps.len(), "Listed apps");

    Ok(Json(apps))
}

/// Register a new application.
///
/// # Endpoint
///
/// `POST /apps/create`
///
/// # Authentication
///
/// None. This is how the first caller obtains a key.
///
/// # Request Body
///
/// ```json
/// { "name": "svc-a" }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: `{id, name, api_key}`; the key is shown only here
/// - **Error (400)**: Malformed body or missing name
/// - **Error (409)**: Name already registered
/// - **Error (500)**: Hashing or store error
pub async fn create_app(
    State(state): State<AppState>,
    payload: Result<Json<CreateAppRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected app registration body");
        AppError::InvalidRequest("Error with request body".to_string())
    })?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest(
            "Bad request: name is required".to_string(),
        ));
    }

    let created = state.store.create(name).await?;
    tracing::info!(app_id = created.id, app = %created.name, "Registered app");

    Ok((StatusCode::CREATED, Json(created)))
}

/// Revoke (delete) an application by id.
///
/// # Endpoint
///
/// `DELETE /apps/delete?id=<id>`
///
/// # Response
///
/// - **Success (200 OK)**: plain-text confirmation
/// - **Error (400)**: Missing or non-numeric id
/// - **Error (401)**: Invalid API key
/// - **Error (404)**: No application with that id
/// - **Error (500)**: Store error
pub async fn revoke_app(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    params: Result<Query<RevokeAppParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) =
        params.map_err(|_| AppError::InvalidRequest("Invalid query string".to_string()))?;

    let raw_id = params
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Missing 'id' query parameter".to_string()))?;
    let id: i64 = raw_id
        .parse()
        .map_err(|_| AppError::InvalidRequest("Invalid 'id' parameter".to_string()))?;

    // Zero affected rows means the id never existed or was already revoked
    if state.store.delete(id).await? == 0 {
        return Err(AppError::AppNotFound);
    }

    tracing::info!(app_id = id, revoked_by = %auth.app_name, "Revoked app");
    Ok((StatusCode::OK, format!("App deleted successfully! id: {id}")))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{
        models::app::CreatedApp,
        test_support::{FailingStore, TestContext, authed},
    };

    fn app(ctx: &TestContext) -> Router {
        crate::app::router(ctx.state.clone(), std::time::Duration::from_secs(5))
    }

    async fn json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn create_request(body: &str) -> Request<Body> {
        Request::post("/apps/create")
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    fn delete_request(caller: &CreatedApp, query: &str) -> Request<Body> {
        authed(Request::delete(format!("/apps/delete{query}")), caller)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn create_returns_201_with_one_time_key() {
        let ctx = TestContext::new();

        let response = app(&ctx)
            .oneshot(create_request(r#"{"name":"svc-a"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json(response).await;
        assert_eq!(body["name"], "svc-a");
        assert!(body["id"].is_i64());
        assert_eq!(body["api_key"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn create_rejects_missing_name_and_bad_json() {
        let ctx = TestContext::new();

        for body in [r#"{}"#, r#"{"name":"  "}"#, "not json"] {
            let response = app(&ctx).oneshot(create_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_names() {
        let ctx = TestContext::new();
        app(&ctx)
            .oneshot(create_request(r#"{"name":"svc-a"}"#))
            .await
            .unwrap();

        let response = app(&ctx)
            .oneshot(create_request(r#"{"name":"svc-a"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn list_requires_credentials() {
        let ctx = TestContext::new();

        let response = app(&ctx)
            .oneshot(Request::get("/apps/list").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn revoke_validates_the_id() {
        let ctx = TestContext::new();
        let caller = ctx.state.store.create("caller").await.unwrap();

        let missing = app(&ctx).oneshot(delete_request(&caller, "")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let empty = app(&ctx)
            .oneshot(delete_request(&caller, "?id="))
            .await
            .unwrap();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let invalid = app(&ctx)
            .oneshot(delete_request(&caller, "?id=abc"))
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_list_revoke_scenario() {
        let ctx = TestContext::new();
        let caller = ctx.state.store.create("bootstrap").await.unwrap();

        let created = app(&ctx)
            .oneshot(create_request(r#"{"name":"svc-a"}"#))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let created = json(created).await;
        let id = created["id"].as_i64().unwrap();

        let listed = app(&ctx)
            .oneshot(
                authed(Request::get("/apps/list"), &caller)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(listed.status(), StatusCode::OK);
        let listed = json(listed).await;
        let entry = listed
            .as_array()
            .unwrap()
            .iter()
            .find(|app| app["name"] == "svc-a")
            .expect("svc-a should be listed");
        assert_eq!(entry["id"], id);
        assert!(entry.get("api_key").is_none());
        assert!(entry.get("api_key_hash").is_none());

        let deleted = app(&ctx)
            .oneshot(delete_request(&caller, &format!("?id={id}")))
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::OK);
        assert_eq!(text(deleted).await, format!("App deleted successfully! id: {id}"));

        let again = app(&ctx)
            .oneshot(delete_request(&caller, &format!("?id={id}")))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn revoked_caller_loses_access() {
        let ctx = TestContext::new();
        let caller = ctx.state.store.create("caller").await.unwrap();

        let revoked = app(&ctx)
            .oneshot(delete_request(&caller, &format!("?id={}", caller.id)))
            .await
            .unwrap();
        assert_eq!(revoked.status(), StatusCode::OK);

        let response = app(&ctx)
            .oneshot(
                authed(Request::get("/apps/list"), &caller)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn store_failure_is_masked_as_500() {
        let ctx = TestContext::with_store(std::sync::Arc::new(FailingStore::default()));

        let response = app(&ctx)
            .oneshot(create_request(r#"{"name":"svc-a"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = text(response).await;
        assert!(!body.contains("PoolTimedOut"));
        assert!(!body.contains("pool timed out"));
    }

    #[tokio::test]
    async fn issued_key_is_not_written_to_the_request_log() {
        let ctx = TestContext::new();

        let response = app(&ctx)
            .oneshot(create_request(r#"{"name":"svc-a"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let key = json(response).await["api_key"].as_str().unwrap().to_owned();

        let records = ctx.logger.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].response_body.contains(&key));
        assert!(records[0].response_body.contains("svc-a"));
    }
}
