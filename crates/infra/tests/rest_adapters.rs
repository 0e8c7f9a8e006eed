//! Black-box tests of the REST adapters against a fake of the hosted service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use dentalcare_auth::{AuthError, PrincipalId};
use dentalcare_infra::{
    Collection, DataRequestError, DataService, Endpoint, IdentityEventKind, IdentityProvider, Query, RemoteConfig,
    RestDataService, RestIdentityProvider, SessionToken,
};
use dentalcare_patients::Patient;

const API_KEY: &str = "anon-key";
const USER_TOKEN: &str = "user-access-token";

#[derive(Default)]
struct Fake {
    user_id: Mutex<Option<PrincipalId>>,
    rows: Mutex<Vec<Value>>,
    /// (method, path, raw query, bearer) of every REST call.
    seen: Mutex<Vec<(String, String, String, String)>>,
    fail_with: Mutex<Option<StatusCode>>,
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .trim_start_matches("Bearer ")
        .to_string()
}

fn has_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(API_KEY)
}

async fn token(State(fake): State<Arc<Fake>>, RawQuery(q): RawQuery, Json(body): Json<Value>) -> impl IntoResponse {
    let q = q.unwrap_or_default();
    if q.contains("grant_type=refresh_token") {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))).into_response();
    }
    if body["email"] == "admin@clinic.test" && body["password"] == "pw-admin" {
        let id = PrincipalId::new();
        *fake.user_id.lock().unwrap() = Some(id);
        return Json(json!({
            "access_token": USER_TOKEN,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "user": {"id": id.to_string(), "email": "admin@clinic.test"}
        }))
        .into_response();
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "invalid_grant", "error_description": "Invalid login credentials"})),
    )
        .into_response()
}

async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn signup(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({"id": PrincipalId::new().to_string(), "email": body["email"]}))
}

async fn select(
    State(fake): State<Arc<Fake>>,
    Path(table): Path<String>,
    RawQuery(q): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !has_key(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "no api key"}))).into_response();
    }
    if let Some(status) = *fake.fail_with.lock().unwrap() {
        return (status, Json(json!({"message": "permission denied for table"}))).into_response();
    }
    fake.seen
        .lock()
        .unwrap()
        .push(("GET".into(), table, q.unwrap_or_default(), bearer(&headers)));
    Json(Value::Array(fake.rows.lock().unwrap().clone())).into_response()
}

async fn insert(State(fake): State<Arc<Fake>>, headers: HeaderMap, Json(mut row): Json<Value>) -> impl IntoResponse {
    assert_eq!(
        headers.get("prefer").and_then(|v| v.to_str().ok()),
        Some("return=representation")
    );
    row["created_at"] = json!("2024-06-15T10:00:00Z");
    fake.rows.lock().unwrap().push(row.clone());
    (StatusCode::CREATED, Json(json!([row])))
}

async fn update(State(fake): State<Arc<Fake>>, RawQuery(q): RawQuery, Json(patch): Json<Value>) -> Json<Value> {
    let q = q.unwrap_or_default();
    let mut rows = fake.rows.lock().unwrap();
    let mut out = vec![];
    for row in rows.iter_mut() {
        let id = row["id"].as_str().unwrap_or_default().to_string();
        if q == format!("id=eq.{id}") {
            for (k, v) in patch.as_object().unwrap() {
                row[k] = v.clone();
            }
            out.push(row.clone());
        }
    }
    Json(Value::Array(out))
}

async fn remove(State(fake): State<Arc<Fake>>, RawQuery(q): RawQuery) -> Json<Value> {
    let q = q.unwrap_or_default();
    let mut rows = fake.rows.lock().unwrap();
    let (gone, kept): (Vec<Value>, Vec<Value>) = rows
        .drain(..)
        .partition(|r| q == format!("id=eq.{}", r["id"].as_str().unwrap_or_default()));
    *rows = kept;
    Json(Value::Array(gone))
}

struct TestServer {
    fake: Arc<Fake>,
    config: RemoteConfig,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let fake = Arc::new(Fake::default());
        let app = Router::new()
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/logout", post(logout))
            .route("/auth/v1/signup", post(signup))
            .route("/rest/v1/:table", get(select).post(insert).patch(update).delete(remove))
            .with_state(fake.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let config = RemoteConfig::new(format!("http://{addr}"), API_KEY).with_request_timeout(Duration::from_secs(5));
        Self { fake, config, handle }
    }

    fn adapters(&self) -> (RestIdentityProvider, RestDataService) {
        let endpoint = Endpoint::new(&self.config, SessionToken::new()).unwrap();
        (
            RestIdentityProvider::new(endpoint.clone()),
            RestDataService::new(endpoint),
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn sign_in_sets_bearer_for_data_requests() {
    let srv = TestServer::spawn().await;
    let (idp, data) = srv.adapters();
    let mut changes = idp.subscribe();
    assert_eq!(changes.recv().await.unwrap().principal, None);

    data.select("patients", &Query::new()).await.unwrap();
    let signed = idp.sign_in("admin@clinic.test", "pw-admin").await.unwrap();
    assert_eq!(Some(signed.principal.id), *srv.fake.user_id.lock().unwrap());
    assert_eq!(changes.recv().await.unwrap().kind, IdentityEventKind::SignedIn);

    data.select("patients", &Query::new()).await.unwrap();
    let seen = srv.fake.seen.lock().unwrap().clone();
    assert_eq!(seen[0].3, API_KEY);
    assert_eq!(seen[1].3, USER_TOKEN);
}

#[tokio::test]
async fn bad_credentials_are_classified() {
    let srv = TestServer::spawn().await;
    let (idp, _) = srv.adapters();
    let err = idp.sign_in("nobody@clinic.test", "x").await.unwrap_err();
    assert_eq!(err, AuthError::InvalidCredentials);
}

#[tokio::test]
async fn unreachable_service_is_a_network_failure() {
    let config = RemoteConfig::new("http://127.0.0.1:9", API_KEY).with_request_timeout(Duration::from_secs(2));
    let idp = RestIdentityProvider::new(Endpoint::new(&config, SessionToken::new()).unwrap());
    let err = idp.sign_in("admin@clinic.test", "pw-admin").await.unwrap_err();
    assert!(matches!(err, AuthError::NetworkFailure(_)));
}

#[tokio::test]
async fn sign_out_clears_token_and_notifies() {
    let srv = TestServer::spawn().await;
    let (idp, data) = srv.adapters();
    idp.sign_in("admin@clinic.test", "pw-admin").await.unwrap();
    let mut changes = idp.subscribe();
    changes.recv().await.unwrap();

    let rev = idp.sign_out().await.unwrap();
    let change = changes.recv().await.unwrap();
    assert_eq!((change.revision, change.kind), (rev, IdentityEventKind::SignedOut));

    data.select("patients", &Query::new()).await.unwrap();
    assert_eq!(srv.fake.seen.lock().unwrap().last().unwrap().3, API_KEY);
}

#[tokio::test]
async fn rejected_refresh_expires_the_session() {
    let srv = TestServer::spawn().await;
    let (idp, _) = srv.adapters();
    idp.sign_in("admin@clinic.test", "pw-admin").await.unwrap();
    let mut changes = idp.subscribe();
    changes.recv().await.unwrap();

    assert_eq!(idp.refresh_session().await.unwrap_err(), AuthError::SessionExpired);
    assert_eq!(changes.recv().await.unwrap().kind, IdentityEventKind::SessionExpired);
}

#[tokio::test]
async fn create_account_returns_new_principal() {
    let srv = TestServer::spawn().await;
    let (idp, _) = srv.adapters();
    idp.create_account("new@clinic.test", "secret1").await.unwrap();
}

#[tokio::test]
async fn query_renders_as_rest_parameters() {
    let srv = TestServer::spawn().await;
    let (_, data) = srv.adapters();
    let q = Query::new()
        .eq("status", "pending")
        .order_by("invoice_date", false)
        .limit(10);
    data.select("invoices", &q).await.unwrap();
    let (_, table, query, _) = srv.fake.seen.lock().unwrap()[0].clone();
    assert_eq!(table, "invoices");
    assert_eq!(query, "select=*&status=eq.pending&order=invoice_date.desc&limit=10");
}

#[tokio::test]
async fn server_refusal_is_an_api_error() {
    let srv = TestServer::spawn().await;
    *srv.fake.fail_with.lock().unwrap() = Some(StatusCode::FORBIDDEN);
    let (_, data) = srv.adapters();
    let err = data.select("user_profiles", &Query::new()).await.unwrap_err();
    assert_eq!(
        err,
        DataRequestError::Api {
            status: 403,
            message: "permission denied for table".into()
        }
    );
    assert!(!err.is_transient());
}

#[tokio::test]
async fn typed_collection_round_trip() {
    let srv = TestServer::spawn().await;
    let (_, data) = srv.adapters();
    let patients: Collection<Patient> = Collection::new(Arc::new(data));

    let draft = dentalcare_patients::PatientDraft {
        full_name: "Sara Idrissi".into(),
        ..Default::default()
    };
    let today = chrono::NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    let patient = Patient::create(draft, PrincipalId::new(), today).unwrap();

    let stored = patients.insert(&patient).await.unwrap();
    assert!(stored.created_at.is_some());

    let renamed = patients
        .patch(&stored.id, json!({"full_name": "Sara I."}))
        .await
        .unwrap();
    assert_eq!(renamed.full_name, "Sara I.");

    patients.delete(&stored.id).await.unwrap();
    assert_eq!(patients.delete(&stored.id).await, Err(DataRequestError::NotFound));
}
