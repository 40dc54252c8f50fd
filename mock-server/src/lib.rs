use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, RawQuery, State},
    http::{Method, StatusCode},
    routing::any,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const API_ROOT: &str = "/services/api/rest/json";

/// Methods advertised by `system.api.list`.
pub const API_METHODS: &[&str] = &[
    "auth.gettoken",
    "system.api.list",
    "users",
    "users/types",
    "users/{id}",
    "users/disable/{id}",
    "users/enable/{id}",
];

#[derive(Clone, Debug)]
pub struct Settings {
    pub username: String,
    pub password: String,
    /// When set, every call must carry a matching `api_key`.
    pub api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "secret".to_string(),
            api_key: Some("pub-key".to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub usertype_id: u64,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
    /// Any other profile field (`company`, `city`, `language`, ...).
    #[serde(flatten)]
    pub profile: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserType {
    pub id: u64,
    pub name: String,
}

pub fn user_types() -> Vec<UserType> {
    [(1, "learner"), (2, "trainer"), (3, "manager")]
        .into_iter()
        .map(|(id, name)| UserType {
            id,
            name: name.to_string(),
        })
        .collect()
}

#[derive(Default)]
struct Store {
    users: BTreeMap<u64, User>,
    passwords: HashMap<u64, String>,
    tokens: HashSet<String>,
    next_id: u64,
}

#[derive(Clone)]
struct AppState {
    settings: Arc<Settings>,
    store: Arc<RwLock<Store>>,
}

type Params = HashMap<String, String>;
type Reply = (StatusCode, Json<Value>);

fn ok(result: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "status": 0, "result": result })))
}

fn fail(code: StatusCode, message: &str) -> Reply {
    (code, Json(json!({ "status": -1, "message": message })))
}

fn flag(params: &Params, key: &str) -> bool {
    matches!(params.get(key).map(String::as_str), Some("1" | "true"))
}

pub fn app() -> Router {
    app_with(Settings::default())
}

pub fn app_with(settings: Settings) -> Router {
    let state = AppState {
        settings: Arc::new(settings),
        store: Arc::new(RwLock::new(Store {
            next_id: 1,
            ..Store::default()
        })),
    };
    Router::new()
        .route(&format!("{API_ROOT}/{{*call}}"), any(dispatch))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, Settings::default()).await
}

pub async fn run_with(listener: TcpListener, settings: Settings) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(settings)).await
}

/// Split `users&limit=20&offset=0` into the call and its unencoded arguments,
/// then merge in any `?` query string and form body.
fn collect_params(call: &str, query: Option<&str>, body: &str) -> (String, Params) {
    let (call, suffix) = match call.split_once('&') {
        Some((call, suffix)) => (call, suffix),
        None => (call, ""),
    };
    let mut params = Params::new();
    for source in [suffix, query.unwrap_or_default(), body] {
        for (key, value) in url::form_urlencoded::parse(source.as_bytes()) {
            params.insert(key.into_owned(), value.into_owned());
        }
    }
    (call.to_string(), params)
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    Path(call): Path<String>,
    RawQuery(query): RawQuery,
    body: String,
) -> Reply {
    let (call, params) = collect_params(&call, query.as_deref(), &body);
    debug!(%method, %call, "mock apolearn call");

    if let Some(expected) = &state.settings.api_key {
        if params.get("api_key") != Some(expected) {
            return fail(StatusCode::UNAUTHORIZED, "Invalid or missing API key");
        }
    }

    let segments: Vec<&str> = call.split('/').collect();
    match (method.as_str(), segments.as_slice()) {
        ("POST", ["auth.gettoken"]) => get_token(&state, &params).await,
        ("GET", ["system.api.list"]) => ok(json!(API_METHODS)),
        _ => {
            let authorized = match params.get("auth_token") {
                Some(token) => state.store.read().await.tokens.contains(token),
                None => false,
            };
            if !authorized {
                return fail(StatusCode::UNAUTHORIZED, "Invalid or expired auth_token");
            }
            match (method.as_str(), segments.as_slice()) {
                ("GET", ["users"]) => list_users(&state, &params).await,
                ("GET", ["users", "types"]) => ok(json!(user_types())),
                ("POST", ["users"]) => create_user(&state, params).await,
                ("PUT", ["users", "disable", id]) => {
                    set_enabled(&state, id, false, params.get("reason").cloned()).await
                }
                ("PUT", ["users", "enable", id]) => set_enabled(&state, id, true, None).await,
                ("PUT", ["users", id]) => edit_user(&state, id, params).await,
                _ => fail(StatusCode::NOT_FOUND, "Method not found"),
            }
        }
    }
}

async fn get_token(state: &AppState, params: &Params) -> Reply {
    let settings = &state.settings;
    let valid = params.get("username") == Some(&settings.username)
        && params.get("password") == Some(&settings.password);
    if !valid {
        return fail(StatusCode::OK, "Invalid username or password");
    }
    let token = Uuid::new_v4().simple().to_string();
    state.store.write().await.tokens.insert(token.clone());
    info!("issued auth token");
    ok(json!(token))
}

async fn list_users(state: &AppState, params: &Params) -> Reply {
    let offset = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(20);
    let enabled_only = flag(params, "enabledonly");
    let store = state.store.read().await;
    let users: Vec<&User> = store
        .users
        .values()
        .filter(|u| !enabled_only || u.enabled)
        .skip(offset)
        .take(limit)
        .collect();
    ok(json!(users))
}

const RESERVED: &[&str] = &[
    "auth_token",
    "api_key",
    "sendusercredential",
    "password",
    "firstname",
    "lastname",
    "email",
    "usertype_id",
];

fn profile_fields(params: &Params) -> impl Iterator<Item = (&String, &String)> {
    params.iter().filter(|(k, _)| !RESERVED.contains(&k.as_str()))
}

async fn create_user(state: &AppState, params: Params) -> Reply {
    let (Some(firstname), Some(lastname), Some(email)) = (
        params.get("firstname"),
        params.get("lastname"),
        params.get("email"),
    ) else {
        return fail(StatusCode::BAD_REQUEST, "firstname, lastname and email are required");
    };

    let mut store = state.store.write().await;
    if store.users.values().any(|u| &u.email == email) {
        return fail(StatusCode::CONFLICT, "Email already registered");
    }

    let id = store.next_id;
    store.next_id += 1;
    let password = params
        .get("password")
        .cloned()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string()[..10].to_string());
    let user = User {
        id,
        username: format!("{}.{}", firstname, lastname).to_lowercase(),
        firstname: firstname.clone(),
        lastname: lastname.clone(),
        email: email.clone(),
        usertype_id: params.get("usertype_id").and_then(|v| v.parse().ok()).unwrap_or(1),
        enabled: true,
        disabled_reason: None,
        profile: profile_fields(&params)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    };
    store.users.insert(id, user.clone());
    store.passwords.insert(id, password.clone());

    let mut result = json!(user);
    result["password"] = json!(password);
    result["credentials_sent"] = json!(flag(&params, "sendusercredential"));
    ok(result)
}

async fn edit_user(state: &AppState, id: &str, params: Params) -> Reply {
    let Ok(id) = id.parse::<u64>() else {
        return fail(StatusCode::BAD_REQUEST, "Invalid user id");
    };
    let mut store = state.store.write().await;
    let Some(user) = store.users.get_mut(&id) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    if let Some(v) = params.get("firstname") {
        user.firstname = v.clone();
    }
    if let Some(v) = params.get("lastname") {
        user.lastname = v.clone();
    }
    if let Some(v) = params.get("email") {
        user.email = v.clone();
    }
    if let Some(v) = params.get("usertype_id").and_then(|v| v.parse().ok()) {
        user.usertype_id = v;
    }
    for (k, v) in profile_fields(&params) {
        user.profile.insert(k.clone(), v.clone());
    }
    let mut result = json!(user.clone());
    if let Some(password) = params.get("password") {
        store.passwords.insert(id, password.clone());
        result["password"] = json!(password);
    }
    result["credentials_sent"] = json!(flag(&params, "sendusercredential"));
    ok(result)
}

async fn set_enabled(state: &AppState, id: &str, enabled: bool, reason: Option<String>) -> Reply {
    let Ok(id) = id.parse::<u64>() else {
        return fail(StatusCode::BAD_REQUEST, "Invalid user id");
    };
    let mut store = state.store.write().await;
    let Some(user) = store.users.get_mut(&id) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    user.enabled = enabled;
    user.disabled_reason = if enabled { None } else { reason };
    ok(json!({ "id": id }))
}
