use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// How long `/slow` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub slug: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct NewItem {
    pub slug: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct ItemUpdate {
    pub name: String,
}

/// Error payload shape: `{"error":{"message":"..."}}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

/// What `/echo` saw on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

pub type Db = Arc<RwLock<HashMap<String, Item>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/{slug}", get(get_item).put(put_item))
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/slow", get(slow))
        .route("/chunked", get(chunked))
        .route("/broken-error", get(broken_error))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            error: ErrorDetail {
                message: message.to_string(),
            },
        }),
    )
}

async fn list_items(State(db): State<Db>) -> Json<Vec<Item>> {
    let items = db.read().await;
    let mut all: Vec<Item> = items.values().cloned().collect();
    all.sort_by(|a, b| a.slug.cmp(&b.slug));
    Json(all)
}

async fn create_item(State(db): State<Db>, Json(input): Json<NewItem>) -> Response {
    if input.name.trim().is_empty() || input.slug.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "bad input").into_response();
    }
    let item = Item {
        slug: input.slug,
        name: input.name,
    };
    db.write().await.insert(item.slug.clone(), item.clone());
    tracing::debug!(slug = %item.slug, "item created");
    (StatusCode::CREATED, Json(item)).into_response()
}

async fn get_item(State(db): State<Db>, Path(slug): Path<String>) -> Response {
    let items = db.read().await;
    match items.get(&slug) {
        Some(item) => Json(item.clone()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "item not found").into_response(),
    }
}

async fn put_item(
    State(db): State<Db>,
    Path(slug): Path<String>,
    Json(input): Json<ItemUpdate>,
) -> Response {
    if input.name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "bad input").into_response();
    }
    let item = Item {
        slug,
        name: input.name,
    };
    db.write().await.insert(item.slug.clone(), item.clone());
    Json(item).into_response()
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    Json(Echo {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        headers,
        body,
    })
}

async fn slow() -> &'static str {
    tokio::time::sleep(SLOW_DELAY).await;
    "\"finally\""
}

/// Streams the body so no `Content-Length` is advertised.
async fn chunked() -> Response {
    let parts = vec![
        Ok::<_, std::io::Error>("[\"alpha\","),
        Ok("\"beta\"]"),
    ];
    Response::builder()
        .header("content-type", "application/json")
        .body(Body::from_stream(futures::stream::iter(parts)))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn broken_error() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "<html>upstream exploded</html>")
}
