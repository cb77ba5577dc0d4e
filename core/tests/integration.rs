//! End-to-end calls against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port, then drives
//! `RestClient` over real HTTP through the default reqwest transport. The
//! `/echo` routes report exactly what arrived on the wire, which lets the
//! tests check URIs, bodies and headers as the server saw them.

use std::time::Duration;

use mock_server::{Echo, ErrorBody, Item};
use restcall_core::{
    HttpMethod, JsonAdapter, ReadError, ReadMode, RestClient, RestError, Structured,
    TransportError,
};
use serde::Serialize;

#[derive(Serialize)]
struct NewItem<'a> {
    slug: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct Rename<'a> {
    name: &'a str,
}

/// Start the mock server on a random port and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn client(base: &str, path: &str) -> RestClient<JsonAdapter> {
    RestClient::new(JsonAdapter, &format!("{base}{path}")).unwrap()
}

fn echo_header<'a>(echo: &'a Echo, name: &str) -> Vec<&'a str> {
    echo.headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
        .collect()
}

#[tokio::test]
async fn get_without_query_hits_endpoint_unchanged() {
    let base = start_server();
    let echo = client(&base, "/echo").get::<Echo>().await.unwrap();

    assert_eq!(echo.status(), 200);
    assert_eq!(echo.data.method, "GET");
    assert_eq!(echo.data.path, "/echo");
    assert!(echo.data.body.is_empty());
    assert_eq!(echo_header(&echo.data, "content-type"), vec!["application/json"]);
}

#[tokio::test]
async fn primitive_query_becomes_trailing_segment() {
    let base = start_server();
    let echo = client(&base, "/echo")
        .get_with_query::<Echo, _>(&42)
        .await
        .unwrap();

    assert_eq!(echo.data.path, "/echo/42");
}

#[tokio::test]
async fn structured_query_is_percent_encoded() {
    let base = start_server();
    let query = Structured(serde_json::json!({"a": 1}));
    let echo = client(&base, "/echo")
        .get_with_query::<Echo, _>(&query)
        .await
        .unwrap();

    assert_eq!(echo.data.path, "/echo/%7B%22a%22%3A1%7D");
}

#[tokio::test]
async fn put_sends_serialized_body_to_slug() {
    let base = start_server();
    let body = Rename { name: "x" };
    let echo = client(&base, "/echo")
        .put::<Echo, _, _>(&body, "abc-slug")
        .await
        .unwrap();

    assert_eq!(echo.data.method, "PUT");
    assert_eq!(echo.data.path, "/echo/abc-slug");
    assert_eq!(echo.data.body, serde_json::to_string(&body).unwrap());
}

#[tokio::test]
async fn get_silently_drops_body() {
    let base = start_server();
    let body = Rename { name: "never sent" };
    let echo = client(&base, "/echo")
        .call::<Echo, _, ()>(HttpMethod::Get, Some(&body), None)
        .await
        .unwrap();

    assert_eq!(echo.data.method, "GET");
    assert!(echo.data.body.is_empty());
}

#[tokio::test]
async fn client_headers_reach_the_server() {
    let base = start_server();
    let mut client = client(&base, "/echo").with_header("Content-Type", "application/vnd.items+json");
    client.headers_mut().insert("X-Trace", "abc");

    let echo = client.get::<Echo>().await.unwrap();

    assert_eq!(echo_header(&echo.data, "x-trace"), vec!["abc"]);
    assert_eq!(
        echo_header(&echo.data, "content-type"),
        vec!["application/vnd.items+json"]
    );
}

#[tokio::test]
async fn item_lifecycle() {
    let base = start_server();
    let items = client(&base, "/items").with_error_type::<ErrorBody>();

    // Step 1: list - empty.
    let all = items.get::<Vec<Item>>().await.unwrap();
    assert!(all.data.is_empty());

    // Step 2: create.
    let created = items
        .post::<Item, _>(&NewItem {
            slug: "abc-slug",
            name: "first",
        })
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    assert_eq!(created.data.slug, "abc-slug");

    // Step 3: rename through PUT with a slug query.
    let renamed = items
        .put::<Item, _, _>(&Rename { name: "x" }, "abc-slug")
        .await
        .unwrap();
    assert_eq!(renamed.data.name, "x");

    // Step 4: fetch it back.
    let fetched = items.get_with_query::<Item, _>("abc-slug").await.unwrap();
    assert_eq!(fetched.data, renamed.data);

    // Step 5: missing item - typed error payload.
    let err = items.get_with_query::<Item, _>("nope").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.error_payload().unwrap().error.message, "item not found");
}

#[tokio::test]
async fn bad_input_exposes_server_message() {
    let base = start_server();
    let items = client(&base, "/items").with_error_type::<ErrorBody>();

    let err = items
        .post::<Item, _>(&NewItem { slug: "a", name: "" })
        .await
        .unwrap_err();

    match err {
        RestError::Rest(rex) => {
            assert_eq!(rex.status, 400);
            assert_eq!(rex.error.unwrap().error.message, "bad input");
        }
        other => panic!("expected Rest, got {other:?}"),
    }
}

#[tokio::test]
async fn error_without_declared_type_keeps_raw_body() {
    let base = start_server();
    let err = client(&base, "/items")
        .get_with_query::<Item, _>("missing")
        .await
        .unwrap_err();

    match err {
        RestError::Rest(rex) => {
            assert_eq!(rex.status, 404);
            assert!(rex.error.is_none());
            assert!(rex.body.contains("item not found"));
        }
        other => panic!("expected Rest, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_error_body_is_wrapped() {
    let base = start_server();
    let err = client(&base, "/broken-error")
        .with_error_type::<ErrorBody>()
        .get_text()
        .await
        .unwrap_err();

    assert!(matches!(err, RestError::ErrorHandling { status: 500, .. }));
    assert!(err.to_string().starts_with("Error handling Error from web server"));
}

#[tokio::test]
async fn slow_server_times_out() {
    let base = start_server();
    let err = client(&base, "/slow")
        .with_timeout(Duration::from_millis(1000))
        .get::<String>()
        .await
        .unwrap_err();

    assert!(matches!(err, RestError::Timeout { seconds: 1 }), "got {err:?}");
}

#[tokio::test]
async fn bounded_read_needs_content_length() {
    let base = start_server();

    let err = client(&base, "/chunked")
        .with_read_mode(ReadMode::Bounded)
        .get::<Vec<String>>()
        .await
        .unwrap_err();
    assert!(matches!(err, RestError::ResponseRead(ReadError::LengthUnknown)));

    let full = client(&base, "/chunked")
        .get::<Vec<String>>()
        .await
        .unwrap();
    assert_eq!(full.data, vec!["alpha".to_string(), "beta".to_string()]);
}

#[tokio::test]
async fn bounded_read_with_content_length() {
    let base = start_server();
    let echo = client(&base, "/echo")
        .with_read_mode(ReadMode::Bounded)
        .get::<Echo>()
        .await
        .unwrap();

    assert!(echo.response.content_length.is_some());
    assert_eq!(echo.data.path, "/echo");
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let err = RestClient::new(JsonAdapter, "http://127.0.0.1:1/items")
        .unwrap()
        .get_text()
        .await
        .unwrap_err();

    assert!(matches!(err, RestError::Transport(TransportError::Connect(_))), "got {err:?}");
}

#[tokio::test]
async fn concurrent_calls_share_one_client() {
    let base = start_server();
    let client = client(&base, "/echo");

    let calls = (0..8u32).map(|i| {
        let client = &client;
        async move { client.get_with_query::<Echo, _>(&i).await }
    });
    let results = futures::future::join_all(calls).await;

    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap().data.path, format!("/echo/{i}"));
    }
}
