//! End-to-end dispatch tests
//!
//! Drives the Dispatcher through the public library API, against the
//! in-memory transport and against a local HTTP server.

use std::sync::Arc;

use bangumi_mcp::api::{BangumiClient, MockTransport, RawResponse};
use bangumi_mcp::mcp::McpServer;
use bangumi_mcp::tools::{Dispatcher, ToolCatalog, ToolRouter};
use chrono::{Datelike, NaiveDateTime};
use httpmock::Method::GET;
use httpmock::MockServer;
use reqwest::Method;
use serde_json::{Value, json};

fn dispatcher_with(mock: Arc<MockTransport>) -> Dispatcher {
    Dispatcher::new(BangumiClient::new(mock)).unwrap()
}

/// Integration test: every catalog entry has a handler and nothing else does
#[tokio::test]
async fn test_every_tool_resolves() {
    let mock = Arc::new(MockTransport::new());
    let dispatcher = dispatcher_with(mock);
    let catalog = ToolCatalog::builtin().unwrap();

    let listed: Vec<String> = dispatcher.list_tools().into_iter().map(|t| t.name).collect();
    let expected: Vec<String> = catalog.list().into_iter().map(String::from).collect();
    assert_eq!(listed, expected);

    for name in &listed {
        let output = dispatcher.call_tool(name, Some(json!({}))).await;
        if let Some(message) = output.payload().get("error").and_then(Value::as_str) {
            assert!(!message.starts_with("Unknown tool"), "{} did not resolve", name);
        }
    }

    let output = dispatcher.call_tool("get_weather", None).await;
    assert!(output.is_error());
    assert_eq!(output.payload(), &json!({"error": "Unknown tool: get_weather"}));
}

/// Integration test: required arguments are checked before any backend call
#[tokio::test]
async fn test_missing_required_makes_no_backend_call() {
    let catalog = ToolCatalog::builtin().unwrap();

    for tool in catalog.all() {
        let required = tool.required();
        if required.is_empty() {
            continue;
        }
        let mock = Arc::new(MockTransport::new());
        let dispatcher = dispatcher_with(Arc::clone(&mock));

        let output = dispatcher.call_tool(&tool.name, None).await;
        assert!(output.is_error(), "{} accepted missing arguments", tool.name);
        assert_eq!(mock.call_count(), 0, "{} called the backend", tool.name);
        let message = output.payload()["error"].as_str().unwrap();
        assert!(message.ends_with("parameter is required"), "{}: {}", tool.name, message);
    }
}

/// Integration test: nulls are stripped from success payloads at every depth
#[tokio::test]
async fn test_success_payload_has_no_nulls() {
    let mock = Arc::new(MockTransport::new().with_response(
        Method::GET,
        "/v0/subjects/12",
        RawResponse::json(
            200,
            &json!({
                "id": 12,
                "name": "Chobits",
                "summary": null,
                "rating": {"score": 7.6, "rank": null},
                "tags": [{"name": "manga", "count": 3, "total_cont": null}]
            }),
        ),
    ));
    let dispatcher = dispatcher_with(mock);

    let output = dispatcher
        .call_tool("get_subject_info", Some(json!({"subject_id": 12})))
        .await;
    assert!(!output.is_error());
    assert_eq!(
        output.payload(),
        &json!({
            "id": 12,
            "name": "Chobits",
            "rating": {"score": 7.6},
            "tags": [{"name": "manga", "count": 3}]
        })
    );
}

/// Integration test: backend errors come back as reported failures, body intact
#[tokio::test]
async fn test_backend_error_passthrough() {
    let body = json!({"title": "Unauthorized", "description": "need login", "details": null});
    let mock = Arc::new(MockTransport::new().with_fallback(RawResponse::json(401, &body)));
    let dispatcher = dispatcher_with(mock);

    let output = dispatcher.call_tool("get_me_info", None).await;
    assert!(output.is_error());
    assert_eq!(output.payload(), &body);
}

/// Integration test: the image type is validated before the request
#[tokio::test]
async fn test_image_type_validated() {
    let mock = Arc::new(MockTransport::new());
    let dispatcher = dispatcher_with(Arc::clone(&mock));

    let output = dispatcher
        .call_tool("get_subject_image", Some(json!({"subject_id": 12, "type": "huge"})))
        .await;
    assert!(output.is_error());
    assert_eq!(mock.call_count(), 0);
}

/// Integration test: the 302 Location of the image endpoint becomes the url
#[tokio::test]
async fn test_image_redirect_over_http() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v0/subjects/12/image")
                .query_param("type", "small");
            then.status(302).header("Location", "https://x/img.jpg");
        })
        .await;

    let client = BangumiClient::connect(&server.base_url(), None, "bangumi-mcp-test").unwrap();
    let dispatcher = Dispatcher::new(client).unwrap();
    let output = dispatcher
        .call_tool("get_subject_image", Some(json!({"subject_id": 12, "type": "small"})))
        .await;

    mock.assert_async().await;
    assert!(!output.is_error());
    assert_eq!(output.payload(), &json!({"url": "https://x/img.jpg", "type": "small"}));
}

/// Integration test: the clock moves forward and the weekday matches the date
#[tokio::test]
async fn test_current_time_is_consistent() {
    let dispatcher = dispatcher_with(Arc::new(MockTransport::new()));

    let first = dispatcher.call_tool("get_current_time", None).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = dispatcher.call_tool("get_current_time", None).await;

    let parse = |payload: &Value| {
        let stamp = payload["current_time"].as_str().unwrap();
        let time = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").unwrap();
        let weekday = payload["weekday"].as_str().unwrap().to_string();
        (time, weekday)
    };
    let (t1, w1) = parse(first.payload());
    let (t2, w2) = parse(second.payload());

    let delta = t2 - t1;
    assert!(delta >= chrono::Duration::zero());
    assert!(delta <= chrono::Duration::seconds(2));
    assert_eq!(t1.weekday().to_string(), w1[..3]);
    assert_eq!(t2.weekday().to_string(), w2[..3]);
}

/// Integration test: one protocol session over the shared Dispatcher
#[tokio::test]
async fn test_protocol_session() {
    let mock = Arc::new(MockTransport::new().with_response(
        Method::GET,
        "/calendar",
        RawResponse::json(200, &json!([{"weekday": {"en": "Mon", "id": 1}, "items": []}])),
    ));
    let server = McpServer::new(Arc::new(dispatcher_with(Arc::clone(&mock))));

    let response = server
        .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"get_calendar"}}"#)
        .await
        .unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["isError"], false);
    let payload: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(payload["calendar"][0]["weekday"]["en"], "Mon");
    assert_eq!(mock.call_count(), 1);
}
