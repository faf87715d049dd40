use super::*;
use crate::api::routes::event_name;

#[tokio::test]
async fn test_health_endpoint() {
    let api = create_test_api().await;

    let (status, json) = send(&api.app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let api = create_test_api().await;

    let (status, json) = send(&api.app, get("/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["info"]["title"], "pixabay-dl REST API");
    assert!(json["paths"].get("/batch").is_some());
}

#[tokio::test]
async fn test_config_endpoint_redacts_api_key() {
    let api = create_test_api().await;

    let (status, json) = send(&api.app, get("/config")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["api_key"], "********");
    assert_eq!(json["catalog"]["page_size"], helpers::TEST_PAGE_SIZE);
}

#[tokio::test]
async fn test_events_endpoint_is_event_stream() {
    let api = create_test_api().await;

    let response = api.app.clone().oneshot(get("/events")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
}

#[test]
fn test_event_names_match_serialized_tags() {
    let events = [
        Event::Searching {
            query: "q".to_string(),
            page: 1,
        },
        Event::HistoryChanged { count: 2 },
        Event::Error {
            message: "boom".to_string(),
        },
        Event::Shutdown,
    ];

    for event in events {
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event_name(&event));
    }
}

#[tokio::test]
async fn test_shutdown_endpoint_shuts_downloader_down() {
    let api = create_test_api().await;
    let state = AppState::new(api.downloader.clone(), api.downloader.get_config());
    let token = state.shutdown_token.clone();
    let app = create_router_with_state(state);
    let mut rx = api.downloader.subscribe();

    let (status, json) = send(&app, Request::builder()
        .method("POST")
        .uri("/shutdown")
        .body(Body::empty())
        .unwrap()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "shutdown initiated");

    tokio::time::timeout(Duration::from_secs(5), token.cancelled())
        .await
        .expect("server shutdown signal never fired");
    assert_eq!(rx.recv().await.unwrap(), Event::Shutdown);
}
