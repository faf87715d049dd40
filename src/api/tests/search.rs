use super::*;

#[tokio::test]
async fn test_search_endpoint_returns_annotated_results() {
    let api = create_test_api().await;
    api.t.catalog.set_page(2, helpers::items("v", 3));
    api.downloader.history().record("v3").await.unwrap();

    let (status, json) = send(&api.app, get("/search?q=ocean&page=2")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["query"], "ocean");
    assert_eq!(json["page"], 2);
    assert_eq!(json["has_previous"], true);
    assert_eq!(json["has_next"], true);
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["item"]["id"], "v1");
    assert_eq!(items[0]["downloaded"], false);
    assert_eq!(items[2]["downloaded"], true);
}

#[tokio::test]
async fn test_search_rejects_empty_query() {
    let api = create_test_api().await;

    let (status, json) = send(&api.app, get("/search?q=%20")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert!(api.t.catalog.calls().is_empty());
}

#[tokio::test]
async fn test_search_without_api_key_is_config_error() {
    let t = helpers::create_test_downloader_with(helpers::StubFetcher::default(), |config| {
        config.api_key.clear();
    })
    .await;
    let api = create_test_api_from(t);

    let (status, json) = send(&api.app, get("/search?q=ocean")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "config_error");
    assert_eq!(json["error"]["details"]["key"], "api_key");
}

#[tokio::test]
async fn test_search_upstream_failure_is_bad_gateway() {
    let api = create_test_api().await;
    api.t.catalog.fail_page(1);

    let (status, json) = send(&api.app, get("/search?q=ocean")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "catalog_api_error");
}

#[tokio::test]
async fn test_results_before_and_after_search() {
    let api = create_test_api().await;
    api.t.catalog.set_page(1, helpers::items("v", 1));

    let (status, _) = send(&api.app, get("/results")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&api.app, get("/search?q=ocean")).await;
    let (status, json) = send(&api.app, get("/results")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["items"][0]["item"]["id"], "v1");
}

#[tokio::test]
async fn test_download_endpoint_downloads_current_result() {
    let api = create_test_api().await;
    api.t.catalog.set_page(1, helpers::items("v", 2));
    send(&api.app, get("/search?q=ocean")).await;

    let (status, json) = send(&api.app, post_json("/downloads", serde_json::json!({"id": "v2"}))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["id"], "v2");
    assert!(json["path"].as_str().unwrap().ends_with("pixabay-v2.mp4"));
    assert!(api.downloader.history().contains("v2"));
}

#[tokio::test]
async fn test_download_endpoint_reports_failures_loudly() {
    let api = create_test_api().await;
    api.t.catalog.set_page(
        1,
        vec![helpers::item("ok"), helpers::item_without_variants("bare")],
    );
    send(&api.app, get("/search?q=ocean")).await;

    let (status, json) = send(&api.app, post_json("/downloads", serde_json::json!({"id": "bare"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "no_variant");

    let (status, json) = send(&api.app, post_json("/downloads", serde_json::json!({"id": "nope"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_download_endpoint_stays_inside_download_dir() {
    let api = create_test_api().await;
    api.t.catalog.set_page(1, helpers::items("v", 1));
    send(&api.app, get("/search?q=ocean")).await;
    let outside = api.t.temp_dir.path().join("not-downloads").join("victim.txt");

    for file_name in [
        "../victim.txt".to_string(),
        outside.display().to_string(),
        "nested/clip.mp4".to_string(),
    ] {
        let (status, json) = send(
            &api.app,
            post_json("/downloads", serde_json::json!({"id": "v1", "file_name": file_name})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{file_name} must be rejected");
        assert_eq!(json["error"]["code"], "validation_error");
    }

    // Arbitrary paths are not accepted under any field name
    let (status, _) = send(
        &api.app,
        post_json(
            "/downloads",
            serde_json::json!({"id": "v1", "destination": outside}),
        ),
    )
    .await;
    assert!(status.is_client_error());

    assert!(!outside.exists());
    assert!(!api.t.temp_dir.path().join("victim.txt").exists());
    assert!(api.t.fetcher.calls().is_empty());
    assert!(!api.downloader.history().contains("v1"));
}

#[tokio::test]
async fn test_download_endpoint_accepts_custom_file_name() {
    let api = create_test_api().await;
    api.t.catalog.set_page(1, helpers::items("v", 1));
    send(&api.app, get("/search?q=ocean")).await;

    let (status, json) = send(
        &api.app,
        post_json("/downloads", serde_json::json!({"id": "v1", "file_name": "sunset.mp4"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let expected = api.t.temp_dir.path().join("downloads").join("sunset.mp4");
    assert_eq!(json["path"], expected.display().to_string());
    assert!(expected.exists());
}
