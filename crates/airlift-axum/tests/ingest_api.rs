//! Ingestion pipeline tests: upload, hashing, local persistence, and the
//! manifest that follows.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{
    android_metadata, build_server, read_body, single_part, upload_body, zip_bundle,
};

const BOUNDARY: &str = "----airlift-test-boundary";

/// sha256("x"), truncated hex and base64url forms.
const KEY_OF_X: &str = "2d711642b726b04401627ca9fbac32f5";
const HASH_OF_X: &str = "LXEWQrcmsEQBYnyp-6wy9chTD7GQPMTbAiWHF5IaSIE";

fn upload_request(token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

fn demo_upload_body() -> Vec<u8> {
    let zip = zip_bundle(&[
        (
            "metadata.json",
            android_metadata("bundles/android-a.js").as_bytes(),
        ),
        ("bundles/android-a.js", b"x"),
    ]);
    upload_body(
        BOUNDARY,
        &[("projectSlug", "demo"), ("runtimeVersion", "1")],
        &zip,
    )
}

#[tokio::test]
async fn s3_upload_hashes_and_serves_a_manifest() {
    let server = build_server("test-secret", false).await;

    let response = server
        .app
        .clone()
        .oneshot(upload_request(Some("test-secret"), demo_upload_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created: serde_json::Value =
        serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(created["projectSlug"], "demo");
    assert_eq!(created["runtimeVersion"], "1");
    assert_eq!(created["channel"], "production");
    assert_eq!(created["rolloutPercentage"], 100);
    let android = &created["metadata"]["platforms"]["android"];
    assert_eq!(android["bundleKey"], KEY_OF_X);
    assert_eq!(android["bundleHash"], HASH_OF_X);
    assert_eq!(android["bundlePath"], "bundles/android-a.js");
    let update_id = created["updateId"].as_str().unwrap().to_string();
    assert_eq!(update_id.len(), 36);

    // The bundle landed in the local updates directory
    let local = server.updates_dir.path().join("bundles/android-a.js");
    assert_eq!(std::fs::read(&local).unwrap(), b"x");

    // And the manifest endpoint now serves it
    let response = server
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/demo/manifest")
                .header("expo-protocol-version", "1")
                .header("expo-platform", "android")
                .header("expo-runtime-version", "1")
                .header("expo-channel-name", "production")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let ct = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let body = read_body(response).await;
    let (headers, part_body) = single_part(&ct, &body);
    assert!(headers.contains(r#"name="manifest""#));

    let manifest: serde_json::Value = serde_json::from_str(&part_body).unwrap();
    assert_eq!(manifest["id"], update_id.as_str());
    assert_eq!(manifest["runtimeVersion"], "1");
    assert_eq!(manifest["launchAsset"]["fileExtension"], ".bundle");
    assert_eq!(
        manifest["launchAsset"]["contentType"],
        "application/javascript"
    );
    assert_eq!(manifest["launchAsset"]["key"], KEY_OF_X);
    assert_eq!(manifest["launchAsset"]["hash"], HASH_OF_X);
    let url = manifest["launchAsset"]["url"].as_str().unwrap();
    assert!(
        url.starts_with(
            "https://ota.example.com/api/assets?asset=bundles%2Fandroid-a.js&runtimeVersion=1&platform=android"
        ),
        "unexpected launch asset url: {url}"
    );
    assert!(url.contains("&isLaunchAsset=true&updateId="));
    assert_eq!(manifest["assets"], serde_json::json!([]));
    assert_eq!(manifest["metadata"], serde_json::json!({}));
    assert!(manifest["extra"]["expoClient"].is_null());

    // S4: a client already on this update gets a directive instead
    let response = server
        .app
        .oneshot(
            Request::builder()
                .uri("/api/demo/manifest")
                .header("expo-protocol-version", "1")
                .header("expo-platform", "android")
                .header("expo-runtime-version", "1")
                .header("expo-current-update-id", update_id.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let ct = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let body = read_body(response).await;
    let (headers, part_body) = single_part(&ct, &body);
    assert!(headers.contains(r#"name="directive""#));
    assert_eq!(part_body, r#"{"type":"noUpdateAvailable"}"#);
}

#[tokio::test]
async fn upload_auto_creates_the_project() {
    let server = build_server("", false).await;

    let response = server
        .app
        .oneshot(upload_request(None, demo_upload_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let project = server.stores.projects.get("demo").await.unwrap().unwrap();
    assert_eq!(project.name, "demo");
    assert_eq!(project.update_count, 1);
}

#[tokio::test]
async fn upload_fields_parse_and_clamp() {
    let server = build_server("", false).await;

    let zip = zip_bundle(&[
        (
            "metadata.json",
            android_metadata("bundles/android-a.js").as_bytes(),
        ),
        ("bundles/android-a.js", b"x"),
    ]);
    let body = upload_body(
        BOUNDARY,
        &[
            ("projectSlug", "demo"),
            ("runtimeVersion", "2"),
            ("channel", "beta"),
            ("platform", "android"),
            ("rolloutPercentage", "250"),
            ("updateId", "de305d54-75b4-431b-adb2-eb6b9e546014"),
        ],
        &zip,
    );

    let response = server
        .app
        .oneshot(upload_request(None, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created: serde_json::Value =
        serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(created["channel"], "beta");
    assert_eq!(created["platform"], "android");
    assert_eq!(created["rolloutPercentage"], 100);
    assert_eq!(created["updateId"], "de305d54-75b4-431b-adb2-eb6b9e546014");
}

#[tokio::test]
async fn upload_requires_slug_runtime_and_bundle() {
    let server = build_server("", false).await;

    let zip = zip_bundle(&[(
        "metadata.json",
        android_metadata("bundles/android-a.js").as_bytes(),
    )]);

    // Missing projectSlug
    let body = upload_body(BOUNDARY, &[("runtimeVersion", "1")], &zip);
    let response = server
        .app
        .clone()
        .oneshot(upload_request(None, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Missing runtimeVersion
    let body = upload_body(BOUNDARY, &[("projectSlug", "demo")], &zip);
    let response = server
        .app
        .clone()
        .oneshot(upload_request(None, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Garbage archive bytes
    let body = upload_body(
        BOUNDARY,
        &[("projectSlug", "demo"), ("runtimeVersion", "1")],
        b"not a zip at all",
    );
    let response = server
        .app
        .oneshot(upload_request(None, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_rejects_bad_bearer_tokens() {
    let server = build_server("test-secret", false).await;

    let response = server
        .app
        .clone()
        .oneshot(upload_request(None, demo_upload_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server
        .app
        .oneshot(upload_request(Some("wrong"), demo_upload_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn upload_accepts_a_valid_api_key() {
    let server = build_server("test-secret", false).await;

    let issued = server
        .stores
        .api_keys
        .create("ci", vec!["publish".to_string()])
        .await
        .unwrap();

    let response = server
        .app
        .oneshot(upload_request(Some(&issued.key), demo_upload_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn upload_attaches_expo_config_to_the_manifest() {
    let server = build_server("", false).await;

    let zip = zip_bundle(&[
        (
            "metadata.json",
            android_metadata("bundles/android-a.js").as_bytes(),
        ),
        ("bundles/android-a.js", b"x"),
        (
            "expoConfig.json",
            br#"{"name": "Demo App", "slug": "demo"}"#,
        ),
    ]);
    let body = upload_body(
        BOUNDARY,
        &[("projectSlug", "demo"), ("runtimeVersion", "1")],
        &zip,
    );
    let response = server
        .app
        .clone()
        .oneshot(upload_request(None, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = server
        .app
        .oneshot(
            Request::builder()
                .uri("/api/demo/manifest")
                .header("expo-protocol-version", "1")
                .header("expo-platform", "android")
                .header("expo-runtime-version", "1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let ct = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let body = read_body(response).await;
    let (_, part_body) = single_part(&ct, &body);
    let manifest: serde_json::Value = serde_json::from_str(&part_body).unwrap();
    assert_eq!(manifest["extra"]["expoClient"]["name"], "Demo App");
}
