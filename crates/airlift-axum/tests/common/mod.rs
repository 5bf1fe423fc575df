//! Shared helpers for the integration tests: a real router over an
//! in-memory store, ZIP fixtures, and multipart plumbing.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use http_body_util::BodyExt;
use tempfile::TempDir;

use airlift_axum::bootstrap::{ServerConfig, ServerContext};
use airlift_axum::routes::create_router;
use airlift_core::ports::Stores;
use airlift_core::rollout::RolloutSelector;
use airlift_core::signing::ManifestSigner;
use airlift_db::{StoreFactory, setup_test_database};

pub const SIGNING_KEY_PEM: &str = include_str!("../testdata/signing_key_pkcs8.pem");

pub struct TestServer {
    pub app: Router,
    pub stores: Stores,
    // Held so the served directory outlives the test
    pub updates_dir: Arc<TempDir>,
}

fn test_config(admin_secret: &str, updates_dir: &TempDir) -> ServerConfig {
    ServerConfig {
        port: 0,
        hostname: Some("https://ota.example.com".to_string()),
        database_url: None,
        cloudinary: None,
        admin_secret: admin_secret.to_string(),
        private_key_path: None,
        updates_dir: updates_dir.path().to_path_buf(),
    }
}

/// Router over a fresh in-memory store and temp updates directory.
pub async fn build_server(admin_secret: &str, with_signer: bool) -> TestServer {
    let pool = setup_test_database().await.unwrap();
    let stores = StoreFactory::build_stores(pool);
    let updates_dir = TempDir::new().unwrap();

    let signer = with_signer.then(|| ManifestSigner::from_pem(SIGNING_KEY_PEM).unwrap());
    let ctx = ServerContext {
        stores: Some(stores.clone()),
        object_store: None,
        signer,
        rollout: RolloutSelector::new(),
        config: test_config(admin_secret, &updates_dir),
    };

    TestServer {
        app: create_router(ctx),
        stores,
        updates_dir: Arc::new(updates_dir),
    }
}

/// Router with no metadata store connected.
pub async fn build_storeless_server() -> (Router, Arc<TempDir>) {
    let updates_dir = TempDir::new().unwrap();
    let ctx = ServerContext {
        stores: None,
        object_store: None,
        signer: None,
        rollout: RolloutSelector::new(),
        config: test_config("secret", &updates_dir),
    };
    (create_router(ctx), Arc::new(updates_dir))
}

/// Collect a response body into bytes.
pub async fn read_body(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Split a single-part multipart body into (part headers, part body).
pub fn single_part(content_type: &str, body: &[u8]) -> (String, String) {
    let boundary = content_type
        .split_once("boundary=")
        .expect("boundary parameter")
        .1;
    let text = std::str::from_utf8(body).unwrap();

    let opening = format!("--{boundary}\r\n");
    let closing = format!("\r\n--{boundary}--");
    let inner = text.strip_prefix(&opening).expect("opening boundary");
    let inner = &inner[..inner.find(&closing).expect("closing boundary")];

    let (headers, part_body) = inner.split_once("\r\n\r\n").expect("part header block");
    (headers.to_string(), part_body.to_string())
}

/// Build a ZIP archive in memory from (name, bytes) entries.
pub fn zip_bundle(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, bytes) in files {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

/// The `metadata.json` for a single android bundle with no assets.
pub fn android_metadata(bundle_path: &str) -> String {
    format!(
        r#"{{"version": 0, "bundler": "metro", "fileMetadata": {{"android": {{"bundle": "{bundle_path}", "assets": []}}}}}}"#
    )
}

/// Frame an ingestion upload as multipart/form-data.
pub fn upload_body(boundary: &str, fields: &[(&str, &str)], bundle: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, value) in fields {
        out.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    out.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"bundle\"; \
             filename=\"bundle.zip\"\r\nContent-Type: application/zip\r\n\r\n"
        )
        .as_bytes(),
    );
    out.extend_from_slice(bundle);
    out.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    out
}

/// Convenience GET request builder.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
