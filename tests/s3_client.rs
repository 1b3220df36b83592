use mockito::{Matcher, Server};
use std::collections::HashMap;
use std::sync::Arc;

use s3_files::config::{self, EnvDefaults};
use s3_files::storage::S3Client;
use s3_files::types::ByteRange;
use s3_files::{ConfigOverrides, GetOptions, ObjectClient, PutOptions};

fn client_for(server: &Server) -> ObjectClient {
    let overrides = ConfigOverrides {
        endpoint: Some(server.url()),
        path_style: Some(true),
        access_key_id: Some("test-access-key".to_string()),
        secret_access_key: Some("test-secret-key".to_string()),
        ..ConfigOverrides::bucket("bkt").with_region("us-east-2")
    };
    let config = config::resolve(overrides, None, &EnvDefaults::default()).unwrap();
    let store = S3Client::new(&config).unwrap();
    ObjectClient::new(config, Arc::new(store))
}

#[tokio::test]
async fn test_put_sends_acl_disposition_and_type() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/bkt/docs/report.pdf")
        .match_header("x-amz-acl", "public-read")
        .match_header("content-disposition", "inline")
        .match_header("content-type", "application/pdf")
        .match_body("pdf bytes")
        .with_status(200)
        .create_async()
        .await;

    let client = client_for(&server);
    let url = client
        .save(Some("/docs/report.pdf"), Some("pdf bytes".into()), PutOptions::default())
        .await
        .unwrap();

    assert_eq!(url.as_deref(), Some("https://bkt.s3.amazonaws.com/docs/report.pdf"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_put_sends_cache_control_and_metadata() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/bkt/images/cat.png")
        .match_header("x-amz-acl", "private")
        .match_header("content-disposition", "attachment")
        .match_header("cache-control", "max-age=3600")
        .match_header("x-amz-meta-owner", "tests")
        .match_header("content-type", "image/png")
        .with_status(200)
        .create_async()
        .await;

    let client = client_for(&server);
    let options = PutOptions {
        acl: Some("private".to_string()),
        content_disposition: Some("attachment".to_string()),
        cache_control: Some("max-age=3600".to_string()),
        metadata: HashMap::from([("owner".to_string(), "tests".to_string())]),
        ..Default::default()
    };
    client
        .save(Some("images/cat.png"), Some("png".into()), options)
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_put_unknown_extension_sends_s3_default_type() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/bkt/blob.xyz")
        .match_header("content-type", "binary/octet-stream")
        .with_status(200)
        .create_async()
        .await;

    let client = client_for(&server);
    let url = client
        .save(Some("blob.xyz"), Some(vec![1u8, 2, 3].into()), PutOptions::default())
        .await
        .unwrap();

    assert_eq!(url.as_deref(), Some("https://bkt.s3.amazonaws.com/blob.xyz"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_range_sends_range_header() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/bkt/range.txt")
        .match_header("range", "bytes=2-5")
        .with_status(206)
        .with_header("content-type", "text/plain")
        .with_body("2345")
        .create_async()
        .await;

    let client = client_for(&server);
    let options = GetOptions {
        range: Some(ByteRange { start: 2, end: Some(5) }),
    };
    let data = client.get("range.txt", options).await.unwrap();

    assert_eq!(data.body.as_ref(), b"2345");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_returns_body_and_headers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/bkt/test.txt")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_header("x-amz-meta-owner", "tests")
        .with_body("hello")
        .create_async()
        .await;

    let client = client_for(&server);
    let data = client
        .get("https://bkt.s3.amazonaws.com/test.txt", GetOptions::default())
        .await
        .unwrap();

    assert_eq!(data.body.as_ref(), b"hello");
    assert_eq!(data.content_type.as_deref(), Some("text/plain"));
    assert_eq!(data.metadata.get("owner").map(String::as_str), Some("tests"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_key_is_not_found() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/bkt/missing.txt")
        .with_status(404)
        .with_body("<Error><Code>NoSuchKey</Code></Error>")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.get("/missing.txt", GetOptions::default()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_returns_status() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/bkt/test.txt")
        .match_query(Matcher::Any)
        .with_status(204)
        .create_async()
        .await;

    let client = client_for(&server);
    let output = client.delete(Some("/test.txt")).await.unwrap().unwrap();

    assert_eq!(output.key, "test.txt");
    assert_eq!(output.status_code, 204);
    mock.assert_async().await;
}
