pub mod utils;

pub use utils::{install_crypto_provider, mount_token, test_config};

use chrono::Local;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::StorageClient;
use crate::types::ObjectDescriptor;

/// End-to-end: upload a payload, then download it back through the descriptor built from the
/// returned object, and compare bytes on disk.
#[test_log::test(tokio::test)]
async fn test_e2e_upload_then_download_round_trip() {
    let server = MockServer::start().await;
    // One token per operation
    mount_token(&server, "token-e2e", 2).await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/v1/AUTH_tenant-1/on7_storage/[0-9a-f-]{36}\.png$"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let staging = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();
    let client = StorageClient::new(&test_config(&server.uri(), staging.path(), home.path())).unwrap();

    let payload: Vec<u8> = (0..200_000u32).map(|i| (i * 7 % 256) as u8).collect();
    let stored = client.upload(payload.as_slice(), None).await.unwrap();

    // The object store echoes back whatever the PUT carried
    let requests = server.received_requests().await.unwrap();
    let put = requests.iter().find(|r| r.method.as_str() == "PUT").unwrap();
    Mock::given(method("GET"))
        .and(wiremock::matchers::path(put.url.path()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(put.body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let written = client.download(&ObjectDescriptor::from(stored.clone())).await.unwrap();

    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    assert_eq!(written, home.path().join(today).join(&stored.name));
    assert_eq!(std::fs::read(&written).unwrap(), payload);
}

/// Tokens are never reused: three operations mean three token requests, and each request carries
/// the token from its own exchange.
#[tokio::test]
async fn test_every_operation_reauthenticates() {
    let server = MockServer::start().await;
    mount_token(&server, "token", 3).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;

    let dirs = tempfile::tempdir().unwrap();
    let client = StorageClient::new(&test_config(&server.uri(), dirs.path(), dirs.path())).unwrap();

    let first = client.upload(&b"one"[..], None).await.unwrap();
    let second = client.upload(&b"two"[..], None).await.unwrap();
    assert_ne!(first.name, second.name);

    let token = client.authenticate().await.unwrap();
    assert_eq!(token.id(), "token");
}
