//! Shared fixtures: a configuration pointed at a wiremock server, and a mocked identity endpoint.

use std::path::Path;
use std::sync::Once;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::Config;

static CRYPTO_PROVIDER: Once = Once::new();

/// reqwest is built without a bundled rustls provider, so tests install one like `main` does.
pub fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

/// Identity at `{uri}/v2.0`, object store account at `{uri}/v1/AUTH_tenant-1`.
pub fn test_config(uri: &str, staging_dir: &Path, download_home: &Path) -> Config {
    install_crypto_provider();

    let mut config = Config::default();
    config.cloud.auth_url = format!("{uri}/v2.0").parse().unwrap();
    config.cloud.storage_url = format!("{uri}/v1/AUTH_tenant-1").parse().unwrap();
    config.cloud.tenant_id = "tenant-1".to_string();
    config.cloud.user_name = "market@example.com".to_string();
    config.cloud.password = "s3cret".to_string();
    config.cloud.request_timeout = Duration::from_secs(5);
    config.storage.staging_dir = Some(staging_dir.to_path_buf());
    config.storage.download_home = Some(download_home.to_path_buf());
    config.validate().expect("test config should be valid");
    config
}

/// Mount a token endpoint issuing `token` and expecting exactly `calls` requests.
pub async fn mount_token(server: &MockServer, token: &str, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v2.0/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": {
                "token": {
                    "id": token,
                    "expires": "2026-10-17T00:00:00Z"
                }
            }
        })))
        .expect(calls)
        .mount(server)
        .await;
}
