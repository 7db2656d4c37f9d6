use std::env;

use jsonwebtoken::EncodingKey;
use reqwest::Client;

use crate::github::jwt::AppTokenCache;

pub const DEFAULT_RUNNER_LABEL: &str = "slick-runner-01";

pub struct AppState {
    pub client: Client,
    pub token_cache: AppTokenCache,
    pub webhook_secret: Option<String>,
    pub github_api_url: String,
    pub scheduler_url: String,
    pub runner_label: String,
    pub ack_failures: bool,
    pub port: u16,
}

pub fn build_app_state() -> Result<AppState, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let app_id = env::var("APP_ID")?;
    let private_key_path = env::var("PRIVATE_KEY_PATH")?;
    let private_key = std::fs::read_to_string(&private_key_path)?;
    let encoding_key = EncodingKey::from_rsa_pem(private_key.as_bytes())?;

    let scheduler_url = env::var("SCHEDULER_URL")?.trim_end_matches('/').to_string();
    let github_api_url = env::var("GITHUB_API_URL")
        .unwrap_or_else(|_| "https://api.github.com".to_string())
        .trim_end_matches('/')
        .to_string();

    let port = match env::var("PORT") {
        Ok(v) => v.parse()?,
        Err(_) => 3000,
    };

    // Answering 200 on internal failure keeps GitHub's retries from
    // provisioning duplicate runners; set ACK_FAILURES=false to surface
    // failures to the sender instead.
    let ack_failures = env::var("ACK_FAILURES")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);

    Ok(AppState {
        client: Client::new(),
        token_cache: AppTokenCache::new(app_id, encoding_key),
        webhook_secret: env::var("WEBHOOK_SECRET").ok(),
        github_api_url,
        scheduler_url,
        runner_label: env::var("RUNNER_LABEL").unwrap_or_else(|_| DEFAULT_RUNNER_LABEL.to_string()),
        ack_failures,
        port,
    })
}
