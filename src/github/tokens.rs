use reqwest::Client;

use crate::error::{ProvisionError, TokenHop};
use crate::github::models::AccessToken;
use crate::utils::send_with_retry;

const GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "runner-provisioner";

/// Hop 1: App JWT -> installation access token.
pub async fn create_installation_token(
    client: &Client,
    api_base: &str,
    installation_id: u64,
    app_jwt: &str,
) -> Result<String, ProvisionError> {
    let url = format!("{api_base}/app/installations/{installation_id}/access_tokens");
    let hop = TokenHop::Installation;

    let res = send_with_retry("installation_token", || {
        client
            .post(&url)
            .bearer_auth(app_jwt)
            .header("Accept", GITHUB_JSON)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
    })
    .await
    .map_err(|source| ProvisionError::CredentialExchange { hop, source })?;

    let body: AccessToken = res
        .json()
        .await
        .map_err(|source| ProvisionError::CredentialExchange { hop, source })?;
    Ok(body.token)
}

/// Hop 2: installation token -> single-use runner registration token. Must
/// only be called with a token from hop 1 of the same request.
pub async fn create_runner_token(
    client: &Client,
    api_base: &str,
    repo_full_name: &str,
    installation_token: &str,
) -> Result<String, ProvisionError> {
    let url = format!("{api_base}/repos/{repo_full_name}/actions/runners/registration-token");
    let hop = TokenHop::RunnerRegistration;

    let res = send_with_retry("runner_registration_token", || {
        client
            .post(&url)
            .bearer_auth(installation_token)
            .header("Accept", GITHUB_JSON)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
    })
    .await
    .map_err(|source| ProvisionError::CredentialExchange { hop, source })?;

    let body: AccessToken = res
        .json()
        .await
        .map_err(|source| ProvisionError::CredentialExchange { hop, source })?;
    Ok(body.token)
}
