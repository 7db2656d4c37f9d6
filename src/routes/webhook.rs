use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::app_state::AppState;
use crate::error::ProvisionError;
use crate::github::jwt::unix_now;
use crate::github::models::{Installation, InstallationEvent};
use crate::github::tokens::{create_installation_token, create_runner_token};
use crate::scheduler::dispatch::{dispatch_workflow, WorkflowResult, WorkflowSpec};
use crate::utils::verify_signature;

const ACK_BODY: &str = "Webhook received!";

/// Routes an inbound event. `Ok(None)` means the event was acknowledged and
/// deliberately ignored; only installation events with a `created`/`added`
/// action provision a runner.
pub fn route_event(
    event_type: &str,
    body: &[u8],
) -> Result<Option<Installation>, ProvisionError> {
    if !matches!(event_type, "installation" | "installation_repositories") {
        return Ok(None);
    }

    let event: InstallationEvent = serde_json::from_slice(body)
        .map_err(|e| ProvisionError::Extraction(format!("invalid {event_type} payload: {e}")))?;

    if !matches!(event.action.as_str(), "created" | "added") {
        return Ok(None);
    }

    event.target().map(Some)
}

pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if let Some(secret) = &state.webhook_secret {
        let sig = headers
            .get("X-Hub-Signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !verify_signature(sig, &body, secret) {
            tracing::warn!("rejected webhook with invalid signature");
            return (StatusCode::UNAUTHORIZED, "invalid signature");
        }
    }

    let event_type = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let installation = match route_event(&event_type, &body) {
        Ok(Some(installation)) => installation,
        Ok(None) => {
            tracing::debug!(event_type, "ignoring event");
            return (StatusCode::OK, ACK_BODY);
        }
        Err(e) => {
            tracing::warn!(event_type, error = %e, "failed to extract installation");
            return ack_or_fail(&state);
        }
    };

    tracing::info!(
        event_type,
        installation_id = installation.id,
        repo = %installation.full_name,
        "validated installation event"
    );

    match provision_runner(&state, &installation).await {
        Ok(result) => {
            tracing::info!(installation_id = installation.id, ?result, "workflow dispatched");
            (StatusCode::OK, ACK_BODY)
        }
        Err(e) => {
            tracing::error!(
                installation_id = installation.id,
                stage = e.stage(),
                error = %e,
                "provisioning failed"
            );
            ack_or_fail(&state)
        }
    }
}

fn ack_or_fail(state: &AppState) -> (StatusCode, &'static str) {
    if state.ack_failures {
        (StatusCode::OK, ACK_BODY)
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "provisioning failed")
    }
}

/// The three-hop exchange plus dispatch. Short-circuits on the first
/// failure; a runner is never configured with an invalid credential.
pub async fn provision_runner(
    state: &AppState,
    installation: &Installation,
) -> Result<WorkflowResult, ProvisionError> {
    let app_jwt = state.token_cache.token_for(unix_now()).await?;

    let installation_token = create_installation_token(
        &state.client,
        &state.github_api_url,
        installation.id,
        &app_jwt,
    )
    .await?;

    let runner_token = create_runner_token(
        &state.client,
        &state.github_api_url,
        &installation.full_name,
        &installation_token,
    )
    .await?;

    let spec = WorkflowSpec::new(&installation.full_name, &state.runner_label, &runner_token);
    tracing::info!(workflow_id = %spec.id, repo = %installation.full_name, "submitting workflow");

    dispatch_workflow(&state.client, &state.scheduler_url, &spec).await
}
