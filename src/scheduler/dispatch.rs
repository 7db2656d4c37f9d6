use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProvisionError;
use crate::utils::send_with_retry;

pub const RUNNER_VERSION: &str = "2.316.0";

const WORKFLOW_CPU: &str = "0.5";
const WORKFLOW_MEMORY: &str = "512Mi";

/// Ordered bootstrap script plus the compute shape, submitted once per
/// qualifying webhook. `id` doubles as a dedup key if the call is retried.
#[derive(Serialize, Debug)]
pub struct WorkflowSpec {
    pub id: Uuid,
    pub commands: Vec<String>,
    pub cpu: String,
    pub memory: String,
}

#[derive(Deserialize, Debug)]
pub struct WorkflowResult {
    pub status: Option<String>,
    pub workflow_id: Option<String>,
}

impl WorkflowSpec {
    pub fn new(repo_full_name: &str, label: &str, runner_token: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            commands: bootstrap_commands(repo_full_name, label, runner_token),
            cpu: WORKFLOW_CPU.to_string(),
            memory: WORKFLOW_MEMORY.to_string(),
        }
    }
}

/// Strict order: workdir, package prerequisites, pinned runner archive,
/// unpack, allow-root flag, installer deps, configure against the repo, run.
pub fn bootstrap_commands(repo_full_name: &str, label: &str, runner_token: &str) -> Vec<String> {
    let archive = format!("actions-runner-linux-x64-{RUNNER_VERSION}.tar.gz");
    vec![
        "mkdir actions-runner && cd actions-runner".to_string(),
        "apt-get update && apt-get install -y --no-install-recommends apt-utils && apt-get install -y curl"
            .to_string(),
        format!(
            "curl -o {archive} -L https://github.com/actions/runner/releases/download/v{RUNNER_VERSION}/{archive}"
        ),
        format!("tar xzf ./{archive}"),
        r#"export RUNNER_ALLOW_RUNASROOT="1""#.to_string(),
        "./bin/installdependencies.sh".to_string(),
        format!(
            r#"export RUNNER_ALLOW_RUNASROOT="1" && ./config.sh --url https://github.com/{repo_full_name} --labels {label} --token {runner_token} --unattended"#
        ),
        r#"export RUNNER_ALLOW_RUNASROOT="1" && ./run.sh"#.to_string(),
    ]
}

/// The single point of contact with the external scheduler.
pub async fn dispatch_workflow(
    client: &Client,
    scheduler_url: &str,
    spec: &WorkflowSpec,
) -> Result<WorkflowResult, ProvisionError> {
    let url = format!("{scheduler_url}/scheduler.createWorkflow");

    let res = send_with_retry("create_workflow", || client.post(&url).json(spec))
        .await
        .map_err(ProvisionError::Dispatch)?;

    res.json().await.map_err(ProvisionError::Dispatch)
}
