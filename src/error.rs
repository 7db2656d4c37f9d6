use std::fmt;

use thiserror::Error;

/// Which hop of the credential exchange failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenHop {
    Installation,
    RunnerRegistration,
}

impl fmt::Display for TokenHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenHop::Installation => write!(f, "installation access token"),
            TokenHop::RunnerRegistration => write!(f, "runner registration token"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to sign app JWT: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("unrecognized installation payload: {0}")]
    Extraction(String),

    #[error("credential exchange failed while fetching {hop}: {source}")]
    CredentialExchange {
        hop: TokenHop,
        #[source]
        source: reqwest::Error,
    },

    #[error("workflow dispatch failed: {0}")]
    Dispatch(#[source] reqwest::Error),
}

impl ProvisionError {
    /// Pipeline stage name used in structured logs.
    pub fn stage(&self) -> &'static str {
        match self {
            ProvisionError::Signing(_) => "signing",
            ProvisionError::Extraction(_) => "extraction",
            ProvisionError::CredentialExchange { .. } => "credential_exchange",
            ProvisionError::Dispatch(_) => "dispatch",
        }
    }
}
