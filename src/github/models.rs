use serde::{Deserialize, Serialize};

use crate::error::ProvisionError;

#[derive(Deserialize, Serialize, Debug)]
pub struct Claims {
    pub iat: u64,
    pub exp: u64,
    pub iss: String,
}

/// Payload of `installation` and `installation_repositories` events. Parsed
/// against this schema before anything is extracted from it.
#[derive(Deserialize, Debug)]
pub struct InstallationEvent {
    pub action: String,
    pub installation: InstallationRef,
    #[serde(default)]
    pub repositories: Vec<Repository>,
    #[serde(default)]
    pub repositories_added: Vec<Repository>,
    #[serde(default)]
    pub repositories_removed: Vec<Repository>,
}

#[derive(Deserialize, Debug)]
pub struct InstallationRef {
    // GitHub sends numeric ids, but senders re-serializing the payload may
    // deliver them as strings; both are accepted.
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: u64,
    pub account: Option<Account>,
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize, Debug)]
pub struct Account {
    pub login: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Repository {
    pub full_name: String,
}

/// Target of one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub id: u64,
    pub full_name: String,
}

/// Response shape shared by both token endpoints.
#[derive(Deserialize, Debug)]
pub struct AccessToken {
    pub token: String,
}

impl InstallationEvent {
    /// Picks the repository the runner registers against. `repositories`
    /// wins over `repositories_added`.
    pub fn target(&self) -> Result<Installation, ProvisionError> {
        let repo = self
            .repositories
            .first()
            .or_else(|| self.repositories_added.first())
            .ok_or_else(|| ProvisionError::Extraction("event carries no repositories".into()))?;

        Ok(Installation {
            id: self.installation.id,
            full_name: repo.full_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> InstallationEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn target_prefers_repositories_over_added() {
        let event = parse(
            r#"{
                "action": "created",
                "installation": { "id": 42, "account": { "login": "acme" } },
                "repositories": [{ "full_name": "acme/repo" }],
                "repositories_added": [{ "full_name": "acme/other" }]
            }"#,
        );

        let target = event.target().unwrap();
        assert_eq!(target.id, 42);
        assert_eq!(target.full_name, "acme/repo");
    }

    #[test]
    fn target_falls_back_to_repositories_added() {
        let event = parse(
            r#"{
                "action": "added",
                "installation": { "id": 7 },
                "repositories_added": [{ "full_name": "acme/added" }]
            }"#,
        );

        let target = event.target().unwrap();
        assert_eq!(target.id, 7);
        assert_eq!(target.full_name, "acme/added");
    }

    #[test]
    fn target_accepts_string_installation_id() {
        let event = parse(
            r#"{
                "action": "created",
                "installation": { "id": "42" },
                "repositories": [{ "full_name": "acme/repo" }]
            }"#,
        );

        let target = event.target().unwrap();
        assert_eq!(target.id, 42);
        assert_eq!(target.full_name, "acme/repo");
    }

    #[test]
    fn non_numeric_installation_id_is_rejected() {
        let result: Result<InstallationEvent, _> = serde_json::from_str(
            r#"{
                "action": "created",
                "installation": { "id": "not-a-number" },
                "repositories": [{ "full_name": "acme/repo" }]
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn target_fails_without_any_repository() {
        let event = parse(
            r#"{
                "action": "created",
                "installation": { "id": 1 },
                "repositories": [],
                "repositories_removed": [{ "full_name": "acme/gone" }]
            }"#,
        );

        let err = event.target().unwrap_err();
        assert!(matches!(err, ProvisionError::Extraction(_)));
    }
}
