//! Reward hook: turns a completed task's rewards into credential issuance
//! and experience.
//!
//! Issuance is attempted once per reward and is not transactional with the
//! task: a failed issuance never reopens the task.

use std::sync::Arc;

use arcadia_netproto::constants::DEFAULT_CREDENTIAL_TYPE;
use arcadia_netproto::messages::credential::{CredentialRecord, CredentialSubject};
use arcadia_netproto::state::{Reward, Task};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::identity::{IdentityError, IdentityResolver};
use crate::session::Session;

const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
const GAME_CONTEXT: &str = "https://game.example.com/contexts/credentials/v1";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("subject identity does not resolve: {0}")]
    UnknownSubject(#[source] IdentityError),
    #[error("credential issuer unavailable: {0}")]
    Unavailable(String),
    #[error("credential not found in registry")]
    NotFound,
    #[error("credential issued by {0}")]
    WrongIssuer(String),
    #[error("credential has expired")]
    Expired,
    #[error("credential issued in the future")]
    NotYetValid,
}

/// Credential collaborator, called synchronously once per credential reward.
pub trait CredentialIssuer: Send + Sync {
    fn issue_credential(
        &self,
        identity_ref: &str,
        credential_type: &str,
        subject: CredentialSubject,
    ) -> Result<CredentialRecord, CredentialError>;
}

/// Issues credentials signed by a fixed issuer DID and keeps them in memory.
pub struct LocalCredentialIssuer {
    issuer_did: String,
    identities: Arc<dyn IdentityResolver>,
    issued: DashMap<String, CredentialRecord>,
}

impl LocalCredentialIssuer {
    pub fn new(issuer_did: impl Into<String>, identities: Arc<dyn IdentityResolver>) -> Self {
        Self {
            issuer_did: issuer_did.into(),
            identities,
            issued: DashMap::new(),
        }
    }

    pub fn issuer_did(&self) -> &str {
        &self.issuer_did
    }

    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    /// Check issuer, validity window, and presence in the registry.
    pub fn verify(&self, credential: &CredentialRecord) -> Result<(), CredentialError> {
        self.verify_at(credential, Utc::now())
    }

    fn verify_at(
        &self,
        credential: &CredentialRecord,
        now: DateTime<Utc>,
    ) -> Result<(), CredentialError> {
        if credential.issuer != self.issuer_did {
            return Err(CredentialError::WrongIssuer(credential.issuer.clone()));
        }
        if credential.expiration_date.is_some_and(|exp| exp < now) {
            return Err(CredentialError::Expired);
        }
        if credential.issuance_date > now {
            return Err(CredentialError::NotYetValid);
        }
        if !self.issued.contains_key(&credential.id) {
            return Err(CredentialError::NotFound);
        }
        Ok(())
    }
}

impl CredentialIssuer for LocalCredentialIssuer {
    fn issue_credential(
        &self,
        identity_ref: &str,
        credential_type: &str,
        mut subject: CredentialSubject,
    ) -> Result<CredentialRecord, CredentialError> {
        self.identities
            .resolve_identity(identity_ref)
            .map_err(CredentialError::UnknownSubject)?;

        subject.id = identity_ref.to_string();
        let record = CredentialRecord {
            context: vec![CREDENTIALS_CONTEXT.to_string(), GAME_CONTEXT.to_string()],
            id: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
            types: vec![
                "VerifiableCredential".to_string(),
                credential_type.to_string(),
            ],
            issuer: self.issuer_did.clone(),
            issuance_date: Utc::now(),
            expiration_date: None,
            credential_subject: subject,
        };

        self.issued.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

/// Result of granting one reward.
#[derive(Debug)]
pub enum RewardGrant {
    Credential(CredentialRecord),
    CredentialFailed(CredentialError),
    Experience { amount: u32, level_up: bool },
}

/// Grant one reward of a just-completed task to `session`.
pub fn grant_reward(
    issuer: &dyn CredentialIssuer,
    session: &mut Session,
    game_id: &str,
    task: &Task,
    reward: &Reward,
) -> RewardGrant {
    match reward {
        Reward::Credential {
            credential_type,
            metadata,
        } => {
            let credential_type = if credential_type.is_empty() {
                DEFAULT_CREDENTIAL_TYPE
            } else {
                credential_type.as_str()
            };

            let mut attributes = metadata.clone();
            attributes.insert("taskId".to_string(), Value::String(task.id.clone()));
            let subject = CredentialSubject {
                id: String::new(),
                session_id: session.id.to_string(),
                game_id: game_id.to_string(),
                achievement: Some(task.name.clone()),
                attributes,
                completed_at: Some(Utc::now()),
            };

            match issuer.issue_credential(&session.identity, credential_type, subject) {
                Ok(record) => {
                    info!(
                        session_id = %session.id,
                        task_id = %task.id,
                        credential_id = %record.id,
                        "Credential issued"
                    );
                    RewardGrant::Credential(record)
                }
                Err(e) => {
                    error!(
                        session_id = %session.id,
                        task_id = %task.id,
                        error = %e,
                        "Credential issuance failed"
                    );
                    RewardGrant::CredentialFailed(e)
                }
            }
        }
        Reward::Experience { amount } => {
            let level_up = session.grant_experience(*amount);
            info!(
                session_id = %session.id,
                amount,
                level = session.level,
                "Experience granted"
            );
            RewardGrant::Experience {
                amount: *amount,
                level_up,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use arcadia_netproto::state::TaskStatus;
    use chrono::Duration;

    use super::*;
    use crate::identity::DidRegistry;

    fn issuer() -> LocalCredentialIssuer {
        let registry = DidRegistry::new();
        registry
            .register("did:example:alice", Some("Alice".into()))
            .unwrap();
        LocalCredentialIssuer::new("did:example:issuer", Arc::new(registry))
    }

    fn task() -> Task {
        Task {
            id: "t1".into(),
            name: "First Steps".into(),
            description: String::new(),
            status: TaskStatus::Completed,
            objectives: Vec::new(),
            rewards: Vec::new(),
        }
    }

    #[test]
    fn issued_credential_verifies() {
        let issuer = issuer();
        let record = issuer
            .issue_credential(
                "did:example:alice",
                "AchievementCredential",
                CredentialSubject::default(),
            )
            .unwrap();

        assert!(record.id.starts_with("urn:uuid:"));
        assert_eq!(record.types[1], "AchievementCredential");
        assert_eq!(record.credential_subject.id, "did:example:alice");
        assert_eq!(issuer.issued_count(), 1);
        issuer.verify(&record).unwrap();
    }

    #[test]
    fn verify_rejects_foreign_expired_and_unknown_records() {
        let issuer = issuer();
        let record = issuer
            .issue_credential("did:example:alice", "X", CredentialSubject::default())
            .unwrap();

        let mut foreign = record.clone();
        foreign.issuer = "did:example:mallory".into();
        assert!(matches!(
            issuer.verify(&foreign),
            Err(CredentialError::WrongIssuer(_))
        ));

        let mut expired = record.clone();
        expired.expiration_date = Some(Utc::now() - Duration::hours(1));
        assert!(matches!(
            issuer.verify(&expired),
            Err(CredentialError::Expired)
        ));

        let mut unknown = record.clone();
        unknown.id = "urn:uuid:not-issued".into();
        assert!(matches!(
            issuer.verify(&unknown),
            Err(CredentialError::NotFound)
        ));

        assert!(matches!(
            issuer.verify_at(&record, record.issuance_date - Duration::seconds(5)),
            Err(CredentialError::NotYetValid)
        ));
    }

    #[test]
    fn unknown_subject_is_refused() {
        let issuer = issuer();
        let err = issuer
            .issue_credential("did:example:nobody", "X", CredentialSubject::default())
            .unwrap_err();
        assert!(matches!(err, CredentialError::UnknownSubject(_)));
        assert_eq!(issuer.issued_count(), 0);
    }

    #[test]
    fn credential_reward_carries_task_metadata() {
        let issuer = issuer();
        let mut session = Session::new(uuid::Uuid::new_v4(), "did:example:alice", "Alice");
        let mut metadata = serde_json::Map::new();
        metadata.insert("difficulty".into(), Value::String("easy".into()));
        let reward = Reward::Credential {
            credential_type: String::new(),
            metadata,
        };

        match grant_reward(&issuer, &mut session, "g1", &task(), &reward) {
            RewardGrant::Credential(record) => {
                assert_eq!(record.types[1], DEFAULT_CREDENTIAL_TYPE);
                let subject = &record.credential_subject;
                assert_eq!(subject.game_id, "g1");
                assert_eq!(subject.achievement.as_deref(), Some("First Steps"));
                assert_eq!(subject.attributes["taskId"], "t1");
                assert_eq!(subject.attributes["difficulty"], "easy");
            }
            other => panic!("unexpected grant {other:?}"),
        }
    }

    #[test]
    fn experience_reward_levels_up() {
        let issuer = issuer();
        let mut session = Session::new(uuid::Uuid::new_v4(), "did:example:alice", "Alice");
        let grant = grant_reward(
            &issuer,
            &mut session,
            "g1",
            &task(),
            &Reward::Experience { amount: 150 },
        );
        assert!(matches!(
            grant,
            RewardGrant::Experience {
                amount: 150,
                level_up: true
            }
        ));
        assert_eq!(session.level, 2);
        assert_eq!(issuer.issued_count(), 0);
    }
}
