//! User directory projection.
//!
//! Builds the user read models consumed by login (email lookup + password
//! hash), approver selection, and recruiter resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reqtrack_auth::user::AGGREGATE_TYPE;
use reqtrack_auth::{UserEvent, UserStatus};
use reqtrack_core::UserId;
use reqtrack_events::EventEnvelope;

use crate::read_model::ReadModelStore;

/// User read model for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReadModel {
    pub user_id: UserId,
    pub email: String,
    pub display_name: String,
    pub roles: Vec<String>,
    pub superuser: bool,
    pub status: UserStatus,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserReadModel {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r == name)
    }
}

/// Projection that maintains the user directory.
pub struct UserDirectoryProjection<S> {
    store: S,
}

impl<S> UserDirectoryProjection<S>
where
    S: ReadModelStore<UserId, UserReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }

        let event: UserEvent = serde_json::from_value(envelope.payload().clone())?;

        match event {
            UserEvent::Created(e) => {
                let model = UserReadModel {
                    user_id: e.user_id,
                    email: e.email,
                    display_name: e.display_name,
                    roles: e
                        .initial_roles
                        .iter()
                        .map(|r| r.as_str().to_string())
                        .collect(),
                    superuser: e.superuser,
                    status: UserStatus::Active,
                    password_hash: e.password_hash,
                    created_at: e.occurred_at,
                    updated_at: e.occurred_at,
                };
                self.store.upsert(e.user_id, model);
            }
            UserEvent::RoleAssigned(e) => {
                if let Some(mut model) = self.store.get(&e.user_id) {
                    let role = e.role.as_str().to_string();
                    if !model.roles.contains(&role) {
                        model.roles.push(role);
                    }
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.user_id, model);
                }
            }
            UserEvent::RoleRevoked(e) => {
                if let Some(mut model) = self.store.get(&e.user_id) {
                    let role = e.role.as_str().to_string();
                    model.roles.retain(|r| r != &role);
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.user_id, model);
                }
            }
            UserEvent::Deactivated(e) => {
                if let Some(mut model) = self.store.get(&e.user_id) {
                    model.status = UserStatus::Inactive;
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.user_id, model);
                }
            }
            UserEvent::Reactivated(e) => {
                if let Some(mut model) = self.store.get(&e.user_id) {
                    model.status = UserStatus::Active;
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.user_id, model);
                }
            }
        }

        Ok(())
    }

    pub fn get(&self, user_id: &UserId) -> Option<UserReadModel> {
        self.store.get(user_id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<UserReadModel> {
        let needle = email.trim().to_lowercase();
        self.store.list().into_iter().find(|u| u.email == needle)
    }

    pub fn list(&self) -> Vec<UserReadModel> {
        let mut users = self.store.list();
        users.sort_by_key(|u| u.user_id);
        users
    }
}
