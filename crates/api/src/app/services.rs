//! Infrastructure wiring: event store/bus, projections, dispatcher, and the
//! credential services.
//!
//! Default wiring is fully in-memory (dev/test). Setting
//! `USE_PERSISTENT_STORES=true` with a `DATABASE_URL` switches the event
//! store to Postgres; read models are rebuilt in-process from the bus either
//! way.

use std::sync::Arc;

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;

use reqtrack_auth::user::{AGGREGATE_TYPE as USER_AGGREGATE_TYPE, CreateUser};
use reqtrack_auth::{
    Argon2PasswordHasher, Hs256JwtCodec, JwtValidator, PasswordHasher, PermissionCatalog, Role,
    User, UserCommand, catalog,
};
use reqtrack_core::{AggregateId, UserId};
use reqtrack_events::{EventBus, EventEnvelope, InMemoryEventBus};
use reqtrack_infra::command_dispatcher::{CommandDispatcher, DispatchError};
use reqtrack_infra::event_store::{InMemoryEventStore, PostgresEventStore, StoredEvent};
use reqtrack_infra::projections::approvals::{ApprovalLedgerProjection, ApprovalReadModel};
use reqtrack_infra::projections::requirements::{RequirementReadModel, RequirementsProjection};
use reqtrack_infra::projections::users::{UserDirectoryProjection, UserReadModel};
use reqtrack_infra::read_model::InMemoryReadModelStore;
use reqtrack_infra::workflow::RequirementNumberSequence;
use reqtrack_requisitions::{Requirement, RequirementCommand, RequirementId};

use reqtrack_approvals::ApprovalId;

type Bus = Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>;
type InMemoryDispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Bus>;
type PersistentDispatcher = CommandDispatcher<Arc<PostgresEventStore>, Bus>;

type RequirementsStore = Arc<InMemoryReadModelStore<RequirementId, RequirementReadModel>>;
type ApprovalsStore = Arc<InMemoryReadModelStore<ApprovalId, ApprovalReadModel>>;
type UsersStore = Arc<InMemoryReadModelStore<UserId, UserReadModel>>;

enum Dispatcher {
    InMemory(Arc<InMemoryDispatcher>),
    Persistent(Arc<PersistentDispatcher>),
}

/// Shared application services handed to every route handler.
pub struct AppServices {
    dispatcher: Dispatcher,
    requirements: Arc<RequirementsProjection<RequirementsStore>>,
    approvals: Arc<ApprovalLedgerProjection<ApprovalsStore>>,
    users: Arc<UserDirectoryProjection<UsersStore>>,
    numbers: RequirementNumberSequence,
    catalog: PermissionCatalog,
    jwt: Arc<Hs256JwtCodec>,
    passwords: Arc<dyn PasswordHasher>,
}

impl AppServices {
    pub fn requirements(&self) -> &RequirementsProjection<RequirementsStore> {
        &self.requirements
    }

    pub fn approvals(&self) -> &ApprovalLedgerProjection<ApprovalsStore> {
        &self.approvals
    }

    pub fn users(&self) -> &UserDirectoryProjection<UsersStore> {
        &self.users
    }

    pub fn numbers(&self) -> &RequirementNumberSequence {
        &self.numbers
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    pub fn jwt(&self) -> &Hs256JwtCodec {
        &self.jwt
    }

    pub fn jwt_validator(&self) -> Arc<dyn JwtValidator> {
        self.jwt.clone()
    }

    pub fn passwords(&self) -> &dyn PasswordHasher {
        &*self.passwords
    }

    pub fn dispatch_requirement(
        &self,
        requirement_id: RequirementId,
        command: RequirementCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        let make = |id: AggregateId| Requirement::empty(RequirementId::new(id));
        match &self.dispatcher {
            Dispatcher::InMemory(d) => d.dispatch::<Requirement>(
                requirement_id.0,
                reqtrack_requisitions::REQUIREMENT_AGGREGATE_TYPE,
                command,
                make,
            ),
            Dispatcher::Persistent(d) => d.dispatch::<Requirement>(
                requirement_id.0,
                reqtrack_requisitions::REQUIREMENT_AGGREGATE_TYPE,
                command,
                make,
            ),
        }
    }

    pub fn dispatch_user(
        &self,
        user_id: UserId,
        command: UserCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        let make = |id: AggregateId| User::empty(id.into());
        match &self.dispatcher {
            Dispatcher::InMemory(d) => {
                d.dispatch::<User>(user_id.into(), USER_AGGREGATE_TYPE, command, make)
            }
            Dispatcher::Persistent(d) => {
                d.dispatch::<User>(user_id.into(), USER_AGGREGATE_TYPE, command, make)
            }
        }
    }
}

/// Build the full service graph and start the projection subscriber.
pub async fn build_services(jwt_secret: String) -> AppServices {
    let bus: Bus = Arc::new(InMemoryEventBus::new());

    let requirements = Arc::new(RequirementsProjection::new(Arc::new(
        InMemoryReadModelStore::new(),
    )));
    let approvals = Arc::new(ApprovalLedgerProjection::new(Arc::new(
        InMemoryReadModelStore::new(),
    )));
    let users = Arc::new(UserDirectoryProjection::new(Arc::new(
        InMemoryReadModelStore::new(),
    )));

    spawn_projection_subscriber(
        bus.clone(),
        requirements.clone(),
        approvals.clone(),
        users.clone(),
    );

    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let dispatcher = if use_persistent {
        match build_postgres_store().await {
            Ok(store) => Dispatcher::Persistent(Arc::new(CommandDispatcher::new(store, bus))),
            Err(e) => {
                tracing::warn!(error = %e, "falling back to in-memory event store");
                Dispatcher::InMemory(Arc::new(CommandDispatcher::new(
                    Arc::new(InMemoryEventStore::new()),
                    bus,
                )))
            }
        }
    } else {
        Dispatcher::InMemory(Arc::new(CommandDispatcher::new(
            Arc::new(InMemoryEventStore::new()),
            bus,
        )))
    };

    let catalog = catalog::default_catalog().expect("permission catalog is malformed");

    let services = AppServices {
        dispatcher,
        requirements,
        approvals,
        users,
        numbers: RequirementNumberSequence::new(),
        catalog,
        jwt: Arc::new(Hs256JwtCodec::new(jwt_secret)),
        passwords: Arc::new(Argon2PasswordHasher),
    };

    seed_bootstrap_admin(&services);

    services
}

async fn build_postgres_store() -> Result<Arc<PostgresEventStore>, anyhow::Error> {
    let url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new().max_connections(8).connect(&url).await?;
    Ok(Arc::new(PostgresEventStore::new(pool)))
}

fn spawn_projection_subscriber(
    bus: Bus,
    requirements: Arc<RequirementsProjection<RequirementsStore>>,
    approvals: Arc<ApprovalLedgerProjection<ApprovalsStore>>,
    users: Arc<UserDirectoryProjection<UsersStore>>,
) {
    let sub = bus.subscribe();
    std::thread::spawn(move || {
        while let Ok(env) = sub.recv() {
            if let Err(e) = requirements.apply_envelope(&env) {
                tracing::error!(error = %e, "requirements projection failed");
            }
            if let Err(e) = approvals.apply_envelope(&env) {
                tracing::error!(error = %e, "approvals projection failed");
            }
            if let Err(e) = users.apply_envelope(&env) {
                tracing::error!(error = %e, "users projection failed");
            }
        }
    });
}

/// Seed the bootstrap administrator so a fresh deployment can log in and
/// create real accounts. Replaced by directory sync in larger installs.
fn seed_bootstrap_admin(services: &AppServices) {
    let email =
        std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@reqtrack.local".to_string());
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
        tracing::warn!("ADMIN_PASSWORD not set; using insecure dev default");
        "change-me-admin".to_string()
    });

    let password_hash = match services.passwords().hash(&password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "failed to hash bootstrap admin password");
            return;
        }
    };

    let user_id = UserId::new();
    let result = services.dispatch_user(
        user_id,
        UserCommand::Create(CreateUser {
            user_id,
            email,
            display_name: "Administrator".to_string(),
            password_hash,
            initial_roles: vec![Role::new(catalog::role_names::ADMIN)],
            superuser: true,
            occurred_at: Utc::now(),
        }),
    );

    if let Err(e) = result {
        tracing::error!(error = ?e, "failed to seed bootstrap admin");
    }
}
