//! Test auth stack construction.

use gatekeeper::clock::ManualClock;
use gatekeeper::db::Database;
use gatekeeper::graph::{GraphReader, MemoryGraph, Status, UserRecord, UserStore};
use gatekeeper::http::{self, AppState};
use gatekeeper::identity::{DatabaseVerifier, IdentityVerifier, RootAccount, credential_digest};
use gatekeeper::login::LoginService;
use gatekeeper::permission::PermissionResolver;
use gatekeeper::store::{MemoryStore, RevocationStore};
use gatekeeper::token::{HmacCodec, TokenAuthority};
use jsonwebtoken::Algorithm;
use std::sync::Arc;

/// Fixed starting instant for the manual clock.
pub const NOW: i64 = 1_700_000_000;

pub const ROOT_PASSWORD: &str = "toor";

/// A fully wired stack sharing one manual clock.
pub struct TestAuth {
    pub clock: Arc<ManualClock>,
    pub tokens: Arc<TokenAuthority>,
    pub login: Arc<LoginService>,
}

impl TestAuth {
    /// Stack over `graph` with an in-memory revocation store.
    pub fn with_graph<G>(graph: Arc<G>) -> Self
    where
        G: GraphReader + UserStore + 'static,
    {
        let clock = Arc::new(ManualClock::new(NOW));
        let store: Arc<dyn RevocationStore> = Arc::new(MemoryStore::new(clock.clone()));
        Self::build(graph, clock, Some(store))
    }

    pub fn build<G>(
        graph: Arc<G>,
        clock: Arc<ManualClock>,
        store: Option<Arc<dyn RevocationStore>>,
    ) -> Self
    where
        G: GraphReader + UserStore + 'static,
    {
        let codec = HmacCodec::new(Algorithm::HS512, b"integration-test-key")
            .expect("codec construction failed");
        let mut authority = TokenAuthority::new(Arc::new(codec), clock.clone());
        if let Some(store) = store {
            authority = authority.with_store(store);
        }
        let tokens = Arc::new(authority);

        let root = Arc::new(RootAccount::new("root", ROOT_PASSWORD, "Super Admin"));
        let identity =
            IdentityVerifier::new(root.clone(), Arc::new(DatabaseVerifier::new(graph.clone())));
        let resolver = PermissionResolver::new(graph.clone(), root.clone());
        let login = Arc::new(LoginService::new(
            identity,
            tokens.clone(),
            resolver,
            graph.clone(),
            graph,
            root,
        ));

        Self {
            clock,
            tokens,
            login,
        }
    }

    pub fn router(&self) -> axum::Router {
        http::router(
            AppState {
                login: self.login.clone(),
            },
            true,
        )
    }
}

fn user(id: &str, name: &str, password: &str, status: Status) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        user_name: name.to_string(),
        real_name: format!("{name} real"),
        password: credential_digest(password),
        status,
    }
}

/// Role R1 binds M2 (action a1) and M3 (no actions); M2's parent M1 is not
/// bound. U1 ("alice") holds only R1. "nobody" holds no roles.
pub fn sample_graph() -> MemoryGraph {
    MemoryGraph::new()
        .with_menu("M1", "", 10, Status::Enabled)
        .with_menu("M2", "M1", 5, Status::Enabled)
        .with_menu("M3", "", 1, Status::Enabled)
        .with_menu("M4", "", 7, Status::Enabled)
        .with_action("a1", "M2")
        .with_action("a2", "M4")
        .with_role("R1", Status::Enabled)
        .with_role_menu("R1", "M2", &["a1"])
        .with_role_menu("R1", "M3", &[])
        .with_user_role("U1", "R1")
        .with_user(user("U1", "alice", "alice-pw", Status::Enabled))
        .with_user(user("U2", "nobody", "nobody-pw", Status::Enabled))
}

/// Write the same graph as [`sample_graph`] into the SQLite schema.
pub async fn seed_sqlite(db: &Database) {
    let statements = [
        "INSERT INTO menus (id, name, parent_id, sequence, status) VALUES ('M1', 'M1', '', 10, 1)",
        "INSERT INTO menus (id, name, parent_id, sequence, status) VALUES ('M2', 'M2', 'M1', 5, 1)",
        "INSERT INTO menus (id, name, parent_id, sequence, status) VALUES ('M3', 'M3', '', 1, 1)",
        "INSERT INTO menus (id, name, parent_id, sequence, status) VALUES ('M4', 'M4', '', 7, 1)",
        "INSERT INTO menu_actions (id, menu_id, code, name) VALUES ('a1', 'M2', 'a1', 'a1')",
        "INSERT INTO menu_actions (id, menu_id, code, name) VALUES ('a2', 'M4', 'a2', 'a2')",
        "INSERT INTO roles (id, name, status, sequence) VALUES ('R1', 'R1', 1, 0)",
        "INSERT INTO role_menus (role_id, menu_id, action_id) VALUES ('R1', 'M2', 'a1')",
        "INSERT INTO role_menus (role_id, menu_id, action_id) VALUES ('R1', 'M3', NULL)",
        "INSERT INTO user_roles (user_id, role_id) VALUES ('U1', 'R1')",
    ];
    for stmt in statements {
        sqlx::query(stmt)
            .execute(db.pool())
            .await
            .expect("seed statement failed");
    }
    for (id, name, password) in [("U1", "alice", "alice-pw"), ("U2", "nobody", "nobody-pw")] {
        sqlx::query(
            "INSERT INTO users (id, user_name, real_name, password, status) VALUES (?, ?, ?, ?, 1)",
        )
        .bind(id)
        .bind(name)
        .bind(format!("{name} real"))
        .bind(credential_digest(password))
        .execute(db.pool())
        .await
        .expect("seed user failed");
    }
}
