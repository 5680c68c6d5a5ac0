//! Menu resolution against both graph backends.
//!
//! The in-memory snapshot and the SQLite tables are seeded with the same
//! graph and must resolve identically.

mod common;

use common::{ROOT_PASSWORD, TestAuth, sample_graph, seed_sqlite};
use gatekeeper::AuthError;
use gatekeeper::db::Database;
use gatekeeper::graph::{MemoryGraph, Status, UserRecord};
use gatekeeper::identity::credential_digest;
use gatekeeper::permission::{MenuTree, find_in};
use std::sync::Arc;

async fn memory_auth() -> TestAuth {
    TestAuth::with_graph(Arc::new(sample_graph()))
}

async fn sqlite_auth() -> TestAuth {
    let db = Database::new(":memory:").await.unwrap();
    seed_sqlite(&db).await;
    TestAuth::with_graph(Arc::new(db))
}

fn root_ids(forest: &[MenuTree]) -> Vec<&str> {
    forest.iter().map(|t| t.id.as_str()).collect()
}

async fn assert_granted_forest(auth: &TestAuth) {
    let forest = auth.login.menu_tree("U1").await.unwrap();

    // M1 is pulled in as M2's ancestor; M4 is not granted.
    assert_eq!(root_ids(&forest), vec!["M1", "M3"]);
    assert!(find_in(&forest, "M4").is_none());

    let m1 = &forest[0];
    assert!(m1.actions.is_empty());
    assert_eq!(m1.children.len(), 1);
    assert_eq!(m1.children[0].id, "M2");
    assert_eq!(m1.children[0].actions, vec!["a1".to_string()]);

    assert!(forest[1].actions.is_empty());
    assert!(forest[1].children.is_empty());
}

async fn assert_super_user_forest(auth: &TestAuth) {
    let (subject, _) = auth.login.login("root", ROOT_PASSWORD, None).await.unwrap();
    assert!(subject.is_super_user);

    let forest = auth.login.menu_tree(&subject.id).await.unwrap();
    assert_eq!(root_ids(&forest), vec!["M1", "M4", "M3"]);
    assert_eq!(find_in(&forest, "M2").unwrap().actions, vec!["a1".to_string()]);
    assert_eq!(find_in(&forest, "M4").unwrap().actions, vec!["a2".to_string()]);
}

#[tokio::test]
async fn granted_forest_memory() {
    assert_granted_forest(&memory_auth().await).await;
}

#[tokio::test]
async fn granted_forest_sqlite() {
    assert_granted_forest(&sqlite_auth().await).await;
}

#[tokio::test]
async fn super_user_sees_everything_memory() {
    assert_super_user_forest(&memory_auth().await).await;
}

#[tokio::test]
async fn super_user_sees_everything_sqlite() {
    assert_super_user_forest(&sqlite_auth().await).await;
}

#[tokio::test]
async fn subject_without_roles_is_denied() {
    for auth in [memory_auth().await, sqlite_auth().await] {
        assert!(matches!(
            auth.login.menu_tree("U2").await,
            Err(AuthError::NoPermission)
        ));
    }
}

#[tokio::test]
async fn backends_agree() {
    let memory = memory_auth().await.login.menu_tree("U1").await.unwrap();
    let sqlite = sqlite_auth().await.login.menu_tree("U1").await.unwrap();
    assert_eq!(memory, sqlite);
}

#[tokio::test]
async fn resolution_is_repeatable() {
    let auth = sqlite_auth().await;
    let first = auth.login.menu_tree("U1").await.unwrap();
    for _ in 0..5 {
        assert_eq!(auth.login.menu_tree("U1").await.unwrap(), first);
    }
}

#[tokio::test]
async fn login_info_lists_enabled_roles() {
    let auth = sqlite_auth().await;
    let info = auth.login.login_info("U1").await.unwrap();
    assert_eq!(info.user_id, "U1");
    assert_eq!(info.user_name, "alice");
    assert_eq!(info.roles.len(), 1);
    assert_eq!(info.roles[0].id, "R1");

    let root = auth.login.login_info("root").await.unwrap();
    assert!(root.user_id.is_empty());
    assert!(root.roles.is_empty());
}

#[tokio::test]
async fn password_rotation_through_sqlite() {
    let auth = sqlite_auth().await;

    assert!(matches!(
        auth.login.change_password("U1", "wrong", "next-pw").await,
        Err(AuthError::InvalidOldCredential)
    ));
    auth.login
        .change_password("U1", "alice-pw", "next-pw")
        .await
        .unwrap();

    assert!(matches!(
        auth.login.login("alice", "alice-pw", None).await,
        Err(AuthError::InvalidPassword)
    ));
    let (subject, _) = auth.login.login("alice", "next-pw", None).await.unwrap();
    assert_eq!(subject.id, "U1");

    assert!(matches!(
        auth.login.change_password("root", ROOT_PASSWORD, "x").await,
        Err(AuthError::RootCredentialImmutable)
    ));
}

#[tokio::test]
async fn stored_user_cannot_take_the_root_id() {
    let graph = MemoryGraph::new()
        .with_menu("secret", "", 1, Status::Enabled)
        .with_user(UserRecord {
            id: "root".to_string(),
            user_name: "impostor".to_string(),
            real_name: "Impostor".to_string(),
            password: credential_digest("pw"),
            status: Status::Enabled,
        });
    let auth = TestAuth::with_graph(Arc::new(graph));

    assert!(matches!(
        auth.login.login("impostor", "pw", None).await,
        Err(AuthError::InvalidUser)
    ));
    // The real super-user is unaffected.
    let (subject, _) = auth.login.login("root", ROOT_PASSWORD, None).await.unwrap();
    assert!(subject.is_super_user);
}
