//! Permission resolution.
//!
//! Computes the menu forest a subject may see, each node annotated with the
//! actions the subject may invoke on it.
//!
//! Super-users see every enabled menu with every action, with no role
//! lookup. Regular subjects see the enabled menus bound to their roles plus
//! every ancestor of those menus (whatever the ancestor's status), with the
//! actions their roles grant.

use crate::error::AuthError;
use crate::graph::{
    ActionId, GraphError, GraphReader, MenuFilter, MenuId, RoleId, RoleMenuBinding, with_deadline,
};
use crate::identity::{RootAccount, Subject};
use crate::metrics;
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub mod tree;

pub use tree::{MenuSet, MenuTree, find_in};

/// Resolves subjects to their visible menu forest.
pub struct PermissionResolver {
    graph: Arc<dyn GraphReader>,
    root: Arc<RootAccount>,
    timeout: Duration,
}

impl PermissionResolver {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new(graph: Arc<dyn GraphReader>, root: Arc<RootAccount>) -> Self {
        Self {
            graph,
            root,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Deadline applied to each graph read.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the subject a bare id stands for.
    pub fn subject_for(&self, subject_id: &str) -> Subject {
        if self.root.is_root_id(subject_id) {
            self.root.subject()
        } else {
            Subject::user(subject_id, subject_id)
        }
    }

    /// Resolve the visible forest for `subject`.
    pub async fn resolve(&self, subject: &Subject) -> Result<Vec<MenuTree>, AuthError> {
        let started = Instant::now();
        let super_user = subject.is_super_user || self.root.is_root_id(&subject.id);
        let path = if super_user { "super" } else { "regular" };

        let result = if super_user {
            self.resolve_all().await
        } else {
            self.resolve_granted(&subject.id).await
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(AuthError::NoPermission) => "no_permission",
            Err(_) => "error",
        };
        metrics::record_resolution(path, outcome, started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            debug!(subject = %subject.id, path, error = %e, "Menu resolution failed");
        }
        result
    }

    async fn read<T>(
        &self,
        fut: impl Future<Output = Result<T, GraphError>>,
    ) -> Result<T, AuthError> {
        Ok(with_deadline(self.timeout, fut).await?)
    }

    async fn resolve_all(&self) -> Result<Vec<MenuTree>, AuthError> {
        let menus = self.read(self.graph.menus(MenuFilter::Enabled)).await?;
        let actions = self.read(self.graph.menu_actions()).await?;

        let mut set = MenuSet::from_menus(menus);
        let attached = set.attach_actions(actions);
        trace!(menus = set.len(), actions = attached, "Super-user menu set");
        Ok(set.into_forest())
    }

    async fn resolve_granted(&self, subject_id: &str) -> Result<Vec<MenuTree>, AuthError> {
        let user_roles = self.read(self.graph.user_roles(subject_id)).await?;
        if user_roles.is_empty() {
            debug!(subject = %subject_id, "Denied: no roles");
            return Err(AuthError::NoPermission);
        }
        let role_ids: Vec<RoleId> = user_roles
            .into_iter()
            .map(|b| b.role_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let bindings = self.read(self.graph.role_menus(&role_ids)).await?;
        if bindings.is_empty() {
            debug!(subject = %subject_id, roles = ?role_ids, "Denied: roles bind no menus");
            return Err(AuthError::NoPermission);
        }

        let bound_ids = bound_menu_ids(&bindings);
        let menus = self
            .read(self.graph.menus_by_ids(&bound_ids, MenuFilter::Enabled))
            .await?;
        if menus.is_empty() {
            debug!(subject = %subject_id, "Denied: no enabled bound menus");
            return Err(AuthError::NoPermission);
        }

        let mut set = MenuSet::from_menus(menus);
        self.complete_ancestors(&mut set).await?;

        let action_ids = granted_action_ids(&bindings);
        if !action_ids.is_empty() {
            let actions = self.read(self.graph.menu_actions_by_ids(&action_ids)).await?;
            let attached = set.attach_actions(actions);
            trace!(subject = %subject_id, actions = attached, "Granted actions attached");
        }

        debug!(subject = %subject_id, menus = set.len(), "Menu set resolved");
        Ok(set.into_forest())
    }

    /// Fetch missing parents until every declared parent is present or has
    /// been asked for once.
    async fn complete_ancestors(&self, set: &mut MenuSet) -> Result<(), AuthError> {
        let mut requested: HashSet<MenuId> = HashSet::new();
        loop {
            let missing: Vec<MenuId> = set
                .missing_parents()
                .into_iter()
                .filter(|id| requested.insert(id.clone()))
                .collect();
            if missing.is_empty() {
                return Ok(());
            }
            let parents = self
                .read(self.graph.menus_by_ids(&missing, MenuFilter::Any))
                .await?;
            for parent in parents {
                trace!(menu = %parent.id, status = ?parent.status, "Ancestor materialized");
                set.insert(parent);
            }
        }
    }
}

fn bound_menu_ids(bindings: &[RoleMenuBinding]) -> Vec<MenuId> {
    bindings
        .iter()
        .map(|b| b.menu_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Union of the action ids granted across `bindings`.
pub(crate) fn granted_action_ids(bindings: &[RoleMenuBinding]) -> Vec<ActionId> {
    bindings
        .iter()
        .flat_map(|b| b.action_ids.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
