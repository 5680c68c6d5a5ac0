//! Arena-plus-index menu forest.
//!
//! [`MenuSet`] collects resolved menus keyed by id, tracks which declared
//! parents are still missing, attaches action grants and finally assembles
//! the ordered forest. Nodes are never dropped: a node whose parent is not
//! in the set becomes a root, and nodes caught in a parent cycle are
//! promoted to roots at the point the cycle is entered.

use crate::graph::{ActionId, Menu, MenuAction, MenuId, Status};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

/// One node of the resolved permission forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuTree {
    pub id: MenuId,
    pub name: String,
    pub parent_id: MenuId,
    pub sequence: i64,
    pub status: Status,
    /// Invocable action ids, ascending.
    pub actions: Vec<ActionId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuTree>,
}

impl MenuTree {
    /// Ids of this node and all descendants, depth-first.
    pub fn ids(&self) -> Vec<&str> {
        let mut out = vec![self.id.as_str()];
        for child in &self.children {
            out.extend(child.ids());
        }
        out
    }

    pub fn find(&self, id: &str) -> Option<&MenuTree> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// Find `id` anywhere in `forest`.
pub fn find_in<'a>(forest: &'a [MenuTree], id: &str) -> Option<&'a MenuTree> {
    forest.iter().find_map(|t| t.find(id))
}

#[derive(Debug)]
struct Slot {
    menu: Menu,
    actions: BTreeSet<ActionId>,
}

#[derive(Debug, Default)]
pub struct MenuSet {
    slots: HashMap<MenuId, Slot>,
}

impl MenuSet {
    pub fn from_menus(menus: impl IntoIterator<Item = Menu>) -> Self {
        let mut set = Self::default();
        for menu in menus {
            set.insert(menu);
        }
        set
    }

    /// Add `menu` unless its id is already present. Returns whether it was added.
    pub fn insert(&mut self, menu: Menu) -> bool {
        if self.slots.contains_key(&menu.id) {
            return false;
        }
        self.slots.insert(
            menu.id.clone(),
            Slot {
                menu,
                actions: BTreeSet::new(),
            },
        );
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Declared parent ids that are not in the set, ascending and deduplicated.
    pub fn missing_parents(&self) -> Vec<MenuId> {
        self.slots
            .values()
            .map(|s| &s.menu.parent_id)
            .filter(|pid| !pid.is_empty() && !self.slots.contains_key(pid.as_str()))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Attach each action to its owning menu. Actions whose menu is not in
    /// the set are ignored. Returns the number attached.
    pub fn attach_actions(&mut self, actions: impl IntoIterator<Item = MenuAction>) -> usize {
        let mut attached = 0;
        for action in actions {
            if let Some(slot) = self.slots.get_mut(&action.menu_id)
                && slot.actions.insert(action.id)
            {
                attached += 1;
            }
        }
        attached
    }

    /// Assemble the forest. Siblings are ordered by sequence descending,
    /// then id ascending.
    pub fn into_forest(mut self) -> Vec<MenuTree> {
        let mut order: Vec<(Reverse<i64>, MenuId)> = self
            .slots
            .values()
            .map(|s| (Reverse(s.menu.sequence), s.menu.id.clone()))
            .collect();
        order.sort();

        let mut children: HashMap<MenuId, Vec<MenuId>> = HashMap::new();
        let mut roots = Vec::new();
        for (_, id) in &order {
            let parent = &self.slots[id].menu.parent_id;
            if parent.is_empty() || !self.slots.contains_key(parent) {
                roots.push(id.clone());
            } else {
                children.entry(parent.clone()).or_default().push(id.clone());
            }
        }

        let mut forest: Vec<MenuTree> = roots
            .iter()
            .filter_map(|id| assemble(id, &mut self.slots, &children))
            .collect();

        // Whatever is left is only reachable through a parent cycle.
        for (_, id) in &order {
            if let Some(tree) = assemble(id, &mut self.slots, &children) {
                forest.push(tree);
            }
        }
        forest
    }
}

fn assemble(
    id: &str,
    slots: &mut HashMap<MenuId, Slot>,
    children: &HashMap<MenuId, Vec<MenuId>>,
) -> Option<MenuTree> {
    let slot = slots.remove(id)?;
    let kids = children
        .get(id)
        .map(|ids| {
            ids.iter()
                .filter_map(|c| assemble(c, slots, children))
                .collect()
        })
        .unwrap_or_default();
    Some(MenuTree {
        id: slot.menu.id,
        name: slot.menu.name,
        parent_id: slot.menu.parent_id,
        sequence: slot.menu.sequence,
        status: slot.menu.status,
        actions: slot.actions.into_iter().collect(),
        children: kids,
    })
}
