//! Group forest traversal.
//!
//! The whole forest is small and changes rarely, so it is loaded once per
//! request and walked in memory: subgroup fan-out for broadcasts, ancestor
//! chains for inbox visibility and contact roll-ups for the hierarchy view.
//! Every walk keeps a visited set, so a corrupted parent chain ends the walk
//! instead of looping.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::models::{ContactId, Group, GroupId, Membership};

/// One rendered node of the group hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    pub id: GroupId,
    pub name: String,
    pub path: String,
    /// Contacts linked directly to this group
    pub contact_count: usize,
    /// Distinct contacts of this group and all its descendants
    pub total_contact_count: usize,
    pub children: Vec<HierarchyNode>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupTree {
    groups: BTreeMap<GroupId, Group>,
    children: HashMap<GroupId, Vec<GroupId>>,
    roots: Vec<GroupId>,
    members: HashMap<GroupId, BTreeSet<ContactId>>,
}

impl GroupTree {
    /// Index groups by parent and memberships by group.
    ///
    /// A group whose parent is missing (or is itself) is treated as a root.
    /// Memberships pointing at unknown groups are ignored.
    pub fn new(groups: Vec<Group>, memberships: &[Membership]) -> Self {
        let groups: BTreeMap<GroupId, Group> = groups.into_iter().map(|g| (g.id, g)).collect();

        let mut children: HashMap<GroupId, Vec<GroupId>> = HashMap::new();
        let mut roots = Vec::new();

        // BTreeMap iteration keeps every child list sorted by id
        for group in groups.values() {
            match group.parent_id {
                Some(parent) if parent != group.id && groups.contains_key(&parent) => {
                    children.entry(parent).or_default().push(group.id);
                }
                _ => roots.push(group.id),
            }
        }

        let mut members: HashMap<GroupId, BTreeSet<ContactId>> = HashMap::new();
        for membership in memberships {
            if groups.contains_key(&membership.group_id) {
                members
                    .entry(membership.group_id)
                    .or_default()
                    .insert(membership.contact_id);
            }
        }

        Self {
            groups,
            children,
            roots,
            members,
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn contains(&self, id: GroupId) -> bool {
        self.groups.contains_key(&id)
    }

    pub fn roots(&self) -> &[GroupId] {
        &self.roots
    }

    pub fn children_of(&self, id: GroupId) -> &[GroupId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `root` followed by all of its descendants, depth-first pre-order with
    /// siblings in ascending id order. Empty if `root` is unknown.
    pub fn subtree_ids(&self, root: GroupId) -> Vec<GroupId> {
        if !self.contains(root) {
            return Vec::new();
        }

        let mut ids = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            ids.push(current);
            // Reverse so the smallest child is popped first
            for child in self.children_of(current).iter().rev() {
                if !visited.contains(child) {
                    stack.push(*child);
                }
            }
        }

        ids
    }

    /// Parent chain of `id`, nearest first, not including `id` itself
    pub fn ancestors(&self, id: GroupId) -> Vec<GroupId> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut current = self.groups.get(&id).and_then(|g| g.parent_id);

        while let Some(parent) = current {
            if !visited.insert(parent) {
                break;
            }
            let Some(group) = self.groups.get(&parent) else {
                break;
            };
            chain.push(parent);
            current = group.parent_id;
        }

        chain
    }

    /// The given groups together with every ancestor of each of them
    pub fn visible_group_ids<I>(&self, group_ids: I) -> BTreeSet<GroupId>
    where
        I: IntoIterator<Item = GroupId>,
    {
        let mut visible = BTreeSet::new();
        for id in group_ids {
            if !self.contains(id) {
                continue;
            }
            visible.insert(id);
            visible.extend(self.ancestors(id));
        }
        visible
    }

    pub fn direct_contact_count(&self, id: GroupId) -> usize {
        self.members.get(&id).map(BTreeSet::len).unwrap_or(0)
    }

    /// Distinct contacts linked to `id` or any of its descendants
    pub fn subtree_contacts(&self, id: GroupId) -> BTreeSet<ContactId> {
        self.subtree_ids(id)
            .into_iter()
            .filter_map(|gid| self.members.get(&gid))
            .flatten()
            .copied()
            .collect()
    }

    /// First group (lowest id) whose name matches, ignoring case and
    /// surrounding whitespace
    pub fn find_by_name(&self, name: &str) -> Option<&Group> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.groups
            .values()
            .find(|g| g.name.trim().to_lowercase() == wanted)
    }

    /// Slash-joined names from the top of the forest down to `id`
    pub fn path(&self, id: GroupId) -> Option<String> {
        let group = self.groups.get(&id)?;
        let mut names: Vec<&str> = self
            .ancestors(id)
            .iter()
            .rev()
            .filter_map(|a| self.groups.get(a))
            .map(|g| g.name.as_str())
            .collect();
        names.push(group.name.as_str());
        Some(names.join("/"))
    }

    /// Render the hierarchy.
    ///
    /// Without a root every top-level group is rendered and paths start at
    /// the top of the forest. With a root, a single node is rendered whose
    /// path starts at the root's own name.
    pub fn hierarchy(&self, root: Option<GroupId>) -> Vec<HierarchyNode> {
        let mut visited = HashSet::new();
        match root {
            Some(id) => match self.groups.get(&id) {
                Some(group) => {
                    let (node, _) = self.build_node(id, group.name.clone(), &mut visited);
                    vec![node]
                }
                None => Vec::new(),
            },
            None => self
                .roots
                .iter()
                .filter_map(|id| {
                    let group = self.groups.get(id)?;
                    let (node, _) = self.build_node(*id, group.name.clone(), &mut visited);
                    Some(node)
                })
                .collect(),
        }
    }

    /// Builds the node for `id` and returns it with the distinct contacts of
    /// its whole subtree, so the roll-up is computed in a single pass.
    fn build_node(
        &self,
        id: GroupId,
        path: String,
        visited: &mut HashSet<GroupId>,
    ) -> (HierarchyNode, BTreeSet<ContactId>) {
        visited.insert(id);

        let direct = self.members.get(&id).cloned().unwrap_or_default();
        let mut subtree = direct.clone();
        let mut children = Vec::new();

        for child_id in self.children_of(id) {
            if visited.contains(child_id) {
                continue;
            }
            let Some(child) = self.groups.get(child_id) else {
                continue;
            };
            let child_path = format!("{}/{}", path, child.name);
            let (node, contacts) = self.build_node(*child_id, child_path, visited);
            subtree.extend(contacts);
            children.push(node);
        }

        let name = self
            .groups
            .get(&id)
            .map(|g| g.name.clone())
            .unwrap_or_default();

        let node = HierarchyNode {
            id,
            name,
            path,
            contact_count: direct.len(),
            total_contact_count: subtree.len(),
            children,
        };

        (node, subtree)
    }
}
