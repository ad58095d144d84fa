use std::collections::{HashMap, HashSet};

use catalogue_core::{AppError, AppResult};
use serde::Serialize;

use crate::role::{RoleCategory, RoleCategoryId};

/// Generic ordered tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode<T> {
    value: T,
    children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    /// Creates a node from its value and children.
    #[must_use]
    pub fn new(value: T, children: Vec<TreeNode<T>>) -> Self {
        Self { value, children }
    }

    /// Returns the node content.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Returns the direct children in display order.
    #[must_use]
    pub fn children(&self) -> &[TreeNode<T>] {
        self.children.as_slice()
    }

    /// Splits the node into its content and children.
    #[must_use]
    pub fn into_parts(self) -> (T, Vec<TreeNode<T>>) {
        (self.value, self.children)
    }

    /// Returns the number of nodes in this subtree.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TreeNode::len).sum::<usize>()
    }

    /// Always false; a node counts itself.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates node values depth-first in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(&node.value)
        })
    }

    /// Builds a tree of the same shape with transformed content.
    pub fn try_map<U, F>(&self, transform: &mut F) -> AppResult<TreeNode<U>>
    where
        F: FnMut(&T) -> AppResult<U>,
    {
        let value = transform(&self.value)?;
        let children = self
            .children
            .iter()
            .map(|child| child.try_map(transform))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(TreeNode { value, children })
    }

    /// Removes descendants whose content is empty and which keep no
    /// descendants of their own, working from the leaves up.
    ///
    /// The node this is called on is never removed.
    pub fn prune<F>(&mut self, is_empty: &F)
    where
        F: Fn(&T) -> bool,
    {
        for child in &mut self.children {
            child.prune(is_empty);
        }

        self.children
            .retain(|child| !child.children.is_empty() || !is_empty(&child.value));
    }
}

impl TreeNode<RoleCategory> {
    /// Returns the direct child with the given machine name.
    ///
    /// Grandchildren are not searched.
    #[must_use]
    pub fn child_by_name(&self, machine_name: &str) -> Option<&TreeNode<RoleCategory>> {
        self.children
            .iter()
            .find(|child| child.value.machine_name().as_str() == machine_name)
    }
}

/// Category hierarchy built from the flat category rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTree {
    root: TreeNode<RoleCategory>,
}

impl CategoryTree {
    /// Builds the tree from flat rows.
    ///
    /// Exactly one row may lack a parent. Duplicate ids or names, dangling
    /// parents and cycles are reported as internal errors because they can
    /// only come from corrupt seed data.
    pub fn build(rows: Vec<RoleCategory>) -> AppResult<Self> {
        let mut ids = HashSet::with_capacity(rows.len());
        let mut names = HashSet::with_capacity(rows.len());
        for row in &rows {
            if !ids.insert(row.id()) {
                return Err(AppError::Internal(format!(
                    "role category id '{}' appears more than once",
                    row.id()
                )));
            }
            if !names.insert(row.machine_name().as_str().to_owned()) {
                return Err(AppError::Internal(format!(
                    "role category name '{}' appears more than once",
                    row.machine_name()
                )));
            }
        }

        let total = rows.len();
        let mut root = None;
        let mut children_by_parent: HashMap<RoleCategoryId, Vec<RoleCategory>> = HashMap::new();

        for row in rows {
            match row.parent_id() {
                None => {
                    if root.is_some() {
                        return Err(AppError::Internal(
                            "role category tree has more than one root".to_owned(),
                        ));
                    }
                    root = Some(row);
                }
                Some(parent_id) => {
                    if !ids.contains(&parent_id) {
                        return Err(AppError::Internal(format!(
                            "role category '{}' references unknown parent '{parent_id}'",
                            row.machine_name()
                        )));
                    }
                    children_by_parent.entry(parent_id).or_default().push(row);
                }
            }
        }

        let root = root.ok_or_else(|| {
            AppError::Internal("role category tree has no root category".to_owned())
        })?;

        for siblings in children_by_parent.values_mut() {
            siblings.sort_by(|left, right| {
                left.sibling_weight()
                    .cmp(&right.sibling_weight())
                    .then_with(|| left.machine_name().cmp(right.machine_name()))
            });
        }

        let root = attach_children(root, &mut children_by_parent);
        if root.len() != total {
            return Err(AppError::Internal(
                "role category tree contains a parent cycle".to_owned(),
            ));
        }

        Ok(Self { root })
    }

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> &TreeNode<RoleCategory> {
        &self.root
    }

    /// Returns the root category.
    #[must_use]
    pub fn root_category(&self) -> &RoleCategory {
        self.root.value()
    }

    /// Returns the direct child of the root with the given machine name.
    #[must_use]
    pub fn child_by_name(&self, machine_name: &str) -> Option<&TreeNode<RoleCategory>> {
        self.root.child_by_name(machine_name)
    }

    /// Iterates categories depth-first, root first.
    pub fn categories(&self) -> impl Iterator<Item = &RoleCategory> {
        self.root.iter()
    }

    /// Returns the number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Always false; a built tree holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

fn attach_children(
    category: RoleCategory,
    children_by_parent: &mut HashMap<RoleCategoryId, Vec<RoleCategory>>,
) -> TreeNode<RoleCategory> {
    let children = children_by_parent
        .remove(&category.id())
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach_children(child, children_by_parent))
        .collect();

    TreeNode::new(category, children)
}
