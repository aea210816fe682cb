use crate::{common, error};

use indexmap::IndexMap;
use std::{collections, str};

/// Attributes kept by a read, as a tree of document paths.
///
/// Parsed from a comma separated list; dotted entries select nested
/// attributes:
///
/// ```rust
/// use dynamodb_data_api::common::selection;
///
/// let selection: selection::SelectionMap = "name, date".parse().unwrap();
/// assert_eq!(
///     selection,
///     selection::SelectionMap::Leaves(vec!["name".to_string(), "date".to_string()]),
/// );
///
/// let selection: selection::SelectionMap = "name, profile.team".parse().unwrap();
/// assert!(matches!(selection, selection::SelectionMap::Node(_)));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SelectionMap {
    /// Top-level attributes, in order.
    Leaves(Vec<String>),
    /// Attributes keyed by name; an empty `Leaves` value selects the whole attribute.
    Node(IndexMap<String, SelectionMap>),
}

impl str::FromStr for SelectionMap {
    type Err = error::Error;

    fn from_str(selection: &str) -> error::Result<Self> {
        let invalid = || error::Error::InvalidSelection(selection.to_string());
        let mut tree = IndexMap::new();
        for entry in selection.split(',') {
            let path = entry
                .split('.')
                .map(str::trim)
                .collect::<Vec<_>>();
            if path.iter().any(|segment| segment.is_empty()) || !insert_path(&mut tree, &path) {
                return Err(invalid());
            }
        }
        let flat = tree
            .values()
            .all(|child| matches!(child, Self::Leaves(leaves) if leaves.is_empty()));
        if flat {
            Ok(Self::Leaves(tree.into_keys().collect()))
        } else {
            Ok(Self::Node(tree))
        }
    }
}

/// Add `path` under `tree`; `false` when it overlaps a path already there.
fn insert_path(tree: &mut IndexMap<String, SelectionMap>, path: &[&str]) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return false;
    };
    if rest.is_empty() {
        if tree.contains_key(*head) {
            return false;
        }
        tree.insert(head.to_string(), SelectionMap::Leaves(Vec::new()));
        return true;
    }
    match tree
        .entry(head.to_string())
        .or_insert_with(|| SelectionMap::Node(IndexMap::new()))
    {
        SelectionMap::Node(child) => insert_path(child, rest),
        SelectionMap::Leaves(_) => false,
    }
}

impl From<SelectionMap> for common::ExpressionInput {
    fn from(selection_map: SelectionMap) -> Self {
        selection_map.into_projection(&[])
    }
}

impl SelectionMap {
    fn into_projection(self, parents: &[String]) -> common::ExpressionInput {
        let paths: Vec<_> = match self {
            Self::Leaves(leaves) => leaves
                .into_iter()
                .map(|leaf| path_projection(parents, leaf, None))
                .collect(),
            Self::Node(children) => children
                .into_iter()
                .map(|(name, child)| match child {
                    Self::Leaves(leaves) if leaves.is_empty() => {
                        path_projection(parents, name, None)
                    }
                    child => path_projection(parents, name, Some(child)),
                })
                .collect(),
        };
        common::ExpressionInput::merge(", ", paths)
    }
}

fn path_projection(
    parents: &[String],
    name: String,
    child: Option<SelectionMap>,
) -> common::ExpressionInput {
    let (placeholder, path) = common::add_placeholder(parents, &name);
    let mut projection = match child {
        Some(child) => child.into_projection(&path),
        None => common::ExpressionInput {
            expression: path.join("."),
            ..Default::default()
        },
    };
    projection
        .expression_attribute_names
        .insert(placeholder, name);
    projection
}
