//! tree.rs
//! The legislative parameter tree, addressed by dotted paths.
//!
//! The tree is a persistent structure: `with_child` and the `with_value_update*`
//! family return a new tree that copies only the branches along the edited path.
//! Every other subtree is shared with the original, which is never modified, so
//! several reforms can derive from one baseline at the same time.

use super::error::ParameterError;
use super::node::{Parameter, ParameterNode, ParameterValue, ScaleAt};
use chrono::NaiveDate;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTree {
    root: ParameterNode,
}

impl Default for ParameterTree {
    fn default() -> Self { Self::new() }
}

impl ParameterTree {
    pub fn new() -> Self {
        Self { root: ParameterNode::empty_branch() }
    }

    pub fn from_root(root: ParameterNode) -> Result<Self, ParameterError> {
        match root {
            ParameterNode::Branch(_) => Ok(Self { root }),
            _ => Err(ParameterError::NotABranch { path: String::new() }),
        }
    }

    pub fn root(&self) -> &ParameterNode { &self.root }

    /// The node at `path`, whatever its kind.
    pub fn node(&self, path: &str) -> Result<&ParameterNode, ParameterError> {
        let mut current = &self.root;
        for segment in split_path(path)? {
            current = current.child(segment).ok_or_else(|| ParameterError::not_found(path, None))?;
        }
        Ok(current)
    }

    fn leaf(&self, path: &str) -> Result<&Parameter, ParameterError> {
        match self.node(path)? {
            ParameterNode::Leaf(p) => Ok(p),
            _ => Err(ParameterError::NotALeaf { path: path.to_string() }),
        }
    }

    /// The value in force at `instant`. A null entry yields `ParameterValue::Null`;
    /// an instant before the first entry is `ParameterNotFound`.
    pub fn at(&self, path: &str, instant: NaiveDate) -> Result<ParameterValue, ParameterError> {
        self.leaf(path)?
            .value_at(instant)
            .cloned()
            .ok_or_else(|| ParameterError::not_found(path, Some(instant)))
    }

    pub fn number(&self, path: &str, instant: NaiveDate) -> Result<f64, ParameterError> {
        self.at(path, instant)?
            .as_number()
            .ok_or_else(|| ParameterError::NotANumber { path: path.to_string(), instant })
    }

    /// Like `number`, with the null sentinel mapped to `None`.
    pub fn optional_number(&self, path: &str, instant: NaiveDate) -> Result<Option<f64>, ParameterError> {
        match self.at(path, instant)? {
            ParameterValue::Null => Ok(None),
            ParameterValue::Number(v) => Ok(Some(v)),
            ParameterValue::Category(_) => Err(ParameterError::NotANumber { path: path.to_string(), instant }),
        }
    }

    pub fn category(&self, path: &str, instant: NaiveDate) -> Result<String, ParameterError> {
        match self.at(path, instant)? {
            ParameterValue::Category(c) => Ok(c),
            _ => Err(ParameterError::InvalidEntries { path: path.to_string(), reason: format!("no category in force at {}", instant) }),
        }
    }

    pub fn scale(&self, path: &str, instant: NaiveDate) -> Result<ScaleAt, ParameterError> {
        match self.node(path)? {
            ParameterNode::Scale(s) => Ok(s.at(instant)),
            _ => Err(ParameterError::NotAScale { path: path.to_string() }),
        }
    }

    /// A read-only view of the tree at one instant, handed to formulas.
    pub fn at_instant(&self, instant: NaiveDate) -> ParametersAt<'_> {
        ParametersAt { tree: self, instant }
    }

    /// Inserts or replaces the node at `path`, creating missing branches.
    pub fn with_child(&self, path: &str, node: ParameterNode) -> Result<ParameterTree, ParameterError> {
        let segments = split_path(path)?;
        let mut node = Some(node);
        let root = rebuild(&self.root, &segments, path, true, &mut |_existing: Option<&ParameterNode>| {
            node.take().ok_or_else(|| ParameterError::not_found(path, None))
        })?;
        Ok(ParameterTree { root })
    }

    /// Sets the leaf at `path` to `value` from `start` onward, keeping earlier history.
    pub fn with_value_update(&self, path: &str, start: NaiveDate, value: impl Into<ParameterValue>) -> Result<ParameterTree, ParameterError> {
        let value = value.into();
        self.edit_leaf(path, |leaf| Ok(leaf.updated_from(start, value.clone())))
    }

    /// Sets the leaf at `path` to `value` on `[start, stop)`.
    pub fn with_value_update_between(&self, path: &str, start: NaiveDate, stop: NaiveDate, value: impl Into<ParameterValue>) -> Result<ParameterTree, ParameterError> {
        let value = value.into();
        self.edit_leaf(path, |leaf| {
            leaf.updated_between(start, stop, value.clone())
                .map_err(|reason| ParameterError::InvalidEntries { path: path.to_string(), reason })
        })
    }

    fn edit_leaf(&self, path: &str, edit: impl Fn(&Parameter) -> Result<Parameter, ParameterError>) -> Result<ParameterTree, ParameterError> {
        let segments = split_path(path)?;
        let root = rebuild(&self.root, &segments, path, false, &mut |existing: Option<&ParameterNode>| match existing {
            Some(ParameterNode::Leaf(leaf)) => Ok(ParameterNode::Leaf(Arc::new(edit(leaf)?))),
            Some(_) => Err(ParameterError::NotALeaf { path: path.to_string() }),
            None => Err(ParameterError::not_found(path, None)),
        })?;
        Ok(ParameterTree { root })
    }

    /// Dotted paths of every leaf, in tree order.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaves(&self.root, String::new(), &mut out);
        out
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, ParameterError> {
    let segments: Vec<&str> = path.split('.').collect();
    if path.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(ParameterError::not_found(path, None));
    }
    Ok(segments)
}

/// Copies the branches along `segments` and applies `edit` at the end of the path.
fn rebuild(
    node: &ParameterNode,
    segments: &[&str],
    path: &str,
    create_missing: bool,
    edit: &mut dyn FnMut(Option<&ParameterNode>) -> Result<ParameterNode, ParameterError>,
) -> Result<ParameterNode, ParameterError> {
    let children = match node {
        ParameterNode::Branch(children) => children,
        _ => return Err(ParameterError::NotABranch { path: path.to_string() }),
    };
    let (head, rest) = segments.split_first().ok_or_else(|| ParameterError::not_found(path, None))?;
    let existing = children.get(*head);

    let replacement = if rest.is_empty() {
        edit(existing)?
    } else {
        match existing {
            Some(child) => rebuild(child, rest, path, create_missing, edit)?,
            None if create_missing => rebuild(&ParameterNode::empty_branch(), rest, path, create_missing, edit)?,
            None => return Err(ParameterError::not_found(path, None)),
        }
    };

    // Shallow copy: sibling subtrees are shared through their `Arc`s.
    let mut new_children = (**children).clone();
    new_children.insert(head.to_string(), replacement);
    Ok(ParameterNode::Branch(Arc::new(new_children)))
}

fn collect_leaves(node: &ParameterNode, prefix: String, out: &mut Vec<String>) {
    match node {
        ParameterNode::Branch(children) => {
            for (name, child) in children.iter() {
                let path = if prefix.is_empty() { name.clone() } else { format!("{}.{}", prefix, name) };
                collect_leaves(child, path, out);
            }
        }
        ParameterNode::Leaf(_) | ParameterNode::Scale(_) => out.push(prefix),
    }
}

/// `parameters(period.start)`: the tree frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct ParametersAt<'a> {
    tree: &'a ParameterTree,
    instant: NaiveDate,
}

impl<'a> ParametersAt<'a> {
    pub fn instant(&self) -> NaiveDate { self.instant }
    pub fn tree(&self) -> &'a ParameterTree { self.tree }

    pub fn get(&self, path: &str) -> Result<ParameterValue, ParameterError> { self.tree.at(path, self.instant) }
    pub fn number(&self, path: &str) -> Result<f64, ParameterError> { self.tree.number(path, self.instant) }
    pub fn optional_number(&self, path: &str) -> Result<Option<f64>, ParameterError> { self.tree.optional_number(path, self.instant) }
    pub fn category(&self, path: &str) -> Result<String, ParameterError> { self.tree.category(path, self.instant) }
    pub fn scale(&self, path: &str) -> Result<ScaleAt, ParameterError> { self.tree.scale(path, self.instant) }

    /// `Ok(None)` when the parameter does not exist under this legislation.
    pub fn number_if_defined(&self, path: &str) -> Result<Option<f64>, ParameterError> {
        match self.optional_number(path) {
            Err(e) if e.is_not_found() => Ok(None),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::node::ParameterEntry;

    fn jan1(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn leaf(points: &[(i32, ParameterValue)]) -> ParameterNode {
        ParameterNode::leaf(Parameter::new(points.iter().map(|(y, v)| ParameterEntry::new(jan1(*y), v.clone())).collect()).unwrap())
    }

    fn sample_tree() -> ParameterTree {
        use ParameterValue::*;
        ParameterTree::new()
            .with_child("prix.diesel", leaf(&[(2010, Number(100.0)), (2005, Number(90.0)), (2000, Number(80.0))])).unwrap()
            .with_child("prix.essence", leaf(&[(2000, Number(120.0))])).unwrap()
            .with_child("majoration.alsace", leaf(&[(2011, Number(1.35)), (1990, Null)])).unwrap()
            .with_child("taux.tva", leaf(&[(2014, Number(0.20))])).unwrap()
    }

    #[test]
    fn test_lookup_returns_value_in_force() {
        let tree = sample_tree();
        let at = |y: i32, m: u32| tree.number("prix.diesel", NaiveDate::from_ymd_opt(y, m, 1).unwrap());

        assert_eq!(at(2003, 6).unwrap(), 80.0);
        assert_eq!(at(2006, 1).unwrap(), 90.0);
        assert_eq!(at(2015, 1).unwrap(), 100.0);
        assert!(at(1999, 1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_null_sentinel_is_not_not_found() {
        let tree = sample_tree();
        assert_eq!(tree.at("majoration.alsace", jan1(2000)).unwrap(), ParameterValue::Null);
        assert_eq!(tree.optional_number("majoration.alsace", jan1(2000)).unwrap(), None);
        assert_eq!(tree.optional_number("majoration.alsace", jan1(2012)).unwrap(), Some(1.35));
        assert!(matches!(tree.number("majoration.alsace", jan1(2000)), Err(ParameterError::NotANumber { .. })));
    }

    #[test]
    fn test_missing_paths() {
        let tree = sample_tree();
        assert!(tree.at("prix.gpl", jan1(2015)).unwrap_err().is_not_found());
        assert!(tree.at("", jan1(2015)).unwrap_err().is_not_found());
        assert!(matches!(tree.at("prix", jan1(2015)), Err(ParameterError::NotALeaf { .. })));
        assert_eq!(tree.at_instant(jan1(2015)).number_if_defined("prix.diesel_reference").unwrap(), None);
    }

    #[test]
    fn test_value_update_does_not_touch_original() {
        let base = sample_tree();
        let before: Vec<_> = base.leaf_paths().iter().map(|p| base.at(p, jan1(2018)).ok()).collect();

        let reformed = base.with_value_update("prix.diesel", jan1(2017), 130.0).unwrap();

        let after: Vec<_> = base.leaf_paths().iter().map(|p| base.at(p, jan1(2018)).ok()).collect();
        assert_eq!(before, after);
        assert_eq!(reformed.number("prix.diesel", jan1(2018)).unwrap(), 130.0);
        assert_eq!(reformed.number("prix.diesel", jan1(2016)).unwrap(), 100.0);
    }

    #[test]
    fn test_untouched_subtrees_are_shared() {
        let base = sample_tree();
        let reformed = base.with_value_update("prix.diesel", jan1(2017), 130.0).unwrap();

        assert!(base.node("taux").unwrap().ptr_eq(reformed.node("taux").unwrap()));
        assert!(base.node("prix.essence").unwrap().ptr_eq(reformed.node("prix.essence").unwrap()));
        assert!(!base.node("prix").unwrap().ptr_eq(reformed.node("prix").unwrap()));
    }

    #[test]
    fn test_with_child_copies_subtree_under_new_name() {
        let base = sample_tree();
        let diesel = base.node("prix.diesel").unwrap().clone();
        let reformed = base.with_child("prix.diesel_reference", diesel).unwrap();

        assert_eq!(reformed.number("prix.diesel_reference", jan1(2012)).unwrap(), 100.0);
        assert!(base.node("prix.diesel_reference").is_err());
    }

    #[test]
    fn test_update_requires_existing_leaf() {
        let base = sample_tree();
        assert!(base.with_value_update("prix.gpl", jan1(2017), 1.0).unwrap_err().is_not_found());
        assert!(matches!(base.with_value_update("prix", jan1(2017), 1.0), Err(ParameterError::NotALeaf { .. })));
        assert!(matches!(base.with_child("taux.tva.sub", ParameterNode::empty_branch()), Err(ParameterError::NotABranch { .. })));
    }

    #[test]
    fn test_update_between() {
        let base = sample_tree();
        let tree = base.with_value_update_between("prix.essence", jan1(2016), jan1(2018), 140.0).unwrap();
        assert_eq!(tree.number("prix.essence", jan1(2015)).unwrap(), 120.0);
        assert_eq!(tree.number("prix.essence", jan1(2017)).unwrap(), 140.0);
        assert_eq!(tree.number("prix.essence", jan1(2019)).unwrap(), 120.0);
    }
}
