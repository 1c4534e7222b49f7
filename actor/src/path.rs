// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor path
//!
//! Hierarchical identity of an actor inside one actor system. A path is a list of segments
//! rendered as `/user/parent/child`. The path of a child is always the path of its parent plus
//! one segment, so the supervision tree can be read directly from the paths.
//!

use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::fmt::{Error, Formatter};

/// Hierarchical, `/`-delimited actor identity.
///
/// Paths are plain values: they compare, hash and order by their segments and carry no
/// reference to any live actor.
///
/// # Examples
///
/// ```
/// use actor::ActorPath;
///
/// let parent = ActorPath::from("/user/gate");
/// let child = parent.clone() / "audio";
/// assert_eq!(child.to_string(), "/user/gate/audio");
/// assert!(parent.is_parent_of(&child));
/// ```
#[derive(
    Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ActorPath(Vec<String>);

impl ActorPath {
    /// First segment of the path (`/user` for `/user/a/b`).
    pub fn root(&self) -> Self {
        ActorPath(self.0.iter().take(1).cloned().collect())
    }

    /// Path of the parent actor. The parent of a top level path is the empty path.
    pub fn parent(&self) -> Self {
        let mut tokens = self.0.clone();
        tokens.pop();
        ActorPath(tokens)
    }

    /// Derives the path of a child named `name`.
    pub fn child(&self, name: &str) -> Self {
        self.clone() / name
    }

    /// Last segment of the path, the name the actor was created with.
    pub fn key(&self) -> String {
        self.0.last().cloned().unwrap_or_default()
    }

    /// Number of segments.
    pub fn level(&self) -> usize {
        self.0.len()
    }

    /// Ancestor of this path with `level` segments. Out of range levels return the path itself.
    pub fn at_level(&self, level: usize) -> Self {
        if level < 1 || level >= self.level() {
            self.clone()
        } else {
            ActorPath(self.0[..level].to_vec())
        }
    }

    /// Iterates over the segments, root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_ancestor_of(&self, other: &ActorPath) -> bool {
        other.level() > self.level() && other.0.starts_with(&self.0)
    }

    pub fn is_descendant_of(&self, other: &ActorPath) -> bool {
        other.is_ancestor_of(self)
    }

    pub fn is_parent_of(&self, other: &ActorPath) -> bool {
        !other.is_empty() && *self == other.parent()
    }

    pub fn is_child_of(&self, other: &ActorPath) -> bool {
        other.is_parent_of(self)
    }

    /// True for a single segment path such as the guardian's `/user`. The actors created with
    /// `SystemRef::actor_of` are one level below, at `/user/<name>`.
    pub fn is_root_level(&self) -> bool {
        self.0.len() == 1
    }
}

fn tokenize(str: &str) -> impl Iterator<Item = String> + '_ {
    str.split('/')
        .filter(|x| !x.trim().is_empty())
        .map(|s| s.to_string())
}

impl From<&str> for ActorPath {
    fn from(str: &str) -> Self {
        ActorPath(tokenize(str).collect())
    }
}

impl From<String> for ActorPath {
    fn from(string: String) -> Self {
        ActorPath::from(string.as_str())
    }
}

impl From<&String> for ActorPath {
    fn from(string: &String) -> Self {
        ActorPath::from(string.as_str())
    }
}

impl std::ops::Div<&str> for ActorPath {
    type Output = ActorPath;

    fn div(self, rhs: &str) -> Self::Output {
        let mut keys = self.0;
        keys.extend(tokenize(rhs));
        ActorPath(keys)
    }
}

impl std::fmt::Display for ActorPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self.level().cmp(&1) {
            Ordering::Less => write!(f, "/"),
            _ => write!(f, "/{}", self.0.join("/")),
        }
    }
}

impl std::fmt::Debug for ActorPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use std::collections::HashSet;

    #[test]
    fn parse_empty_string() {
        let path = ActorPath::from("");
        assert!(path.is_empty());
        assert_eq!(path.to_string(), "/");
    }

    #[test]
    fn parse_nested_path() {
        let path = ActorPath::from("/user/gate/audio");
        assert_eq!(path.level(), 3);
        assert_eq!(path.key(), "audio");
        assert_eq!(
            path.segments().collect::<Vec<_>>(),
            vec!["user", "gate", "audio"]
        );
    }

    #[test]
    fn trailing_and_double_slashes_are_ignored() {
        assert_eq!(
            ActorPath::from("//user//gate/"),
            ActorPath::from("/user/gate")
        );
    }

    #[test]
    fn child_appends_one_segment() {
        let parent = ActorPath::from("/user/a");
        let child = parent.child("b");
        assert_eq!(child.to_string(), "/user/a/b");
        assert_eq!(child.parent(), parent);
        assert!(parent.is_parent_of(&child));
        assert!(child.is_child_of(&parent));
    }

    #[test]
    fn parent_of_root_level_is_empty() {
        let path = ActorPath::from("/user");
        assert!(path.is_root_level());
        assert!(path.parent().is_empty());
        assert_eq!(path.root(), path);
    }

    #[test]
    fn ancestry() {
        let path = ActorPath::from("/user/a/b/c");
        let root = path.root();
        assert!(root.is_ancestor_of(&path));
        assert!(path.is_descendant_of(&root));
        assert!(!path.is_ancestor_of(&path));
        assert!(!path.is_descendant_of(&path));
        // Prefix by characters is not ancestry.
        assert!(!ActorPath::from("/user/a").is_ancestor_of(&ActorPath::from("/user/ab")));
    }

    #[test]
    fn at_level() {
        let path = ActorPath::from("/user/a/b/c");
        assert_eq!(path.at_level(0), path);
        assert_eq!(path.at_level(1), ActorPath::from("/user"));
        assert_eq!(path.at_level(2), ActorPath::from("/user/a"));
        assert_eq!(path.at_level(3), path.parent());
        assert_eq!(path.at_level(4), path);
        assert_eq!(path.at_level(9), path);
    }

    #[test]
    fn equality_and_hash_by_value() {
        let mut set = HashSet::new();
        set.insert(ActorPath::from("/user/a"));
        assert!(set.contains(&(ActorPath::from("/user") / "a")));
    }
}
