//! Per-scope name registry
//!
//! A [`Registry`] maps names to non-owning [`EntityId`]s within one scope.
//! Names are unique per scope and adding an existing name never overwrites the
//! previous binding. Dotted paths (`a.b.c`) are resolved one segment at a time
//! through the child scopes.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::entity::EntityId;

/// Whether `name` is a valid identifier: `[A-Za-z][A-Za-z0-9_-]*`
pub fn is_valid_name(name: &str) -> bool {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("identifier pattern is valid")
        })
        .is_match(name)
}

/// Longest prefix shared by every name, `None` for no names
pub(crate) fn common_prefix<'a, I>(names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut names = names.into_iter();
    let mut common = names.next()?;
    for name in names {
        let shared = common
            .char_indices()
            .zip(name.chars())
            .find(|((_, a), b)| a != b)
            .map(|((index, _), _)| index)
            .unwrap_or_else(|| common.len().min(name.len()));
        common = &common[..shared];
    }
    Some(common)
}

/// Name to entity map for a single scope
///
/// Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: IndexMap<String, EntityId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `entity`. Fails if the name is empty or already bound.
    pub fn add(&mut self, name: &str, entity: EntityId) -> bool {
        if name.is_empty() || self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(name.to_string(), entity);
        true
    }

    /// Remove a binding if present
    pub fn erase(&mut self, name: &str) -> bool {
        self.entries.shift_remove(name).is_some()
    }

    /// Single-segment lookup
    pub fn get(&self, name: &str) -> Option<EntityId> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Resolve a dotted path
    ///
    /// The first segment is looked up here, every further segment in the
    /// registry that `scope_of` returns for the previous match. Empty paths,
    /// leading or trailing dots, empty segments and unresolved segments all
    /// yield `None`.
    pub fn resolve<'a, F>(&'a self, path: &str, scope_of: F) -> Option<EntityId>
    where
        F: Fn(EntityId) -> Option<&'a Registry>,
    {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            if segment.is_empty() {
                return None;
            }
            current = scope_of(current)?.get(segment)?;
        }
        Some(current)
    }

    /// Longest common extension of every name starting with `input`
    ///
    /// Returns `input` itself when nothing matches.
    pub fn complete(&self, input: &str) -> String {
        common_prefix(self.completions(input))
            .unwrap_or(input)
            .to_string()
    }

    /// Every bound name starting with `prefix`, in insertion order
    pub fn completions(&self, prefix: &str) -> Vec<&str> {
        self.names().filter(|name| name.starts_with(prefix)).collect()
    }

    pub fn number_of_completions(&self, prefix: &str) -> usize {
        self.names().filter(|name| name.starts_with(prefix)).count()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Names separated by single spaces
    pub fn names_joined(&self) -> String {
        self.names().collect::<Vec<_>>().join(" ")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, EntityId)> + '_ {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<EntityId> {
        let mut map: SlotMap<EntityId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("foo"));
        assert!(is_valid_name("Foo_bar-2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("2foo"));
        assert!(!is_valid_name("_foo"));
        assert!(!is_valid_name("foo.bar"));
        assert!(!is_valid_name("foo bar"));
    }

    #[test]
    fn test_add_never_overwrites() {
        let ids = ids(2);
        let mut registry = Registry::new();

        assert!(registry.add("foo", ids[0]));
        assert!(!registry.add("foo", ids[1]));
        assert_eq!(registry.get("foo"), Some(ids[0]));
        assert!(!registry.add("", ids[1]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_erase() {
        let ids = ids(1);
        let mut registry = Registry::new();
        registry.add("foo", ids[0]);

        assert!(registry.erase("foo"));
        assert!(!registry.erase("foo"));
        assert_eq!(registry.get("foo"), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolve_dotted_path() {
        let ids = ids(3);
        let mut root = Registry::new();
        let mut a = Registry::new();
        let mut b = Registry::new();
        root.add("a", ids[0]);
        a.add("b", ids[1]);
        b.add("c", ids[2]);

        let scopes = [(ids[0], &a), (ids[1], &b)];
        let scope_of = |id: EntityId| {
            scopes
                .iter()
                .find(|(scope, _)| *scope == id)
                .map(|(_, registry)| *registry)
        };

        assert_eq!(root.resolve("a", scope_of), Some(ids[0]));
        assert_eq!(root.resolve("a.b", scope_of), Some(ids[1]));
        assert_eq!(root.resolve("a.b.c", scope_of), Some(ids[2]));
        assert_eq!(a.resolve("b.c", scope_of), root.resolve("a.b.c", scope_of));

        assert_eq!(root.resolve("", scope_of), None);
        assert_eq!(root.resolve(".a", scope_of), None);
        assert_eq!(root.resolve("a.", scope_of), None);
        assert_eq!(root.resolve("a..b", scope_of), None);
        assert_eq!(root.resolve("a.x.c", scope_of), None);
        assert_eq!(root.resolve("a.b.c.d", scope_of), None);
    }

    #[test]
    fn test_complete() {
        let ids = ids(4);
        let mut registry = Registry::new();
        registry.add("foo", ids[0]);
        registry.add("foobar", ids[1]);
        registry.add("foobaz", ids[2]);
        registry.add("qux", ids[3]);

        assert_eq!(registry.complete("f"), "foo");
        assert_eq!(registry.complete("foob"), "fooba");
        assert_eq!(registry.complete("q"), "qux");
        assert_eq!(registry.complete("zzz"), "zzz");
        assert_eq!(registry.complete(""), "");

        assert_eq!(registry.number_of_completions("foo"), 3);
        assert_eq!(registry.completions("fooba"), vec!["foobar", "foobaz"]);
    }

    #[test]
    fn test_names_keep_insertion_order() {
        let ids = ids(3);
        let mut registry = Registry::new();
        registry.add("zeta", ids[0]);
        registry.add("alpha", ids[1]);
        registry.add("mid", ids[2]);
        registry.erase("alpha");

        assert_eq!(registry.names_joined(), "zeta mid");
    }
}
