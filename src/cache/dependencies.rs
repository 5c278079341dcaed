//! Reverse-dependency index: which source paths (templates, partials, data
//! files) a given page pulls in, and — inverted — which pages a given
//! dependency affects. The planner walks the inverted index to compute a
//! minimal rebuild set when a template or data file changes.

use crate::cache::store::Cacheable;
use crate::primitives::SourcePath;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct DependencyEntry {
    pub page: SourcePath,
    pub depends_on: Vec<SourcePath>,
}

impl Cacheable for DependencyEntry {
    fn to_cache_dict(&self) -> Value {
        serde_json::json!({
            "page": self.page.as_str(),
            "depends_on": self.depends_on.iter().map(SourcePath::as_str).collect::<Vec<_>>(),
        })
    }

    fn from_cache_dict(value: &Value) -> Result<Self, String> {
        let page = value.get("page").and_then(Value::as_str).ok_or("missing page")?;
        let depends_on = value
            .get("depends_on")
            .and_then(Value::as_array)
            .ok_or("missing depends_on")?
            .iter()
            .filter_map(Value::as_str)
            .map(SourcePath::new)
            .collect();
        Ok(DependencyEntry {
            page: SourcePath::new(page),
            depends_on,
        })
    }
}

#[derive(Default)]
pub struct DependencyGraph {
    forward: FxHashMap<SourcePath, FxHashSet<SourcePath>>,
    reverse: FxHashMap<SourcePath, FxHashSet<SourcePath>>,
}

impl DependencyGraph {
    pub fn from_entries(entries: Vec<DependencyEntry>) -> Self {
        let mut graph = Self::default();
        for entry in entries {
            graph.set(entry.page, entry.depends_on);
        }
        graph
    }

    pub fn into_entries(self) -> Vec<DependencyEntry> {
        self.forward
            .into_iter()
            .map(|(page, deps)| DependencyEntry {
                page,
                depends_on: deps.into_iter().collect(),
            })
            .collect()
    }

    pub fn set(&mut self, page: SourcePath, depends_on: Vec<SourcePath>) {
        if let Some(old) = self.forward.remove(&page) {
            for dep in &old {
                if let Some(pages) = self.reverse.get_mut(dep) {
                    pages.remove(&page);
                }
            }
        }
        for dep in &depends_on {
            self.reverse.entry(dep.clone()).or_default().insert(page.clone());
        }
        self.forward.insert(page, depends_on.into_iter().collect());
    }

    pub fn depends_on(&self, page: &SourcePath) -> impl Iterator<Item = &SourcePath> {
        self.forward.get(page).into_iter().flatten()
    }

    /// Every page that (directly) depends on `source`.
    pub fn dependents_of(&self, source: &SourcePath) -> impl Iterator<Item = &SourcePath> {
        self.reverse.get(source).into_iter().flatten()
    }

    /// Transitive closure of pages affected by a change to any path in
    /// `changed` — used by the planner to build the minimum rebuild set.
    pub fn affected_closure(&self, changed: &[SourcePath]) -> FxHashSet<SourcePath> {
        let mut result = FxHashSet::default();
        let mut stack: Vec<SourcePath> = changed.to_vec();
        while let Some(path) = stack.pop() {
            for dependent in self.dependents_of(&path) {
                if result.insert(dependent.clone()) {
                    stack.push(dependent.clone());
                }
            }
        }
        result
    }

    pub fn remove(&mut self, page: &SourcePath) {
        if let Some(old) = self.forward.remove(page) {
            for dep in &old {
                if let Some(pages) = self.reverse.get_mut(dep) {
                    pages.remove(page);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependents_of_finds_direct_consumers() {
        let mut g = DependencyGraph::default();
        g.set(SourcePath::new("a.md"), vec![SourcePath::new("post.html")]);
        g.set(SourcePath::new("b.md"), vec![SourcePath::new("post.html")]);
        let dependents: FxHashSet<_> = g.dependents_of(&SourcePath::new("post.html")).cloned().collect();
        assert_eq!(dependents.len(), 2);
    }

    #[test]
    fn affected_closure_is_transitive() {
        let mut g = DependencyGraph::default();
        // base.html included by post.html included by a.md
        g.set(SourcePath::new("post.html"), vec![SourcePath::new("base.html")]);
        g.set(SourcePath::new("a.md"), vec![SourcePath::new("post.html")]);
        let closure = g.affected_closure(&[SourcePath::new("base.html")]);
        assert!(closure.contains(&SourcePath::new("post.html")));
        assert!(closure.contains(&SourcePath::new("a.md")));
    }

    #[test]
    fn set_replaces_old_edges() {
        let mut g = DependencyGraph::default();
        g.set(SourcePath::new("a.md"), vec![SourcePath::new("old.html")]);
        g.set(SourcePath::new("a.md"), vec![SourcePath::new("new.html")]);
        assert_eq!(g.dependents_of(&SourcePath::new("old.html")).count(), 0);
        assert_eq!(g.dependents_of(&SourcePath::new("new.html")).count(), 1);
    }

    #[test]
    fn roundtrip_entries() {
        let mut g = DependencyGraph::default();
        g.set(SourcePath::new("a.md"), vec![SourcePath::new("post.html")]);
        let entries = g.into_entries();
        let restored = DependencyGraph::from_entries(entries);
        assert_eq!(restored.depends_on(&SourcePath::new("a.md")).count(), 1);
    }
}
