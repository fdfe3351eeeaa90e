//! Shortest-import-chain tree over a finished bundle.
//!
//! The bundle graph may be cyclic and modules may have many importers. For
//! reporting, every module is attached once, under the importer that reaches
//! it in the fewest hops from an entry point.

use crate::engine::BundleResult;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

/// One node of the tree. The root has no name; its children are the entry
/// points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Branch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Branch>,
}

struct Node {
    name: String,
    children: Vec<usize>,
}

/// Build the tree for `result`.
///
/// Entry points come from the result when the engine reported them;
/// otherwise every module that no other module depends on is an entry.
#[must_use]
pub fn build_tree(result: &BundleResult) -> Branch {
    let entries = result
        .entry_points
        .clone()
        .unwrap_or_else(|| infer_entry_points(result));

    let mut arena: Vec<Node> = Vec::new();
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::new();
    let mut roots = Vec::new();

    for entry in entries {
        if visited.insert(entry.clone()) {
            roots.push(arena.len());
            queue.push_back(arena.len());
            arena.push(Node {
                name: entry,
                children: Vec::new(),
            });
        }
    }

    while let Some(idx) = queue.pop_front() {
        let Some(record) = result.tree.get(&arena[idx].name) else {
            continue;
        };
        for dep in &record.deps {
            let target = record.dep_map.get(dep).unwrap_or(dep);
            if visited.insert(target.clone()) {
                let child = arena.len();
                arena.push(Node {
                    name: target.clone(),
                    children: Vec::new(),
                });
                arena[idx].children.push(child);
                queue.push_back(child);
            }
        }
    }

    Branch {
        name: None,
        children: roots.into_iter().map(|idx| materialize(&arena, idx)).collect(),
    }
}

fn materialize(arena: &[Node], idx: usize) -> Branch {
    let node = &arena[idx];
    Branch {
        name: Some(node.name.clone()),
        children: node
            .children
            .iter()
            .map(|&child| materialize(arena, child))
            .collect(),
    }
}

/// Modules with no inbound edge, in sorted order.
fn infer_entry_points(result: &BundleResult) -> Vec<String> {
    let targets: BTreeSet<&String> = result
        .tree
        .values()
        .flat_map(|record| {
            record
                .deps
                .iter()
                .map(move |dep| record.dep_map.get(dep).unwrap_or(dep))
        })
        .collect();

    result
        .tree
        .keys()
        .filter(|name| !targets.contains(name))
        .cloned()
        .collect()
}

impl Branch {
    /// Indented text rendering, one module per line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.render_into(0, &mut out);
        }
        out
    }

    fn render_into(&self, depth: usize, out: &mut String) {
        if let Some(name) = &self.name {
            out.push_str(&"  ".repeat(depth));
            out.push_str(name);
            out.push('\n');
        }
        for child in &self.children {
            child.render_into(depth + 1, out);
        }
    }

    /// Shortest import chain from an entry point to `module`, entry first.
    #[must_use]
    pub fn chain_to(&self, module: &str) -> Option<Vec<String>> {
        if self.name.as_deref() == Some(module) {
            return Some(vec![module.to_string()]);
        }
        self.children.iter().find_map(|child| {
            let mut chain = child.chain_to(module)?;
            if let Some(name) = &self.name {
                chain.insert(0, name.clone());
            }
            Some(chain)
        })
    }

    /// Number of named branches in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.name.is_some()) + self.children.iter().map(Branch::len).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ModuleRecord;
    use std::collections::BTreeMap;

    fn record(deps: &[(&str, &str)]) -> ModuleRecord {
        ModuleRecord {
            deps: deps.iter().map(|(spec, _)| (*spec).to_string()).collect(),
            dep_map: deps
                .iter()
                .map(|(spec, target)| ((*spec).to_string(), (*target).to_string()))
                .collect(),
        }
    }

    fn leaf(name: &str) -> Branch {
        Branch {
            name: Some(name.to_string()),
            children: Vec::new(),
        }
    }

    fn diamond(entry_points: Option<Vec<String>>) -> BundleResult {
        let mut tree = BTreeMap::new();
        tree.insert("a.js".to_string(), record(&[("./b", "b.js"), ("./c", "c.js")]));
        tree.insert("b.js".to_string(), record(&[("./c", "c.js")]));
        tree.insert("c.js".to_string(), record(&[]));
        BundleResult {
            entry_points,
            tree,
            ..BundleResult::default()
        }
    }

    #[test]
    fn test_shared_dependency_attaches_at_minimum_depth() {
        let tree = build_tree(&diamond(Some(vec!["a.js".to_string()])));

        let expected = Branch {
            name: None,
            children: vec![Branch {
                name: Some("a.js".to_string()),
                children: vec![leaf("b.js"), leaf("c.js")],
            }],
        };
        assert_eq!(tree, expected);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_entry_points_are_inferred() {
        let inferred = build_tree(&diamond(None));
        let reported = build_tree(&diamond(Some(vec!["a.js".to_string()])));
        assert_eq!(inferred, reported);
    }

    #[test]
    fn test_cycles_terminate() {
        let mut tree = BTreeMap::new();
        tree.insert("main.js".to_string(), record(&[("./x", "x.js")]));
        tree.insert("x.js".to_string(), record(&[("./y", "y.js")]));
        tree.insert("y.js".to_string(), record(&[("./x", "x.js"), ("./main", "main.js")]));
        let result = BundleResult {
            entry_points: Some(vec!["main.js".to_string()]),
            tree,
            ..BundleResult::default()
        };

        let branch = build_tree(&result);
        assert_eq!(branch.len(), 3);
        assert_eq!(branch.render(), "main.js\n  x.js\n    y.js\n");
    }

    #[test]
    fn test_unmapped_specifier_is_its_own_name() {
        let mut tree = BTreeMap::new();
        tree.insert(
            "index.js".to_string(),
            ModuleRecord {
                deps: vec!["react".to_string()],
                dep_map: BTreeMap::new(),
            },
        );
        let result = BundleResult {
            tree,
            ..BundleResult::default()
        };

        assert_eq!(build_tree(&result).render(), "index.js\n  react\n");
    }

    #[test]
    fn test_chain_to() {
        let tree = build_tree(&diamond(None));
        assert_eq!(
            tree.chain_to("c.js"),
            Some(vec!["a.js".to_string(), "c.js".to_string()])
        );
        assert_eq!(tree.chain_to("a.js"), Some(vec!["a.js".to_string()]));
        assert_eq!(tree.chain_to("missing.js"), None);
    }

    #[test]
    fn test_empty_result_gives_empty_tree() {
        let tree = build_tree(&BundleResult::default());
        assert!(tree.is_empty());
        assert_eq!(tree.render(), "");
    }
}
