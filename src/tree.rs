//! Folds a flat `path → summary` mapping into a hierarchical summary tree.
//!
//! The tree is deliberately two-level: a synthetic root, one node per
//! distinct immediate parent directory (always attached directly to the
//! root, never nested) and leaf nodes per file. This mirrors a java-style
//! package view where sibling packages have no hierarchy between them.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::json;

use crate::summary::CoverageSummary;

const SEP: char = '/';

/// Index of a node inside a [`TreeSummary`] arena.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Dir,
}

/// One node of the summary tree.
///
/// `name` is the prefix-stripped identity (unique within the tree),
/// `full_name` the original path, `relative_name` the display name with
/// the parent's name removed as a further prefix.
#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub full_name: String,
    pub relative_name: String,
    pub kind: NodeKind,
    pub metrics: Option<CoverageSummary>,
    /// Merge of direct file children only (the flattened package view);
    /// `None` for file nodes and for directories without file children.
    pub package_metrics: Option<CoverageSummary>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    fn new(full_name: &str, kind: NodeKind, metrics: Option<CoverageSummary>) -> Self {
        Self {
            name: full_name.to_string(),
            full_name: full_name.to_string(),
            relative_name: String::new(),
            kind,
            metrics,
            package_metrics: None,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A built tree with its common prefix and a name index.
pub struct TreeSummary {
    pub prefix: Vec<String>,
    nodes: Vec<Node>,
    root: NodeId,
    index: HashMap<String, NodeId>,
}

impl TreeSummary {
    #[must_use]
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[self.root]
    }

    /// Look up a node by its prefix-stripped name.
    #[must_use]
    pub fn get_node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|id| &self.nodes[*id])
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "prefix": self.prefix,
            "root": self.node_to_json(self.root),
        })
    }

    fn node_to_json(&self, id: NodeId) -> serde_json::Value {
        let node = &self.nodes[id];
        json!({
            "name": node.name,
            "relativeName": node.relative_name,
            "fullName": node.full_name,
            "kind": node.kind,
            "metrics": node.metrics,
            "parent": node.parent.map(|p| self.nodes[p].name.clone()),
            "children": node
                .children
                .iter()
                .map(|child| self.node_to_json(*child))
                .collect::<Vec<_>>(),
        })
    }
}

/// Accumulates per-file summaries and builds [`TreeSummary`] values.
///
/// Stateful across `add_summary` calls; use a fresh instance per report
/// run, otherwise unrelated runs are silently merged.
#[derive(Default)]
pub struct TreeSummarizer {
    summary_map: BTreeMap<String, CoverageSummary>,
}

impl TreeSummarizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the summary for a file path; the last write for a path wins.
    pub fn add_summary(&mut self, path: &str, summary: CoverageSummary) {
        self.summary_map.insert(path.to_string(), summary);
    }

    /// Build the tree, deriving the common prefix from the stored keys
    /// unless one is supplied (used to align an incremental tree with the
    /// primary tree).
    #[must_use]
    pub fn build_tree(&self, prefix_override: Option<Vec<String>>) -> TreeSummary {
        let aligned = prefix_override.is_some();
        let mut prefix = prefix_override
            .unwrap_or_else(|| find_common_array_prefix(self.summary_map.keys()));

        let mut nodes: Vec<Node> = Vec::new();
        let mut seen: HashMap<String, NodeId> = HashMap::new();

        let root_path = format!("{}{SEP}", prefix.join("/"));
        let mut root = push_node(&mut nodes, Node::new(&root_path, NodeKind::Dir, None));
        seen.insert(root_path, root);

        let mut files_under_root = false;
        let mut dir_nodes_created = false;

        for (key, summary) in &self.summary_map {
            let leaf = push_node(&mut nodes, Node::new(key, NodeKind::File, Some(*summary)));
            let mut parent_path = format!("{}{SEP}", dirname(key));
            if parent_path == "//" || parent_path == "./" {
                parent_path = format!("{SEP}__root__{SEP}");
            }
            let parent = match seen.get(&parent_path) {
                Some(id) => *id,
                None => {
                    let dir = push_node(&mut nodes, Node::new(&parent_path, NodeKind::Dir, None));
                    attach(&mut nodes, root, dir);
                    seen.insert(parent_path, dir);
                    dir_nodes_created = true;
                    dir
                }
            };
            attach(&mut nodes, parent, leaf);
            if parent == root {
                files_under_root = true;
            }
        }

        // Promote one level up when every file landed directly under the
        // root, so the root never mixes loose files with directories. A
        // supplied prefix suppresses promotion: an aligned tree must keep
        // the node names of the tree whose prefix it borrows.
        if files_under_root && !dir_nodes_created && !prefix.is_empty() && !aligned {
            prefix.pop();
            let old_root = root;
            let old_children = std::mem::take(&mut nodes[old_root].children);
            let new_root_path = format!("{}{SEP}", prefix.join("/"));
            root = push_node(&mut nodes, Node::new(&new_root_path, NodeKind::Dir, None));
            attach(&mut nodes, root, old_root);
            for child in old_children {
                nodes[child].parent = None;
                if nodes[child].kind == NodeKind::Dir {
                    attach(&mut nodes, root, child);
                } else {
                    attach(&mut nodes, old_root, child);
                }
            }
        }

        let prefix_str = format!("{}{SEP}", prefix.join("/"));
        fixup_names(&mut nodes, root, &prefix_str, None);
        calculate_metrics(&mut nodes, root);

        let mut index = HashMap::new();
        index_and_sort(&mut nodes, root, &mut index);

        TreeSummary {
            prefix,
            nodes,
            root,
            index,
        }
    }
}

fn push_node(nodes: &mut Vec<Node>, node: Node) -> NodeId {
    nodes.push(node);
    nodes.len() - 1
}

fn attach(nodes: &mut [Node], parent: NodeId, child: NodeId) {
    nodes[parent].children.push(child);
    nodes[child].parent = Some(parent);
}

fn dirname(path: &str) -> &str {
    match path.rfind(SEP) {
        None => ".",
        Some(0) => "/",
        Some(i) => &path[..i],
    }
}

/// Token-wise common prefix of all stored keys. A single key keeps its
/// directory tokens (everything but the file name).
fn find_common_array_prefix<'a, I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut separated: Vec<Vec<String>> = keys
        .into_iter()
        .map(|key| key.split(SEP).map(str::to_string).collect())
        .collect();

    let Some(mut prefix) = separated.pop() else {
        return Vec::new();
    };
    if separated.is_empty() {
        prefix.pop();
        return prefix;
    }
    for tokens in &separated {
        let common = prefix
            .iter()
            .zip(tokens.iter())
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(common);
    }
    prefix
}

fn fixup_names(nodes: &mut [Node], id: NodeId, prefix: &str, parent: Option<NodeId>) {
    let mut name = nodes[id].name.clone();
    if let Some(stripped) = name.strip_prefix(prefix) {
        name = stripped.to_string();
    }
    if let Some(stripped) = name.strip_prefix(SEP) {
        name = stripped.to_string();
    }

    let relative = match parent {
        Some(p) if nodes[p].name != format!("__root__{SEP}") => {
            let parent_len = nodes[p].name.len();
            name.get(parent_len..).unwrap_or("").to_string()
        }
        Some(_) => name.clone(),
        None => name.get(prefix.len()..).unwrap_or("").to_string(),
    };

    nodes[id].name = name;
    nodes[id].relative_name = relative;

    let children = nodes[id].children.clone();
    for child in children {
        fixup_names(nodes, child, prefix, Some(id));
    }
}

fn calculate_metrics(nodes: &mut [Node], id: NodeId) {
    if nodes[id].kind != NodeKind::Dir {
        return;
    }
    let children = nodes[id].children.clone();
    for child in &children {
        calculate_metrics(nodes, *child);
    }

    let merged = CoverageSummary::merge_all(
        children.iter().filter_map(|child| nodes[*child].metrics.as_ref()),
    );
    nodes[id].metrics = Some(merged);

    let file_children: Vec<NodeId> = children
        .iter()
        .copied()
        .filter(|child| nodes[*child].kind != NodeKind::Dir)
        .collect();
    nodes[id].package_metrics = if file_children.is_empty() {
        None
    } else {
        Some(CoverageSummary::merge_all(
            file_children
                .iter()
                .filter_map(|child| nodes[*child].metrics.as_ref()),
        ))
    };
}

fn index_and_sort(nodes: &mut [Node], id: NodeId, index: &mut HashMap<String, NodeId>) {
    index.insert(nodes[id].name.clone(), id);
    let mut children = std::mem::take(&mut nodes[id].children);
    children.sort_by(|a, b| nodes[*a].relative_name.cmp(&nodes[*b].relative_name));
    nodes[id].children = children.clone();
    for child in children {
        index_and_sort(nodes, child, index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{CoverageSummary, Metrics};

    fn summary(stmt_total: u64, stmt_covered: u64) -> CoverageSummary {
        CoverageSummary {
            statements: Metrics::from_counts(stmt_total, stmt_covered, 0),
            branches: Metrics::neutral(),
            functions: Metrics::neutral(),
            lines: Metrics::from_counts(stmt_total, stmt_covered, 0),
        }
    }

    #[test]
    fn test_common_prefix() {
        let keys = vec!["/p/a.js".to_string(), "/p/sub/b.js".to_string()];
        assert_eq!(find_common_array_prefix(keys.iter()), vec!["", "p"]);
    }

    #[test]
    fn test_common_prefix_single_key_drops_filename() {
        let keys = vec!["/p/sub/b.js".to_string()];
        assert_eq!(find_common_array_prefix(keys.iter()), vec!["", "p", "sub"]);
    }

    #[test]
    fn test_common_prefix_empty() {
        let keys: Vec<String> = vec![];
        assert!(find_common_array_prefix(keys.iter()).is_empty());
    }

    #[test]
    fn test_empty_input_yields_neutral_root() {
        let summarizer = TreeSummarizer::new();
        let tree = summarizer.build_tree(None);
        let root = tree.root();
        assert!(root.children.is_empty());
        assert_eq!(root.metrics.unwrap(), CoverageSummary::neutral());
    }

    #[test]
    fn test_mixed_files_and_dirs_under_root() {
        // End-to-end shape: a file and a sibling directory.
        let mut summarizer = TreeSummarizer::new();
        summarizer.add_summary("/p/a.js", summary(4, 4));
        summarizer.add_summary("/p/sub/b.js", summary(4, 2));
        let tree = summarizer.build_tree(None);

        let root = tree.root();
        assert_eq!(root.children.len(), 2);

        let first = tree.node(root.children[0]);
        let second = tree.node(root.children[1]);
        assert_eq!(first.relative_name, "a.js");
        assert_eq!(first.kind, NodeKind::File);
        assert_eq!(second.relative_name, "sub/");
        assert_eq!(second.kind, NodeKind::Dir);

        let b = tree.node(second.children[0]);
        assert_eq!(b.relative_name, "b.js");
        assert_eq!(b.full_name, "/p/sub/b.js");

        // Root metrics are the merge of both files.
        let root_metrics = root.metrics.unwrap();
        assert_eq!(root_metrics.statements.total, 8);
        assert_eq!(root_metrics.statements.covered, 6);
        assert_eq!(root_metrics.statements.pct, 75.0);
    }

    #[test]
    fn test_promotion_when_all_files_under_root() {
        let mut summarizer = TreeSummarizer::new();
        summarizer.add_summary("/p/a.js", summary(1, 1));
        summarizer.add_summary("/p/b.js", summary(1, 0));
        let tree = summarizer.build_tree(None);

        let root = tree.root();
        assert_eq!(tree.prefix, vec![""]);
        assert_eq!(root.children.len(), 1);
        let pkg = tree.node(root.children[0]);
        assert_eq!(pkg.kind, NodeKind::Dir);
        assert_eq!(pkg.relative_name, "p/");
        assert_eq!(pkg.children.len(), 2);
        assert_eq!(tree.node(pkg.children[0]).relative_name, "a.js");
        assert_eq!(tree.node(pkg.children[1]).relative_name, "b.js");
    }

    #[test]
    fn test_dirs_attach_to_root_not_nested() {
        // Subdirectories at different depths both hang off the root.
        let mut summarizer = TreeSummarizer::new();
        summarizer.add_summary("/p/x/a.js", summary(1, 1));
        summarizer.add_summary("/p/x/deep/nested/b.js", summary(1, 0));
        let tree = summarizer.build_tree(None);

        let root = tree.root();
        assert_eq!(root.children.len(), 2);
        assert_eq!(tree.node(root.children[0]).relative_name, "a.js");
        assert_eq!(tree.node(root.children[0]).kind, NodeKind::File);
        // The deep directory hangs directly off the root, not under an
        // intermediate "deep/" node.
        let deep = tree.node(root.children[1]);
        assert_eq!(deep.kind, NodeKind::Dir);
        assert_eq!(deep.relative_name, "deep/nested/");
        assert_eq!(tree.node(deep.children[0]).relative_name, "b.js");
    }

    #[test]
    fn test_package_metrics_direct_files_only() {
        let mut summarizer = TreeSummarizer::new();
        summarizer.add_summary("/p/a.js", summary(2, 1));
        summarizer.add_summary("/p/sub/b.js", summary(2, 2));
        let tree = summarizer.build_tree(None);

        let root = tree.root();
        // Root has one direct file child (a.js); packageMetrics exclude sub/.
        let pkg = root.package_metrics.unwrap();
        assert_eq!(pkg.statements.total, 2);
        assert_eq!(pkg.statements.covered, 1);

        let sub = tree.get_node("sub/").unwrap();
        let sub_pkg = sub.package_metrics.unwrap();
        assert_eq!(sub_pkg.statements.total, 2);
        assert_eq!(sub_pkg.statements.covered, 2);
    }

    #[test]
    fn test_case_sensitive_directories() {
        let mut summarizer = TreeSummarizer::new();
        summarizer.add_summary("/p/Sub/a.js", summary(1, 1));
        summarizer.add_summary("/p/sub/b.js", summary(1, 0));
        let tree = summarizer.build_tree(None);
        assert_eq!(tree.root().children.len(), 2);
    }

    #[test]
    fn test_prefix_override_aligns_trees() {
        let mut summarizer = TreeSummarizer::new();
        summarizer.add_summary("/p/sub/b.js", summary(1, 1));
        let tree = summarizer.build_tree(Some(vec![String::new(), "p".to_string()]));
        assert_eq!(tree.prefix, vec!["", "p"]);
        assert!(tree.get_node("sub/").is_some());
        assert!(tree.get_node("sub/b.js").is_some());
    }

    #[test]
    fn test_prefix_override_suppresses_promotion() {
        // All files directly under the root would normally promote, but
        // an aligned tree keeps the borrowed prefix's naming.
        let mut summarizer = TreeSummarizer::new();
        summarizer.add_summary("/p/a.js", summary(1, 1));
        let tree = summarizer.build_tree(Some(vec![String::new(), "p".to_string()]));
        assert_eq!(tree.prefix, vec!["", "p"]);
        assert!(tree.get_node("a.js").is_some());
    }

    #[test]
    fn test_metrics_sum_invariant() {
        let mut summarizer = TreeSummarizer::new();
        summarizer.add_summary("/p/a.js", summary(3, 1));
        summarizer.add_summary("/p/sub/b.js", summary(5, 4));
        summarizer.add_summary("/p/sub/c.js", summary(2, 2));
        let tree = summarizer.build_tree(None);

        fn check(tree: &TreeSummary, id: NodeId) {
            let node = tree.node(id);
            if node.kind == NodeKind::Dir && !node.children.is_empty() {
                let merged = CoverageSummary::merge_all(
                    node.children
                        .iter()
                        .filter_map(|c| tree.node(*c).metrics.as_ref()),
                );
                assert_eq!(node.metrics.unwrap(), merged);
                for child in &node.children {
                    check(tree, *child);
                }
            }
        }
        check(&tree, tree.root_id());
    }

    #[test]
    fn test_to_json_shape() {
        let mut summarizer = TreeSummarizer::new();
        summarizer.add_summary("/p/a.js", summary(1, 1));
        summarizer.add_summary("/p/sub/b.js", summary(1, 0));
        let json = summarizer.build_tree(None).to_json();

        assert_eq!(json["root"]["kind"], "dir");
        assert!(json["root"]["parent"].is_null());
        let children = json["root"]["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["relativeName"], "a.js");
        assert_eq!(children[0]["fullName"], "/p/a.js");
        assert_eq!(children[0]["parent"], json["root"]["name"]);
        assert_eq!(children[1]["children"][0]["relativeName"], "b.js");
    }
}
