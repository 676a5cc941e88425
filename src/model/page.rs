//! Page-level visual tree.

use super::{Display, Node};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Index path from the page body to a node (`[]` = body itself).
pub type NodePath = Vec<usize>;

/// A whole rendered page: everything on screen, not only the export root.
///
/// Export chrome (overlay, hidden controls) is applied page-wide, so the
/// orchestrator borrows the page mutably for the duration of an export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page title
    #[serde(default)]
    pub title: Option<String>,

    /// Root of the visual tree
    pub body: Node,
}

impl Page {
    /// Create a page around a body node.
    pub fn new(body: Node) -> Self {
        Self { title: None, body }
    }

    /// Parse a page snapshot from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a page snapshot from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Load a page snapshot from a JSON file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Find a node by id.
    pub fn find_by_id(&self, id: &str) -> Option<&Node> {
        self.body.find_by_id(id)
    }

    /// Find the path of the first node with the given id.
    pub fn find_path(&self, id: &str) -> Option<NodePath> {
        fn search(node: &Node, id: &str, path: &mut NodePath) -> bool {
            if node.id.as_deref() == Some(id) {
                return true;
            }
            for (i, child) in node.children.iter().enumerate() {
                path.push(i);
                if search(child, id, path) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        search(&self.body, id, &mut path).then_some(path)
    }

    /// Resolve a path to a node.
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(&self.body, |node, &i| node.children.get(i))
    }

    /// Resolve a path to a mutable node.
    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        path.iter()
            .try_fold(&mut self.body, |node, &i| node.children.get_mut(i))
    }

    /// Paths of every node carrying `class`, in document order.
    pub fn paths_with_class(&self, class: &str) -> Vec<NodePath> {
        fn walk(node: &Node, class: &str, path: &mut NodePath, out: &mut Vec<NodePath>) {
            if node.has_class(class) {
                out.push(path.clone());
            }
            for (i, child) in node.children.iter().enumerate() {
                path.push(i);
                walk(child, class, path, out);
                path.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.body, class, &mut Vec::new(), &mut out);
        out
    }

    /// Set the display of the node at `path`, returning the previous value.
    pub fn set_display(&mut self, path: &[usize], display: Option<Display>) -> Option<Option<Display>> {
        let node = self.node_at_mut(path)?;
        Some(std::mem::replace(&mut node.style.display, display))
    }

    /// Append a node as the last child of the body, returning its index.
    pub fn append_to_body(&mut self, node: Node) -> usize {
        self.body.children.push(node);
        self.body.children.len() - 1
    }

    /// Remove the body child at `index` when it carries `id`.
    pub fn remove_body_child(&mut self, index: usize, id: &str) -> Option<Node> {
        let matches = self
            .body
            .children
            .get(index)
            .is_some_and(|child| child.id.as_deref() == Some(id));
        matches.then(|| self.body.children.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> Page {
        Page::new(
            Node::block()
                .with_child(Node::block().with_id("nav").with_class("no-print"))
                .with_child(
                    Node::block()
                        .with_id("report")
                        .with_child(Node::text("Fecha: 2024-05-01"))
                        .with_child(Node::text("Guardar").with_class("no-print")),
                ),
        )
    }

    #[test]
    fn test_find_path() {
        let page = sample_page();
        assert_eq!(page.find_path("report"), Some(vec![1]));
        assert_eq!(page.find_path("missing"), None);
        assert_eq!(
            page.node_at(&[1, 0]).and_then(|n| n.text.as_deref()),
            Some("Fecha: 2024-05-01")
        );
    }

    #[test]
    fn test_paths_with_class() {
        let page = sample_page();
        assert_eq!(page.paths_with_class("no-print"), vec![vec![0], vec![1, 1]]);
    }

    #[test]
    fn test_set_display_returns_previous() {
        let mut page = sample_page();
        let prev = page.set_display(&[0], Some(Display::None));
        assert_eq!(prev, Some(None));
        assert!(page.node_at(&[0]).unwrap().is_hidden());
        assert_eq!(page.set_display(&[9], None), None);
    }

    #[test]
    fn test_malformed_colour_is_an_error() {
        let json = r##"{"body":{"kind":"block","style":{"background":"#aééa"}}}"##;
        assert!(matches!(Page::from_json(json), Err(crate::Error::Json(_))));
    }

    #[test]
    fn test_append_and_remove() {
        let mut page = sample_page();
        let index = page.append_to_body(Node::block().with_id("overlay"));
        assert_eq!(index, 2);
        assert!(page.find_by_id("overlay").is_some());
        assert!(page.remove_body_child(index, "nav").is_none());
        assert!(page.remove_body_child(index, "overlay").is_some());
        assert!(page.find_by_id("overlay").is_none());
        assert!(page.remove_body_child(index, "overlay").is_none());
    }
}
