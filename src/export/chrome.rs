//! Scoped page mutations made for the duration of an export.
//!
//! Both guards undo their change on drop, so the page is restored on every
//! exit path, including early returns through `?`.

use crate::model::{Color, Display, Node, NodePath, Page, Style};
use std::ops::{Deref, DerefMut};

/// Id of the blocking overlay node.
pub const OVERLAY_ID: &str = "export-overlay";

/// Blocking overlay appended to the page body while an export runs.
pub struct OverlayGuard<'a> {
    page: &'a mut Page,
    index: usize,
}

impl<'a> OverlayGuard<'a> {
    /// Append the overlay. It carries `no_export_class` so it never appears
    /// in captured output.
    pub fn show(page: &'a mut Page, message: &str, no_export_class: &str) -> Self {
        let overlay = Node::block()
            .with_id(OVERLAY_ID)
            .with_class(no_export_class)
            .with_style(Style {
                background: Some(Color::rgb(0, 0, 0)),
                color: Some(Color::WHITE),
                ..Default::default()
            })
            .with_child(Node::heading(message));
        let index = page.append_to_body(overlay);
        log::debug!("overlay shown");
        Self { page, index }
    }
}

impl Deref for OverlayGuard<'_> {
    type Target = Page;

    fn deref(&self) -> &Page {
        self.page
    }
}

impl DerefMut for OverlayGuard<'_> {
    fn deref_mut(&mut self) -> &mut Page {
        self.page
    }
}

impl Drop for OverlayGuard<'_> {
    fn drop(&mut self) {
        match self.page.remove_body_child(self.index, OVERLAY_ID) {
            Some(_) => log::debug!("overlay removed"),
            None => log::warn!("overlay not found at body index {}", self.index),
        }
    }
}

/// Every no-export node on the page hidden, with prior display values kept
/// for restoration.
pub struct HiddenChrome<'a> {
    page: &'a mut Page,
    saved: Vec<(NodePath, Option<Display>)>,
}

impl<'a> HiddenChrome<'a> {
    /// Hide every node carrying `class` anywhere on the page. The export
    /// overlay is left visible.
    pub fn hide(page: &'a mut Page, class: &str) -> Self {
        let paths: Vec<NodePath> = page
            .paths_with_class(class)
            .into_iter()
            .filter(|path| {
                page.node_at(path)
                    .is_some_and(|n| n.id.as_deref() != Some(OVERLAY_ID))
            })
            .collect();

        let mut saved = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(previous) = page.set_display(&path, Some(Display::None)) {
                saved.push((path, previous));
            }
        }
        log::debug!("hid {} no-export nodes", saved.len());
        Self { page, saved }
    }

    /// Number of hidden nodes.
    pub fn hidden_count(&self) -> usize {
        self.saved.len()
    }
}

impl Deref for HiddenChrome<'_> {
    type Target = Page;

    fn deref(&self) -> &Page {
        self.page
    }
}

impl Drop for HiddenChrome<'_> {
    fn drop(&mut self) {
        for (path, previous) in self.saved.drain(..).rev() {
            self.page.set_display(&path, previous);
        }
    }
}

/// Run `f` with the page's no-export chrome hidden, restoring it afterwards.
pub fn with_hidden_chrome<T>(page: &mut Page, class: &str, f: impl FnOnce(&Page) -> T) -> T {
    let guard = HiddenChrome::hide(page, class);
    f(&guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Page {
        Page::new(
            Node::block()
                .with_child(
                    Node::block()
                        .with_id("nav")
                        .with_class("no-print")
                        .with_style(Style {
                            display: Some(Display::Flex),
                            ..Default::default()
                        }),
                )
                .with_child(
                    Node::block()
                        .with_id("report")
                        .with_child(Node::text("Fecha: 2024-05-01"))
                        .with_child(Node::text("Guardar").with_id("save").with_class("no-print")),
                ),
        )
    }

    #[test]
    fn test_overlay_added_and_removed() {
        let mut page = page();
        {
            let guard = OverlayGuard::show(&mut page, "Generando PDF...", "no-print");
            let overlay = guard.find_by_id(OVERLAY_ID).unwrap();
            assert!(overlay.has_class("no-print"));
        }
        assert!(page.find_by_id(OVERLAY_ID).is_none());
        assert_eq!(page.body.children.len(), 2);
    }

    #[test]
    fn test_overlay_keeps_existing_node_with_same_id() {
        let mut page = page();
        page.append_to_body(Node::text("Aviso").with_id(OVERLAY_ID));
        let before = page.clone();
        {
            let guard = OverlayGuard::show(&mut page, "Generando PDF...", "no-print");
            assert_eq!(guard.body.children.len(), 4);
        }
        assert_eq!(page, before);
    }

    #[test]
    fn test_hidden_chrome_restores_display() {
        let mut page = page();
        let original = page.clone();
        {
            let guard = HiddenChrome::hide(&mut page, "no-print");
            assert_eq!(guard.hidden_count(), 2);
            assert!(guard.find_by_id("nav").unwrap().is_hidden());
            assert!(guard.find_by_id("save").unwrap().is_hidden());
        }
        assert_eq!(page, original);
        assert_eq!(
            page.find_by_id("nav").unwrap().style.display,
            Some(Display::Flex)
        );
    }

    #[test]
    fn test_overlay_stays_visible() {
        let mut page = page();
        let mut overlay = OverlayGuard::show(&mut page, "...", "no-print");
        let hidden = HiddenChrome::hide(&mut overlay, "no-print");
        assert_eq!(hidden.hidden_count(), 2);
        assert!(!hidden.find_by_id(OVERLAY_ID).unwrap().is_hidden());
    }

    #[test]
    fn test_with_hidden_chrome() {
        let mut page = page();
        let seen = with_hidden_chrome(&mut page, "no-print", |p| {
            p.find_by_id("save").unwrap().is_hidden()
        });
        assert!(seen);
        assert!(!page.find_by_id("save").unwrap().is_hidden());
    }
}
