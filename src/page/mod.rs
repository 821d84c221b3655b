// src/page/mod.rs

//! In-memory page tree the engine gates media on.
//!
//! The page is the single piece of page-scoped mutable state: the element
//! tree, the dispatched events and the page-wide open-overlay slot. All
//! mutation happens through short critical sections that never span an
//! `.await`, so callers see the cooperative single-threaded model the
//! engine is written against.

pub mod events;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

pub use events::PageEvent;

use crate::models::SessionId;

/// Class added to an element whose rendered width exceeds the breakpoint.
pub const WIDE_CLASS: &str = "wide";

/// Handle to an element in a [`Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

#[derive(Debug)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    classes: Vec<String>,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
    inner_html: String,
    width: u32,
    height: u32,
    observed: bool,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            classes: Vec::new(),
            children: Vec::new(),
            parent: None,
            inner_html: String::new(),
            width: 0,
            height: 0,
            observed: false,
        }
    }
}

/// The overlay currently occupying the page-wide slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOverlay {
    pub target: ElementId,
    pub overlay: ElementId,
    /// Consent session owning the overlay; `None` for error overlays
    pub session: Option<SessionId>,
}

#[derive(Debug)]
struct Dom {
    nodes: Vec<Node>,
    root: ElementId,
    head: ElementId,
    body: ElementId,
    events: Vec<PageEvent>,
    open_overlay: Option<OpenOverlay>,
}

impl Dom {
    fn node(&self, id: ElementId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: ElementId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, tag: &str) -> ElementId {
        self.nodes.push(Node::new(tag));
        ElementId(self.nodes.len() - 1)
    }

    fn detach(&mut self, id: ElementId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != id);
        }
    }

    fn append(&mut self, parent: ElementId, child: ElementId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    fn is_attached(&self, id: ElementId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn contains(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.node(node).parent;
        }
        false
    }

    /// Depth-first, document-order walk below `from` (excluding `from`).
    fn find_below(&self, from: ElementId, pred: &dyn Fn(&Node) -> bool) -> Option<ElementId> {
        let mut stack: Vec<ElementId> = self.node(from).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if pred(node) {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    fn apply_width(&mut self, id: ElementId, breakpoint: u32) {
        let node = self.node_mut(id);
        if !node.observed {
            return;
        }
        let wide = node.width > breakpoint;
        let has = node.classes.iter().any(|c| c == WIDE_CLASS);
        if wide && !has {
            node.classes.push(WIDE_CLASS.to_string());
        } else if !wide && has {
            node.classes.retain(|c| c != WIDE_CLASS);
        }
    }
}

/// A page: element tree, event log and open-overlay slot.
#[derive(Debug)]
pub struct Page {
    dom: Mutex<Dom>,
    events: broadcast::Sender<PageEvent>,
    breakpoint: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self::new(600)
    }
}

impl Page {
    /// Create an empty page (`html` > `head` + `body`) with the given
    /// width breakpoint for observed elements.
    pub fn new(breakpoint: u32) -> Self {
        let mut dom = Dom {
            nodes: Vec::new(),
            root: ElementId(0),
            head: ElementId(0),
            body: ElementId(0),
            events: Vec::new(),
            open_overlay: None,
        };
        let root = dom.push("html");
        let head = dom.push("head");
        let body = dom.push("body");
        dom.append(root, head);
        dom.append(root, body);
        dom.root = root;
        dom.head = head;
        dom.body = body;

        let (events, _) = broadcast::channel(64);
        Self {
            dom: Mutex::new(dom),
            events,
            breakpoint,
        }
    }

    fn dom(&self) -> MutexGuard<'_, Dom> {
        self.dom.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn head(&self) -> ElementId {
        self.dom().head
    }

    pub fn body(&self) -> ElementId {
        self.dom().body
    }

    pub fn breakpoint(&self) -> u32 {
        self.breakpoint
    }

    // --- Tree ---

    pub fn create_element(&self, tag: &str) -> ElementId {
        self.dom().push(tag)
    }

    /// Append `child` to `parent`, moving it if it is already placed.
    pub fn append_child(&self, parent: ElementId, child: ElementId) {
        self.dom().append(parent, child);
    }

    /// Detach an element (and its subtree) from the page.
    pub fn remove(&self, id: ElementId) {
        let mut dom = self.dom();
        dom.detach(id);
        let stale = dom
            .open_overlay
            .is_some_and(|open| !dom.is_attached(open.overlay));
        if stale {
            dom.open_overlay = None;
        }
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.dom().node(id).parent
    }

    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.dom().node(id).children.clone()
    }

    pub fn is_attached(&self, id: ElementId) -> bool {
        self.dom().is_attached(id)
    }

    /// Whether `id` is `ancestor` or sits below it.
    pub fn contains(&self, ancestor: ElementId, id: ElementId) -> bool {
        self.dom().contains(ancestor, id)
    }

    pub fn tag(&self, id: ElementId) -> String {
        self.dom().node(id).tag.clone()
    }

    // --- Attributes ---

    pub fn attr(&self, id: ElementId, name: &str) -> Option<String> {
        self.dom().node(id).attrs.get(name).cloned()
    }

    pub fn has_attr(&self, id: ElementId, name: &str) -> bool {
        self.dom().node(id).attrs.contains_key(name)
    }

    pub fn set_attr(&self, id: ElementId, name: &str, value: impl Into<String>) {
        self.dom()
            .node_mut(id)
            .attrs
            .insert(name.to_string(), value.into());
    }

    pub fn remove_attr(&self, id: ElementId, name: &str) {
        self.dom().node_mut(id).attrs.remove(name);
    }

    /// Set one declaration in the element's inline `style`.
    pub fn set_style_property(&self, id: ElementId, property: &str, value: &str) {
        let style = self.attr(id, "style").unwrap_or_default();
        let mut declarations: Vec<(String, String)> = parse_style(&style)
            .into_iter()
            .filter(|(name, _)| name != property)
            .collect();
        declarations.push((property.to_string(), value.to_string()));
        let rendered = declarations
            .iter()
            .map(|(name, value)| format!("{name}:{value}"))
            .collect::<Vec<_>>()
            .join("; ");
        self.set_attr(id, "style", rendered);
    }

    /// Read one declaration from the element's inline `style`.
    pub fn style_property(&self, id: ElementId, property: &str) -> Option<String> {
        let style = self.attr(id, "style")?;
        parse_style(&style)
            .into_iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// The element's `id` attribute, ignoring an empty value.
    pub fn element_id(&self, id: ElementId) -> Option<String> {
        self.attr(id, "id").filter(|v| !v.is_empty())
    }

    // --- Classes ---

    pub fn add_class(&self, id: ElementId, class: &str) {
        let mut dom = self.dom();
        let node = dom.node_mut(id);
        if !node.classes.iter().any(|c| c == class) {
            node.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&self, id: ElementId, class: &str) {
        self.dom().node_mut(id).classes.retain(|c| c != class);
    }

    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.dom().node(id).classes.iter().any(|c| c == class)
    }

    pub fn classes(&self, id: ElementId) -> Vec<String> {
        self.dom().node(id).classes.clone()
    }

    // --- Content ---

    pub fn set_inner_html(&self, id: ElementId, html: impl Into<String>) {
        self.dom().node_mut(id).inner_html = html.into();
    }

    pub fn inner_html(&self, id: ElementId) -> String {
        self.dom().node(id).inner_html.clone()
    }

    // --- Queries ---

    /// Find an attached element by its `id` attribute.
    pub fn get_element_by_id(&self, element_id: &str) -> Option<ElementId> {
        let dom = self.dom();
        let root = dom.root;
        dom.find_below(root, &|n| {
            n.attrs.get("id").is_some_and(|v| v == element_id)
        })
    }

    /// First attached element carrying `class`, in document order.
    pub fn query_class(&self, class: &str) -> Option<ElementId> {
        let dom = self.dom();
        let root = dom.root;
        dom.find_below(root, &|n| n.classes.iter().any(|c| c == class))
    }

    /// First attached `tag` element whose `attr` equals `value`.
    pub fn query_attr(&self, tag: &str, attr: &str, value: &str) -> Option<ElementId> {
        let dom = self.dom();
        let root = dom.root;
        dom.find_below(root, &|n| {
            n.tag.eq_ignore_ascii_case(tag) && n.attrs.get(attr).is_some_and(|v| v == value)
        })
    }

    /// First direct child of `parent` carrying `class`.
    pub fn child_with_class(&self, parent: ElementId, class: &str) -> Option<ElementId> {
        let dom = self.dom();
        dom.node(parent)
            .children
            .iter()
            .copied()
            .find(|c| dom.node(*c).classes.iter().any(|cl| cl == class))
    }

    /// First descendant of `parent` carrying `class`.
    pub fn descendant_with_class(&self, parent: ElementId, class: &str) -> Option<ElementId> {
        self.dom()
            .find_below(parent, &|n| n.classes.iter().any(|c| c == class))
    }

    /// Generate an element id, `prefix` followed by the first unused counter.
    pub fn generate_id(&self, prefix: &str) -> String {
        let dom = self.dom();
        let taken = |candidate: &str| {
            dom.nodes
                .iter()
                .any(|n| n.attrs.get("id").is_some_and(|v| v == candidate))
        };
        let mut counter = 0usize;
        loop {
            let candidate = format!("{prefix}{counter}");
            if !taken(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Return the element's id attribute, assigning a generated one if absent.
    pub fn ensure_id(&self, id: ElementId, prefix: &str) -> String {
        if let Some(existing) = self.element_id(id) {
            return existing;
        }
        let generated = self.generate_id(prefix);
        self.set_attr(id, "id", generated.clone());
        generated
    }

    // --- Layout ---

    /// Start toggling the `wide` class on this element as its width changes.
    pub fn observe_width(&self, id: ElementId) {
        let mut dom = self.dom();
        dom.node_mut(id).observed = true;
        dom.apply_width(id, self.breakpoint);
    }

    pub fn set_size(&self, id: ElementId, width: u32, height: u32) {
        let mut dom = self.dom();
        let node = dom.node_mut(id);
        node.width = width;
        node.height = height;
        dom.apply_width(id, self.breakpoint);
    }

    pub fn size(&self, id: ElementId) -> (u32, u32) {
        let dom = self.dom();
        let node = dom.node(id);
        (node.width, node.height)
    }

    // --- Overlay slot ---

    pub fn open_overlay(&self) -> Option<OpenOverlay> {
        self.dom().open_overlay
    }

    /// Attach `overlay` to `target` and record it in the page-wide slot,
    /// evicting whatever occupied the slot before. Returns the evicted entry.
    pub fn attach_overlay(
        &self,
        target: ElementId,
        overlay: ElementId,
        session: Option<SessionId>,
    ) -> Option<OpenOverlay> {
        let mut dom = self.dom();
        let previous = dom.open_overlay.take();
        if let Some(prev) = previous {
            dom.detach(prev.overlay);
        }
        dom.append(target, overlay);
        dom.open_overlay = Some(OpenOverlay {
            target,
            overlay,
            session,
        });
        previous
    }

    // --- Events ---

    /// Record an event and broadcast it to subscribers.
    pub fn dispatch(&self, event: PageEvent) {
        log::debug!("Dispatching {} for {:?}", event.name, event.target_id);
        self.dom().events.push(event.clone());
        let _ = self.events.send(event);
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.dom().events.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.events.subscribe()
    }

    /// Click an element owned by third-party code.
    pub fn click(&self, id: ElementId) {
        let target_id = self.element_id(id);
        self.dispatch(PageEvent::new(events::CLICK, target_id));
    }
}

fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_properties() {
        let page = Page::default();
        let iframe = page.create_element("iframe");
        page.set_attr(iframe, "style", "width:100%; height:100%; position:absolute");
        page.set_style_property(iframe, "display", "none");
        assert_eq!(page.style_property(iframe, "display").as_deref(), Some("none"));
        assert_eq!(page.style_property(iframe, "width").as_deref(), Some("100%"));

        page.set_style_property(iframe, "display", "block");
        assert_eq!(page.style_property(iframe, "display").as_deref(), Some("block"));
        assert_eq!(page.attr(iframe, "style").unwrap().matches("display").count(), 1);
    }

    #[test]
    fn test_tree_and_queries() {
        let page = Page::default();
        let body = page.body();
        let wrapper = page.create_element("div");
        page.set_attr(wrapper, "id", "wrapper");
        page.append_child(body, wrapper);

        let child = page.create_element("span");
        page.add_class(child, "video-placeholder");
        page.append_child(wrapper, child);

        assert_eq!(page.get_element_by_id("wrapper"), Some(wrapper));
        assert_eq!(page.query_class("video-placeholder"), Some(child));
        assert_eq!(page.child_with_class(wrapper, "video-placeholder"), Some(child));
        assert!(page.contains(body, child));

        page.remove(wrapper);
        assert!(!page.is_attached(child));
        assert_eq!(page.get_element_by_id("wrapper"), None);
        assert_eq!(page.query_class("video-placeholder"), None);
    }

    #[test]
    fn test_generate_id_skips_taken() {
        let page = Page::default();
        let a = page.create_element("div");
        page.set_attr(a, "id", "otsk-player-0");
        page.append_child(page.body(), a);

        assert_eq!(page.generate_id("otsk-player-"), "otsk-player-1");
        let b = page.create_element("iframe");
        assert_eq!(page.ensure_id(b, "otsk-player-"), "otsk-player-1");
        assert_eq!(page.ensure_id(a, "otsk-player-"), "otsk-player-0");
    }

    #[test]
    fn test_width_observer_toggles_wide() {
        let page = Page::new(600);
        let modal = page.create_element("div");
        page.set_size(modal, 800, 400);
        assert!(!page.has_class(modal, WIDE_CLASS));

        page.observe_width(modal);
        assert!(page.has_class(modal, WIDE_CLASS));

        page.set_size(modal, 600, 400);
        assert!(!page.has_class(modal, WIDE_CLASS));
    }

    #[test]
    fn test_attach_overlay_evicts_previous() {
        let page = Page::default();
        let body = page.body();
        let first_target = page.create_element("div");
        let second_target = page.create_element("div");
        page.append_child(body, first_target);
        page.append_child(body, second_target);

        let first = page.create_element("div");
        let second = page.create_element("div");
        assert!(page.attach_overlay(first_target, first, None).is_none());

        let evicted = page.attach_overlay(second_target, second, None).unwrap();
        assert_eq!(evicted.overlay, first);
        assert!(!page.is_attached(first));
        assert_eq!(page.open_overlay().unwrap().overlay, second);

        page.remove(second);
        assert!(page.open_overlay().is_none());
    }

    #[test]
    fn test_dispatch_records_and_broadcasts() {
        let page = Page::default();
        let mut rx = page.subscribe();
        page.dispatch(PageEvent::new(events::LOAD_PLAYER, Some("x".into())));

        assert_eq!(page.events().len(), 1);
        assert_eq!(rx.try_recv().unwrap().name, events::LOAD_PLAYER);
    }
}
