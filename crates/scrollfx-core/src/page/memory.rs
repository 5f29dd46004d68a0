use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Capabilities, ElementId, Page, Role};

/// Declarative description of an element to insert into a [`MemoryPage`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementSpec {
    /// Element id (the `#fragment` anchors resolve against)
    pub id: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub height: f64,
}

impl ElementSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn at(mut self, top: f64, height: f64) -> Self {
        self.top = top;
        self.height = height;
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    id: String,
    roles: BTreeSet<Role>,
    classes: BTreeSet<String>,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    top: f64,
    height: f64,
    events: Vec<String>,
}

impl Node {
    fn from_spec(spec: ElementSpec) -> Self {
        Self {
            id: spec.id,
            roles: spec.roles.into_iter().collect(),
            classes: spec.classes.into_iter().collect(),
            attributes: spec.attributes,
            styles: BTreeMap::new(),
            top: spec.top,
            height: spec.height,
            events: Vec::new(),
        }
    }
}

/// One inline-style mutation recorded by a [`MemoryPage`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleWrite {
    pub element: ElementId,
    pub property: String,
    /// `None` when the property was removed
    pub value: Option<String>,
}

/// In-memory document used as the host page in tests and scene replays
///
/// Geometry is static unless the host changes it; scroll writes are clamped
/// to the scrollable range the way a browser clamps `window.scrollTo`.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    nodes: BTreeMap<ElementId, Node>,
    next_id: u32,
    root: ElementId,
    body: ElementId,
    scroll_y: f64,
    viewport_height: f64,
    document_height: Option<f64>,
    now: f64,
    reduced_motion: bool,
    location_hash: Option<String>,
    capabilities: Capabilities,
    style_writes: Vec<StyleWrite>,
    scroll_writes: Vec<f64>,
}

impl MemoryPage {
    pub fn new(viewport_height: f64) -> Self {
        let mut page = Self {
            nodes: BTreeMap::new(),
            next_id: 0,
            root: ElementId(0),
            body: ElementId(0),
            scroll_y: 0.0,
            viewport_height,
            document_height: None,
            now: 0.0,
            reduced_motion: false,
            location_hash: None,
            capabilities: Capabilities::default(),
            style_writes: Vec::new(),
            scroll_writes: Vec::new(),
        };
        page.root = page.insert(ElementSpec::new("html"));
        page.body = page.insert(ElementSpec::new("body"));
        page
    }

    pub fn insert(&mut self, spec: ElementSpec) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::from_spec(spec));
        id
    }

    /// Detach an element from the document
    pub fn remove(&mut self, element: ElementId) -> bool {
        self.nodes.remove(&element).is_some()
    }

    /// Host-side scroll (user input); not recorded as a coordinator write
    pub fn set_scroll_y(&mut self, y: f64) {
        self.scroll_y = self.clamp_scroll(y);
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = height.max(0.0);
        self.scroll_y = self.clamp_scroll(self.scroll_y);
    }

    pub fn set_document_height(&mut self, height: f64) {
        self.document_height = Some(height);
    }

    pub fn set_geometry(&mut self, element: ElementId, top: f64, height: f64) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.top = top;
            node.height = height;
        }
    }

    pub fn set_now(&mut self, now: f64) {
        self.now = now;
    }

    pub fn advance(&mut self, ms: f64) -> f64 {
        self.now += ms;
        self.now
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.reduced_motion = reduced;
    }

    pub fn set_location_hash(&mut self, hash: Option<&str>) {
        self.location_hash = hash.map(str::to_string);
    }

    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
    }

    /// Look up an element by its id string
    pub fn element(&self, id: &str) -> Option<ElementId> {
        self.find_by_id(id)
    }

    pub fn element_name(&self, element: ElementId) -> Option<&str> {
        self.nodes.get(&element).map(|node| node.id.as_str())
    }

    pub fn classes(&self, element: ElementId) -> Vec<String> {
        self.nodes
            .get(&element)
            .map(|node| node.classes.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Custom events dispatched on an element, oldest first
    pub fn events(&self, element: ElementId) -> &[String] {
        self.nodes
            .get(&element)
            .map(|node| node.events.as_slice())
            .unwrap_or(&[])
    }

    pub fn style_writes(&self) -> &[StyleWrite] {
        &self.style_writes
    }

    pub fn take_style_writes(&mut self) -> Vec<StyleWrite> {
        std::mem::take(&mut self.style_writes)
    }

    /// Every coordinator-issued scroll position, in order
    pub fn scroll_writes(&self) -> &[f64] {
        &self.scroll_writes
    }

    pub fn take_scroll_writes(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.scroll_writes)
    }

    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            now: self.now,
            scroll_y: self.scroll_y,
            viewport_height: self.viewport_height,
            document_height: self.document_height(),
            elements: self
                .nodes
                .values()
                .map(|node| NodeSnapshot {
                    id: node.id.clone(),
                    classes: node.classes.iter().cloned().collect(),
                    styles: node.styles.clone(),
                    events: node.events.clone(),
                })
                .collect(),
        }
    }

    fn max_scroll(&self) -> f64 {
        (self.document_height() - self.viewport_height).max(0.0)
    }

    fn clamp_scroll(&self, y: f64) -> f64 {
        y.clamp(0.0, self.max_scroll())
    }
}

impl Page for MemoryPage {
    fn now(&self) -> f64 {
        self.now
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn document_height(&self) -> f64 {
        if let Some(height) = self.document_height {
            return height.max(self.viewport_height);
        }
        self.nodes
            .values()
            .map(|node| node.top + node.height)
            .fold(self.viewport_height, f64::max)
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    fn location_hash(&self) -> Option<String> {
        self.location_hash.clone()
    }

    fn body(&self) -> ElementId {
        self.body
    }

    fn root(&self) -> ElementId {
        self.root
    }

    fn query(&self, role: Role) -> Vec<ElementId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.roles.contains(&role))
            .map(|(id, _)| *id)
            .collect()
    }

    fn contains(&self, element: ElementId) -> bool {
        self.nodes.contains_key(&element)
    }

    fn has_role(&self, element: ElementId, role: Role) -> bool {
        self.nodes
            .get(&element)
            .is_some_and(|node| node.roles.contains(&role))
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.nodes
            .get(&element)
            .is_some_and(|node| node.classes.contains(class))
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.nodes.get(&element)?.attributes.get(name).cloned()
    }

    fn find_by_id(&self, id: &str) -> Option<ElementId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.id == id)
            .map(|(element, _)| *element)
    }

    fn offset_top(&self, element: ElementId) -> Option<f64> {
        self.nodes.get(&element).map(|node| node.top)
    }

    fn offset_height(&self, element: ElementId) -> Option<f64> {
        self.nodes.get(&element).map(|node| node.height)
    }

    fn scroll_to(&mut self, y: f64) {
        self.scroll_y = self.clamp_scroll(y);
        self.scroll_writes.push(self.scroll_y);
    }

    fn add_class(&mut self, element: ElementId, class: &str) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.classes.insert(class.to_string());
        }
    }

    fn remove_class(&mut self, element: ElementId, class: &str) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.classes.remove(class);
        }
    }

    fn set_style(&mut self, element: ElementId, property: &str, value: &str) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.styles.insert(property.to_string(), value.to_string());
            self.style_writes.push(StyleWrite {
                element,
                property: property.to_string(),
                value: Some(value.to_string()),
            });
        }
    }

    fn remove_style(&mut self, element: ElementId, property: &str) {
        if let Some(node) = self.nodes.get_mut(&element) {
            if node.styles.remove(property).is_some() {
                self.style_writes.push(StyleWrite {
                    element,
                    property: property.to_string(),
                    value: None,
                });
            }
        }
    }

    fn style(&self, element: ElementId, property: &str) -> Option<String> {
        self.nodes.get(&element)?.styles.get(property).cloned()
    }

    fn create_element(&mut self, role: Role, class: &str) -> ElementId {
        self.insert(ElementSpec::new(class).role(role).class(class))
    }

    fn dispatch_custom(&mut self, element: ElementId, name: &str) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.events.push(name.to_string());
        }
    }
}

/// Serializable view of a page's presentational state
#[derive(Debug, Clone, Serialize)]
pub struct PageSnapshot {
    pub now: f64,
    pub scroll_y: f64,
    pub viewport_height: f64,
    pub document_height: f64,
    pub elements: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: String,
    pub classes: Vec<String>,
    pub styles: BTreeMap<String, String>,
    pub events: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_height_from_content() {
        let mut page = MemoryPage::new(800.0);
        assert_eq!(page.document_height(), 800.0);

        page.insert(ElementSpec::new("footer").at(3600.0, 400.0));
        assert_eq!(page.document_height(), 4000.0);

        page.set_document_height(5000.0);
        assert_eq!(page.document_height(), 5000.0);
    }

    #[test]
    fn test_scroll_writes_are_clamped_and_recorded() {
        let mut page = MemoryPage::new(800.0);
        page.set_document_height(2000.0);

        page.scroll_to(5000.0);
        page.scroll_to(-10.0);
        assert_eq!(page.scroll_writes(), &[1200.0, 0.0]);

        page.set_scroll_y(300.0);
        assert_eq!(page.scroll_writes().len(), 2);
    }

    #[test]
    fn test_query_by_role_in_document_order() {
        let mut page = MemoryPage::new(800.0);
        let a = page.insert(ElementSpec::new("a").role(Role::Parallax));
        page.insert(ElementSpec::new("b").role(Role::Header));
        let c = page.insert(ElementSpec::new("c").role(Role::Parallax));

        assert_eq!(page.query(Role::Parallax), vec![a, c]);
    }

    #[test]
    fn test_removed_element_is_gone() {
        let mut page = MemoryPage::new(800.0);
        let el = page.insert(ElementSpec::new("gone").at(10.0, 10.0));
        assert!(page.remove(el));
        assert!(!page.contains(el));
        assert_eq!(page.offset_top(el), None);
    }
}
