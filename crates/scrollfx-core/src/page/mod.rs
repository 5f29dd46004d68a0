//! Host page surface consumed by the coordinator
//!
//! The coordinator never touches a real document. Everything it reads
//! (scroll offset, viewport, element geometry, markup attributes) and
//! everything it writes (classes, inline styles, custom events, the scroll
//! position) goes through the [`Page`] trait.

mod memory;

pub use memory::{ElementSpec, MemoryPage, NodeSnapshot, PageSnapshot, StyleWrite};

use serde::{Deserialize, Serialize};

/// Opaque handle for a page element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u32);

/// Markup conventions the host uses to tag elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Reveal-on-scroll targets (`.animate-on-scroll`, `.fade-in-up`, ...)
    Animated,
    /// Elements carrying a `data-parallax` speed attribute
    Parallax,
    /// Decorative parallax layers (`.parallax-layer`, `.parallax-background`, ...)
    ParallaxLayer,
    /// Looping decorative animation (`.floating-element`)
    Floating,
    /// The fixed page header
    Header,
    /// Hero-section elements with `data-animate`
    Hero,
    /// Anything keyboard-focusable (`a`, `button`, `input`, `[tabindex]`, ...)
    Focusable,
    /// In-page navigation links (`.navmenu a`)
    NavLink,
    /// Back-to-top control
    ScrollTop,
    /// Mount produced by the progress indicator
    ProgressIndicator,
}

/// Host capabilities the animation graph depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Per-frame rendering callback
    pub animation_frames: bool,
    /// `prefers-reduced-motion` media query support
    pub media_queries: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            animation_frames: true,
            media_queries: true,
        }
    }
}

/// Viewport-relative bounding box of an element (vertical axis only)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Read/write access to the host document
pub trait Page {
    /// Current host timestamp in milliseconds
    fn now(&self) -> f64;
    fn scroll_y(&self) -> f64;
    fn viewport_height(&self) -> f64;
    /// Full scrollable height of the document
    fn document_height(&self) -> f64;
    fn capabilities(&self) -> Capabilities;
    /// Current value of the reduced-motion media preference
    fn prefers_reduced_motion(&self) -> bool;
    /// Fragment of the page URL including the `#`, if any
    fn location_hash(&self) -> Option<String>;

    fn body(&self) -> ElementId;
    /// The document root (`<html>`), which carries `scroll-behavior`
    fn root(&self) -> ElementId;

    /// Elements tagged with `role`, in document order
    fn query(&self, role: Role) -> Vec<ElementId>;
    fn contains(&self, element: ElementId) -> bool;
    fn has_role(&self, element: ElementId, role: Role) -> bool;
    fn has_class(&self, element: ElementId, class: &str) -> bool;
    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;
    /// Element whose id matches an in-page fragment (`#pricing` -> `pricing`)
    fn find_by_id(&self, id: &str) -> Option<ElementId>;

    /// Document-relative top edge
    fn offset_top(&self, element: ElementId) -> Option<f64>;
    fn offset_height(&self, element: ElementId) -> Option<f64>;

    fn scroll_to(&mut self, y: f64);
    fn add_class(&mut self, element: ElementId, class: &str);
    fn remove_class(&mut self, element: ElementId, class: &str);
    fn set_style(&mut self, element: ElementId, property: &str, value: &str);
    fn remove_style(&mut self, element: ElementId, property: &str);
    fn style(&self, element: ElementId, property: &str) -> Option<String>;
    /// Create a new element appended to the body
    fn create_element(&mut self, role: Role, class: &str) -> ElementId;
    /// Dispatch a bubbling custom event carrying the element reference
    fn dispatch_custom(&mut self, element: ElementId, name: &str);

    /// Viewport-relative bounding box, derived from document geometry
    fn bounding_rect(&self, element: ElementId) -> Option<Rect> {
        let top = self.offset_top(element)?;
        let height = self.offset_height(element)?;
        Some(Rect {
            top: top - self.scroll_y(),
            height,
        })
    }

    fn toggle_class(&mut self, element: ElementId, class: &str, on: bool) {
        if on {
            self.add_class(element, class);
        } else {
            self.remove_class(element, class);
        }
    }

    /// Resolve an `href` like `#pricing` to its target element
    fn resolve_anchor(&self, href: &str) -> Option<ElementId> {
        let fragment = href.strip_prefix('#')?;
        if fragment.is_empty() {
            return None;
        }
        self.find_by_id(fragment)
    }
}

/// Format a pixel length the way inline styles carry it
pub(crate) fn px(value: f64) -> String {
    // avoid "-0px"
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{}px", value)
}

/// Vertical translation used by the parallax engine
pub(crate) fn translate_y(value: f64) -> String {
    format!("translateY({})", px(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_px_formatting() {
        assert_eq!(px(-100.0), "-100px");
        assert_eq!(px(-0.0), "0px");
        assert_eq!(px(12.5), "12.5px");
        assert_eq!(translate_y(-50.0), "translateY(-50px)");
    }

    #[test]
    fn test_bounding_rect_is_viewport_relative() {
        let mut page = MemoryPage::new(800.0);
        page.set_document_height(4000.0);
        let el = page.insert(ElementSpec::new("card").at(1000.0, 300.0));
        page.set_scroll_y(600.0);

        let rect = page.bounding_rect(el).unwrap();
        assert_eq!(rect.top, 400.0);
        assert_eq!(rect.bottom(), 700.0);
    }

    #[test]
    fn test_resolve_anchor() {
        let mut page = MemoryPage::new(800.0);
        let el = page.insert(ElementSpec::new("pricing").at(2000.0, 500.0));

        assert_eq!(page.resolve_anchor("#pricing"), Some(el));
        assert_eq!(page.resolve_anchor("#missing"), None);
        assert_eq!(page.resolve_anchor("#"), None);
        assert_eq!(page.resolve_anchor("pricing"), None);
    }
}
