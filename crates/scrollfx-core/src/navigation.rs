//! Scroll-spy for in-page navigation, the back-to-top control and the
//! load-time correction for URLs carrying a fragment

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::config::Settings;
use crate::events::{EventBus, EventKind, Subscription};
use crate::page::{ElementId, Page, Role};

pub const ACTIVE_CLASS: &str = "active";
/// Wait between page load and the fragment correction
pub const HASH_CORRECTION_DELAY_MS: f64 = 100.0;

/// Index of the section containing `position`, last match wins
///
/// Sections are `(top, height)` pairs; both edges are inclusive, so on a
/// shared edge the later section is active.
pub fn active_section(position: f64, sections: &[(f64, f64)]) -> Option<usize> {
    sections
        .iter()
        .rposition(|(top, height)| position >= *top && position <= top + height)
}

/// Highlights the navigation link whose section holds the scroll position
#[derive(Debug)]
pub struct ScrollSpy {
    spy_offset: f64,
    active: Option<ElementId>,
}

impl ScrollSpy {
    pub fn new(settings: &Settings) -> Self {
        Self {
            spy_offset: settings.spy_offset,
            active: None,
        }
    }

    pub fn active(&self) -> Option<ElementId> {
        self.active
    }

    /// Links with a resolvable `#fragment`, paired with their section geometry
    fn linked_sections(page: &dyn Page) -> Vec<(ElementId, (f64, f64))> {
        page.query(Role::NavLink)
            .into_iter()
            .filter_map(|link| {
                let section = page.resolve_anchor(&page.attribute(link, "href")?)?;
                Some((link, (page.offset_top(section)?, page.offset_height(section)?)))
            })
            .collect()
    }

    pub fn update(&mut self, page: &mut dyn Page) -> Option<ElementId> {
        let links = Self::linked_sections(page);
        let geometry: Vec<(f64, f64)> = links.iter().map(|(_, g)| *g).collect();
        let active = active_section(page.scroll_y() + self.spy_offset, &geometry).map(|i| links[i].0);

        for (link, _) in &links {
            page.toggle_class(*link, ACTIVE_CLASS, Some(*link) == active);
        }
        if active != self.active {
            debug!(?active, "Active navigation link changed");
            self.active = active;
        }
        active
    }

    pub fn install(this: &Rc<RefCell<Self>>, bus: &EventBus) -> Vec<Subscription> {
        [EventKind::Load, EventKind::Scroll]
            .into_iter()
            .map(|kind| {
                let spy = Rc::downgrade(this);
                bus.listen(kind, move |_, page| {
                    if let Some(spy) = spy.upgrade() {
                        spy.borrow_mut().update(page);
                    }
                })
            })
            .collect()
    }
}

/// Shows the back-to-top control once the page is scrolled past a threshold
///
/// Clicks on the control are handled by the smooth scroller.
#[derive(Debug)]
pub struct BackToTop {
    threshold: f64,
}

impl BackToTop {
    pub fn new(settings: &Settings) -> Self {
        Self {
            threshold: settings.back_to_top_threshold,
        }
    }

    /// Whether any back-to-top control currently carries the active class
    pub fn is_shown(&self, page: &dyn Page) -> bool {
        page.query(Role::ScrollTop)
            .into_iter()
            .any(|control| page.has_class(control, ACTIVE_CLASS))
    }

    pub fn update(&self, page: &mut dyn Page) -> bool {
        let visible = page.scroll_y() > self.threshold;
        for control in page.query(Role::ScrollTop) {
            page.toggle_class(control, ACTIVE_CLASS, visible);
        }
        visible
    }

    pub fn install(this: &Rc<RefCell<Self>>, bus: &EventBus) -> Vec<Subscription> {
        [EventKind::Load, EventKind::Scroll]
            .into_iter()
            .map(|kind| {
                let control = Rc::downgrade(this);
                bus.listen(kind, move |_, page| {
                    if let Some(control) = control.upgrade() {
                        control.borrow().update(page);
                    }
                })
            })
            .collect()
    }
}

/// Scrolls to the section named by the URL fragment shortly after load
///
/// The section's `scroll-margin-top` is honoured. Who performs the scroll
/// (smooth or instant) is up to the caller.
#[derive(Debug, Default)]
pub struct HashCorrection {
    due: Option<(f64, f64)>,
}

impl HashCorrection {
    /// Offset the fragment's section should end up at, if it exists
    pub fn target(page: &dyn Page) -> Option<f64> {
        let hash = page.location_hash()?;
        let section = page.resolve_anchor(&hash)?;
        let top = page.offset_top(section)?;
        let margin = page
            .style(section, "scroll-margin-top")
            .and_then(|value| parse_px(&value))
            .unwrap_or(0.0);
        Some(top - margin)
    }

    /// Schedule the correction; returns the target when there is one
    pub fn on_load(&mut self, page: &dyn Page) -> Option<f64> {
        let target = Self::target(page)?;
        debug!(target, "Fragment correction scheduled");
        self.due = Some((page.now() + HASH_CORRECTION_DELAY_MS, target));
        Some(target)
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// The target once the delay has elapsed; fires at most once per load
    pub fn take_due(&mut self, now: f64) -> Option<f64> {
        match self.due {
            Some((at, target)) if at <= now => {
                self.due = None;
                Some(target)
            }
            _ => None,
        }
    }

    /// Skip the delay (static presentation has no frames to wait for)
    pub fn take_now(&mut self) -> Option<f64> {
        self.due.take().map(|(_, target)| target)
    }
}

/// Leading number of a CSS length such as `80px`
fn parse_px(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::page::{ElementSpec, MemoryPage};

    fn settings() -> Settings {
        CoordinatorConfig::default().validate().unwrap()
    }

    fn landing_page() -> (MemoryPage, ElementId, ElementId, ElementId) {
        let mut page = MemoryPage::new(800.0);
        page.set_document_height(4000.0);
        page.insert(ElementSpec::new("hero").at(0.0, 700.0));
        page.insert(ElementSpec::new("about").at(700.0, 900.0));
        page.insert(ElementSpec::new("pricing").at(1600.0, 800.0));
        let hero = page.insert(ElementSpec::new("nav-hero").role(Role::NavLink).attr("href", "#hero"));
        let about = page.insert(ElementSpec::new("nav-about").role(Role::NavLink).attr("href", "#about"));
        let pricing = page.insert(
            ElementSpec::new("nav-pricing")
                .role(Role::NavLink)
                .attr("href", "#pricing"),
        );
        page.insert(ElementSpec::new("nav-blog").role(Role::NavLink).attr("href", "/blog"));
        (page, hero, about, pricing)
    }

    #[test]
    fn test_active_section_inclusive_edges() {
        let sections = [(0.0, 700.0), (700.0, 900.0)];
        assert_eq!(active_section(200.0, &sections), Some(0));
        // the shared edge belongs to the later section
        assert_eq!(active_section(700.0, &sections), Some(1));
        assert_eq!(active_section(699.0, &sections), Some(0));
        assert_eq!(active_section(5000.0, &sections), None);
    }

    #[test]
    fn test_scroll_spy_marks_one_link() {
        let (mut page, hero, about, pricing) = landing_page();
        let mut spy = ScrollSpy::new(&settings());

        assert_eq!(spy.update(&mut page), Some(hero));
        assert!(page.has_class(hero, ACTIVE_CLASS));

        // 1500 + 200 lands in pricing
        page.set_scroll_y(1500.0);
        assert_eq!(spy.update(&mut page), Some(pricing));
        assert!(!page.has_class(hero, ACTIVE_CLASS));
        assert!(!page.has_class(about, ACTIVE_CLASS));
        assert!(page.has_class(pricing, ACTIVE_CLASS));
    }

    #[test]
    fn test_scroll_spy_clears_past_last_section() {
        let (mut page, _, _, pricing) = landing_page();
        let mut spy = ScrollSpy::new(&settings());
        page.set_scroll_y(1500.0);
        spy.update(&mut page);

        page.set_scroll_y(3000.0);
        assert_eq!(spy.update(&mut page), None);
        assert!(!page.has_class(pricing, ACTIVE_CLASS));
    }

    #[test]
    fn test_hash_correction_honours_scroll_margin() {
        let (mut page, ..) = landing_page();
        let pricing = page.element("pricing").unwrap();
        page.set_style(pricing, "scroll-margin-top", "80px");
        page.set_location_hash(Some("#pricing"));

        let mut correction = HashCorrection::default();
        assert_eq!(correction.on_load(&page), Some(1520.0));
        assert_eq!(correction.take_due(50.0), None);
        assert_eq!(correction.take_due(100.0), Some(1520.0));
        assert_eq!(correction.take_due(200.0), None);
    }

    #[test]
    fn test_hash_correction_ignores_unknown_fragment() {
        let (mut page, ..) = landing_page();
        let mut correction = HashCorrection::default();
        assert_eq!(correction.on_load(&page), None);

        page.set_location_hash(Some("#missing"));
        assert_eq!(correction.on_load(&page), None);
        assert!(!correction.is_pending());
    }

    #[test]
    fn test_back_to_top_threshold() {
        let mut page = MemoryPage::new(800.0);
        page.set_document_height(3000.0);
        let control = page.insert(ElementSpec::new("top").role(Role::ScrollTop));
        let back = BackToTop::new(&settings());

        page.set_scroll_y(100.0);
        assert!(!back.update(&mut page));
        assert!(!page.has_class(control, ACTIVE_CLASS));

        page.set_scroll_y(101.0);
        assert!(back.update(&mut page));
        assert!(page.has_class(control, ACTIVE_CLASS));
    }
}
