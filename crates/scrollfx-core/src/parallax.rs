//! Scroll-linked parallax offsets
//!
//! The offset for an element is a pure function of the scroll position and
//! the element's cached geometry, so replaying a position always produces
//! the same transform. Geometry is cached at registration and refreshed on
//! every resize.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::events::{EventBus, EventKind, Subscription};
use crate::page::{translate_y, ElementId, Page, Role};

/// Attribute carrying the speed factor
pub const SPEED_ATTRIBUTE: &str = "data-parallax";

/// Typed registration record for a parallax element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParallaxElement {
    pub element: ElementId,
    pub speed_factor: f64,
    pub base_offset_top: f64,
    pub height: f64,
}

impl ParallaxElement {
    pub fn new(element: ElementId, speed_factor: f64, base_offset_top: f64, height: f64) -> Self {
        Self {
            element,
            speed_factor,
            base_offset_top,
            height,
        }
    }

    /// Build a record from markup and current geometry
    ///
    /// Missing, unparseable or zero speeds use `default_speed`; non-finite
    /// speeds are rejected.
    pub fn from_page(page: &dyn Page, element: ElementId, default_speed: f64) -> Result<Self> {
        let speed_factor = match page.attribute(element, SPEED_ATTRIBUTE) {
            Some(raw) => parse_speed(&raw, default_speed)?,
            None => default_speed,
        };
        let (base_offset_top, height) = geometry(page, element)
            .ok_or_else(|| Error::MissingTarget(format!("parallax element {:?}", element)))?;
        Ok(Self::new(element, speed_factor, base_offset_top, height))
    }

    /// Offset for a scroll position, or `None` when out of range
    pub fn offset_at(&self, scroll_y: f64, viewport_height: f64) -> Option<f64> {
        parallax_offset(
            scroll_y,
            self.base_offset_top,
            self.height,
            self.speed_factor,
            viewport_height,
        )
    }
}

fn parse_speed(raw: &str, default_speed: f64) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(speed) if !speed.is_finite() => Err(Error::Configuration(format!(
            "{} must be a finite number, got '{}'",
            SPEED_ATTRIBUTE, raw
        ))),
        Ok(speed) if speed == 0.0 => Ok(default_speed),
        Ok(speed) => Ok(speed),
        Err(_) => {
            if !raw.trim().is_empty() {
                warn!("Unparseable {}='{}', using {}", SPEED_ATTRIBUTE, raw, default_speed);
            }
            Ok(default_speed)
        }
    }
}

fn geometry(page: &dyn Page, element: ElementId) -> Option<(f64, f64)> {
    Some((page.offset_top(element)?, page.offset_height(element)?))
}

/// Vertical parallax offset
///
/// Visible while `scroll_y` is past `top - viewport_height` and before
/// `top + height`; the offset is `-(scroll_y - top) * speed`.
pub fn parallax_offset(
    scroll_y: f64,
    base_offset_top: f64,
    height: f64,
    speed_factor: f64,
    viewport_height: f64,
) -> Option<f64> {
    let visible = scroll_y > base_offset_top - viewport_height && scroll_y < base_offset_top + height;
    visible.then(|| -(scroll_y - base_offset_top) * speed_factor)
}

/// Parallax driver for a set of elements
#[derive(Debug)]
pub struct ParallaxEngine {
    elements: Vec<ParallaxElement>,
    default_speed: f64,
}

impl ParallaxEngine {
    pub fn new(settings: &Settings) -> Self {
        Self {
            elements: Vec::new(),
            default_speed: settings.default_speed,
        }
    }

    pub fn register(&mut self, elements: impl IntoIterator<Item = ParallaxElement>) -> Result<usize> {
        let batch: Vec<ParallaxElement> = elements.into_iter().collect();
        if let Some(bad) = batch.iter().find(|e| !e.speed_factor.is_finite()) {
            return Err(Error::Configuration(format!(
                "speed factor for {:?} must be finite",
                bad.element
            )));
        }
        let mut added = 0;
        for record in batch {
            if let Some(existing) = self.elements.iter_mut().find(|e| e.element == record.element) {
                *existing = record;
            } else {
                self.elements.push(record);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Register every `Role::Parallax` element on the page
    pub fn register_from_page(&mut self, page: &dyn Page) -> Result<usize> {
        let records = page
            .query(Role::Parallax)
            .into_iter()
            .map(|element| ParallaxElement::from_page(page, element, self.default_speed))
            .collect::<Result<Vec<_>>>()?;
        self.register(records)
    }

    pub fn elements(&self) -> &[ParallaxElement] {
        &self.elements
    }

    pub fn get(&self, element: ElementId) -> Option<&ParallaxElement> {
        self.elements.iter().find(|e| e.element == element)
    }

    /// Re-read cached geometry after a layout change
    pub fn refresh_geometry(&mut self, page: &dyn Page) {
        self.elements.retain_mut(|record| match geometry(page, record.element) {
            Some((top, height)) => {
                record.base_offset_top = top;
                record.height = height;
                true
            }
            None => false,
        });
        debug!(elements = self.elements.len(), "Parallax geometry refreshed");
    }

    /// Write offsets for every element in range of `scroll_y`
    ///
    /// Returns the number of transforms written.
    pub fn tick(&mut self, scroll_y: f64, page: &mut dyn Page) -> usize {
        let viewport_height = page.viewport_height();
        let mut writes = 0;
        for record in &self.elements {
            if let Some(offset) = record.offset_at(scroll_y, viewport_height) {
                page.set_style(record.element, "transform", &translate_y(offset));
                writes += 1;
            }
        }
        writes
    }

    pub fn install(this: &Rc<RefCell<Self>>, bus: &EventBus) -> Vec<Subscription> {
        let engine = Rc::downgrade(this);
        vec![bus.listen(EventKind::Scroll, move |_, page| {
            if let Some(engine) = engine.upgrade() {
                let scroll_y = page.scroll_y();
                engine.borrow_mut().tick(scroll_y, page);
            }
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::page::{ElementSpec, MemoryPage};

    fn engine() -> ParallaxEngine {
        ParallaxEngine::new(&CoordinatorConfig::default().validate().unwrap())
    }

    fn page() -> MemoryPage {
        let mut page = MemoryPage::new(800.0);
        page.set_document_height(6000.0);
        page
    }

    #[test]
    fn test_offset_is_deterministic() {
        let mut page = page();
        let el = page.insert(ElementSpec::new("bg").role(Role::Parallax).at(1000.0, 400.0));
        let mut engine = engine();
        engine.register_from_page(&page).unwrap();

        engine.tick(1000.0, &mut page);
        let first = page.style(el, "transform");
        engine.tick(1000.0, &mut page);
        assert_eq!(page.style(el, "transform"), first);
        assert_eq!(first.as_deref(), Some("translateY(0px)"));

        engine.tick(1200.0, &mut page);
        assert_eq!(page.style(el, "transform").as_deref(), Some("translateY(-100px)"));
    }

    #[test]
    fn test_pure_offset_function() {
        assert_eq!(parallax_offset(1200.0, 1000.0, 400.0, 0.5, 800.0), Some(-100.0));
        assert_eq!(parallax_offset(1000.0, 1000.0, 400.0, 0.5, 800.0), Some(-0.0));
        // above the range
        assert_eq!(parallax_offset(200.0, 1000.0, 400.0, 0.5, 800.0), None);
        // below the range
        assert_eq!(parallax_offset(1400.0, 1000.0, 400.0, 0.5, 800.0), None);
        // entering from the bottom of the viewport moves the other way
        assert_eq!(parallax_offset(600.0, 1000.0, 400.0, 0.5, 800.0), Some(200.0));
    }

    #[test]
    fn test_no_write_out_of_range() {
        let mut page = page();
        let el = page.insert(ElementSpec::new("bg").role(Role::Parallax).at(3000.0, 400.0));
        let mut engine = engine();
        engine.register_from_page(&page).unwrap();

        assert_eq!(engine.tick(0.0, &mut page), 0);
        assert!(page.style(el, "transform").is_none());
        assert!(page.style_writes().is_empty());
    }

    #[test]
    fn test_speed_attribute_parsing() {
        let mut page = page();
        let fast = page.insert(ElementSpec::new("fast").role(Role::Parallax).attr(SPEED_ATTRIBUTE, "1.5"));
        let junk = page.insert(ElementSpec::new("junk").role(Role::Parallax).attr(SPEED_ATTRIBUTE, "quick"));
        let zero = page.insert(ElementSpec::new("zero").role(Role::Parallax).attr(SPEED_ATTRIBUTE, "0"));
        let bare = page.insert(ElementSpec::new("bare").role(Role::Parallax));
        let mut engine = engine();
        engine.register_from_page(&page).unwrap();

        assert_eq!(engine.get(fast).unwrap().speed_factor, 1.5);
        assert_eq!(engine.get(junk).unwrap().speed_factor, 0.5);
        assert_eq!(engine.get(zero).unwrap().speed_factor, 0.5);
        assert_eq!(engine.get(bare).unwrap().speed_factor, 0.5);
    }

    #[test]
    fn test_non_finite_speed_rejected() {
        let mut page = page();
        page.insert(ElementSpec::new("inf").role(Role::Parallax).attr(SPEED_ATTRIBUTE, "inf"));
        let mut engine = engine();
        let err = engine.register_from_page(&page).unwrap_err();
        assert!(err.is_configuration());
        assert!(engine.elements().is_empty());
    }

    #[test]
    fn test_refresh_geometry_after_layout_change() {
        let mut page = page();
        let el = page.insert(ElementSpec::new("bg").role(Role::Parallax).at(1000.0, 400.0));
        let mut engine = engine();
        engine.register_from_page(&page).unwrap();

        page.set_geometry(el, 2000.0, 400.0);
        engine.refresh_geometry(&page);
        assert_eq!(engine.get(el).unwrap().base_offset_top, 2000.0);

        engine.tick(2200.0, &mut page);
        assert_eq!(page.style(el, "transform").as_deref(), Some("translateY(-100px)"));
    }

    #[test]
    fn test_refresh_drops_detached_elements() {
        let mut page = page();
        let el = page.insert(ElementSpec::new("bg").role(Role::Parallax).at(1000.0, 400.0));
        let mut engine = engine();
        engine.register_from_page(&page).unwrap();

        page.remove(el);
        engine.refresh_geometry(&page);
        assert!(engine.elements().is_empty());
    }
}
