//! Scroll progress bar

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::events::{EventBus, EventKind, Subscription};
use crate::page::{ElementId, Page, Role};

pub const PROGRESS_CLASS: &str = "scroll-progress";

/// Inline styles applied to a freshly created bar
const MOUNT_STYLES: [(&str, &str); 7] = [
    ("position", "fixed"),
    ("top", "0"),
    ("left", "0"),
    ("width", "0%"),
    ("height", "3px"),
    ("z-index", "9999"),
    ("transition", "width 0.1s ease"),
];

/// Percentage of the scrollable range covered by `scroll_y`
///
/// 0 when the document is not taller than the viewport. Clamped to 0..=100.
pub fn scroll_fraction(scroll_y: f64, document_height: f64, viewport_height: f64) -> f64 {
    let range = document_height - viewport_height;
    if range <= 0.0 || !range.is_finite() {
        return 0.0;
    }
    (scroll_y / range * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug)]
pub struct ProgressIndicator {
    bar: ElementId,
    last_width: Option<String>,
}

impl ProgressIndicator {
    /// Reuse an existing bar or create one appended to the body
    pub fn mount(page: &mut dyn Page) -> Self {
        let bar = match page.query(Role::ProgressIndicator).first() {
            Some(existing) => *existing,
            None => {
                let bar = page.create_element(Role::ProgressIndicator, PROGRESS_CLASS);
                for (property, value) in MOUNT_STYLES {
                    page.set_style(bar, property, value);
                }
                debug!(?bar, "Progress indicator created");
                bar
            }
        };
        // the static fallback hides it
        page.remove_style(bar, "display");

        let mut indicator = Self {
            bar,
            last_width: None,
        };
        indicator.update(page);
        indicator
    }

    pub fn element(&self) -> ElementId {
        self.bar
    }

    /// Write the bar width for the current scroll position
    pub fn update(&mut self, page: &mut dyn Page) -> f64 {
        let fraction = scroll_fraction(page.scroll_y(), page.document_height(), page.viewport_height());
        let width = format!("{}%", fraction);
        if self.last_width.as_deref() != Some(width.as_str()) {
            page.set_style(self.bar, "width", &width);
            self.last_width = Some(width);
        }
        fraction
    }

    pub fn install(this: &Rc<RefCell<Self>>, bus: &EventBus) -> Vec<Subscription> {
        [EventKind::Scroll, EventKind::Resize]
            .into_iter()
            .map(|kind| {
                let indicator = Rc::downgrade(this);
                bus.listen(kind, move |_, page| {
                    if let Some(indicator) = indicator.upgrade() {
                        indicator.borrow_mut().update(page);
                    }
                })
            })
            .collect()
    }
}
