//! Sticky header hide/show state machine
//!
//! Two independent bits are derived from each scroll position: whether the
//! header is shown (hidden while scrolling down past its own height) and
//! whether the page counts as "scrolled" (past a fixed threshold, which
//! drives the body's background style).

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use tracing::debug;

use crate::config::Settings;
use crate::events::{EventBus, EventKind, Subscription};
use crate::page::{ElementId, Page};

pub const HIDDEN_TRANSFORM: &str = "translateY(-100%)";
pub const SHOWN_TRANSFORM: &str = "translateY(0)";
pub const SCROLLED_CLASS: &str = "scrolled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeaderVisibility {
    Shown,
    Hidden,
}

/// Header state machine value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeaderState {
    pub last_scroll_top: f64,
    pub visibility: HeaderVisibility,
    pub scrolled: bool,
}

impl Default for HeaderState {
    fn default() -> Self {
        Self {
            last_scroll_top: 0.0,
            visibility: HeaderVisibility::Shown,
            scrolled: false,
        }
    }
}

impl HeaderState {
    /// Transition for a scroll to `y`
    ///
    /// Hidden when moving down and past the header height, shown otherwise.
    /// `last_scroll_top` always becomes `y`.
    pub fn next(self, y: f64, header_height: f64, scrolled_threshold: f64) -> Self {
        let visibility = if y > self.last_scroll_top && y > header_height {
            HeaderVisibility::Hidden
        } else {
            HeaderVisibility::Shown
        };
        Self {
            last_scroll_top: y.max(0.0),
            visibility,
            scrolled: y > scrolled_threshold,
        }
    }
}

/// Drives the header element and the body's `scrolled` class
#[derive(Debug)]
pub struct StickyHeaderController {
    header: ElementId,
    header_height: f64,
    state: HeaderState,
    scrolled_threshold: f64,
    frame_throttle: bool,
    dirty: bool,
    applied: Option<HeaderState>,
}

impl StickyHeaderController {
    /// `state` is owned by the caller and handed over for the controller's
    /// lifetime.
    pub fn new(header: ElementId, page: &dyn Page, state: HeaderState, settings: &Settings) -> Self {
        Self {
            header,
            header_height: page.offset_height(header).unwrap_or(0.0),
            state,
            scrolled_threshold: settings.scrolled_threshold,
            frame_throttle: settings.header_frame_throttle,
            dirty: false,
            applied: None,
        }
    }

    pub fn header(&self) -> ElementId {
        self.header
    }

    pub fn state(&self) -> HeaderState {
        self.state
    }

    pub fn header_height(&self) -> f64 {
        self.header_height
    }

    /// Re-read the header height after a layout change
    pub fn refresh_geometry(&mut self, page: &dyn Page) {
        if let Some(height) = page.offset_height(self.header) {
            self.header_height = height;
        }
    }

    /// Evaluate one scroll position and apply any change
    pub fn update(&mut self, y: f64, page: &mut dyn Page) -> HeaderState {
        let next = self.state.next(y, self.header_height, self.scrolled_threshold);
        if next.visibility != self.state.visibility {
            debug!(from = ?self.state.visibility, to = ?next.visibility, y, "Header visibility changed");
        }
        self.state = next;
        self.apply(page);
        next
    }

    fn on_scroll(&mut self, page: &mut dyn Page) {
        if self.frame_throttle {
            self.dirty = true;
        } else {
            let y = page.scroll_y();
            self.update(y, page);
        }
    }

    fn on_frame(&mut self, page: &mut dyn Page) {
        if self.dirty {
            self.dirty = false;
            let y = page.scroll_y();
            self.update(y, page);
        }
    }

    /// Write the current state, skipping bits that are already applied
    fn apply(&mut self, page: &mut dyn Page) {
        let previous = self.applied;
        if previous.map(|s| s.visibility) != Some(self.state.visibility) {
            let transform = match self.state.visibility {
                HeaderVisibility::Hidden => HIDDEN_TRANSFORM,
                HeaderVisibility::Shown => SHOWN_TRANSFORM,
            };
            page.set_style(self.header, "transform", transform);
        }
        if previous.map(|s| s.scrolled) != Some(self.state.scrolled) {
            let body = page.body();
            page.toggle_class(body, SCROLLED_CLASS, self.state.scrolled);
        }
        self.applied = Some(self.state);
    }

    pub fn install(this: &Rc<RefCell<Self>>, bus: &EventBus) -> Vec<Subscription> {
        let on_scroll = Rc::downgrade(this);
        let on_frame = Rc::downgrade(this);
        let mut subscriptions = vec![bus.listen(EventKind::Scroll, move |_, page| {
            if let Some(controller) = on_scroll.upgrade() {
                controller.borrow_mut().on_scroll(page);
            }
        })];
        if this.borrow().frame_throttle {
            subscriptions.push(bus.listen(EventKind::Frame, move |_, page| {
                if let Some(controller) = on_frame.upgrade() {
                    controller.borrow_mut().on_frame(page);
                }
            }));
        }
        subscriptions
    }
}
