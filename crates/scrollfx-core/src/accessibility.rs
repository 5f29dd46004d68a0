//! Reduced-motion preference and the static fallback presentation
//!
//! When the user asks for reduced motion nothing scroll-driven runs. The
//! fallback below replaces the animated presentation with its final, static
//! state: native scrolling, no transforms or transitions on parallax
//! content or the header, no looping decoration and no progress bar.

use std::cell::Cell;
use std::rc::Rc;

use serde::Serialize;
use tracing::info;

use crate::events::{Event, EventBus, EventKind, Subscription};
use crate::header::SCROLLED_CLASS;
use crate::page::{Page, Role};

pub const REDUCED_MOTION_CLASS: &str = "reduced-motion";
pub const FOCUS_CLASS: &str = "accessibility-focus";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MotionMode {
    Full,
    Reduced,
}

impl MotionMode {
    pub fn from_reduced(reduced: bool) -> Self {
        if reduced {
            MotionMode::Reduced
        } else {
            MotionMode::Full
        }
    }
}

/// Tracks the reduced-motion preference
#[derive(Debug, Clone)]
pub struct AccessibilityModeSwitch {
    reduced: Rc<Cell<bool>>,
}

impl AccessibilityModeSwitch {
    /// Read the preference once from the page
    pub fn new(page: &dyn Page) -> Self {
        Self {
            reduced: Rc::new(Cell::new(page.prefers_reduced_motion())),
        }
    }

    pub fn is_reduced_motion(&self) -> bool {
        self.reduced.get()
    }

    pub fn mode(&self) -> MotionMode {
        MotionMode::from_reduced(self.reduced.get())
    }

    /// Follow preference changes
    ///
    /// The stored preference is updated before `listener` runs, so the
    /// listener observes the new value through [`Self::is_reduced_motion`].
    /// Repeated notifications with an unchanged value are not forwarded.
    pub fn on_preference_change<F>(&self, bus: &EventBus, mut listener: F) -> Subscription
    where
        F: FnMut(MotionMode, &mut dyn Page) + 'static,
    {
        let reduced = self.reduced.clone();
        bus.listen(EventKind::MotionPreference, move |event, page| {
            if let Event::MotionPreference { reduced: now_reduced } = event {
                if reduced.replace(*now_reduced) != *now_reduced {
                    listener(MotionMode::from_reduced(*now_reduced), page);
                }
            }
        })
    }
}

const PARALLAX_ROLES: [Role; 2] = [Role::Parallax, Role::ParallaxLayer];

/// Apply the static presentation
pub fn apply_static_fallback(page: &mut dyn Page) {
    let root = page.root();
    page.set_style(root, "scroll-behavior", "auto");

    for role in PARALLAX_ROLES {
        for element in page.query(role) {
            page.set_style(element, "transform", "none");
            page.set_style(element, "transition", "none");
        }
    }
    // a header hidden by the controller must not stay off-screen
    for element in page.query(Role::Header) {
        page.set_style(element, "transform", "none");
    }
    for element in page.query(Role::Floating) {
        page.set_style(element, "animation", "none");
    }
    for element in page.query(Role::ProgressIndicator) {
        page.set_style(element, "display", "none");
    }
    for element in page.query(Role::Focusable) {
        page.add_class(element, FOCUS_CLASS);
    }
    let body = page.body();
    page.remove_class(body, SCROLLED_CLASS);
    page.add_class(body, REDUCED_MOTION_CLASS);

    info!("Reduced motion enabled - animations disabled");
}

/// Undo [`apply_static_fallback`]
pub fn clear_static_fallback(page: &mut dyn Page) {
    let root = page.root();
    page.remove_style(root, "scroll-behavior");

    for role in PARALLAX_ROLES {
        for element in page.query(role) {
            page.remove_style(element, "transform");
            page.remove_style(element, "transition");
        }
    }
    for element in page.query(Role::Header) {
        page.remove_style(element, "transform");
    }
    for element in page.query(Role::Floating) {
        page.remove_style(element, "animation");
    }
    for element in page.query(Role::ProgressIndicator) {
        page.remove_style(element, "display");
    }
    for element in page.query(Role::Focusable) {
        page.remove_class(element, FOCUS_CLASS);
    }
    let body = page.body();
    page.remove_class(body, REDUCED_MOTION_CLASS);

    info!("Reduced motion cleared - animations restored");
}
