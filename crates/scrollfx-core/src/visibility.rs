//! One-shot reveal-on-scroll triggers
//!
//! Each registered element is observed against a graduated set of
//! intersection thresholds. Crossing into a new threshold bucket counts as
//! an observation. The first observation with a non-zero intersection (at
//! or above the element's enter ratio) schedules the entrance `delay_ms`
//! later; when it comes due the element gets the trigger class, a custom
//! event is dispatched on it and a [`TriggerNotice`] is broadcast.
//!
//! Triggering is one-way: a triggered element never goes back to pending,
//! and later viewport changes leave it alone.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::events::{Event, EventBus, EventKind, Subscription};
use crate::page::{ElementId, Page, Rect, Role};

/// Attribute carrying the per-element entrance delay in milliseconds
pub const DELAY_ATTRIBUTE: &str = "data-animation-delay";
/// Attribute carrying the minimum intersection ratio that counts as "in view"
pub const ENTER_RATIO_ATTRIBUTE: &str = "data-enter-ratio";
/// Finest threshold granularity accepted from configuration
pub const MIN_THRESHOLD_STEP: f64 = 0.001;

/// Entrance style, taken from the element's markup class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    AnimateOnScroll,
    FadeInUp,
    FadeInLeft,
    FadeInRight,
    ScaleIn,
}

impl AnimationKind {
    pub const ALL: [AnimationKind; 5] = [
        AnimationKind::AnimateOnScroll,
        AnimationKind::FadeInUp,
        AnimationKind::FadeInLeft,
        AnimationKind::FadeInRight,
        AnimationKind::ScaleIn,
    ];

    pub fn class_name(self) -> &'static str {
        match self {
            AnimationKind::AnimateOnScroll => "animate-on-scroll",
            AnimationKind::FadeInUp => "fade-in-up",
            AnimationKind::FadeInLeft => "fade-in-left",
            AnimationKind::FadeInRight => "fade-in-right",
            AnimationKind::ScaleIn => "scale-in",
        }
    }

    /// First matching markup class; plain `animate-on-scroll` otherwise
    pub fn from_page(page: &dyn Page, element: ElementId) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| page.has_class(element, kind.class_name()))
            .unwrap_or(AnimationKind::AnimateOnScroll)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerState {
    Pending,
    Triggered,
}

/// Typed registration record for a reveal-on-scroll element
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedElement {
    pub element: ElementId,
    pub kind: AnimationKind,
    pub delay_ms: u64,
    pub enter_ratio: f64,
    state: TriggerState,
    due_at: Option<f64>,
    last_bucket: Option<usize>,
}

impl AnimatedElement {
    pub fn new(element: ElementId, kind: AnimationKind, delay_ms: u64) -> Self {
        Self {
            element,
            kind,
            delay_ms,
            enter_ratio: 0.0,
            state: TriggerState::Pending,
            due_at: None,
            last_bucket: None,
        }
    }

    pub fn with_enter_ratio(mut self, ratio: f64) -> Self {
        self.enter_ratio = ratio;
        self
    }

    /// Build a record from the element's markup
    ///
    /// An unparseable delay falls back to 0 with a warning; a negative one
    /// is rejected.
    pub fn from_page(page: &dyn Page, element: ElementId) -> Result<Self> {
        let kind = AnimationKind::from_page(page, element);
        let delay_ms = match page.attribute(element, DELAY_ATTRIBUTE) {
            Some(raw) => parse_delay(&raw)?,
            None => 0,
        };
        let mut record = Self::new(element, kind, delay_ms);
        if let Some(raw) = page.attribute(element, ENTER_RATIO_ATTRIBUTE) {
            match raw.trim().parse::<f64>() {
                Ok(ratio) => record.enter_ratio = ratio,
                Err(_) => warn!(
                    "Ignoring unparseable {}='{}' on {:?}",
                    ENTER_RATIO_ATTRIBUTE, raw, element
                ),
            }
        }
        Ok(record)
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    /// Scheduled trigger time once the element has been seen
    pub fn due_at(&self) -> Option<f64> {
        self.due_at
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.enter_ratio) {
            return Err(Error::Configuration(format!(
                "enter ratio for {:?} must be within [0, 1], got {}",
                self.element, self.enter_ratio
            )));
        }
        Ok(())
    }
}

fn parse_delay(raw: &str) -> Result<u64> {
    match raw.trim().parse::<i64>() {
        Ok(ms) if ms < 0 => Err(Error::Configuration(format!(
            "{} must not be negative, got {}",
            DELAY_ATTRIBUTE, ms
        ))),
        Ok(ms) => Ok(ms as u64),
        Err(_) => {
            warn!("Unparseable {}='{}', using 0", DELAY_ATTRIBUTE, raw);
            Ok(0)
        }
    }
}

/// Published when an element's entrance starts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerNotice {
    pub element: ElementId,
    pub kind: AnimationKind,
    pub at_ms: f64,
}

/// Thresholds from 0.0 to 1.0 inclusive at `step` granularity
///
/// `step` must already be validated into `[MIN_THRESHOLD_STEP, 1]`.
pub fn graduated_thresholds(step: f64) -> Vec<f64> {
    let step = step.clamp(MIN_THRESHOLD_STEP, 1.0);
    let mut thresholds: Vec<f64> = (0..)
        .map(|i| i as f64 * step)
        .take_while(|t| *t < 1.0 - step * 1e-6)
        .collect();
    thresholds.push(1.0);
    thresholds
}

/// Fraction of an element's box inside the viewport, plus whether it
/// intersects at all
pub fn intersection_ratio(rect: Rect, viewport_height: f64) -> (f64, bool) {
    let visible = (rect.bottom().min(viewport_height) - rect.top.max(0.0)).max(0.0);
    if rect.height <= 0.0 {
        let inside = rect.top >= 0.0 && rect.top <= viewport_height;
        return (if inside { 1.0 } else { 0.0 }, inside);
    }
    ((visible / rect.height).min(1.0), visible > 0.0)
}

fn bucket(thresholds: &[f64], ratio: f64) -> usize {
    thresholds.iter().filter(|t| **t <= ratio).count()
}

/// Reveal-on-scroll coordinator for a set of elements
#[derive(Debug)]
pub struct VisibilityTrigger {
    elements: Vec<AnimatedElement>,
    thresholds: Vec<f64>,
    step: f64,
    trigger_class: String,
    trigger_event: String,
    notices: broadcast::Sender<TriggerNotice>,
}

impl VisibilityTrigger {
    pub fn new(settings: &Settings, notices: broadcast::Sender<TriggerNotice>) -> Self {
        Self {
            elements: Vec::new(),
            thresholds: graduated_thresholds(settings.threshold_step),
            step: settings.threshold_step,
            trigger_class: settings.trigger_class.clone(),
            trigger_event: settings.trigger_event.clone(),
            notices,
        }
    }

    /// Register elements; the whole batch is rejected if any record is invalid
    pub fn register(&mut self, elements: impl IntoIterator<Item = AnimatedElement>) -> Result<usize> {
        let batch: Vec<AnimatedElement> = elements.into_iter().collect();
        for record in &batch {
            record.validate()?;
        }
        let mut added = 0;
        for record in batch {
            if self.elements.iter().any(|e| e.element == record.element) {
                continue;
            }
            self.elements.push(record);
            added += 1;
        }
        Ok(added)
    }

    /// Register every `Role::Animated` element on the page
    ///
    /// Elements that already carry the trigger class (revealed before a
    /// rebuild) are registered as triggered and never fire again.
    pub fn register_from_page(&mut self, page: &dyn Page) -> Result<usize> {
        let records = page
            .query(Role::Animated)
            .into_iter()
            .map(|element| {
                let mut record = AnimatedElement::from_page(page, element)?;
                if page.has_class(element, &self.trigger_class) {
                    record.state = TriggerState::Triggered;
                }
                Ok(record)
            })
            .collect::<Result<Vec<_>>>()?;
        self.register(records)
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn state_of(&self, element: ElementId) -> Option<TriggerState> {
        self.elements
            .iter()
            .find(|e| e.element == element)
            .map(|e| e.state)
    }

    pub fn pending_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| e.state == TriggerState::Pending)
            .count()
    }

    /// Re-evaluate every pending element against the current viewport
    ///
    /// Returns the number of elements triggered by this call.
    pub fn handle_viewport_change(&mut self, page: &mut dyn Page) -> usize {
        self.elements.retain(|e| page.contains(e.element));

        let now = page.now();
        let viewport_height = page.viewport_height();
        for record in &mut self.elements {
            if record.state == TriggerState::Triggered || record.due_at.is_some() {
                continue;
            }
            let Some(rect) = page.bounding_rect(record.element) else {
                continue;
            };
            let (ratio, intersecting) = intersection_ratio(rect, viewport_height);
            let band = bucket(&self.thresholds, ratio);
            if record.last_bucket == Some(band) {
                continue;
            }
            record.last_bucket = Some(band);

            if intersecting && ratio >= record.enter_ratio {
                record.due_at = Some(now + record.delay_ms as f64);
                debug!(
                    element = ?record.element,
                    ratio,
                    delay_ms = record.delay_ms,
                    "Element entered view"
                );
            }
        }

        self.fire_due(now, page)
    }

    /// Trigger every scheduled element whose delay has elapsed
    pub fn fire_due(&mut self, now: f64, page: &mut dyn Page) -> usize {
        let mut fired = 0;
        for record in &mut self.elements {
            let Some(due_at) = record.due_at else {
                continue;
            };
            if due_at > now || record.state == TriggerState::Triggered {
                continue;
            }
            record.due_at = None;
            if !page.contains(record.element) {
                continue;
            }
            record.state = TriggerState::Triggered;
            page.add_class(record.element, &self.trigger_class);
            page.dispatch_custom(record.element, &self.trigger_event);
            // no subscribers is fine
            let _ = self.notices.send(TriggerNotice {
                element: record.element,
                kind: record.kind,
                at_ms: now,
            });
            debug!(element = ?record.element, kind = ?record.kind, "Entrance triggered");
            fired += 1;
        }
        fired
    }

    /// Recompute thresholds and re-arm observation after a layout change
    ///
    /// Triggered elements and already-scheduled entrances are kept.
    pub fn reconfigure(&mut self, page: &mut dyn Page) -> usize {
        self.thresholds = graduated_thresholds(self.step);
        for record in &mut self.elements {
            if record.state == TriggerState::Pending {
                record.last_bucket = None;
            }
        }
        debug!(thresholds = self.thresholds.len(), "Visibility thresholds recomputed");
        self.handle_viewport_change(page)
    }

    /// Subscribe to scroll and frame signals
    pub fn install(this: &Rc<RefCell<Self>>, bus: &EventBus) -> Vec<Subscription> {
        let on_scroll = Rc::downgrade(this);
        let on_frame = Rc::downgrade(this);
        vec![
            bus.listen(EventKind::Scroll, move |_, page| {
                if let Some(trigger) = on_scroll.upgrade() {
                    trigger.borrow_mut().handle_viewport_change(page);
                }
            }),
            bus.listen(EventKind::Frame, move |event, page| {
                if let (Event::Frame { now }, Some(trigger)) = (event, on_frame.upgrade()) {
                    trigger.borrow_mut().fire_due(*now, page);
                }
            }),
        ]
    }
}
