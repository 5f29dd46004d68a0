//! Frame-driven smooth scrolling
//!
//! A call to [`SmoothScroller::scroll_to`] captures the current offset and
//! the resolved target and starts a [`ScrollSession`]. Each frame signal
//! advances every live session and writes its eased position. Nothing is
//! written until the first frame after the call.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::easing::Easing;
use super::timing::{is_complete, lerp, progress};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::events::{Event, EventBus, EventKind, Subscription};
use crate::page::{ElementId, Page, Role};

/// Where a smooth scroll should end up
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollTarget {
    /// Absolute document offset
    Position(f64),
    /// Top edge of an element
    Element(ElementId),
    /// In-page fragment such as `#pricing`
    Anchor(String),
}

/// How a scroll session ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScrollOutcome {
    /// The final frame wrote the target position
    Completed { position: f64 },
    /// A newer session replaced this one (cancellable mode only)
    Superseded,
    /// The session was dropped before finishing (teardown)
    Abandoned,
}

/// Completion signal returned for every started scroll
#[derive(Debug)]
pub struct ScrollCompletion {
    session: u64,
    rx: Option<oneshot::Receiver<ScrollOutcome>>,
    outcome: Option<ScrollOutcome>,
}

impl ScrollCompletion {
    fn pending(session: u64, rx: oneshot::Receiver<ScrollOutcome>) -> Self {
        Self {
            session,
            rx: Some(rx),
            outcome: None,
        }
    }

    /// A completion that is already resolved (instant jumps)
    pub(crate) fn resolved(session: u64, outcome: ScrollOutcome) -> Self {
        Self {
            session,
            rx: None,
            outcome: Some(outcome),
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// Non-blocking check; `None` while the session is still running
    pub fn try_outcome(&mut self) -> Option<ScrollOutcome> {
        if self.outcome.is_none() {
            if let Some(rx) = self.rx.as_mut() {
                match rx.try_recv() {
                    Ok(outcome) => self.outcome = Some(outcome),
                    Err(oneshot::error::TryRecvError::Empty) => return None,
                    Err(oneshot::error::TryRecvError::Closed) => {
                        self.outcome = Some(ScrollOutcome::Abandoned)
                    }
                }
                self.rx = None;
            }
        }
        self.outcome
    }

    /// Wait for the session to end
    pub async fn wait(mut self) -> ScrollOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        match self.rx.take() {
            Some(rx) => rx.await.unwrap_or(ScrollOutcome::Abandoned),
            None => ScrollOutcome::Abandoned,
        }
    }
}

/// One in-flight scroll animation; immutable once started
#[derive(Debug)]
pub struct ScrollSession {
    id: u64,
    start_position: f64,
    target_position: f64,
    start_time: f64,
    duration_ms: f64,
    easing: Easing,
    done: Option<oneshot::Sender<ScrollOutcome>>,
}

impl ScrollSession {
    pub fn new(start_position: f64, target_position: f64, start_time: f64, duration_ms: u64, easing: Easing) -> Self {
        Self {
            id: 0,
            start_position,
            target_position,
            start_time,
            duration_ms: duration_ms as f64,
            easing,
            done: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn target_position(&self) -> f64 {
        self.target_position
    }

    pub fn progress_at(&self, now: f64) -> f64 {
        progress(self.start_time, now, self.duration_ms)
    }

    /// Scroll offset for a given linear progress
    pub fn position_at_progress(&self, t: f64) -> f64 {
        if t >= 1.0 {
            return self.target_position;
        }
        lerp(self.start_position, self.target_position, self.easing.apply(t))
    }

    pub fn position_at(&self, now: f64) -> f64 {
        self.position_at_progress(self.progress_at(now))
    }

    pub fn is_complete_at(&self, now: f64) -> bool {
        is_complete(self.start_time, now, self.duration_ms)
    }

    fn finish(&mut self, outcome: ScrollOutcome) {
        if let Some(done) = self.done.take() {
            // receiver may have been dropped; nobody is waiting then
            let _ = done.send(outcome);
        }
    }
}

/// Map a clicked element to a scroll target
///
/// Back-to-top controls scroll to 0, anchor links (`href="#id"`) to their
/// fragment. Navigation links stop `link_offset` above their section so the
/// sticky header does not cover it. Anything else is not a scroll trigger.
pub fn click_target(page: &dyn Page, element: ElementId, link_offset: f64) -> Option<ScrollTarget> {
    if page.has_role(element, Role::ScrollTop) {
        return Some(ScrollTarget::Position(0.0));
    }
    let href = page.attribute(element, "href")?;
    if href.len() < 2 || !href.starts_with('#') {
        return None;
    }
    if page.has_role(element, Role::NavLink) {
        let section_top = page
            .resolve_anchor(&href)
            .and_then(|section| page.offset_top(section));
        if let Some(top) = section_top {
            return Some(ScrollTarget::Position(top - link_offset));
        }
    }
    Some(ScrollTarget::Anchor(href))
}

/// Resolve a target to a document offset
pub fn resolve_target(page: &dyn Page, target: &ScrollTarget, anchor_offset: f64) -> Result<f64> {
    match target {
        ScrollTarget::Position(y) => Ok(*y),
        ScrollTarget::Element(element) => page
            .offset_top(*element)
            .map(|top| top - anchor_offset)
            .ok_or_else(|| Error::MissingTarget(format!("element {:?}", element))),
        ScrollTarget::Anchor(href) => page
            .resolve_anchor(href)
            .and_then(|element| page.offset_top(element))
            .map(|top| top - anchor_offset)
            .ok_or_else(|| Error::MissingTarget(href.clone())),
    }
}

/// Smooth scroll animator
///
/// Sessions are independent. With `cancellable` off (the default), a new
/// call does not stop earlier sessions: every live session writes on every
/// frame in start order, so the newest write lands last.
#[derive(Debug)]
pub struct SmoothScroller {
    sessions: Vec<ScrollSession>,
    next_id: u64,
    default_duration_ms: u64,
    default_easing: Easing,
    cancellable: bool,
    anchor_offset: f64,
    link_offset: f64,
}

impl SmoothScroller {
    pub fn new(settings: &Settings) -> Self {
        Self {
            sessions: Vec::new(),
            next_id: 1,
            default_duration_ms: settings.scroll_duration_ms,
            default_easing: settings.easing,
            cancellable: settings.cancellable,
            anchor_offset: settings.anchor_offset,
            link_offset: settings.link_offset,
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    /// Start a scroll using a curve name
    ///
    /// An unknown curve or a zero duration is rejected before anything is
    /// captured or written.
    pub fn scroll_to(
        &mut self,
        page: &dyn Page,
        target: ScrollTarget,
        duration_ms: u64,
        easing: &str,
    ) -> Result<ScrollCompletion> {
        let easing: Easing = easing.parse()?;
        self.scroll_to_with(page, target, duration_ms, easing)
    }

    /// Start a scroll with the configured duration and curve
    pub fn scroll_to_default(&mut self, page: &dyn Page, target: ScrollTarget) -> Result<ScrollCompletion> {
        self.scroll_to_with(page, target, self.default_duration_ms, self.default_easing)
    }

    pub fn scroll_to_with(
        &mut self,
        page: &dyn Page,
        target: ScrollTarget,
        duration_ms: u64,
        easing: Easing,
    ) -> Result<ScrollCompletion> {
        if duration_ms == 0 {
            return Err(Error::Configuration(
                "scroll duration must be a positive number of milliseconds".to_string(),
            ));
        }
        let target_position = resolve_target(page, &target, self.anchor_offset)?;

        if self.cancellable {
            for mut session in self.sessions.drain(..) {
                debug!(session = session.id, "Scroll session superseded");
                session.finish(ScrollOutcome::Superseded);
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = oneshot::channel();

        let mut session = ScrollSession::new(page.scroll_y(), target_position, page.now(), duration_ms, easing);
        session.id = id;
        session.done = Some(tx);

        debug!(
            session = id,
            from = session.start_position,
            to = target_position,
            duration_ms,
            easing = %easing,
            "Smooth scroll started"
        );
        self.sessions.push(session);

        Ok(ScrollCompletion::pending(id, rx))
    }

    /// Advance every live session to `now`
    ///
    /// Returns the number of scroll writes issued.
    pub fn on_frame(&mut self, now: f64, page: &mut dyn Page) -> usize {
        let mut writes = 0;
        for session in &mut self.sessions {
            page.scroll_to(session.position_at(now));
            writes += 1;
            if session.is_complete_at(now) {
                debug!(session = session.id, "Smooth scroll completed");
                let position = session.target_position;
                session.finish(ScrollOutcome::Completed { position });
            }
        }
        self.sessions.retain(|session| session.done.is_some());
        writes
    }

    /// Start a default scroll for a clicked anchor or back-to-top control
    pub fn handle_click(&mut self, page: &dyn Page, element: ElementId) -> Option<ScrollCompletion> {
        let target = click_target(page, element, self.link_offset)?;
        match self.scroll_to_default(page, target) {
            Ok(completion) => Some(completion),
            Err(e) => {
                warn!("Ignoring click on {:?}: {}", element, e);
                None
            }
        }
    }

    /// Drop every session; waiters observe `Abandoned`
    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Subscribe to frame and click signals
    pub fn install(this: &Rc<RefCell<Self>>, bus: &EventBus) -> Vec<Subscription> {
        let on_frame = Rc::downgrade(this);
        let on_click = Rc::downgrade(this);
        vec![
            bus.listen(EventKind::Frame, move |event, page| {
                if let (Event::Frame { now }, Some(scroller)) = (event, on_frame.upgrade()) {
                    scroller.borrow_mut().on_frame(*now, page);
                }
            }),
            bus.listen(EventKind::Click, move |event, page| {
                if let (Event::Click { target }, Some(scroller)) = (event, on_click.upgrade()) {
                    // completion is observable through the page; nobody awaits clicks
                    let _ = scroller.borrow_mut().handle_click(&*page, *target);
                }
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::page::{ElementSpec, MemoryPage};

    fn settings() -> Settings {
        CoordinatorConfig::default().validate().unwrap()
    }

    fn tall_page() -> MemoryPage {
        let mut page = MemoryPage::new(800.0);
        page.set_document_height(10_000.0);
        page
    }

    #[test]
    fn test_positions_monotonic_and_exact_at_end() {
        let session = ScrollSession::new(0.0, 2000.0, 0.0, 800, Easing::EaseInOutCubic);

        let samples: Vec<f64> = [0.0, 0.5, 1.0]
            .iter()
            .map(|t| session.position_at_progress(*t))
            .collect();

        assert_eq!(samples[0], 0.0);
        assert!(samples[0] <= samples[1] && samples[1] <= samples[2]);
        assert_eq!(samples[2], 2000.0);
    }

    #[test]
    fn test_frames_drive_scroll_to_target() {
        let mut page = tall_page();
        let mut scroller = SmoothScroller::new(&settings());

        let mut done = scroller
            .scroll_to(&page, ScrollTarget::Position(2000.0), 800, "easeInOutCubic")
            .unwrap();
        assert!(page.scroll_writes().is_empty());

        let mut last = 0.0;
        for frame in 1..=50 {
            page.set_now(frame as f64 * 16.0);
            scroller.on_frame(page.now(), &mut page);
            assert!(page.scroll_y() >= last);
            last = page.scroll_y();
        }

        assert_eq!(page.scroll_y(), 2000.0);
        assert_eq!(scroller.active_sessions(), 0);
        assert_eq!(done.try_outcome(), Some(ScrollOutcome::Completed { position: 2000.0 }));
    }

    #[test]
    fn test_unknown_easing_rejected_without_write() {
        let mut page = tall_page();
        let mut scroller = SmoothScroller::new(&settings());

        let err = scroller
            .scroll_to(&page, ScrollTarget::Position(2000.0), 800, "bogus")
            .unwrap_err();
        assert!(err.is_configuration());

        page.set_now(1000.0);
        scroller.on_frame(1000.0, &mut page);
        assert!(page.scroll_writes().is_empty());
        assert_eq!(scroller.active_sessions(), 0);
    }

    #[test]
    fn test_zero_duration_rejected() {
        let page = tall_page();
        let mut scroller = SmoothScroller::new(&settings());
        let err = scroller
            .scroll_to(&page, ScrollTarget::Position(100.0), 0, "linear")
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_anchor_is_missing_target() {
        let page = tall_page();
        let mut scroller = SmoothScroller::new(&settings());
        let err = scroller
            .scroll_to(&page, ScrollTarget::Anchor("#nowhere".into()), 800, "linear")
            .unwrap_err();
        assert!(matches!(err, Error::MissingTarget(_)));
    }

    #[test]
    fn test_element_target_uses_offset_top() {
        let mut page = tall_page();
        let section = page.insert(ElementSpec::new("about").at(3000.0, 600.0));
        let mut scroller = SmoothScroller::new(&settings());

        scroller
            .scroll_to(&page, ScrollTarget::Element(section), 100, "linear")
            .unwrap();
        page.set_now(100.0);
        scroller.on_frame(100.0, &mut page);
        assert_eq!(page.scroll_y(), 3000.0);
    }

    #[test]
    fn test_overlapping_sessions_last_write_wins() {
        let mut page = tall_page();
        let mut scroller = SmoothScroller::new(&settings());

        let mut first = scroller
            .scroll_to(&page, ScrollTarget::Position(4000.0), 400, "linear")
            .unwrap();
        let mut second = scroller
            .scroll_to(&page, ScrollTarget::Position(1000.0), 400, "linear")
            .unwrap();
        assert_eq!(scroller.active_sessions(), 2);

        page.set_now(200.0);
        assert_eq!(scroller.on_frame(200.0, &mut page), 2);
        assert_eq!(page.scroll_writes(), &[2000.0, 500.0]);
        assert_eq!(page.scroll_y(), 500.0);

        page.set_now(400.0);
        scroller.on_frame(400.0, &mut page);
        assert_eq!(page.scroll_y(), 1000.0);
        assert_eq!(first.try_outcome(), Some(ScrollOutcome::Completed { position: 4000.0 }));
        assert_eq!(second.try_outcome(), Some(ScrollOutcome::Completed { position: 1000.0 }));
    }

    #[test]
    fn test_cancellable_supersedes_previous_session() {
        let mut config = CoordinatorConfig::default();
        config.scroll.cancellable = true;
        let mut page = tall_page();
        let mut scroller = SmoothScroller::new(&config.validate().unwrap());

        let mut first = scroller
            .scroll_to(&page, ScrollTarget::Position(4000.0), 400, "linear")
            .unwrap();
        let _second = scroller
            .scroll_to(&page, ScrollTarget::Position(1000.0), 400, "linear")
            .unwrap();

        assert_eq!(first.try_outcome(), Some(ScrollOutcome::Superseded));
        assert_eq!(scroller.active_sessions(), 1);

        page.set_now(200.0);
        assert_eq!(scroller.on_frame(200.0, &mut page), 1);
    }

    #[test]
    fn test_click_on_anchor_starts_default_scroll() {
        let mut page = tall_page();
        page.insert(ElementSpec::new("pricing").at(2400.0, 500.0));
        let link = page.insert(ElementSpec::new("nav-pricing").attr("href", "#pricing"));
        let plain = page.insert(ElementSpec::new("external").attr("href", "https://example.com"));
        let mut scroller = SmoothScroller::new(&settings());

        assert!(scroller.handle_click(&page, plain).is_none());
        assert!(scroller.handle_click(&page, link).is_some());

        page.set_now(800.0);
        scroller.on_frame(800.0, &mut page);
        assert_eq!(page.scroll_y(), 2400.0);
    }

    #[test]
    fn test_nav_link_click_leaves_room_for_header() {
        let mut page = tall_page();
        page.insert(ElementSpec::new("pricing").at(2400.0, 500.0));
        let link = page.insert(
            ElementSpec::new("nav-pricing")
                .role(Role::NavLink)
                .attr("href", "#pricing"),
        );
        assert_eq!(click_target(&page, link, 80.0), Some(ScrollTarget::Position(2320.0)));

        let mut scroller = SmoothScroller::new(&settings());
        assert!(scroller.handle_click(&page, link).is_some());
        page.set_now(800.0);
        scroller.on_frame(800.0, &mut page);
        assert_eq!(page.scroll_y(), 2320.0);
    }

    #[test]
    fn test_click_on_dangling_anchor_is_noop() {
        let page = {
            let mut page = tall_page();
            page.insert(ElementSpec::new("nav-gone").attr("href", "#gone"));
            page
        };
        let link = page.element("nav-gone").unwrap();
        let mut scroller = SmoothScroller::new(&settings());

        assert!(scroller.handle_click(&page, link).is_none());
        assert_eq!(scroller.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_completion_future_resolves() {
        let mut page = tall_page();
        let mut scroller = SmoothScroller::new(&settings());
        let done = scroller
            .scroll_to(&page, ScrollTarget::Position(300.0), 100, "easeOutQuad")
            .unwrap();

        page.set_now(150.0);
        scroller.on_frame(150.0, &mut page);
        assert_eq!(done.wait().await, ScrollOutcome::Completed { position: 300.0 });
    }

    #[tokio::test]
    async fn test_cleared_session_is_abandoned() {
        let page = tall_page();
        let mut scroller = SmoothScroller::new(&settings());
        let done = scroller
            .scroll_to(&page, ScrollTarget::Position(300.0), 100, "linear")
            .unwrap();

        scroller.clear();
        assert_eq!(done.wait().await, ScrollOutcome::Abandoned);
    }
}
