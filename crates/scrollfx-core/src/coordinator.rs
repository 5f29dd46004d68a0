//! Lifecycle owner for the animation graph
//!
//! The [`Coordinator`] builds the scroll-driven components when full motion
//! is allowed, tears all of them down when the user asks for reduced motion,
//! and rebuilds them from scratch when the preference is lifted. Navigation
//! (scroll-spy and the back-to-top control) is not animation and stays
//! installed in both modes.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::accessibility::{apply_static_fallback, clear_static_fallback, AccessibilityModeSwitch, MotionMode};
use crate::config::{CoordinatorConfig, Settings};
use crate::entrance::HeroEntrance;
use crate::error::{Error, Result};
use crate::events::{detach_all, Event, EventBus, EventKind, Subscription};
use crate::header::{HeaderState, StickyHeaderController};
use crate::motion::{click_target, resolve_target, Easing, ScrollCompletion, ScrollOutcome, ScrollTarget, SmoothScroller};
use crate::navigation::{BackToTop, HashCorrection, ScrollSpy};
use crate::page::{ElementId, Page, Role};
use crate::parallax::ParallaxEngine;
use crate::progress::ProgressIndicator;
use crate::visibility::{TriggerNotice, VisibilityTrigger};

const NOTICE_CAPACITY: usize = 64;

/// Every scroll-driven component plus the listeners it installed
struct AnimationGraph {
    scroller: Rc<RefCell<SmoothScroller>>,
    visibility: Rc<RefCell<VisibilityTrigger>>,
    parallax: Rc<RefCell<ParallaxEngine>>,
    header: Option<Rc<RefCell<StickyHeaderController>>>,
    progress: Option<Rc<RefCell<ProgressIndicator>>>,
    hero: Rc<RefCell<HeroEntrance>>,
    subscriptions: Vec<Subscription>,
}

impl AnimationGraph {
    fn build(
        settings: &Settings,
        header_state: HeaderState,
        notices: &broadcast::Sender<TriggerNotice>,
        bus: &EventBus,
        page: &mut dyn Page,
    ) -> Result<Self> {
        // registration errors reject the build before anything is installed
        let mut visibility = VisibilityTrigger::new(settings, notices.clone());
        visibility.register_from_page(page)?;
        let mut parallax = ParallaxEngine::new(settings);
        parallax.register_from_page(page)?;

        let header = page
            .query(Role::Header)
            .into_iter()
            .next()
            .map(|element| StickyHeaderController::new(element, &*page, header_state, settings));
        let progress = settings.progress_enabled.then(|| ProgressIndicator::mount(page));

        let mut graph = Self {
            scroller: Rc::new(RefCell::new(SmoothScroller::new(settings))),
            visibility: Rc::new(RefCell::new(visibility)),
            parallax: Rc::new(RefCell::new(parallax)),
            header: header.map(|h| Rc::new(RefCell::new(h))),
            progress: progress.map(|p| Rc::new(RefCell::new(p))),
            hero: Rc::new(RefCell::new(HeroEntrance::new(settings))),
            subscriptions: Vec::new(),
        };
        graph.subscriptions.extend(SmoothScroller::install(&graph.scroller, bus));
        graph.subscriptions.extend(VisibilityTrigger::install(&graph.visibility, bus));
        graph.subscriptions.extend(ParallaxEngine::install(&graph.parallax, bus));
        if let Some(header) = &graph.header {
            graph.subscriptions.extend(StickyHeaderController::install(header, bus));
        }
        if let Some(progress) = &graph.progress {
            graph.subscriptions.extend(ProgressIndicator::install(progress, bus));
        }
        graph.subscriptions.extend(HeroEntrance::install(&graph.hero, bus));

        // elements already on screen count as observed immediately
        graph.visibility.borrow_mut().handle_viewport_change(page);

        debug!(
            listeners = graph.subscriptions.len(),
            animated = graph.visibility.borrow().len(),
            parallax = graph.parallax.borrow().elements().len(),
            "Animation graph built"
        );
        Ok(graph)
    }

    /// Re-read geometry after a resize or orientation change
    fn reconfigure(&self, page: &mut dyn Page) {
        {
            let mut parallax = self.parallax.borrow_mut();
            parallax.refresh_geometry(page);
            let scroll_y = page.scroll_y();
            parallax.tick(scroll_y, page);
        }
        if let Some(header) = &self.header {
            header.borrow_mut().refresh_geometry(page);
        }
        self.visibility.borrow_mut().reconfigure(page);
    }

    fn teardown(self) -> usize {
        self.scroller.borrow_mut().clear();
        detach_all(self.subscriptions)
    }
}

struct Inner {
    settings: Settings,
    bus: EventBus,
    notices: broadcast::Sender<TriggerNotice>,
    switch: AccessibilityModeSwitch,
    degraded: Option<String>,
    graph: Option<AnimationGraph>,
    rebuilds: usize,
    next_jump: u64,
}

impl Inner {
    fn enter_full(&mut self, page: &mut dyn Page) -> Result<()> {
        let graph = AnimationGraph::build(
            &self.settings,
            HeaderState::default(),
            &self.notices,
            &self.bus,
            page,
        )?;
        self.graph = Some(graph);
        Ok(())
    }

    fn enter_static(&mut self, page: &mut dyn Page) {
        if let Some(graph) = self.graph.take() {
            let detached = graph.teardown();
            debug!(detached, "Animation graph torn down");
        }
        apply_static_fallback(page);
        HeroEntrance::reveal_all(page, &self.settings.trigger_class);
    }

    fn on_preference(&mut self, mode: MotionMode, page: &mut dyn Page) {
        match mode {
            MotionMode::Reduced => self.enter_static(page),
            MotionMode::Full => {
                clear_static_fallback(page);
                match self.enter_full(page) {
                    Ok(()) => {
                        self.rebuilds += 1;
                        info!(rebuilds = self.rebuilds, "Animation graph rebuilt");
                    }
                    Err(e) => {
                        // never leave the page with neither animations nor fallback
                        error!("Failed to rebuild animation graph: {}", e);
                        self.enter_static(page);
                    }
                }
            }
        }
    }

    fn scroller(&self) -> Option<Rc<RefCell<SmoothScroller>>> {
        self.graph.as_ref().map(|graph| graph.scroller.clone())
    }

    /// Smooth scroll with the configured defaults, or a jump when static
    fn scroll_default(&mut self, page: &mut dyn Page, position: f64) {
        let target = ScrollTarget::Position(position);
        let result = match self.scroller() {
            Some(scroller) => scroller.borrow_mut().scroll_to_default(&*page, target).map(drop),
            None => self.jump(page, &target).map(drop),
        };
        if let Err(e) = result {
            warn!("Ignoring scroll to {}: {}", position, e);
        }
    }

    /// Instant scroll used whenever the graph is not running
    fn jump(&mut self, page: &mut dyn Page, target: &ScrollTarget) -> Result<ScrollCompletion> {
        let position = resolve_target(&*page, target, self.settings.anchor_offset)?;
        page.scroll_to(position);
        self.next_jump += 1;
        debug!(position, "Jumped without animation");
        Ok(ScrollCompletion::resolved(self.next_jump, ScrollOutcome::Completed { position }))
    }
}

fn check_environment(page: &dyn Page) -> Result<()> {
    let capabilities = page.capabilities();
    if !capabilities.animation_frames {
        return Err(Error::EnvironmentUnsupported("no animation frame callback".to_string()));
    }
    if !capabilities.media_queries {
        return Err(Error::EnvironmentUnsupported("no media query support".to_string()));
    }
    Ok(())
}

/// Scroll-driven animation coordinator for one page
pub struct Coordinator {
    inner: Rc<RefCell<Inner>>,
    spy: Rc<RefCell<ScrollSpy>>,
    back_to_top: Rc<RefCell<BackToTop>>,
    persistent: Vec<Subscription>,
}

impl Coordinator {
    /// Validate `config`, pick the motion mode and install every listener
    ///
    /// A host without frame callbacks or media queries gets the static
    /// presentation instead of an error.
    pub fn start(config: &CoordinatorConfig, bus: &EventBus, page: &mut dyn Page) -> Result<Self> {
        let settings = config.validate()?;
        let switch = AccessibilityModeSwitch::new(&*page);
        let degraded = check_environment(&*page).err().map(|e| e.to_string());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        let mut inner = Inner {
            settings,
            bus: bus.clone(),
            notices,
            switch: switch.clone(),
            degraded,
            graph: None,
            rebuilds: 0,
            next_jump: 0,
        };
        if let Some(reason) = &inner.degraded {
            warn!("{} - using static presentation", reason);
            inner.enter_static(page);
        } else if switch.is_reduced_motion() {
            inner.enter_static(page);
        } else {
            inner.enter_full(page)?;
        }

        let spy = Rc::new(RefCell::new(ScrollSpy::new(&inner.settings)));
        let back_to_top = Rc::new(RefCell::new(BackToTop::new(&inner.settings)));
        let track_preference = inner.degraded.is_none();
        let inner = Rc::new(RefCell::new(inner));

        let mut persistent = Vec::new();
        if track_preference {
            let weak = Rc::downgrade(&inner);
            persistent.push(switch.on_preference_change(bus, move |mode, page| {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().on_preference(mode, page);
                }
            }));
        }
        for kind in [EventKind::Resize, EventKind::OrientationChange] {
            let weak = Rc::downgrade(&inner);
            persistent.push(bus.listen(kind, move |_, page| {
                if let Some(inner) = weak.upgrade() {
                    if let Some(graph) = &inner.borrow().graph {
                        graph.reconfigure(page);
                    }
                }
            }));
        }
        persistent.push(Self::install_static_clicks(Rc::downgrade(&inner), bus));
        persistent.extend(Self::install_hash_correction(Rc::downgrade(&inner), bus));
        persistent.extend(ScrollSpy::install(&spy, bus));
        persistent.extend(BackToTop::install(&back_to_top, bus));

        let coordinator = Self {
            inner,
            spy,
            back_to_top,
            persistent,
        };
        info!(
            mode = ?coordinator.motion_mode(),
            animated = !coordinator.is_static(),
            "Scroll coordinator started"
        );
        Ok(coordinator)
    }

    /// Anchor and back-to-top clicks jump instantly while the graph is down
    fn install_static_clicks(inner: Weak<RefCell<Inner>>, bus: &EventBus) -> Subscription {
        bus.listen(EventKind::Click, move |event, page| {
            let (Event::Click { target }, Some(inner)) = (event, inner.upgrade()) else {
                return;
            };
            let mut inner = inner.borrow_mut();
            if inner.graph.is_some() {
                return;
            }
            let link_offset = inner.settings.link_offset;
            if let Some(scroll_target) = click_target(&*page, *target, link_offset) {
                if let Err(e) = inner.jump(page, &scroll_target) {
                    warn!("Ignoring click on {:?}: {}", target, e);
                }
            }
        })
    }

    /// Align the page with the URL fragment shortly after load
    fn install_hash_correction(inner: Weak<RefCell<Inner>>, bus: &EventBus) -> Vec<Subscription> {
        let correction = Rc::new(RefCell::new(HashCorrection::default()));
        let on_load = (inner.clone(), correction.clone());
        let on_frame = (inner, correction);
        vec![
            bus.listen(EventKind::Load, move |_, page| {
                let (inner, correction) = &on_load;
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                let mut correction = correction.borrow_mut();
                if correction.on_load(&*page).is_none() {
                    return;
                }
                let mut inner = inner.borrow_mut();
                if inner.graph.is_none() {
                    if let Some(position) = correction.take_now() {
                        inner.scroll_default(page, position);
                    }
                }
            }),
            bus.listen(EventKind::Frame, move |event, page| {
                let (inner, correction) = &on_frame;
                let (Event::Frame { now }, Some(inner)) = (event, inner.upgrade()) else {
                    return;
                };
                if let Some(position) = correction.borrow_mut().take_due(*now) {
                    inner.borrow_mut().scroll_default(page, position);
                }
            }),
        ]
    }

    /// Smooth-scroll to `target`, or jump there when motion is reduced
    ///
    /// The curve name and duration are validated in every mode.
    pub fn scroll_to(
        &self,
        page: &mut dyn Page,
        target: ScrollTarget,
        duration_ms: u64,
        easing: &str,
    ) -> Result<ScrollCompletion> {
        let easing: Easing = easing.parse()?;
        if duration_ms == 0 {
            return Err(Error::Configuration(
                "scroll duration must be a positive number of milliseconds".to_string(),
            ));
        }
        let mut inner = self.inner.borrow_mut();
        let result = match inner.scroller() {
            Some(scroller) => scroller
                .borrow_mut()
                .scroll_to_with(&*page, target, duration_ms, easing),
            None => inner.jump(page, &target),
        };
        if let Err(e @ Error::MissingTarget(_)) = &result {
            warn!("Scroll target missing: {}", e);
        }
        result
    }

    /// Receive a notice for every triggered entrance, across rebuilds
    pub fn subscribe(&self) -> broadcast::Receiver<TriggerNotice> {
        self.inner.borrow().notices.subscribe()
    }

    /// Motion actually in effect; `Reduced` whenever the static presentation
    /// is showing, whatever the preference says
    pub fn motion_mode(&self) -> MotionMode {
        let inner = self.inner.borrow();
        if inner.degraded.is_some() || inner.graph.is_none() {
            MotionMode::Reduced
        } else {
            inner.switch.mode()
        }
    }

    /// True while no scroll-driven component is running
    pub fn is_static(&self) -> bool {
        self.inner.borrow().graph.is_none()
    }

    /// Why the host could not run animations, if it could not
    pub fn degraded_reason(&self) -> Option<String> {
        self.inner.borrow().degraded.clone()
    }

    pub fn is_animating(&self) -> bool {
        self.inner
            .borrow()
            .scroller()
            .is_some_and(|scroller| scroller.borrow().active_sessions() > 0)
    }

    pub fn header_state(&self) -> Option<HeaderState> {
        let inner = self.inner.borrow();
        let header = inner.graph.as_ref()?.header.as_ref()?;
        let state = header.borrow().state();
        Some(state)
    }

    pub fn pending_entrances(&self) -> usize {
        self.inner
            .borrow()
            .graph
            .as_ref()
            .map_or(0, |graph| graph.visibility.borrow().pending_count())
    }

    pub fn active_link(&self) -> Option<ElementId> {
        self.spy.borrow().active()
    }

    pub fn back_to_top_visible(&self, page: &dyn Page) -> bool {
        self.back_to_top.borrow().is_shown(page)
    }

    /// Number of successful rebuilds after a reduced-motion period
    pub fn rebuilds(&self) -> usize {
        self.inner.borrow().rebuilds
    }

    pub fn settings(&self) -> Settings {
        self.inner.borrow().settings.clone()
    }

    /// Detach every listener and drop the graph
    ///
    /// In-flight scroll sessions resolve as abandoned. Calling this twice is
    /// harmless.
    pub fn teardown(&mut self) -> usize {
        let mut detached = detach_all(self.persistent.drain(..));
        if let Some(graph) = self.inner.borrow_mut().graph.take() {
            detached += graph.teardown();
        }
        if detached > 0 {
            info!(detached, "Scroll coordinator torn down");
        }
        detached
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("mode", &self.motion_mode())
            .field("static", &self.is_static())
            .field("listeners", &self.persistent.len())
            .finish()
    }
}
