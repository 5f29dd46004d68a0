use anyhow::Result;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use scrollfx_core::entrance::{animate_element, AnimateOptions, EntranceStyle};
use scrollfx_core::page::PageSnapshot;
use scrollfx_core::{
    AnimationKind, Coordinator, CoordinatorConfig, ElementId, Error, Event, EventBus, HeaderState,
    MemoryPage, MotionMode, Page, ScrollCompletion, ScrollOutcome, ScrollTarget, TriggerNotice,
};

use crate::scene::{Scene, Step, TargetSpec};

/// Upper bound on frames delivered while waiting for scrolls to settle
const SETTLE_FRAME_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Serialize)]
pub struct NoticeRecord {
    pub element: String,
    pub kind: AnimationKind,
    pub at_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrollRecord {
    /// Index of the step that started the scroll
    pub step: usize,
    pub session: u64,
    pub outcome: ScrollOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepError {
    pub step: usize,
    pub action: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ListenerCounts {
    pub running: usize,
    pub after_teardown: usize,
}

/// Outcome of a scene replay
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub name: Option<String>,
    pub motion_mode: MotionMode,
    pub static_presentation: bool,
    pub degraded: Option<String>,
    pub rebuilds: usize,
    pub header: Option<HeaderState>,
    pub active_link: Option<String>,
    pub pending_entrances: usize,
    pub scroll_writes: usize,
    pub notices: Vec<NoticeRecord>,
    pub scrolls: Vec<ScrollRecord>,
    pub listeners: ListenerCounts,
    pub errors: Vec<StepError>,
    pub page: PageSnapshot,
}

impl Report {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Drives a coordinator through a scene on an in-memory page
pub struct Runner {
    scene: Scene,
    page: MemoryPage,
    bus: EventBus,
    coordinator: Coordinator,
    notices: broadcast::Receiver<TriggerNotice>,
    notice_log: Vec<NoticeRecord>,
    scrolls: Vec<(usize, ScrollCompletion)>,
    errors: Vec<StepError>,
}

impl Runner {
    pub fn new(scene: Scene, config: &CoordinatorConfig) -> Result<Self> {
        let mut page = scene.build_page();
        let bus = EventBus::new();
        let coordinator = Coordinator::start(config, &bus, &mut page)?;
        let notices = coordinator.subscribe();

        Ok(Self {
            scene,
            page,
            bus,
            coordinator,
            notices,
            notice_log: Vec::new(),
            scrolls: Vec::new(),
            errors: Vec::new(),
        })
    }

    pub fn page(&self) -> &MemoryPage {
        &self.page
    }

    /// Apply every step, let in-flight scrolls finish and tear down
    pub async fn run(mut self) -> Report {
        let steps = std::mem::take(&mut self.scene.steps);
        info!(
            scene = self.scene.name.as_deref().unwrap_or("(unnamed)"),
            steps = steps.len(),
            "Replaying scene"
        );

        for (index, step) in steps.iter().enumerate() {
            debug!(step = index, action = step.action(), "Applying step");
            if let Err(e) = self.apply(index, step) {
                warn!("Step {} ({}) failed: {}", index, step.action(), e);
                self.errors.push(StepError {
                    step: index,
                    action: step.action().to_string(),
                    message: e.to_string(),
                });
            }
            self.collect_notices();
        }

        let settled = self.settle();
        if settled > 0 {
            debug!(frames = settled, "Waited for scrolls to settle");
        }
        self.collect_notices();

        let running = self.bus.total_listeners();
        let header = self.coordinator.header_state();
        let active_link = self
            .coordinator
            .active_link()
            .and_then(|link| self.page.element_name(link))
            .map(str::to_string);
        let motion_mode = self.coordinator.motion_mode();
        let static_presentation = self.coordinator.is_static();
        let degraded = self.coordinator.degraded_reason();
        let rebuilds = self.coordinator.rebuilds();
        let pending_entrances = self.coordinator.pending_entrances();
        let snapshot = self.page.snapshot();

        self.coordinator.teardown();
        let after_teardown = self.bus.total_listeners();

        let mut scrolls = Vec::new();
        for (step, completion) in std::mem::take(&mut self.scrolls) {
            let session = completion.session();
            scrolls.push(ScrollRecord {
                step,
                session,
                outcome: completion.wait().await,
            });
        }

        Report {
            name: self.scene.name.clone(),
            motion_mode,
            static_presentation,
            degraded,
            rebuilds,
            header,
            active_link,
            pending_entrances,
            scroll_writes: self.page.scroll_writes().len(),
            notices: std::mem::take(&mut self.notice_log),
            scrolls,
            listeners: ListenerCounts {
                running,
                after_teardown,
            },
            errors: std::mem::take(&mut self.errors),
            page: snapshot,
        }
    }

    fn apply(&mut self, index: usize, step: &Step) -> scrollfx_core::Result<()> {
        match step {
            Step::Load => {
                self.dispatch(Event::Load);
            }
            Step::Scroll { y } => {
                self.page.set_scroll_y(*y);
                self.dispatch(Event::Scroll);
            }
            Step::Resize { height } => {
                self.page.set_viewport_height(*height);
                self.dispatch(Event::Resize);
            }
            Step::Orientation { height } => {
                if let Some(height) = height {
                    self.page.set_viewport_height(*height);
                }
                self.dispatch(Event::OrientationChange);
            }
            Step::Preference { reduced } => {
                self.page.set_reduced_motion(*reduced);
                self.dispatch(Event::MotionPreference { reduced: *reduced });
            }
            Step::Click { element } => {
                let target = self.lookup(element)?;
                self.dispatch(Event::Click { target });
            }
            Step::SmoothScroll {
                target,
                duration_ms,
                easing,
            } => {
                let settings = self.coordinator.settings();
                let target = self.resolve(target)?;
                let duration_ms = duration_ms.unwrap_or(settings.scroll_duration_ms);
                let easing = easing.clone().unwrap_or_else(|| settings.easing.name().to_string());
                let completion = self.coordinator.scroll_to(&mut self.page, target, duration_ms, &easing)?;
                self.scrolls.push((index, completion));
            }
            Step::Animate {
                element,
                style,
                duration_ms,
            } => {
                let element = self.lookup(element)?;
                let mut options = AnimateOptions::default();
                if let Some(duration_ms) = duration_ms {
                    options.duration_ms = *duration_ms;
                }
                animate_element(&mut self.page, element, EntranceStyle::from_name(style), options)?;
            }
            Step::Advance { ms } => {
                self.advance(*ms);
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> scrollfx_core::Result<ElementId> {
        self.page
            .element(name)
            .ok_or_else(|| Error::MissingTarget(format!("element '{}'", name)))
    }

    fn resolve(&self, target: &TargetSpec) -> scrollfx_core::Result<ScrollTarget> {
        match target {
            TargetSpec::Position(y) => Ok(ScrollTarget::Position(*y)),
            TargetSpec::Named(name) if name.starts_with('#') => Ok(ScrollTarget::Anchor(name.clone())),
            TargetSpec::Named(name) => self.lookup(name).map(ScrollTarget::Element),
        }
    }

    fn dispatch(&mut self, event: Event) -> usize {
        self.bus.dispatch(&event, &mut self.page)
    }

    /// Deliver one frame; a frame that moved the page also reports a scroll
    fn frame(&mut self, now: f64) {
        let before = self.page.scroll_y();
        self.page.set_now(now);
        self.dispatch(Event::Frame { now });
        if self.page.scroll_y() != before {
            self.dispatch(Event::Scroll);
        }
    }

    fn advance(&mut self, ms: f64) -> usize {
        let interval = self.scene.frame_interval_ms;
        let end = self.page.now() + ms.max(0.0);
        let mut frames = 0;
        while self.page.now() < end {
            let now = (self.page.now() + interval).min(end);
            self.frame(now);
            frames += 1;
        }
        frames
    }

    fn settle(&mut self) -> usize {
        let interval = self.scene.frame_interval_ms;
        let mut frames = 0;
        while self.coordinator.is_animating() && frames < SETTLE_FRAME_LIMIT {
            let now = self.page.now() + interval;
            self.frame(now);
            frames += 1;
        }
        frames
    }

    fn collect_notices(&mut self) {
        loop {
            match self.notices.try_recv() {
                Ok(notice) => {
                    let element = self
                        .page
                        .element_name(notice.element)
                        .unwrap_or("(detached)")
                        .to_string();
                    self.notice_log.push(NoticeRecord {
                        element,
                        kind: notice.kind,
                        at_ms: notice.at_ms,
                    });
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Trigger notices dropped");
                }
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollfx_core::HeaderVisibility;

    const LAYOUT: &str = r##"
        name = "landing"

        [viewport]
        height = 800
        document_height = 5000

        [[elements]]
        id = "header"
        roles = ["header"]
        height = 80

        [[elements]]
        id = "background"
        roles = ["parallax"]
        attributes = { "data-parallax" = "0.5" }
        top = 1000
        height = 400

        [[elements]]
        id = "pricing"
        roles = ["animated"]
        classes = ["fade-in-up"]
        attributes = { "data-animation-delay" = "200" }
        top = 2000
        height = 400

        [[elements]]
        id = "nav-pricing"
        roles = ["nav_link"]
        attributes = { href = "#pricing" }
    "##;

    async fn replay(steps: &str) -> Report {
        let scene = Scene::from_toml_str(&format!("{}\n{}", LAYOUT, steps)).unwrap();
        Runner::new(scene, &CoordinatorConfig::default())
            .unwrap()
            .run()
            .await
    }

    fn style(report: &Report, id: &str, property: &str) -> Option<String> {
        report
            .page
            .elements
            .iter()
            .find(|node| node.id == id)
            .and_then(|node| node.styles.get(property).cloned())
    }

    fn classes(report: &Report, id: &str) -> Vec<String> {
        report
            .page
            .elements
            .iter()
            .find(|node| node.id == id)
            .map(|node| node.classes.clone())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_full_replay() {
        let report = replay(
            r##"
            [[steps]]
            action = "load"

            [[steps]]
            action = "scroll"
            y = 1200

            [[steps]]
            action = "scroll"
            y = 1500

            [[steps]]
            action = "advance"
            ms = 300

            [[steps]]
            action = "smooth_scroll"
            target = "#pricing"
            duration_ms = 400
            easing = "linear"

            [[steps]]
            action = "advance"
            ms = 500
            "##,
        )
        .await;

        assert!(!report.has_errors());
        assert_eq!(report.motion_mode, MotionMode::Full);
        assert_eq!(style(&report, "background", "transform").as_deref(), Some("translateY(-100px)"));
        assert_eq!(report.header.map(|h| h.visibility), Some(HeaderVisibility::Hidden));

        assert_eq!(report.notices.len(), 1);
        assert_eq!(report.notices[0].element, "pricing");
        assert_eq!(report.notices[0].kind, AnimationKind::FadeInUp);
        assert!(report.notices[0].at_ms >= 200.0);
        assert!(classes(&report, "pricing").contains(&"animate-in".to_string()));

        assert_eq!(report.page.scroll_y, 2000.0);
        assert_eq!(report.scrolls.len(), 1);
        assert_eq!(report.scrolls[0].step, 4);
        assert_eq!(report.scrolls[0].outcome, ScrollOutcome::Completed { position: 2000.0 });
        assert_eq!(report.active_link.as_deref(), Some("nav-pricing"));

        assert!(report.listeners.running > 0);
        assert_eq!(report.listeners.after_teardown, 0);
    }

    #[tokio::test]
    async fn test_bogus_easing_is_reported() {
        let report = replay(
            r##"
            [[steps]]
            action = "smooth_scroll"
            target = 2000
            easing = "bogus"

            [[steps]]
            action = "scroll"
            y = 100
            "##,
        )
        .await;

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].action, "smooth_scroll");
        assert!(report.errors[0].message.contains("bogus"));
        assert_eq!(report.scroll_writes, 0);
        assert!(report.scrolls.is_empty());
        assert_eq!(report.page.scroll_y, 100.0);
    }

    #[tokio::test]
    async fn test_reduced_motion_stops_parallax() {
        let report = replay(
            r##"
            [[steps]]
            action = "scroll"
            y = 1200

            [[steps]]
            action = "preference"
            reduced = true

            [[steps]]
            action = "scroll"
            y = 1250

            [[steps]]
            action = "advance"
            ms = 100
            "##,
        )
        .await;

        assert_eq!(report.motion_mode, MotionMode::Reduced);
        assert!(report.static_presentation);
        assert!(report.header.is_none());
        assert_eq!(style(&report, "background", "transform").as_deref(), Some("none"));
        assert!(classes(&report, "body").contains(&"reduced-motion".to_string()));
        assert_eq!(report.listeners.after_teardown, 0);
    }

    #[tokio::test]
    async fn test_rebuild_after_reduced_period() {
        let report = replay(
            r##"
            [[steps]]
            action = "preference"
            reduced = true

            [[steps]]
            action = "preference"
            reduced = false

            [[steps]]
            action = "scroll"
            y = 1300
            "##,
        )
        .await;

        assert_eq!(report.rebuilds, 1);
        assert!(!report.static_presentation);
        assert_eq!(style(&report, "background", "transform").as_deref(), Some("translateY(-150px)"));
        assert!(!classes(&report, "body").contains(&"reduced-motion".to_string()));
    }

    #[tokio::test]
    async fn test_unfinished_scroll_settles_before_report() {
        let report = replay(
            r##"
            [[steps]]
            action = "smooth_scroll"
            target = 1000
            duration_ms = 800
            "##,
        )
        .await;

        assert_eq!(report.page.scroll_y, 1000.0);
        assert_eq!(report.scrolls[0].outcome, ScrollOutcome::Completed { position: 1000.0 });
    }

    #[tokio::test]
    async fn test_demo_scene_replays_cleanly() {
        let scene = Scene::from_toml_str(include_str!("../../../demos/landing.toml")).unwrap();
        let report = Runner::new(scene, &CoordinatorConfig::default())
            .unwrap()
            .run()
            .await;

        assert!(!report.has_errors(), "{:?}", report.errors);
        assert_eq!(report.rebuilds, 1);
        assert_eq!(report.page.scroll_y, 900.0);
        assert!(classes(&report, "hero-cta").contains(&"animate-in".to_string()));
        assert!(report.notices.iter().any(|n| n.element == "pricing-pro"));
        assert_eq!(report.listeners.after_teardown, 0);
    }

    #[tokio::test]
    async fn test_load_follows_url_fragment() {
        let steps = r##"
            [[steps]]
            action = "load"

            [[steps]]
            action = "advance"
            ms = 1000
        "##;
        let scene = Scene::from_toml_str(&format!("location_hash = \"#pricing\"\n{}\n{}", LAYOUT, steps)).unwrap();
        let report = Runner::new(scene, &CoordinatorConfig::default())
            .unwrap()
            .run()
            .await;

        assert!(!report.has_errors());
        assert_eq!(report.page.scroll_y, 2000.0);
        assert_eq!(report.active_link.as_deref(), Some("nav-pricing"));
    }

    #[tokio::test]
    async fn test_missing_click_target() {
        let report = replay(
            r##"
            [[steps]]
            action = "click"
            element = "nowhere"

            [[steps]]
            action = "animate"
            element = "pricing"
            style = "scaleIn"
            "##,
        )
        .await;

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].step, 0);
        assert_eq!(style(&report, "pricing", "transform").as_deref(), Some("scale(1)"));
    }
}
