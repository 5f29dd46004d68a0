//! Page-load hero entrance and one-off element animation helpers

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::events::{Event, EventBus, EventKind, Subscription};
use crate::motion::Easing;
use crate::page::{ElementId, Page, Role};

/// Staggered reveal of hero elements once the page has loaded
#[derive(Debug)]
pub struct HeroEntrance {
    stagger_ms: u64,
    class: String,
    scheduled: Vec<(ElementId, f64)>,
    revealed: Vec<ElementId>,
}

impl HeroEntrance {
    pub fn new(settings: &Settings) -> Self {
        Self {
            stagger_ms: settings.stagger_ms,
            class: settings.trigger_class.clone(),
            scheduled: Vec::new(),
            revealed: Vec::new(),
        }
    }

    pub fn revealed(&self) -> &[ElementId] {
        &self.revealed
    }

    pub fn pending(&self) -> usize {
        self.scheduled.len()
    }

    /// Schedule every hero element, `stagger_ms` apart in document order
    pub fn on_load(&mut self, page: &mut dyn Page) -> usize {
        let now = page.now();
        self.scheduled = page
            .query(Role::Hero)
            .into_iter()
            .filter(|element| !self.revealed.contains(element))
            .enumerate()
            .map(|(index, element)| (element, now + (index as u64 * self.stagger_ms) as f64))
            .collect();
        debug!(count = self.scheduled.len(), stagger_ms = self.stagger_ms, "Hero entrance scheduled");
        self.fire_due(now, page)
    }

    pub fn fire_due(&mut self, now: f64, page: &mut dyn Page) -> usize {
        let (due, later): (Vec<_>, Vec<_>) = self.scheduled.drain(..).partition(|(_, at)| *at <= now);
        self.scheduled = later;
        let mut fired = 0;
        for (element, _) in due {
            if page.contains(element) {
                page.add_class(element, &self.class);
                self.revealed.push(element);
                fired += 1;
            }
        }
        fired
    }

    /// Reveal every hero element at once (static presentation)
    pub fn reveal_all(page: &mut dyn Page, class: &str) -> usize {
        let heroes = page.query(Role::Hero);
        for element in &heroes {
            page.add_class(*element, class);
        }
        heroes.len()
    }

    pub fn install(this: &Rc<RefCell<Self>>, bus: &EventBus) -> Vec<Subscription> {
        let on_load = Rc::downgrade(this);
        let on_frame = Rc::downgrade(this);
        vec![
            bus.listen(EventKind::Load, move |_, page| {
                if let Some(entrance) = on_load.upgrade() {
                    entrance.borrow_mut().on_load(page);
                }
            }),
            bus.listen(EventKind::Frame, move |event, page| {
                if let (Event::Frame { now }, Some(entrance)) = (event, on_frame.upgrade()) {
                    entrance.borrow_mut().fire_due(*now, page);
                }
            }),
        ]
    }
}

/// Target presentation for [`animate_element`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntranceStyle {
    FadeIn,
    SlideInLeft,
    ScaleIn,
}

impl EntranceStyle {
    /// Unrecognized names animate as a fade
    pub fn from_name(name: &str) -> Self {
        match name {
            "slideInLeft" => EntranceStyle::SlideInLeft,
            "scaleIn" => EntranceStyle::ScaleIn,
            _ => EntranceStyle::FadeIn,
        }
    }

    fn transform(self) -> &'static str {
        match self {
            EntranceStyle::FadeIn => "translateY(0)",
            EntranceStyle::SlideInLeft => "translateX(0)",
            EntranceStyle::ScaleIn => "scale(1)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimateOptions {
    pub duration_ms: u64,
    pub delay_ms: u64,
    pub easing: Easing,
}

impl Default for AnimateOptions {
    fn default() -> Self {
        Self {
            duration_ms: 600,
            delay_ms: 0,
            easing: Easing::EaseInOutCubic,
        }
    }
}

/// Transition an element to its final entrance presentation
///
/// Returns the host time at which the transition is over.
pub fn animate_element(
    page: &mut dyn Page,
    element: ElementId,
    style: EntranceStyle,
    options: AnimateOptions,
) -> Result<f64> {
    if !page.contains(element) {
        return Err(Error::MissingTarget(format!("element {:?}", element)));
    }
    let transition = format!("all {}ms {}", options.duration_ms, options.easing.css());
    page.set_style(element, "transition", &transition);
    page.set_style(element, "opacity", "1");
    page.set_style(element, "transform", style.transform());
    Ok(page.now() + (options.duration_ms + options.delay_ms) as f64)
}

/// Whether an element's top has reached `threshold` of the viewport height
/// while its bottom is still on screen
pub fn is_in_viewport(page: &dyn Page, element: ElementId, threshold: f64) -> bool {
    page.bounding_rect(element).is_some_and(|rect| {
        rect.top <= page.viewport_height() * threshold && rect.bottom() >= 0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::page::{ElementSpec, MemoryPage};

    fn hero_page() -> (MemoryPage, Vec<ElementId>) {
        let mut page = MemoryPage::new(800.0);
        let ids = ["title", "subtitle", "cta"]
            .into_iter()
            .map(|id| page.insert(ElementSpec::new(id).role(Role::Hero).attr("data-animate", "")))
            .collect();
        (page, ids)
    }

    #[test]
    fn test_hero_stagger_timing() {
        let (mut page, ids) = hero_page();
        let mut entrance = HeroEntrance::new(&CoordinatorConfig::default().validate().unwrap());

        page.set_now(1000.0);
        assert_eq!(entrance.on_load(&mut page), 1);
        assert!(page.has_class(ids[0], "animate-in"));
        assert!(!page.has_class(ids[1], "animate-in"));

        assert_eq!(entrance.fire_due(1149.0, &mut page), 0);
        assert_eq!(entrance.fire_due(1150.0, &mut page), 1);
        assert!(page.has_class(ids[1], "animate-in"));

        assert_eq!(entrance.fire_due(1300.0, &mut page), 1);
        assert_eq!(entrance.revealed(), ids.as_slice());
        assert_eq!(entrance.pending(), 0);
    }

    #[test]
    fn test_reveal_all() {
        let (mut page, ids) = hero_page();
        assert_eq!(HeroEntrance::reveal_all(&mut page, "animate-in"), 3);
        assert!(ids.iter().all(|id| page.has_class(*id, "animate-in")));
    }

    #[test]
    fn test_animate_element_writes_final_state() {
        let mut page = MemoryPage::new(800.0);
        let card = page.insert(ElementSpec::new("card"));
        page.set_now(500.0);

        let options = AnimateOptions {
            delay_ms: 100,
            ..Default::default()
        };
        let done = animate_element(&mut page, card, EntranceStyle::from_name("scaleIn"), options).unwrap();

        assert_eq!(done, 1200.0);
        assert_eq!(page.style(card, "opacity").as_deref(), Some("1"));
        assert_eq!(page.style(card, "transform").as_deref(), Some("scale(1)"));
        assert_eq!(
            page.style(card, "transition").as_deref(),
            Some("all 600ms cubic-bezier(0.65, 0, 0.35, 1)")
        );
    }

    #[test]
    fn test_animate_missing_element() {
        let mut page = MemoryPage::new(800.0);
        let err = animate_element(&mut page, ElementId(99), EntranceStyle::FadeIn, AnimateOptions::default());
        assert!(matches!(err, Err(Error::MissingTarget(_))));
    }

    #[test]
    fn test_is_in_viewport() {
        let mut page = MemoryPage::new(800.0);
        page.set_document_height(4000.0);
        let card = page.insert(ElementSpec::new("card").at(500.0, 200.0));

        assert!(!is_in_viewport(&page, card, 0.5));
        assert!(is_in_viewport(&page, card, 0.75));

        page.set_scroll_y(800.0);
        assert!(!is_in_viewport(&page, card, 0.5));
        assert!(!is_in_viewport(&page, ElementId(99), 1.0));
    }
}
