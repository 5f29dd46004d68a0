//! Eased, frame-driven motion
//!
//! - `easing` - pure progress curves
//! - `timing` - progress and interpolation helpers over host timestamps
//! - `scroller` - smooth scroll sessions built on the two above

pub mod easing;
pub mod scroller;
pub mod timing;

pub use easing::Easing;
pub use scroller::{
    click_target, resolve_target, ScrollCompletion, ScrollOutcome, ScrollSession, ScrollTarget,
    SmoothScroller,
};
