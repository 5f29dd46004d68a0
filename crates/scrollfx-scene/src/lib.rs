//! Scripted replays of host signals against an in-memory page
//!
//! A [`Scene`] describes a page layout and a timed sequence of host signals
//! (scrolls, resizes, preference flips, clicks). The [`Runner`] feeds those
//! signals to a [`scrollfx_core::Coordinator`] and returns a [`Report`] of
//! what the page looks like afterwards.

pub mod runner;
pub mod scene;

pub use runner::{ListenerCounts, NoticeRecord, Report, Runner, ScrollRecord, StepError};
pub use scene::{Scene, Step, TargetSpec, Viewport};
