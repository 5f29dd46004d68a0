pub mod accessibility;
pub mod config;
pub mod coordinator;
pub mod entrance;
pub mod error;
pub mod events;
pub mod header;
pub mod motion;
pub mod navigation;
pub mod page;
pub mod parallax;
pub mod progress;
pub mod visibility;

pub use accessibility::{AccessibilityModeSwitch, MotionMode};
pub use config::{CoordinatorConfig, Settings};
pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use events::{Event, EventBus, EventKind, Subscription};
pub use header::{HeaderState, HeaderVisibility};
pub use motion::{Easing, ScrollCompletion, ScrollOutcome, ScrollTarget};
pub use page::{Capabilities, ElementId, ElementSpec, MemoryPage, Page, Role};
pub use visibility::{AnimationKind, TriggerNotice, TriggerState};
