//! Pure easing functions for scroll and reveal animations
//!
//! Every curve maps progress in [0, 1] to eased progress in [0, 1] with
//! f(0) = 0 and f(1) = 1, and is monotonic non-decreasing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Supported easing curves
///
/// Names follow the camelCase convention used in page markup and config
/// files (`easeInOutCubic`, `easeOutQuad`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    Linear,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
}

impl Easing {
    pub const ALL: [Easing; 7] = [
        Easing::Linear,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
        Easing::EaseInOutCubic,
        Easing::EaseInQuad,
        Easing::EaseOutQuad,
        Easing::EaseInOutQuad,
    ];

    /// Apply the easing function to a progress value
    ///
    /// `t` is clamped to [0, 1] before evaluation.
    #[inline]
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Easing::Linear => t,
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => ease_out_cubic(t),
            Easing::EaseInOutCubic => ease_in_out_cubic(t),
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => ease_in_out_quad(t),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseInCubic => "easeInCubic",
            Easing::EaseOutCubic => "easeOutCubic",
            Easing::EaseInOutCubic => "easeInOutCubic",
            Easing::EaseInQuad => "easeInQuad",
            Easing::EaseOutQuad => "easeOutQuad",
            Easing::EaseInOutQuad => "easeInOutQuad",
        }
    }

    /// Closest CSS timing function, for transitions the host runs itself
    pub fn css(self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseInCubic => "cubic-bezier(0.32, 0, 0.67, 0)",
            Easing::EaseOutCubic => "cubic-bezier(0.33, 1, 0.68, 1)",
            Easing::EaseInOutCubic => "cubic-bezier(0.65, 0, 0.35, 1)",
            Easing::EaseInQuad => "cubic-bezier(0.11, 0, 0.5, 0)",
            Easing::EaseOutQuad => "cubic-bezier(0.5, 1, 0.89, 1)",
            Easing::EaseInOutQuad => "cubic-bezier(0.45, 0, 0.55, 1)",
        }
    }
}

impl Default for Easing {
    fn default() -> Self {
        Easing::EaseInOutCubic
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Easing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Easing::ALL
            .into_iter()
            .find(|easing| easing.name() == s)
            .ok_or_else(|| Error::UnknownEasing(s.to_string()))
    }
}

/// Cubic ease-out: f(t) = 1 - (1-t)³
#[inline]
fn ease_out_cubic(t: f64) -> f64 {
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

/// Cubic ease-in-out: 4t³ for the first half, mirrored for the second
#[inline]
fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[inline]
fn ease_in_out_quad(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_boundaries() {
        for easing in Easing::ALL {
            assert!((easing.apply(0.0) - 0.0).abs() < 1e-9, "{:?} at t=0", easing);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-9, "{:?} at t=1", easing);
        }
    }

    #[test]
    fn test_easing_monotonic() {
        for easing in Easing::ALL {
            let mut prev = 0.0;
            for i in 0..=100 {
                let t = i as f64 / 100.0;
                let v = easing.apply(t);
                assert!(v >= prev, "{:?} not monotonic at t={}", easing, t);
                prev = v;
            }
        }
    }

    #[test]
    fn test_in_out_cubic_midpoint() {
        assert!((Easing::EaseInOutCubic.apply(0.5) - 0.5).abs() < 1e-9);
        assert!((Easing::EaseInOutQuad.apply(0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_input_clamped() {
        assert_eq!(Easing::EaseOutCubic.apply(-3.0), 0.0);
        assert_eq!(Easing::EaseOutCubic.apply(7.0), 1.0);
    }

    #[test]
    fn test_parse_names() {
        for easing in Easing::ALL {
            assert_eq!(easing.name().parse::<Easing>().unwrap(), easing);
        }
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = "bogus".parse::<Easing>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("bogus"));
    }
}
