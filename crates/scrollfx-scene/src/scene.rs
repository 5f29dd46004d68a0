use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use scrollfx_core::{Capabilities, ElementSpec, MemoryPage};

/// A page layout plus a timed sequence of host signals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub viewport: Viewport,
    /// Frame pacing used by `advance` steps
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: f64,
    /// Reduced-motion preference at page load
    #[serde(default)]
    pub reduced_motion: bool,
    /// URL fragment the page was opened with, e.g. `#pricing`
    #[serde(default)]
    pub location_hash: Option<String>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    #[serde(default = "default_viewport_height")]
    pub height: f64,
    /// Derived from element geometry when omitted
    #[serde(default)]
    pub document_height: Option<f64>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            height: default_viewport_height(),
            document_height: None,
        }
    }
}

fn default_frame_interval() -> f64 {
    16.0
}

fn default_viewport_height() -> f64 {
    800.0
}

/// Where a scripted smooth scroll should go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSpec {
    /// Absolute offset
    Position(f64),
    /// `#fragment` anchor or a plain element id
    Named(String),
}

/// One scripted host signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Load,
    /// User scroll to an absolute offset
    Scroll { y: f64 },
    Resize { height: f64 },
    Orientation {
        #[serde(default)]
        height: Option<f64>,
    },
    /// Reduced-motion preference change
    Preference { reduced: bool },
    Click { element: String },
    SmoothScroll {
        target: TargetSpec,
        #[serde(default)]
        duration_ms: Option<u64>,
        #[serde(default)]
        easing: Option<String>,
    },
    /// Run an explicit entrance transition on one element
    Animate {
        element: String,
        #[serde(default = "default_animate_style")]
        style: String,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    /// Let time pass, delivering a frame every `frame_interval_ms`
    Advance { ms: f64 },
}

fn default_animate_style() -> String {
    "fadeIn".to_string()
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Load => "load",
            Step::Scroll { .. } => "scroll",
            Step::Resize { .. } => "resize",
            Step::Orientation { .. } => "orientation",
            Step::Preference { .. } => "preference",
            Step::Click { .. } => "click",
            Step::SmoothScroll { .. } => "smooth_scroll",
            Step::Animate { .. } => "animate",
            Step::Advance { .. } => "advance",
        }
    }
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene file {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid scene file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scene: Scene = toml::from_str(content)?;
        scene.check()?;
        Ok(scene)
    }

    fn check(&self) -> Result<()> {
        if !(self.frame_interval_ms > 0.0 && self.frame_interval_ms.is_finite()) {
            anyhow::bail!("frame_interval_ms must be positive, got {}", self.frame_interval_ms);
        }
        if !(self.viewport.height > 0.0) {
            anyhow::bail!("viewport.height must be positive, got {}", self.viewport.height);
        }
        let mut seen = std::collections::HashSet::new();
        for element in &self.elements {
            if element.id.is_empty() {
                anyhow::bail!("every element needs an id");
            }
            if !seen.insert(element.id.as_str()) {
                anyhow::bail!("duplicate element id '{}'", element.id);
            }
        }
        Ok(())
    }

    /// Build the in-memory page the scene starts from
    pub fn build_page(&self) -> MemoryPage {
        let mut page = MemoryPage::new(self.viewport.height);
        if let Some(height) = self.viewport.document_height {
            page.set_document_height(height);
        }
        page.set_reduced_motion(self.reduced_motion);
        page.set_location_hash(self.location_hash.as_deref());
        page.set_capabilities(self.capabilities);
        for element in &self.elements {
            page.insert(element.clone());
        }
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollfx_core::{Page, Role};

    const SCENE: &str = r##"
        name = "landing"
        frame_interval_ms = 20
        location_hash = "#pricing"

        [viewport]
        height = 800
        document_height = 5000

        [[elements]]
        id = "header"
        roles = ["header"]
        height = 80

        [[elements]]
        id = "pricing"
        roles = ["animated"]
        classes = ["fade-in-up"]
        attributes = { "data-animation-delay" = "200" }
        top = 2000
        height = 400

        [[steps]]
        action = "load"

        [[steps]]
        action = "scroll"
        y = 1200

        [[steps]]
        action = "smooth_scroll"
        target = "#pricing"
        easing = "easeOutQuad"

        [[steps]]
        action = "smooth_scroll"
        target = 0

        [[steps]]
        action = "advance"
        ms = 500
    "##;

    #[test]
    fn test_parse_scene() {
        let scene = Scene::from_toml_str(SCENE).unwrap();
        assert_eq!(scene.name.as_deref(), Some("landing"));
        assert_eq!(scene.frame_interval_ms, 20.0);
        assert_eq!(scene.elements.len(), 2);
        assert_eq!(scene.steps[0], Step::Load);
        assert_eq!(scene.steps[1], Step::Scroll { y: 1200.0 });
        assert_eq!(
            scene.steps[2],
            Step::SmoothScroll {
                target: TargetSpec::Named("#pricing".into()),
                duration_ms: None,
                easing: Some("easeOutQuad".into()),
            }
        );
        assert!(matches!(
            scene.steps[3],
            Step::SmoothScroll { target: TargetSpec::Position(p), .. } if p == 0.0
        ));
    }

    #[test]
    fn test_build_page() {
        let scene = Scene::from_toml_str(SCENE).unwrap();
        let page = scene.build_page();
        let pricing = page.element("pricing").unwrap();
        assert!(page.has_role(pricing, Role::Animated));
        assert_eq!(page.attribute(pricing, "data-animation-delay").as_deref(), Some("200"));
        assert_eq!(page.document_height(), 5000.0);
        assert_eq!(page.location_hash().as_deref(), Some("#pricing"));
    }

    #[test]
    fn test_defaults_for_minimal_scene() {
        let scene = Scene::from_toml_str("").unwrap();
        assert_eq!(scene.viewport.height, 800.0);
        assert_eq!(scene.frame_interval_ms, 16.0);
        assert!(scene.capabilities.animation_frames);
        assert!(scene.steps.is_empty());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = Scene::from_toml_str(
            r#"
            [[elements]]
            id = "a"
            [[elements]]
            id = "a"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_rejects_unknown_action() {
        assert!(Scene::from_toml_str("[[steps]]\naction = \"explode\"").is_err());
    }
}
