use std::path::Path;

use anyhow::Result;
use tracing::debug;

use scrollfx_core::CoordinatorConfig;
use scrollfx_scene::{Report, Runner, Scene};

pub async fn run(scene_path: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => CoordinatorConfig::load_from(path)?,
        None => CoordinatorConfig::load()?,
    };
    let scene = Scene::load(scene_path)?;
    debug!(steps = scene.steps.len(), elements = scene.elements.len(), "Scene loaded");

    let report = Runner::new(scene, &config)?.run().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if report.has_errors() {
        anyhow::bail!("{} step(s) failed", report.errors.len());
    }
    Ok(())
}

fn print_summary(report: &Report) {
    let name = report.name.as_deref().unwrap_or("(unnamed scene)");
    println!("Scene: {}", name);
    println!(
        "  Mode: {:?}{}",
        report.motion_mode,
        if report.static_presentation { " (static)" } else { "" }
    );
    if let Some(reason) = &report.degraded {
        println!("  Degraded: {}", reason);
    }
    if report.rebuilds > 0 {
        println!("  Rebuilds: {}", report.rebuilds);
    }
    println!(
        "  Scroll: {:.1} of {:.1} ({} coordinator writes)",
        report.page.scroll_y, report.page.document_height, report.scroll_writes
    );
    if let Some(header) = &report.header {
        println!(
            "  Header: {:?}{}",
            header.visibility,
            if header.scrolled { ", scrolled" } else { "" }
        );
    }
    if let Some(link) = &report.active_link {
        println!("  Active link: {}", link);
    }

    if !report.notices.is_empty() {
        println!("\nEntrances ({}):", report.notices.len());
        for notice in &report.notices {
            println!("  {:>8.1} ms  {} ({:?})", notice.at_ms, notice.element, notice.kind);
        }
    }
    if report.pending_entrances > 0 {
        println!("  {} element(s) still waiting to enter view", report.pending_entrances);
    }

    if !report.scrolls.is_empty() {
        println!("\nSmooth scrolls ({}):", report.scrolls.len());
        for scroll in &report.scrolls {
            println!("  step {} (session {}): {:?}", scroll.step, scroll.session, scroll.outcome);
        }
    }

    println!(
        "\nListeners: {} while running, {} after teardown",
        report.listeners.running, report.listeners.after_teardown
    );

    if !report.errors.is_empty() {
        println!("\nErrors:");
        for error in &report.errors {
            println!("  step {} ({}): {}", error.step, error.action, error.message);
        }
    }
}
