use anyhow::Result;

use scrollfx_core::CoordinatorConfig;

pub fn run(init: bool) -> Result<()> {
    let path = CoordinatorConfig::config_path();

    if init {
        if path.exists() {
            println!("Config already exists: {}", path.display());
        } else {
            let saved = CoordinatorConfig::default().save()?;
            println!("Wrote default config to {}", saved.display());
        }
        return Ok(());
    }

    let config = CoordinatorConfig::load()?;
    if path.exists() {
        println!("# {}", path.display());
    } else {
        println!("# {} (not found, showing defaults)", path.display());
    }
    print!("{}", config.to_toml_string()?);

    match config.validate() {
        Ok(settings) => println!(
            "\n# valid: {} ms {} scrolls, {} thresholds",
            settings.scroll_duration_ms,
            settings.easing,
            (1.0 / settings.threshold_step).round() as usize + 1
        ),
        Err(e) => println!("\n# invalid: {}", e),
    }
    Ok(())
}
