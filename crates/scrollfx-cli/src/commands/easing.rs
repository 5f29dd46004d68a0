use anyhow::Result;

use scrollfx_core::Easing;

const BAR_WIDTH: usize = 40;

pub fn run(name: &str, samples: usize) -> Result<()> {
    if name == "list" {
        for easing in Easing::ALL {
            println!("  {:<16} {}", easing.name(), easing.css());
        }
        return Ok(());
    }

    let easing: Easing = name.parse().map_err(|e| {
        let known: Vec<&str> = Easing::ALL.iter().map(|easing| easing.name()).collect();
        anyhow::anyhow!("{} (known curves: {})", e, known.join(", "))
    })?;

    println!("{} ({})\n", easing, easing.css());
    for i in 0..samples {
        let t = i as f64 / (samples - 1) as f64;
        let eased = easing.apply(t);
        let filled = (eased * BAR_WIDTH as f64).round() as usize;
        println!("  t={:.3}  {:.4}  {}", t, eased, "#".repeat(filled.min(BAR_WIDTH)));
    }
    Ok(())
}
