use std::path::Path;

use zonescale_core::ScaleConfig;

pub fn init(path: &Path, workload: &str, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let config = ScaleConfig::scaffold(workload);
    std::fs::write(path, config.to_toml_string()?)?;
    println!("✓ Generated {}", path.display());

    Ok(())
}
