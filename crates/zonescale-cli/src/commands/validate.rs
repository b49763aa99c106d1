use std::path::Path;

use zonescale_core::ScaleConfig;

pub fn validate(config: &Path) -> anyhow::Result<()> {
    let specs = ScaleConfig::load(config)?;

    for spec in &specs {
        let zone_sets: Vec<String> = spec.zone_sets.iter().map(ToString::to_string).collect();
        println!(
            "✓ {}: {} rule(s), zone sets [{}], per-zone {}..{}, total {}..{}",
            spec.id,
            spec.policy.rules.len(),
            zone_sets.join("; "),
            spec.policy.min_capacity,
            spec.policy.max_capacity,
            spec.total_min,
            spec.total_max,
        );
    }
    println!("{} workload(s) valid", specs.len());

    Ok(())
}
