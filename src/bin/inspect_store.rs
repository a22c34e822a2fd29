//! Print a summary of a preprocessed store directory.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use climap::boundary::ring_count;
use climap::selection::{compute_view, Period, Selection};
use climap::{AppState, Config};
use climap::store::{read_boundaries, read_store, BOUNDARIES_FILE, CITIES_FILE};

fn main() -> Result<()> {
    let Some(dir) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: inspect_store <STORE_DIR>");
    };

    println!("Inspecting store: {}", dir.display());

    let (manifest, normals) =
        read_store(&dir).with_context(|| format!("Failed to read store {}", dir.display()))?;

    println!("\n=== MANIFEST ===");
    println!("{}", serde_json::to_string_pretty(&manifest)?);

    let (nrow, ncol) = normals.grid.shape();
    println!("\n=== LAYOUT ===");
    println!("  grid = {} x {} at {}°", nrow, ncol, normals.grid.step);
    println!(
        "  lon = [{:.4}, {:.4}]",
        normals.lon.first().copied().unwrap_or(f64::NAN),
        normals.lon.last().copied().unwrap_or(f64::NAN)
    );
    println!(
        "  lat = [{:.4}, {:.4}]",
        normals.lat.first().copied().unwrap_or(f64::NAN),
        normals.lat.last().copied().unwrap_or(f64::NAN)
    );
    println!("  in-memory size = {} bytes", normals.memory_bytes());

    println!("\n=== FIELDS ===");
    let (row, col) = (nrow / 2, ncol / 2);
    let state = AppState::new(Config::default(), manifest.clone(), normals, None, None)?;
    for info in &manifest.fields {
        let missing = if info.monthly {
            state.normals.monthly[&info.field].iter().filter(|v| v.is_nan()).count()
        } else {
            state.normals.elevation.iter().filter(|v| v.is_nan()).count()
        };
        let view = compute_view(&state, &Selection::new(info.field, Period::Annual))?;
        println!(
            "  {:<8} {:<24} {:<8} missing={:<10} annual[{},{}]={}",
            info.field.key(),
            info.label,
            info.units,
            missing,
            row,
            col,
            view.values[[row, col]]
        );
    }

    println!("\n=== OVERLAYS ===");
    let boundaries = dir.join(BOUNDARIES_FILE);
    if boundaries.exists() {
        let bundle = read_boundaries(&boundaries)?;
        println!(
            "  boundaries: {} points, {} rings",
            bundle.ncols(),
            ring_count(&bundle)
        );
    } else {
        println!("  boundaries: absent");
    }
    let cities = dir.join(CITIES_FILE);
    println!(
        "  cities: {}",
        if cities.exists() { "present" } else { "absent" }
    );

    Ok(())
}
