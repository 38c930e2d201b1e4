//! Analyze many synthetic ski areas, sequentially and in parallel.
//!
//! Run with: cargo run --release --example batch_ski_areas --features parallel

use std::time::Instant;

use ski_rose::{
    analyze_runs, analyze_runs_parallel, AreaLabels, GroupKey, Hemisphere, RoseConfig,
    RunGeometry, RunPoint,
};

fn main() {
    println!("Batch Ski Area Example\n");

    let mut runs = Vec::new();
    let mut labels = AreaLabels::new();
    for area in 0..400 {
        let area_id = format!("area-{area}");
        // spread areas over both hemispheres
        let lat = -45.0 + (area % 90) as f64;
        let lon = -150.0 + (area * 7 % 300) as f64;
        let parity = if area % 2 == 0 { "even" } else { "odd" };
        labels.insert(
            area_id.clone(),
            vec![("parity".to_string(), parity.to_string())],
        );

        for run in 0..25 {
            let heading = ((area * 37 + run * 53) % 360) as f64;
            runs.push(synthetic_run(&format!("{area_id}-{run}"), &area_id, lon, lat, heading));
        }
    }
    println!("Created {} runs\n", runs.len());

    let config = RoseConfig::default();

    let start = Instant::now();
    let sequential = match analyze_runs(&runs, &labels, &config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Sequential analysis failed: {e}");
            return;
        }
    };
    println!("Sequential: {:?}", start.elapsed());

    let start = Instant::now();
    let parallel = match analyze_runs_parallel(&runs, &labels, &config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Parallel analysis failed: {e}");
            return;
        }
    };
    println!("Parallel:   {:?}", start.elapsed());
    println!("Identical:  {}\n", sequential.groups == parallel.groups);

    for key in [
        GroupKey::AllAreas,
        GroupKey::Hemisphere(Hemisphere::North),
        GroupKey::Hemisphere(Hemisphere::South),
        GroupKey::Custom {
            facet: "parity".to_string(),
            value: "even".to_string(),
        },
    ] {
        if let Some(group) = parallel.group(&key) {
            println!(
                "  {:<20} areas={:<4} vertical={:>9.0}m alignment={:.3}",
                group.group_id,
                group.ski_areas_count,
                group.combined_vertical,
                group.stats.bearing_alignment.unwrap_or(0.0),
            );
        }
    }
    println!("\nEnriched rows: {}", parallel.enriched.len());
}

/// A five-point run descending 200m along `heading`.
fn synthetic_run(run_id: &str, area_id: &str, lon: f64, lat: f64, heading: f64) -> RunGeometry {
    let step = 0.0008;
    let (dlat, dlon) = (heading.to_radians().cos() * step, heading.to_radians().sin() * step);
    let points = (0..5)
        .map(|i| {
            let i = i as f64;
            RunPoint::new(lon + dlon * i, lat + dlat * i, 2500.0 - 50.0 * i)
        })
        .collect();
    RunGeometry::new(run_id, area_id, points).unwrap()
}
