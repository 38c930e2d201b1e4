//! Build ski roses from a CSV of run points.
//!
//! Run with: cargo run --example ski_rose -- runs.csv [config.json] [out_dir]
//!
//! Without arguments a small built-in sample is used.

use std::fs::File;
use std::path::PathBuf;

use ski_rose::io::{
    analyze_records, read_run_points, write_enriched_table, write_histogram_table,
    write_summaries_json, write_summary_table,
};
use ski_rose::{AreaLabels, RoseConfig, SummaryFilter};

const SAMPLE: &str = "\
run_id,index,longitude,latitude,elevation,ski_area_id
blue-1,0,7.2200,46.1000,2200,verbier
blue-1,1,7.2205,46.1010,2150,verbier
blue-1,2,7.2212,46.1018,2090,verbier
red-2,0,7.2300,46.1000,2300,verbier
red-2,1,7.2301,46.1012,2210,verbier
red-2,2,7.2299,46.1025,2120,verbier
black-3,0,7.2400,46.0990,2400,verbier
black-3,1,7.2420,46.0995,2280,verbier
green-1,0,-70.1300,-32.8300,3000,portillo
green-1,1,-70.1300,-32.8315,2920,portillo
green-1,2,-70.1296,-32.8330,2850,portillo
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let records = match args.first() {
        Some(path) => read_run_points(File::open(path)?)?,
        None => {
            println!("No input given, using the built-in sample\n");
            read_run_points(SAMPLE.as_bytes())?
        }
    };
    let config = match args.get(1) {
        Some(path) => RoseConfig::from_json_path(path)?,
        None => RoseConfig::default(),
    };

    println!("Read {} run points", records.len());
    let analysis = analyze_records(records, &AreaLabels::new(), &config)?;

    println!("\nSki areas:");
    let filter = SummaryFilter::default();
    for area in &analysis.ski_areas {
        let mean = area
            .stats
            .bearing_mean
            .map(|m| format!("{m:6.1}°"))
            .unwrap_or_else(|| "   n/a ".to_string());
        println!(
            "  {:<28} runs={:<3} vertical={:>7.0}m mean={} alignment={:.2}{}",
            area.group_id,
            area.run_count,
            area.combined_vertical,
            mean,
            area.stats.bearing_alignment.unwrap_or(0.0),
            if filter.accepts(area) { "" } else { "  (hidden)" },
        );
    }

    println!("\nGroups:");
    for group in &analysis.groups {
        println!(
            "  {:<28} areas={:<3} poleward={:+.2} eastward={:+.2}",
            group.group_id,
            group.ski_areas_count,
            group.stats.poleward_affinity.unwrap_or(0.0),
            group.stats.eastward_affinity.unwrap_or(0.0),
        );
    }

    let report = &analysis.skip_report;
    println!("\nSkipped runs:");
    for run in &report.skipped_runs {
        println!("  {} / {}: {}", run.ski_area_id, run.run_id, run.reason);
    }
    println!("Undefined bearings: {}", report.undefined_bearings);

    if let Some(dir) = args.get(2).map(PathBuf::from) {
        std::fs::create_dir_all(&dir)?;
        write_summaries_json(File::create(dir.join("summaries.json"))?, analysis.summaries())?;
        write_summary_table(File::create(dir.join("summaries.csv"))?, analysis.summaries())?;
        write_histogram_table(File::create(dir.join("histograms.csv"))?, analysis.summaries())?;
        write_enriched_table(File::create(dir.join("enriched.csv"))?, &analysis.enriched)?;
        println!("\nWrote tables to {}", dir.display());
    }

    Ok(())
}
