//! Tabular input and output.
//!
//! Run points come in as CSV with the columns
//! `run_id,index,longitude,latitude,elevation,ski_area_id` (elevation may be empty).
//! Summaries go out as nested JSON or as flat CSV tables.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use csv::{Reader, Writer};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use crate::aggregate::analyze_runs_parallel;
#[cfg(not(feature = "parallel"))]
use crate::aggregate::analyze_runs;
use crate::aggregate::{
    AreaBearingSummary, AreaLabels, EnrichedHistogramRecord, RoseAnalysis, SkippedRun,
};
use crate::config::RoseConfig;
use crate::error::Result;
use crate::{RunGeometry, RunPoint};

/// One row of the run point input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPointRecord {
    pub run_id: String,
    pub index: u32,
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: Option<f64>,
    pub ski_area_id: String,
}

/// Read run point records from CSV with a header row.
pub fn read_run_points<R: Read>(reader: R) -> Result<Vec<RunPointRecord>> {
    let mut rdr = Reader::from_reader(reader);
    let mut records = Vec::new();
    for result in rdr.deserialize::<RunPointRecord>() {
        records.push(result?);
    }
    info!("Read {} run points", records.len());
    Ok(records)
}

/// Group point records into runs, ordered by point index.
///
/// Runs with a repeated index or fewer than two points are returned as skipped.
pub fn assemble_runs(records: Vec<RunPointRecord>) -> (Vec<RunGeometry>, Vec<SkippedRun>) {
    let mut by_run: BTreeMap<(String, String), Vec<(u32, RunPoint)>> = BTreeMap::new();
    for r in records {
        let point = RunPoint {
            longitude: r.longitude,
            latitude: r.latitude,
            elevation: r.elevation,
        };
        by_run
            .entry((r.ski_area_id, r.run_id))
            .or_default()
            .push((r.index, point));
    }

    let mut runs = Vec::with_capacity(by_run.len());
    let mut skipped = Vec::new();
    for ((ski_area_id, run_id), points) in by_run {
        match RunGeometry::from_indexed(run_id.clone(), ski_area_id.clone(), points) {
            Ok(run) => runs.push(run),
            Err(e) => {
                warn!("Skipping run {} of ski area {}: {}", run_id, ski_area_id, e);
                skipped.push(SkippedRun {
                    ski_area_id,
                    run_id,
                    reason: e,
                });
            }
        }
    }
    (runs, skipped)
}

/// Assemble runs from point records and analyze them.
///
/// Runs rejected while assembling are listed in the returned skip report next to
/// those skipped during analysis.
pub fn analyze_records(
    records: Vec<RunPointRecord>,
    labels: &AreaLabels,
    config: &RoseConfig,
) -> Result<RoseAnalysis> {
    let (runs, skipped) = assemble_runs(records);

    #[cfg(feature = "parallel")]
    let mut analysis = analyze_runs_parallel(&runs, labels, config)?;
    #[cfg(not(feature = "parallel"))]
    let mut analysis = analyze_runs(&runs, labels, config)?;

    analysis.skip_report.extend_runs(skipped);
    Ok(analysis)
}

/// Write summaries as a pretty-printed JSON array, histograms nested.
pub fn write_summaries_json<'a, W, I>(writer: W, summaries: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a AreaBearingSummary>,
{
    let summaries: Vec<&AreaBearingSummary> = summaries.into_iter().collect();
    serde_json::to_writer_pretty(writer, &summaries)?;
    Ok(())
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    group_id: &'a str,
    ski_areas_count: usize,
    run_count: usize,
    coordinate_count: usize,
    segment_count: usize,
    combined_vertical: f64,
    combined_distance: f64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    hemisphere: Option<&'static str>,
    min_elevation: Option<f64>,
    max_elevation: Option<f64>,
    vertical_drop: Option<f64>,
    bearing_mean: Option<f64>,
    bearing_alignment: Option<f64>,
    bearing_magnitude_net: f64,
    bearing_magnitude_cum: f64,
    poleward_affinity: Option<f64>,
    eastward_affinity: Option<f64>,
}

/// Write one CSV row of scalars per summary.
pub fn write_summary_table<'a, W, I>(writer: W, summaries: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a AreaBearingSummary>,
{
    let mut wtr = Writer::from_writer(writer);
    for s in summaries {
        wtr.serialize(SummaryRow {
            group_id: &s.group_id,
            ski_areas_count: s.ski_areas_count,
            run_count: s.run_count,
            coordinate_count: s.coordinate_count,
            segment_count: s.segment_count,
            combined_vertical: s.combined_vertical,
            combined_distance: s.combined_distance,
            latitude: s.latitude,
            longitude: s.longitude,
            hemisphere: s.hemisphere.map(|h| h.as_str()),
            min_elevation: s.min_elevation,
            max_elevation: s.max_elevation,
            vertical_drop: s.vertical_drop,
            bearing_mean: s.stats.bearing_mean,
            bearing_alignment: s.stats.bearing_alignment,
            bearing_magnitude_net: s.stats.bearing_magnitude_net,
            bearing_magnitude_cum: s.stats.bearing_magnitude_cum,
            poleward_affinity: s.stats.poleward_affinity,
            eastward_affinity: s.stats.eastward_affinity,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct HistogramRow<'a> {
    group_id: &'a str,
    num_bins: u32,
    bin_index: u32,
    bin_center: f64,
    bin_count: f64,
    bin_proportion: f64,
    bin_label: Option<&'a str>,
}

/// Write one CSV row per summary, bin count and bin.
pub fn write_histogram_table<'a, W, I>(writer: W, summaries: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a AreaBearingSummary>,
{
    let mut wtr = Writer::from_writer(writer);
    for s in summaries {
        for hist in &s.histograms {
            for bin in &hist.bins {
                wtr.serialize(HistogramRow {
                    group_id: &s.group_id,
                    num_bins: hist.num_bins,
                    bin_index: bin.bin_index,
                    bin_center: bin.bin_center,
                    bin_count: bin.bin_count,
                    bin_proportion: bin.bin_proportion,
                    bin_label: bin.bin_label.as_deref(),
                })?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Write the enriched histogram table.
pub fn write_enriched_table<W: Write>(
    writer: W,
    records: &[EnrichedHistogramRecord],
) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
