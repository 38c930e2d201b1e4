//! # Ski Area Aggregation
//!
//! Composes runs into per-ski-area summaries and coarser roll-ups.
//!
//! The pipeline has two phases:
//!
//! 1. **Per area** (sequential or parallel): every run of a ski area is segmented, its
//!    segments turned into weighted bearings, and the results collected into one
//!    [`SkiAreaBearings`] set. Runs that fail are isolated into the [`SkipReport`].
//! 2. **Reduce** (single step): every area is assigned to its group keys (hemisphere,
//!    latitude band, all areas, custom labels) and each group is summarized from the
//!    union of its members' raw bearings.
//!
//! Ski area summaries use directed bearings. Every multi-area group uses poleward
//! bearings, so northern and southern areas are comparable.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::time::Instant;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::bearing::{segment_bearings, BearingFrame, WeightedBearing};
use crate::config::RoseConfig;
use crate::error::{Result, RoseError};
use crate::geo_utils::compute_center;
use crate::histogram::{build_histogram, BearingHistogram};
use crate::segment::{segment_run, SegmentConfig};
use crate::stats::{enrich_histogram, BearingStats, VectorAccumulator};
use crate::{Hemisphere, RunGeometry, RunPoint};

/// Extra `(facet, value)` labels per ski area, such as `("country", "Georgia")` or
/// `("status", "operating")`. Each distinct pair becomes a [`GroupKey::Custom`] group, so
/// equal values under different facets stay apart.
pub type AreaLabels = HashMap<String, Vec<(String, String)>>;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for multi-area groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Width of absolute-latitude bands in degrees.
    /// Default: 4
    pub latitude_band_step: u32,
    /// Build `hemisphere:north` / `hemisphere:south` groups.
    /// Default: true
    pub include_hemispheres: bool,
    /// Build `latitude:<lo>-<hi>` groups.
    /// Default: true
    pub include_latitude_bands: bool,
    /// Build the worldwide `all` group.
    /// Default: true
    pub include_all_areas: bool,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            latitude_band_step: 4,
            include_hemispheres: true,
            include_latitude_bands: true,
            include_all_areas: true,
        }
    }
}

// ============================================================================
// Group Keys
// ============================================================================

/// Identifies one summary: a single ski area or a set of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    SkiArea(String),
    Hemisphere(Hemisphere),
    /// Absolute latitude band `[lower, upper)`, in degrees
    LatitudeBand { lower: u32, upper: u32 },
    AllAreas,
    Custom { facet: String, value: String },
}

/// Kind of a [`GroupKey`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    SkiArea,
    Hemisphere,
    LatitudeBand,
    All,
    Custom,
}

impl GroupKey {
    /// Latitude band containing `latitude`, folded onto absolute degrees.
    ///
    /// ```rust
    /// use ski_rose::GroupKey;
    ///
    /// assert_eq!(GroupKey::latitude_band(46.5, 4).id(), "latitude:44-48");
    /// assert_eq!(GroupKey::latitude_band(-33.4, 4).id(), "latitude:32-36");
    /// assert_eq!(GroupKey::latitude_band(90.0, 4).id(), "latitude:88-90");
    /// ```
    pub fn latitude_band(latitude: f64, step: u32) -> Self {
        let step = step.clamp(1, 90);
        let abs = latitude.abs().min(90.0);
        let lower = ((abs / step as f64).floor() as u32 * step).min(89 / step * step);
        GroupKey::LatitudeBand {
            lower,
            upper: (lower + step).min(90),
        }
    }

    /// Stable string identifier, used as `group_id` in every output table.
    pub fn id(&self) -> String {
        match self {
            GroupKey::SkiArea(id) => format!("ski_area:{id}"),
            GroupKey::Hemisphere(h) => format!("hemisphere:{h}"),
            GroupKey::LatitudeBand { lower, upper } => format!("latitude:{lower}-{upper}"),
            GroupKey::AllAreas => "all".to_string(),
            GroupKey::Custom { facet, value } => format!("custom:{facet}:{value}"),
        }
    }

    pub fn kind(&self) -> GroupKind {
        match self {
            GroupKey::SkiArea(_) => GroupKind::SkiArea,
            GroupKey::Hemisphere(_) => GroupKind::Hemisphere,
            GroupKey::LatitudeBand { .. } => GroupKind::LatitudeBand,
            GroupKey::AllAreas => GroupKind::All,
            GroupKey::Custom { .. } => GroupKind::Custom,
        }
    }

    /// Frame the group's bearings are binned in.
    pub fn frame(&self) -> BearingFrame {
        match self {
            GroupKey::SkiArea(_) => BearingFrame::Directed,
            _ => BearingFrame::Poleward,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

// ============================================================================
// Per Ski Area Processing
// ============================================================================

/// All weighted bearings of one ski area, plus the bookkeeping of how they were made.
#[derive(Debug, Clone, PartialEq)]
pub struct SkiAreaBearings {
    pub ski_area_id: String,
    /// Runs that produced at least one segment
    pub run_count: usize,
    /// Points kept after cleaning
    pub coordinate_count: usize,
    /// Segments with a defined bearing
    pub segment_count: usize,
    pub undefined_bearing_count: usize,
    /// Mean latitude of the kept points
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hemisphere: Option<Hemisphere>,
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
    /// Directed bearings in run order
    pub bearings: Vec<WeightedBearing>,
}

/// A run left out of the analysis.
#[derive(Debug)]
pub struct SkippedRun {
    pub ski_area_id: String,
    pub run_id: String,
    pub reason: RoseError,
}

/// Segment, orient and collect the bearings of one ski area's runs.
///
/// Failing runs are returned as [`SkippedRun`]s; they never abort the area.
pub fn process_ski_area(
    ski_area_id: &str,
    runs: &[&RunGeometry],
    config: &SegmentConfig,
) -> (SkiAreaBearings, Vec<SkippedRun>) {
    let mut skipped = Vec::new();
    let mut kept_points: Vec<RunPoint> = Vec::new();
    let mut bearings = Vec::new();
    let mut run_count = 0;
    let mut undefined_bearing_count = 0;

    for run in runs {
        let segments = match segment_run(run, config) {
            Ok(segments) => segments,
            Err(e) => {
                warn!("Skipping run {} of ski area {}: {}", run.run_id(), ski_area_id, e);
                skipped.push(SkippedRun {
                    ski_area_id: ski_area_id.to_string(),
                    run_id: run.run_id().to_string(),
                    reason: e,
                });
                continue;
            }
        };

        run_count += 1;
        kept_points.extend(segments.iter().map(|s| s.start));
        if let Some(last) = segments.last() {
            kept_points.push(last.end);
        }

        let (run_bearings, undefined) = segment_bearings(&segments, config.distance_model);
        undefined_bearing_count += undefined;
        bearings.extend(run_bearings);
    }

    let center = compute_center(&kept_points);
    let elevations = kept_points.iter().filter_map(|p| p.elevation);
    let min_elevation = elevations.clone().reduce(f64::min);
    let max_elevation = elevations.reduce(f64::max);

    debug!(
        "Ski area {}: {} runs, {} bearings, {} undefined",
        ski_area_id,
        run_count,
        bearings.len(),
        undefined_bearing_count
    );

    let area = SkiAreaBearings {
        ski_area_id: ski_area_id.to_string(),
        run_count,
        coordinate_count: kept_points.len(),
        segment_count: bearings.len(),
        undefined_bearing_count,
        latitude: center.map(|(_, lat)| lat),
        longitude: center.map(|(lon, _)| lon),
        hemisphere: center.map(|(_, lat)| Hemisphere::from_latitude(lat)),
        min_elevation,
        max_elevation,
        bearings,
    };
    (area, skipped)
}

// ============================================================================
// Summaries
// ============================================================================

/// Aggregate statistics of one ski area or group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaBearingSummary {
    pub group_id: String,
    pub group_kind: GroupKind,
    pub frame: BearingFrame,
    pub ski_areas_count: usize,
    pub run_count: usize,
    pub coordinate_count: usize,
    pub segment_count: usize,
    /// Sum of descents over segments with a defined bearing, in meters
    pub combined_vertical: f64,
    /// Sum of slope lengths over segments with a defined bearing, in meters
    pub combined_distance: f64,
    /// Mean of member latitudes
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Set when every member with data lies in the same hemisphere
    pub hemisphere: Option<Hemisphere>,
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
    pub vertical_drop: Option<f64>,
    #[serde(flatten)]
    pub stats: BearingStats,
    /// One histogram per configured bin count
    pub histograms: Vec<BearingHistogram>,
}

impl AreaBearingSummary {
    /// Histogram with `num_bins` bins, if it was configured.
    pub fn histogram(&self, num_bins: u32) -> Option<&BearingHistogram> {
        self.histograms.iter().find(|h| h.num_bins == num_bins)
    }
}

/// One row of the enriched (comparative) histogram table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedHistogramRecord {
    pub group_id: String,
    pub num_bins: u32,
    pub bin_index: u32,
    pub bin_center: f64,
    pub bin_count: f64,
    pub enrichment: f64,
}

/// What was left out of an analysis run, and why.
#[derive(Debug, Default)]
pub struct SkipReport {
    pub skipped_runs: Vec<SkippedRun>,
    /// Segments without horizontal displacement, summed over all areas
    pub undefined_bearings: u64,
    /// [`RoseError::EmptyGroup`] for every area or group with zero total weight
    pub empty_groups: Vec<RoseError>,
}

impl SkipReport {
    pub fn is_clean(&self) -> bool {
        self.skipped_runs.is_empty()
            && self.undefined_bearings == 0
            && self.empty_groups.is_empty()
    }

    /// Add runs skipped before the analysis, e.g. while assembling input records.
    pub fn extend_runs<I: IntoIterator<Item = SkippedRun>>(&mut self, skipped: I) {
        self.skipped_runs.extend(skipped);
    }

    /// Ids of the groups that came out empty.
    pub fn empty_group_ids(&self) -> impl Iterator<Item = &str> {
        self.empty_groups.iter().filter_map(|e| match e {
            RoseError::EmptyGroup { group } => Some(group.as_str()),
            _ => None,
        })
    }
}

/// Display filter for per-area summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryFilter {
    /// Default: 3
    pub min_run_count: usize,
    /// Minimum combined vertical in meters.
    /// Default: 50.0
    pub min_combined_vertical: f64,
}

impl Default for SummaryFilter {
    fn default() -> Self {
        Self {
            min_run_count: 3,
            min_combined_vertical: 50.0,
        }
    }
}

impl SummaryFilter {
    pub fn accepts(&self, summary: &AreaBearingSummary) -> bool {
        summary.run_count >= self.min_run_count
            && summary.combined_vertical >= self.min_combined_vertical
    }

    pub fn apply<'a>(&self, summaries: &'a [AreaBearingSummary]) -> Vec<&'a AreaBearingSummary> {
        summaries.iter().filter(|s| self.accepts(s)).collect()
    }
}

/// Result of a complete analysis run.
#[derive(Debug)]
pub struct RoseAnalysis {
    /// One summary per ski area, ordered by ski area id
    pub ski_areas: Vec<AreaBearingSummary>,
    /// Multi-area groups, ordered by group key
    pub groups: Vec<AreaBearingSummary>,
    pub enriched: Vec<EnrichedHistogramRecord>,
    pub skip_report: SkipReport,
}

impl RoseAnalysis {
    pub fn ski_area(&self, ski_area_id: &str) -> Option<&AreaBearingSummary> {
        self.group(&GroupKey::SkiArea(ski_area_id.to_string()))
    }

    pub fn group(&self, key: &GroupKey) -> Option<&AreaBearingSummary> {
        let id = key.id();
        let pool = match key {
            GroupKey::SkiArea(_) => &self.ski_areas,
            _ => &self.groups,
        };
        pool.iter().find(|s| s.group_id == id)
    }

    /// Every summary, ski areas first.
    pub fn summaries(&self) -> impl Iterator<Item = &AreaBearingSummary> {
        self.ski_areas.iter().chain(self.groups.iter())
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Run the complete pipeline sequentially.
///
/// Fails only on configuration or unit errors. Bad runs end up in the
/// [`SkipReport`].
pub fn analyze_runs(
    runs: &[RunGeometry],
    labels: &AreaLabels,
    config: &RoseConfig,
) -> Result<RoseAnalysis> {
    let start = Instant::now();
    let partitions = prepare(runs, config)?;

    let processed: Vec<_> = partitions
        .iter()
        .map(|(id, area_runs)| process_ski_area(id, area_runs, &config.segment))
        .collect();

    let analysis = reduce(processed, labels, config)?;
    info!("Analyzed {} runs sequentially in {:?}", runs.len(), start.elapsed());
    Ok(analysis)
}

/// Run the complete pipeline with ski areas processed in parallel.
///
/// Produces the same result as [`analyze_runs`].
#[cfg(feature = "parallel")]
pub fn analyze_runs_parallel(
    runs: &[RunGeometry],
    labels: &AreaLabels,
    config: &RoseConfig,
) -> Result<RoseAnalysis> {
    use rayon::prelude::*;

    let start = Instant::now();
    let partitions: Vec<(&str, Vec<&RunGeometry>)> = prepare(runs, config)?.into_iter().collect();

    let processed: Vec<_> = partitions
        .par_iter()
        .map(|(id, area_runs)| process_ski_area(id, area_runs, &config.segment))
        .collect();

    let analysis = reduce(processed, labels, config)?;
    info!("Analyzed {} runs in parallel in {:?}", runs.len(), start.elapsed());
    Ok(analysis)
}

/// Validate inputs and partition runs by ski area.
fn prepare<'a>(
    runs: &'a [RunGeometry],
    config: &RoseConfig,
) -> Result<BTreeMap<&'a str, Vec<&'a RunGeometry>>> {
    config.validate()?;

    for run in runs {
        if let Some(p) = run.points().iter().find(|p| !p.is_valid()) {
            return Err(RoseError::InconsistentUnits {
                run_id: run.run_id().to_string(),
                longitude: p.longitude,
                latitude: p.latitude,
            });
        }
    }

    let mut partitions: BTreeMap<&str, Vec<&RunGeometry>> = BTreeMap::new();
    for run in runs {
        partitions.entry(run.ski_area_id()).or_default().push(run);
    }
    info!("Processing {} runs across {} ski areas", runs.len(), partitions.len());
    Ok(partitions)
}

/// Distinct group keys a ski area belongs to, besides its own.
fn group_keys(
    area: &SkiAreaBearings,
    labels: &AreaLabels,
    grouping: &GroupingConfig,
) -> BTreeSet<GroupKey> {
    let mut keys = BTreeSet::new();
    if grouping.include_all_areas {
        keys.insert(GroupKey::AllAreas);
    }
    if grouping.include_hemispheres {
        if let Some(h) = area.hemisphere {
            keys.insert(GroupKey::Hemisphere(h));
        }
    }
    if grouping.include_latitude_bands {
        if let Some(lat) = area.latitude {
            keys.insert(GroupKey::latitude_band(lat, grouping.latitude_band_step));
        }
    }
    if let Some(area_labels) = labels.get(&area.ski_area_id) {
        keys.extend(area_labels.iter().map(|(facet, value)| GroupKey::Custom {
            facet: facet.clone(),
            value: value.clone(),
        }));
    }
    keys
}

/// Merge per-area results into summaries for every group key.
fn reduce(
    processed: Vec<(SkiAreaBearings, Vec<SkippedRun>)>,
    labels: &AreaLabels,
    config: &RoseConfig,
) -> Result<RoseAnalysis> {
    let mut report = SkipReport::default();
    let mut areas = Vec::with_capacity(processed.len());
    for (area, skipped) in processed {
        report.undefined_bearings += area.undefined_bearing_count as u64;
        report.extend_runs(skipped);
        areas.push(area);
    }

    let mut members: BTreeMap<GroupKey, Vec<&SkiAreaBearings>> = BTreeMap::new();
    for area in &areas {
        for key in group_keys(area, labels, &config.grouping) {
            members.entry(key).or_default().push(area);
        }
    }

    let mut ski_areas = Vec::with_capacity(areas.len());
    for area in &areas {
        let key = GroupKey::SkiArea(area.ski_area_id.clone());
        let (summary, _) = summarize(&key, &[area], config, &mut report)?;
        ski_areas.push(summary);
    }

    let enrichment = &config.enrichment;
    let mut groups = Vec::with_capacity(members.len());
    let mut enriched = Vec::new();
    for (key, group_members) in &members {
        let (summary, pairs) = summarize(key, group_members, config, &mut report)?;

        let histogram = build_histogram(
            pairs,
            enrichment.num_bins,
            config.histogram.offset_for(enrichment.num_bins),
        )?;
        let total = histogram.total_weight();
        let sparse_band =
            matches!(key, GroupKey::LatitudeBand { .. }) && total < enrichment.min_band_weight;
        if sparse_band {
            debug!(
                "Leaving {} out of enriched roses ({:.0} < {:.0})",
                key, total, enrichment.min_band_weight
            );
        } else if total > 0.0 {
            let group_id = key.id();
            enriched.extend(enrich_histogram(&histogram, enrichment).into_iter().map(|e| {
                EnrichedHistogramRecord {
                    group_id: group_id.clone(),
                    num_bins: histogram.num_bins,
                    bin_index: e.bin.bin_index,
                    bin_center: e.bin.bin_center,
                    bin_count: e.bin.bin_count,
                    enrichment: e.enrichment,
                }
            }));
        }

        groups.push(summary);
    }

    info!(
        "Built {} ski area and {} group summaries ({} runs skipped, {} undefined bearings)",
        ski_areas.len(),
        groups.len(),
        report.skipped_runs.len(),
        report.undefined_bearings
    );

    Ok(RoseAnalysis {
        ski_areas,
        groups,
        enriched,
        skip_report: report,
    })
}

/// Summarize the union of `members`' bearings under `key`.
///
/// Also returns the `(bearing, weight)` pairs in the key's frame.
fn summarize(
    key: &GroupKey,
    members: &[&SkiAreaBearings],
    config: &RoseConfig,
    report: &mut SkipReport,
) -> Result<(AreaBearingSummary, Vec<(f64, f64)>)> {
    let frame = key.frame();
    let hemisphere = shared_hemisphere(members);

    let mut acc = VectorAccumulator::new();
    let mut pairs = Vec::new();
    let mut combined_vertical = 0.0;
    let mut combined_distance = 0.0;
    for area in members {
        let source = area.hemisphere.unwrap_or(Hemisphere::North);
        for b in &area.bearings {
            let b = b.in_frame(frame, source);
            acc.add(b.bearing, b.weight);
            pairs.push((b.bearing, b.weight));
            combined_vertical += b.vertical_drop;
            combined_distance += b.distance_3d;
        }
    }

    // Poleward bearings already point at the pole of their own hemisphere
    let stats_hemisphere = match frame {
        BearingFrame::Directed => hemisphere.unwrap_or(Hemisphere::North),
        BearingFrame::Poleward => Hemisphere::North,
    };
    let stats = acc.finish(stats_hemisphere);
    if stats.is_empty() {
        let e = RoseError::EmptyGroup { group: key.id() };
        warn!("{}", e);
        report.empty_groups.push(e);
    }

    let histograms = config
        .histogram
        .bin_counts
        .iter()
        .map(|&n| build_histogram(pairs.iter().copied(), n, config.histogram.offset_for(n)))
        .collect::<Result<Vec<_>>>()?;

    let min_elevation = members.iter().filter_map(|a| a.min_elevation).reduce(f64::min);
    let max_elevation = members.iter().filter_map(|a| a.max_elevation).reduce(f64::max);

    let summary = AreaBearingSummary {
        group_id: key.id(),
        group_kind: key.kind(),
        frame,
        ski_areas_count: members.len(),
        run_count: members.iter().map(|a| a.run_count).sum(),
        coordinate_count: members.iter().map(|a| a.coordinate_count).sum(),
        segment_count: members.iter().map(|a| a.segment_count).sum(),
        combined_vertical,
        combined_distance,
        latitude: mean(members.iter().filter_map(|a| a.latitude)),
        longitude: mean(members.iter().filter_map(|a| a.longitude)),
        hemisphere,
        min_elevation,
        max_elevation,
        vertical_drop: min_elevation.zip(max_elevation).map(|(lo, hi)| hi - lo),
        stats,
        histograms,
    };
    Ok((summary, pairs))
}

fn shared_hemisphere(members: &[&SkiAreaBearings]) -> Option<Hemisphere> {
    let mut hemispheres = members.iter().filter_map(|a| a.hemisphere);
    let first = hemispheres.next()?;
    hemispheres.all(|h| h == first).then_some(first)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

// ============================================================================
// Tests
// ============================================================================
