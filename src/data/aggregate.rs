//! Pure summaries of a [`FilteredView`]. Every function accepts an empty view
//! and returns an empty result.

use std::collections::{BTreeMap, HashMap};

use super::filter::FilteredView;
use super::model::{CategoryField, NumericField};

// ---------------------------------------------------------------------------
// Result shapes
// ---------------------------------------------------------------------------

/// Category → count, ranked by count descending.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryCount {
    pub entries: Vec<(String, usize)>,
}

/// One line of a [`GroupedSeries`]: `(model_year, count)` sorted by year.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(i32, usize)>,
}

/// Several count series indexed by model year. Years without records are
/// absent, not zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupedSeries {
    pub series: Vec<Series>,
}

/// Value counts of a categorical column, with the total for percentages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DistributionSummary {
    pub entries: Vec<(String, usize)>,
    pub total: usize,
}

impl DistributionSummary {
    /// Share of the total in `[0, 1]`; zero for an empty distribution.
    pub fn fraction(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64
        }
    }
}

/// Category → values in view order, for box plots.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumericGroups {
    pub groups: Vec<(String, Vec<f64>)>,
}

/// `[x, y]` pairs per category, for scatter plots.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScatterGroups {
    pub groups: Vec<(String, Vec<[f64; 2]>)>,
}

/// Count matrix of category × model year. Every cell is present; combinations
/// without records hold zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PivotCounts {
    /// Row labels, sorted.
    pub rows: Vec<String>,
    /// Column years, ascending.
    pub years: Vec<i32>,
    /// `counts[row][year_index]`
    pub counts: Vec<Vec<usize>>,
}

impl PivotCounts {
    pub fn max(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }
}

/// Any aggregation output, tagged by shape so the renderer can pick a chart.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationResult {
    CategoryCount(CategoryCount),
    GroupedSeries(GroupedSeries),
    Distribution(DistributionSummary),
    NumericGroups(NumericGroups),
    Scatter(ScatterGroups),
    Pivot(PivotCounts),
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        match self {
            AggregationResult::CategoryCount(c) => c.entries.is_empty(),
            AggregationResult::GroupedSeries(g) => g.series.is_empty(),
            AggregationResult::Distribution(d) => d.entries.is_empty(),
            AggregationResult::NumericGroups(n) => n.groups.is_empty(),
            AggregationResult::Scatter(s) => s.groups.is_empty(),
            AggregationResult::Pivot(p) => p.rows.is_empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Counting
// ---------------------------------------------------------------------------

/// Count non-missing values of `field`, ordered by count descending and
/// then by category name so equal counts have a stable order.
fn ranked_counts(view: &FilteredView<'_>, field: CategoryField) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in view.iter() {
        if let Some(v) = field.value(r) {
            *counts.entry(v).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, n)| (k.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// The `n` most frequent values of `field`. Ties are broken alphabetically.
pub fn top_n(view: &FilteredView<'_>, field: CategoryField, n: usize) -> CategoryCount {
    let mut entries = ranked_counts(view, field);
    entries.truncate(n);
    CategoryCount { entries }
}

/// Plain value count of `field`; percentages are `count / total`.
pub fn distribution(view: &FilteredView<'_>, field: CategoryField) -> DistributionSummary {
    let entries = ranked_counts(view, field);
    let total = entries.iter().map(|(_, n)| n).sum();
    DistributionSummary { entries, total }
}

// ---------------------------------------------------------------------------
// Growth per year
// ---------------------------------------------------------------------------

/// Registrations per `(model_year, city)` for the given cities only.
///
/// `top_cities` is expected to be the city ranking of the same view, so the
/// selection follows the current filters. Series come out in `top_cities`
/// order; cities without any record produce no series.
pub fn growth(view: &FilteredView<'_>, top_cities: &[String]) -> GroupedSeries {
    let mut per_city: HashMap<&str, BTreeMap<i32, usize>> = HashMap::new();
    for r in view.iter() {
        let Some(city) = r.city.as_deref() else {
            continue;
        };
        if !top_cities.iter().any(|c| c == city) {
            continue;
        }
        *per_city
            .entry(city)
            .or_default()
            .entry(r.model_year)
            .or_default() += 1;
    }

    let series = top_cities
        .iter()
        .filter_map(|city| {
            let years = per_city.remove(city.as_str())?;
            Some(Series {
                name: city.clone(),
                points: years.into_iter().collect(),
            })
        })
        .collect();
    GroupedSeries { series }
}

/// Registrations per model year across the whole view, as a single series.
pub fn year_counts(view: &FilteredView<'_>, name: &str) -> GroupedSeries {
    let mut years: BTreeMap<i32, usize> = BTreeMap::new();
    for r in view.iter() {
        *years.entry(r.model_year).or_default() += 1;
    }
    if years.is_empty() {
        return GroupedSeries::default();
    }
    GroupedSeries {
        series: vec![Series {
            name: name.to_string(),
            points: years.into_iter().collect(),
        }],
    }
}

// ---------------------------------------------------------------------------
// Numeric groups
// ---------------------------------------------------------------------------

/// Values of `value` partitioned by `group`, groups sorted by name.
/// Records missing either cell are skipped.
pub fn numeric_groups(
    view: &FilteredView<'_>,
    group: CategoryField,
    value: NumericField,
) -> NumericGroups {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in view.iter() {
        if let (Some(g), Some(v)) = (group.value(r), value.value(r)) {
            groups.entry(g.to_string()).or_default().push(v);
        }
    }
    NumericGroups {
        groups: groups.into_iter().collect(),
    }
}

/// Like [`numeric_groups`] but limited to `categories`, kept in that order.
/// Categories without values are left out.
pub fn numeric_groups_within(
    view: &FilteredView<'_>,
    group: CategoryField,
    value: NumericField,
    categories: &[String],
) -> NumericGroups {
    let mut by_name: HashMap<&str, Vec<f64>> = HashMap::new();
    for r in view.iter() {
        let (Some(g), Some(v)) = (group.value(r), value.value(r)) else {
            continue;
        };
        if categories.iter().any(|c| c == g) {
            by_name.entry(g).or_default().push(v);
        }
    }
    let groups = categories
        .iter()
        .filter_map(|c| Some((c.clone(), by_name.remove(c.as_str())?)))
        .collect();
    NumericGroups { groups }
}

// ---------------------------------------------------------------------------
// Scatter pairs and pivot tables
// ---------------------------------------------------------------------------

/// `(x, y)` per record for the given `categories`, kept in that order.
/// Records missing either value are skipped, as are categories left empty.
pub fn scatter_pairs(
    view: &FilteredView<'_>,
    group: CategoryField,
    x: NumericField,
    y: NumericField,
    categories: &[String],
) -> ScatterGroups {
    let mut by_name: HashMap<&str, Vec<[f64; 2]>> = HashMap::new();
    for r in view.iter() {
        let (Some(g), Some(xv), Some(yv)) = (group.value(r), x.value(r), y.value(r)) else {
            continue;
        };
        if categories.iter().any(|c| c == g) {
            by_name.entry(g).or_default().push([xv, yv]);
        }
    }
    let groups = categories
        .iter()
        .filter_map(|c| Some((c.clone(), by_name.remove(c.as_str())?)))
        .collect();
    ScatterGroups { groups }
}

/// Registrations per `row_field` value and model year, zero-filled.
///
/// A record is counted only when it carries a VIN. Rows and years are those
/// of every record with a `row_field` value, so a combination whose records
/// all lack a VIN shows up as zero.
pub fn pivot_counts(view: &FilteredView<'_>, row_field: CategoryField) -> PivotCounts {
    let mut cells: BTreeMap<&str, BTreeMap<i32, usize>> = BTreeMap::new();
    let mut years: BTreeMap<i32, usize> = BTreeMap::new();
    for r in view.iter() {
        let Some(row) = row_field.value(r) else {
            continue;
        };
        let counted = usize::from(r.vin.is_some());
        *cells.entry(row).or_default().entry(r.model_year).or_default() += counted;
        years.insert(r.model_year, 0);
    }

    let years: Vec<i32> = years.into_keys().collect();
    let counts = cells
        .values()
        .map(|per_year| {
            years
                .iter()
                .map(|y| per_year.get(y).copied().unwrap_or(0))
                .collect()
        })
        .collect();
    PivotCounts {
        rows: cells.keys().map(|k| k.to_string()).collect(),
        years,
        counts,
    }
}

// ---------------------------------------------------------------------------
// Box plot statistics
// ---------------------------------------------------------------------------

/// Five-number summary with Tukey fences, as drawn by a box plot.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    /// Points beyond 1.5 × IQR from the box.
    pub outliers: Vec<f64>,
}

impl BoxSummary {
    /// `None` for an empty slice. Quartiles use linear interpolation between
    /// closest ranks; whiskers reach the furthest point inside the fences.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let (inside, outliers): (Vec<f64>, Vec<f64>) = sorted
            .iter()
            .partition(|v| **v >= lo_fence && **v <= hi_fence);
        let lower_whisker = inside.first().copied().unwrap_or(q1);
        let upper_whisker = inside.last().copied().unwrap_or(q3);

        Some(BoxSummary {
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
            outliers,
        })
    }
}

/// `sorted` must be non-empty and ascending.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
