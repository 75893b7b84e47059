//! Yield comparison, environment filtering and season progress curves.
//!
//! Everything here reads trials that already carry their derived columns.
//! Yield analytics only ever see concluded trials; a material or location
//! below its minimum sample size is dropped rather than shown with a
//! misleading average.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{Datelike, Duration, NaiveDate};
use polars::prelude::*;
use serde::Serialize;

use crate::aggregate::round1;
use crate::error::TrialError;
use crate::schema::{category, derived, environment, producer, status, trial};

/// Descriptive yield statistics for one material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialYieldStats {
    pub material: String,
    pub category: String,
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation; zero when a single trial remains.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
}

/// Mean yield of one material at one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoYieldStats {
    pub location: Option<String>,
    pub material: String,
    pub category: String,
    pub n: usize,
    pub mean: f64,
}

/// One week of the season progress curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyProgress {
    /// Monday of the bucket.
    pub week_start: NaiveDate,
    pub count: usize,
    pub cumulative: usize,
    pub pct_cumulative: f64,
}

/// Concluded trials with a measured yield, the only rows yield analytics
/// may see.
fn concluded(df: &DataFrame) -> Result<DataFrame, TrialError> {
    Ok(df
        .clone()
        .lazy()
        .filter(
            col(derived::TRIAL_STATUS)
                .eq(lit(status::HAS_RESULT))
                .and(col(trial::YIELD_SC_HA_CORRECTED).is_not_null()),
        )
        .collect()?)
}

/// Per-material yield statistics over concluded trials, ascending by mean so
/// a bar chart reads worst to best. Materials with fewer than `min_trials`
/// concluded results are dropped.
pub fn yield_stats(
    df: &DataFrame,
    min_trials: usize,
) -> Result<Vec<MaterialYieldStats>, TrialError> {
    let done = concluded(df)?;
    let mut rows = Vec::new();
    for part in done.partition_by([trial::MATERIAL, derived::MATERIAL_CATEGORY], true)? {
        let values = yield_values(&part)?;
        if values.len() < min_trials {
            continue;
        }
        let (material, cat) = match (
            part.column(trial::MATERIAL)?.str()?.get(0),
            part.column(derived::MATERIAL_CATEGORY)?.str()?.get(0),
        ) {
            (Some(m), Some(c)) => (m.to_string(), c.to_string()),
            _ => continue,
        };
        rows.push(describe(material, cat, values));
    }
    rows.sort_by(|a, b| {
        a.mean
            .partial_cmp(&b.mean)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.material.cmp(&b.material))
    });
    Ok(rows)
}

/// Mean yield per (location, material) over concluded trials. The location
/// column is any string column of the table, typically a `schema::geo` one.
pub fn geo_yield_stats(
    df: &DataFrame,
    location_column: &str,
    min_trials: usize,
) -> Result<Vec<GeoYieldStats>, TrialError> {
    let done = concluded(df)?;
    let mut rows = Vec::new();
    for part in done.partition_by(
        [location_column, trial::MATERIAL, derived::MATERIAL_CATEGORY],
        true,
    )? {
        let values = yield_values(&part)?;
        if values.len() < min_trials {
            continue;
        }
        let (material, cat) = match (
            part.column(trial::MATERIAL)?.str()?.get(0),
            part.column(derived::MATERIAL_CATEGORY)?.str()?.get(0),
        ) {
            (Some(m), Some(c)) => (m.to_string(), c.to_string()),
            _ => continue,
        };
        rows.push(GeoYieldStats {
            location: part
                .column(location_column)?
                .str()?
                .get(0)
                .map(|s| s.to_string()),
            material,
            category: cat,
            n: values.len(),
            mean: round1(values.iter().sum::<f64>() / values.len() as f64),
        });
    }
    rows.sort_by(|a, b| {
        a.location.cmp(&b.location).then_with(|| {
            a.mean
                .partial_cmp(&b.mean)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });
    Ok(rows)
}

/// Reference materials eligible for a head-to-head comparison: at least
/// `min_trials` concluded results.
pub fn reference_material_options(
    df: &DataFrame,
    min_trials: usize,
) -> Result<Vec<String>, TrialError> {
    eligible_materials(df, min_trials, category::REFERENCE)
}

/// Competitor materials a selected set of reference materials can be compared
/// against: eligible by sample size, and grown by at least one producer who
/// also grew one of the selected reference materials. An empty selection
/// compares against nothing.
pub fn competitor_material_options(
    df: &DataFrame,
    min_trials: usize,
    selected_reference: &[String],
) -> Result<Vec<String>, TrialError> {
    if selected_reference.is_empty() {
        return Ok(Vec::new());
    }
    let eligible: BTreeSet<String> = eligible_materials(df, min_trials, category::COMPETITOR)?
        .into_iter()
        .collect();

    let done = concluded(df)?;
    let materials = done.column(trial::MATERIAL)?.str()?;
    let categories = done.column(derived::MATERIAL_CATEGORY)?.str()?;
    let producers = done.column(producer::PRODUCER_ID)?.str()?;

    let selected: HashSet<&str> = selected_reference.iter().map(|s| s.as_str()).collect();
    let mut sharing: HashSet<&str> = HashSet::new();
    for i in 0..done.height() {
        if let (Some(m), Some(c), Some(p)) = (materials.get(i), categories.get(i), producers.get(i))
        {
            if c == category::REFERENCE && selected.contains(m) {
                sharing.insert(p);
            }
        }
    }

    let mut out: BTreeSet<String> = BTreeSet::new();
    for i in 0..done.height() {
        if let (Some(m), Some(c), Some(p)) = (materials.get(i), categories.get(i), producers.get(i))
        {
            if c == category::COMPETITOR && sharing.contains(p) && eligible.contains(m) {
                out.insert(m.to_string());
            }
        }
    }
    Ok(out.into_iter().collect())
}

fn eligible_materials(
    df: &DataFrame,
    min_trials: usize,
    cat: &str,
) -> Result<Vec<String>, TrialError> {
    let done = concluded(df)?;
    let materials = done.column(trial::MATERIAL)?.str()?;
    let categories = done.column(derived::MATERIAL_CATEGORY)?.str()?;

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for i in 0..done.height() {
        if let (Some(m), Some(c)) = (materials.get(i), categories.get(i)) {
            if c == cat {
                *counts.entry(m).or_insert(0) += 1;
            }
        }
    }
    Ok(counts
        .into_iter()
        .filter(|(_, n)| *n >= min_trials)
        .map(|(m, _)| m.to_string())
        .collect())
}

// ── Environment filters ─────────────────────────────────────────────────────

/// Environment stages, cascading in declaration order. Each maps to an
/// optional view column; a deployment without it simply offers no options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvStage {
    Irrigation,
    SoilTexture,
    SoilFertility,
    InvestmentLevel,
}

impl EnvStage {
    pub const CASCADE: [EnvStage; 4] = [
        EnvStage::Irrigation,
        EnvStage::SoilTexture,
        EnvStage::SoilFertility,
        EnvStage::InvestmentLevel,
    ];

    pub fn column(self) -> &'static str {
        match self {
            EnvStage::Irrigation => environment::IRRIGATION,
            EnvStage::SoilTexture => environment::SOIL_TEXTURE,
            EnvStage::SoilFertility => environment::SOIL_FERTILITY,
            EnvStage::InvestmentLevel => environment::INVESTMENT_LEVEL,
        }
    }
}

/// Growing-environment selection. Any stage whose column the view does not
/// carry is ignored everywhere.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSelection {
    pub irrigation: Option<String>,
    pub soil_textures: BTreeSet<String>,
    pub soil_fertilities: BTreeSet<String>,
    pub investment_levels: BTreeSet<String>,
    /// Inclusive altitude range in metres.
    pub altitude_m: Option<(f64, f64)>,
}

impl EnvironmentSelection {
    fn predicate(&self, df: &DataFrame, stage: EnvStage) -> Option<Expr> {
        if df.column(stage.column()).is_err() {
            return None;
        }
        let column = col(stage.column());
        match stage {
            EnvStage::Irrigation => self
                .irrigation
                .as_ref()
                .map(|v| column.eq(lit(v.clone()))),
            EnvStage::SoilTexture => env_membership(column, &self.soil_textures),
            EnvStage::SoilFertility => env_membership(column, &self.soil_fertilities),
            EnvStage::InvestmentLevel => env_membership(column, &self.investment_levels),
        }
    }

    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame, TrialError> {
        let mut combined: Option<Expr> = None;
        for stage in EnvStage::CASCADE {
            if let Some(pred) = self.predicate(df, stage) {
                combined = Some(match combined {
                    Some(acc) => acc.and(pred),
                    None => pred,
                });
            }
        }
        if let Some((lo, hi)) = self.altitude_m {
            if df.column(environment::ALTITUDE_M).is_ok() {
                let range = col(environment::ALTITUDE_M)
                    .cast(DataType::Float64)
                    .gt_eq(lit(lo))
                    .and(
                        col(environment::ALTITUDE_M)
                            .cast(DataType::Float64)
                            .lt_eq(lit(hi)),
                    );
                combined = Some(match combined {
                    Some(acc) => acc.and(range),
                    None => range,
                });
            }
        }
        match combined {
            Some(expr) => Ok(df.clone().lazy().filter(expr).collect()?),
            None => Ok(df.clone()),
        }
    }

    /// Option list for one stage after the selections of earlier stages.
    /// Empty when the view does not carry the column.
    pub fn options(&self, df: &DataFrame, stage: EnvStage) -> Result<Vec<String>, TrialError> {
        if df.column(stage.column()).is_err() {
            return Ok(Vec::new());
        }
        let mut combined: Option<Expr> = None;
        for earlier in EnvStage::CASCADE {
            if earlier == stage {
                break;
            }
            if let Some(pred) = self.predicate(df, earlier) {
                combined = Some(match combined {
                    Some(acc) => acc.and(pred),
                    None => pred,
                });
            }
        }
        let narrowed = match combined {
            Some(expr) => df.clone().lazy().filter(expr).collect()?,
            None => df.clone(),
        };
        crate::filter::distinct_values(&narrowed, stage.column())
    }

    /// Altitude extent of the slice after the categorical stages, for seeding
    /// a range control. `None` when the column is absent or all null.
    pub fn altitude_bounds(&self, df: &DataFrame) -> Result<Option<(f64, f64)>, TrialError> {
        if df.column(environment::ALTITUDE_M).is_err() {
            return Ok(None);
        }
        let mut narrowed = df.clone();
        for stage in EnvStage::CASCADE {
            if let Some(pred) = self.predicate(&narrowed, stage) {
                narrowed = narrowed.lazy().filter(pred).collect()?;
            }
        }
        let altitudes = narrowed
            .column(environment::ALTITUDE_M)?
            .cast(&DataType::Float64)?;
        let altitudes = altitudes.f64()?;
        let mut bounds: Option<(f64, f64)> = None;
        for v in altitudes.into_iter().flatten() {
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        Ok(bounds)
    }
}

fn env_membership(column: Expr, values: &BTreeSet<String>) -> Option<Expr> {
    if values.is_empty() {
        return None;
    }
    let allowed: Vec<String> = values.iter().cloned().collect();
    Some(column.is_in(lit(Series::new("".into(), allowed)), false))
}

// ── Season progress ─────────────────────────────────────────────────────────

/// Weekly cumulative planting curve over rows that have a planting date.
pub fn planting_progress(df: &DataFrame) -> Result<Vec<WeeklyProgress>, TrialError> {
    weekly_progress(df, trial::PLANTING_DATE)
}

/// Weekly cumulative harvest curve over rows that have a harvest date.
pub fn harvest_progress(df: &DataFrame) -> Result<Vec<WeeklyProgress>, TrialError> {
    weekly_progress(df, trial::HARVEST_DATE)
}

fn weekly_progress(df: &DataFrame, column: &str) -> Result<Vec<WeeklyProgress>, TrialError> {
    let dates = df.column(column)?.date()?;
    let mut buckets: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut total = 0usize;
    for date in dates.as_date_iter().flatten() {
        *buckets.entry(week_start(date)).or_insert(0) += 1;
        total += 1;
    }

    let mut cumulative = 0usize;
    let mut out = Vec::with_capacity(buckets.len());
    for (week, count) in buckets {
        cumulative += count;
        out.push(WeeklyProgress {
            week_start: week,
            count,
            cumulative,
            pct_cumulative: crate::aggregate::pct(cumulative, total),
        });
    }
    Ok(out)
}

/// First week at or past a cumulative threshold, e.g. 50.0 or 90.0.
pub fn milestone_week(progress: &[WeeklyProgress], threshold_pct: f64) -> Option<NaiveDate> {
    progress
        .iter()
        .find(|w| w.pct_cumulative >= threshold_pct)
        .map(|w| w.week_start)
}

/// Monday of the week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

// ── Descriptive statistics ──────────────────────────────────────────────────

fn yield_values(df: &DataFrame) -> Result<Vec<f64>, TrialError> {
    Ok(df
        .column(trial::YIELD_SC_HA_CORRECTED)?
        .f64()?
        .into_iter()
        .flatten()
        .collect())
}

fn describe(material: String, category: String, mut values: Vec<f64>) -> MaterialYieldStats {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = if n < 2 {
        0.0
    } else {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    };
    MaterialYieldStats {
        material,
        category,
        n,
        mean: round1(mean),
        std: round1(std),
        min: round1(values[0]),
        max: round1(values[n - 1]),
        q1: round1(quantile_sorted(&values, 0.25)),
        q3: round1(quantile_sorted(&values, 0.75)),
    }
}

/// Linearly interpolated quantile over an ascending slice.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
