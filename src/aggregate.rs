//! Headline figures and grouped breakdowns over the enriched table.
//!
//! Every function takes the table *after* filtering; nothing here applies a
//! `FilterSelection` on its own. Grouped reductions follow the same scheme
//! throughout: `partition_by` on the key columns, then a manual pass over
//! each slice.

use std::collections::{BTreeMap, HashSet};

use polars::prelude::*;
use serde::Serialize;

use crate::error::TrialError;
use crate::schema::{area_band, category, crop, derived, geo, personnel, producer, status, trial};

/// Headline numbers for the current slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSnapshot {
    pub total_trials: usize,
    pub total_producers: usize,
    pub with_result: usize,
    pub awaiting_harvest: usize,
    pub undefined: usize,
    pub pct_with_result: f64,
    pub pct_awaiting_harvest: f64,
    pub pct_undefined: f64,
    /// Trials per distinct producer.
    pub trials_per_producer: f64,
    pub soy_potential_ha: f64,
    pub corn_potential_ha: f64,
    pub mean_soy_ha_per_producer: f64,
    pub mean_corn_ha_per_producer: f64,
}

/// One row of a per-dimension status breakdown, ordered by volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBreakdown {
    pub key: Option<String>,
    pub total: usize,
    pub with_result: usize,
    pub awaiting_harvest: usize,
    pub undefined: usize,
    pub pct_with_result: f64,
}

/// Reference vs competitor volume for one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialMix {
    pub key: Option<String>,
    pub total: usize,
    pub reference: usize,
    pub competitor: usize,
    pub pct_reference: f64,
}

/// Soy vs corn volume for one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropSplit {
    pub key: Option<String>,
    pub total: usize,
    pub soy: usize,
    pub corn: usize,
    pub pct_soy: f64,
    pub pct_corn: f64,
}

/// Per-city volume and planted-area potential.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitySummary {
    pub city: Option<String>,
    pub state: Option<String>,
    pub trials: usize,
    pub producers: usize,
    pub with_result: usize,
    pub pct_with_result: f64,
    pub soy_potential_ha: f64,
    pub corn_potential_ha: f64,
    pub total_potential_ha: f64,
}

/// One city inside a region rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityRollup {
    pub city: Option<String>,
    pub trials: usize,
    pub with_result: usize,
    pub awaiting_harvest: usize,
    pub pct_with_result: f64,
    pub producers: usize,
    pub pct_reference: f64,
    pub dominant_crop: Option<String>,
    pub top_agent: Option<String>,
    pub multiple_agents: bool,
    /// Busiest producer under the top agent.
    pub top_producer: Option<String>,
    pub top_producer_trials: usize,
}

/// Region rollup with its busiest cities expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionRollup {
    pub region: Option<String>,
    pub trials: usize,
    pub pct_of_total: f64,
    pub with_result: usize,
    pub pct_with_result: f64,
    pub pct_reference: f64,
    pub cities: Vec<CityRollup>,
    pub other_cities: usize,
    pub other_city_trials: usize,
}

/// Trial counts per area-potential band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaBandRow {
    pub band: &'static str,
    pub soy: usize,
    pub corn: usize,
    pub total: usize,
    pub pct_soy: f64,
    pub pct_corn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaBandProfile {
    /// Always the five bands, in ascending area order.
    pub rows: Vec<AreaBandRow>,
    pub high_potential_pct_soy: f64,
    pub high_potential_pct_corn: f64,
    pub dominant_band_soy: Option<&'static str>,
    pub dominant_band_corn: Option<&'static str>,
}

pub fn kpis(df: &DataFrame) -> Result<KpiSnapshot, TrialError> {
    let total_trials = distinct_count(df, trial::TRIAL_ID)?;
    let total_producers = distinct_count(df, producer::PRODUCER_ID)?;

    let with_result = count_eq(df, derived::TRIAL_STATUS, status::HAS_RESULT)?;
    let awaiting_harvest = count_eq(df, derived::TRIAL_STATUS, status::AWAITING_HARVEST)?;
    let undefined = count_eq(df, derived::TRIAL_STATUS, status::UNDEFINED)?;

    // Farm areas repeat on every trial of a producer; dedupe before summing.
    // A row with no producer key still contributes once.
    let ids = df.column(producer::PRODUCER_ID)?.str()?;
    let soy_areas = df.column(producer::FARM_AREA_SOY_HA)?.f64()?;
    let corn_areas = df.column(producer::FARM_AREA_CORN_HA)?.f64()?;

    let mut seen: HashSet<Option<&str>> = HashSet::new();
    let mut soy_potential = 0.0;
    let mut corn_potential = 0.0;
    for i in 0..df.height() {
        if !seen.insert(ids.get(i)) {
            continue;
        }
        soy_potential += soy_areas.get(i).unwrap_or(0.0);
        corn_potential += corn_areas.get(i).unwrap_or(0.0);
    }

    Ok(KpiSnapshot {
        total_trials,
        total_producers,
        with_result,
        awaiting_harvest,
        undefined,
        pct_with_result: pct(with_result, total_trials),
        pct_awaiting_harvest: pct(awaiting_harvest, total_trials),
        pct_undefined: pct(undefined, total_trials),
        trials_per_producer: if total_producers == 0 {
            0.0
        } else {
            round1(total_trials as f64 / total_producers as f64)
        },
        soy_potential_ha: round1(soy_potential),
        corn_potential_ha: round1(corn_potential),
        // An undeclared area reads as zero, so the mean spreads the summed
        // potential over every distinct producer.
        mean_soy_ha_per_producer: mean_over(soy_potential, total_producers),
        mean_corn_ha_per_producer: mean_over(corn_potential, total_producers),
    })
}

/// Status counts per distinct value of `column`, busiest first.
pub fn status_breakdown(df: &DataFrame, column: &str) -> Result<Vec<StatusBreakdown>, TrialError> {
    let mut rows = Vec::new();
    for part in df.partition_by([column], true)? {
        let total = part.height();
        let with_result = count_eq(&part, derived::TRIAL_STATUS, status::HAS_RESULT)?;
        rows.push(StatusBreakdown {
            key: first_str(&part, column)?,
            total,
            with_result,
            awaiting_harvest: count_eq(&part, derived::TRIAL_STATUS, status::AWAITING_HARVEST)?,
            undefined: count_eq(&part, derived::TRIAL_STATUS, status::UNDEFINED)?,
            pct_with_result: pct(with_result, total),
        });
    }
    sort_by_volume(&mut rows, |r| (r.total, r.key.clone()));
    Ok(rows)
}

/// Reference vs competitor volume per distinct value of `column`.
pub fn material_mix(df: &DataFrame, column: &str) -> Result<Vec<MaterialMix>, TrialError> {
    let mut rows = Vec::new();
    for part in df.partition_by([column], true)? {
        let total = part.height();
        let reference = count_eq(&part, derived::MATERIAL_CATEGORY, category::REFERENCE)?;
        rows.push(MaterialMix {
            key: first_str(&part, column)?,
            total,
            reference,
            competitor: total - reference,
            pct_reference: pct(reference, total),
        });
    }
    sort_by_volume(&mut rows, |r| (r.total, r.key.clone()));
    Ok(rows)
}

/// Soy vs corn volume per distinct value of `column`.
pub fn crop_split(df: &DataFrame, column: &str) -> Result<Vec<CropSplit>, TrialError> {
    let mut rows = Vec::new();
    for part in df.partition_by([column], true)? {
        let total = part.height();
        let soy = count_eq(&part, trial::CROP, crop::SOY)?;
        let corn = count_eq(&part, trial::CROP, crop::CORN)?;
        rows.push(CropSplit {
            key: first_str(&part, column)?,
            total,
            soy,
            corn,
            pct_soy: pct(soy, total),
            pct_corn: pct(corn, total),
        });
    }
    sort_by_volume(&mut rows, |r| (r.total, r.key.clone()));
    Ok(rows)
}

/// Per-city volume, producer counts and deduped planted-area potential.
pub fn city_summary(df: &DataFrame) -> Result<Vec<CitySummary>, TrialError> {
    let mut rows = Vec::new();
    for part in df.partition_by([geo::CITY, geo::STATE], true)? {
        let trials = part.height();
        let with_result = count_eq(&part, derived::TRIAL_STATUS, status::HAS_RESULT)?;
        let (soy_potential, corn_potential) = deduped_potential(&part)?;
        rows.push(CitySummary {
            city: first_str(&part, geo::CITY)?,
            state: first_str(&part, geo::STATE)?,
            trials,
            producers: distinct_count(&part, producer::PRODUCER_ID)?,
            with_result,
            pct_with_result: pct(with_result, trials),
            soy_potential_ha: round1(soy_potential),
            corn_potential_ha: round1(corn_potential),
            total_potential_ha: round1(soy_potential + corn_potential),
        });
    }
    sort_by_volume(&mut rows, |r| (r.trials, r.city.clone()));
    Ok(rows)
}

/// Region rollup with the `city_limit` busiest cities expanded and the rest
/// folded into a remainder count.
pub fn region_drilldown(
    df: &DataFrame,
    city_limit: usize,
) -> Result<Vec<RegionRollup>, TrialError> {
    let grand_total = df.height();
    let mut regions = Vec::new();
    for part in df.partition_by([geo::REGION], true)? {
        let trials = part.height();
        let with_result = count_eq(&part, derived::TRIAL_STATUS, status::HAS_RESULT)?;
        let reference = count_eq(&part, derived::MATERIAL_CATEGORY, category::REFERENCE)?;

        let mut cities = Vec::new();
        for city_part in part.partition_by([geo::CITY], true)? {
            cities.push(city_rollup(&city_part)?);
        }
        sort_by_volume(&mut cities, |c| (c.trials, c.city.clone()));
        let other_cities = cities.len().saturating_sub(city_limit);
        let other_city_trials: usize = cities.iter().skip(city_limit).map(|c| c.trials).sum();
        cities.truncate(city_limit);

        regions.push(RegionRollup {
            region: first_str(&part, geo::REGION)?,
            trials,
            pct_of_total: pct(trials, grand_total),
            with_result,
            pct_with_result: pct(with_result, trials),
            pct_reference: pct(reference, trials),
            cities,
            other_cities,
            other_city_trials,
        });
    }
    sort_by_volume(&mut regions, |r| (r.trials, r.region.clone()));
    Ok(regions)
}

fn city_rollup(part: &DataFrame) -> Result<CityRollup, TrialError> {
    let trials = part.height();
    let with_result = count_eq(part, derived::TRIAL_STATUS, status::HAS_RESULT)?;
    let reference = count_eq(part, derived::MATERIAL_CATEGORY, category::REFERENCE)?;

    let top_agent = dominant(part, personnel::AGENT_NAME)?;
    let agents = distinct_count(part, personnel::AGENT_NAME)?;

    // The busiest producer is read inside the top agent's slice, so the pair
    // shown together actually worked together.
    let (top_producer, top_producer_trials) = match &top_agent {
        Some((agent, _)) => {
            let scoped = part
                .clone()
                .lazy()
                .filter(col(personnel::AGENT_NAME).eq(lit(agent.clone())))
                .collect()?;
            match dominant(&scoped, producer::PRODUCER_NAME)? {
                Some((name, n)) => (Some(name), n),
                None => (None, 0),
            }
        }
        None => (None, 0),
    };

    Ok(CityRollup {
        city: first_str(part, geo::CITY)?,
        trials,
        with_result,
        awaiting_harvest: count_eq(part, derived::TRIAL_STATUS, status::AWAITING_HARVEST)?,
        pct_with_result: pct(with_result, trials),
        producers: distinct_count(part, producer::PRODUCER_ID)?,
        pct_reference: pct(reference, trials),
        dominant_crop: dominant(part, trial::CROP)?.map(|(v, _)| v),
        top_agent: top_agent.map(|(v, _)| v),
        multiple_agents: agents > 1,
        top_producer,
        top_producer_trials,
    })
}

/// Trial counts per area-potential band for both crops, with the share of
/// trials sitting in the two highest bands.
pub fn area_band_profile(df: &DataFrame) -> Result<AreaBandProfile, TrialError> {
    let soy_counts = band_counts(df, derived::AREA_TIER_SOY)?;
    let corn_counts = band_counts(df, derived::AREA_TIER_CORN)?;
    let soy_total: usize = soy_counts.iter().sum();
    let corn_total: usize = corn_counts.iter().sum();

    let rows = area_band::ALL
        .iter()
        .enumerate()
        .map(|(i, band)| {
            let soy = soy_counts[i];
            let corn = corn_counts[i];
            let total = soy + corn;
            AreaBandRow {
                band,
                soy,
                corn,
                total,
                pct_soy: pct(soy, soy_total),
                pct_corn: pct(corn, corn_total),
            }
        })
        .collect();

    let high = |counts: &[usize; 5], total: usize| {
        let n: usize = area_band::ALL
            .iter()
            .enumerate()
            .filter(|(_, b)| area_band::HIGH_POTENTIAL.contains(b))
            .map(|(i, _)| counts[i])
            .sum();
        pct(n, total)
    };

    Ok(AreaBandProfile {
        rows,
        high_potential_pct_soy: high(&soy_counts, soy_total),
        high_potential_pct_corn: high(&corn_counts, corn_total),
        dominant_band_soy: dominant_band(&soy_counts),
        dominant_band_corn: dominant_band(&corn_counts),
    })
}

fn band_counts(df: &DataFrame, column: &str) -> Result<[usize; 5], TrialError> {
    let values = df.column(column)?.str()?;
    let mut counts = [0usize; 5];
    for value in values.into_iter().flatten() {
        if let Some(i) = area_band::ALL.iter().position(|b| *b == value) {
            counts[i] += 1;
        }
    }
    Ok(counts)
}

fn dominant_band(counts: &[usize; 5]) -> Option<&'static str> {
    let (best, n) = counts
        .iter()
        .copied()
        .enumerate()
        .max_by_key(|&(i, n)| (n, std::cmp::Reverse(i)))?;
    if n == 0 {
        None
    } else {
        Some(area_band::ALL[best])
    }
}

// ── Shared reduction helpers ────────────────────────────────────────────────

/// Rows where the string column equals `value`.
pub(crate) fn count_eq(df: &DataFrame, column: &str, value: &str) -> Result<usize, TrialError> {
    let values = df.column(column)?.str()?;
    Ok(values.into_iter().flatten().filter(|v| *v == value).count())
}

/// Distinct non-null values of a string column.
pub(crate) fn distinct_count(df: &DataFrame, column: &str) -> Result<usize, TrialError> {
    let values = df.column(column)?.str()?;
    let set: HashSet<&str> = values.into_iter().flatten().collect();
    Ok(set.len())
}

/// Most frequent non-null value; ties break to the lexicographically
/// smallest so rollups are deterministic.
pub(crate) fn dominant(
    df: &DataFrame,
    column: &str,
) -> Result<Option<(String, usize)>, TrialError> {
    let values = df.column(column)?.str()?;
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }
    Ok(counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(v, n)| (v.to_string(), n)))
}

fn first_str(df: &DataFrame, column: &str) -> Result<Option<String>, TrialError> {
    Ok(df.column(column)?.str()?.get(0).map(|s| s.to_string()))
}

/// Sum farm areas once per distinct producer within the slice.
fn deduped_potential(df: &DataFrame) -> Result<(f64, f64), TrialError> {
    let ids = df.column(producer::PRODUCER_ID)?.str()?;
    let soy = df.column(producer::FARM_AREA_SOY_HA)?.f64()?;
    let corn = df.column(producer::FARM_AREA_CORN_HA)?.f64()?;

    let mut seen: HashSet<Option<&str>> = HashSet::new();
    let mut soy_sum = 0.0;
    let mut corn_sum = 0.0;
    for i in 0..df.height() {
        if !seen.insert(ids.get(i)) {
            continue;
        }
        soy_sum += soy.get(i).unwrap_or(0.0);
        corn_sum += corn.get(i).unwrap_or(0.0);
    }
    Ok((soy_sum, corn_sum))
}

fn sort_by_volume<T, K: Ord>(rows: &mut [T], key: impl Fn(&T) -> (usize, K)) {
    rows.sort_by(|a, b| {
        let (na, ka) = key(a);
        let (nb, kb) = key(b);
        nb.cmp(&na).then(ka.cmp(&kb))
    });
}

/// Share of `part` in `total` as a percentage, one decimal. An empty total
/// reads as zero rather than dividing by it.
pub(crate) fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round1(part as f64 / total as f64 * 100.0)
    }
}

pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn mean_over(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        round1(sum / count as f64)
    }
}
