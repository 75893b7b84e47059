use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::error::TrialError;
use crate::normalize;
use crate::schema::{adoption, area_band, category, derived, producer, season, status, trial};

/// Run the full enrichment pipeline on a raw snapshot of the view:
/// normalization, then every derived column. Each derivation is a pure
/// function of the normalized fields; none feeds back into another record.
pub fn enrich(df: DataFrame) -> Result<DataFrame, TrialError> {
    let df = normalize::normalize(df)?;
    let df = df
        .lazy()
        .with_columns([status_expr(), material_category_expr()])
        // The adoption tier reads the derived material category.
        .with_columns([adoption_tier_expr()])
        .with_columns([
            area_band_expr(producer::FARM_AREA_SOY_HA, derived::AREA_TIER_SOY),
            area_band_expr(producer::FARM_AREA_CORN_HA, derived::AREA_TIER_CORN),
        ])
        .collect()?;
    let df = with_season_columns(df)?;
    tracing::info!(rows = df.height(), "enriched trial snapshot");
    Ok(df)
}

/// Trial status from planting/harvest/yield presence.
///
/// A row with no planting date is always `Undefined`, even when a harvest
/// date or a yield is present.
fn status_expr() -> Expr {
    let has_planting = col(trial::PLANTING_DATE).is_not_null();
    let has_harvest = col(trial::HARVEST_DATE).is_not_null();
    let has_yield = col(trial::YIELD_SC_HA_CORRECTED)
        .is_not_null()
        .and(col(trial::YIELD_SC_HA_CORRECTED).gt(lit(0.0)));

    let awaiting = has_planting
        .clone()
        .and(has_harvest.clone())
        .and(has_yield.clone().not())
        .or(has_planting
            .clone()
            .and(has_harvest.clone().not())
            .and(has_yield.clone().not()));

    when(has_planting.and(has_harvest).and(has_yield))
        .then(lit(status::HAS_RESULT))
        .when(awaiting)
        .then(lit(status::AWAITING_HARVEST))
        .otherwise(lit(status::UNDEFINED))
        .alias(derived::TRIAL_STATUS)
}

/// Reference-brand flag to material category. An unknown flag counts as
/// competitor so the dashboard never shows a third category.
fn material_category_expr() -> Expr {
    when(col(trial::IS_REFERENCE_BRAND).eq(lit(true)))
        .then(lit(category::REFERENCE))
        .otherwise(lit(category::COMPETITOR))
        .alias(derived::MATERIAL_CATEGORY)
}

/// Share of reference-brand trials per (producer, crop) group, bucketed into
/// the five adoption tiers and broadcast to every row of the group.
fn adoption_tier_expr() -> Expr {
    let pct = col(derived::MATERIAL_CATEGORY)
        .eq(lit(category::REFERENCE))
        .cast(DataType::Float64)
        .mean()
        .over([col(producer::PRODUCER_ID), col(trial::CROP)]);

    let tier = when(pct.clone().eq(lit(1.0)))
        .then(lit(adoption::ALL_REFERENCE))
        .when(pct.clone().gt(lit(0.7)))
        .then(lit(adoption::MAJORITY_REFERENCE))
        .when(pct.clone().gt_eq(lit(0.3)))
        .then(lit(adoption::MIXED))
        .when(pct.gt(lit(0.0)))
        .then(lit(adoption::MAJORITY_COMPETITOR))
        .otherwise(lit(adoption::ALL_COMPETITOR));

    // A key that cannot identify a producer yields no tier.
    when(
        col(producer::PRODUCER_ID)
            .is_null()
            .or(col(producer::PRODUCER_ID).eq(lit(""))),
    )
    .then(lit(NULL).cast(DataType::String))
    .otherwise(tier)
    .alias(derived::PRODUCER_ADOPTION_TIER)
}

/// Right-closed hectare bands, lowest band inclusive of zero. A missing area
/// stays missing instead of being forced into the first band.
fn area_band_expr(source: &str, out: &str) -> Expr {
    let v = col(source);
    when(v.clone().is_null())
        .then(lit(NULL).cast(DataType::String))
        .when(v.clone().lt_eq(lit(50.0)))
        .then(lit(area_band::UP_TO_50))
        .when(v.clone().lt_eq(lit(200.0)))
        .then(lit(area_band::FROM_50_TO_200))
        .when(v.clone().lt_eq(lit(500.0)))
        .then(lit(area_band::FROM_200_TO_500))
        .when(v.lt_eq(lit(2500.0)))
        .then(lit(area_band::FROM_500_TO_2500))
        .otherwise(lit(area_band::ABOVE_2500))
        .alias(out)
}

/// Agricultural-year label for a planting date, cutover at
/// `season::CUTOVER_MONTH`: Aug 2023 → "2023/24", Mar 2023 → "2022/23".
pub fn agri_year(date: NaiveDate) -> String {
    let start = if date.month() >= season::CUTOVER_MONTH {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{start}/{:02}", (start + 1).rem_euclid(100))
}

/// Append `agri_year` and `season_full`. A row without a planting date gets
/// the sentinel in both columns, never a partial concatenation with the
/// season phase.
fn with_season_columns(mut df: DataFrame) -> Result<DataFrame, TrialError> {
    let (years, full) = {
        let dates = df.column(trial::PLANTING_DATE)?.date()?;
        let phases = df.column(trial::SEASON_PHASE)?.str()?;

        let mut years: Vec<String> = Vec::with_capacity(df.height());
        let mut full: Vec<String> = Vec::with_capacity(df.height());
        for (date, phase) in dates.as_date_iter().zip(phases.into_iter()) {
            match date {
                Some(d) => {
                    let label = agri_year(d);
                    full.push(match phase {
                        Some(p) => format!("{p} {label}"),
                        None => label.clone(),
                    });
                    years.push(label);
                }
                None => {
                    years.push(season::NO_DATE.to_string());
                    full.push(season::NO_DATE.to_string());
                }
            }
        }
        (years, full)
    };

    df.with_column(Series::new(derived::AGRI_YEAR.into(), years))?;
    df.with_column(Series::new(derived::SEASON_FULL.into(), full))?;
    Ok(df)
}
