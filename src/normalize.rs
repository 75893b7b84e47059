use polars::prelude::*;

use crate::error::TrialError;
use crate::schema::{geo, personnel, producer, trial};

/// Columns every snapshot of the view must carry. The environment columns
/// (`schema::environment`) are deliberately not listed here.
const REQUIRED: [&str; 22] = [
    trial::TRIAL_ID,
    trial::PLANTING_DATE,
    trial::HARVEST_DATE,
    trial::YIELD_SC_HA,
    trial::YIELD_SC_HA_CORRECTED,
    trial::PLOT_AREA_HA,
    trial::HARVEST_MOISTURE,
    trial::THOUSAND_GRAIN_WEIGHT_G,
    trial::DAMAGED_GRAINS_PCT,
    trial::CROP,
    trial::SEASON_PHASE,
    trial::MATERIAL,
    trial::IS_REFERENCE_BRAND,
    producer::PRODUCER_ID,
    producer::PRODUCER_NAME,
    producer::FARM_AREA_SOY_HA,
    producer::FARM_AREA_CORN_HA,
    geo::REGION,
    geo::STATE,
    geo::CITY,
    personnel::AGENT_NAME,
    personnel::AGENT_TEAM,
];

pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), TrialError> {
    for &name in required {
        if df.column(name).is_err() {
            return Err(TrialError::MissingColumn(name.to_string()));
        }
    }
    Ok(())
}

/// Normalize a raw snapshot of the view.
///
/// - Date columns are parsed to `Date`. The view contract delivers dates as
///   ISO `%Y-%m-%d` strings (or an already-typed `Date` column); any other
///   format, like a malformed or absent string, becomes null, never an
///   error.
/// - The six measured quantities in `trial::ZERO_IS_MISSING` are cast to
///   Float64 and a literal zero becomes null ("not yet measured"). No other
///   column gets this treatment.
/// - The reference-brand flag is coerced to a nullable Boolean regardless of
///   whether the view delivers it as boolean, numeric or text.
pub fn normalize(df: DataFrame) -> Result<DataFrame, TrialError> {
    require_columns(&df, &REQUIRED)?;

    let mut exprs: Vec<Expr> = Vec::new();
    exprs.push(date_expr(&df, trial::PLANTING_DATE)?);
    exprs.push(date_expr(&df, trial::HARVEST_DATE)?);

    for name in trial::ZERO_IS_MISSING {
        let value = col(name).cast(DataType::Float64);
        exprs.push(
            when(value.clone().eq(lit(0.0)))
                .then(lit(NULL).cast(DataType::Float64))
                .otherwise(value)
                .alias(name),
        );
    }

    for name in [
        producer::FARM_AREA_SOY_HA,
        producer::FARM_AREA_CORN_HA,
    ] {
        exprs.push(col(name).cast(DataType::Float64));
    }

    exprs.push(reference_flag_expr(&df)?);

    let df = df.lazy().with_columns(exprs).collect()?;
    tracing::debug!(rows = df.height(), "normalized raw snapshot");
    Ok(df)
}

/// Parse a date column to `Date`, tolerating malformed values.
fn date_expr(df: &DataFrame, name: &str) -> Result<Expr, TrialError> {
    let dtype = df.column(name)?.dtype().clone();
    let expr = match dtype {
        DataType::Date => col(name),
        DataType::String => col(name).str().to_date(StrptimeOptions {
            format: Some("%Y-%m-%d".into()),
            strict: false,
            ..Default::default()
        }),
        DataType::Null => col(name).cast(DataType::Date),
        other => {
            return Err(TrialError::InvalidData(format!(
                "column '{name}' has unsupported dtype {other} for a date"
            )))
        }
    };
    Ok(expr.alias(name))
}

/// Coerce the tri-state reference-brand flag to a nullable Boolean.
fn reference_flag_expr(df: &DataFrame) -> Result<Expr, TrialError> {
    let name = trial::IS_REFERENCE_BRAND;
    let dtype = df.column(name)?.dtype().clone();
    let expr = match dtype {
        DataType::Boolean => col(name),
        DataType::String => col(name).str().to_lowercase().eq(lit("true")),
        DataType::Null => col(name).cast(DataType::Boolean),
        dt if dt.is_primitive_numeric() => col(name).cast(DataType::Float64).eq(lit(1.0)),
        other => {
            return Err(TrialError::InvalidData(format!(
                "column '{name}' has unsupported dtype {other} for a flag"
            )))
        }
    };
    Ok(expr.alias(name))
}
