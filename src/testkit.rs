//! Builders for raw view snapshots used across unit tests.

use polars::prelude::*;

use crate::schema::{geo, personnel, producer, trial};

/// One raw row of the pre-joined view, with liberal defaults so tests only
/// spell out the fields they care about.
#[derive(Debug, Clone)]
pub struct TrialRow {
    pub trial_id: &'static str,
    pub producer_id: Option<&'static str>,
    pub producer_name: &'static str,
    pub planting: Option<&'static str>,
    pub harvest: Option<&'static str>,
    pub yield_raw: Option<f64>,
    pub yield_corrected: Option<f64>,
    pub plot_area: Option<f64>,
    pub moisture: Option<f64>,
    pub grain_weight: Option<f64>,
    pub damaged_pct: Option<f64>,
    pub crop: &'static str,
    pub season_phase: &'static str,
    pub material: &'static str,
    pub is_reference: Option<f64>,
    pub region: &'static str,
    pub state: &'static str,
    pub city: &'static str,
    pub farm_area_soy: Option<f64>,
    pub farm_area_corn: Option<f64>,
    pub agent: &'static str,
    pub team: &'static str,
}

impl Default for TrialRow {
    fn default() -> Self {
        Self {
            trial_id: "t-1",
            producer_id: Some("p-1"),
            producer_name: "Farm One",
            planting: None,
            harvest: None,
            yield_raw: None,
            yield_corrected: None,
            plot_area: None,
            moisture: None,
            grain_weight: None,
            damaged_pct: None,
            crop: crate::schema::crop::SOY,
            season_phase: "Summer",
            material: "REF 100",
            is_reference: Some(1.0),
            region: "North",
            state: "ST",
            city: "Springfield",
            farm_area_soy: Some(100.0),
            farm_area_corn: Some(100.0),
            agent: "Agent A",
            team: "Team A",
        }
    }
}

/// Assemble rows into a DataFrame shaped like the raw view (dates as strings,
/// reference flag numeric), ready for `normalize`/`enrich`.
pub fn raw_frame(rows: &[TrialRow]) -> PolarsResult<DataFrame> {
    df!(
        trial::TRIAL_ID => rows.iter().map(|r| r.trial_id).collect::<Vec<_>>(),
        producer::PRODUCER_ID => rows.iter().map(|r| r.producer_id).collect::<Vec<_>>(),
        producer::PRODUCER_NAME => rows.iter().map(|r| r.producer_name).collect::<Vec<_>>(),
        trial::PLANTING_DATE => rows.iter().map(|r| r.planting).collect::<Vec<_>>(),
        trial::HARVEST_DATE => rows.iter().map(|r| r.harvest).collect::<Vec<_>>(),
        trial::YIELD_SC_HA => rows.iter().map(|r| r.yield_raw).collect::<Vec<_>>(),
        trial::YIELD_SC_HA_CORRECTED => rows.iter().map(|r| r.yield_corrected).collect::<Vec<_>>(),
        trial::PLOT_AREA_HA => rows.iter().map(|r| r.plot_area).collect::<Vec<_>>(),
        trial::HARVEST_MOISTURE => rows.iter().map(|r| r.moisture).collect::<Vec<_>>(),
        trial::THOUSAND_GRAIN_WEIGHT_G => rows.iter().map(|r| r.grain_weight).collect::<Vec<_>>(),
        trial::DAMAGED_GRAINS_PCT => rows.iter().map(|r| r.damaged_pct).collect::<Vec<_>>(),
        trial::CROP => rows.iter().map(|r| r.crop).collect::<Vec<_>>(),
        trial::SEASON_PHASE => rows.iter().map(|r| r.season_phase).collect::<Vec<_>>(),
        trial::MATERIAL => rows.iter().map(|r| r.material).collect::<Vec<_>>(),
        trial::IS_REFERENCE_BRAND => rows.iter().map(|r| r.is_reference).collect::<Vec<_>>(),
        geo::REGION => rows.iter().map(|r| r.region).collect::<Vec<_>>(),
        geo::STATE => rows.iter().map(|r| r.state).collect::<Vec<_>>(),
        geo::CITY => rows.iter().map(|r| r.city).collect::<Vec<_>>(),
        producer::FARM_AREA_SOY_HA => rows.iter().map(|r| r.farm_area_soy).collect::<Vec<_>>(),
        producer::FARM_AREA_CORN_HA => rows.iter().map(|r| r.farm_area_corn).collect::<Vec<_>>(),
        personnel::AGENT_NAME => rows.iter().map(|r| r.agent).collect::<Vec<_>>(),
        personnel::AGENT_TEAM => rows.iter().map(|r| r.team).collect::<Vec<_>>(),
    )
}

/// String cell accessor for assertions.
pub fn str_at(df: &DataFrame, column: &str, row: usize) -> Option<String> {
    df.column(column)
        .unwrap()
        .str()
        .unwrap()
        .get(row)
        .map(|s| s.to_string())
}
