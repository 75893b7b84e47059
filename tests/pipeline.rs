//! End-to-end scenarios through the public API: raw snapshot in, enriched
//! table, filters and aggregations out.

use polars::prelude::*;

use agritrial_core::schema::{adoption, area_band, derived, geo, personnel, producer, status, trial};
use agritrial_core::{enrich, kpis, FilterSelection};

/// One raw row of the view, with defaults so scenarios only spell out what
/// they exercise.
#[derive(Clone)]
struct Raw {
    trial_id: &'static str,
    producer_id: Option<&'static str>,
    planting: Option<&'static str>,
    harvest: Option<&'static str>,
    yield_corrected: Option<f64>,
    crop: &'static str,
    material: &'static str,
    is_reference: Option<f64>,
    region: &'static str,
    farm_area_soy: Option<f64>,
}

impl Default for Raw {
    fn default() -> Self {
        Self {
            trial_id: "t-1",
            producer_id: Some("p-1"),
            planting: None,
            harvest: None,
            yield_corrected: None,
            crop: "Soy",
            material: "REF 100",
            is_reference: Some(1.0),
            region: "North",
            farm_area_soy: Some(100.0),
        }
    }
}

fn snapshot(rows: &[Raw]) -> DataFrame {
    df!(
        trial::TRIAL_ID => rows.iter().map(|r| r.trial_id).collect::<Vec<_>>(),
        producer::PRODUCER_ID => rows.iter().map(|r| r.producer_id).collect::<Vec<_>>(),
        producer::PRODUCER_NAME => rows.iter().map(|_| "Farm One").collect::<Vec<_>>(),
        trial::PLANTING_DATE => rows.iter().map(|r| r.planting).collect::<Vec<_>>(),
        trial::HARVEST_DATE => rows.iter().map(|r| r.harvest).collect::<Vec<_>>(),
        trial::YIELD_SC_HA => rows.iter().map(|r| r.yield_corrected).collect::<Vec<_>>(),
        trial::YIELD_SC_HA_CORRECTED => rows.iter().map(|r| r.yield_corrected).collect::<Vec<_>>(),
        trial::PLOT_AREA_HA => rows.iter().map(|_| None::<f64>).collect::<Vec<_>>(),
        trial::HARVEST_MOISTURE => rows.iter().map(|_| None::<f64>).collect::<Vec<_>>(),
        trial::THOUSAND_GRAIN_WEIGHT_G => rows.iter().map(|_| None::<f64>).collect::<Vec<_>>(),
        trial::DAMAGED_GRAINS_PCT => rows.iter().map(|_| None::<f64>).collect::<Vec<_>>(),
        trial::CROP => rows.iter().map(|r| r.crop).collect::<Vec<_>>(),
        trial::SEASON_PHASE => rows.iter().map(|_| "Summer").collect::<Vec<_>>(),
        trial::MATERIAL => rows.iter().map(|r| r.material).collect::<Vec<_>>(),
        trial::IS_REFERENCE_BRAND => rows.iter().map(|r| r.is_reference).collect::<Vec<_>>(),
        geo::REGION => rows.iter().map(|r| r.region).collect::<Vec<_>>(),
        geo::STATE => rows.iter().map(|_| "ST").collect::<Vec<_>>(),
        geo::CITY => rows.iter().map(|_| "Springfield").collect::<Vec<_>>(),
        producer::FARM_AREA_SOY_HA => rows.iter().map(|r| r.farm_area_soy).collect::<Vec<_>>(),
        producer::FARM_AREA_CORN_HA => rows.iter().map(|_| None::<f64>).collect::<Vec<_>>(),
        personnel::AGENT_NAME => rows.iter().map(|_| "Agent A").collect::<Vec<_>>(),
        personnel::AGENT_TEAM => rows.iter().map(|_| "Team A").collect::<Vec<_>>(),
    )
    .unwrap()
}

fn cell(df: &DataFrame, column: &str, row: usize) -> Option<String> {
    df.column(column)
        .unwrap()
        .str()
        .unwrap()
        .get(row)
        .map(|s| s.to_string())
}

#[test]
fn status_counts_across_a_mixed_snapshot() {
    let full = Raw {
        planting: Some("2024-09-10"),
        harvest: Some("2025-02-01"),
        yield_corrected: Some(70.0),
        ..Default::default()
    };
    let awaiting = Raw {
        planting: Some("2024-09-10"),
        ..Default::default()
    };
    let ids = [
        "t-1", "t-2", "t-3", "t-4", "t-5", "t-6", "t-7", "t-8", "t-9", "t-10",
    ];
    let mut rows = Vec::new();
    for &id in &ids[..4] {
        rows.push(Raw {
            trial_id: id,
            ..full.clone()
        });
    }
    for &id in &ids[4..7] {
        rows.push(Raw {
            trial_id: id,
            ..awaiting.clone()
        });
    }
    for &id in &ids[7..] {
        rows.push(Raw {
            trial_id: id,
            ..Default::default()
        });
    }

    let enriched = enrich(snapshot(&rows)).unwrap();
    let k = kpis(&enriched).unwrap();
    assert_eq!(k.total_trials, 10);
    assert_eq!(k.with_result, 4);
    assert_eq!(k.awaiting_harvest, 3);
    assert_eq!(k.undefined, 3);
    assert_eq!(k.pct_with_result, 40.0);
}

#[test]
fn three_of_five_reference_trials_make_a_mixed_producer() {
    let ids = ["t-1", "t-2", "t-3", "t-4", "t-5"];
    let rows: Vec<Raw> = ids
        .iter()
        .enumerate()
        .map(|(i, &id)| Raw {
            trial_id: id,
            is_reference: Some(if i < 3 { 1.0 } else { 0.0 }),
            ..Default::default()
        })
        .collect();

    let enriched = enrich(snapshot(&rows)).unwrap();
    for i in 0..5 {
        assert_eq!(
            cell(&enriched, derived::PRODUCER_ADOPTION_TIER, i).as_deref(),
            Some(adoption::MIXED),
            "row {i}"
        );
    }
}

#[test]
fn area_band_edges_split_at_the_boundary() {
    let rows = [
        Raw {
            trial_id: "t-1",
            farm_area_soy: Some(500.0),
            ..Default::default()
        },
        Raw {
            trial_id: "t-2",
            farm_area_soy: Some(500.01),
            ..Default::default()
        },
    ];

    let enriched = enrich(snapshot(&rows)).unwrap();
    assert_eq!(
        cell(&enriched, derived::AREA_TIER_SOY, 0).as_deref(),
        Some(area_band::FROM_200_TO_500)
    );
    assert_eq!(
        cell(&enriched, derived::AREA_TIER_SOY, 1).as_deref(),
        Some(area_band::FROM_500_TO_2500)
    );
}

#[test]
fn filters_narrow_the_table_the_kpis_see() {
    let rows = [
        Raw {
            trial_id: "t-1",
            region: "North",
            planting: Some("2024-09-10"),
            harvest: Some("2025-02-01"),
            yield_corrected: Some(70.0),
            ..Default::default()
        },
        Raw {
            trial_id: "t-2",
            region: "South",
            ..Default::default()
        },
    ];
    let enriched = enrich(snapshot(&rows)).unwrap();

    let mut sel = FilterSelection::default();
    sel.regions.insert("North".to_string());
    let slice = sel.apply(&enriched).unwrap();

    let k = kpis(&slice).unwrap();
    assert_eq!(k.total_trials, 1);
    assert_eq!(k.with_result, 1);
    assert_eq!(
        cell(&slice, derived::TRIAL_STATUS, 0).as_deref(),
        Some(status::HAS_RESULT)
    );
}
