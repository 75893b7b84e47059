/// Column-name and label constants for the trial-results view.
/// Single source of truth for the contract with the upstream view and
/// for every derived column the enrichment pipeline appends.

// ── Raw view columns ────────────────────────────────────────────────────────
pub mod trial {
    pub const TRIAL_ID: &str = "trial_id";
    pub const PLANTING_DATE: &str = "planting_date";
    pub const HARVEST_DATE: &str = "harvest_date";
    pub const YIELD_SC_HA: &str = "yield_sc_ha";
    pub const YIELD_SC_HA_CORRECTED: &str = "yield_sc_ha_corrected";
    pub const PLOT_AREA_HA: &str = "plot_area_ha";
    pub const HARVEST_MOISTURE: &str = "harvest_moisture";
    pub const THOUSAND_GRAIN_WEIGHT_G: &str = "thousand_grain_weight_g";
    pub const DAMAGED_GRAINS_PCT: &str = "damaged_grains_pct";
    pub const CROP: &str = "crop";
    pub const SEASON_PHASE: &str = "season_phase";
    pub const MATERIAL: &str = "material";
    pub const IS_REFERENCE_BRAND: &str = "is_reference_brand";

    /// Measured quantities where a literal zero means "not yet measured".
    pub const ZERO_IS_MISSING: [&str; 6] = [
        YIELD_SC_HA,
        YIELD_SC_HA_CORRECTED,
        PLOT_AREA_HA,
        HARVEST_MOISTURE,
        THOUSAND_GRAIN_WEIGHT_G,
        DAMAGED_GRAINS_PCT,
    ];
}

pub mod producer {
    pub const PRODUCER_ID: &str = "producer_id";
    pub const PRODUCER_NAME: &str = "producer_name";
    pub const FARM_AREA_SOY_HA: &str = "farm_area_soy_ha";
    pub const FARM_AREA_CORN_HA: &str = "farm_area_corn_ha";
}

pub mod geo {
    pub const REGION: &str = "region";
    pub const STATE: &str = "state";
    pub const CITY: &str = "city";
}

pub mod personnel {
    pub const AGENT_NAME: &str = "agent_name";
    pub const AGENT_TEAM: &str = "agent_team";
}

// ── Optional environment columns ────────────────────────────────────────────
// Present in some deployments of the view; every consumer must tolerate their
// absence.
pub mod environment {
    pub const IRRIGATION: &str = "irrigation";
    pub const SOIL_TEXTURE: &str = "soil_texture";
    pub const SOIL_FERTILITY: &str = "soil_fertility";
    pub const INVESTMENT_LEVEL: &str = "investment_level";
    pub const ALTITUDE_M: &str = "altitude_m";
}

// ── Derived columns ─────────────────────────────────────────────────────────
pub mod derived {
    pub const TRIAL_STATUS: &str = "trial_status";
    pub const MATERIAL_CATEGORY: &str = "material_category";
    pub const PRODUCER_ADOPTION_TIER: &str = "producer_adoption_tier";
    pub const AREA_TIER_SOY: &str = "area_tier_soy";
    pub const AREA_TIER_CORN: &str = "area_tier_corn";
    pub const AGRI_YEAR: &str = "agri_year";
    pub const SEASON_FULL: &str = "season_full";
}

// ── Trial status labels ─────────────────────────────────────────────────────
pub mod status {
    pub const HAS_RESULT: &str = "Has Result";
    pub const AWAITING_HARVEST: &str = "Awaiting Harvest";
    pub const UNDEFINED: &str = "Undefined";

    pub const ALL: [&str; 3] = [HAS_RESULT, AWAITING_HARVEST, UNDEFINED];
}

// ── Material categories ─────────────────────────────────────────────────────
pub mod category {
    pub const REFERENCE: &str = "Reference";
    pub const COMPETITOR: &str = "Competitor";
}

// ── Producer adoption tiers ─────────────────────────────────────────────────
pub mod adoption {
    pub const ALL_REFERENCE: &str = "100% Reference";
    pub const MAJORITY_REFERENCE: &str = "Majority Reference (>70%)";
    pub const MIXED: &str = "Mixed (30–70%)";
    pub const MAJORITY_COMPETITOR: &str = "Majority Competitor (<30%)";
    pub const ALL_COMPETITOR: &str = "100% Competitor";
}

// ── Area-potential bands (hectares, right-closed) ───────────────────────────
pub mod area_band {
    pub const UP_TO_50: &str = "Até 50 ha";
    pub const FROM_50_TO_200: &str = "50 a 200 ha";
    pub const FROM_200_TO_500: &str = "200 a 500 ha";
    pub const FROM_500_TO_2500: &str = "500 a 2.500 ha";
    pub const ABOVE_2500: &str = "Acima de 2.500 ha";

    pub const ALL: [&str; 5] = [
        UP_TO_50,
        FROM_50_TO_200,
        FROM_200_TO_500,
        FROM_500_TO_2500,
        ABOVE_2500,
    ];

    /// Bands counted as high potential in the profile summary.
    pub const HIGH_POTENTIAL: [&str; 2] = [FROM_500_TO_2500, ABOVE_2500];
}

// ── Crops ───────────────────────────────────────────────────────────────────
pub mod crop {
    pub const SOY: &str = "Soy";
    pub const CORN: &str = "Corn";
}

// ── Season labeling ─────────────────────────────────────────────────────────
pub mod season {
    /// Sentinel for rows without a planting date.
    pub const NO_DATE: &str = "no date";
    /// First month of the agricultural year.
    pub const CUTOVER_MONTH: u32 = 7;
}
