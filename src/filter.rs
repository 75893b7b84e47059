use std::collections::BTreeSet;

use polars::prelude::*;

use crate::error::TrialError;
use crate::schema::{derived, geo, personnel, trial};

/// A filterable dimension of the enriched table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Crop,
    Season,
    Region,
    State,
    City,
    Status,
    Agent,
    Team,
}

impl Dimension {
    /// Fixed order in which dependent option lists cascade.
    pub const CASCADE: [Dimension; 8] = [
        Dimension::Crop,
        Dimension::Season,
        Dimension::Region,
        Dimension::State,
        Dimension::City,
        Dimension::Status,
        Dimension::Agent,
        Dimension::Team,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Dimension::Crop => trial::CROP,
            Dimension::Season => derived::SEASON_FULL,
            Dimension::Region => geo::REGION,
            Dimension::State => geo::STATE,
            Dimension::City => geo::CITY,
            Dimension::Status => derived::TRIAL_STATUS,
            Dimension::Agent => personnel::AGENT_NAME,
            Dimension::Team => personnel::AGENT_TEAM,
        }
    }
}

/// Filter state for one recomputation. Owned by the presentation layer and
/// passed in by value; the engine keeps nothing between calls.
///
/// An empty set (or `None`) means "no restriction" on that dimension. Crop
/// and season are single-choice, the rest are multi-select.
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    pub crop: Option<String>,
    pub season: Option<String>,
    pub regions: BTreeSet<String>,
    pub states: BTreeSet<String>,
    pub cities: BTreeSet<String>,
    pub statuses: BTreeSet<String>,
    pub agents: BTreeSet<String>,
    pub teams: BTreeSet<String>,
}

impl FilterSelection {
    fn predicate(&self, dim: Dimension) -> Option<Expr> {
        let column = col(dim.column());
        match dim {
            Dimension::Crop => self.crop.as_ref().map(|v| column.eq(lit(v.clone()))),
            Dimension::Season => self.season.as_ref().map(|v| column.eq(lit(v.clone()))),
            Dimension::Region => membership(column, &self.regions),
            Dimension::State => membership(column, &self.states),
            Dimension::City => membership(column, &self.cities),
            Dimension::Status => membership(column, &self.statuses),
            Dimension::Agent => membership(column, &self.agents),
            Dimension::Team => membership(column, &self.teams),
        }
    }

    /// Apply the selection as a flat conjunction over the full table.
    ///
    /// Selections never invalidate each other here; only the option lists
    /// (`options`) cascade.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame, TrialError> {
        let mut combined: Option<Expr> = None;
        for dim in Dimension::CASCADE {
            if let Some(pred) = self.predicate(dim) {
                combined = Some(match combined {
                    Some(acc) => acc.and(pred),
                    None => pred,
                });
            }
        }
        match combined {
            Some(expr) => Ok(df.clone().lazy().filter(expr).collect()?),
            None => Ok(df.clone()),
        }
    }

    /// Option list for one dimension: the distinct values remaining after the
    /// selections of every dimension *before* it in `Dimension::CASCADE` are
    /// applied. The dimension's own selection never narrows its own options.
    pub fn options(&self, df: &DataFrame, dim: Dimension) -> Result<Vec<String>, TrialError> {
        let mut combined: Option<Expr> = None;
        for earlier in Dimension::CASCADE {
            if earlier == dim {
                break;
            }
            if let Some(pred) = self.predicate(earlier) {
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
        distinct_values(&narrowed, dim.column())
    }
}

fn membership(column: Expr, values: &BTreeSet<String>) -> Option<Expr> {
    if values.is_empty() {
        return None;
    }
    let allowed: Vec<String> = values.iter().cloned().collect();
    Some(column.is_in(lit(Series::new("".into(), allowed)), false))
}

/// Sorted distinct non-null values of a string column.
pub fn distinct_values(df: &DataFrame, column: &str) -> Result<Vec<String>, TrialError> {
    let values = df.column(column)?.str()?;
    let set: BTreeSet<String> = values
        .into_iter()
        .flatten()
        .map(|s| s.to_string())
        .collect();
    Ok(set.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::enrich;
    use crate::testkit::{raw_frame, TrialRow};

    fn sample() -> DataFrame {
        enrich(
            raw_frame(&[
                TrialRow {
                    region: "North",
                    state: "AA",
                    city: "Alpha",
                    ..Default::default()
                },
                TrialRow {
                    region: "North",
                    state: "BB",
                    city: "Beta",
                    ..Default::default()
                },
                TrialRow {
                    region: "South",
                    state: "CC",
                    city: "Gamma",
                    agent: "Agent B",
                    ..Default::default()
                },
            ])
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn empty_selection_is_identity() {
        let df = sample();
        let out = FilterSelection::default().apply(&df).unwrap();
        assert_eq!(out.height(), df.height());
    }

    #[test]
    fn options_cascade_from_earlier_dimensions() {
        let df = sample();
        let mut sel = FilterSelection::default();
        sel.regions.insert("North".to_string());

        assert_eq!(
            sel.options(&df, Dimension::State).unwrap(),
            vec!["AA".to_string(), "BB".to_string()]
        );
        // A region selection never narrows the region list itself.
        assert_eq!(
            sel.options(&df, Dimension::Region).unwrap(),
            vec!["North".to_string(), "South".to_string()]
        );
    }

    #[test]
    fn later_selections_do_not_narrow_earlier_options() {
        let df = sample();
        let mut sel = FilterSelection::default();
        sel.agents.insert("Agent B".to_string());

        // Agent comes after state in the cascade, so state options ignore it.
        assert_eq!(
            sel.options(&df, Dimension::State).unwrap(),
            vec!["AA".to_string(), "BB".to_string(), "CC".to_string()]
        );
    }

    #[test]
    fn applied_filter_is_a_flat_conjunction() {
        let df = sample();
        let mut sel = FilterSelection::default();
        sel.regions.insert("North".to_string());
        sel.states.insert("CC".to_string());

        // CC only exists in the South; conjunction over the full table gives
        // an empty slice rather than dropping one of the selections.
        let out = sel.apply(&df).unwrap();
        assert_eq!(out.height(), 0);
    }

    #[test]
    fn multi_select_keeps_all_chosen_values() {
        let df = sample();
        let mut sel = FilterSelection::default();
        sel.cities.insert("Alpha".to_string());
        sel.cities.insert("Gamma".to_string());

        let out = sel.apply(&df).unwrap();
        assert_eq!(out.height(), 2);
    }
}
