use crate::config::ChartSettings;

use super::aggregate::{
    distribution, growth, numeric_groups, numeric_groups_within, pivot_counts, scatter_pairs,
    top_n, year_counts, AggregationResult,
};
use super::filter::{apply, FilterState};
use super::model::{CategoryField, Dataset, NumericField, Record};

// ---------------------------------------------------------------------------
// Chart catalogue
// ---------------------------------------------------------------------------

/// Every chart the dashboard can show, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    CityRanking,
    CityGrowth,
    TypeDistribution,
    MsrpByMake,
    YearHistogram,
    PriceVsRange,
    StateHeatmap,
    MsrpByType,
    MakeRanking,
}

impl ChartKind {
    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::CityRanking => "Cities with the most electric vehicles",
            ChartKind::CityGrowth => "Registrations per model year, top cities",
            ChartKind::TypeDistribution => "Electric vehicle type distribution",
            ChartKind::MsrpByMake => "Base MSRP of the top makes",
            ChartKind::YearHistogram => "Model year distribution",
            ChartKind::PriceVsRange => "Base MSRP and electric range of the top makes",
            ChartKind::StateHeatmap => "Registrations per state and model year",
            ChartKind::MsrpByType => "Base MSRP by electric vehicle type",
            ChartKind::MakeRanking => "Electric vehicles per make",
        }
    }

    /// Axis label for the category dimension.
    pub fn category_label(&self) -> &'static str {
        match self {
            ChartKind::CityRanking | ChartKind::CityGrowth => "City",
            ChartKind::TypeDistribution | ChartKind::MsrpByType => "Vehicle type",
            ChartKind::MsrpByMake | ChartKind::MakeRanking | ChartKind::PriceVsRange => "Make",
            ChartKind::YearHistogram => "Model year",
            ChartKind::StateHeatmap => "State",
        }
    }

    /// Axis label for the measured value.
    pub fn value_label(&self) -> &'static str {
        match self {
            ChartKind::MsrpByMake | ChartKind::MsrpByType => "Base MSRP (USD)",
            ChartKind::PriceVsRange => "Electric range (miles)",
            _ => "Vehicles",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub kind: ChartKind,
    pub result: AggregationResult,
}

/// Everything the presentation layer needs for one filter state.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    /// Size of the filtered view.
    pub visible_rows: usize,
    pub charts: Vec<Chart>,
    /// First rows of the filtered view, for the table preview.
    pub preview: Vec<Record>,
}

// ---------------------------------------------------------------------------
// Pipeline: FilterState → FilteredView → charts
// ---------------------------------------------------------------------------

/// Filter `dataset` and compute every enabled chart from the same view.
pub fn run(dataset: &Dataset, filters: &FilterState, settings: &ChartSettings) -> Dashboard {
    let view = apply(dataset, filters);
    let mut charts = Vec::with_capacity(9);

    let cities = top_n(&view, CategoryField::City, settings.top_cities);
    let top_city_names: Vec<String> = cities.entries.iter().map(|(c, _)| c.clone()).collect();
    let city_growth = growth(&view, &top_city_names);

    charts.push(Chart {
        kind: ChartKind::CityRanking,
        result: AggregationResult::CategoryCount(cities),
    });
    charts.push(Chart {
        kind: ChartKind::CityGrowth,
        result: AggregationResult::GroupedSeries(city_growth),
    });
    charts.push(Chart {
        kind: ChartKind::TypeDistribution,
        result: AggregationResult::Distribution(distribution(&view, CategoryField::VehicleType)),
    });

    if settings.msrp_by_make {
        let makes: Vec<String> = top_n(&view, CategoryField::Make, settings.box_plot_makes)
            .entries
            .into_iter()
            .map(|(m, _)| m)
            .collect();
        charts.push(Chart {
            kind: ChartKind::MsrpByMake,
            result: AggregationResult::NumericGroups(numeric_groups_within(
                &view,
                CategoryField::Make,
                NumericField::BaseMsrp,
                &makes,
            )),
        });
    }

    if settings.year_histogram {
        charts.push(Chart {
            kind: ChartKind::YearHistogram,
            result: AggregationResult::GroupedSeries(year_counts(&view, "All vehicles")),
        });
    }

    if settings.price_vs_range {
        let makes: Vec<String> = top_n(&view, CategoryField::Make, settings.scatter_makes)
            .entries
            .into_iter()
            .map(|(m, _)| m)
            .collect();
        charts.push(Chart {
            kind: ChartKind::PriceVsRange,
            result: AggregationResult::Scatter(scatter_pairs(
                &view,
                CategoryField::Make,
                NumericField::BaseMsrp,
                NumericField::ElectricRange,
                &makes,
            )),
        });
    }

    if settings.state_heatmap {
        charts.push(Chart {
            kind: ChartKind::StateHeatmap,
            result: AggregationResult::Pivot(pivot_counts(&view, CategoryField::State)),
        });
    }

    charts.push(Chart {
        kind: ChartKind::MsrpByType,
        result: AggregationResult::NumericGroups(numeric_groups(
            &view,
            CategoryField::VehicleType,
            NumericField::BaseMsrp,
        )),
    });
    charts.push(Chart {
        kind: ChartKind::MakeRanking,
        result: AggregationResult::CategoryCount(top_n(
            &view,
            CategoryField::Make,
            settings.top_makes,
        )),
    });

    log::debug!(
        "Recomputed {} charts over {} of {} rows",
        charts.len(),
        view.len(),
        dataset.len()
    );

    Dashboard {
        visible_rows: view.len(),
        charts,
        preview: view.iter().take(settings.preview_rows).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::{record, scenario};

    fn kinds(d: &Dashboard) -> Vec<ChartKind> {
        d.charts.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn default_settings_produce_the_fixed_chart_set() {
        let ds = Dataset::from_records(scenario()).unwrap();
        let d = run(&ds, &FilterState::initial(&ds), &ChartSettings::default());
        assert_eq!(
            kinds(&d),
            vec![
                ChartKind::CityRanking,
                ChartKind::CityGrowth,
                ChartKind::TypeDistribution,
                ChartKind::MsrpByType,
                ChartKind::MakeRanking,
            ]
        );
        assert_eq!(d.visible_rows, 3);
        assert_eq!(d.preview.len(), 3);
    }

    #[test]
    fn optional_charts_follow_settings() {
        let ds = Dataset::from_records(scenario()).unwrap();
        let settings = ChartSettings {
            year_histogram: true,
            msrp_by_make: true,
            price_vs_range: true,
            state_heatmap: true,
            ..Default::default()
        };
        let d = run(&ds, &FilterState::initial(&ds), &settings);
        assert_eq!(
            kinds(&d),
            vec![
                ChartKind::CityRanking,
                ChartKind::CityGrowth,
                ChartKind::TypeDistribution,
                ChartKind::MsrpByMake,
                ChartKind::YearHistogram,
                ChartKind::PriceVsRange,
                ChartKind::StateHeatmap,
                ChartKind::MsrpByType,
                ChartKind::MakeRanking,
            ]
        );
    }

    #[test]
    fn scatter_uses_the_top_makes_of_the_view() {
        let mut rows = vec![
            record(2020, "BEV", "Seattle", "Tesla", Some(40000.0)),
            record(2020, "BEV", "Seattle", "Tesla", Some(42000.0)),
            record(2021, "BEV", "Kent", "Kia", Some(35000.0)),
        ];
        for r in &mut rows {
            r.electric_range = Some(200.0);
            r.vin = Some("5YJ3E1EA1K".to_string());
        }
        let ds = Dataset::from_records(rows).unwrap();
        let settings = ChartSettings {
            price_vs_range: true,
            state_heatmap: true,
            scatter_makes: 1,
            ..Default::default()
        };
        let d = run(&ds, &FilterState::initial(&ds), &settings);

        let find = |kind: ChartKind| d.charts.iter().find(|c| c.kind == kind).map(|c| &c.result);
        let Some(AggregationResult::Scatter(s)) = find(ChartKind::PriceVsRange) else {
            panic!("scatter chart missing");
        };
        assert_eq!(s.groups.len(), 1);
        assert_eq!(s.groups[0].0, "Tesla");
        assert_eq!(s.groups[0].1.len(), 2);

        let Some(AggregationResult::Pivot(p)) = find(ChartKind::StateHeatmap) else {
            panic!("heatmap missing");
        };
        assert_eq!(p.rows, vec!["WA"]);
        assert_eq!(p.counts, vec![vec![2, 1]]);
    }

    #[test]
    fn growth_follows_the_filtered_city_ranking() {
        let mut rows = Vec::new();
        for _ in 0..5 {
            rows.push(record(2020, "PHEV", "Spokane", "Ford", None));
        }
        rows.push(record(2021, "BEV", "Seattle", "Tesla", None));
        rows.push(record(2022, "BEV", "Kent", "Kia", None));
        let ds = Dataset::from_records(rows).unwrap();

        let settings = ChartSettings {
            top_cities: 1,
            ..Default::default()
        };
        let mut f = FilterState::initial(&ds);
        f.selected_types = ["BEV".to_string()].into();

        let d = run(&ds, &f, &settings);
        let growth = d
            .charts
            .iter()
            .find(|c| c.kind == ChartKind::CityGrowth)
            .unwrap();
        let AggregationResult::GroupedSeries(g) = &growth.result else {
            panic!("growth chart must be a grouped series");
        };
        // Spokane dominates the full dataset but is filtered out here.
        assert_eq!(g.series.len(), 1);
        assert_eq!(g.series[0].name, "Kent");
    }

    #[test]
    fn empty_selection_yields_empty_charts() {
        let ds = Dataset::from_records(scenario()).unwrap();
        let mut f = FilterState::initial(&ds);
        f.selected_types.clear();
        let d = run(&ds, &f, &ChartSettings::default());
        assert_eq!(d.visible_rows, 0);
        assert!(d.charts.iter().all(|c| c.result.is_empty()));
    }
}
