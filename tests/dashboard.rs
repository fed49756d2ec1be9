use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ev_dashboard::config::ChartSettings;
use ev_dashboard::data::aggregate::{
    distribution, growth, numeric_groups, pivot_counts, top_n, AggregationResult,
};
use ev_dashboard::data::cache::DatasetCache;
use ev_dashboard::data::filter::{apply, FilterState};
use ev_dashboard::data::model::{CategoryField, Dataset, NumericField};
use ev_dashboard::data::pipeline::{run, ChartKind};
use tempfile::tempdir;

const HEADER: &str =
    "VIN (1-10),County,City,State,Postal Code,Model Year,Make,Model,Electric Vehicle Type,Electric Range,Base MSRP";

fn write_csv(dir: &Path, rows: &[&str]) -> PathBuf {
    let path = dir.join("Electric_Vehicle_Population_Data.csv");
    let mut body = format!("{HEADER}\n");
    for r in rows {
        body.push_str(r);
        body.push('\n');
    }
    std::fs::write(&path, body).unwrap();
    path
}

fn scenario(dir: &Path) -> PathBuf {
    write_csv(
        dir,
        &[
            "5YJ3E1EA1K,King,Seattle,WA,98101,2020,Tesla,MODEL 3,BEV,220,40000",
            "JTDKARFP0H,King,Bellevue,WA,98004,2020,Toyota,PRIUS PRIME,PHEV,25,",
            "5YJ3E1EA2L,King,Seattle,WA,98101,2021,Tesla,MODEL 3,BEV,266,42000",
            "1N4AZ0CP5D,King,Kent,WA,98031,,Nissan,LEAF,BEV,75,0",
        ],
    )
}

fn names(entries: &[(String, usize)]) -> Vec<(&str, usize)> {
    entries.iter().map(|(k, n)| (k.as_str(), *n)).collect()
}

#[test]
fn scenario_from_file_to_charts() {
    let tmp = tempdir().unwrap();
    let path = scenario(tmp.path());

    let mut cache = DatasetCache::new();
    let ds = cache.get_or_load(&path).unwrap();
    // The Kent row has no model year.
    assert_eq!(ds.len(), 3);

    let mut filters = FilterState::initial(&ds);
    filters.set_year_range(2020, 2021);
    let view = apply(&ds, &filters);

    assert_eq!(
        names(&top_n(&view, CategoryField::City, 10).entries),
        vec![("Seattle", 2), ("Bellevue", 1)]
    );
    assert_eq!(
        names(&distribution(&view, CategoryField::VehicleType).entries),
        vec![("BEV", 2), ("PHEV", 1)]
    );
    assert_eq!(
        numeric_groups(&view, CategoryField::VehicleType, NumericField::BaseMsrp).groups,
        vec![("BEV".to_string(), vec![40000.0, 42000.0])]
    );

    let board = run(&ds, &filters, &ChartSettings::default());
    assert_eq!(board.visible_rows, 3);
    let growth_chart = board
        .charts
        .iter()
        .find(|c| c.kind == ChartKind::CityGrowth)
        .unwrap();
    let AggregationResult::GroupedSeries(g) = &growth_chart.result else {
        panic!("growth must be a grouped series");
    };
    assert_eq!(g.series[0].name, "Seattle");
    assert_eq!(g.series[0].points, vec![(2020, 1), (2021, 1)]);
    assert_eq!(g.series[1].points, vec![(2020, 1)]);
}

/// A larger deterministic table to check the filter and aggregation
/// properties over many filter states.
fn mixed_dataset(dir: &Path) -> Dataset {
    let cities = ["Seattle", "Bellevue", "Redmond", "Kent", ""];
    let makes = ["TESLA", "NISSAN", "KIA", ""];
    let types = ["BEV", "PHEV"];
    let mut rows = Vec::new();
    for i in 0..200usize {
        let year = 2012 + (i * 7 % 12);
        let msrp = if i % 3 == 0 { String::new() } else { format!("{}", 30000 + i * 100) };
        rows.push(format!(
            "V{i:09},King,{},WA,98000,{year},{},X,{},100,{msrp}",
            cities[i % cities.len()],
            makes[i * 3 % makes.len()],
            types[i * 5 % 7 % 2],
        ));
    }
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let path = write_csv(dir, &refs);
    ev_dashboard::data::loader::load_file(&path).unwrap()
}

#[test]
fn filter_and_aggregation_properties_hold() {
    let tmp = tempdir().unwrap();
    let ds = mixed_dataset(tmp.path());
    let (lo, hi) = ds.year_bounds();

    let city_sets: Vec<BTreeSet<String>> = vec![
        BTreeSet::new(),
        ["Seattle".to_string()].into(),
        ["Kent".to_string(), "Redmond".to_string()].into(),
    ];
    let type_sets: Vec<BTreeSet<String>> = vec![
        BTreeSet::new(),
        ["BEV".to_string()].into(),
        ["BEV".to_string(), "PHEV".to_string()].into(),
    ];

    for (min, max) in [(lo, hi), (lo, lo), (2015, 2018), (hi, hi)] {
        for cities in &city_sets {
            for types in &type_sets {
                let mut f = FilterState::initial(&ds);
                f.set_year_range(min, max);
                f.selected_cities = cities.clone();
                f.selected_types = types.clone();
                f.selected_makes = ["TESLA".to_string(), "KIA".to_string()].into();

                let view = apply(&ds, &f);

                // Completeness: the view is exactly the matching subsequence.
                let expected: Vec<_> = ds.records().iter().filter(|r| f.matches(r)).collect();
                assert_eq!(view.iter().collect::<Vec<_>>(), expected);
                if types.is_empty() {
                    assert!(view.is_empty());
                }
                assert!(view.iter().all(|r| r.model_year >= min && r.model_year <= max));

                let top = top_n(&view, CategoryField::City, 2);
                assert!(top.entries.len() <= 2);
                assert!(top.entries.windows(2).all(|w| w[0].1 >= w[1].1));
                assert!(top.entries.iter().map(|(_, n)| n).sum::<usize>() <= view.len());

                let dist = distribution(&view, CategoryField::Make);
                let non_missing = view.iter().filter(|r| r.make.is_some()).count();
                assert_eq!(dist.total, non_missing);
                assert_eq!(dist.entries.iter().map(|(_, n)| n).sum::<usize>(), non_missing);

                let top_names: Vec<String> = top.entries.iter().map(|(c, _)| c.clone()).collect();
                let g = growth(&view, &top_names);
                for s in &g.series {
                    assert!(top_names.contains(&s.name));
                    assert!(s.points.iter().all(|(_, n)| *n > 0));
                    assert!(s.points.windows(2).all(|w| w[0].0 < w[1].0));
                }
                assert_eq!(growth(&view, &top_names), g);

                let pivot = pivot_counts(&view, CategoryField::State);
                let with_vin = view.iter().filter(|r| r.vin.is_some() && r.state.is_some()).count();
                assert_eq!(pivot.counts.iter().flatten().sum::<usize>(), with_vin);
                assert!(pivot.counts.iter().all(|row| row.len() == pivot.years.len()));
            }
        }
    }
}

#[test]
fn single_year_filter_is_not_empty() {
    let tmp = tempdir().unwrap();
    let ds = mixed_dataset(tmp.path());
    let (lo, _) = ds.year_bounds();

    let mut f = FilterState::initial(&ds);
    f.set_year_range(lo, lo);
    let view = apply(&ds, &f);
    assert!(!view.is_empty());
    assert!(view.iter().all(|r| r.model_year == lo));
}
