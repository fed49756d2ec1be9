use std::collections::BTreeSet;

use super::model::{Dataset, Record};

// ---------------------------------------------------------------------------
// Filter predicate: what the user selected in the side panel
// ---------------------------------------------------------------------------

/// User-selected constraints narrowing the dataset.
///
/// * `selected_types` empty → nothing matches.
/// * `selected_cities` / `selected_makes` empty → no restriction on that column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterState {
    /// Inclusive `(min, max)` model year.
    year_range: (i32, i32),
    pub selected_types: BTreeSet<String>,
    pub selected_cities: BTreeSet<String>,
    pub selected_makes: BTreeSet<String>,
}

impl FilterState {
    /// Show everything: full year range, every vehicle type, no city/make restriction.
    pub fn initial(dataset: &Dataset) -> Self {
        FilterState {
            year_range: dataset.year_bounds(),
            selected_types: dataset.vehicle_types().clone(),
            selected_cities: BTreeSet::new(),
            selected_makes: BTreeSet::new(),
        }
    }

    pub fn year_range(&self) -> (i32, i32) {
        self.year_range
    }

    /// Set the year range, swapping the ends if given out of order.
    pub fn set_year_range(&mut self, a: i32, b: i32) {
        self.year_range = (a.min(b), a.max(b));
    }

    /// Pull the year range inside the dataset's observed years and drop
    /// selections for values the dataset does not contain.
    pub fn clamped_to(mut self, dataset: &Dataset) -> Self {
        let (lo, hi) = dataset.year_bounds();
        let min = self.year_range.0.clamp(lo, hi);
        let max = self.year_range.1.clamp(lo, hi);
        self.set_year_range(min, max);
        self.selected_types
            .retain(|t| dataset.vehicle_types().contains(t));
        self.selected_cities.retain(|c| dataset.cities().contains(c));
        self.selected_makes.retain(|m| dataset.makes().contains(m));
        self
    }

    /// Conjunction of every active predicate.
    pub fn matches(&self, record: &Record) -> bool {
        let (min, max) = self.year_range;
        if record.model_year < min || record.model_year > max {
            return false;
        }
        if !contains(&self.selected_types, record.vehicle_type.as_deref()) {
            return false;
        }
        if !self.selected_cities.is_empty()
            && !contains(&self.selected_cities, record.city.as_deref())
        {
            return false;
        }
        if !self.selected_makes.is_empty()
            && !contains(&self.selected_makes, record.make.as_deref())
        {
            return false;
        }
        true
    }
}

/// A missing value is never a member of any selection.
fn contains(set: &BTreeSet<String>, value: Option<&str>) -> bool {
    value.is_some_and(|v| set.contains(v))
}

// ---------------------------------------------------------------------------
// FilteredView – the rows currently on screen
// ---------------------------------------------------------------------------

/// The records satisfying a [`FilterState`], in dataset order.
#[derive(Debug, Clone, Default)]
pub struct FilteredView<'a> {
    records: Vec<&'a Record>,
}

impl<'a> FilteredView<'a> {
    pub fn from_records(records: Vec<&'a Record>) -> Self {
        FilteredView { records }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Return the records of `dataset` that pass every active filter.
pub fn apply<'a>(dataset: &'a Dataset, filters: &FilterState) -> FilteredView<'a> {
    if filters.selected_types.is_empty() {
        return FilteredView::default();
    }
    FilteredView {
        records: dataset
            .records()
            .iter()
            .filter(|r| filters.matches(r))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::{record, scenario};

    fn dataset() -> Dataset {
        let mut rows = scenario();
        rows.push(record(2022, "BEV", "Kent", "Nissan", None));
        rows.push(Record {
            model_year: 2021,
            vehicle_type: Some("BEV".into()),
            ..Default::default()
        });
        Dataset::from_records(rows).unwrap()
    }

    fn years(view: &FilteredView<'_>) -> Vec<i32> {
        view.iter().map(|r| r.model_year).collect()
    }

    #[test]
    fn initial_state_selects_everything() {
        let ds = dataset();
        let f = FilterState::initial(&ds);
        assert_eq!(f.year_range(), (2020, 2022));
        assert_eq!(apply(&ds, &f).len(), ds.len());
    }

    #[test]
    fn view_is_exactly_the_matching_subsequence() {
        let ds = dataset();
        let mut f = FilterState::initial(&ds);
        f.set_year_range(2020, 2021);
        f.selected_types = ["BEV".to_string()].into();

        let view = apply(&ds, &f);
        let expected: Vec<&Record> = ds.records().iter().filter(|r| f.matches(r)).collect();
        assert_eq!(view.iter().collect::<Vec<_>>(), expected);
        assert_eq!(years(&view), vec![2020, 2021, 2021]);
    }

    #[test]
    fn single_year_range_keeps_that_year() {
        let ds = dataset();
        let mut f = FilterState::initial(&ds);
        f.set_year_range(2021, 2021);
        assert_eq!(years(&apply(&ds, &f)), vec![2021, 2021]);
    }

    #[test]
    fn empty_type_selection_matches_nothing() {
        let ds = dataset();
        let mut f = FilterState::initial(&ds);
        f.selected_types.clear();
        assert!(apply(&ds, &f).is_empty());
    }

    #[test]
    fn city_and_make_sets_restrict_only_when_non_empty() {
        let ds = dataset();
        let mut f = FilterState::initial(&ds);
        f.selected_cities = ["Seattle".to_string(), "Kent".to_string()].into();
        // The row without a city never matches a city selection.
        assert_eq!(years(&apply(&ds, &f)), vec![2020, 2021, 2022]);

        f.selected_makes = ["Nissan".to_string()].into();
        assert_eq!(years(&apply(&ds, &f)), vec![2022]);
    }

    #[test]
    fn year_range_is_ordered_and_clamped() {
        let ds = dataset();
        let mut f = FilterState::initial(&ds);
        f.set_year_range(2030, 2010);
        assert_eq!(f.year_range(), (2010, 2030));

        f.selected_makes = ["Rivian".to_string(), "Tesla".to_string()].into();
        let f = f.clamped_to(&ds);
        assert_eq!(f.year_range(), (2020, 2022));
        assert_eq!(f.selected_makes.iter().collect::<Vec<_>>(), vec!["Tesla"]);
    }
}
