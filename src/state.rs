use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::color::ColorMap;
use crate::config::Settings;
use crate::data::cache::DatasetCache;
use crate::data::filter::FilterState;
use crate::data::loader::LoadError;
use crate::data::model::Dataset;
use crate::data::pipeline::{self, Dashboard};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,

    cache: DatasetCache,

    /// Loaded dataset (None until a load succeeds).
    pub dataset: Option<Arc<Dataset>>,

    /// Current filter selections; present whenever a dataset is.
    pub filters: Option<FilterState>,

    /// Charts for the filter state they were computed from.
    charts: Option<(FilterState, Dashboard)>,

    /// Colours per vehicle type, stable across filter changes.
    pub type_colors: ColorMap,

    /// Set when no dataset could be loaded at all; the dashboard is not shown.
    pub load_error: Option<String>,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,

    /// Search boxes of the city and make lists.
    pub city_search: String,
    pub make_search: String,

    recomputations: usize,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            cache: DatasetCache::new(),
            dataset: None,
            filters: None,
            charts: None,
            type_colors: ColorMap::new(std::iter::empty()),
            load_error: None,
            status_message: None,
            city_search: String::new(),
            make_search: String::new(),
            recomputations: 0,
        }
    }

    /// Load the configured dataset.
    pub fn load_configured(&mut self) {
        let path = self.settings.dataset_path.clone();
        self.open(&path);
    }

    /// Switch to the dataset at `path`. Served from the cache when the path
    /// is unchanged.
    pub fn open(&mut self, path: &Path) {
        let result = self.cache.get_or_load(path);
        self.ingest(path, result);
    }

    /// Re-read the current source from disk. On failure the dataset on
    /// screen and its source path stay.
    pub fn reload(&mut self) {
        let path = self.settings.dataset_path.clone();
        let result = self.cache.refresh(&path);
        self.ingest(&path, result);
    }

    fn ingest(&mut self, path: &Path, result: Result<Arc<Dataset>, LoadError>) {
        match result {
            Ok(dataset) => {
                self.settings.dataset_path = path.to_path_buf();
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                let msg = format!("Error: {e}");
                if self.dataset.is_none() {
                    self.load_error = Some(msg);
                } else {
                    self.status_message = Some(msg);
                }
            }
        }
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.cache.source_path()
    }

    /// Ingest a dataset: reset filters and drop every cached chart.
    fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.load_error = None;
        self.status_message = None;
        if let Some(current) = &self.dataset {
            if Arc::ptr_eq(current, &dataset) {
                return;
            }
        }

        self.filters = Some(FilterState::initial(&dataset));
        self.charts = None;
        self.type_colors = ColorMap::new(dataset.vehicle_types().iter().map(String::as_str));
        self.city_search.clear();
        self.make_search.clear();
        self.dataset = Some(dataset);
    }

    /// Charts for the current filters, recomputed only when they changed.
    pub fn dashboard(&mut self) -> Option<&Dashboard> {
        let dataset = self.dataset.as_ref()?;
        let filters = self.filters.as_ref()?;

        let stale = match &self.charts {
            Some((key, _)) => key != filters,
            None => true,
        };
        if stale {
            let dashboard = pipeline::run(dataset, filters, &self.settings.charts);
            self.recomputations += 1;
            self.charts = Some((filters.clone(), dashboard));
        }
        self.charts.as_ref().map(|(_, d)| d)
    }

    /// Number of times the chart pipeline ran.
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    // -- Filter edits used by the side panel --

    pub fn set_year_range(&mut self, min: i32, max: i32) {
        if let (Some(f), Some(ds)) = (&mut self.filters, &self.dataset) {
            f.set_year_range(min, max);
            *f = f.clone().clamped_to(ds);
        }
    }

    /// Select every vehicle type.
    pub fn select_all_types(&mut self) {
        if let (Some(f), Some(ds)) = (&mut self.filters, &self.dataset) {
            f.selected_types = ds.vehicle_types().clone();
        }
    }

    pub fn clear_types(&mut self) {
        if let Some(f) = &mut self.filters {
            f.selected_types.clear();
        }
    }

    pub fn set_type_selected(&mut self, vehicle_type: &str, selected: bool) {
        if let Some(f) = &mut self.filters {
            toggle(&mut f.selected_types, vehicle_type, selected);
        }
    }

    pub fn set_city_selected(&mut self, city: &str, selected: bool) {
        if let Some(f) = &mut self.filters {
            toggle(&mut f.selected_cities, city, selected);
        }
    }

    pub fn set_make_selected(&mut self, make: &str, selected: bool) {
        if let Some(f) = &mut self.filters {
            toggle(&mut f.selected_makes, make, selected);
        }
    }

    pub fn clear_cities(&mut self) {
        if let Some(f) = &mut self.filters {
            f.selected_cities.clear();
        }
    }

    pub fn clear_makes(&mut self) {
        if let Some(f) = &mut self.filters {
            f.selected_makes.clear();
        }
    }

    /// Back to the initial selection.
    pub fn reset_filters(&mut self) {
        if let Some(ds) = &self.dataset {
            self.filters = Some(FilterState::initial(ds));
        }
    }
}

fn toggle(set: &mut std::collections::BTreeSet<String>, value: &str, selected: bool) {
    if selected {
        set.insert(value.to_string());
    } else {
        set.remove(value);
    }
}

/// Pick a file through the native dialog.
pub fn pick_dataset_file(start_dir: Option<&Path>) -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new()
        .set_title("Open registration data")
        .add_filter("Supported files", &["csv", "parquet", "pq", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"]);
    if let Some(dir) = start_dir {
        dialog = dialog.set_directory(dir);
    }
    dialog.pick_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CSV: &str = "\
City,Model Year,Make,Electric Vehicle Type,Electric Range,Base MSRP
Seattle,2020,TESLA,BEV,220,40000
Bellevue,2020,TOYOTA,PHEV,25,
Seattle,2021,TESLA,BEV,250,42000
";

    fn state_with_file(dir: &Path) -> AppState {
        let path = dir.join("ev.csv");
        std::fs::write(&path, CSV).unwrap();
        let mut state = AppState::new(Settings {
            dataset_path: path,
            ..Default::default()
        });
        state.load_configured();
        state
    }

    #[test]
    fn charts_are_cached_per_filter_state() {
        let tmp = tempdir().unwrap();
        let mut state = state_with_file(tmp.path());

        assert_eq!(state.dashboard().unwrap().visible_rows, 3);
        state.dashboard();
        assert_eq!(state.recomputations(), 1);

        state.set_year_range(2021, 2021);
        assert_eq!(state.dashboard().unwrap().visible_rows, 1);
        assert_eq!(state.recomputations(), 2);

        state.reset_filters();
        assert_eq!(state.dashboard().unwrap().visible_rows, 3);
        assert_eq!(state.recomputations(), 3);
    }

    #[test]
    fn type_selection_helpers() {
        let tmp = tempdir().unwrap();
        let mut state = state_with_file(tmp.path());

        state.clear_types();
        assert_eq!(state.dashboard().unwrap().visible_rows, 0);
        state.select_all_types();
        state.set_city_selected("Bellevue", true);
        assert_eq!(state.dashboard().unwrap().visible_rows, 1);
        state.set_make_selected("TESLA", true);
        assert_eq!(state.dashboard().unwrap().visible_rows, 0);
        state.clear_makes();
        state.set_type_selected("PHEV", false);
        assert_eq!(state.dashboard().unwrap().visible_rows, 0);
        state.set_type_selected("PHEV", true);
        state.clear_cities();
        assert_eq!(state.dashboard().unwrap().visible_rows, 3);
    }

    #[test]
    fn failed_initial_load_is_fatal_but_later_failures_are_not() {
        let tmp = tempdir().unwrap();
        let mut state = AppState::new(Settings {
            dataset_path: tmp.path().join("missing.csv"),
            ..Default::default()
        });
        state.load_configured();
        assert!(state.load_error.is_some());
        assert!(state.dashboard().is_none());

        let mut state = state_with_file(tmp.path());
        state.open(&tmp.path().join("missing.csv"));
        assert!(state.load_error.is_none());
        assert!(state.status_message.is_some());
        assert_eq!(state.dashboard().unwrap().visible_rows, 3);
    }

    #[test]
    fn reload_rereads_the_source_and_resets_filters() {
        let tmp = tempdir().unwrap();
        let mut state = state_with_file(tmp.path());
        state.set_year_range(2021, 2021);
        state.dashboard();

        std::fs::write(
            tmp.path().join("ev.csv"),
            format!("{CSV}Kent,2023,KIA,BEV,239,0\n"),
        )
        .unwrap();
        state.reload();
        let d = state.dashboard().unwrap();
        assert_eq!(d.visible_rows, 4);
        assert_eq!(state.filters.as_ref().unwrap().year_range(), (2020, 2023));
    }

    #[test]
    fn failed_reload_keeps_dataset_and_source_path() {
        let tmp = tempdir().unwrap();
        let mut state = state_with_file(tmp.path());
        let path = tmp.path().join("ev.csv");

        std::fs::write(&path, "City,Make\nSeattle,TESLA\n").unwrap();
        state.reload();

        assert!(state.load_error.is_none());
        assert!(state.status_message.is_some());
        assert_eq!(state.source_path(), Some(path.as_path()));
        assert_eq!(state.dashboard().unwrap().visible_rows, 3);
    }
}
