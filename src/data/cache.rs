use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::loader::{load_file, LoadError};
use super::model::Dataset;

// ---------------------------------------------------------------------------
// DatasetCache – load once per source path
// ---------------------------------------------------------------------------

/// Memoized dataset holder. The source is read only when the requested path
/// differs from the cached one, or on [`DatasetCache::refresh`].
#[derive(Debug, Default)]
pub struct DatasetCache {
    entry: Option<(PathBuf, Arc<Dataset>)>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the dataset for `path`, loading it on first use or when the
    /// path changed. A failed load leaves the previous entry in place.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<Dataset>, LoadError> {
        if let Some((cached_path, dataset)) = &self.entry {
            if cached_path == path {
                log::debug!("Dataset cache hit for {}", path.display());
                return Ok(Arc::clone(dataset));
            }
        }

        let dataset = Arc::new(load_file(path)?);
        self.entry = Some((path.to_path_buf(), Arc::clone(&dataset)));
        Ok(dataset)
    }

    /// Re-read `path` even if it is cached. The entry is replaced only when
    /// the new load succeeds.
    pub fn refresh(&mut self, path: &Path) -> Result<Arc<Dataset>, LoadError> {
        log::debug!("Refreshing dataset cache for {}", path.display());
        let dataset = Arc::new(load_file(path)?);
        self.entry = Some((path.to_path_buf(), Arc::clone(&dataset)));
        Ok(dataset)
    }

    pub fn current(&self) -> Option<&Arc<Dataset>> {
        self.entry.as_ref().map(|(_, ds)| ds)
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.entry.as_ref().map(|(p, _)| p.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEADER: &str = "City,Model Year,Make,Electric Vehicle Type,Electric Range,Base MSRP";

    fn write_csv(path: &Path, rows: &[&str]) {
        let mut body = format!("{HEADER}\n");
        for r in rows {
            body.push_str(r);
            body.push('\n');
        }
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn same_path_is_served_from_cache() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("ev.csv");
        write_csv(&path, &["Seattle,2020,TESLA,BEV,220,0"]);

        let mut cache = DatasetCache::new();
        let first = cache.get_or_load(&path).unwrap();

        // Changing the file does not matter while the path stays the same.
        write_csv(&path, &["Seattle,2020,TESLA,BEV,220,0", "Kent,2021,KIA,BEV,239,0"]);
        let second = cache.get_or_load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);

        let third = cache.refresh(&path).unwrap();
        assert_eq!(third.len(), 2);
        assert!(Arc::ptr_eq(cache.current().unwrap(), &third));
    }

    #[test]
    fn failed_refresh_keeps_the_cached_entry() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("ev.csv");
        write_csv(&path, &["Seattle,2020,TESLA,BEV,220,0"]);

        let mut cache = DatasetCache::new();
        let first = cache.get_or_load(&path).unwrap();

        std::fs::write(&path, "not,a,registration,table\n").unwrap();
        assert!(cache.refresh(&path).is_err());
        assert_eq!(cache.source_path(), Some(path.as_path()));
        assert!(Arc::ptr_eq(cache.current().unwrap(), &first));
    }

    #[test]
    fn new_path_reloads_and_failures_keep_previous_entry() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.csv");
        let b = tmp.path().join("b.csv");
        write_csv(&a, &["Seattle,2020,TESLA,BEV,220,0"]);
        write_csv(&b, &["Kent,2019,KIA,BEV,239,0", "Kent,2021,KIA,BEV,239,0"]);

        let mut cache = DatasetCache::new();
        cache.get_or_load(&a).unwrap();
        let ds_b = cache.get_or_load(&b).unwrap();
        assert_eq!(ds_b.year_bounds(), (2019, 2021));
        assert_eq!(cache.source_path(), Some(b.as_path()));

        assert!(cache.get_or_load(&tmp.path().join("missing.csv")).is_err());
        assert_eq!(cache.source_path(), Some(b.as_path()));
    }
}
