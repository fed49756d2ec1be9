use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "ev-dashboard.json";
/// Environment variable overriding the dataset path.
pub const DATA_ENV_VAR: &str = "EV_DASHBOARD_DATA";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Startup configuration.
///
/// Resolution order, later wins: defaults, JSON config file,
/// `EV_DASHBOARD_DATA`, first positional argument.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dataset_path: PathBuf,
    pub charts: ChartSettings,
    pub window: WindowSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("Electric_Vehicle_Population_Data.csv"),
            charts: ChartSettings::default(),
            window: WindowSettings::default(),
        }
    }
}

/// Chart parameters. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub top_cities: usize,
    pub top_makes: usize,
    /// Number of makes in the MSRP-by-make box plot.
    pub box_plot_makes: usize,
    pub year_histogram: bool,
    pub msrp_by_make: bool,
    /// Base MSRP against electric range for the top `scatter_makes` makes.
    pub price_vs_range: bool,
    pub scatter_makes: usize,
    /// Registrations per state and model year.
    pub state_heatmap: bool,
    /// Rows shown in the filtered-table preview.
    pub preview_rows: usize,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            top_cities: 10,
            top_makes: 10,
            box_plot_makes: 5,
            year_histogram: false,
            msrp_by_make: false,
            price_vs_range: false,
            scatter_makes: 5,
            state_heatmap: false,
            preview_rows: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1400.0,
            height: 900.0,
        }
    }
}

impl Settings {
    /// Resolve settings from the real process arguments and environment.
    pub fn load() -> Result<Self> {
        Self::resolve(
            std::env::args().skip(1),
            std::env::var(DATA_ENV_VAR).ok(),
            Path::new(DEFAULT_CONFIG_FILE),
        )
    }

    /// `args` excludes the program name.
    pub fn resolve(
        args: impl IntoIterator<Item = String>,
        env_dataset: Option<String>,
        default_config: &Path,
    ) -> Result<Self> {
        let cli = CliArgs::from_args(args)?;

        let mut settings = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None if default_config.is_file() => Self::from_file(default_config)?,
            None => Self::default(),
        };

        if let Some(path) = env_dataset.filter(|p| !p.trim().is_empty()) {
            settings.dataset_path = PathBuf::from(path);
        }
        if let Some(path) = cli.dataset {
            settings.dataset_path = path;
        }

        if settings.charts.top_cities == 0 || settings.charts.top_makes == 0 {
            log::warn!("top_cities/top_makes of 0 hides the ranking charts");
        }
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Program name clap reports in usage and help output.
const BIN_NAME: &str = "ev-dashboard";

#[derive(Debug, Default, PartialEq, Parser)]
#[command(
    name = BIN_NAME,
    version,
    about = "Interactive dashboard over electric vehicle registrations",
    after_help = "The dataset path is resolved in order by the positional argument, \
                  EV_DASHBOARD_DATA, the config file, then the built-in default."
)]
struct CliArgs {
    /// CSV, Parquet or JSON registration table
    #[arg(value_name = "DATASET")]
    dataset: Option<PathBuf>,

    /// JSON settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl CliArgs {
    /// `args` excludes the program name.
    fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let cli = Self::try_parse_from(std::iter::once(BIN_NAME.to_string()).chain(args))?;
        Ok(cli)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_any_input() {
        let tmp = tempdir().unwrap();
        let s = Settings::resolve(Vec::new(), None, &tmp.path().join("none.json")).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.charts.top_cities, 10);
    }

    #[test]
    fn file_then_env_then_cli() {
        let tmp = tempdir().unwrap();
        let cfg = tmp.path().join("cfg.json");
        std::fs::write(
            &cfg,
            r#"{ "dataset_path": "from_file.csv", "charts": { "top_makes": 5, "year_histogram": true } }"#,
        )
        .unwrap();
        let none = tmp.path().join("none.json");

        let s = Settings::resolve(args(&["--config", cfg.to_str().unwrap()]), None, &none)
            .unwrap();
        assert_eq!(s.dataset_path, PathBuf::from("from_file.csv"));
        assert_eq!(s.charts.top_makes, 5);
        assert_eq!(s.charts.top_cities, 10);
        assert!(s.charts.year_histogram);

        let s = Settings::resolve(
            args(&["-c", cfg.to_str().unwrap()]),
            Some("from_env.csv".into()),
            &none,
        )
        .unwrap();
        assert_eq!(s.dataset_path, PathBuf::from("from_env.csv"));

        let s = Settings::resolve(
            args(&["cli.parquet", "--config", cfg.to_str().unwrap()]),
            Some("from_env.csv".into()),
            &none,
        )
        .unwrap();
        assert_eq!(s.dataset_path, PathBuf::from("cli.parquet"));
    }

    #[test]
    fn default_config_file_is_picked_up() {
        let tmp = tempdir().unwrap();
        let cfg = tmp.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&cfg, r#"{ "window": { "width": 800.0 } }"#).unwrap();
        let s = Settings::resolve(Vec::new(), None, &cfg).unwrap();
        assert_eq!(s.window.width, 800.0);
        assert_eq!(s.window.height, 900.0);
    }

    #[test]
    fn bad_arguments_and_files_are_reported() {
        let tmp = tempdir().unwrap();
        let none = tmp.path().join("none.json");
        assert!(Settings::resolve(args(&["--verbose"]), None, &none).is_err());
        assert!(Settings::resolve(args(&["a.csv", "b.csv"]), None, &none).is_err());
        assert!(Settings::resolve(args(&["--config"]), None, &none).is_err());

        let err = Settings::resolve(args(&["--help"]), None, &none).unwrap_err();
        let help = err.downcast_ref::<clap::Error>().unwrap();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);
        assert!(help.to_string().contains("--config <FILE>"));

        let broken = tmp.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        let err = Settings::resolve(args(&["--config", broken.to_str().unwrap()]), None, &none)
            .unwrap_err();
        assert!(format!("{err:#}").contains("parsing config file"));
    }
}
