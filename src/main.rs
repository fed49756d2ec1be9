use eframe::egui;
use ev_dashboard::app::EvDashboardApp;
use ev_dashboard::config::Settings;

fn main() -> eframe::Result {
    env_logger::init();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            // Usage errors, --help and --version are rendered by clap.
            if let Some(cli_err) = e.downcast_ref::<clap::Error>() {
                cli_err.exit();
            }
            log::error!("Invalid configuration: {e:#}");
            eprintln!("ev-dashboard: {e:#}");
            std::process::exit(2);
        }
    };
    log::info!("Using dataset {}", settings.dataset_path.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([settings.window.width, settings.window.height])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "EV Registrations Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(EvDashboardApp::new(settings)))),
    )
}
