use std::path::PathBuf;
use std::sync::Arc;

use eframe::egui;
use graph_explorer::gql::neo4j::Neo4jStore;
use graph_explorer::gql::query_interface::GraphStore;
use graph_explorer::graph_utils::graph::{GraphDatabase, InMemoryStore};
use graph_explorer::gui::frontend::ExplorerApp;
use graph_explorer::persistence::settings::{AppSettings, PASSWORD_ENV};

fn connect(settings: &AppSettings, runtime: &tokio::runtime::Runtime) -> anyhow::Result<Arc<dyn GraphStore>> {
    if settings.debug_mode {
        log::info!("debug mode: using the built-in sample graph");
        return Ok(Arc::new(InMemoryStore::new(GraphDatabase::sample())));
    }
    let password = settings
        .password()
        .ok_or_else(|| anyhow::anyhow!("set {} to connect to {}", PASSWORD_ENV, settings.uri))?;
    let store = runtime.block_on(Neo4jStore::connect(settings, &password))?;
    Ok(Arc::new(store))
}

fn main() -> eframe::Result {
    env_logger::init();

    let mut settings = AppSettings::load().unwrap_or_else(|e| {
        log::warn!("could not load settings, using defaults: {:#}", e);
        AppSettings::default()
    });
    // A configuration file named on the command line replaces the stored style document
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        settings.apply_configuration_file(&path);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("[Graph-Explorer] Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    // Nothing useful can be done without a store
    let store = match connect(&settings, &runtime) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("[Graph-Explorer] {:#}", e);
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 710.0])
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    let handle = runtime.handle().clone();
    eframe::run_native(
        "Graph-Explorer",
        options,
        Box::new(move |cc| {
            Ok(Box::new(ExplorerApp::new(&cc.egui_ctx, settings, store, handle)) as Box<dyn eframe::App>)
        }),
    )
}
