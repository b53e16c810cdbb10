mod cli;
mod files;
mod loader;
mod ui;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Condvar, Mutex};
use winit::event_loop::EventLoop;

use ivgal::settings::ViewerSettings;

use crate::cli::{Cli, StartMode, default_memory_budget, parse_memory_budget};
use crate::files::build_collection;
use crate::loader::{CacheState, SharedState, UserEvent, ViewMode, spawn_decode_workers};
use crate::ui::state::AppState;
use crate::ui::{App, INITIAL_SIZE};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let budget = match &cli.memory {
        Some(s) => parse_memory_budget(s),
        None => default_memory_budget(),
    };
    let settings = ViewerSettings::load_or_default(cli.config.as_deref());

    let collection = match build_collection(
        cli.manifest.as_deref(),
        &cli.paths,
        cli.file_list.as_deref(),
        cli.recursive,
        cli.follow_links,
    ) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mode = match cli.mode {
        StartMode::Gallery => ViewMode::Gallery,
        StartMode::Viewer => ViewMode::Viewer,
        StartMode::Carousel => ViewMode::Carousel,
    };
    let shared: SharedState = Arc::new((
        Mutex::new(CacheState::new(budget, collection.len(), mode)),
        Condvar::new(),
    ));

    let num_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .clamp(4, 16);
    log::info!(
        "{} images, {} decode workers, cache budget {} MB",
        collection.len(),
        num_threads,
        budget / (1024 * 1024)
    );

    let event_loop = match EventLoop::<UserEvent>::with_user_event().build() {
        Ok(l) => l,
        Err(e) => {
            log::error!("Cannot create event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let proxy = event_loop.create_proxy();

    spawn_decode_workers(Arc::clone(&shared), Arc::clone(&collection), proxy.clone(), num_threads);

    let state = AppState::new(
        collection,
        shared,
        proxy,
        settings,
        cli.carousel_options(),
        cli.mode,
        cli.download_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
        INITIAL_SIZE,
    );
    let mut app = App::new(state);

    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop failed: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
