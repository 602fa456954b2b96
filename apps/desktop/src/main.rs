use desktop::generate::{HttpStoryClient, StoryBackend};
use desktop::narrator::ThinkingNarrator;
use desktop::session::StorySession;
use eframe::NativeOptions;
use parking_lot::Mutex;
use sidecar::{SidecarConfig, Supervisor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod app;
mod app_storyboard;
use app::App;

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    // Bring the backend to ready before any UI exists; a half-started app is
    // worse than a clean failure.
    let supervisor = if external_backend() {
        tracing::info!("STORY_STUDIO_EXTERNAL_BACKEND set; using an already-running backend");
        None
    } else {
        let root = locate_install_root();
        tracing::info!("install root: {}", root.display());
        let mut supervisor = Supervisor::new(SidecarConfig::python_backend(&root));
        if let Err(err) = supervisor.start() {
            tracing::error!("failed to start story backend: {err}");
            // process::exit skips Drop, so release the sidecar explicitly.
            supervisor.stop();
            std::process::exit(1);
        }
        Some(supervisor)
    };
    // Shared with the termination handler: SIGINT/SIGTERM bypass eframe's
    // shutdown path entirely, and the backend runs in its own process group,
    // so without this a Ctrl-C would leave the python tree orphaned.
    let supervisor = Arc::new(Mutex::new(supervisor));
    {
        let supervisor = supervisor.clone();
        if let Err(err) = ctrlc::set_handler(move || {
            tracing::info!("termination signal received; stopping story backend");
            if let Some(mut supervisor) = supervisor.lock().take() {
                supervisor.stop();
            }
            std::process::exit(130);
        }) {
            tracing::warn!("failed to install termination handler: {err}");
        }
    }

    let backend: Arc<dyn StoryBackend> = Arc::new(HttpStoryClient::from_env());
    let session = StorySession::new(ThinkingNarrator::default());

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1400.0, 900.0]),
        ..NativeOptions::default()
    };
    let _ = eframe::run_native(
        "Viral Story Studio",
        options,
        Box::new(move |_cc| Ok(Box::new(App::new(backend, session, supervisor)))),
    );
}

fn external_backend() -> bool {
    std::env::var("STORY_STUDIO_EXTERNAL_BACKEND")
        .map(|v| v == "1")
        .unwrap_or(false)
}

/// The backend script lives at `backend/start.py` under the install root.
/// Packaged builds place the executable a couple of levels below that root,
/// so walk up from the executable; a dev run falls back to the working
/// directory.
fn locate_install_root() -> PathBuf {
    if let Ok(root) = std::env::var("STORY_STUDIO_ROOT") {
        return PathBuf::from(root);
    }
    if let Ok(exe) = std::env::current_exe() {
        for dir in exe.ancestors().skip(1).take(4) {
            if dir.join("backend").join("start.py").exists() {
                return dir.to_path_buf();
            }
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
