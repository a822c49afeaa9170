use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use gtk4::glib;

use crate::api::{BackendClient, ConversionResult, Voice};
use crate::config::Config;
use crate::history::History;
use crate::ui::window::MainWindowWidgets;

use super::view_model::{StagedFile, ViewModel};

/// Events delivered to the GTK main thread, from widgets and from tokio tasks.
#[derive(Debug, Clone)]
pub enum AppEvent {
    ReloadVoices,
    VoicesLoaded(Vec<Voice>),
    VoicesFailed(String),
    VoiceSelected(String),
    FileOffered(StagedFile),
    FileUnreadable(String),
    ConvertClicked,
    ConversionComplete(ConversionResult),
    ConversionFailed(String),
    SaveClicked,
    /// Save reports carry the ticket handed out by `ViewModel::begin_save`.
    SaveProgress(u64, u64, u64),
    SaveComplete(u64, PathBuf),
    SaveFailed(u64, String),
    BackendUrlChanged(String),
}

/// Central application state. Lives on the GTK main thread inside Rc<RefCell<>>.
pub struct AppState {
    pub vm: ViewModel,
    pub config: Config,
    pub history: History,
    pub client: Option<Arc<BackendClient>>,
    pub tokio_rt: tokio::runtime::Runtime,
    pub event_sender: async_channel::Sender<AppEvent>,

    // Main-loop timers
    pub progress_source: Option<glib::SourceId>,
    pub reveal_source: Option<glib::SourceId>,
    pub notification_source: Option<glib::SourceId>,

    // UI handles
    pub window: Option<MainWindowWidgets>,
}

impl AppState {
    pub fn new(sender: async_channel::Sender<AppEvent>) -> Self {
        let config = Config::load();
        let history = History::load();
        let client = build_client(&config.backend_url);
        let tokio_rt = tokio::runtime::Runtime::new()
            .expect("Failed to create tokio runtime");

        Self {
            vm: ViewModel::default(),
            config,
            history,
            client,
            tokio_rt,
            event_sender: sender,
            progress_source: None,
            reveal_source: None,
            notification_source: None,
            window: None,
        }
    }
}

/// Build a client for `url`, logging instead of failing on a bad URL.
pub fn build_client(url: &str) -> Option<Arc<BackendClient>> {
    match BackendClient::new(url) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            log::error!("Unusable backend URL: {e}");
            None
        }
    }
}

pub type SharedState = Rc<RefCell<AppState>>;
