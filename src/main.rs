mod api;
mod app;
mod config;
mod history;
mod ui;

use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;

use app::{AppEvent, AppState};

fn main() {
    env_logger::init();
    log::info!("PDF Audiobook starting");

    let application = libadwaita::Application::builder()
        .application_id("io.github.pdf_audiobook.Client")
        .build();

    application.connect_activate(on_activate);
    application.run();
}

fn on_activate(app: &libadwaita::Application) {
    // Widgets and tokio tasks both report to the main loop over this channel
    let (event_tx, event_rx) = async_channel::unbounded::<AppEvent>();

    let state = Rc::new(RefCell::new(AppState::new(event_tx.clone())));

    // Build UI
    let window = ui::window::build_main_window(
        app,
        &state.borrow().config.backend_url,
        event_tx.clone(),
    );

    // History dialog
    {
        let state_clone = state.clone();
        let parent = window.window.clone();
        window.history_button.connect_clicked(move |_| {
            let s = state_clone.borrow();
            let client = s.client.clone();
            ui::history::show_history_dialog(&parent, &s.history, move |url| {
                ui::window::resolve(client.as_deref(), url)
            });
        });
    }

    let main_window = window.window.clone();
    state.borrow_mut().window = Some(window);
    app::refresh_view(&state);
    main_window.present();

    // Attach event handler
    {
        let state_clone = state.clone();
        gtk4::glib::spawn_future_local(async move {
            while let Ok(event) = event_rx.recv().await {
                app::handle_event(&state_clone, event);
            }
        });
    }

    // Load the voice catalog once at startup
    let _ = event_tx.try_send(AppEvent::ReloadVoices);
}
