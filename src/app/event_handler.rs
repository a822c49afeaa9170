use std::time::Duration;

use gtk4::glib;

use super::notification::NOTIFICATION_TIMEOUT;
use super::pipeline::{dispatch_conversion, dispatch_save, dispatch_voice_fetch};
use super::state::{build_client, AppEvent, AppState, SharedState};

/// Delay between the first and second cosmetic progress checkpoints.
const CHECKPOINT_DELAY: Duration = Duration::from_millis(800);

/// Delay between a finished progress bar and the result view.
const REVEAL_DELAY: Duration = Duration::from_millis(500);

/// Handle an application event. This is the core state machine.
pub fn handle_event(state: &SharedState, event: AppEvent) {
    match event {
        AppEvent::ReloadVoices => dispatch_voice_fetch(state),
        AppEvent::VoicesLoaded(voices) => {
            state.borrow_mut().vm.load_voices(voices);
        }
        AppEvent::VoicesFailed(err) => {
            log::error!("Failed to load voices: {err}");
            state.borrow_mut().vm.voices_failed();
        }
        AppEvent::VoiceSelected(id) => {
            state.borrow_mut().vm.select_voice(&id);
        }
        AppEvent::FileOffered(file) => {
            state.borrow_mut().vm.stage_file(file);
        }
        AppEvent::FileUnreadable(message) => {
            state.borrow_mut().vm.notifier.error(message);
        }
        AppEvent::ConvertClicked => start_conversion(state),
        AppEvent::ConversionComplete(result) => {
            log::info!("Conversion finished: {}", result.download_url);
            cancel_source(&mut state.borrow_mut().progress_source);
            state.borrow_mut().vm.conversion_succeeded(result);
            schedule_reveal(state);
        }
        AppEvent::ConversionFailed(message) => {
            cancel_source(&mut state.borrow_mut().progress_source);
            state.borrow_mut().vm.conversion_failed(&message);
        }
        AppEvent::SaveClicked => {
            let started = state.borrow_mut().vm.begin_save();
            if let Some((ticket, result)) = started {
                let file_name = result.suggested_file_name();
                dispatch_save(state, ticket, result.download_url, file_name);
            }
        }
        AppEvent::SaveProgress(ticket, downloaded, total) => {
            state.borrow_mut().vm.save_progress(ticket, downloaded, total);
        }
        AppEvent::SaveComplete(ticket, path) => {
            state.borrow_mut().vm.save_finished(ticket, &path);
        }
        AppEvent::SaveFailed(ticket, err) => {
            log::error!("Save failed: {err}");
            state.borrow_mut().vm.save_failed(ticket, &err);
        }
        AppEvent::BackendUrlChanged(url) => {
            change_backend(state, url);
            dispatch_voice_fetch(state);
        }
    }

    refresh_view(state);
}

fn start_conversion(state: &SharedState) {
    let request = state.borrow_mut().vm.begin_submission();
    let Some(request) = request else {
        return;
    };

    // Paint the disabled trigger before any work is queued.
    refresh_view(state);

    let state_clone = state.clone();
    let source = glib::timeout_add_local_once(CHECKPOINT_DELAY, move || {
        state_clone.borrow_mut().progress_source = None;
        state_clone.borrow_mut().vm.advance_progress();
        refresh_view(&state_clone);
    });
    {
        let mut s = state.borrow_mut();
        cancel_source(&mut s.progress_source);
        s.progress_source = Some(source);
    }

    dispatch_conversion(state, request);
}

fn schedule_reveal(state: &SharedState) {
    let state_clone = state.clone();
    let source = glib::timeout_add_local_once(REVEAL_DELAY, move || {
        state_clone.borrow_mut().reveal_source = None;
        record_revealed(&mut state_clone.borrow_mut());
        refresh_view(&state_clone);
    });
    let mut s = state.borrow_mut();
    cancel_source(&mut s.reveal_source);
    s.reveal_source = Some(source);
}

fn record_revealed(s: &mut AppState) {
    let Some(done) = s.vm.reveal_result() else {
        return;
    };
    let (name, category, url) = (
        done.request.file.name.clone(),
        done.voice_category.clone(),
        done.result.download_url.clone(),
    );
    s.history.record(&name, &category, &url);
    if let Err(e) = s.history.save() {
        log::warn!("Failed to save history: {e}");
    }
}

fn change_backend(state: &SharedState, url: String) {
    let mut s = state.borrow_mut();
    if s.config.backend_url == url {
        return;
    }
    log::info!("Backend URL changed to {url}");
    s.client = build_client(&url);
    s.config.backend_url = url;
    if let Err(e) = s.config.save() {
        log::warn!("Failed to save config: {e}");
    }
}

/// Project the view-model onto the widgets and arm the notification timer.
pub fn refresh_view(state: &SharedState) {
    {
        let mut guard = state.borrow_mut();
        let s = &mut *guard;
        if let Some(window) = s.window.as_mut() {
            crate::ui::window::render(window, &s.vm, s.client.as_deref());
        }
    }

    let pending = state.borrow_mut().vm.notifier.take_pending_timer();
    if let Some(token) = pending {
        let state_clone = state.clone();
        let source = glib::timeout_add_local_once(NOTIFICATION_TIMEOUT, move || {
            state_clone.borrow_mut().notification_source = None;
            let expired = state_clone.borrow_mut().vm.notifier.expire(token);
            if expired {
                refresh_view(&state_clone);
            }
        });
        let mut s = state.borrow_mut();
        cancel_source(&mut s.notification_source);
        s.notification_source = Some(source);
    }
}

/// Remove a pending one-shot timer, if it has not fired yet.
fn cancel_source(slot: &mut Option<glib::SourceId>) {
    if let Some(source) = slot.take() {
        source.remove();
    }
}
