use super::state::{AppEvent, SharedState};
use super::view_model::ConvertRequest;

/// Dispatch the voice catalog fetch on the tokio runtime.
pub fn dispatch_voice_fetch(state: &SharedState) {
    let s = state.borrow();
    let sender = s.event_sender.clone();
    let Some(client) = s.client.clone() else {
        let _ = sender.try_send(AppEvent::VoicesFailed("no backend URL configured".into()));
        return;
    };

    s.tokio_rt.spawn(async move {
        let event = match client.list_voices().await {
            Ok(voices) => {
                log::info!("Loaded {} voices", voices.len());
                AppEvent::VoicesLoaded(voices)
            }
            Err(e) => AppEvent::VoicesFailed(e.to_string()),
        };
        let _ = sender.send(event).await;
    });
}

/// Read the staged PDF and submit it for conversion on the tokio runtime.
pub fn dispatch_conversion(state: &SharedState, request: ConvertRequest) {
    let s = state.borrow();
    let sender = s.event_sender.clone();
    let Some(client) = s.client.clone() else {
        let _ = sender.try_send(AppEvent::ConversionFailed(
            "Backend URL is not valid".into(),
        ));
        return;
    };

    s.tokio_rt.spawn(async move {
        let ConvertRequest { file, voice_id } = request;

        let pdf = match tokio::fs::read(&file.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = sender
                    .send(AppEvent::ConversionFailed(format!(
                        "Could not read {}: {e}",
                        file.name
                    )))
                    .await;
                return;
            }
        };

        let event = match client.convert(pdf, &file.name, &voice_id).await {
            Ok(result) => AppEvent::ConversionComplete(result),
            Err(e) => {
                log::error!("Conversion failed: {e}");
                AppEvent::ConversionFailed(e.conversion_message())
            }
        };
        let _ = sender.send(event).await;
    });
}

/// Stream the shown audiobook into the configured save directory.
pub fn dispatch_save(state: &SharedState, ticket: u64, download_url: String, file_name: String) {
    let s = state.borrow();
    let sender = s.event_sender.clone();
    let progress_sender = sender.clone();
    let dest = s.config.effective_save_dir().join(file_name);
    let Some(client) = s.client.clone() else {
        let _ = sender.try_send(AppEvent::SaveFailed(ticket, "Backend URL is not valid".into()));
        return;
    };

    s.tokio_rt.spawn(async move {
        let result = client
            .download(&download_url, &dest, move |downloaded, total| {
                let _ = progress_sender.try_send(AppEvent::SaveProgress(ticket, downloaded, total));
            })
            .await;

        let event = match result {
            Ok(_) => AppEvent::SaveComplete(ticket, dest),
            Err(e) => AppEvent::SaveFailed(ticket, e.to_string()),
        };
        let _ = sender.send(event).await;
    });
}
