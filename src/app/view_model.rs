use std::path::PathBuf;

use crate::api::{ConversionResult, Voice, PDF_MIME};

use super::notification::Notifier;

pub const VOICES_FAILED_MESSAGE: &str = "Failed to load voices — ensure backend is running";
pub const NOT_A_PDF_MESSAGE: &str = "Please upload a PDF file";
pub const NO_FILE_MESSAGE: &str = "Please select a PDF file first";
pub const NO_VOICE_MESSAGE: &str = "Please select a voice";
pub const SUCCESS_MESSAGE: &str = "Audiobook ready!";

pub const CONVERT_LABEL: &str = "Convert to Audiobook";
pub const CONVERTING_LABEL: &str = "Converting...";
pub const CONVERT_AGAIN_LABEL: &str = "Convert Another PDF";

pub const NO_FILE_LABEL: &str = "Drop a PDF here or click to browse";

/// Cosmetic progress checkpoints; they don't track real upload progress.
pub const UPLOAD_CHECKPOINT: Progress = Progress {
    fraction: 0.3,
    text: "Uploading PDF...",
};
pub const GENERATE_CHECKPOINT: Progress = Progress {
    fraction: 0.6,
    text: "Generating audio...",
};
pub const DONE_CHECKPOINT: Progress = Progress {
    fraction: 1.0,
    text: "Done!",
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub fraction: f64,
    pub text: &'static str,
}

/// A user-chosen file awaiting submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

/// Everything one `POST /convert` needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertRequest {
    pub file: StagedFile,
    pub voice_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitPhase {
    /// Nothing converted yet, or the last attempt failed.
    Idle,
    Submitting,
    /// Response arrived; waiting out the short delay before the reveal.
    Completing,
    /// A result is on screen; ready for another conversion.
    Converted,
}

/// A conversion that has been revealed to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedConversion {
    pub request: ConvertRequest,
    pub voice_category: String,
    pub result: ConversionResult,
}

/// What the result view should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView<'a> {
    pub audio_source: &'a str,
    pub download_target: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    /// `ticket` identifies the download; reports carrying another ticket are stale.
    Saving {
        ticket: u64,
        downloaded: u64,
        total: u64,
    },
}

/// UI state of the whole window, independent of any widget toolkit.
#[derive(Debug)]
pub struct ViewModel {
    voices: Vec<Voice>,
    catalog_revision: u64,
    selected_voice: Option<String>,
    staged_file: Option<StagedFile>,
    phase: SubmitPhase,
    progress: Option<Progress>,
    in_flight: Option<ConvertRequest>,
    pending_result: Option<ConversionResult>,
    result: Option<CompletedConversion>,
    save: SaveState,
    save_tickets: u64,
    pub notifier: Notifier,
}

impl Default for ViewModel {
    fn default() -> Self {
        Self {
            voices: Vec::new(),
            catalog_revision: 0,
            selected_voice: None,
            staged_file: None,
            phase: SubmitPhase::Idle,
            progress: None,
            in_flight: None,
            pending_result: None,
            result: None,
            save: SaveState::Idle,
            save_tickets: 0,
            notifier: Notifier::default(),
        }
    }
}

impl ViewModel {
    // --- Voice catalog ---

    /// Replace the catalog and select its first voice.
    pub fn load_voices(&mut self, voices: Vec<Voice>) {
        self.selected_voice = voices.first().map(|v| v.id.clone());
        self.voices = voices;
        self.catalog_revision += 1;
    }

    /// Catalog fetch failed: empty catalog and an error notification.
    pub fn voices_failed(&mut self) {
        self.voices.clear();
        self.selected_voice = None;
        self.catalog_revision += 1;
        self.notifier.error(VOICES_FAILED_MESSAGE);
    }

    /// Record `id` as the selection. Unknown ids are ignored.
    pub fn select_voice(&mut self, id: &str) -> bool {
        if self.voices.iter().any(|v| v.id == id) {
            self.selected_voice = Some(id.to_string());
            true
        } else {
            log::warn!("Ignoring selection of unknown voice {id}");
            false
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Bumped every time the catalog is replaced, so views know to rebuild.
    pub fn catalog_revision(&self) -> u64 {
        self.catalog_revision
    }

    pub fn selected_voice(&self) -> Option<&str> {
        self.selected_voice.as_deref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_voice.as_deref() == Some(id)
    }

    // --- File intake ---

    /// Stage `file` if its declared type is exactly `application/pdf`.
    /// A rejected file leaves the current staging untouched.
    pub fn stage_file(&mut self, file: StagedFile) -> bool {
        if file.mime_type != PDF_MIME {
            log::info!("Rejected {} ({})", file.name, file.mime_type);
            self.notifier.error(NOT_A_PDF_MESSAGE);
            return false;
        }
        log::info!("Staged {} ({} bytes)", file.name, file.size);
        self.staged_file = Some(file);
        true
    }

    pub fn staged_file(&self) -> Option<&StagedFile> {
        self.staged_file.as_ref()
    }

    pub fn staged_file_label(&self) -> &str {
        self.staged_file
            .as_ref()
            .map(|f| f.name.as_str())
            .unwrap_or(NO_FILE_LABEL)
    }

    // --- Conversion ---

    /// Enter `Submitting` and return the request to issue, or notify why not.
    ///
    /// A second call while already submitting is not rejected here; the view
    /// disables the trigger instead.
    pub fn begin_submission(&mut self) -> Option<ConvertRequest> {
        let Some(file) = self.staged_file.clone() else {
            self.notifier.error(NO_FILE_MESSAGE);
            return None;
        };
        let Some(voice_id) = self.selected_voice.clone() else {
            self.notifier.error(NO_VOICE_MESSAGE);
            return None;
        };
        if self.phase == SubmitPhase::Submitting {
            log::warn!("Conversion requested while another is in flight");
        }

        let request = ConvertRequest { file, voice_id };
        self.phase = SubmitPhase::Submitting;
        self.progress = Some(UPLOAD_CHECKPOINT);
        self.result = None;
        self.pending_result = None;
        self.in_flight = Some(request.clone());
        Some(request)
    }

    /// Move to the second cosmetic checkpoint if still waiting on the backend.
    pub fn advance_progress(&mut self) {
        if self.phase == SubmitPhase::Submitting && self.progress == Some(UPLOAD_CHECKPOINT) {
            self.progress = Some(GENERATE_CHECKPOINT);
        }
    }

    /// Response parsed: fill the progress bar; the reveal comes later.
    pub fn conversion_succeeded(&mut self, result: ConversionResult) {
        if self.phase != SubmitPhase::Submitting {
            log::warn!("Dropping conversion result received in phase {:?}", self.phase);
            return;
        }
        self.phase = SubmitPhase::Completing;
        self.progress = Some(DONE_CHECKPOINT);
        self.pending_result = Some(result);
    }

    /// Hide progress, show the result, and notify success.
    pub fn reveal_result(&mut self) -> Option<&CompletedConversion> {
        if self.phase != SubmitPhase::Completing {
            return None;
        }
        let result = self.pending_result.take()?;
        let request = self.in_flight.take()?;
        let voice_category = self
            .voices
            .iter()
            .find(|v| v.id == request.voice_id)
            .map(|v| v.category.clone())
            .unwrap_or_else(|| request.voice_id.clone());

        self.phase = SubmitPhase::Converted;
        self.progress = None;
        self.notifier.info(SUCCESS_MESSAGE);
        self.result = Some(CompletedConversion {
            request,
            voice_category,
            result,
        });
        self.result.as_ref()
    }

    /// Request failed: hide progress, restore the trigger, show `message`.
    pub fn conversion_failed(&mut self, message: &str) {
        self.phase = SubmitPhase::Idle;
        self.progress = None;
        self.in_flight = None;
        self.pending_result = None;
        self.notifier.error(message);
    }

    pub fn phase(&self) -> &SubmitPhase {
        &self.phase
    }

    pub fn progress(&self) -> Option<Progress> {
        self.progress
    }

    pub fn trigger_enabled(&self) -> bool {
        !matches!(self.phase, SubmitPhase::Submitting | SubmitPhase::Completing)
    }

    pub fn trigger_label(&self) -> &'static str {
        match self.phase {
            SubmitPhase::Idle => CONVERT_LABEL,
            SubmitPhase::Submitting | SubmitPhase::Completing => CONVERTING_LABEL,
            SubmitPhase::Converted => CONVERT_AGAIN_LABEL,
        }
    }

    pub fn result_view(&self) -> Option<ResultView<'_>> {
        self.result.as_ref().map(|c| ResultView {
            audio_source: c.result.playback_source(),
            download_target: &c.result.download_url,
        })
    }

    // --- Save to disk ---

    /// Start saving the shown result. Returns its ticket and the result
    /// unless a save is already running, even one started for an older result.
    pub fn begin_save(&mut self) -> Option<(u64, ConversionResult)> {
        if matches!(self.save, SaveState::Saving { .. }) {
            return None;
        }
        let result = self.result.as_ref()?.result.clone();
        self.save_tickets += 1;
        self.save = SaveState::Saving {
            ticket: self.save_tickets,
            downloaded: 0,
            total: 0,
        };
        Some((self.save_tickets, result))
    }

    fn is_current_save(&self, ticket: u64) -> bool {
        matches!(self.save, SaveState::Saving { ticket: t, .. } if t == ticket)
    }

    pub fn save_progress(&mut self, ticket: u64, downloaded: u64, total: u64) {
        if self.is_current_save(ticket) {
            self.save = SaveState::Saving {
                ticket,
                downloaded,
                total,
            };
        }
    }

    pub fn save_finished(&mut self, ticket: u64, path: &std::path::Path) {
        if !self.is_current_save(ticket) {
            log::warn!("Ignoring completion of stale save {ticket}");
            return;
        }
        self.save = SaveState::Idle;
        self.notifier.info(format!("Saved to {}", path.display()));
    }

    pub fn save_failed(&mut self, ticket: u64, message: &str) {
        if !self.is_current_save(ticket) {
            log::warn!("Ignoring failure of stale save {ticket}: {message}");
            return;
        }
        self.save = SaveState::Idle;
        self.notifier.error(format!("Save failed: {message}"));
    }

    pub fn save_state(&self) -> SaveState {
        self.save
    }
}
