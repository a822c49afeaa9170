use gtk4::prelude::*;
use gtk4::{gdk, gio};
use libadwaita::prelude::*;

use crate::api::{BackendClient, PDF_MIME};
use crate::app::view_model::{SaveState, ViewModel};
use crate::app::AppEvent;
use crate::ui::toast::{build_toast, set_toast, ToastWidgets};
use crate::ui::voice_cards::{apply_selection, rebuild_catalog, VoiceCard};

const STYLE: &str = r#"
.voice-card {
    padding: 6px;
    border-radius: 12px;
}
.voice-card.selected {
    background-color: alpha(@accent_bg_color, 0.25);
    box-shadow: inset 0 0 0 2px @accent_bg_color;
}
.voice-glyph {
    font-size: 28px;
}
.drop-zone {
    border: 2px dashed alpha(currentColor, 0.3);
    border-radius: 12px;
    padding: 24px;
}
.drop-zone.drag-over {
    border-color: @accent_bg_color;
    background-color: alpha(@accent_bg_color, 0.1);
}
.drop-zone.has-file {
    border-style: solid;
}
.toast-bar {
    background-color: rgba(30, 30, 30, 0.92);
    border-radius: 22px;
    padding: 8px 20px;
}
.toast-bar.error-bar {
    background-color: rgba(170, 40, 40, 0.92);
}
.toast-label {
    color: white;
    font-weight: bold;
}
"#;

/// Handles returned from building the main window.
pub struct MainWindowWidgets {
    pub window: libadwaita::ApplicationWindow,
    pub history_button: gtk4::Button,
    pub voice_flowbox: gtk4::FlowBox,
    pub empty_catalog_label: gtk4::Label,
    pub voice_cards: Vec<VoiceCard>,
    pub rendered_revision: u64,
    pub drop_zone: gtk4::Box,
    pub file_label: gtk4::Label,
    pub convert_button: gtk4::Button,
    pub progress_bar: gtk4::ProgressBar,
    pub result_group: libadwaita::PreferencesGroup,
    pub media_controls: gtk4::MediaControls,
    pub shown_audio: Option<String>,
    pub download_link: gtk4::LinkButton,
    pub save_button: gtk4::Button,
    pub save_label: gtk4::Label,
    pub toast: ToastWidgets,
    sender: async_channel::Sender<AppEvent>,
}

/// Build the main window and wire widget signals to `sender`.
pub fn build_main_window(
    app: &libadwaita::Application,
    initial_backend_url: &str,
    sender: async_channel::Sender<AppEvent>,
) -> MainWindowWidgets {
    load_style();

    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("PDF to Audiobook")
        .default_width(560)
        .default_height(720)
        .build();

    let toolbar_view = libadwaita::ToolbarView::new();
    let header = libadwaita::HeaderBar::new();

    let reload_button = gtk4::Button::from_icon_name("view-refresh-symbolic");
    reload_button.set_tooltip_text(Some("Reload voices"));
    header.pack_start(&reload_button);

    let history_button = gtk4::Button::from_icon_name("document-open-recent-symbolic");
    history_button.set_tooltip_text(Some("Conversion history"));
    header.pack_end(&history_button);

    toolbar_view.add_top_bar(&header);

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    // --- Backend group ---
    let backend_group = libadwaita::PreferencesGroup::new();
    backend_group.set_title("Backend");

    let backend_row = libadwaita::EntryRow::builder()
        .title("Server URL")
        .text(initial_backend_url)
        .show_apply_button(true)
        .build();
    backend_group.add(&backend_row);

    content.append(&backend_group);

    // --- Voice group ---
    let voice_group = libadwaita::PreferencesGroup::new();
    voice_group.set_title("Voice");
    voice_group.set_margin_top(12);

    let voice_flowbox = gtk4::FlowBox::builder()
        .selection_mode(gtk4::SelectionMode::None)
        .homogeneous(true)
        .max_children_per_line(3)
        .row_spacing(8)
        .column_spacing(8)
        .build();
    voice_group.add(&voice_flowbox);

    let empty_catalog_label = gtk4::Label::new(Some("No voices loaded."));
    empty_catalog_label.add_css_class("dim-label");
    voice_group.add(&empty_catalog_label);

    content.append(&voice_group);

    // --- Document group ---
    let file_group = libadwaita::PreferencesGroup::new();
    file_group.set_title("Document");
    file_group.set_margin_top(12);

    let drop_zone = gtk4::Box::new(gtk4::Orientation::Vertical, 8);
    drop_zone.add_css_class("drop-zone");
    let icon = gtk4::Image::from_icon_name("x-office-document-symbolic");
    icon.set_pixel_size(48);
    let file_label = gtk4::Label::new(None);
    file_label.set_wrap(true);
    drop_zone.append(&icon);
    drop_zone.append(&file_label);
    file_group.add(&drop_zone);

    content.append(&file_group);

    // --- Convert ---
    let convert_button = gtk4::Button::builder()
        .halign(gtk4::Align::Center)
        .margin_top(16)
        .build();
    convert_button.add_css_class("suggested-action");
    convert_button.add_css_class("pill");
    content.append(&convert_button);

    let progress_bar = gtk4::ProgressBar::new();
    progress_bar.set_margin_top(16);
    progress_bar.set_visible(false);
    progress_bar.set_show_text(true);
    content.append(&progress_bar);

    // --- Result group ---
    let result_group = libadwaita::PreferencesGroup::new();
    result_group.set_title("Your Audiobook");
    result_group.set_margin_top(16);
    result_group.set_visible(false);

    let media_controls = gtk4::MediaControls::new(None::<&gtk4::MediaStream>);
    result_group.add(&media_controls);

    let actions = gtk4::Box::new(gtk4::Orientation::Horizontal, 12);
    actions.set_halign(gtk4::Align::Center);
    actions.set_margin_top(8);
    let download_link = gtk4::LinkButton::with_label("", "Download MP3");
    let save_button = gtk4::Button::with_label("Save MP3");
    let save_label = gtk4::Label::new(None);
    save_label.add_css_class("dim-label");
    save_label.set_visible(false);
    actions.append(&download_link);
    actions.append(&save_button);
    actions.append(&save_label);
    result_group.add(&actions);

    content.append(&result_group);

    // Assemble
    let scrolled = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .child(&content)
        .build();
    toolbar_view.set_content(Some(&scrolled));
    let (root, toast) = build_toast(&toolbar_view);
    window.set_content(Some(&root));

    // --- Signals ---
    {
        let sender = sender.clone();
        reload_button.connect_clicked(move |_| {
            let _ = sender.try_send(AppEvent::ReloadVoices);
        });
    }
    {
        let sender = sender.clone();
        backend_row.connect_apply(move |row| {
            let url = row.text().trim().to_string();
            let _ = sender.try_send(AppEvent::BackendUrlChanged(url));
        });
    }
    {
        let sender = sender.clone();
        convert_button.connect_clicked(move |button| {
            // Insensitive until the next render.
            button.set_sensitive(false);
            let _ = sender.try_send(AppEvent::ConvertClicked);
        });
    }
    {
        let sender = sender.clone();
        save_button.connect_clicked(move |_| {
            let _ = sender.try_send(AppEvent::SaveClicked);
        });
    }
    attach_browse(&drop_zone, &window, sender.clone());
    attach_drop_target(&drop_zone, sender.clone());

    MainWindowWidgets {
        window,
        history_button,
        voice_flowbox,
        empty_catalog_label,
        voice_cards: Vec::new(),
        rendered_revision: 0,
        drop_zone,
        file_label,
        convert_button,
        progress_bar,
        result_group,
        media_controls,
        shown_audio: None,
        download_link,
        save_button,
        save_label,
        toast,
        sender,
    }
}

fn load_style() {
    let css_provider = gtk4::CssProvider::new();
    css_provider.load_from_string(STYLE);
    match gdk::Display::default() {
        Some(display) => gtk4::style_context_add_provider_for_display(
            &display,
            &css_provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        ),
        None => log::warn!("No display; skipping stylesheet"),
    }
}

/// Clicking the drop zone opens a file chooser.
fn attach_browse(
    zone: &gtk4::Box,
    window: &libadwaita::ApplicationWindow,
    sender: async_channel::Sender<AppEvent>,
) {
    let click = gtk4::GestureClick::new();
    let window = window.clone();
    click.connect_released(move |_, _, _, _| {
        let filter = gtk4::FileFilter::new();
        filter.set_name(Some("PDF documents"));
        filter.add_mime_type(PDF_MIME);
        let filters = gio::ListStore::new::<gtk4::FileFilter>();
        filters.append(&filter);

        let dialog = gtk4::FileDialog::builder()
            .title("Choose a PDF")
            .modal(true)
            .filters(&filters)
            .build();

        let sender = sender.clone();
        dialog.open(Some(&window), None::<&gio::Cancellable>, move |res| match res {
            Ok(file) => {
                let _ = sender.try_send(crate::app::offer_file(&file));
            }
            Err(e) => log::info!("File chooser closed: {e}"),
        });
    });
    zone.add_controller(click);
}

/// Accept dropped files; hover only toggles a style class.
fn attach_drop_target(zone: &gtk4::Box, sender: async_channel::Sender<AppEvent>) {
    let target = gtk4::DropTarget::new(gio::File::static_type(), gdk::DragAction::COPY);

    {
        let zone = zone.clone();
        target.connect_enter(move |_, _, _| {
            zone.add_css_class("drag-over");
            gdk::DragAction::COPY
        });
    }
    {
        let zone = zone.clone();
        target.connect_leave(move |_| {
            zone.remove_css_class("drag-over");
        });
    }
    {
        let zone = zone.clone();
        target.connect_drop(move |_, value, _, _| {
            zone.remove_css_class("drag-over");
            match value.get::<gio::File>() {
                Ok(file) => {
                    let _ = sender.try_send(crate::app::offer_file(&file));
                    true
                }
                Err(e) => {
                    log::warn!("Unsupported drop payload: {e}");
                    false
                }
            }
        });
    }

    zone.add_controller(target);
}

/// Project the view-model onto the window.
pub fn render(w: &mut MainWindowWidgets, vm: &ViewModel, client: Option<&BackendClient>) {
    // --- Catalog ---
    if w.rendered_revision != vm.catalog_revision() {
        w.voice_cards = rebuild_catalog(&w.voice_flowbox, vm.voices(), &w.sender);
        w.rendered_revision = vm.catalog_revision();
    }
    w.empty_catalog_label.set_visible(vm.voices().is_empty());
    apply_selection(&w.voice_cards, vm.selected_voice());

    // --- Intake ---
    w.file_label.set_text(vm.staged_file_label());
    if vm.staged_file().is_some() {
        w.drop_zone.add_css_class("has-file");
    } else {
        w.drop_zone.remove_css_class("has-file");
    }

    // --- Submitter ---
    w.convert_button.set_label(vm.trigger_label());
    w.convert_button.set_sensitive(vm.trigger_enabled());

    match vm.progress() {
        Some(progress) => {
            w.progress_bar.set_fraction(progress.fraction);
            w.progress_bar.set_text(Some(progress.text));
            w.progress_bar.set_visible(true);
        }
        None => w.progress_bar.set_visible(false),
    }

    match vm.result_view() {
        Some(view) => {
            let audio = resolve(client, view.audio_source);
            if w.shown_audio.as_deref() != Some(audio.as_str()) {
                let media = gtk4::MediaFile::for_file(&gio::File::for_uri(&audio));
                w.media_controls.set_media_stream(Some(&media));
                w.shown_audio = Some(audio);
            }
            w.download_link.set_uri(&resolve(client, view.download_target));
            w.result_group.set_visible(true);
        }
        None => {
            w.result_group.set_visible(false);
            if w.shown_audio.take().is_some() {
                w.media_controls.set_media_stream(None::<&gtk4::MediaStream>);
            }
        }
    }

    match vm.save_state() {
        SaveState::Idle => {
            w.save_button.set_sensitive(true);
            w.save_label.set_visible(false);
        }
        SaveState::Saving {
            downloaded, total, ..
        } => {
            w.save_button.set_sensitive(false);
            w.save_label.set_text(&format_save_progress(downloaded, total));
            w.save_label.set_visible(true);
        }
    }

    set_toast(&w.toast, vm.notifier.visible());
}

/// Absolute form of a backend URL, or the raw string without a client.
pub fn resolve(client: Option<&BackendClient>, url: &str) -> String {
    client
        .and_then(|c| c.resolve(url).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| url.to_string())
}

fn format_save_progress(downloaded: u64, total: u64) -> String {
    let mb_done = downloaded as f64 / 1_048_576.0;
    if total > 0 {
        let mb_total = total as f64 / 1_048_576.0;
        format!("Saving {mb_done:.1} / {mb_total:.1} MB")
    } else {
        format!("Saving {mb_done:.1} MB")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_progress_with_and_without_total() {
        assert_eq!(format_save_progress(1_048_576, 3_145_728), "Saving 1.0 / 3.0 MB");
        assert_eq!(format_save_progress(524_288, 0), "Saving 0.5 MB");
    }

    #[test]
    fn resolve_without_client_keeps_raw_url() {
        assert_eq!(resolve(None, "a.mp3"), "a.mp3");
        let client = BackendClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            resolve(Some(&client), "/audio/a.mp3"),
            "http://localhost:8000/audio/a.mp3"
        );
    }
}
