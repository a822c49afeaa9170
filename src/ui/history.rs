use chrono::NaiveDate;
use gtk4::prelude::*;
use libadwaita::prelude::*;

use crate::history::{ConversionRecord, History};

/// Present past conversions in a dialog over `parent`, one group per day.
/// `resolve` turns a stored download URL into an absolute one.
pub fn show_history_dialog<F>(parent: &impl IsA<gtk4::Widget>, history: &History, resolve: F)
where
    F: Fn(&str) -> String,
{
    let dialog = libadwaita::PreferencesDialog::builder()
        .title("Conversion History")
        .content_width(520)
        .search_enabled(true)
        .build();

    let page = libadwaita::PreferencesPage::builder()
        .title("History")
        .icon_name("document-open-recent-symbolic")
        .build();

    let days = history.by_day();
    if days.is_empty() {
        let empty = libadwaita::StatusPage::builder()
            .icon_name("audio-x-generic-symbolic")
            .title("No Audiobooks Yet")
            .description("Converted PDFs show up here with a link to their MP3.")
            .vexpand(true)
            .build();
        let group = libadwaita::PreferencesGroup::new();
        group.add(&empty);
        page.add(&group);
    }

    for (day, records) in days {
        let group = libadwaita::PreferencesGroup::builder()
            .title(day_heading(day))
            .build();
        for record in records {
            group.add(&build_record_row(record, &resolve(&record.download_url)));
        }
        page.add(&group);
    }

    dialog.add(&page);
    dialog.present(Some(parent));
}

/// "Sunday, 18 October 2026" for a `YYYY-MM-DD` day; anything else is shown as stored.
fn day_heading(day: &str) -> String {
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(|date| date.format("%A, %-d %B %Y").to_string())
        .unwrap_or_else(|_| day.to_string())
}

fn build_record_row(record: &ConversionRecord, download_uri: &str) -> libadwaita::ActionRow {
    let subtitle = match record.time_of_day() {
        "" => record.voice_category.clone(),
        time => format!("{time} \u{00B7} {}", record.voice_category),
    };
    let row = libadwaita::ActionRow::builder()
        .title(record.pdf_name.as_str())
        .subtitle(subtitle)
        .use_markup(false)
        .build();
    row.add_prefix(&gtk4::Image::from_icon_name("x-office-document-symbolic"));

    let link = gtk4::LinkButton::new(download_uri);
    link.set_icon_name("folder-download-symbolic");
    link.set_valign(gtk4::Align::Center);
    link.set_tooltip_text(Some("Download MP3"));
    row.add_suffix(&link);

    row
}
