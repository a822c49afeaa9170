use gtk4::prelude::*;

use crate::api::Voice;
use crate::app::AppEvent;

/// A rendered, clickable voice card.
pub struct VoiceCard {
    pub voice_id: String,
    pub button: gtk4::Button,
}

/// Glyph shown on a card for a category like "British Female".
pub fn category_glyph(category: &str) -> &'static str {
    let lower = category.to_lowercase();
    // "female" contains "male"; check it first.
    if lower.contains("female") {
        "\u{1F469}"
    } else if lower.contains("male") {
        "\u{1F468}"
    } else {
        "\u{1F399}"
    }
}

/// Accent line under the glyph, e.g. "American" for "American Male".
pub fn category_accent(category: &str) -> &str {
    category.split_whitespace().next().unwrap_or(category)
}

/// Replace the catalog's contents with one card per voice, in order.
pub fn rebuild_catalog(
    flowbox: &gtk4::FlowBox,
    voices: &[Voice],
    sender: &async_channel::Sender<AppEvent>,
) -> Vec<VoiceCard> {
    flowbox.remove_all();

    voices
        .iter()
        .map(|voice| {
            let card = build_card(voice, sender.clone());
            flowbox.insert(&card.button, -1);
            card
        })
        .collect()
}

fn build_card(voice: &Voice, sender: async_channel::Sender<AppEvent>) -> VoiceCard {
    let vbox = gtk4::Box::new(gtk4::Orientation::Vertical, 4);
    vbox.set_margin_top(8);
    vbox.set_margin_bottom(8);

    let glyph = gtk4::Label::new(Some(category_glyph(&voice.category)));
    glyph.add_css_class("voice-glyph");

    let title = gtk4::Label::new(Some(&voice.category));
    title.add_css_class("heading");

    let accent = gtk4::Label::new(Some(category_accent(&voice.category)));
    accent.add_css_class("dim-label");
    accent.add_css_class("caption");

    vbox.append(&glyph);
    vbox.append(&title);
    vbox.append(&accent);

    let button = gtk4::Button::builder()
        .child(&vbox)
        .width_request(140)
        .tooltip_text(voice.id.as_str())
        .build();
    button.add_css_class("voice-card");

    let id = voice.id.clone();
    button.connect_clicked(move |_| {
        let _ = sender.try_send(AppEvent::VoiceSelected(id.clone()));
    });

    VoiceCard {
        voice_id: voice.id.clone(),
        button,
    }
}

/// Mark exactly the card for `selected` as selected.
pub fn apply_selection(cards: &[VoiceCard], selected: Option<&str>) {
    for card in cards {
        if Some(card.voice_id.as_str()) == selected {
            card.button.add_css_class("selected");
        } else {
            card.button.remove_css_class("selected");
        }
    }
}
