use gtk4::prelude::*;
use gtk4::{self, Align};

use crate::app::notification::{Notification, Severity};

/// Handles for the transient notification pinned to the window bottom.
pub struct ToastWidgets {
    pub revealer: gtk4::Revealer,
    pub frame: gtk4::Box,
    pub label: gtk4::Label,
}

/// Build the toast and stack it over `content`. Returns the root overlay.
pub fn build_toast(content: &impl IsA<gtk4::Widget>) -> (gtk4::Overlay, ToastWidgets) {
    let overlay = gtk4::Overlay::new();
    overlay.set_child(Some(content));

    let frame = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    frame.add_css_class("toast-bar");

    let label = gtk4::Label::new(None);
    label.add_css_class("toast-label");
    label.set_wrap(true);
    frame.append(&label);

    let revealer = gtk4::Revealer::builder()
        .transition_type(gtk4::RevealerTransitionType::SlideUp)
        .transition_duration(250)
        .halign(Align::Center)
        .valign(Align::End)
        .margin_bottom(24)
        .reveal_child(false)
        .child(&frame)
        .build();
    // Clicks pass through to the page underneath.
    revealer.set_can_target(false);

    overlay.add_overlay(&revealer);

    (
        overlay,
        ToastWidgets {
            revealer,
            frame,
            label,
        },
    )
}

/// Show `notification`, or slide the toast out of view when `None`.
pub fn set_toast(toast: &ToastWidgets, notification: Option<&Notification>) {
    match notification {
        Some(n) => {
            toast.label.set_text(&n.message);
            match n.severity {
                Severity::Error => toast.frame.add_css_class("error-bar"),
                Severity::Info => toast.frame.remove_css_class("error-bar"),
            }
            toast.revealer.set_reveal_child(true);
        }
        None => toast.revealer.set_reveal_child(false),
    }
}
