use gtk4::gio;
use gtk4::prelude::*;

use super::state::AppEvent;
use super::view_model::StagedFile;

// `fast-content-type` is derived from the file name only; GIO never sniffs the bytes for it.
const FAST_CONTENT_TYPE: &str = "standard::fast-content-type";
const FILE_ATTRIBUTES: &str = "standard::display-name,standard::fast-content-type,standard::size";

/// Describe a browsed or dropped file by its declared MIME type.
pub fn describe_file(file: &gio::File) -> Result<StagedFile, gtk4::glib::Error> {
    let info = file.query_info(
        FILE_ATTRIBUTES,
        gio::FileQueryInfoFlags::NONE,
        None::<&gio::Cancellable>,
    )?;

    // Content types are platform specific (UTIs on macOS); compare MIME types.
    let mime_type = info
        .attribute_string(FAST_CONTENT_TYPE)
        .and_then(|ct| gio::content_type_get_mime_type(&ct))
        .map(|m| m.to_string())
        .unwrap_or_default();

    let path = file.path().unwrap_or_else(|| file.uri().as_str().into());

    Ok(StagedFile {
        path,
        name: info.display_name().to_string(),
        mime_type,
        size: u64::try_from(info.size()).unwrap_or(0),
    })
}

/// Turn a chosen file into the event the controller understands.
pub fn offer_file(file: &gio::File) -> AppEvent {
    match describe_file(file) {
        Ok(staged) => AppEvent::FileOffered(staged),
        Err(e) => {
            log::error!("Could not inspect {}: {e}", file.uri());
            AppEvent::FileUnreadable(format!("Could not read file: {e}"))
        }
    }
}
