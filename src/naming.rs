//! Upload filename handling.
//!
//! The filename a user uploads does two jobs: its extension is a hint for
//! format detection (the header always wins), and its basename becomes the
//! suggested download name.
//!
//! | Upload name | Output kind | Suggested name |
//! |---|---|---|
//! | `photo.jpg` | JPEG | `compressed_photo.jpg` |
//! | `C:\shots\cat.PNG` | PNG | `compressed_cat.PNG` |
//! | `pic.png` (really a JPEG) | JPEG | `compressed_pic.png` |
//! | *(empty)* | GIF | `compressed.gif` |

use crate::imaging::ImageKind;

/// Prefix for every suggested output name.
pub const OUTPUT_PREFIX: &str = "compressed";

/// Last path component of an upload name. Browsers on Windows may send
/// backslash-separated paths, so both separators count.
pub fn basename(source: &str) -> Option<&str> {
    let name = source.rsplit(['/', '\\']).next()?.trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

/// Extension of the basename, without the dot. A leading dot (`.hidden`)
/// is not an extension.
pub fn extension(source: &str) -> Option<&str> {
    let name = basename(source)?;
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Format the extension claims, if it is one we support.
pub fn extension_kind(source: &str) -> Option<ImageKind> {
    extension(source).and_then(ImageKind::from_extension)
}

/// Suggested download name: `compressed_<basename>`, or
/// `compressed.<ext>` when the upload has no usable name.
pub fn output_filename(source: &str, output: ImageKind) -> String {
    match basename(source) {
        Some(name) => format!("{OUTPUT_PREFIX}_{name}"),
        None => format!("{OUTPUT_PREFIX}.{}", output.extension()),
    }
}
