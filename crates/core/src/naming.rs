//! Output file naming for downloaded optimization artifacts.
//!
//! Self-contained formats (`.glb`, `.usdz`) are served from numbered
//! folders such as `1_usdz/`; zipped multi-file formats (`.obj.zip`) are
//! not. The folder number becomes the file suffix so that several
//! artifacts of one job do not overwrite each other.

use std::path::Path;

/// Suffix used when the URL has no numbered folder.
pub const DEFAULT_SUFFIX: &str = "0";

/// Split off the last extension the way a path-aware splitter does:
/// leading dots belong to the stem, not the extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// Return the full compound extension of `filename`, e.g. `.obj.zip`.
pub fn full_extension(filename: &str) -> String {
    let mut stem = filename;
    let mut extension = String::new();
    loop {
        let (rest, ext) = split_extension(stem);
        if ext.is_empty() {
            break;
        }
        extension.insert_str(0, ext);
        stem = rest;
    }
    extension
}

/// Folder number of a `<digits>_<type>` segment.
fn folder_number(segment: &str) -> Option<&str> {
    let (number, _) = segment.split_once('_')?;
    (!number.is_empty() && number.bytes().all(|b| b.is_ascii_digit())).then_some(number)
}

/// Derive the local output path for an artifact download URL.
///
/// Convention: `{prefix}_{suffix}{extension}`
///
/// - `suffix` = `<digits>` of a `<digits>_<type>` parent folder, else `"0"`
/// - `extension` = full compound extension of the URL's file name
///
/// # Examples
///
/// ```
/// use rapid_core::naming::output_path;
///
/// assert_eq!(
///     output_path("https://cdn.example.com/jobs/3_usdz/model.usdz", "out/x"),
///     "out/x_3.usdz"
/// );
/// assert_eq!(
///     output_path("https://cdn.example.com/jobs/model.obj.zip?sig=abc", "out/x"),
///     "out/x_0.obj.zip"
/// );
/// ```
pub fn output_path(url: &str, prefix: &str) -> String {
    let url_path = url.split('?').next().unwrap_or(url);

    let mut segments = url_path.rsplit('/');
    let filename = segments.next().unwrap_or_default();
    let suffix = segments
        .next()
        .and_then(folder_number)
        .unwrap_or(DEFAULT_SUFFIX);

    format!("{prefix}_{suffix}{}", full_extension(filename))
}

/// Build the output prefix `{output_dir}/{model_name}_{preset_name}`.
pub fn output_prefix(output_dir: &Path, model_name: &str, preset_name: &str) -> String {
    output_dir
        .join(format!("{model_name}_{preset_name}"))
        .to_string_lossy()
        .into_owned()
}
