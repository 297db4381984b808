//! CLI output formatting.
//!
//! Output is **information-centric**: every entity leads with its name, with
//! storage keys and URLs shown as indented context lines.
//!
//! # Output Format
//!
//! ## Formats
//!
//! ```text
//! default (image)
//!     001 big: 500 x auto, q70
//!     002 small: 100 x auto, q70
//! admin: 200 x auto, q80
//! ```
//!
//! ## Path
//!
//! ```text
//! Path: default/0001/01
//!     admin → /uploads/media/default/0001/01/thumb_1_admin.jpg
//! ```
//!
//! ## Ingest
//!
//! ```text
//! photo.jpg → default/0001/01/3f2a….jpg
//!     Box: 800x600
//!     Type: image/jpeg, 12345 bytes
//!     Status: ok
//!     admin → /uploads/media/default/0001/01/thumb_1_admin.jpg
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::format::FormatSettings;
use crate::media::{Media, ProviderStatus};
use crate::pool::Pool;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn side(value: Option<u32>) -> String {
    value.map_or_else(|| "auto".to_string(), |v| v.to_string())
}

/// `100 x auto, q70`, plus the resizer override and `unconstrained` when set.
fn settings_summary(settings: &FormatSettings) -> String {
    let mut summary = format!(
        "{} x {}, q{}",
        side(settings.width),
        side(settings.height),
        settings.quality
    );
    if let Some(resizer) = &settings.resizer {
        summary.push_str(&format!(", {resizer}"));
    }
    if !settings.constraint {
        summary.push_str(", unconstrained");
    }
    summary
}

fn status_label(status: ProviderStatus) -> &'static str {
    match status {
        ProviderStatus::Pending => "pending",
        ProviderStatus::Ok => "ok",
        ProviderStatus::Error => "error",
    }
}

fn url_lines(depth: usize, urls: &[(String, String)]) -> Vec<String> {
    urls.iter()
        .map(|(format, url)| format!("{}{} \u{2192} {}", indent(depth), format, url))
        .collect()
}

// ============================================================================
// formats
// ============================================================================

/// Contexts with their formats, optionally restricted to one context, then
/// the admin format.
pub fn format_formats_output(
    pool: &Pool,
    context: Option<&str>,
    admin: &FormatSettings,
) -> Vec<String> {
    let mut lines = Vec::new();
    for ctx in pool.contexts() {
        if context.is_some_and(|c| c != ctx.name) {
            continue;
        }
        lines.push(format!("{} ({})", ctx.name, ctx.providers.join(", ")));
        for (i, (name, settings)) in ctx.formats.iter().enumerate() {
            lines.push(format!(
                "{}{} {}: {}",
                indent(1),
                format_index(i + 1),
                name,
                settings_summary(settings)
            ));
        }
    }
    lines.push(format!("admin: {}", settings_summary(admin)));
    lines
}

pub fn print_formats_output(pool: &Pool, context: Option<&str>, admin: &FormatSettings) {
    for line in format_formats_output(pool, context, admin) {
        println!("{}", line);
    }
}

// ============================================================================
// path
// ============================================================================

/// Storage directory of a media and the public URL of each format.
pub fn format_path_output(path: &str, urls: &[(String, String)]) -> Vec<String> {
    let mut lines = vec![format!("Path: {}", path)];
    lines.extend(url_lines(1, urls));
    lines
}

pub fn print_path_output(path: &str, urls: &[(String, String)]) {
    for line in format_path_output(path, urls) {
        println!("{}", line);
    }
}

// ============================================================================
// ingest
// ============================================================================

/// A stored media: where its original went, what it is, and its URLs.
pub fn format_ingest_output(
    media: &Media,
    reference: &str,
    urls: &[(String, String)],
) -> Vec<String> {
    let name = media.name.as_deref().unwrap_or("(unnamed)");
    let mut lines = vec![format!("{} \u{2192} {}", name, reference)];
    if let Some(dimensions) = media.dimensions {
        lines.push(format!("{}Box: {}", indent(1), dimensions));
    }
    if let Some(content_type) = &media.content_type {
        lines.push(format!(
            "{}Type: {}, {} bytes",
            indent(1),
            content_type,
            media.size.unwrap_or(0)
        ));
    }
    lines.push(format!("{}Status: {}", indent(1), status_label(media.provider_status)));
    lines.extend(url_lines(1, urls));
    lines
}

pub fn print_ingest_output(media: &Media, reference: &str, urls: &[(String, String)]) {
    for line in format_ingest_output(media, reference, urls) {
        println!("{}", line);
    }
}
