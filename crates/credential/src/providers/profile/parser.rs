//! Shared config and credentials file parser
//!
//! Handles `[section]` headers, `key = value` pairs and full-line `#`/`;`
//! comments. Keys are lowercased; later duplicates override earlier ones.

use std::collections::HashMap;

pub(crate) type Section = HashMap<String, String>;

/// Which shared file is being parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileKind {
    /// `~/.aws/config`: profiles are `[profile name]`, except `[default]`
    Config,
    /// `~/.aws/credentials`: profiles are `[name]`
    Credentials,
}

/// Parse a file into profiles keyed by profile name
pub(crate) fn parse(contents: &str, kind: FileKind) -> HashMap<String, Section> {
    let mut profiles: HashMap<String, Section> = HashMap::new();
    // `None` while inside a section that is not a profile
    let mut current: Option<String> = None;

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let name = header
                .split(']')
                .next()
                .map(str::trim)
                .unwrap_or_default();
            current = profile_name(name, kind).map(str::to_string);
            if let Some(name) = &current {
                profiles.entry(name.clone()).or_default();
            }
            continue;
        }

        let Some(profile) = &current else { continue };
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            continue;
        }
        if let Some(section) = profiles.get_mut(profile) {
            section.insert(key, strip_inline_comment(value.trim()).to_string());
        }
    }

    profiles
}

fn profile_name(header: &str, kind: FileKind) -> Option<&str> {
    match kind {
        FileKind::Credentials => Some(header).filter(|name| !name.is_empty()),
        FileKind::Config => {
            if header == "default" {
                return Some(header);
            }
            header
                .strip_prefix("profile")
                .filter(|rest| rest.starts_with(char::is_whitespace))
                .map(str::trim)
                .filter(|name| !name.is_empty())
        }
    }
}

/// Inline comments need whitespace before the marker
fn strip_inline_comment(value: &str) -> &str {
    let cut = value
        .char_indices()
        .find(|&(index, c)| {
            (c == '#' || c == ';')
                && value[..index].ends_with(char::is_whitespace)
        })
        .map_or(value.len(), |(index, _)| index);
    value[..cut].trim_end()
}
