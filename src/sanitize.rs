//! Derivation of stable, identifier-safe keys from display names.
//!
//! The result is used as the map key for policies, groups, service users and
//! boundaries, both in memory and in the persisted YAML files.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("separator pattern is valid"));

/// Letters that do not decompose into a base letter plus combining marks.
/// Upper-case sources transliterate with only their first letter capitalized.
fn transliterate(c: char) -> Option<&'static str> {
    let mapped = match c {
        'ß' => "ss",
        'ẞ' => "Ss",
        'æ' => "ae",
        'Æ' => "Ae",
        'œ' => "oe",
        'Œ' => "Oe",
        'ø' => "o",
        'Ø' => "O",
        'đ' => "d",
        'Đ' => "D",
        'ð' => "d",
        'Ð' => "D",
        'ł' => "l",
        'Ł' => "L",
        'þ' => "th",
        'Þ' => "Th",
        'ı' => "i",
        'ĳ' => "ij",
        'Ĳ' => "Ij",
        _ => return None,
    };
    Some(mapped)
}

/// Derives the sanitized identifier for a display name.
///
/// Latin text is decomposed, stripped of diacritics and transliterated, then
/// lower-cased and joined with `-`. Names without any usable character keep
/// their identity through their code points (`日本` becomes `u65e5-u672c`), so a
/// non-empty name never sanitizes to an empty identifier.
pub fn sanitize(name: &str) -> String {
    let mut folded = String::with_capacity(name.len());
    for c in name.nfkd() {
        if let Some(mapped) = transliterate(c) {
            folded.push_str(mapped);
        } else if c.is_ascii() {
            folded.push(c);
        } else if !is_combining_mark(c) {
            folded.push(' ');
        }
    }

    let lowered = folded.to_ascii_lowercase();
    let slug = SEPARATORS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string();

    if !slug.is_empty() || name.is_empty() {
        return slug;
    }

    name.chars()
        .map(|c| format!("u{:x}", c as u32))
        .collect::<Vec<_>>()
        .join("-")
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_basic_names() {
        assert_eq!(sanitize("My Group"), "my-group");
        assert_eq!(sanitize("ALLOW a:b:c;"), "allow-a-b-c");
        assert_eq!(sanitize("  leading and trailing  "), "leading-and-trailing");
        assert_eq!(sanitize("Already-sanitized-id"), "already-sanitized-id");
    }

    #[test]
    fn test_sanitize_transliterates_diacritics_and_composites() {
        assert_eq!(sanitize("Café Müller"), "cafe-muller");
        assert_eq!(sanitize("Straße"), "strasse");
        assert_eq!(sanitize("Œuvre Ærø"), "oeuvre-aero");
        assert_eq!(sanitize("Łódź"), "lodz");
    }

    #[test]
    fn test_sanitize_is_deterministic() {
        let name = "Environment admins (prod) #1";
        assert_eq!(sanitize(name), sanitize(name));
        assert_eq!(sanitize(name), "environment-admins-prod-1");
    }

    #[test]
    fn test_sanitize_never_empty_for_non_empty_input() {
        for name in ["日本", "!!!", "🚀", "---", "   x   ", "Σ"] {
            let id = sanitize(name);
            assert!(!id.is_empty(), "'{}' sanitized to an empty id", name);
            assert!(
                id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'),
                "'{}' sanitized to illegal id '{}'",
                name,
                id
            );
        }
        assert_eq!(sanitize("日本"), "u65e5-u672c");
        assert_eq!(sanitize(""), "");
    }
}
