//! Stored-name derivation for uploaded contracts.

use std::time::{SystemTime, UNIX_EPOCH};

const PDF_EXT: &str = ".pdf";

/// Longest stored name in bytes. Leaves room for the `.json` sidecar suffix
/// under the usual 255-byte file name limit.
pub const MAX_STORED_NAME_BYTES: usize = 250;

/// Undo UTF-8 text that was decoded byte-by-byte as Latin-1.
///
/// Multipart parsers commonly hand back `filename="..."` values this way, so
/// `계약서.pdf` arrives as `ê³\u{84}ì\u{95}½ì\u{84}\u{9c}.pdf`. If the string
/// has no characters in `U+0080..=U+00FF`, or the bytes are not valid UTF-8,
/// the input is returned unchanged.
pub fn recover_mojibake(name: &str) -> String {
    let suspicious = name.chars().any(|c| ('\u{80}'..='\u{ff}').contains(&c));
    if !suspicious {
        return name.to_string();
    }
    let bytes: Option<Vec<u8>> = name.chars().map(|c| u8::try_from(c).ok()).collect();
    match bytes.map(String::from_utf8) {
        Some(Ok(recovered)) => recovered,
        _ => name.to_string(),
    }
}

/// Derive the on-disk name for an upload.
///
/// Keeps ASCII letters and digits, Hangul syllables, `_`, `-`, `.` and space.
/// A name with nothing usable left becomes `file_<unix-millis>.pdf`. Long
/// names lose the tail of their stem so the result fits in
/// [`MAX_STORED_NAME_BYTES`]. Two uploads that sanitize to the same name
/// overwrite each other.
pub fn sanitize(original: &str) -> String {
    sanitize_at(original, SystemTime::now())
}

fn sanitize_at(original: &str, now: SystemTime) -> String {
    let recovered = recover_mojibake(original);
    let kept: String = recovered.chars().filter(|c| is_allowed(*c)).collect();
    let trimmed = kept.trim_start_matches(['.', ' ']).trim_end_matches(' ');
    if trimmed.is_empty() {
        return fallback_name(now);
    }

    let (stem, ext) = if has_pdf_extension(trimmed) {
        trimmed.split_at(trimmed.len() - PDF_EXT.len())
    } else {
        (trimmed, PDF_EXT)
    };
    let stem = truncate_on_char_boundary(stem, MAX_STORED_NAME_BYTES - PDF_EXT.len());
    format!("{stem}{ext}")
}

/// Cut `s` to at most `max` bytes without splitting a character. A cut that
/// lands after a space drops the dangling spaces too.
fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].trim_end_matches(' ')
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '_' | '-' | '.' | ' ')
        || ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

fn fallback_name(now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("file_{millis}{PDF_EXT}")
}

/// `true` if `name` ends in `.pdf`, ignoring ASCII case.
pub fn has_pdf_extension(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() > PDF_EXT.len()
        && bytes[bytes.len() - PDF_EXT.len()..].eq_ignore_ascii_case(PDF_EXT.as_bytes())
}

/// Whether a client-supplied name may address a stored contract.
///
/// Only a single visible path component with a PDF extension qualifies, so
/// sidecars, temp files and anything outside the storage directory stay
/// unreachable.
pub fn is_stored_pdf_name(name: &str) -> bool {
    !name.starts_with('.') && has_pdf_extension(name) && sanitize_filename::is_sanitized(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn latin1_view(s: &str) -> String {
        s.bytes().map(char::from).collect()
    }

    #[test]
    fn safe_name_is_unchanged() {
        assert_eq!(sanitize("contract_2024-01 final.pdf"), "contract_2024-01 final.pdf");
    }

    #[test]
    fn recovers_korean_from_latin1_mojibake() {
        let garbled = latin1_view("계약서.pdf");
        assert_ne!(garbled, "계약서.pdf");
        assert_eq!(recover_mojibake(&garbled), "계약서.pdf");
        assert_eq!(sanitize(&garbled), "계약서.pdf");
    }

    #[test]
    fn genuine_latin1_falls_back_to_input() {
        // A lone 0xE9 byte is not valid UTF-8.
        assert_eq!(recover_mojibake("café.pdf"), "café.pdf");
        assert_eq!(sanitize("café.pdf"), "caf.pdf");
    }

    #[test]
    fn mixed_encodings_keep_whitelisted_parts() {
        // Hangul above U+00FF blocks byte reinterpretation.
        let mixed = format!("{}_계약.pdf", latin1_view("é"));
        assert_eq!(recover_mojibake(&mixed), mixed);
        assert_eq!(sanitize(&mixed), "_계약.pdf");
    }

    #[test]
    fn strips_path_separators_and_symbols() {
        assert_eq!(sanitize("../../etc/passwd"), "etcpasswd.pdf");
        assert_eq!(sanitize("a/b\\c:d*?.pdf"), "abcd.pdf");
    }

    #[test]
    fn symbol_only_names_fall_back_to_timestamp() {
        let now = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(sanitize_at("🎉🎉!!", now), "file_1700000000123.pdf");
        assert_eq!(sanitize_at("", now), "file_1700000000123.pdf");
        assert_eq!(sanitize_at("...", now), "file_1700000000123.pdf");
    }

    #[test]
    fn fallback_matches_expected_shape() {
        let name = sanitize("***");
        let digits = name
            .strip_prefix("file_")
            .and_then(|rest| rest.strip_suffix(".pdf"))
            .expect("fallback shape");
        assert!(!digits.is_empty());
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn appends_pdf_extension_when_missing() {
        assert_eq!(sanitize("scan"), "scan.pdf");
        assert_eq!(sanitize("Scan.PDF"), "Scan.PDF");
        assert_eq!(sanitize(".pdf"), "pdf.pdf");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "계약서.pdf".to_string(),
            latin1_view("계약서 최종.pdf"),
            "  spaced name  ".to_string(),
            "..hidden".to_string(),
            "🎉".to_string(),
            "a:b|c".to_string(),
        ];
        for input in inputs {
            let once = sanitize(&input);
            assert_eq!(sanitize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn long_ascii_name_is_capped() {
        let long = format!("{}.pdf", "a".repeat(300));
        let once = sanitize(&long);
        assert_eq!(once.len(), MAX_STORED_NAME_BYTES);
        assert!(once.ends_with(".pdf"));
        assert_eq!(sanitize(&once), once);

        let no_ext = "b".repeat(260);
        let once = sanitize(&no_ext);
        assert_eq!(once.len(), MAX_STORED_NAME_BYTES);
        assert!(once.ends_with(".pdf"));
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn long_hangul_name_is_cut_on_a_char_boundary() {
        let long = format!("{}.PDF", "가".repeat(100));
        let once = sanitize(&latin1_view(&long));
        assert!(once.len() <= MAX_STORED_NAME_BYTES);
        assert!(once.ends_with(".PDF"));
        assert_eq!(once, format!("{}.PDF", "가".repeat(82)));
        assert_eq!(sanitize(&once), once);

        // Short enough to keep whole.
        let fits = format!("{}.pdf", "가".repeat(80));
        assert_eq!(sanitize(&fits), fits);
    }

    #[test]
    fn truncation_drops_trailing_spaces() {
        let long = format!("{} {}", "c".repeat(245), "d".repeat(20));
        let once = sanitize(&long);
        assert_eq!(once, format!("{}.pdf", "c".repeat(245)));
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn stored_name_guard() {
        assert!(is_stored_pdf_name("계약서.pdf"));
        assert!(is_stored_pdf_name("file_1.PDF"));
        assert!(!is_stored_pdf_name("계약서.pdf.json"));
        assert!(!is_stored_pdf_name("../secret.pdf"));
        assert!(!is_stored_pdf_name(".계약서.pdf.1234.part"));
        assert!(!is_stored_pdf_name(".pdf"));
    }
}
