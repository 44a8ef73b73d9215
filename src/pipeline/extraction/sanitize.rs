use super::types::LineRecord;

/// Punctuation and unit symbols that survive sanitization.
const LABEL_SYMBOLS: &[char] = &[
    '.', ',', ';', ':', '-', '/', '(', ')', '[', ']', '+', '=', '%', '#', '&', '\'', '"', '!',
    '?', '<', '>', '*', '_', '|', '°', 'µ', '®', '™',
    '\u{2013}', // en dash in ranges like 2–3
    '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}',
];

fn is_label_char(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace() || LABEL_SYMBOLS.contains(&c)
}

/// Sanitize recognized label text before it reaches the parser.
/// Strips control characters and stray symbols, collapses whitespace within
/// each line and drops blank lines.
pub fn sanitize_extracted_text(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let kept: String = line.chars().filter(|c| is_label_char(*c)).collect();
            kept.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// One record per non-empty line of already sanitized text.
pub fn to_line_records(text: &str, confidence: f32) -> Vec<LineRecord> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| LineRecord {
            text: l.to_string(),
            confidence,
        })
        .collect()
}
