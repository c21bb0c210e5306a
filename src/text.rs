use chrono::NaiveDate;

/// Wrap `text` in `quote` as a SQL literal, doubling any embedded quotes.
/// Text that is already a well-formed quoted literal is returned as is.
pub fn ensure_quoted(text: &str, quote: char) -> String {
    if is_quoted(text, quote) {
        return text.to_string();
    }
    let doubled = format!("{quote}{quote}");
    format!("{quote}{}{quote}", text.replace(quote, &doubled))
}

fn is_quoted(text: &str, quote: char) -> bool {
    let Some(inner) = text
        .strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
    else {
        return false;
    };
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == quote && chars.next() != Some(quote) {
            return false;
        }
    }
    true
}

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn clip(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// `YYYY-MM-DD`
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
