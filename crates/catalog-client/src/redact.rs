use std::borrow::Cow;

const TOKEN_FIELDS: [&str; 2] = ["\"access_token\"", "\"refresh_token\""];
const FORM_SECRETS: [&str; 1] = ["password="];

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let nee = needle.as_bytes();
    if nee.is_empty() {
        return Some(0);
    }
    if nee.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - nee.len()).find(|&i| hay[i..i + nee.len()].eq_ignore_ascii_case(nee))
}

/// Replaces everything after `marker` up to the first byte matching `stop`.
fn redact_after(text: String, marker: &str, stop: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(idx) = find_ascii_case_insensitive(rest, marker) {
        let end = idx + marker.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];

        let consumed: usize = rest
            .chars()
            .take_while(|ch| !stop(*ch))
            .map(char::len_utf8)
            .sum();
        if consumed > 0 {
            out.push_str("REDACTED");
        }
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    out
}

fn redact_json_field(text: String, field: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(idx) = rest.find(field) {
        let end = idx + field.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];

        // Keep `: "` as-is, then swallow the string body.
        let prefix: usize = rest
            .chars()
            .take_while(|ch| ch.is_whitespace() || *ch == ':')
            .map(char::len_utf8)
            .sum();
        out.push_str(&rest[..prefix]);
        rest = &rest[prefix..];
        let Some(body) = rest.strip_prefix('"') else {
            continue;
        };
        let Some(close) = body.find('"') else {
            continue;
        };
        out.push_str("\"REDACTED\"");
        rest = &body[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Scrubs bearer credentials, token fields and form passwords from text that
/// may end up in a log line or an error message.
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let mut value = input.to_string();

    value = redact_after(value, "Bearer ", |ch| ch.is_whitespace() || ch == '"' || ch == ',');
    for field in TOKEN_FIELDS {
        value = redact_json_field(value, field);
    }
    for marker in FORM_SECRETS {
        value = redact_after(value, marker, |ch| ch == '&' || ch.is_whitespace());
    }

    if value == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(value)
    }
}
