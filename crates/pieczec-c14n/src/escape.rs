#![forbid(unsafe_code)]

//! Character references written by the canonicalizers.
//!
//! Text nodes replace `& < >` and CR. Attribute values replace `& < "`
//! and the three whitespace characters TAB, LF and CR. Processing
//! instruction data replaces CR only.

fn text_reference(ch: char) -> Option<&'static str> {
    match ch {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '\r' => Some("&#xD;"),
        _ => None,
    }
}

fn attr_reference(ch: char) -> Option<&'static str> {
    match ch {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '"' => Some("&quot;"),
        '\t' => Some("&#x9;"),
        '\n' => Some("&#xA;"),
        '\r' => Some("&#xD;"),
        _ => None,
    }
}

fn pi_reference(ch: char) -> Option<&'static str> {
    (ch == '\r').then_some("&#xD;")
}

/// Append `s` to `out`, copying unescaped runs in one go.
fn write_escaped(out: &mut Vec<u8>, s: &str, reference: fn(char) -> Option<&'static str>) {
    let mut run_start = 0;
    for (pos, ch) in s.char_indices() {
        if let Some(replacement) = reference(ch) {
            out.extend_from_slice(s[run_start..pos].as_bytes());
            out.extend_from_slice(replacement.as_bytes());
            run_start = pos + ch.len_utf8();
        }
    }
    out.extend_from_slice(s[run_start..].as_bytes());
}

/// Append text node content.
pub fn text(out: &mut Vec<u8>, s: &str) {
    write_escaped(out, s, text_reference);
}

/// Append an attribute or namespace declaration value.
pub fn attr(out: &mut Vec<u8>, s: &str) {
    write_escaped(out, s, attr_reference);
}

/// Append processing instruction data.
pub fn pi(out: &mut Vec<u8>, s: &str) {
    write_escaped(out, s, pi_reference);
}
