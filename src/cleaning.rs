//! Cleanup of model-generated analysis text.
//!
//! Generated prose sometimes arrives with doubly-escaped markdown artifacts:
//! literal `\n` two-character sequences, stray `\n\n**7`-style numbered bold
//! markers, and escaped `\*` / `\#`. These are transport artifacts, not
//! content, and are stripped before the text reaches a reader.

/// Strips escape artifacts from generated analysis text.
pub fn clean_analysis_text(text: &str) -> String {
    let cleaned = strip_numbered_bold_markers(text);

    let cleaned = cleaned
        .replace("\\n\\n**", "")
        .replace("\\n*", "")
        .replace("\\n", "\n")
        .replace("\\*", "*")
        .replace("\\#", "#");

    collapse_blank_runs(&cleaned).trim().to_string()
}

/// Removes literal `\n\n**` sequences followed by digits (artifact of the
/// model numbering sections it was told not to number).
fn strip_numbered_bold_markers(text: &str) -> String {
    const MARKER: &str = "\\n\\n**";
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(MARKER) {
        let after = &rest[pos + MARKER.len()..];
        let digits = after.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            out.push_str(&rest[..pos]);
            rest = &after[digits..];
        } else {
            out.push_str(&rest[..pos + MARKER.len()]);
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

/// Collapses runs of three or more newlines down to a single blank line.
fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0;
    for c in text.chars() {
        if c == '\n' {
            run += 1;
            if run <= 2 {
                out.push(c);
            }
        } else {
            run = 0;
            out.push(c);
        }
    }
    out
}
