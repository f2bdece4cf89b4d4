//! Python-literal rendering: `STRATEGY = <dict>` where the dict is the
//! pretty-printed JSON document with `true`/`false`/`null` rewritten to
//! `True`/`False`/`None`. The rewrite scans the text and skips string
//! spans, so string values containing those words are untouched.

use serde_json::Value;

pub fn render(doc: &Value) -> String {
    let json = serde_json::to_string_pretty(doc).unwrap_or_else(|_| "{}".to_string());
    format!("STRATEGY = {}", substitute_keywords(&json))
}

pub(crate) fn substitute_keywords(json: &str) -> String {
    let bytes = json.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
        } else if b == b'"' {
            in_string = true;
            out.push(b);
            i += 1;
        } else if bytes[i..].starts_with(b"true") {
            out.extend_from_slice(b"True");
            i += 4;
        } else if bytes[i..].starts_with(b"false") {
            out.extend_from_slice(b"False");
            i += 5;
        } else if bytes[i..].starts_with(b"null") {
            out.extend_from_slice(b"None");
            i += 4;
        } else {
            out.push(b);
            i += 1;
        }
    }
    // Only ASCII bytes were rewritten, so the result stays valid UTF-8.
    String::from_utf8(out).unwrap_or_else(|_| json.to_string())
}
