//! Quote-aware tag scanner shared by the tool-call and agent-call parsers.
//!
//! LLMs embed dispatch directives in free-form prose as XML-ish tags whose
//! attribute values routinely contain `>`, `/>`, quotes, and JSON.  A regex
//! cannot track quote state, so extraction is a small hand-rolled scanner:
//! find each `<name` occurrence, walk forward tracking single/double quotes
//! and backslash escapes until the real tag terminator, then pull the
//! attributes (and, for paired tags, the inner body) out of the span.

/// One extracted tag occurrence.
#[derive(Debug, Clone)]
pub(crate) struct ScannedTag {
    /// Attributes in declaration order, keys lowercased.
    pub attrs: Vec<(String, String)>,
    /// Inner body for paired tags (`<t ...>body</t>`), untrimmed.
    pub body: Option<String>,
    /// The raw directive text, open tag through close tag.
    pub raw: String,
}

impl ScannedTag {
    /// First value for a (case-insensitive) attribute key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Extract every `<name ...>` tag from `text`, in textual order.
///
/// `>` or `/>` inside quoted attribute values does not terminate the tag,
/// and `\x` skips the next character wherever it appears.
pub(crate) fn scan_tags(text: &str, name: &str) -> Vec<ScannedTag> {
    let open = format!("<{name}");
    let close = format!("</{name}>");
    let bytes = text.as_bytes();

    let mut tags = Vec::new();
    let mut search_from = 0;

    while let Some(rel) = text[search_from..].find(&open) {
        let start = search_from + rel;
        let after_name = start + open.len();

        // Require a real tag boundary after the name so `<agent_callback`
        // does not match `<agent_call`.
        match bytes.get(after_name) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => {}
            _ => {
                search_from = after_name;
                continue;
            }
        }

        let Some((attr_end, tag_end, self_closing)) = find_tag_end(bytes, after_name) else {
            // Unterminated tag; nothing further can parse.
            break;
        };

        let attrs = parse_attrs(&text[after_name..attr_end]);

        if self_closing {
            tags.push(ScannedTag {
                attrs,
                body: None,
                raw: text[start..tag_end].to_owned(),
            });
            search_from = tag_end;
            continue;
        }

        // Paired form: capture up to the matching close tag.  A missing close
        // tag degrades to a body-less directive.
        match text[tag_end..].find(&close) {
            Some(body_rel) => {
                let body_start = tag_end;
                let body_end = tag_end + body_rel;
                let raw_end = body_end + close.len();
                tags.push(ScannedTag {
                    attrs,
                    body: Some(text[body_start..body_end].to_owned()),
                    raw: text[start..raw_end].to_owned(),
                });
                search_from = raw_end;
            }
            None => {
                tags.push(ScannedTag {
                    attrs,
                    body: None,
                    raw: text[start..tag_end].to_owned(),
                });
                search_from = tag_end;
            }
        }
    }

    tags
}

/// Walk from `pos` to the tag's terminating `>`, honoring quotes and escapes.
///
/// Returns `(attr_span_end, index_after_gt, self_closing)`.
fn find_tag_end(bytes: &[u8], pos: usize) -> Option<(usize, usize, bool)> {
    let mut i = pos;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];

        if b == b'\\' {
            i += 2;
            continue;
        }

        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => {
                    let self_closing = i > pos && bytes[i - 1] == b'/';
                    let attr_end = if self_closing { i - 1 } else { i };
                    return Some((attr_end, i + 1, self_closing));
                }
                _ => {}
            },
        }

        i += 1;
    }

    None
}

/// Parse `key="value"` / `key='value'` / `key=value` pairs from an attribute
/// span.  Keys are lowercased; quoted values honor backslash escapes;
/// unquoted values run until whitespace, `>`, or `/`.
fn parse_attrs(span: &str) -> Vec<(String, String)> {
    let bytes = span.as_bytes();
    let mut attrs = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        // Skip separators.
        if bytes[i].is_ascii_whitespace() || bytes[i] == b'/' {
            i += 1;
            continue;
        }

        // Key.
        let key_start = i;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'-') {
            i += 1;
        }
        if i == key_start {
            i += 1;
            continue;
        }
        let key = span[key_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            // Bare attribute without a value; directives never use these.
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        // Value.
        let value = if bytes[i] == b'"' || bytes[i] == b'\'' {
            let quote = bytes[i];
            i += 1;
            let mut value = String::new();
            while i < bytes.len() {
                let b = bytes[i];
                if b == b'\\' && i + 1 < bytes.len() {
                    let esc_len = utf8_len(bytes[i + 1]);
                    value.push_str(&span[i + 1..i + 1 + esc_len]);
                    i += 1 + esc_len;
                    continue;
                }
                if b == quote {
                    i += 1;
                    break;
                }
                // Multi-byte characters pass through untouched.
                let ch_len = utf8_len(b);
                value.push_str(&span[i..i + ch_len]);
                i += ch_len;
            }
            value
        } else {
            let value_start = i;
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && bytes[i] != b'>'
                && bytes[i] != b'/'
            {
                i += 1;
            }
            span[value_start..i].to_owned()
        };

        attrs.push((key, value));
    }

    attrs
}

/// Length in bytes of the UTF-8 sequence starting with `b`.
fn utf8_len(b: u8) -> usize {
    match b {
        b if b & 0b1000_0000 == 0 => 1,
        b if b & 0b1110_0000 == 0b1100_0000 => 2,
        b if b & 0b1111_0000 == 0b1110_0000 => 3,
        _ => 4,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
