//! Removes active markup from operator-supplied text before it is stored.

const STRIPPED_ELEMENTS: &[&str] = &["script", "iframe"];
const SCRIPT_SCHEME: &str = "javascript:";

/// Strip `<script>` and `<iframe>` elements, `javascript:` URIs and inline
/// `on*=` event-handler attributes, then trim surrounding whitespace.
///
/// Passes repeat until the text stops changing, so fragments that reassemble
/// into a tag after one removal are caught as well.
pub fn sanitize_text(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let mut next = current.clone();
        for tag in STRIPPED_ELEMENTS {
            next = strip_element(&next, tag);
        }
        next = strip_event_handlers(&next);
        next = remove_ignore_case(&next, SCRIPT_SCHEME);
        if next == current {
            break;
        }
        current = next;
    }
    current.trim().to_string()
}

/// ASCII case-insensitive search for an ASCII `needle`.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    hay.windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

/// Position of `<tag` where the name is not just a prefix of a longer name.
fn find_open_tag(haystack: &str, open: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = find_ignore_case(&haystack[offset..], open) {
        let start = offset + pos;
        let after = haystack.as_bytes().get(start + open.len());
        match after {
            None => return Some(start),
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => return Some(start),
            _ => offset = start + open.len(),
        }
    }
    None
}

fn strip_element(input: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}");
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = find_open_tag(rest, &open) {
        out.push_str(&rest[..start]);
        let element = &rest[start..];
        // Unclosed elements lose only their opening tag.
        let end = match find_ignore_case(element, &close) {
            Some(c) => element[c..]
                .find('>')
                .map(|g| c + g + 1)
                .unwrap_or(element.len()),
            None => element.find('>').map(|g| g + 1).unwrap_or(element.len()),
        };
        rest = &element[end..];
    }
    out.push_str(rest);
    out
}

fn remove_ignore_case(input: &str, needle: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = find_ignore_case(rest, needle) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + needle.len()..];
    }
    out.push_str(rest);
    out
}

/// Length of an `onxxx = value` attribute at the start of `bytes`.
fn handler_len(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < 3 || !bytes[..2].eq_ignore_ascii_case(b"on") {
        return None;
    }
    let mut i = 2;
    while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
        i += 1;
    }
    if i == 2 {
        return None;
    }
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if bytes.get(i) != Some(&b'=') {
        return None;
    }
    i += 1;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    match bytes.get(i) {
        Some(&q) if q == b'"' || q == b'\'' => {
            let close = bytes[i + 1..].iter().position(|&b| b == q);
            Some(close.map(|c| i + 1 + c + 1).unwrap_or(bytes.len()))
        }
        _ => {
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                i += 1;
            }
            Some(i)
        }
    }
}

fn strip_event_handlers(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut copied_from = 0;
    let mut in_tag = false;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if !in_tag {
            if b == b'<' && bytes.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic()) {
                in_tag = true;
            }
            i += 1;
            continue;
        }
        match b {
            b'>' => {
                in_tag = false;
                i += 1;
            }
            b'"' | b'\'' => {
                quote = Some(b);
                i += 1;
            }
            _ => {
                let prev = bytes[i - 1];
                let at_attribute =
                    prev.is_ascii_whitespace() || prev == b'/' || prev == b'"' || prev == b'\'';
                match handler_len(&bytes[i..]).filter(|_| at_attribute) {
                    Some(len) => {
                        out.push_str(&input[copied_from..i]);
                        i += len;
                        copied_from = i;
                    }
                    None => i += 1,
                }
            }
        }
    }
    out.push_str(&input[copied_from..]);
    out
}
