//! Markup tokenizer used for `Document::parse` and `innerHTML` assignment.
//!
//! Contract:
//! - Tag and attribute names use the ASCII class `[A-Za-z0-9:_-]` and are lower-cased.
//! - Entities: `&amp; &lt; &gt; &quot; &apos; &nbsp;` plus semicolon-terminated numeric
//!   references. Anything else passes through unchanged.
//! - `script` and `style` contents are raw text up to the matching close tag.
//! - Void elements never produce an end tag token.
//!
//! Not an HTML5 tokenizer: there is no parse-error recovery beyond skipping to `>`.
use memchr::memchr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag(String),
    Text(String),
    Comment(String),
}

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

pub fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

pub fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style")
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':')
}

fn starts_with_ignore_case(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes
        .get(at..at + needle.len())
        .is_some_and(|window| window.eq_ignore_ascii_case(needle))
}

/// Finds `</name` followed by optional whitespace and `>`; returns (start, end-after-`>`).
fn find_raw_text_end(input: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let bytes = input.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        i += memchr(b'<', &bytes[i..])?;
        if bytes.get(i + 1) == Some(&b'/') && starts_with_ignore_case(bytes, i + 2, name.as_bytes())
        {
            let mut k = i + 2 + name.len();
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if bytes.get(k) == Some(&b'>') {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

pub(crate) fn tokenize(input: &str) -> Vec<Token> {
    let bytes = input.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            let start = i;
            i = memchr(b'<', &bytes[i..]).map_or(bytes.len(), |rel| i + rel);
            let text = decode_entities(&input[start..i]);
            if !text.is_empty() {
                out.push(Token::Text(text));
            }
            continue;
        }
        if input[i..].starts_with(COMMENT_START) {
            let body = i + COMMENT_START.len();
            match input[body..].find(COMMENT_END) {
                Some(end) => {
                    out.push(Token::Comment(input[body..body + end].to_string()));
                    i = body + end + COMMENT_END.len();
                }
                None => {
                    out.push(Token::Comment(input[body..].to_string()));
                    i = bytes.len();
                }
            }
            continue;
        }
        if starts_with_ignore_case(bytes, i, b"<!doctype") {
            let rest = &input[i + "<!doctype".len()..];
            let Some(end) = rest.find('>') else {
                break;
            };
            out.push(Token::Doctype(rest[..end].trim().to_string()));
            i += "<!doctype".len() + end + 1;
            continue;
        }
        if bytes.get(i + 1) == Some(&b'/') {
            let start = i + 2;
            let mut j = start;
            while j < bytes.len() && is_name_byte(bytes[j]) {
                j += 1;
            }
            let name = input[start..j].to_ascii_lowercase();
            j = memchr(b'>', &bytes[j..]).map_or(bytes.len(), |rel| j + rel + 1);
            if !name.is_empty() {
                out.push(Token::EndTag(name));
            }
            i = j;
            continue;
        }
        let start = i + 1;
        let mut j = start;
        while j < bytes.len() && is_name_byte(bytes[j]) {
            j += 1;
        }
        if j == start {
            // A lone `<` is text.
            out.push(Token::Text("<".to_string()));
            i += 1;
            continue;
        }
        let name = input[start..j].to_ascii_lowercase();
        let (attributes, self_closing, after) = scan_attributes(input, j);
        i = after;
        let raw = is_raw_text_element(&name);
        out.push(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing,
        });
        if raw && !self_closing {
            match find_raw_text_end(input, i, &name) {
                Some((text_end, tag_end)) => {
                    if text_end > i {
                        out.push(Token::Text(input[i..text_end].to_string()));
                    }
                    out.push(Token::EndTag(name));
                    i = tag_end;
                }
                None => {
                    if i < bytes.len() {
                        out.push(Token::Text(input[i..].to_string()));
                    }
                    i = bytes.len();
                }
            }
        }
    }
    log::trace!(target: "mirror.markup", "tokenized {} bytes into {} tokens", input.len(), out.len());
    out
}

/// Scans attributes from `k` up to and including the closing `>`.
fn scan_attributes(input: &str, mut k: usize) -> (Vec<(String, String)>, bool, usize) {
    let bytes = input.as_bytes();
    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;
    loop {
        while k < bytes.len() && bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        match bytes.get(k) {
            None => return (attributes, self_closing, k),
            Some(b'>') => return (attributes, self_closing, k + 1),
            Some(b'/') => {
                self_closing = bytes.get(k + 1) == Some(&b'>');
                k += 1;
                continue;
            }
            _ => {}
        }
        let name_start = k;
        while k < bytes.len() && is_name_byte(bytes[k]) {
            k += 1;
        }
        if k == name_start {
            // Unsupported byte in attribute position; skip it.
            k += input[k..].chars().next().map_or(1, char::len_utf8);
            continue;
        }
        let name = input[name_start..k].to_ascii_lowercase();
        while k < bytes.len() && bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        let mut value = String::new();
        if bytes.get(k) == Some(&b'=') {
            k += 1;
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            match bytes.get(k) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let value_start = k + 1;
                    let end = memchr(quote, &bytes[value_start..])
                        .map_or(bytes.len(), |rel| value_start + rel);
                    value = decode_entities(&input[value_start..end]);
                    k = (end + 1).min(bytes.len());
                }
                Some(_) => {
                    let value_start = k;
                    while k < bytes.len() && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                        k += 1;
                    }
                    value = decode_entities(&input[value_start..k]);
                }
                None => {}
            }
        }
        // First occurrence wins for duplicate attributes.
        if !attributes.iter().any(|(existing, _)| *existing == name) {
            attributes.push((name, value));
        }
    }
}

pub(crate) fn decode_entities(s: &str) -> String {
    const NAMED: &[(&str, char)] = &[
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&apos;", '\''),
        ("&nbsp;", '\u{a0}'),
    ];
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut copy_start = 0;
    let mut i = 0;
    while let Some(rel) = memchr(b'&', &bytes[i..]) {
        i += rel;
        out.push_str(&s[copy_start..i]);
        if let Some((entity, ch)) = NAMED.iter().find(|(entity, _)| s[i..].starts_with(entity)) {
            out.push(*ch);
            i += entity.len();
        } else if let Some((ch, len)) = decode_numeric(&bytes[i..]) {
            out.push(ch);
            i += len;
        } else {
            out.push('&');
            i += 1;
        }
        copy_start = i;
    }
    out.push_str(&s[copy_start..]);
    out
}

/// `&#123;` or `&#x7B;`; returns the character and the consumed length.
fn decode_numeric(bytes: &[u8]) -> Option<(char, usize)> {
    let rest = bytes.strip_prefix(b"&#")?;
    let (radix, digits_start, max_digits) = match rest.first() {
        Some(b'x' | b'X') => (16, 3, 6),
        _ => (10, 2, 7),
    };
    let digits = &bytes[digits_start..];
    let end = digits.iter().position(|&b| b == b';')?;
    if end == 0 || end > max_digits {
        return None;
    }
    let text = std::str::from_utf8(&digits[..end]).ok()?;
    let value = u32::from_str_radix(text, radix).ok()?;
    let ch = char::from_u32(value)?;
    Some((ch, digits_start + end + 1))
}
