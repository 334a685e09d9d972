// crates/docbridge-core/src/core/xmlscan.rs
// ============================================================================
// Module: Docbridge XML Scanning
// Description: Minimal namespace-agnostic XML element and attribute scanning.
// Purpose: Parse the small fixed wire formats without a full XML stack.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The discovery documents and AS4 envelopes Docbridge consumes are small,
//! fixed-shape XML documents. This module provides the minimal scanning the
//! exchange needs: locate an element by local name (ignoring namespace
//! prefixes), read its inner content or attributes, and escape/unescape the
//! five predefined entities. It is not a general XML parser; unknown or
//! malformed structure resolves to `None` and callers fail closed.

// ============================================================================
// SECTION: Element Access
// ============================================================================

/// Borrowed view of one XML element.
///
/// # Invariants
/// - `tag` is the start-tag content without angle brackets.
/// - `inner` is the raw content between start and matching end tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    /// Start-tag content (name plus attributes).
    pub tag: &'a str,
    /// Raw inner content, unparsed.
    pub inner: &'a str,
}

/// Returns the first element with the given local name.
#[must_use]
pub fn first_element<'a>(xml: &'a str, local: &str) -> Option<Element<'a>> {
    scan_elements(xml, local, 1).into_iter().next()
}

/// Returns all non-nested elements with the given local name, in order.
#[must_use]
pub fn elements<'a>(xml: &'a str, local: &str) -> Vec<Element<'a>> {
    scan_elements(xml, local, usize::MAX)
}

/// Returns the unescaped, trimmed text of the first matching element.
#[must_use]
pub fn text(xml: &str, local: &str) -> Option<String> {
    first_element(xml, local).map(|element| unescape(element.inner.trim()))
}

/// Returns the value of the named attribute in a start tag.
///
/// Attribute names are matched by local name, ignoring namespace prefixes.
#[must_use]
pub fn attribute(tag: &str, name: &str) -> Option<String> {
    let mut rest = tag.trim_end_matches('/').trim();
    // Skip the element name token.
    let name_end = rest.find(char::is_whitespace)?;
    rest = rest[name_end..].trim_start();
    while !rest.is_empty() {
        let eq = rest.find('=')?;
        let attr_name = rest[..eq].trim();
        let after_eq = rest[eq + 1..].trim_start();
        let quote = after_eq.chars().next()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        let value_start = &after_eq[quote.len_utf8()..];
        let close = value_start.find(quote)?;
        let value = &value_start[..close];
        if local_name(attr_name) == name {
            return Some(unescape(value));
        }
        rest = value_start[close + quote.len_utf8()..].trim_start();
    }
    None
}

// ============================================================================
// SECTION: Scanning
// ============================================================================

/// Returns the local part of a possibly prefixed XML name.
fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Scans for elements with the given local name, up to `limit` matches.
fn scan_elements<'a>(xml: &'a str, local: &str, limit: usize) -> Vec<Element<'a>> {
    let mut found = Vec::new();
    let mut pos = 0;
    while found.len() < limit {
        let Some(open_rel) = xml[pos..].find('<') else {
            break;
        };
        let open = pos + open_rel;
        let rest = &xml[open..];
        if rest.starts_with("<!--") {
            match rest.find("-->") {
                Some(end) => {
                    pos = open + end + 3;
                    continue;
                }
                None => break,
            }
        }
        if rest.starts_with("<?") || rest.starts_with("</") || rest.starts_with("<!") {
            pos = open + 1;
            continue;
        }
        let Some(tag_end_rel) = rest.find('>') else {
            break;
        };
        let tag = &rest[1..tag_end_rel];
        let name = tag
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default();
        if local_name(name) != local {
            pos = open + 1;
            continue;
        }
        if tag.trim_end().ends_with('/') {
            found.push(Element {
                tag,
                inner: "",
            });
            pos = open + tag_end_rel + 1;
            continue;
        }
        let body_start = open + tag_end_rel + 1;
        let Some((inner_end, element_end)) = find_closing(xml, body_start, local) else {
            break;
        };
        found.push(Element {
            tag,
            inner: &xml[body_start..inner_end],
        });
        pos = element_end;
    }
    found
}

/// Finds the matching close tag for an element opened before `start`.
///
/// Returns `(inner_end, element_end)` byte offsets, tracking nesting depth
/// for elements sharing the same local name.
fn find_closing(xml: &str, start: usize, local: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut pos = start;
    loop {
        let open_rel = xml[pos..].find('<')?;
        let open = pos + open_rel;
        let rest = &xml[open..];
        if rest.starts_with("<!--") {
            pos = open + rest.find("-->")? + 3;
            continue;
        }
        let tag_end_rel = rest.find('>')?;
        let tag = &rest[1..tag_end_rel];
        if let Some(close_name) = tag.strip_prefix('/') {
            if local_name(close_name.trim()) == local {
                if depth == 0 {
                    return Some((open, open + tag_end_rel + 1));
                }
                depth -= 1;
            }
        } else {
            let name = tag
                .split(|c: char| c.is_whitespace() || c == '/')
                .next()
                .unwrap_or_default();
            if local_name(name) == local && !tag.trim_end().ends_with('/') {
                depth += 1;
            }
        }
        pos = open + tag_end_rel + 1;
    }
}

// ============================================================================
// SECTION: Entity Escaping
// ============================================================================

/// Escapes the five predefined XML entities in text content.
#[must_use]
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Unescapes the five predefined XML entities; unknown entities pass through.
#[must_use]
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        let replaced = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&apos;", '\''),
        ]
        .iter()
        .find(|(entity, _)| tail.starts_with(entity));
        match replaced {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
