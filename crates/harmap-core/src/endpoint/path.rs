//! Path normalization for endpoint identity.
//!
//! Only numeric and UUID-shaped segments are treated as literal identifiers;
//! slugs, hashes and dates stay as written.

/// One segment of a normalized path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// Placeholder name without braces (`id`, `app_id`, ...).
    Placeholder(&'a str),
}

pub fn is_numeric_segment(seg: &str) -> bool {
    !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit())
}

/// `8-4-4-4-12` hex digits, any case.
pub fn is_uuid_segment(seg: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = seg.split('-').collect();
    parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS)
            .all(|(p, len)| p.len() == len && p.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Name of an explicit placeholder segment: `{name}` or `:name`.
pub fn placeholder_name(seg: &str) -> Option<&str> {
    let name = if let Some(inner) = seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        inner
    } else {
        seg.strip_prefix(':')?
    };
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

/// Path component only: full URLs are reduced to their path; query string
/// and fragment are dropped.
fn path_only(raw: &str) -> &str {
    let raw = raw.trim();
    let raw = if raw.starts_with("http://") || raw.starts_with("https://") {
        let after_scheme = &raw[raw.find("://").map_or(0, |i| i + 3)..];
        after_scheme.find('/').map_or("/", |i| &after_scheme[i..])
    } else {
        raw
    };
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    &raw[..end]
}

/// Display form: literal identifiers become `{id}`, named placeholders are
/// kept (`:name` is rewritten to `{name}`), empty segments and the trailing
/// slash are dropped. Always starts with `/`.
///
/// `/users/123/` → `/users/{id}`, `/apps/:app_id/stats?x=1` → `/apps/{app_id}/stats`.
pub fn normalize_display_path(raw: &str) -> String {
    let mut out = String::new();
    for seg in path_only(raw).split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        if let Some(name) = placeholder_name(seg) {
            out.push('{');
            out.push_str(name);
            out.push('}');
        } else if is_numeric_segment(seg) || is_uuid_segment(seg) {
            out.push_str("{id}");
        } else {
            out.push_str(seg);
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Identity form: like the display form with every placeholder collapsed to
/// `{id}`, so `/apps/{app_id}` and `/apps/123` share a key.
pub fn key_path(raw: &str) -> String {
    let display = normalize_display_path(raw);
    let mut out = String::new();
    for seg in segments(&display) {
        out.push('/');
        match seg {
            Segment::Literal(l) => out.push_str(l),
            Segment::Placeholder(_) => out.push_str("{id}"),
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Segments of an already-normalized path.
pub fn segments(path: &str) -> impl Iterator<Item = Segment<'_>> {
    path.split('/').filter(|s| !s.is_empty()).map(|seg| {
        match placeholder_name(seg) {
            Some(name) => Segment::Placeholder(name),
            None => Segment::Literal(seg),
        }
    })
}
