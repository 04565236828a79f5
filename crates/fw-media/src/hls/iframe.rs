//! Textual rewrite of a stored I-frame playlist for serving.
//!
//! The playlist written by the media encoder references bare segment file
//! names. At request time each URI gains the media source id and access
//! token as query parameters; everything else passes through verbatim,
//! including directives this code does not know about.

/// Rewrite `iframe.m3u8` text, appending `MediaSourceId` and `ApiKey` query
/// parameters to every segment URI and to the `URI` attribute of
/// `#EXT-X-MAP`.
pub fn rewrite_iframe_playlist(text: &str, media_source_id: &str, api_key: &str) -> String {
    let query = format!("MediaSourceId={media_source_id}&ApiKey={api_key}");
    let mut out = String::with_capacity(text.len() + 64);

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("#EXT-X-MAP:") {
            out.push_str("#EXT-X-MAP:");
            out.push_str(&rewrite_map_attributes(rest, &query));
        } else if !line.is_empty() && !line.starts_with('#') {
            out.push_str(&append_query(line, &query));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Append a query string to a URI, using `?` or `&` as appropriate.
fn append_query(uri: &str, query: &str) -> String {
    if uri.contains('?') {
        format!("{uri}&{query}")
    } else {
        format!("{uri}?{query}")
    }
}

/// Rewrite the `URI="…"` attribute within an `#EXT-X-MAP` attribute list,
/// leaving other attributes untouched.
fn rewrite_map_attributes(attrs: &str, query: &str) -> String {
    let Some(start) = attrs.find("URI=\"") else {
        return attrs.to_string();
    };
    let uri_start = start + 5;
    let Some(rel_end) = attrs[uri_start..].find('"') else {
        return attrs.to_string();
    };
    let uri_end = uri_start + rel_end;

    let mut out = String::with_capacity(attrs.len() + query.len() + 1);
    out.push_str(&attrs[..uri_start]);
    out.push_str(&append_query(&attrs[uri_start..uri_end], query));
    out.push_str(&attrs[uri_end..]);
    out
}
