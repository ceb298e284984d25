const KINDS: [&str; 7] = ["track", "artist", "album", "playlist", "episode", "show", "user"];

/// Strips a provider namespace such as `spotify:track:` from a URI, leaving the
/// bare id. URIs of any other shape (local files included) are kept whole.
pub fn strip_namespace(uri: &str) -> &str {
    let Some(rest) = uri.strip_prefix("spotify:") else {
        return uri;
    };
    match rest.split_once(':') {
        Some((kind, id)) if KINDS.contains(&kind) && !id.is_empty() && !id.contains(':') => id,
        _ => uri,
    }
}

pub fn track_uri(id: &str) -> String {
    if id.contains(':') {
        id.to_string()
    } else {
        format!("spotify:track:{id}")
    }
}
