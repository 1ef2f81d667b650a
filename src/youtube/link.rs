// Playlist link parsing
// Pulls the playlist identifier out of whatever the user pasted

const LIST_MARKER: &str = "list=";

// Characters that end the identifier token
fn is_token_end(c: char) -> bool {
    matches!(c, '&' | '#' | '?')
}

// ==========================================
// extract_playlist_id()
// ==========================================
// Finds a `list=` parameter and returns its value.
//
// Rules:
// - the marker must start a query parameter (preceded by `?` or `&`)
// - the token runs until `&`, `#`, `?` or the end of the string
// - an empty token does not count; the next marker is tried instead
//
// Examples:
// - "https://www.youtube.com/watch?v=abc&list=PL123" → Some("PL123")
// - "https://www.youtube.com/playlist?list=PL123#top" → Some("PL123")
// - "https://www.youtube.com/watch?v=abc" → None
pub fn extract_playlist_id(link: &str) -> Option<String> {
    for (pos, _) in link.match_indices(LIST_MARKER) {
        let starts_param = link[..pos]
            .chars()
            .next_back()
            .map_or(false, |c| c == '?' || c == '&');
        if !starts_param {
            continue;
        }

        let rest = &link[pos + LIST_MARKER.len()..];
        let token: &str = match rest.find(is_token_end) {
            Some(end) => &rest[..end],
            None => rest,
        };

        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    None
}
