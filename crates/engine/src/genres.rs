use sparty_core::{ArtistDetails, Track};
use std::collections::HashMap;

/// Distinct artist ids across `history`, in first-seen order.
pub fn history_artist_ids(history: &[Track]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    history
        .iter()
        .flat_map(|track| track.artists.iter())
        .filter(|artist| seen.insert(artist.uri.as_str()))
        .map(|artist| artist.uri.clone())
        .collect()
}

/// Most frequent genres across `artists`. Equal counts keep first-seen order.
pub fn top_genres(artists: &[ArtistDetails], limit: usize) -> Vec<String> {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for genre in artists.iter().flat_map(|a| a.genres.iter()) {
        match index.get(genre.as_str()) {
            Some(&i) => tally[i].1 += 1,
            None => {
                index.insert(genre.as_str(), tally.len());
                tally.push((genre.as_str(), 1));
            }
        }
    }
    tally.sort_by(|a, b| b.1.cmp(&a.1));
    tally
        .into_iter()
        .take(limit)
        .map(|(genre, _)| genre.to_string())
        .collect()
}
