use sparty_core::{Party, User, Visibility};

#[derive(Debug, Clone, PartialEq)]
pub struct PartyMatch {
    pub party: Party,
    /// Genres the party has in common with the user, in the party's order.
    pub shared: Vec<String>,
}

/// Parties sharing at least one top genre with `user`, best match first.
///
/// Private parties and parties the user already takes part in are left out.
/// Equal overlap keeps the input order.
pub fn match_parties(parties: Vec<Party>, user: &User) -> Vec<PartyMatch> {
    let mut matches: Vec<PartyMatch> = parties
        .into_iter()
        .filter(|party| party.info.visibility != Visibility::Private)
        .filter(|party| !party.info.is_participant(&user.id))
        .filter_map(|party| {
            let shared: Vec<String> = party
                .info
                .genres
                .iter()
                .filter(|genre| user.top_genres.contains(genre))
                .cloned()
                .collect();
            (!shared.is_empty()).then_some(PartyMatch { party, shared })
        })
        .collect();
    matches.sort_by(|a, b| b.shared.len().cmp(&a.shared.len()));
    matches
}
