use std::collections::HashMap;
use std::hash::Hash;
use ytmusic::{ArtistRef, PlayEvent};

/// An item paired with how many times its key occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked<T> {
    pub item: T,
    pub count: u32,
}

/// Artist grouping key. An id and a display name never compare equal even
/// when the strings match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtistKey<'a> {
    Id(&'a str),
    Name(&'a str),
}

impl<'a> ArtistKey<'a> {
    pub fn of(artist: &'a ArtistRef) -> Option<Self> {
        fn non_empty(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|s| !s.is_empty())
        }

        non_empty(&artist.id)
            .map(ArtistKey::Id)
            .or_else(|| non_empty(&artist.name).map(ArtistKey::Name))
    }
}

/// Ranks `items` by how often their key occurs, most frequent first, keeping
/// at most `limit` distinct keys. Items whose key is `None` are not counted.
///
/// Equal counts are ordered by first occurrence. Since histories are most
/// recent first, the key played most recently wins the tie. The item returned
/// for a key is its first (most recent) occurrence.
pub fn rank_by<'a, T, K, F>(items: &'a [T], key: F, limit: usize) -> Vec<Ranked<&'a T>>
where
    K: Eq + Hash,
    F: Fn(&'a T) -> Option<K>,
{
    // pass one: frequency table, slots numbered in first-occurrence order
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<u32> = Vec::new();

    for item in items {
        if let Some(k) = key(item) {
            let next = counts.len();
            let slot = *slots.entry(k).or_insert(next);
            if slot == next {
                counts.push(0);
            }
            counts[slot] += 1;
        }
    }

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|a, b| counts[*b].cmp(&counts[*a]).then(a.cmp(b)));
    order.truncate(limit);

    let mut position_of_slot: Vec<Option<usize>> = vec![None; counts.len()];
    for (position, slot) in order.iter().enumerate() {
        position_of_slot[*slot] = Some(position);
    }

    // pass two: most recent representative for every selected key
    let mut representatives: Vec<Option<&'a T>> = vec![None; order.len()];
    for item in items {
        let Some(k) = key(item) else { continue };
        if let Some(position) = slots.get(&k).and_then(|slot| position_of_slot[*slot]) {
            representatives[position].get_or_insert(item);
        }
    }

    order
        .iter()
        .zip(representatives)
        .filter_map(|(slot, item)| {
            item.map(|item| Ranked {
                item,
                count: counts[*slot],
            })
        })
        .collect()
}

/// Top tracks keyed by video id. Events without a video id are ignored.
pub fn rank_tracks(events: &[PlayEvent], limit: usize) -> Vec<Ranked<&PlayEvent>> {
    rank_by(
        events,
        |event| event.video_id.as_deref().filter(|id| !id.is_empty()),
        limit,
    )
}

/// Top artists over every (event, credited artist) pair.
pub fn rank_artists(events: &[PlayEvent], limit: usize) -> Vec<Ranked<&ArtistRef>> {
    let credits: Vec<&ArtistRef> = events.iter().flat_map(|e| e.artists.iter()).collect();

    let ranked = rank_by(&credits, |artist| ArtistKey::of(artist), limit);
    ranked
        .into_iter()
        .map(|ranked| Ranked {
            item: *ranked.item,
            count: ranked.count,
        })
        .collect()
}
