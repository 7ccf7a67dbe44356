//! Distance values and the map arithmetic shared by all protocols
//!
//! Distances are non-negative integers with an `INF` sentinel that is
//! greatest under comparison and absorbing under addition. Distance maps
//! never store `INF`: an absent key means unreachable, and recording `INF`
//! deletes the entry. The free functions here replace what would otherwise
//! be copy-pasted lookup/accumulate logic in every protocol.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::link::LinkTable;
use super::NodeId;

/// A distance toward the destination, or a link cost.
///
/// `Distance::INF` marks unreachable. Because the sentinel is the maximum
/// representable value, the derived ordering already treats it as greater
/// than every finite distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Distance(u32);

impl Distance {
    /// Zero distance (a node's distance to itself).
    pub const ZERO: Distance = Distance(0);
    /// The unreachable sentinel.
    pub const INF: Distance = Distance(u32::MAX);

    /// Creates a distance from a raw value. `u32::MAX` is the sentinel.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Checks whether this is the unreachable sentinel.
    pub fn is_infinite(self) -> bool {
        self.0 == u32::MAX
    }

    /// Checks whether this is a finite distance.
    pub fn is_finite(self) -> bool {
        !self.is_infinite()
    }

    /// Returns the raw value (`u32::MAX` for the sentinel).
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Adds two distances. `INF` absorbs, and finite overflow clamps to `INF`.
    pub fn saturating_add(self, other: Distance) -> Distance {
        if self.is_infinite() || other.is_infinite() {
            return Distance::INF;
        }
        match self.0.checked_add(other.0) {
            Some(sum) if sum < u32::MAX => Distance(sum),
            _ => Distance::INF,
        }
    }

    /// Subtracts a finite distance, or `None` when the result would be
    /// negative or either operand is the sentinel.
    pub fn checked_sub(self, other: Distance) -> Option<Distance> {
        if self.is_infinite() || other.is_infinite() {
            return None;
        }
        self.0.checked_sub(other.0).map(Distance)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            f.write_str("INF")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Looks up a distance in a map, treating absent keys as unreachable.
pub fn lookup(map: &BTreeMap<NodeId, Distance>, key: &NodeId) -> Distance {
    map.get(key).copied().unwrap_or(Distance::INF)
}

/// Records a distance in a map. Recording `INF` removes the entry, so maps
/// only ever hold finite distances.
pub fn record(map: &mut BTreeMap<NodeId, Distance>, key: &NodeId, distance: Distance) {
    if distance.is_infinite() {
        map.remove(key);
    } else {
        map.insert(key.clone(), distance);
    }
}

/// Distance to the destination when routing via `peer`: the distance the
/// peer last reported plus the cost of the outgoing link to it.
pub fn distance_via(
    peer: &NodeId,
    reported: &BTreeMap<NodeId, Distance>,
    links: &LinkTable,
) -> Distance {
    lookup(reported, peer).saturating_add(links.outgoing_cost(peer))
}

/// Best distance to the destination over a set of candidate peers.
///
/// The destination itself is always at distance zero, regardless of
/// candidates. An empty candidate set yields `INF`.
pub fn best_distance_over<'a, I>(
    node: &NodeId,
    peers: I,
    reported: &BTreeMap<NodeId, Distance>,
    links: &LinkTable,
) -> Distance
where
    I: IntoIterator<Item = &'a NodeId>,
{
    if node.is_dest() {
        return Distance::ZERO;
    }
    let mut best = Distance::INF;
    for peer in peers {
        best = best.min(distance_via(peer, reported, links));
    }
    best
}

/// Pops the queued identity with the smallest mapped distance, smallest
/// identity breaking ties. `None` when the queue is empty or nothing queued
/// is reachable. Shared by every closest-first expansion in the crate so
/// they all break ties the same way.
pub fn pop_closest(
    queue: &mut BTreeSet<NodeId>,
    dist: &BTreeMap<NodeId, Distance>,
) -> Option<NodeId> {
    let mut best = Distance::INF;
    let mut best_id: Option<NodeId> = None;
    for id in queue.iter() {
        let d = lookup(dist, id);
        if d < best {
            best = d;
            best_id = Some(id.clone());
        }
    }
    let id = best_id?;
    queue.remove(&id);
    Some(id)
}

/// Renders a distance map as `{a: 1, b: 2}` in key order.
pub fn format_distances(map: &BTreeMap<NodeId, Distance>) -> String {
    let entries: Vec<String> = map.iter().map(|(k, d)| format!("{k}: {d}")).collect();
    format!("{{{}}}", entries.join(", "))
}

/// Renders a collection of node identities as `{a, b}` in iteration order.
pub fn format_ids<'a, I>(ids: I) -> String
where
    I: IntoIterator<Item = &'a NodeId>,
{
    let entries: Vec<String> = ids.into_iter().map(ToString::to_string).collect();
    format!("{{{}}}", entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infinity_absorbs_addition() {
        assert_eq!(Distance::INF.saturating_add(Distance::new(5)), Distance::INF);
        assert_eq!(Distance::new(5).saturating_add(Distance::INF), Distance::INF);
        assert_eq!(
            Distance::new(2).saturating_add(Distance::new(3)),
            Distance::new(5)
        );
    }

    #[test]
    fn test_overflow_clamps_to_infinity() {
        let huge = Distance::new(u32::MAX - 1);
        assert_eq!(huge.saturating_add(Distance::new(1)), Distance::INF);
        assert_eq!(huge.saturating_add(huge), Distance::INF);
    }

    #[test]
    fn test_infinity_is_greatest() {
        assert!(Distance::new(u32::MAX - 1) < Distance::INF);
        assert!(Distance::ZERO < Distance::new(1));
    }

    #[test]
    fn test_checked_sub() {
        assert_eq!(
            Distance::new(7).checked_sub(Distance::new(3)),
            Some(Distance::new(4))
        );
        assert_eq!(Distance::new(3).checked_sub(Distance::new(7)), None);
        assert_eq!(Distance::INF.checked_sub(Distance::new(1)), None);
    }

    #[test]
    fn test_record_infinity_removes_entry() {
        let mut map = BTreeMap::new();
        let peer = NodeId::new("1");
        record(&mut map, &peer, Distance::new(4));
        assert_eq!(lookup(&map, &peer), Distance::new(4));
        record(&mut map, &peer, Distance::INF);
        assert!(map.is_empty());
        assert_eq!(lookup(&map, &peer), Distance::INF);
    }

    #[test]
    fn test_best_distance_over_peers() {
        let mut links = LinkTable::default();
        links.set_outgoing(&NodeId::new("1"), Distance::new(10));
        links.set_outgoing(&NodeId::new("2"), Distance::new(1));
        let mut reported = BTreeMap::new();
        record(&mut reported, &NodeId::new("1"), Distance::new(2));

        let me = NodeId::new("5");
        let best = best_distance_over(&me, links.outgoing().keys(), &reported, &links);
        // Via "1": 2 + 10 = 12. Via "2": INF (nothing reported).
        assert_eq!(best, Distance::new(12));
    }

    #[test]
    fn test_destination_is_at_distance_zero() {
        let links = LinkTable::default();
        let reported = BTreeMap::new();
        let best = best_distance_over(&NodeId::dest(), [].iter(), &reported, &links);
        assert_eq!(best, Distance::ZERO);
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(Distance::new(17).to_string(), "17");
        assert_eq!(Distance::INF.to_string(), "INF");
        let mut map = BTreeMap::new();
        record(&mut map, &NodeId::new("2"), Distance::new(3));
        record(&mut map, &NodeId::new("1"), Distance::new(9));
        assert_eq!(format_distances(&map), "{1: 9, 2: 3}");
        assert_eq!(format_ids([NodeId::new("a"), NodeId::new("b")].iter()), "{a, b}");
    }

    #[test]
    fn test_pop_closest_breaks_ties_by_identity() {
        let mut queue: BTreeSet<NodeId> =
            [NodeId::new("3"), NodeId::new("1"), NodeId::new("2")].into();
        let mut dist = BTreeMap::new();
        record(&mut dist, &NodeId::new("3"), Distance::new(4));
        record(&mut dist, &NodeId::new("1"), Distance::new(4));

        // "1" and "3" tie at 4; the smaller identity wins.
        assert_eq!(pop_closest(&mut queue, &dist), Some(NodeId::new("1")));
        assert_eq!(pop_closest(&mut queue, &dist), Some(NodeId::new("3")));
        // "2" has no distance at all, so it is never popped.
        assert_eq!(pop_closest(&mut queue, &dist), None);
        assert!(queue.contains(&NodeId::new("2")));
    }
}
