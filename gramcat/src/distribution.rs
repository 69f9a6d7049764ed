use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::utils::FeatureMap;

/// Represented events shared by both lifecycle states.
#[derive(Clone, Debug, Default)]
struct EventTable {
    counts: FeatureMap<u64>,
    total: u64,
}

impl EventTable {
    fn get(&self, feature: &str) -> u64 {
        self.counts.get(feature).copied().unwrap_or(0)
    }

    fn remove_all(&mut self, features: Vec<String>) {
        for feature in features {
            if let Some(count) = self.counts.remove(&feature) {
                self.total -= count;
            }
        }
    }

    /// Drops every event whose count is at most `min_count_allowed`.
    fn prune_by_count(&mut self, min_count_allowed: u64) {
        let pruned: Vec<String> = self
            .counts
            .iter()
            .filter(|&(_, &count)| count <= min_count_allowed)
            .map(|(feature, _)| feature.clone())
            .collect();
        log::debug!(
            "pruning {} of {} events with count <= {}",
            pruned.len(),
            self.counts.len(),
            min_count_allowed,
        );
        self.remove_all(pruned);
    }

    /// Keeps at most `max_distinct_allowed` of the most frequent events.
    fn prune_by_rank(&mut self, max_distinct_allowed: usize) {
        let n_pruned = self.counts.len().saturating_sub(max_distinct_allowed);
        if n_pruned == 0 {
            return;
        }
        let mut ranked: Vec<(&String, u64)> = self.counts.iter().map(|(f, &c)| (f, c)).collect();
        ranked.sort_unstable_by(|(f1, c1), (f2, c2)| c1.cmp(c2).then_with(|| f1.cmp(f2)));
        let pruned: Vec<String> = ranked
            .into_iter()
            .take(n_pruned)
            .map(|(feature, _)| feature.clone())
            .collect();
        log::debug!(
            "pruning {} of {} events by rank",
            n_pruned,
            self.counts.len()
        );
        self.remove_all(pruned);
    }
}

/// Frequency distribution that still accepts new events.
///
/// Every operation that may hide events (pruning and noise injection) consumes the builder and
/// returns a sealed [`Distribution`]. Once an event has become noise, it can no longer be told
/// apart from an event never seen, so a sealed distribution cannot accept insertions.
///
/// # Examples
///
/// ```
/// use gramcat::DistributionBuilder;
///
/// let mut builder = DistributionBuilder::new();
/// builder.add_events(["a", "b", "a", "c", "a", "b"]);
/// let distribution = builder.prune_by_count(1);
///
/// assert_eq!(3, distribution.get("a"));
/// assert_eq!(0, distribution.get("c"));
/// assert_eq!(1, distribution.total_noise());
/// assert_eq!(6, distribution.total_with_noise());
/// ```
#[derive(Clone, Debug, Default)]
pub struct DistributionBuilder {
    events: EventTable,
}

impl DistributionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` occurrences of `feature`.
    ///
    /// A zero count still registers `feature` as a distinct event.
    pub fn add_event<S>(&mut self, feature: S, count: u64)
    where
        S: Into<String>,
    {
        *self.events.counts.entry(feature.into()).or_insert(0) += count;
        self.events.total += count;
    }

    /// Adds one occurrence of each feature in `features`.
    pub fn add_events<I, S>(&mut self, features: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for feature in features {
            self.add_event(feature, 1);
        }
    }

    /// Gets the count of `feature`.
    pub fn get(&self, feature: &str) -> u64 {
        self.events.get(feature)
    }

    /// Gets the number of distinct events.
    pub fn len(&self) -> usize {
        self.events.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.counts.is_empty()
    }

    /// Gets the total number of events.
    pub fn total(&self) -> u64 {
        self.events.total
    }

    /// Iterates over pairs of an event and its count, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.events.counts.iter().map(|(f, &c)| (f.as_str(), c))
    }

    /// Closes the distribution for insertion without removing anything.
    pub fn seal(self) -> Distribution {
        Distribution {
            distinct_with_noise: self.events.counts.len() as u64,
            total_with_noise: self.events.total,
            events: self.events,
        }
    }

    /// Seals the distribution and applies [`Distribution::prune_by_count()`].
    pub fn prune_by_count(self, min_count_allowed: u64) -> Distribution {
        let mut distribution = self.seal();
        distribution.prune_by_count(min_count_allowed);
        distribution
    }

    /// Seals the distribution and applies [`Distribution::prune_by_rank()`].
    pub fn prune_by_rank(self, max_distinct_allowed: usize) -> Distribution {
        let mut distribution = self.seal();
        distribution.prune_by_rank(max_distinct_allowed);
        distribution
    }

    /// Seals the distribution and applies [`Distribution::add_noise()`].
    pub fn add_noise(self, total_count: u64, distinct_count: u64) -> Distribution {
        let mut distribution = self.seal();
        distribution.add_noise(total_count, distinct_count);
        distribution
    }
}

/// Sealed frequency distribution.
///
/// Besides the represented events, the distribution keeps exact aggregates of the events that
/// were pruned away (noise), so that
/// `total_with_noise() == total_represented() + total_noise()` and
/// `distinct_with_noise_count() == distinct_represented_count() + distinct_noise_count()`
/// always hold.
#[derive(Clone, Debug)]
pub struct Distribution {
    events: EventTable,
    distinct_with_noise: u64,
    total_with_noise: u64,
}

impl Distribution {
    /// Gets the count of `feature`, or 0 if it has never been seen or has been pruned.
    pub fn get(&self, feature: &str) -> u64 {
        self.events.get(feature)
    }

    /// Checks whether `feature` is represented.
    pub fn contains(&self, feature: &str) -> bool {
        self.events.counts.contains_key(feature)
    }

    /// Iterates over represented events and their counts, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.events.counts.iter().map(|(f, &c)| (f.as_str(), c))
    }

    pub fn distinct_represented_count(&self) -> u64 {
        self.events.counts.len() as u64
    }

    pub fn distinct_noise_count(&self) -> u64 {
        self.distinct_with_noise - self.distinct_represented_count()
    }

    pub fn distinct_with_noise_count(&self) -> u64 {
        self.distinct_with_noise
    }

    pub fn total_represented(&self) -> u64 {
        self.events.total
    }

    pub fn total_noise(&self) -> u64 {
        self.total_with_noise - self.events.total
    }

    pub fn total_with_noise(&self) -> u64 {
        self.total_with_noise
    }

    /// Turns every event whose count is less than or equal to `min_count_allowed` into noise.
    pub fn prune_by_count(&mut self, min_count_allowed: u64) {
        self.events.prune_by_count(min_count_allowed);
    }

    /// Turns the least frequent events into noise until at most `max_distinct_allowed` remain.
    ///
    /// Events with equal counts are pruned in lexicographic order.
    pub fn prune_by_rank(&mut self, max_distinct_allowed: usize) {
        self.events.prune_by_rank(max_distinct_allowed);
    }

    /// Records noise whose individual events are unknown.
    pub fn add_noise(&mut self, total_count: u64, distinct_count: u64) {
        self.total_with_noise += total_count;
        self.distinct_with_noise += distinct_count;
    }
}

// Stored as the retained (event, count) pairs sorted by event, followed by the total and
// distinct noise counts.
impl Encode for Distribution {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        let mut events: Vec<(&String, &u64)> = self.events.counts.iter().collect();
        events.sort_unstable();
        Encode::encode(&events, encoder)?;
        Encode::encode(&self.total_noise(), encoder)?;
        Encode::encode(&self.distinct_noise_count(), encoder)?;
        Ok(())
    }
}

impl<Context> Decode<Context> for Distribution {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let events: Vec<(String, u64)> = Decode::decode(decoder)?;
        let total_noise: u64 = Decode::decode(decoder)?;
        let distinct_noise: u64 = Decode::decode(decoder)?;
        let total_overflows = events
            .iter()
            .try_fold(total_noise, |acc, &(_, count)| acc.checked_add(count))
            .is_none();
        let distinct_overflows = u64::try_from(events.len())
            .ok()
            .and_then(|len| len.checked_add(distinct_noise))
            .is_none();
        if total_overflows || distinct_overflows {
            return Err(DecodeError::Other("count overflow"));
        }
        let mut builder = DistributionBuilder::new();
        for (feature, count) in events {
            if builder.events.counts.contains_key(&feature) {
                return Err(DecodeError::Other("duplicated event in a distribution"));
            }
            builder.add_event(feature, count);
        }
        Ok(builder.add_noise(total_noise, distinct_noise))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(d: &Distribution) {
        assert_eq!(
            d.total_with_noise(),
            d.total_represented() + d.total_noise()
        );
        assert_eq!(
            d.distinct_with_noise_count(),
            d.distinct_represented_count() + d.distinct_noise_count()
        );
        assert_eq!(d.total_represented(), d.iter().map(|(_, c)| c).sum::<u64>());
        assert_eq!(d.distinct_represented_count(), d.iter().count() as u64);
    }

    fn sample() -> DistributionBuilder {
        let mut builder = DistributionBuilder::new();
        builder.add_events("aaaaabbbbcccdde".chars().map(String::from));
        builder
    }

    #[test]
    fn test_add_event() {
        let mut builder = DistributionBuilder::new();
        builder.add_event("x", 3);
        builder.add_event("x", 2);
        builder.add_event("y", 0);

        assert_eq!(5, builder.get("x"));
        assert_eq!(0, builder.get("y"));
        assert_eq!(0, builder.get("z"));
        assert_eq!(2, builder.len());
        assert_eq!(5, builder.total());
    }

    #[test]
    fn test_seal_keeps_everything() {
        let d = sample().seal();

        assert_eq!(15, d.total_represented());
        assert_eq!(15, d.total_with_noise());
        assert_eq!(5, d.distinct_represented_count());
        assert_eq!(0, d.total_noise());
        assert_eq!(0, d.distinct_noise_count());
        assert_invariants(&d);
    }

    #[test]
    fn test_prune_by_count() {
        let d = sample().prune_by_count(2);

        assert_eq!(5, d.get("a"));
        assert_eq!(4, d.get("b"));
        assert_eq!(3, d.get("c"));
        assert_eq!(0, d.get("d"));
        assert_eq!(0, d.get("e"));
        assert!(!d.contains("d"));
        assert_eq!(12, d.total_represented());
        assert_eq!(3, d.total_noise());
        assert_eq!(15, d.total_with_noise());
        assert_eq!(3, d.distinct_represented_count());
        assert_eq!(2, d.distinct_noise_count());
        assert_eq!(5, d.distinct_with_noise_count());
        assert_invariants(&d);
    }

    #[test]
    fn test_prune_by_count_zero_removes_zero_counts() {
        let mut builder = sample();
        builder.add_event("f", 0);
        let d = builder.prune_by_count(0);

        assert!(!d.contains("f"));
        assert_eq!(5, d.distinct_represented_count());
        assert_eq!(1, d.distinct_noise_count());
        assert_eq!(0, d.total_noise());
        assert_invariants(&d);
    }

    #[test]
    fn test_prune_by_rank() {
        let d = sample().prune_by_rank(2);

        assert_eq!(5, d.get("a"));
        assert_eq!(4, d.get("b"));
        assert_eq!(0, d.get("c"));
        assert_eq!(2, d.distinct_represented_count());
        assert_eq!(3, d.distinct_noise_count());
        assert_eq!(6, d.total_noise());
        assert_invariants(&d);
    }

    #[test]
    fn test_prune_by_rank_ties() {
        let mut builder = DistributionBuilder::new();
        builder.add_events(["b", "a", "c", "d", "d"]);
        let d = builder.prune_by_rank(2);

        // "a", "b" and "c" tie; the lexicographically smallest go first.
        assert!(d.contains("c"));
        assert!(d.contains("d"));
        assert!(!d.contains("a"));
        assert!(!d.contains("b"));
        assert_invariants(&d);
    }

    #[test]
    fn test_prune_by_rank_idempotent() {
        let mut d = sample().prune_by_rank(3);
        let distinct = d.distinct_represented_count();
        let noise = d.total_noise();
        d.prune_by_rank(3);

        assert_eq!(3, distinct);
        assert_eq!(distinct, d.distinct_represented_count());
        assert_eq!(noise, d.total_noise());
        assert_invariants(&d);
    }

    #[test]
    fn test_prune_by_rank_larger_than_size() {
        let d = sample().prune_by_rank(100);

        assert_eq!(5, d.distinct_represented_count());
        assert_eq!(0, d.distinct_noise_count());
        assert_invariants(&d);
    }

    #[test]
    fn test_prune_sequence() {
        let mut d = sample().prune_by_count(1);
        assert_invariants(&d);
        d.prune_by_rank(2);
        assert_invariants(&d);
        d.add_noise(10, 4);
        assert_invariants(&d);
        d.prune_by_count(4);
        assert_invariants(&d);

        assert_eq!(1, d.distinct_represented_count());
        assert_eq!(5, d.total_represented());
        assert_eq!(25, d.total_with_noise());
        assert_eq!(9, d.distinct_with_noise_count());
    }

    #[test]
    fn test_add_noise() {
        let d = sample().add_noise(7, 3);

        assert_eq!(15, d.total_represented());
        assert_eq!(7, d.total_noise());
        assert_eq!(22, d.total_with_noise());
        assert_eq!(3, d.distinct_noise_count());
        assert_eq!(8, d.distinct_with_noise_count());
        assert_invariants(&d);
    }

    #[test]
    fn test_round_trip() {
        let original = sample().prune_by_rank(3);
        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&original, config).unwrap();
        let (restored, _): (Distribution, usize) =
            bincode::decode_from_slice(&bytes, config).unwrap();

        for (feature, count) in original.iter() {
            assert_eq!(count, restored.get(feature));
        }
        assert_eq!(
            original.distinct_represented_count(),
            restored.distinct_represented_count()
        );
        assert_eq!(original.total_represented(), restored.total_represented());
        assert_eq!(original.total_noise(), restored.total_noise());
        assert_eq!(original.total_with_noise(), restored.total_with_noise());
        assert_eq!(original.distinct_noise_count(), restored.distinct_noise_count());
        assert_eq!(
            original.distinct_with_noise_count(),
            restored.distinct_with_noise_count()
        );
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let config = bincode::config::standard();
        let mut b1 = DistributionBuilder::new();
        b1.add_events(["x", "y", "z", "y"]);
        let mut b2 = DistributionBuilder::new();
        b2.add_events(["y", "z", "y", "x"]);

        assert_eq!(
            bincode::encode_to_vec(&b1.seal(), config).unwrap(),
            bincode::encode_to_vec(&b2.seal(), config).unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_duplicates() {
        let config = bincode::config::standard();
        let raw: (Vec<(String, u64)>, u64, u64) =
            (vec![("a".to_string(), 1), ("a".to_string(), 2)], 0, 0);
        let bytes = bincode::encode_to_vec(&raw, config).unwrap();
        let result: Result<(Distribution, usize), _> = bincode::decode_from_slice(&bytes, config);

        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_count_overflow() {
        let config = bincode::config::standard();

        let raw: (Vec<(String, u64)>, u64, u64) = (vec![("a".to_string(), u64::MAX)], 1, 0);
        let bytes = bincode::encode_to_vec(&raw, config).unwrap();
        let result: Result<(Distribution, usize), _> = bincode::decode_from_slice(&bytes, config);
        assert!(result.is_err());

        let raw: (Vec<(String, u64)>, u64, u64) = (
            vec![("a".to_string(), u64::MAX / 2 + 1), ("b".to_string(), u64::MAX / 2 + 1)],
            0,
            0,
        );
        let bytes = bincode::encode_to_vec(&raw, config).unwrap();
        let result: Result<(Distribution, usize), _> = bincode::decode_from_slice(&bytes, config);
        assert!(result.is_err());

        let raw: (Vec<(String, u64)>, u64, u64) = (vec![("a".to_string(), 1)], 0, u64::MAX);
        let bytes = bincode::encode_to_vec(&raw, config).unwrap();
        let result: Result<(Distribution, usize), _> = bincode::decode_from_slice(&bytes, config);
        assert!(result.is_err());
    }
}
