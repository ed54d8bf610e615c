//! Bounded priority container.
//!
//! Items are bucketed into a fixed number of priority levels. Selection
//! samples a non-empty level with probability increasing in its rank and
//! takes the oldest item there, which approximates "highest priority first"
//! without sorting on every step. Capacity is enforced on insertion by
//! evicting the weakest occupant of the lowest non-empty level, or by
//! rejecting the newcomer when it is weaker still.

use std::collections::{HashMap, VecDeque};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::budget_functions::MergeStrategy;
use crate::constants::BAG_LEVELS;
use crate::item::Item;

/// How `take_next` chooses a level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sampling {
    /// Random draw over non-empty levels, level `i` weighted `i + 1`.
    #[default]
    Weighted,
    /// Fixed round-robin order in which level `i` appears `i + 1` times.
    /// Deterministic regardless of seed.
    Distributor,
}

/// What happened to an item handed to [`Bag::put_in`].
#[derive(Debug)]
pub enum PutOutcome<T> {
    /// Stored in a free slot.
    Inserted,
    /// An item with the same key was already present and absorbed it.
    Merged,
    /// Stored; the returned occupant was evicted to make room.
    Evicted(T),
    /// The bag is full and the newcomer is the weakest; it is returned unstored.
    Rejected(T),
}

impl<T> PutOutcome<T> {
    /// Whether the item (or its merged budget) is now in the bag.
    pub fn is_stored(&self) -> bool {
        !matches!(self, PutOutcome::Rejected(_))
    }
}

struct Slot<T> {
    level: usize,
    item: T,
}

pub struct Bag<T: Item> {
    capacity: usize,
    levels: Vec<VecDeque<T::Key>>,
    items: HashMap<T::Key, Slot<T>>,
    sampling: Sampling,
    merge: MergeStrategy,
    rng: SmallRng,
    distributor: Vec<usize>,
    cursor: usize,
    rejected: u64,
    evicted: u64,
}

impl<T: Item> Bag<T> {
    pub fn new(capacity: usize, rng: SmallRng) -> Self {
        Self {
            capacity,
            levels: (0..BAG_LEVELS).map(|_| VecDeque::new()).collect(),
            items: HashMap::new(),
            sampling: Sampling::default(),
            merge: MergeStrategy::default(),
            rng,
            distributor: Vec::new(),
            cursor: 0,
            rejected: 0,
            evicted: 0,
        }
    }

    /// Bag with its own deterministic generator.
    pub fn seeded(capacity: usize, seed: u64) -> Self {
        Self::new(capacity, SmallRng::seed_from_u64(seed))
    }

    /// Change the number of priority levels. Only valid on an empty bag.
    pub fn with_levels(mut self, levels: usize) -> Self {
        debug_assert!(self.items.is_empty());
        let levels = levels.max(1);
        self.levels = (0..levels).map(|_| VecDeque::new()).collect();
        self.reset_distributor();
        self
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self.reset_distributor();
        self
    }

    /// Rebuild the distributor order for the current level count and start
    /// it from the beginning.
    fn reset_distributor(&mut self) {
        self.distributor = match self.sampling {
            Sampling::Distributor => distributor_order(self.levels.len()),
            Sampling::Weighted => Vec::new(),
        };
        self.cursor = 0;
    }

    pub fn with_merge(mut self, merge: MergeStrategy) -> Self {
        self.merge = merge;
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.items.contains_key(key)
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.items.get(key).map(|slot| &slot.item)
    }

    /// Level the item was filed under when it last entered the bag.
    pub fn level_of(&self, key: &T::Key) -> Option<usize> {
        self.items.get(key).map(|slot| slot.level)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values().map(|slot| &slot.item)
    }

    /// Empty the bag, yielding every item.
    pub fn into_items(self) -> impl Iterator<Item = T> {
        self.items.into_values().map(|slot| slot.item)
    }

    pub fn average_priority(&self) -> f32 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.iter().map(|item| item.priority()).sum::<f32>() / self.items.len() as f32
    }

    /// Insertions refused for lack of room since the bag was built.
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    /// Occupants evicted by stronger newcomers since the bag was built.
    pub fn evicted_count(&self) -> u64 {
        self.evicted
    }

    /// Quantize a priority into a level: `ceil(p · L) - 1`, clamped.
    pub fn level_for(&self, priority: f32) -> usize {
        let top = self.levels.len() - 1;
        let scaled = (priority * self.levels.len() as f32).ceil() as i64 - 1;
        scaled.clamp(0, top as i64) as usize
    }

    /// Insert an item, merging with an equal-key occupant or making room by
    /// evicting the weakest one.
    pub fn put_in(&mut self, item: T) -> PutOutcome<T> {
        let key = item.key().clone();
        if let Some(mut existing) = self.pick_out(&key) {
            existing.merge(item, self.merge);
            self.file(existing);
            return PutOutcome::Merged;
        }

        if self.items.len() < self.capacity {
            self.file(item);
            return PutOutcome::Inserted;
        }

        let Some(weakest) = self.weakest() else {
            // zero capacity
            self.rejected += 1;
            return PutOutcome::Rejected(item);
        };
        let floor = self.items.get(&weakest).map_or(0.0, |slot| slot.item.priority());
        if item.priority() < floor {
            self.rejected += 1;
            tracing::debug!(key = ?key, priority = item.priority(), floor, "bag full, rejected");
            return PutOutcome::Rejected(item);
        }
        match self.pick_out(&weakest) {
            Some(evicted) => {
                self.evicted += 1;
                tracing::debug!(
                    evicted = ?weakest,
                    by = ?key,
                    priority = evicted.priority(),
                    "bag full, evicted"
                );
                self.file(item);
                PutOutcome::Evicted(evicted)
            }
            None => {
                self.file(item);
                PutOutcome::Inserted
            }
        }
    }

    /// Return an item after processing. Same policy as [`Bag::put_in`]; the
    /// level is recomputed from the item's current priority.
    pub fn put_back(&mut self, item: T) -> PutOutcome<T> {
        self.put_in(item)
    }

    /// Remove and return the next item to process, chosen by priority-weighted
    /// sampling over the non-empty levels.
    pub fn take_next(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let level = self.select_level()?;
        let key = self.levels[level].pop_front()?;
        self.items.remove(&key).map(|slot| slot.item)
    }

    /// Remove a specific item.
    pub fn pick_out(&mut self, key: &T::Key) -> Option<T> {
        let slot = self.items.remove(key)?;
        let queue = &mut self.levels[slot.level];
        if let Some(pos) = queue.iter().position(|k| k == key) {
            queue.remove(pos);
        }
        Some(slot.item)
    }

    fn file(&mut self, item: T) {
        let level = self.level_for(item.priority());
        let key = item.key().clone();
        self.levels[level].push_back(key.clone());
        self.items.insert(key, Slot { level, item });
    }

    /// Key of the lowest-priority occupant of the lowest non-empty level.
    /// Ties go to the one filed first.
    fn weakest(&self) -> Option<T::Key> {
        let queue = self.levels.iter().find(|q| !q.is_empty())?;
        let mut weakest: Option<(&T::Key, f32)> = None;
        for key in queue {
            let p = self.items.get(key).map_or(0.0, |slot| slot.item.priority());
            if weakest.is_none_or(|(_, best)| p < best) {
                weakest = Some((key, p));
            }
        }
        weakest.map(|(key, _)| key.clone())
    }

    fn select_level(&mut self) -> Option<usize> {
        match self.sampling {
            Sampling::Weighted => {
                let total: usize = self
                    .levels
                    .iter()
                    .enumerate()
                    .filter(|(_, q)| !q.is_empty())
                    .map(|(i, _)| i + 1)
                    .sum();
                if total == 0 {
                    return None;
                }
                let mut roll = self.rng.random_range(0..total);
                for (i, queue) in self.levels.iter().enumerate() {
                    if queue.is_empty() {
                        continue;
                    }
                    if roll < i + 1 {
                        return Some(i);
                    }
                    roll -= i + 1;
                }
                None
            }
            Sampling::Distributor => {
                for _ in 0..self.distributor.len() {
                    let level = self.distributor[self.cursor];
                    self.cursor = (self.cursor + 1) % self.distributor.len();
                    if !self.levels[level].is_empty() {
                        return Some(level);
                    }
                }
                None
            }
        }
    }
}

/// Spread `range` levels over `range·(range+1)/2` slots so that level `i`
/// occupies `i + 1` of them, as evenly spaced as possible.
fn distributor_order(range: usize) -> Vec<usize> {
    let capacity = range * (range + 1) / 2;
    let mut order: Vec<Option<usize>> = vec![None; capacity];
    let mut index = capacity;
    for rank in (1..=range).rev() {
        for _ in 0..rank {
            index = (capacity / rank + index) % capacity;
            while order[index].is_some() {
                index = (index + 1) % capacity;
            }
            order[index] = Some(rank - 1);
        }
    }
    order.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::Budget;
    use crate::item::Entry;
    use approx::assert_relative_eq;

    type TestBag = Bag<Entry<String, ()>>;

    fn entry(key: &str, priority: f32) -> Entry<String, ()> {
        Entry::new(key.to_string(), (), Budget::new(priority, 0.5, 0.5))
    }

    fn bag(capacity: usize) -> TestBag {
        Bag::seeded(capacity, 42)
    }

    #[test]
    fn test_level_quantization() {
        let b = bag(10);
        assert_eq!(b.level_for(0.0), 0);
        assert_eq!(b.level_for(0.005), 0);
        assert_eq!(b.level_for(0.01), 0);
        assert_eq!(b.level_for(0.011), 1);
        assert_eq!(b.level_for(0.5), 49);
        assert_eq!(b.level_for(1.0), 99);
    }

    #[test]
    fn test_quantization_is_monotonic() {
        let b = bag(10);
        let mut last = 0;
        for i in 0..=1000 {
            let level = b.level_for(i as f32 / 1000.0);
            assert!(level >= last);
            last = level;
        }
    }

    #[test]
    fn test_duplicate_key_merges() {
        let mut b = bag(10);
        assert!(matches!(b.put_in(entry("a", 0.3)), PutOutcome::Inserted));
        assert!(matches!(b.put_in(entry("a", 0.7)), PutOutcome::Merged));
        assert_eq!(b.len(), 1);
        let stored = b.get(&"a".to_string()).unwrap();
        assert_relative_eq!(stored.priority(), 0.7);
        assert_eq!(b.level_of(&"a".to_string()), Some(b.level_for(0.7)));
    }

    #[test]
    fn test_merge_requantizes_level() {
        let mut b = bag(10).with_merge(MergeStrategy::Or);
        b.put_in(entry("a", 0.5));
        b.put_in(entry("a", 0.5));
        assert_eq!(b.len(), 1);
        assert_eq!(b.level_of(&"a".to_string()), Some(b.level_for(0.75)));
    }

    #[test]
    fn test_full_bag_evicts_weakest() {
        let mut b = bag(3);
        b.put_in(entry("a", 0.2));
        b.put_in(entry("b", 0.5));
        b.put_in(entry("c", 0.8));

        match b.put_in(entry("d", 0.6)) {
            PutOutcome::Evicted(evicted) => assert_eq!(evicted.key(), "a"),
            other => panic!("expected eviction, got {other:?}"),
        }
        assert_eq!(b.len(), 3);
        assert!(b.contains(&"d".to_string()));
        assert!(!b.contains(&"a".to_string()));
        assert_eq!(b.evicted_count(), 1);
    }

    #[test]
    fn test_full_bag_rejects_weaker_newcomer() {
        let mut b = bag(3);
        b.put_in(entry("a", 0.2));
        b.put_in(entry("b", 0.5));
        b.put_in(entry("c", 0.8));

        match b.put_in(entry("d", 0.1)) {
            PutOutcome::Rejected(rejected) => assert_eq!(rejected.key(), "d"),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(b.len(), 3);
        assert!(!b.contains(&"d".to_string()));
        assert_eq!(b.rejected_count(), 1);
    }

    #[test]
    fn test_eviction_picks_lowest_within_level() {
        let mut b = bag(2);
        b.put_in(entry("x", 0.205));
        b.put_in(entry("y", 0.201));
        assert_eq!(b.level_for(0.205), b.level_for(0.201));
        match b.put_in(entry("z", 0.9)) {
            PutOutcome::Evicted(evicted) => assert_eq!(evicted.key(), "y"),
            other => panic!("expected eviction, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_capacity_rejects() {
        let mut b = bag(0);
        assert!(!b.put_in(entry("a", 1.0)).is_stored());
        assert!(b.is_empty());
    }

    #[test]
    fn test_take_next_removes() {
        let mut b = bag(10);
        b.put_in(entry("a", 0.4));
        b.put_in(entry("b", 0.6));
        let first = b.take_next().unwrap();
        assert_eq!(b.len(), 1);
        assert!(!b.contains(first.key()));
        b.take_next().unwrap();
        assert!(b.take_next().is_none());
        assert!(b.is_empty());
    }

    #[test]
    fn test_take_next_favors_high_priority() {
        let mut high = 0;
        let mut b = bag(10);
        for _ in 0..2000 {
            b.put_in(entry("low", 0.1));
            b.put_in(entry("high", 0.9));
            let taken = b.take_next().unwrap();
            if taken.key() == "high" {
                high += 1;
            }
            b.pick_out(&"low".to_string());
            b.pick_out(&"high".to_string());
        }
        // level weights 90 vs 10
        assert!(high > 1600, "high taken {high} of 2000");
    }

    #[test]
    fn test_seeded_bags_agree() {
        let run = || {
            let mut b = bag(50);
            for i in 0..50 {
                b.put_in(entry(&format!("k{i}"), (i as f32 + 1.0) / 50.0));
            }
            (0..50).map(|_| b.take_next().unwrap().key().clone()).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_distributor_order_weights() {
        let order = distributor_order(10);
        assert_eq!(order.len(), 55);
        for level in 0..10 {
            assert_eq!(order.iter().filter(|&&l| l == level).count(), level + 1);
        }
    }

    #[test]
    fn test_distributor_sampling_drains() {
        let mut b = bag(20).with_sampling(Sampling::Distributor);
        for i in 0..20 {
            b.put_in(entry(&format!("k{i}"), i as f32 / 20.0));
        }
        let mut taken = 0;
        while b.take_next().is_some() {
            taken += 1;
        }
        assert_eq!(taken, 20);
    }

    #[test]
    fn test_custom_levels() {
        let b: TestBag = bag(5).with_levels(10);
        assert_eq!(b.level_count(), 10);
        assert_eq!(b.level_for(0.55), 5);
        assert_eq!(b.level_for(1.0), 9);
    }

    #[test]
    fn test_relevel_after_distributor_sampling() {
        let mut b: TestBag = bag(200).with_sampling(Sampling::Distributor);
        for i in 0..200 {
            b.put_in(entry(&format!("k{i}"), (i % 100) as f32 / 100.0));
        }
        while b.take_next().is_some() {}

        let mut b = b.with_levels(5);
        b.put_in(entry("late", 0.9));
        let taken = b.take_next().unwrap();
        assert_eq!(taken.key(), "late");
        assert_eq!(b.level_count(), 5);
    }

    #[test]
    fn test_average_priority() {
        let mut b = bag(5);
        assert_eq!(b.average_priority(), 0.0);
        b.put_in(entry("a", 0.2));
        b.put_in(entry("b", 0.4));
        assert_relative_eq!(b.average_priority(), 0.3, epsilon = 1e-6);
    }
}
