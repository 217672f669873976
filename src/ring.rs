//! Slot ring and key index.
//!
//! A task lives in exactly one slot. Its slot is `pointer + delay_units`
//! modulo the slot count and its circle is the number of whole rotations in
//! `delay_units`; each visit of the pointer either decrements the circle or,
//! once it reaches zero, hands the task out for dispatch.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::task::{Task, TimerKey};

/// Key -> slots currently holding a task with that key, with a per-slot count.
///
/// Counting every slot lets a single removal cancel all tasks sharing a key,
/// not just the most recently inserted one.
#[derive(Debug)]
struct KeyIndex<K> {
    slots: HashMap<K, HashMap<usize, usize>>,
}

impl<K: TimerKey> KeyIndex<K> {
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    fn insert(&mut self, key: K, slot: usize) {
        *self.slots.entry(key).or_default().entry(slot).or_insert(0) += 1;
    }

    /// Forget one task with `key` in `slot`.
    fn release(&mut self, key: &K, slot: usize) {
        let Some(held) = self.slots.get_mut(key) else {
            return;
        };
        if let Some(count) = held.get_mut(&slot) {
            *count -= 1;
            if *count == 0 {
                held.remove(&slot);
            }
        }
        if held.is_empty() {
            self.slots.remove(key);
        }
    }

    fn take(&mut self, key: &K) -> Option<HashMap<usize, usize>> {
        self.slots.remove(key)
    }

    #[cfg(test)]
    fn get(&self, key: &K) -> Option<&HashMap<usize, usize>> {
        self.slots.get(key)
    }

    fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Fixed ring of task lists plus the pointer that walks it.
#[derive(Debug)]
pub(crate) struct SlotRing<K> {
    slots: Vec<VecDeque<Task<K>>>,
    index: KeyIndex<K>,
    pos: usize,
    interval: Duration,
    len: usize,
}

impl<K: TimerKey> SlotRing<K> {
    /// `slot_count` and `interval` must be non-zero; configuration clamping
    /// guarantees this for wheels.
    pub(crate) fn new(slot_count: usize, interval: Duration) -> Self {
        debug_assert!(slot_count > 0);
        debug_assert!(!interval.is_zero());
        Self {
            slots: (0..slot_count).map(|_| VecDeque::new()).collect(),
            index: KeyIndex::new(),
            pos: 0,
            interval,
            len: 0,
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    /// Pending tasks across all slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Slot and circle for a task delayed by `delay` from the current pointer.
    pub(crate) fn position_and_circle(&self, delay: Duration) -> (usize, usize) {
        let units = delay.as_millis() / self.interval.as_millis().max(1);
        let slot_count = self.slots.len() as u128;
        let slot = ((self.pos as u128 + units % slot_count) % slot_count) as usize;
        let circle = usize::try_from(units / slot_count).unwrap_or(usize::MAX);
        (slot, circle)
    }

    /// Place `task` according to its delay, returning the slot it landed in.
    pub(crate) fn insert(&mut self, mut task: Task<K>) -> usize {
        let (slot, circle) = self.position_and_circle(task.delay);
        task.circle = circle;
        if let Some(key) = &task.key {
            self.index.insert(key.clone(), slot);
        }
        self.slots[slot].push_back(task);
        self.len += 1;
        slot
    }

    /// Drop every pending task carrying `key`. Unknown keys are a no-op.
    pub(crate) fn remove(&mut self, key: &K) -> usize {
        let Some(held) = self.index.take(key) else {
            return 0;
        };
        let mut removed = 0;
        for slot in held.keys() {
            let list = &mut self.slots[*slot];
            let before = list.len();
            list.retain(|task| task.key.as_ref() != Some(key));
            removed += before - list.len();
        }
        self.len -= removed;
        removed
    }

    /// Abandon every pending task.
    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.len;
        self.slots.iter_mut().for_each(VecDeque::clear);
        self.index.clear();
        self.len = 0;
        removed
    }

    /// Scan the slot under the pointer, then advance the pointer one slot.
    ///
    /// Tasks with circles left are decremented and kept in place; matured
    /// tasks are unindexed and returned in insertion order.
    pub(crate) fn tick(&mut self) -> Vec<Task<K>> {
        let pos = self.pos;
        self.pos = (pos + 1) % self.slots.len();

        let list = &mut self.slots[pos];
        if list.is_empty() {
            return Vec::new();
        }

        let mut expired = Vec::new();
        for mut task in std::mem::take(&mut *list) {
            if task.circle > 0 {
                task.circle -= 1;
                list.push_back(task);
                continue;
            }
            if let Some(key) = &task.key {
                self.index.release(key, pos);
            }
            expired.push(task);
        }
        self.len -= expired.len();
        expired
    }

    #[cfg(test)]
    fn slot_len(&self, slot: usize) -> usize {
        self.slots[slot].len()
    }

    #[cfg(test)]
    fn indexed_slots(&self, key: &K) -> Vec<usize> {
        let mut slots: Vec<usize> = self
            .index
            .get(key)
            .map(|held| held.keys().copied().collect())
            .unwrap_or_default();
        slots.sort_unstable();
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::job_fn;

    fn task(secs: u64, key: Option<&'static str>) -> Task<&'static str> {
        Task::new(Duration::from_secs(secs), key, Box::new(job_fn(|_: ()| {}, ())))
    }

    /// Tick until something expires, returning how many ticks that took.
    fn ticks_until_expiry(ring: &mut SlotRing<&'static str>, limit: usize) -> Option<usize> {
        (1..=limit).find(|_| !ring.tick().is_empty())
    }

    #[test]
    fn test_position_and_circle() {
        let mut ring = SlotRing::<&str>::new(10, Duration::from_secs(1));
        assert_eq!(ring.position_and_circle(Duration::from_secs(3)), (3, 0));
        assert_eq!(ring.position_and_circle(Duration::from_secs(10)), (0, 1));
        assert_eq!(ring.position_and_circle(Duration::from_secs(25)), (5, 2));
        // Sub-tick remainders are truncated.
        assert_eq!(ring.position_and_circle(Duration::from_millis(3999)), (3, 0));

        for _ in 0..7 {
            ring.tick();
        }
        assert_eq!(ring.pos(), 7);
        assert_eq!(ring.position_and_circle(Duration::from_secs(5)), (2, 0));
        assert_eq!(ring.position_and_circle(Duration::from_secs(13)), (0, 1));
    }

    #[test]
    fn test_position_formula_and_fire_tick_across_configs() {
        for interval_secs in [1u64, 2, 5] {
            for slot_count in [5usize, 10, 17] {
                for start in [0usize, 3, slot_count - 1] {
                    for delay_ms in [0u64, 999, 1_000, 4_500, 12_000, 37_250, 100_000] {
                        let mut ring = SlotRing::new(slot_count, Duration::from_secs(interval_secs));
                        for _ in 0..start {
                            ring.tick();
                        }

                        let units = (delay_ms / (interval_secs * 1_000)) as usize;
                        let (slot, circle) =
                            ring.position_and_circle(Duration::from_millis(delay_ms));
                        assert_eq!(slot, (start + units) % slot_count);
                        assert_eq!(circle, units / slot_count);

                        ring.insert(Task::new(
                            Duration::from_millis(delay_ms),
                            Some("t"),
                            Box::new(job_fn(|_: ()| {}, ())),
                        ));
                        // The insert tick's own slot is scanned first, so a task
                        // `units` ahead fires on scan `units + 1`.
                        assert_eq!(
                            ticks_until_expiry(&mut ring, units + slot_count + 2),
                            Some(units + 1),
                            "interval {}s, {} slots, start {}, delay {}ms",
                            interval_secs,
                            slot_count,
                            start,
                            delay_ms
                        );
                        assert_eq!(ring.len(), 0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_position_uses_interval_units() {
        let ring = SlotRing::<&str>::new(10, Duration::from_secs(2));
        assert_eq!(ring.position_and_circle(Duration::from_secs(7)), (3, 0));
        assert_eq!(ring.position_and_circle(Duration::from_secs(45)), (2, 2));
    }

    #[test]
    fn test_huge_delay_does_not_overflow() {
        let ring = SlotRing::<&str>::new(3600, Duration::from_secs(1));
        let (slot, circle) = ring.position_and_circle(Duration::MAX);
        assert!(slot < 3600);
        assert!(circle > 0);
    }

    #[test]
    fn test_three_second_task_in_ten_slots() {
        let mut ring = SlotRing::new(10, Duration::from_secs(1));
        assert_eq!(ring.insert(task(3, Some("a"))), 3);
        assert_eq!(ring.indexed_slots(&"a"), vec![3]);

        // Slots 0..=2 pass, slot 3 fires on the fourth scan.
        assert_eq!(ticks_until_expiry(&mut ring, 20), Some(4));
        assert_eq!(ring.len(), 0);
        assert!(ring.indexed_slots(&"a").is_empty());
        assert_eq!(ticks_until_expiry(&mut ring, 30), None);
    }

    #[test]
    fn test_twelve_second_task_in_five_slots() {
        let mut ring = SlotRing::new(5, Duration::from_secs(1));
        let slot = ring.insert(task(12, Some("b")));
        assert_eq!(slot, 2);

        let mut passes = 0;
        let mut fired_at = None;
        for n in 1..=30 {
            let at = ring.pos();
            let expired = ring.tick();
            if at == 2 {
                passes += 1;
            }
            if !expired.is_empty() {
                assert_eq!(expired.len(), 1);
                assert_eq!(expired[0].key, Some("b"));
                fired_at = Some(n);
                break;
            }
        }
        assert_eq!(passes, 3);
        assert_eq!(fired_at, Some(13));
    }

    #[test]
    fn test_zero_delay_fires_on_next_visit_of_current_slot() {
        let mut ring = SlotRing::new(10, Duration::from_secs(1));
        for _ in 0..4 {
            ring.tick();
        }
        assert_eq!(ring.insert(task(0, None)), 4);
        assert_eq!(ticks_until_expiry(&mut ring, 20), Some(1));
    }

    #[test]
    fn test_rotating_tasks_stay_in_order() {
        let mut ring = SlotRing::new(10, Duration::from_secs(1));
        ring.insert(task(2, Some("late")));
        ring.insert(task(12, Some("later")));
        ring.insert(task(2, Some("early")));

        ring.tick();
        ring.tick();
        let expired: Vec<_> = ring.tick().into_iter().map(|t| t.key).collect();
        assert_eq!(expired, vec![Some("late"), Some("early")]);
        assert_eq!(ring.slot_len(2), 1);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_remove_by_key() {
        let mut ring = SlotRing::new(10, Duration::from_secs(1));
        ring.insert(task(3, Some("a")));
        ring.insert(task(3, Some("b")));

        assert_eq!(ring.remove(&"a"), 1);
        assert_eq!(ring.slot_len(3), 1);
        assert!(ring.indexed_slots(&"a").is_empty());

        let expired = ring.tick_n(4);
        assert_eq!(expired, vec![Some("b")]);
    }

    #[test]
    fn test_remove_unknown_or_expired_key_is_noop() {
        let mut ring = SlotRing::new(10, Duration::from_secs(1));
        assert_eq!(ring.remove(&"ghost"), 0);

        ring.insert(task(0, Some("a")));
        assert_eq!(ring.tick_n(1), vec![Some("a")]);
        assert_eq!(ring.remove(&"a"), 0);
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn test_duplicate_keys_removed_together() {
        let mut ring = SlotRing::new(10, Duration::from_secs(1));
        ring.insert(task(3, Some("dup")));
        ring.insert(task(7, Some("dup")));
        ring.insert(task(3, Some("dup")));
        assert_eq!(ring.indexed_slots(&"dup"), vec![3, 7]);

        assert_eq!(ring.remove(&"dup"), 3);
        assert_eq!(ring.len(), 0);
        assert!(ring.tick_n(20).is_empty());
    }

    #[test]
    fn test_duplicate_key_index_survives_partial_expiry() {
        let mut ring = SlotRing::new(10, Duration::from_secs(1));
        ring.insert(task(1, Some("dup")));
        ring.insert(task(5, Some("dup")));

        assert_eq!(ring.tick_n(2), vec![Some("dup")]);
        assert_eq!(ring.indexed_slots(&"dup"), vec![5]);
        assert_eq!(ring.remove(&"dup"), 1);
        assert!(ring.tick_n(20).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut ring = SlotRing::new(10, Duration::from_secs(1));
        ring.insert(task(1, Some("a")));
        ring.insert(task(30, None));
        assert_eq!(ring.clear(), 2);
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.remove(&"a"), 0);
        assert!(ring.tick_n(40).is_empty());
    }

    #[test]
    fn test_pointer_wraps() {
        let mut ring = SlotRing::<&str>::new(10, Duration::from_secs(1));
        for _ in 0..23 {
            ring.tick();
        }
        assert_eq!(ring.pos(), 3);
        assert_eq!(ring.slot_count(), 10);
    }

    impl SlotRing<&'static str> {
        /// Run `n` ticks, collecting the keys of everything that expired.
        fn tick_n(&mut self, n: usize) -> Vec<Option<&'static str>> {
            (0..n)
                .flat_map(|_| self.tick())
                .map(|task| task.key)
                .collect()
        }
    }
}
