//! Lockless transposition table shared by every search thread.
//!
//! Entries are grouped four to a 64-byte bucket. Each entry is two `AtomicU64`
//! words with an XOR check so a reader can detect a write torn by another thread.
//!
//! ## Bit layout
//!
//! ```text
//! word0:
//!   bits 63-32: key           (upper 32 bits of the Zobrist hash)
//!   bits 31-27: generation    (5 bits, wraps at 32)
//!   bits 25-24: bound         (2 bits)
//!   bits 23-16: depth         (depth - DEPTH_NONE + 1, 0 = empty)
//!   bits 15-0:  move          (16 bits)
//!
//! word1:
//!   bits 63-32: check         = key XOR (word0 & 0xFFFF_FFFF)
//!   bits 31-16: value         (i16)
//!   bits 15-0:  eval          (i16)
//! ```
//!
//! All atomic accesses use `Relaxed` ordering. A torn or colliding entry can
//! at worst hand the search a wrong move hint or bound, which it tolerates.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use kestrel_core::Move;

use super::value::{DEPTH_NONE, Depth, Value};

const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn check() {
        assert_send_sync::<TranspositionTable>();
    }
    let _ = check;
};

const BUCKET_SIZE: usize = 4;
const GENERATION_MASK: u8 = 0x1F;
const GENERATION_CYCLE: i32 = 32;

/// Kind of bound a stored value represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    None = 0,
    /// The true score is at most the stored value (fail-low).
    Upper = 1,
    /// The true score is at least the stored value (fail-high).
    Lower = 2,
    Exact = 3,
}

impl Bound {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            1 => Bound::Upper,
            2 => Bound::Lower,
            3 => Bound::Exact,
            _ => Bound::None,
        }
    }

    /// True for [`Bound::Lower`] and [`Bound::Exact`].
    #[inline]
    pub const fn has_lower(self) -> bool {
        self as u8 & Bound::Lower as u8 != 0
    }

    /// True for [`Bound::Upper`] and [`Bound::Exact`].
    #[inline]
    pub const fn has_upper(self) -> bool {
        self as u8 & Bound::Upper as u8 != 0
    }
}

/// Contents of a matching entry.
///
/// `value` is in table form; convert it with
/// [`value_from_tt`](super::value::value_from_tt) before comparing to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtData {
    pub mv: Move,
    pub value: Value,
    pub eval: Value,
    pub depth: Depth,
    pub bound: Bound,
}

#[inline]
const fn encode_depth(depth: Depth) -> u8 {
    (depth - DEPTH_NONE + 1) as u8
}

#[inline]
const fn decode_depth(depth8: u8) -> Depth {
    depth8 as Depth + DEPTH_NONE - 1
}

#[derive(Clone, Copy)]
struct Fields {
    key32: u32,
    generation: u8,
    bound: Bound,
    depth8: u8,
    mv: Move,
    value: i16,
    eval: i16,
}

impl Fields {
    fn pack(self) -> (u64, u64) {
        let w0 = ((self.key32 as u64) << 32)
            | (((self.generation & GENERATION_MASK) as u64) << 27)
            | ((self.bound as u8 as u64) << 24)
            | ((self.depth8 as u64) << 16)
            | self.mv.raw() as u64;
        let check = self.key32 ^ (w0 & 0xFFFF_FFFF) as u32;
        let w1 = ((check as u64) << 32) | ((self.value as u16 as u64) << 16) | self.eval as u16 as u64;
        (w0, w1)
    }

    fn unpack(w0: u64, w1: u64) -> Self {
        Fields {
            key32: (w0 >> 32) as u32,
            generation: ((w0 >> 27) & GENERATION_MASK as u64) as u8,
            bound: Bound::from_bits(((w0 >> 24) & 0x03) as u8),
            depth8: ((w0 >> 16) & 0xFF) as u8,
            mv: Move::from_raw((w0 & 0xFFFF) as u16),
            value: ((w1 >> 16) & 0xFFFF) as u16 as i16,
            eval: (w1 & 0xFFFF) as u16 as i16,
        }
    }
}

/// One table slot.
pub struct TtEntry {
    word0: AtomicU64,
    word1: AtomicU64,
}

impl TtEntry {
    const fn new() -> Self {
        Self {
            word0: AtomicU64::new(0),
            word1: AtomicU64::new(0),
        }
    }

    /// Read the slot, returning `None` if the check word does not match.
    fn read(&self) -> Option<Fields> {
        let w0 = self.word0.load(Ordering::Relaxed);
        let w1 = self.word1.load(Ordering::Relaxed);
        let expected = (w0 >> 32) as u32 ^ (w0 & 0xFFFF_FFFF) as u32;
        if expected != (w1 >> 32) as u32 {
            return None;
        }
        Some(Fields::unpack(w0, w1))
    }

    fn write(&self, fields: Fields) {
        let (w0, w1) = fields.pack();
        self.word0.store(w0, Ordering::Relaxed);
        self.word1.store(w1, Ordering::Relaxed);
    }

    fn clear(&self) {
        self.word0.store(0, Ordering::Relaxed);
        self.word1.store(0, Ordering::Relaxed);
    }
}

#[repr(align(64))]
struct Bucket {
    entries: [TtEntry; BUCKET_SIZE],
}

impl Bucket {
    const fn new() -> Self {
        Self {
            entries: [TtEntry::new(), TtEntry::new(), TtEntry::new(), TtEntry::new()],
        }
    }
}

/// Result of [`TranspositionTable::probe`]: the slot to write back to and,
/// on a hit, what was stored there.
pub struct TtProbe<'a> {
    slot: &'a TtEntry,
    pub data: Option<TtData>,
}

impl TtProbe<'_> {
    #[inline]
    pub fn hit(&self) -> bool {
        self.data.is_some()
    }

    /// Write a result into the probed slot.
    ///
    /// A null `mv` keeps the move already stored for the same key. An entry
    /// for the same key survives a shallower non-exact result, apart from its move.
    #[allow(clippy::too_many_arguments)]
    pub fn save(
        &self,
        key: u64,
        value: Value,
        bound: Bound,
        depth: Depth,
        mv: Move,
        eval: Value,
        generation: u8,
    ) {
        let key32 = (key >> 32) as u32;
        let old = self.slot.read();
        let same_key = old.is_some_and(|f| f.key32 == key32 && f.depth8 != 0);
        let depth8 = encode_depth(depth);

        let mv = match old {
            Some(f) if same_key && mv.is_null() => f.mv,
            _ => mv,
        };

        let overwrite = match old {
            Some(f) if same_key => depth8 as i32 > f.depth8 as i32 - 4 || bound == Bound::Exact,
            _ => true,
        };

        if overwrite {
            self.slot.write(Fields {
                key32,
                generation,
                bound,
                depth8,
                mv,
                value: value as i16,
                eval: eval as i16,
            });
        } else if let Some(f) = old {
            if f.mv != mv {
                self.slot.write(Fields { mv, ..f });
            }
        }
    }
}

/// Shared hash table of search results.
///
/// Every receiver is `&self`, so one table can back any number of threads.
pub struct TranspositionTable {
    buckets: Box<[Bucket]>,
    mask: u64,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Create a table of at most `mb` megabytes, rounded down to a power of two buckets.
    pub fn new(mb: usize) -> Self {
        let bytes = mb * 1024 * 1024;
        let count = (bytes / std::mem::size_of::<Bucket>()).max(1);
        let count = if count.is_power_of_two() {
            count
        } else {
            count.next_power_of_two() >> 1
        };
        let buckets: Box<[Bucket]> = (0..count).map(|_| Bucket::new()).collect();
        Self {
            buckets,
            mask: (count - 1) as u64,
            generation: AtomicU8::new(0),
        }
    }

    /// Number of entry slots.
    pub fn capacity(&self) -> usize {
        self.buckets.len() * BUCKET_SIZE
    }

    /// Empty every slot and reset the generation counter.
    pub fn clear(&self) {
        for bucket in self.buckets.iter() {
            for entry in &bucket.entries {
                entry.clear();
            }
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Start a new search generation. Older entries become preferred victims.
    pub fn new_generation(&self) {
        let current = self.generation.load(Ordering::Relaxed);
        self.generation
            .store(current.wrapping_add(1) & GENERATION_MASK, Ordering::Relaxed);
    }

    #[inline]
    pub fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Look up `key`.
    ///
    /// On a hit the entry's generation is refreshed. On a miss the returned
    /// slot is the bucket's replacement victim: an empty slot if there is one,
    /// otherwise the slot with the lowest `depth - 8 * age`.
    pub fn probe(&self, key: u64) -> TtProbe<'_> {
        let bucket = &self.buckets[(key & self.mask) as usize];
        let key32 = (key >> 32) as u32;
        let generation = self.generation();

        let mut victim = 0;
        let mut victim_worth = i32::MAX;
        for (i, entry) in bucket.entries.iter().enumerate() {
            let Some(fields) = entry.read() else {
                if victim_worth > i32::MIN {
                    victim = i;
                    victim_worth = i32::MIN;
                }
                continue;
            };
            if fields.depth8 == 0 {
                if victim_worth > i32::MIN {
                    victim = i;
                    victim_worth = i32::MIN;
                }
                continue;
            }
            if fields.key32 == key32 {
                if fields.generation != generation {
                    entry.write(Fields { generation, ..fields });
                }
                return TtProbe {
                    slot: entry,
                    data: Some(TtData {
                        mv: fields.mv,
                        value: fields.value as Value,
                        eval: fields.eval as Value,
                        depth: decode_depth(fields.depth8),
                        bound: fields.bound,
                    }),
                };
            }
            let age = (GENERATION_CYCLE + generation as i32 - fields.generation as i32) & (GENERATION_CYCLE - 1);
            let worth = fields.depth8 as i32 - 8 * age;
            if worth < victim_worth {
                victim = i;
                victim_worth = worth;
            }
        }

        TtProbe {
            slot: &bucket.entries[victim],
            data: None,
        }
    }

    /// Permille of sampled slots written during the current generation.
    pub fn hashfull(&self) -> u32 {
        let sample = self.buckets.len().min(1000 / BUCKET_SIZE);
        let generation = self.generation();
        let used = self.buckets[..sample]
            .iter()
            .flat_map(|b| b.entries.iter())
            .filter_map(TtEntry::read)
            .filter(|f| f.depth8 != 0 && f.generation == generation)
            .count();
        (used * 1000 / (sample * BUCKET_SIZE)) as u32
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("capacity", &self.capacity())
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use kestrel_core::Square;

    use super::*;
    use crate::search::value::{DEPTH_QS_CHECKS, VALUE_NONE};

    fn e2e4() -> Move {
        Move::new(Square::E2, Square::E4)
    }

    fn d2d4() -> Move {
        Move::new(Square::D2, Square::D4)
    }

    #[test]
    fn layout_sizes() {
        assert_eq!(std::mem::size_of::<TtEntry>(), 16);
        assert_eq!(std::mem::size_of::<Bucket>(), 64);
    }

    #[test]
    fn save_then_probe() {
        let tt = TranspositionTable::new(1);
        let key = 0xDEAD_BEEF_1234_5678;
        let probe = tt.probe(key);
        assert!(!probe.hit());
        probe.save(key, 100, Bound::Exact, 5, e2e4(), 50, tt.generation());

        let data = tt.probe(key).data.expect("stored entry");
        assert_eq!(data.mv, e2e4());
        assert_eq!(data.depth, 5);
        assert_eq!(data.bound, Bound::Exact);
        assert_eq!(data.value, 100);
        assert_eq!(data.eval, 50);
    }

    #[test]
    fn extreme_depths_and_none_values_fit() {
        let tt = TranspositionTable::new(1);
        let key = 0x0102_0304_0506_0708;
        tt.probe(key)
            .save(key, -20_000, Bound::Lower, DEPTH_NONE, Move::NULL, VALUE_NONE, 0);
        let data = tt.probe(key).data.expect("stored entry");
        assert_eq!(data.depth, DEPTH_NONE);
        assert_eq!(data.eval, VALUE_NONE);
        assert_eq!(data.value, -20_000);

        tt.probe(key).save(key, 1, Bound::Upper, DEPTH_QS_CHECKS, Move::NULL, 3, 0);
        assert_eq!(tt.probe(key).data.map(|d| d.depth), Some(DEPTH_QS_CHECKS));
    }

    #[test]
    fn probe_miss_on_empty_table() {
        let tt = TranspositionTable::new(1);
        assert!(tt.probe(0x1234_5678_9ABC_DEF0).data.is_none());
        // Key whose upper half is zero must not match an empty slot.
        assert!(tt.probe(0x0000_0000_0000_0007).data.is_none());
    }

    #[test]
    fn shallower_result_keeps_deeper_entry_but_takes_move() {
        let tt = TranspositionTable::new(1);
        let key = 0x1111_2222_3333_4444;
        tt.probe(key).save(key, 100, Bound::Lower, 10, e2e4(), 50, 0);
        tt.probe(key).save(key, 200, Bound::Lower, 3, d2d4(), 60, 0);

        let data = tt.probe(key).data.expect("stored entry");
        assert_eq!(data.depth, 10);
        assert_eq!(data.value, 100);
        assert_eq!(data.mv, d2d4());
    }

    #[test]
    fn exact_bound_always_overwrites() {
        let tt = TranspositionTable::new(1);
        let key = 0x1111_2222_3333_4444;
        tt.probe(key).save(key, 100, Bound::Lower, 10, e2e4(), 50, 0);
        tt.probe(key).save(key, 7, Bound::Exact, 2, d2d4(), 60, 0);
        let data = tt.probe(key).data.expect("stored entry");
        assert_eq!((data.depth, data.value, data.bound), (2, 7, Bound::Exact));
    }

    #[test]
    fn null_move_preserves_stored_move() {
        let tt = TranspositionTable::new(1);
        let key = 0xAAAA_BBBB_CCCC_DDDD;
        tt.probe(key).save(key, 10, Bound::Upper, 4, e2e4(), 0, 0);
        tt.probe(key).save(key, -30, Bound::Upper, 6, Move::NULL, 0, 0);
        let data = tt.probe(key).data.expect("stored entry");
        assert_eq!(data.mv, e2e4());
        assert_eq!(data.value, -30);
    }

    #[test]
    fn hit_refreshes_generation() {
        let tt = TranspositionTable::new(1);
        // Low bits pick bucket 3, inside the hashfull sample.
        let key = 0xAAAA_BBBB_0000_0003;
        tt.probe(key).save(key, 10, Bound::Exact, 4, e2e4(), 0, tt.generation());
        assert_eq!(tt.hashfull(), 1);
        tt.new_generation();
        assert_eq!(tt.hashfull(), 0);
        assert!(tt.probe(key).hit());
        assert_eq!(tt.hashfull(), 1);
    }

    #[test]
    fn replacement_prefers_stale_shallow_slots() {
        let tt = TranspositionTable::new(1);
        let base = 0x0000_0001_0000_0000u64;
        let stride = 0x0000_0001_0000_0000u64;
        // Four keys in the same bucket (identical low bits).
        for i in 0..4u64 {
            let key = base + i * stride;
            tt.probe(key).save(key, 0, Bound::Exact, 20 - i as Depth, e2e4(), 0, tt.generation());
        }
        let newcomer = base + 9 * stride;
        tt.probe(newcomer).save(newcomer, 0, Bound::Exact, 1, d2d4(), 0, tt.generation());

        assert!(tt.probe(newcomer).hit());
        // The shallowest of the four was evicted.
        assert!(!tt.probe(base + 3 * stride).hit());
        assert!(tt.probe(base).hit());
    }

    #[test]
    fn clear_removes_all_entries() {
        let tt = TranspositionTable::new(1);
        let key = 0xAAAA_BBBB_CCCC_DDDD;
        tt.probe(key).save(key, 5, Bound::Exact, 5, e2e4(), 0, 0);
        tt.new_generation();
        tt.clear();
        assert!(!tt.probe(key).hit());
        assert_eq!(tt.generation(), 0);
    }

    #[test]
    fn xor_check_detects_torn_write() {
        let tt = TranspositionTable::new(1);
        let key = 0xDEAD_BEEF_1234_5678;
        tt.probe(key).save(key, 100, Bound::Exact, 5, e2e4(), 50, 0);
        assert!(tt.probe(key).hit());

        let bucket = &tt.buckets[(key & tt.mask) as usize];
        for entry in &bucket.entries {
            let w1 = entry.word1.load(Ordering::Relaxed);
            entry.word1.store(w1 ^ 0xFFFF_FFFF_0000_0000, Ordering::Relaxed);
        }
        assert!(!tt.probe(key).hit());
    }

    #[test]
    fn concurrent_stress_no_panics() {
        let tt = TranspositionTable::new(2);
        std::thread::scope(|s| {
            for t in 0..8u64 {
                let tt = &tt;
                s.spawn(move || {
                    for i in 0u64..10_000 {
                        let key = t.wrapping_mul(6364136223846793005).wrapping_add(i.wrapping_mul(2862933555777941757))
                            ^ 0xDEAD_BEEF_CAFE_F00D;
                        let probe = tt.probe(key);
                        probe.save(key, 100, Bound::Lower, (i % 30) as Depth, e2e4(), 50, tt.generation());
                    }
                });
            }
        });
        assert!(tt.hashfull() > 0);
    }
}
