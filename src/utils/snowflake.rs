//! Time-ordered 64-bit identifiers used to mint short codes.
//!
//! Bit layout, most significant bit first:
//!
//! ```text
//! | 0 | 41 bits: ms since EPOCH_MILLIS | 10 bits: node id | 12 bits: sequence |
//! ```
//!
//! The sign bit is always zero so an id also fits a signed `BIGINT`.
//! 41 bits of milliseconds cover roughly 69 years from the custom epoch,
//! and 12 bits of sequence allow 4096 ids per millisecond per node.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::utils::code_generator::{CodeError, decode_code, encode_code};

/// Custom epoch: 2024-01-01T00:00:00Z in Unix milliseconds.
pub const EPOCH_MILLIS: u64 = 1_704_067_200_000;

pub const TIMESTAMP_BITS: u32 = 41;
pub const NODE_BITS: u32 = 10;
pub const SEQUENCE_BITS: u32 = 12;

/// Largest accepted node id (1023).
pub const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;
const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;
const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;

const NODE_SHIFT: u32 = SEQUENCE_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + NODE_BITS;

/// Errors raised while constructing a generator or minting an id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("node id {node_id} is outside the range 0..={max}")]
    InvalidNodeId { node_id: i64, max: u16 },

    #[error("clock moved backwards: last id at {last_millis}ms, clock reads {now_millis}ms")]
    ClockRegression { last_millis: u64, now_millis: u64 },

    #[error("clock reads {now_millis}ms, which is before the id epoch")]
    ClockBeforeEpoch { now_millis: u64 },

    #[error("timestamp {elapsed_millis}ms past the epoch no longer fits in 41 bits")]
    TimestampOverflow { elapsed_millis: u64 },
}

/// Checks that `node_id` fits the 10-bit node component.
///
/// # Errors
///
/// Returns [`IdError::InvalidNodeId`] for values outside `0..=1023`.
pub fn validate_node_id(node_id: i64) -> Result<u16, IdError> {
    u16::try_from(node_id)
        .ok()
        .filter(|id| *id <= MAX_NODE_ID)
        .ok_or(IdError::InvalidNodeId {
            node_id,
            max: MAX_NODE_ID,
        })
}

/// Wall-clock source for [`IdGenerator`].
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// [`Clock`] backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// A minted identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnowflakeId(u64);

impl SnowflakeId {
    /// Assembles an id from its components. Out-of-range parts are masked.
    pub fn from_parts(elapsed_millis: u64, node_id: u16, sequence: u16) -> Self {
        Self(
            ((elapsed_millis & MAX_TIMESTAMP) << TIMESTAMP_SHIFT)
                | (u64::from(node_id & MAX_NODE_ID) << NODE_SHIFT)
                | u64::from(sequence & MAX_SEQUENCE),
        )
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Milliseconds since [`EPOCH_MILLIS`].
    pub fn timestamp_millis(self) -> u64 {
        (self.0 >> TIMESTAMP_SHIFT) & MAX_TIMESTAMP
    }

    pub fn unix_millis(self) -> u64 {
        self.timestamp_millis() + EPOCH_MILLIS
    }

    pub fn node_id(self) -> u16 {
        // Masked to 10 bits, so the narrowing cannot truncate.
        ((self.0 >> NODE_SHIFT) & u64::from(MAX_NODE_ID)) as u16
    }

    pub fn sequence(self) -> u16 {
        (self.0 & u64::from(MAX_SEQUENCE)) as u16
    }

    pub fn created_at(self) -> Option<DateTime<Utc>> {
        i64::try_from(self.unix_millis())
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Renders the id as a fixed-width base-62 short code.
    pub fn to_code(self) -> String {
        encode_code(self.0)
    }

    /// Parses a short code produced by [`SnowflakeId::to_code`].
    ///
    /// # Errors
    ///
    /// Returns [`CodeError`] if the code is empty, contains characters outside
    /// the base-62 alphabet, or does not fit in 64 bits.
    pub fn from_code(code: &str) -> Result<Self, CodeError> {
        decode_code(code).map(Self)
    }
}

impl From<u64> for SnowflakeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.0
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: Option<u64>,
    sequence: u16,
}

/// Mints unique, roughly time-ordered ids for a single node.
///
/// All mutable state lives behind one mutex; [`IdGenerator::generate`] never
/// performs I/O while holding it. Share a generator through
/// [`crate::utils::node_registry::NodeRegistry`] rather than constructing a
/// second one for the same node id.
pub struct IdGenerator {
    node_id: u16,
    clock: Arc<dyn Clock>,
    state: Mutex<GeneratorState>,
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator")
            .field("node_id", &self.node_id)
            .finish_non_exhaustive()
    }
}

impl IdGenerator {
    /// Creates a generator using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidNodeId`] if `node_id` is outside `0..=1023`.
    pub fn new(node_id: i64) -> Result<Self, IdError> {
        Self::with_clock(node_id, Arc::new(SystemClock))
    }

    /// Creates a generator reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidNodeId`] if `node_id` is outside `0..=1023`.
    pub fn with_clock(node_id: i64, clock: Arc<dyn Clock>) -> Result<Self, IdError> {
        let node_id = validate_node_id(node_id)?;
        Ok(Self {
            node_id,
            clock,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    /// Mints the next id.
    ///
    /// When the 4096 sequence values of the current millisecond are used up,
    /// spins until the clock ticks over instead of reusing a value.
    ///
    /// # Errors
    ///
    /// - [`IdError::ClockRegression`] if the clock reads earlier than the last
    ///   minted id. Nothing is consumed; callers may retry after a short backoff.
    /// - [`IdError::ClockBeforeEpoch`] / [`IdError::TimestampOverflow`] if the
    ///   clock is outside the representable range.
    pub fn generate(&self) -> Result<SnowflakeId, IdError> {
        // The state is only written after every fallible step, so a poisoned
        // lock still guards consistent data.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut now = self.elapsed_millis()?;

        match state.last_timestamp {
            Some(last) if now < last => {
                warn!(
                    node_id = self.node_id,
                    last_millis = last + EPOCH_MILLIS,
                    now_millis = now + EPOCH_MILLIS,
                    "Clock regression detected, refusing to mint"
                );
                return Err(IdError::ClockRegression {
                    last_millis: last + EPOCH_MILLIS,
                    now_millis: now + EPOCH_MILLIS,
                });
            }
            Some(last) if now == last => {
                if state.sequence == MAX_SEQUENCE {
                    now = self.wait_next_millis(last)?;
                    state.sequence = 0;
                } else {
                    state.sequence += 1;
                }
            }
            _ => state.sequence = 0,
        }

        state.last_timestamp = Some(now);
        Ok(SnowflakeId::from_parts(now, self.node_id, state.sequence))
    }

    fn elapsed_millis(&self) -> Result<u64, IdError> {
        let now_millis = self.clock.now_millis();
        let elapsed = now_millis
            .checked_sub(EPOCH_MILLIS)
            .ok_or(IdError::ClockBeforeEpoch { now_millis })?;

        if elapsed > MAX_TIMESTAMP {
            return Err(IdError::TimestampOverflow {
                elapsed_millis: elapsed,
            });
        }

        Ok(elapsed)
    }

    fn wait_next_millis(&self, last: u64) -> Result<u64, IdError> {
        loop {
            let now = self.elapsed_millis()?;
            if now > last {
                return Ok(now);
            }
            if now < last {
                return Err(IdError::ClockRegression {
                    last_millis: last + EPOCH_MILLIS,
                    now_millis: now + EPOCH_MILLIS,
                });
            }
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;

    /// Clock that only moves when told to.
    struct ManualClock(AtomicU64);

    impl ManualClock {
        fn at(millis: u64) -> Arc<Self> {
            Arc::new(Self(AtomicU64::new(millis)))
        }

        fn set(&self, millis: u64) {
            self.0.store(millis, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Clock that advances one millisecond every `reads_per_tick` reads.
    struct SteppingClock {
        base: u64,
        reads: AtomicU64,
        reads_per_tick: u64,
    }

    impl Clock for SteppingClock {
        fn now_millis(&self) -> u64 {
            let reads = self.reads.fetch_add(1, Ordering::SeqCst);
            self.base + reads / self.reads_per_tick
        }
    }

    const T0: u64 = EPOCH_MILLIS + 86_400_000;

    #[test]
    fn test_rejects_out_of_range_node_ids() {
        for bad in [-1, 1024, 70_000, i64::MAX] {
            let result = IdGenerator::new(bad);
            assert!(
                matches!(result, Err(IdError::InvalidNodeId { node_id, max: 1023 }) if node_id == bad),
                "node id {bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_accepts_boundary_node_ids() {
        assert_eq!(IdGenerator::new(0).unwrap().node_id(), 0);
        assert_eq!(IdGenerator::new(1023).unwrap().node_id(), 1023);
    }

    #[test]
    fn test_consecutive_ids_unique_and_time_ordered() {
        for node in [0, 7, 1023] {
            let generator = IdGenerator::new(node).unwrap();
            let mut seen = HashSet::new();
            let mut last_ts = 0;

            for _ in 0..20_000 {
                let id = generator.generate().unwrap();
                assert!(seen.insert(id), "duplicate id {id}");
                assert!(id.timestamp_millis() >= last_ts);
                assert_eq!(id.node_id(), u16::try_from(node).unwrap());
                last_ts = id.timestamp_millis();
            }
        }
    }

    #[test]
    fn test_sequence_increments_within_millisecond_and_resets_after() {
        let clock = ManualClock::at(T0);
        let generator = IdGenerator::with_clock(3, clock.clone()).unwrap();

        let a = generator.generate().unwrap();
        let b = generator.generate().unwrap();
        assert_eq!(a.sequence(), 0);
        assert_eq!(b.sequence(), 1);
        assert_eq!(a.timestamp_millis(), b.timestamp_millis());
        assert!(b > a);

        clock.set(T0 + 1);
        let c = generator.generate().unwrap();
        assert_eq!(c.sequence(), 0);
        assert_eq!(c.timestamp_millis(), a.timestamp_millis() + 1);
        assert!(c > b);
    }

    #[test]
    fn test_clock_regression_fails_without_consuming_state() {
        let clock = ManualClock::at(T0 + 10);
        let generator = IdGenerator::with_clock(1, clock.clone()).unwrap();

        let before = generator.generate().unwrap();

        clock.set(T0 + 5);
        let err = generator.generate().unwrap_err();
        assert_eq!(
            err,
            IdError::ClockRegression {
                last_millis: T0 + 10,
                now_millis: T0 + 5,
            }
        );

        clock.set(T0 + 10);
        let after = generator.generate().unwrap();
        assert_ne!(before, after);
        assert_eq!(after.sequence(), before.sequence() + 1);
    }

    #[test]
    fn test_sequence_exhaustion_waits_for_next_tick() {
        let clock = Arc::new(SteppingClock {
            base: T0,
            reads: AtomicU64::new(0),
            reads_per_tick: 5_000,
        });
        let generator = IdGenerator::with_clock(9, clock).unwrap();

        let ids: Vec<_> = (0..4097).map(|_| generator.generate().unwrap()).collect();

        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());

        let last = ids[4096];
        assert_eq!(last.timestamp_millis(), T0 - EPOCH_MILLIS + 1);
        assert_eq!(last.sequence(), 0);
        assert_eq!(ids[4095].sequence(), MAX_SEQUENCE);
    }

    #[test]
    fn test_clock_before_epoch_is_rejected() {
        let generator = IdGenerator::with_clock(1, ManualClock::at(EPOCH_MILLIS - 1)).unwrap();
        assert_eq!(
            generator.generate().unwrap_err(),
            IdError::ClockBeforeEpoch {
                now_millis: EPOCH_MILLIS - 1
            }
        );
    }

    #[test]
    fn test_timestamp_overflow_is_rejected() {
        let generator =
            IdGenerator::with_clock(1, ManualClock::at(EPOCH_MILLIS + MAX_TIMESTAMP + 1)).unwrap();
        assert!(matches!(
            generator.generate(),
            Err(IdError::TimestampOverflow { .. })
        ));
    }

    #[test]
    fn test_id_parts_are_recoverable() {
        let id = SnowflakeId::from_parts(123_456_789, 517, 4000);
        assert_eq!(id.timestamp_millis(), 123_456_789);
        assert_eq!(id.node_id(), 517);
        assert_eq!(id.sequence(), 4000);
        assert_eq!(id.unix_millis(), 123_456_789 + EPOCH_MILLIS);
        assert!(id.as_u64() < 1 << 63);
    }

    #[test]
    fn test_created_at_matches_clock() {
        let generator = IdGenerator::with_clock(2, ManualClock::at(T0)).unwrap();
        let id = generator.generate().unwrap();
        let created_at = id.created_at().unwrap();
        assert_eq!(u64::try_from(created_at.timestamp_millis()).unwrap(), T0);
    }

    #[test]
    fn test_code_round_trip() {
        let generator = IdGenerator::new(42).unwrap();
        let id = generator.generate().unwrap();
        let code = id.to_code();
        assert_eq!(SnowflakeId::from_code(&code).unwrap(), id);
    }

    #[test]
    fn test_concurrent_generation_never_duplicates() {
        let generator = Arc::new(IdGenerator::new(11).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                thread::spawn(move || {
                    (0..5_000)
                        .map(|_| generator.generate().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 40_000);
    }
}
