//! Module for working with snowflake IDs.
//!
//! Layout, from the most significant bit: 42 bits of milliseconds since
//! [`EPOCH`], 5 bits worker id, 5 bits process id, 12 bits increment.
//!
//! See <https://discord.com/developers/docs/reference#snowflakes>

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use time::{Duration, OffsetDateTime, macros::datetime};

pub const EPOCH: OffsetDateTime = datetime!(2025-01-01 00:00 UTC);

pub const TIMESTAMP_OFFSET: u32 = 22;
pub const TIMESTAMP_LENGTH: u32 = 42;

pub const WORKER_ID_OFFSET: u32 = 17;
pub const WORKER_ID_LENGTH: u32 = 5;

pub const PROCESS_ID_OFFSET: u32 = 12;
pub const PROCESS_ID_LENGTH: u32 = 5;

pub const INCREMENT_OFFSET: u32 = 0;
pub const INCREMENT_LENGTH: u32 = 12;

const fn low_bits(length: u32) -> u64 {
    (1 << length) - 1
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeClockError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp uses too many bits.")]
    TimestampTooLarge,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Snowflake part was out of range for creation: {0}")]
pub struct SnowflakePartOutOfRangeError(u8);

macro_rules! snowflake_part {
    ($name:ident, $length:ident) => {
        #[derive(
            Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
        )]
        #[serde(try_from = "u8", into = "u8")]
        pub struct $name(u8);

        impl $name {
            #[must_use]
            pub fn new(id: u8) -> Option<Self> {
                (u64::from(id) <= low_bits($length)).then_some(Self(id))
            }

            #[must_use]
            pub fn get(self) -> u8 {
                self.0
            }
        }

        impl TryFrom<u8> for $name {
            type Error = SnowflakePartOutOfRangeError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(SnowflakePartOutOfRangeError(value))
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

snowflake_part!(WorkerId, WORKER_ID_LENGTH);
snowflake_part!(ProcessId, PROCESS_ID_LENGTH);

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Snowflake(u64);

impl Snowflake {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner)
    }

    /// Bits above each part's length are discarded.
    #[must_use]
    pub fn from_parts(
        timestamp_millis: u64,
        worker_id: WorkerId,
        process_id: ProcessId,
        increment: u16,
    ) -> Self {
        let snowflake = (timestamp_millis & low_bits(TIMESTAMP_LENGTH)) << TIMESTAMP_OFFSET
            | u64::from(worker_id.get()) << WORKER_ID_OFFSET
            | u64::from(process_id.get()) << PROCESS_ID_OFFSET
            | (u64::from(increment) & low_bits(INCREMENT_LENGTH)) << INCREMENT_OFFSET;

        Self(snowflake)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn timestamp_millis(self) -> u64 {
        (self.0 >> TIMESTAMP_OFFSET) & low_bits(TIMESTAMP_LENGTH)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn worker_id(self) -> WorkerId {
        WorkerId(((self.0 >> WORKER_ID_OFFSET) & low_bits(WORKER_ID_LENGTH)) as u8)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn process_id(self) -> ProcessId {
        ProcessId(((self.0 >> PROCESS_ID_OFFSET) & low_bits(PROCESS_ID_LENGTH)) as u8)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn increment(self) -> u16 {
        ((self.0 >> INCREMENT_OFFSET) & low_bits(INCREMENT_LENGTH)) as u16
    }

    #[must_use]
    pub fn created_at(self) -> OffsetDateTime {
        millis_to_time(self.timestamp_millis())
    }
}

impl Display for Snowflake {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<u64> for Snowflake {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Snowflake> for u64 {
    fn from(value: Snowflake) -> Self {
        value.get()
    }
}

fn millis_since_epoch(time: OffsetDateTime) -> Result<u64, SnowflakeClockError> {
    let millis = (time - EPOCH).whole_milliseconds();
    if millis < 0 {
        return Err(SnowflakeClockError::TimeBeforeEpoch);
    }
    let millis = u64::try_from(millis).map_err(|_| SnowflakeClockError::TimestampTooLarge)?;
    if millis > low_bits(TIMESTAMP_LENGTH) {
        return Err(SnowflakeClockError::TimestampTooLarge);
    }
    Ok(millis)
}

#[allow(clippy::cast_possible_wrap)]
fn millis_to_time(millis: u64) -> OffsetDateTime {
    // At most 42 bits, so the cast cannot wrap.
    EPOCH + Duration::milliseconds(millis as i64)
}

/// Issues snowflakes together with the timestamp they encode.
///
/// Both are strictly ordered per generator: if the wall clock goes backwards
/// the generator keeps using the last issued millisecond, and once the
/// increment space of a millisecond is exhausted it moves on to the next one.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SnowflakeGenerator {
    worker_id: WorkerId,
    process_id: ProcessId,
    last_millis: Option<u64>,
    next_increment: u16,
}

impl SnowflakeGenerator {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            last_millis: None,
            next_increment: 0,
        }
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        self.worker_id
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        self.process_id
    }

    pub fn generate_at(
        &mut self,
        now: OffsetDateTime,
    ) -> Result<(Snowflake, OffsetDateTime), SnowflakeClockError> {
        let wall_millis = millis_since_epoch(now)?;

        let (millis, increment) = match self.last_millis {
            Some(last) if wall_millis <= last => {
                if u64::from(self.next_increment) > low_bits(INCREMENT_LENGTH) {
                    (last + 1, 0)
                } else {
                    (last, self.next_increment)
                }
            }
            _ => (wall_millis, 0),
        };
        if millis > low_bits(TIMESTAMP_LENGTH) {
            return Err(SnowflakeClockError::TimestampTooLarge);
        }

        self.last_millis = Some(millis);
        self.next_increment = increment + 1;

        let snowflake = Snowflake::from_parts(millis, self.worker_id, self.process_id, increment);
        Ok((snowflake, millis_to_time(millis)))
    }

    pub fn generate(&mut self) -> Result<(Snowflake, OffsetDateTime), SnowflakeClockError> {
        self.generate_at(OffsetDateTime::now_utc())
    }
}

#[cfg(test)]
mod tests {
    use crate::snowflake::{
        EPOCH, ProcessId, Snowflake, SnowflakeClockError, SnowflakeGenerator, WorkerId,
    };
    use time::{Duration, macros::datetime};

    #[test]
    fn legal_values() {
        let legal_ids = [0, 0xD, 0x1F];
        let illegal_ids = [0x20, 0xF0, u8::MAX];

        for legal_id in legal_ids {
            assert!(WorkerId::new(legal_id).is_some());
            assert!(ProcessId::new(legal_id).is_some());
        }
        for illegal_id in illegal_ids {
            assert!(WorkerId::new(illegal_id).is_none());
            assert!(ProcessId::new(illegal_id).is_none());
        }
    }

    #[test]
    fn worker_id_deserialization_is_checked() {
        assert_eq!(
            serde_json::from_str::<WorkerId>("31").unwrap(),
            WorkerId::new(31).unwrap()
        );
        assert!(serde_json::from_str::<WorkerId>("32").is_err());
    }

    #[test]
    fn snowflake_from_into_parts() {
        let worker_id = WorkerId::new(0b10101).unwrap();
        let process_id = ProcessId::new(0b10001).unwrap();

        let snowflake = Snowflake::from_parts(123_456_789, worker_id, process_id, 100);

        assert_eq!(snowflake.timestamp_millis(), 123_456_789);
        assert_eq!(snowflake.worker_id(), worker_id);
        assert_eq!(snowflake.process_id(), process_id);
        assert_eq!(snowflake.increment(), 100);
        assert_eq!(
            snowflake.created_at(),
            EPOCH + Duration::milliseconds(123_456_789)
        );
    }

    #[test]
    fn snowflake_generator() {
        let worker_id = WorkerId::new(10).unwrap();
        let process_id = ProcessId::new(0).unwrap();
        let time = datetime!(2025-10-24 10:55 UTC);

        let mut generator = SnowflakeGenerator::new(worker_id, process_id);

        let (first, first_time) = generator.generate_at(time).unwrap();
        let (second, second_time) = generator.generate_at(time).unwrap();

        assert_eq!(first_time, time);
        assert_eq!(second_time, time);
        assert_eq!(first.increment(), 0);
        assert_eq!(second.increment(), 1);
        assert!(first < second);
        assert_eq!(first.worker_id(), worker_id);
    }

    #[test]
    fn generator_never_goes_backwards() {
        let mut generator = SnowflakeGenerator::default();
        let later = datetime!(2025-10-24 11:00 UTC);
        let earlier = datetime!(2025-10-24 10:00 UTC);

        let (first, first_time) = generator.generate_at(later).unwrap();
        let (second, second_time) = generator.generate_at(earlier).unwrap();

        assert!(second > first);
        assert_eq!(second_time, first_time);
    }

    #[test]
    fn generator_spills_into_next_millisecond() {
        let mut generator = SnowflakeGenerator::default();
        let time = datetime!(2025-10-24 10:00 UTC);

        let mut last = None;
        for _ in 0..=0xFFF {
            last = Some(generator.generate_at(time).unwrap());
        }
        let (last, last_time) = last.unwrap();
        assert_eq!(last.increment(), 0xFFF);
        assert_eq!(last_time, time);

        let (spilled, spilled_time) = generator.generate_at(time).unwrap();
        assert_eq!(spilled.increment(), 0);
        assert_eq!(spilled_time, time + Duration::milliseconds(1));
        assert!(spilled > last);
    }

    #[test]
    fn time_before_epoch_is_rejected() {
        let mut generator = SnowflakeGenerator::default();
        assert_eq!(
            generator.generate_at(EPOCH - Duration::milliseconds(1)),
            Err(SnowflakeClockError::TimeBeforeEpoch)
        );
    }
}
