use meshforum_common::{
    model::Id,
    snowflake::{ProcessId, SnowflakeClockError, SnowflakeGenerator, WorkerId},
};
use std::sync::{Mutex, PoisonError};
use time::OffsetDateTime;

/// Hands out ids and the server-assigned timestamps stored alongside them.
///
/// Both are non-decreasing across all collections of one process.
#[derive(Debug, Default)]
pub struct Sequencer {
    generator: Mutex<SnowflakeGenerator>,
}

impl Sequencer {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            generator: Mutex::new(SnowflakeGenerator::new(worker_id, process_id)),
        }
    }

    pub fn next<Marker>(&self) -> Result<(Id<Marker>, OffsetDateTime), SnowflakeClockError> {
        let (snowflake, issued_at) = self
            .generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?;

        Ok((snowflake.into(), issued_at))
    }
}

#[cfg(test)]
mod tests {
    use crate::sequencer::Sequencer;
    use meshforum_common::model::{Id, question::QuestionMarker};

    #[test]
    fn issued_values_never_decrease() {
        let sequencer = Sequencer::default();

        let mut previous: Option<(Id<QuestionMarker>, _)> = None;
        for _ in 0..1000 {
            let next = sequencer.next::<QuestionMarker>().unwrap();
            if let Some((id, at)) = previous {
                assert!(next.0 > id);
                assert!(next.1 >= at);
            }
            previous = Some(next);
        }
    }
}
