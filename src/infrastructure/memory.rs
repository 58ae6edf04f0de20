use crate::domain::{
    errors::OutcomeStoreError,
    models::{OutcomeStore, RecordedOutcome},
};
use dashmap::DashMap;

/// In-memory outcome log, scoped to one session.
#[derive(Clone, Default)]
pub struct InMemoryOutcomeLog {
    outcomes: DashMap<u64, RecordedOutcome>,
    // day -> [entry_id]. `%Y-%m-%d` format date is the key
    outcomes_by_day: DashMap<String, Vec<u64>>,
}

#[async_trait::async_trait]
impl OutcomeStore for InMemoryOutcomeLog {
    async fn record_outcome(&self, outcome: RecordedOutcome) -> Result<(), OutcomeStoreError> {
        let entry_id = outcome.entry_id;
        if self.outcomes.contains_key(&entry_id) {
            tracing::warn!("outcome already recorded for entry {}", entry_id);
            return Ok(());
        }

        let day = outcome.recorded_at.format("%Y-%m-%d").to_string();
        self.outcomes.insert(entry_id, outcome);
        self.outcomes_by_day.entry(day).or_default().push(entry_id);

        Ok(())
    }

    async fn get_outcomes(&self) -> Result<Vec<RecordedOutcome>, OutcomeStoreError> {
        let mut all: Vec<RecordedOutcome> =
            self.outcomes.iter().map(|v| v.value().clone()).collect();
        all.sort_by_key(|outcome| outcome.entry_id);
        Ok(all)
    }

    async fn get_outcome(&self, entry_id: u64) -> Result<RecordedOutcome, OutcomeStoreError> {
        self.outcomes
            .get(&entry_id)
            .map(|v| v.value().clone())
            .ok_or(OutcomeStoreError::OutcomeNotFound(entry_id))
    }

    async fn get_outcomes_by_day(
        &self,
        day: String,
    ) -> Result<Vec<RecordedOutcome>, OutcomeStoreError> {
        Ok(self
            .outcomes_by_day
            .get(&day)
            .map(|v| v.value().clone())
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.outcomes.get(id).map(|v| v.value().clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Outcome;
    use chrono::{TimeZone, Utc};

    fn outcome(entry_id: u64, timestamp: i64) -> RecordedOutcome {
        RecordedOutcome {
            entry_id,
            target: "escrow-create".to_owned(),
            description: format!("entry {entry_id}"),
            outcome: Outcome::Success {
                description: format!("entry {entry_id}"),
            },
            recorded_at: Utc.timestamp_opt(timestamp, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn records_and_retrieves_in_entry_order() {
        let log = InMemoryOutcomeLog::default();
        log.record_outcome(outcome(2, 1_700_000_100)).await.unwrap();
        log.record_outcome(outcome(1, 1_700_000_000)).await.unwrap();

        let all = log.get_outcomes().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].entry_id, 1);
        assert_eq!(all[1].entry_id, 2);

        assert_eq!(log.get_outcome(2).await.unwrap().entry_id, 2);
        assert!(matches!(
            log.get_outcome(9).await,
            Err(OutcomeStoreError::OutcomeNotFound(9))
        ));
    }

    #[tokio::test]
    async fn duplicate_recording_is_a_noop() {
        let log = InMemoryOutcomeLog::default();
        log.record_outcome(outcome(1, 1_700_000_000)).await.unwrap();
        log.record_outcome(outcome(1, 1_700_000_000)).await.unwrap();
        assert_eq!(log.get_outcomes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn indexes_outcomes_by_day() {
        let log = InMemoryOutcomeLog::default();
        // 2023-11-14 and 2023-11-15 UTC
        log.record_outcome(outcome(1, 1_699_999_200)).await.unwrap();
        log.record_outcome(outcome(2, 1_700_085_600)).await.unwrap();

        let first_day = log
            .get_outcomes_by_day("2023-11-14".to_owned())
            .await
            .unwrap();
        assert_eq!(first_day.len(), 1);
        assert_eq!(first_day[0].entry_id, 1);

        let empty = log
            .get_outcomes_by_day("2020-01-01".to_owned())
            .await
            .unwrap();
        assert!(empty.is_empty());
    }
}
