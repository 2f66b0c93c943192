//! In-process sink for embedding and tests.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use practicum_core::record::SessionRecord;
use practicum_core::traits::ResultSink;

/// Keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<SessionRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SessionRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn latest(&self) -> Option<SessionRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn persist(&self, record: &SessionRecord) -> anyhow::Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::make_test_record;

    #[tokio::test]
    async fn keeps_arrival_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        let first = make_test_record();
        let mut second = make_test_record();
        second.result.score = 91;

        sink.persist(&first).await.unwrap();
        sink.persist(&second).await.unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.records()[0].result.score, 58);
        assert_eq!(sink.latest().unwrap().result.score, 91);
    }
}
