use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use kicker_match::{FinalScore, MatchId, MatchStore, NewMatchRecord};

/// One record as the in-memory store holds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredMatch {
    pub match_id: MatchId,
    pub record: NewMatchRecord,
    pub fin: Option<FinalScore>,
}

/// Match record store with the same single-open rule as the Postgres schema.
#[derive(Default)]
pub struct MemoryMatchStore {
    records: Mutex<Vec<StoredMatch>>,
    fail_writes: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Total create + finalize calls, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<StoredMatch> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn begin_write(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("match store write failed (simulated)");
        }
        Ok(())
    }
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn create_match_record(&self, record: &NewMatchRecord) -> Result<MatchId> {
        self.begin_write()?;
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.iter().any(|r| r.fin.is_none()) {
            bail!("another match record is still open");
        }
        let match_id = MatchId(records.len() as i64 + 1);
        records.push(StoredMatch {
            match_id,
            record: record.clone(),
            fin: None,
        });
        Ok(match_id)
    }

    async fn finalize_match_record(&self, match_id: MatchId, fin: &FinalScore) -> Result<()> {
        self.begin_write()?;
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let rec = records
            .iter_mut()
            .find(|r| r.match_id == match_id && r.fin.is_none())
            .ok_or_else(|| anyhow!("match record {match_id} is not open"))?;
        rec.fin = Some(fin.clone());
        Ok(())
    }
}
