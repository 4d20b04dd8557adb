use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::model::WorldModel;
use crate::players::{snapshot_from_value, PlayerRegistry, PlayerSnapshot};

use super::classify::{classify_batch, ChatEvent, DropCounts};
use super::queue::PendingQueues;
use super::reconcile::{apply_deltas, ApplyStats};
use super::watermark::Watermark;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to decode update envelope: {0}")]
    Envelope(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEnvelope {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub servertime: i64,
    #[serde(default)]
    pub players: Vec<Value>,
    #[serde(default)]
    pub updates: Vec<Value>,
}

impl UpdateEnvelope {
    pub fn from_value(value: Value) -> Result<Self, FeedError> {
        serde_json::from_value(value).map_err(FeedError::Envelope)
    }

    pub fn parse(raw: &str) -> Result<Self, FeedError> {
        serde_json::from_str(raw).map_err(FeedError::Envelope)
    }
}

#[derive(Debug)]
pub struct AppliedBatch {
    pub drops: DropCounts,
    pub stats: ApplyStats,
    pub chat: Vec<ChatEvent>,
    pub players_pending: usize,
    pub players_pruned: usize,
    pub watermark: Watermark,
}

#[derive(Debug)]
pub enum BatchOutcome {
    Superseded { seq: u64, latest: u64 },
    Applied(AppliedBatch),
}

#[derive(Debug, Default)]
pub struct PollSession {
    watermark: Watermark,
    last_issued_seq: u64,
    pending_players: Vec<PlayerSnapshot>,
}

impl PollSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    pub fn pending_player_count(&self) -> usize {
        self.pending_players.len()
    }

    pub fn begin_request(&mut self) -> u64 {
        self.last_issued_seq = self.last_issued_seq.saturating_add(1);
        self.last_issued_seq
    }

    pub fn apply_response(
        &mut self,
        seq: u64,
        envelope: &UpdateEnvelope,
        model: &mut WorldModel,
        queues: &mut PendingQueues,
        registry: &mut PlayerRegistry,
    ) -> BatchOutcome {
        if seq != self.last_issued_seq {
            debug!(seq, latest = self.last_issued_seq, "superseded_response_discarded");
            return BatchOutcome::Superseded {
                seq,
                latest: self.last_issued_seq,
            };
        }

        let mut batch = classify_batch(&envelope.updates, self.watermark);
        let drops = batch.drops;
        let chat = std::mem::take(&mut batch.chat);
        let stats = apply_deltas(model, queues, batch);

        let mut snapshots = Vec::new();
        let mut keep = HashSet::new();
        for value in &envelope.players {
            if let Some(snapshot) = snapshot_from_value(value) {
                keep.insert(snapshot.account.clone());
                snapshots.push(snapshot);
            }
        }
        let players_pruned = registry.prune(&keep);
        // A fresh full snapshot supersedes any remainder from the previous poll.
        self.pending_players = registry.merge_chunk(snapshots);

        self.watermark.advance_to(envelope.timestamp);
        BatchOutcome::Applied(AppliedBatch {
            drops,
            stats,
            chat,
            players_pending: self.pending_players.len(),
            players_pruned,
            watermark: self.watermark,
        })
    }

    pub fn merge_pending_players(&mut self, registry: &mut PlayerRegistry) -> usize {
        if self.pending_players.is_empty() {
            return 0;
        }
        let pending = std::mem::take(&mut self.pending_players);
        let before = pending.len();
        self.pending_players = registry.merge_chunk(pending);
        before - self.pending_players.len()
    }
}
