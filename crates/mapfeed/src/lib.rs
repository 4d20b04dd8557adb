use std::fs;
use std::path::{Path, PathBuf};

use mapcore::{
    BatchOutcome, DropCounts, PendingQueues, PlayerRegistry, PollSession, UpdateEnvelope,
    WorldModel,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_DRAIN_CHUNK: usize = 50;
pub const DRAIN_CHUNK_ENV_VAR: &str = "MAPFEED_DRAIN_CHUNK";

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub feed_path: PathBuf,
    pub drain_chunk: usize,
    pub quiet: bool,
}

impl ReplayOptions {
    pub fn new(feed_path: PathBuf) -> Self {
        Self {
            feed_path,
            drain_chunk: drain_chunk_from_env(),
            quiet: false,
        }
    }
}

fn drain_chunk_from_env() -> usize {
    match std::env::var(DRAIN_CHUNK_ENV_VAR).ok().as_deref() {
        Some(raw) => match raw.parse::<usize>() {
            Ok(parsed) if parsed > 0 => parsed,
            _ => {
                warn!(
                    value = raw,
                    fallback = DEFAULT_DRAIN_CHUNK,
                    "invalid_drain_chunk_using_default"
                );
                DEFAULT_DRAIN_CHUNK
            }
        },
        None => DEFAULT_DRAIN_CHUNK,
    }
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read feed file {path}: {source}")]
    ReadFeed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse feed json at {json_path}: {source}")]
    ParseFeed {
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode envelope {index}: {source}")]
    Envelope {
        index: usize,
        #[source]
        source: mapcore::FeedError,
    },
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReplaySummary {
    pub envelopes_applied: u32,
    pub drops: DropCounts,
    pub entity_updates: u32,
    pub tile_updates: u32,
    pub entities_drained: u32,
    pub tiles_drained: u32,
    pub chat_events: u32,
    pub players: usize,
    pub sets: usize,
    pub entities: usize,
}

pub fn run_replay(options: &ReplayOptions) -> Result<ReplaySummary, ReplayError> {
    let envelopes = load_feed(&options.feed_path)?;
    let mut model = WorldModel::default();
    let mut queues = PendingQueues::default();
    let mut registry = PlayerRegistry::default();
    let mut session = PollSession::new();
    let mut summary = ReplaySummary::default();

    for (index, envelope) in envelopes.iter().enumerate() {
        let seq = session.begin_request();
        match session.apply_response(seq, envelope, &mut model, &mut queues, &mut registry) {
            BatchOutcome::Superseded { seq, latest } => {
                warn!(index, seq, latest, "replay_envelope_superseded");
            }
            BatchOutcome::Applied(applied) => {
                summary.envelopes_applied = summary.envelopes_applied.saturating_add(1);
                summary.drops.merge(applied.drops);
                summary.entity_updates = summary
                    .entity_updates
                    .saturating_add(applied.stats.entity_updates);
                summary.tile_updates = summary
                    .tile_updates
                    .saturating_add(applied.stats.tile_updates);
                summary.chat_events = summary
                    .chat_events
                    .saturating_add(applied.chat.len() as u32);
                if !options.quiet {
                    info!(
                        index,
                        servertime = envelope.servertime,
                        watermark = applied.watermark.millis(),
                        dropped = applied.drops.total(),
                        entity_updates = applied.stats.entity_updates,
                        players_pending = applied.players_pending,
                        "replay_envelope_applied"
                    );
                }
            }
        }
        while session.merge_pending_players(&mut registry) > 0 {}
        drain_queues(&mut queues, options.drain_chunk, &mut summary);
    }

    summary.players = registry.len();
    summary.sets = model.set_count();
    summary.entities = model.entity_count();
    Ok(summary)
}

fn load_feed(path: &Path) -> Result<Vec<UpdateEnvelope>, ReplayError> {
    let raw = fs::read_to_string(path).map_err(|source| ReplayError::ReadFeed {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    let values = match serde_path_to_error::deserialize::<_, Vec<Value>>(&mut deserializer) {
        Ok(values) => values,
        Err(error) => {
            let json_path = error.path().to_string();
            return Err(ReplayError::ParseFeed {
                json_path,
                source: error.into_inner(),
            });
        }
    };
    debug!(envelopes = values.len(), path = %path.display(), "feed_loaded");
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            UpdateEnvelope::from_value(value)
                .map_err(|source| ReplayError::Envelope { index, source })
        })
        .collect()
}

fn drain_queues(queues: &mut PendingQueues, chunk: usize, summary: &mut ReplaySummary) {
    loop {
        let drained = queues.pop_tiles(chunk).len();
        summary.tiles_drained = summary.tiles_drained.saturating_add(drained as u32);
        if drained == 0 {
            break;
        }
    }
    let set_ids = queues.set_ids().map(ToString::to_string).collect::<Vec<_>>();
    for set_id in set_ids {
        loop {
            let drained = queues.pop_markers(&set_id, chunk).len()
                + queues.pop_areas(&set_id, chunk).len()
                + queues.pop_circles(&set_id, chunk).len()
                + queues.pop_lines(&set_id, chunk).len();
            summary.entities_drained = summary.entities_drained.saturating_add(drained as u32);
            if drained == 0 {
                break;
            }
        }
    }
}

impl ReplaySummary {
    pub fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn render_human_readable(&self) -> String {
        format!(
            "envelopes={} dropped={} entity_updates={} tile_updates={} \
entities_drained={} tiles_drained={} chat_events={} sets={} entities={} players={}",
            self.envelopes_applied,
            self.drops.total(),
            self.entity_updates,
            self.tile_updates,
            self.entities_drained,
            self.tiles_drained,
            self.chat_events,
            self.sets,
            self.entities,
            self.players,
        )
    }
}
