pub mod feed;
mod fields;
pub mod model;
pub mod players;

pub use feed::classify::{
    classify_batch, ChatEvent, ChatSource, ClassifiedBatch, DropCounts, DropReason, EntityUpdate,
    SetDelta, TileUpdate,
};
pub use feed::queue::PendingQueues;
pub use feed::reconcile::{apply_deltas, ApplyStats};
pub use feed::session::{
    AppliedBatch, BatchOutcome, FeedError, PollSession, UpdateEnvelope,
};
pub use feed::watermark::Watermark;
pub use model::{
    Area, Circle, EntityKind, FillStyle, Line, LineStyle, Marker, MarkerSet, SetScalars,
    WorldModel, DEFAULT_LINE_COLOR, DEFAULT_LINE_WEIGHT, DEFAULT_MARKER_ICON, DEFAULT_OPACITY,
};
pub use players::{
    snapshot_from_value, Player, PlayerLocation, PlayerRegistry, PlayerSnapshot, MERGE_CHUNK_SIZE,
};
