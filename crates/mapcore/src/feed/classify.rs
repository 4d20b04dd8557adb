use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::fields::{bool_field, f64_field, f64_list, i64_field, owned_str, str_field, zoom_field};
use crate::model::{
    Area, Circle, FillStyle, Line, LineStyle, Marker, SetScalars, DEFAULT_LINE_COLOR,
    DEFAULT_LINE_WEIGHT, DEFAULT_MARKER_ICON, DEFAULT_OPACITY,
};

use super::watermark::Watermark;

const MARKER_COMPONENT_CTYPE: &str = "markers";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Stale,
    NoSet,
    NoId,
    UnknownType,
    UnknownCType,
    Incomplete,
    NotImplemented,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub stale: u32,
    pub no_set: u32,
    pub no_id: u32,
    pub unknown_type: u32,
    pub unknown_ctype: u32,
    pub incomplete: u32,
    pub not_implemented: u32,
}

impl DropCounts {
    pub fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::Stale => self.stale = self.stale.saturating_add(1),
            DropReason::NoSet => self.no_set = self.no_set.saturating_add(1),
            DropReason::NoId => self.no_id = self.no_id.saturating_add(1),
            DropReason::UnknownType => self.unknown_type = self.unknown_type.saturating_add(1),
            DropReason::UnknownCType => self.unknown_ctype = self.unknown_ctype.saturating_add(1),
            DropReason::Incomplete => self.incomplete = self.incomplete.saturating_add(1),
            DropReason::NotImplemented => {
                self.not_implemented = self.not_implemented.saturating_add(1)
            }
        }
    }

    pub fn merge(&mut self, other: DropCounts) {
        self.stale = self.stale.saturating_add(other.stale);
        self.no_set = self.no_set.saturating_add(other.no_set);
        self.no_id = self.no_id.saturating_add(other.no_id);
        self.unknown_type = self.unknown_type.saturating_add(other.unknown_type);
        self.unknown_ctype = self.unknown_ctype.saturating_add(other.unknown_ctype);
        self.incomplete = self.incomplete.saturating_add(other.incomplete);
        self.not_implemented = self.not_implemented.saturating_add(other.not_implemented);
    }

    pub fn total(&self) -> u32 {
        self.stale
            .saturating_add(self.no_set)
            .saturating_add(self.no_id)
            .saturating_add(self.unknown_type)
            .saturating_add(self.unknown_ctype)
            .saturating_add(self.incomplete)
            .saturating_add(self.not_implemented)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityUpdate<T> {
    pub id: String,
    pub removed: bool,
    pub payload: Option<T>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetDelta {
    pub scalars: Option<SetScalars>,
    pub removed: bool,
    pub markers: Vec<EntityUpdate<Marker>>,
    pub areas: Vec<EntityUpdate<Area>>,
    pub circles: Vec<EntityUpdate<Circle>>,
    pub lines: Vec<EntityUpdate<Line>>,
}

impl SetDelta {
    pub fn entity_update_count(&self) -> usize {
        self.markers.len() + self.areas.len() + self.circles.len() + self.lines.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatSource {
    Player,
    Web,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Chat {
        source: ChatSource,
        account: Option<String>,
        name: Option<String>,
        channel: Option<String>,
        message: String,
        timestamp: i64,
    },
    Join {
        account: String,
        name: Option<String>,
        timestamp: i64,
    },
    Leave {
        account: String,
        name: Option<String>,
        timestamp: i64,
    },
}

impl ChatEvent {
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Chat { timestamp, .. }
            | Self::Join { timestamp, .. }
            | Self::Leave { timestamp, .. } => *timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileUpdate {
    pub name: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedBatch {
    pub sets: BTreeMap<String, SetDelta>,
    pub tiles: Vec<TileUpdate>,
    pub chat: Vec<ChatEvent>,
    pub drops: DropCounts,
}

pub fn classify_batch(records: &[Value], watermark: Watermark) -> ClassifiedBatch {
    let mut batch = ClassifiedBatch::default();
    for record in records {
        if let Some(reason) = classify_record(record, watermark, &mut batch) {
            batch.drops.record(reason);
        }
    }
    // Stable sort keeps arrival order for equal timestamps.
    batch.chat.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    batch
}

fn classify_record(
    record: &Value,
    watermark: Watermark,
    batch: &mut ClassifiedBatch,
) -> Option<DropReason> {
    match str_field(record, "type") {
        Some("component") => classify_component(record, watermark, batch),
        Some("chat") => classify_chat(record, watermark, batch),
        Some("playerjoin") => classify_presence(record, watermark, batch, true),
        Some("playerquit") => classify_presence(record, watermark, batch, false),
        Some("tile") => classify_tile(record, watermark, batch),
        _ => Some(DropReason::UnknownType),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComponentKind {
    Set,
    Marker,
    Area,
    Circle,
    Line,
}

fn parse_component_msg(msg: &str) -> Option<(ComponentKind, bool)> {
    let kind = if msg.starts_with("set") {
        ComponentKind::Set
    } else if msg.starts_with("marker") {
        ComponentKind::Marker
    } else if msg.starts_with("area") {
        ComponentKind::Area
    } else if msg.starts_with("circle") {
        ComponentKind::Circle
    } else if msg.starts_with("line") {
        ComponentKind::Line
    } else {
        return None;
    };
    Some((kind, msg.ends_with("deleted")))
}

fn classify_component(
    record: &Value,
    watermark: Watermark,
    batch: &mut ClassifiedBatch,
) -> Option<DropReason> {
    let id = match str_field(record, "id") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Some(DropReason::NoId),
    };
    let timestamp = i64_field(record, "timestamp").unwrap_or(0);
    if !watermark.accepts(timestamp) {
        return Some(DropReason::Stale);
    }
    let msg = str_field(record, "msg").unwrap_or("");
    let (kind, removed) = match parse_component_msg(msg) {
        Some(parsed) => parsed,
        None => return Some(DropReason::UnknownType),
    };
    let set_id = match kind {
        ComponentKind::Set => id.clone(),
        _ => match str_field(record, "set") {
            Some(owner) if !owner.is_empty() => owner.to_string(),
            _ => return Some(DropReason::NoSet),
        },
    };
    if str_field(record, "ctype") != Some(MARKER_COMPONENT_CTYPE) {
        return Some(DropReason::UnknownCType);
    }

    let delta = batch.sets.entry(set_id).or_default();
    match kind {
        ComponentKind::Set => {
            if removed {
                delta.removed = true;
                delta.scalars = None;
            } else {
                // An upsert without a label carries no usable payload; the
                // reconciler decides whether that is an anomaly.
                if let Some(scalars) = decode_set_scalars(record) {
                    delta.scalars = Some(scalars);
                }
                delta.removed = false;
            }
        }
        ComponentKind::Marker => delta.markers.push(EntityUpdate {
            payload: (!removed).then(|| decode_marker(record)),
            id,
            removed,
        }),
        ComponentKind::Area => delta.areas.push(EntityUpdate {
            payload: (!removed).then(|| decode_area(record)),
            id,
            removed,
        }),
        ComponentKind::Circle => delta.circles.push(EntityUpdate {
            payload: (!removed).then(|| decode_circle(record)),
            id,
            removed,
        }),
        ComponentKind::Line => delta.lines.push(EntityUpdate {
            payload: (!removed).then(|| decode_line(record)),
            id,
            removed,
        }),
    }
    None
}

fn classify_chat(
    record: &Value,
    watermark: Watermark,
    batch: &mut ClassifiedBatch,
) -> Option<DropReason> {
    let message = match owned_str(record, "message") {
        Some(message) => message,
        None => return Some(DropReason::Incomplete),
    };
    let timestamp = match i64_field(record, "timestamp") {
        Some(timestamp) => timestamp,
        None => return Some(DropReason::Incomplete),
    };
    if !watermark.accepts(timestamp) {
        return Some(DropReason::Stale);
    }
    let source = match str_field(record, "source") {
        Some("player") => ChatSource::Player,
        Some("web") => ChatSource::Web,
        _ => return Some(DropReason::NotImplemented),
    };
    batch.chat.push(ChatEvent::Chat {
        source,
        account: owned_str(record, "account"),
        name: owned_str(record, "playerName"),
        channel: owned_str(record, "channel"),
        message,
        timestamp,
    });
    None
}

fn classify_presence(
    record: &Value,
    watermark: Watermark,
    batch: &mut ClassifiedBatch,
    joined: bool,
) -> Option<DropReason> {
    let account = match owned_str(record, "account") {
        Some(account) => account,
        None => return Some(DropReason::Incomplete),
    };
    let timestamp = match i64_field(record, "timestamp") {
        Some(timestamp) => timestamp,
        None => return Some(DropReason::Incomplete),
    };
    if !watermark.accepts(timestamp) {
        return Some(DropReason::Stale);
    }
    let name = owned_str(record, "playerName");
    batch.chat.push(if joined {
        ChatEvent::Join {
            account,
            name,
            timestamp,
        }
    } else {
        ChatEvent::Leave {
            account,
            name,
            timestamp,
        }
    });
    None
}

fn classify_tile(
    record: &Value,
    watermark: Watermark,
    batch: &mut ClassifiedBatch,
) -> Option<DropReason> {
    let name = match owned_str(record, "name") {
        Some(name) => name,
        None => return Some(DropReason::Incomplete),
    };
    let timestamp = match i64_field(record, "timestamp") {
        Some(timestamp) => timestamp,
        None => return Some(DropReason::Incomplete),
    };
    if !watermark.accepts(timestamp) {
        return Some(DropReason::Stale);
    }
    batch.tiles.push(TileUpdate { name, timestamp });
    None
}

fn decode_set_scalars(record: &Value) -> Option<SetScalars> {
    let label = owned_str(record, "label")?;
    Some(SetScalars {
        label,
        hidden: bool_field(record, "hide").unwrap_or(false),
        priority: i64_field(record, "priority").unwrap_or(0) as i32,
        show_labels: bool_field(record, "showlabels"),
        min_zoom: zoom_field(record, "minzoom"),
        max_zoom: zoom_field(record, "maxzoom"),
    })
}

fn decode_line_style(record: &Value) -> LineStyle {
    LineStyle {
        color: owned_str(record, "color").unwrap_or_else(|| DEFAULT_LINE_COLOR.to_string()),
        opacity: f64_field(record, "opacity").unwrap_or(DEFAULT_OPACITY),
        weight: i64_field(record, "weight").unwrap_or(DEFAULT_LINE_WEIGHT as i64) as u32,
    }
}

fn decode_fill_style(record: &Value) -> FillStyle {
    FillStyle {
        color: owned_str(record, "fillcolor").unwrap_or_else(|| DEFAULT_LINE_COLOR.to_string()),
        opacity: f64_field(record, "fillopacity").unwrap_or(DEFAULT_OPACITY),
    }
}

fn decode_marker(record: &Value) -> Marker {
    Marker {
        label: owned_str(record, "label").unwrap_or_default(),
        icon: owned_str(record, "icon").unwrap_or_else(|| DEFAULT_MARKER_ICON.to_string()),
        x: f64_field(record, "x").unwrap_or(0.0),
        y: f64_field(record, "y").unwrap_or(0.0),
        z: f64_field(record, "z").unwrap_or(0.0),
        popup: owned_str(record, "desc"),
        min_zoom: zoom_field(record, "minzoom"),
        max_zoom: zoom_field(record, "maxzoom"),
    }
}

fn decode_area(record: &Value) -> Area {
    Area {
        label: owned_str(record, "label").unwrap_or_default(),
        x: f64_list(record, "x"),
        z: f64_list(record, "z"),
        y_top: f64_field(record, "ytop").unwrap_or(0.0),
        y_bottom: f64_field(record, "ybottom").unwrap_or(0.0),
        line: decode_line_style(record),
        fill: decode_fill_style(record),
        popup: owned_str(record, "desc"),
        min_zoom: zoom_field(record, "minzoom"),
        max_zoom: zoom_field(record, "maxzoom"),
    }
}

fn decode_circle(record: &Value) -> Circle {
    Circle {
        label: owned_str(record, "label").unwrap_or_default(),
        x: f64_field(record, "x").unwrap_or(0.0),
        y: f64_field(record, "y").unwrap_or(0.0),
        z: f64_field(record, "z").unwrap_or(0.0),
        x_radius: f64_field(record, "xr").unwrap_or(0.0),
        z_radius: f64_field(record, "zr").unwrap_or(0.0),
        line: decode_line_style(record),
        fill: decode_fill_style(record),
        popup: owned_str(record, "desc"),
        min_zoom: zoom_field(record, "minzoom"),
        max_zoom: zoom_field(record, "maxzoom"),
    }
}

fn decode_line(record: &Value) -> Line {
    Line {
        label: owned_str(record, "label").unwrap_or_default(),
        x: f64_list(record, "x"),
        y: f64_list(record, "y"),
        z: f64_list(record, "z"),
        line: decode_line_style(record),
        popup: owned_str(record, "desc"),
        min_zoom: zoom_field(record, "minzoom"),
        max_zoom: zoom_field(record, "maxzoom"),
    }
}
