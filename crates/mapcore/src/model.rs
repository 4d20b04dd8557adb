use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_LINE_COLOR: &str = "#ff0000";
pub const DEFAULT_OPACITY: f64 = 1.0;
pub const DEFAULT_LINE_WEIGHT: u32 = 3;
pub const DEFAULT_MARKER_ICON: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Marker,
    Area,
    Circle,
    Line,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Marker,
        EntityKind::Area,
        EntityKind::Circle,
        EntityKind::Line,
    ];

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Area => "area",
            Self::Circle => "circle",
            Self::Line => "line",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: String,
    pub opacity: f64,
    pub weight: u32,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_LINE_COLOR.to_string(),
            opacity: DEFAULT_OPACITY,
            weight: DEFAULT_LINE_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillStyle {
    pub color: String,
    pub opacity: f64,
}

impl Default for FillStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_LINE_COLOR.to_string(),
            opacity: DEFAULT_OPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub label: String,
    pub icon: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub popup: Option<String>,
    pub min_zoom: Option<i32>,
    pub max_zoom: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub label: String,
    pub x: Vec<f64>,
    pub z: Vec<f64>,
    pub y_top: f64,
    pub y_bottom: f64,
    pub line: LineStyle,
    pub fill: FillStyle,
    pub popup: Option<String>,
    pub min_zoom: Option<i32>,
    pub max_zoom: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub x_radius: f64,
    pub z_radius: f64,
    pub line: LineStyle,
    pub fill: FillStyle,
    pub popup: Option<String>,
    pub min_zoom: Option<i32>,
    pub max_zoom: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub line: LineStyle,
    pub popup: Option<String>,
    pub min_zoom: Option<i32>,
    pub max_zoom: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetScalars {
    pub label: String,
    pub hidden: bool,
    pub priority: i32,
    pub show_labels: Option<bool>,
    pub min_zoom: Option<i32>,
    pub max_zoom: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSet {
    pub label: String,
    pub hidden: bool,
    pub priority: i32,
    pub show_labels: Option<bool>,
    pub min_zoom: Option<i32>,
    pub max_zoom: Option<i32>,
    pub markers: BTreeMap<String, Marker>,
    pub areas: BTreeMap<String, Area>,
    pub circles: BTreeMap<String, Circle>,
    pub lines: BTreeMap<String, Line>,
}

impl MarkerSet {
    pub fn from_scalars(scalars: SetScalars) -> Self {
        Self {
            label: scalars.label,
            hidden: scalars.hidden,
            priority: scalars.priority,
            show_labels: scalars.show_labels,
            min_zoom: scalars.min_zoom,
            max_zoom: scalars.max_zoom,
            markers: BTreeMap::new(),
            areas: BTreeMap::new(),
            circles: BTreeMap::new(),
            lines: BTreeMap::new(),
        }
    }

    pub fn apply_scalars(&mut self, scalars: SetScalars) {
        self.label = scalars.label;
        self.hidden = scalars.hidden;
        self.priority = scalars.priority;
        self.show_labels = scalars.show_labels;
        self.min_zoom = scalars.min_zoom;
        self.max_zoom = scalars.max_zoom;
    }

    pub fn entity_count(&self) -> usize {
        self.markers.len() + self.areas.len() + self.circles.len() + self.lines.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldModel {
    pub sets: BTreeMap<String, MarkerSet>,
}

impl WorldModel {
    pub fn set(&self, set_id: &str) -> Option<&MarkerSet> {
        self.sets.get(set_id)
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn entity_count(&self) -> usize {
        self.sets.values().map(MarkerSet::entity_count).sum()
    }
}
