use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::network::Node;

pub const MARGIN_TOP: f32 = 60.0;
pub const MARGIN_BOTTOM: f32 = 60.0;
pub const TIMELINE_MAX_SPACING: f32 = 90.0;
pub const CLUSTER_NODE_WIDTH: f32 = 28.0;
pub const CLUSTER_MAX_WIDTH_FRACTION: f32 = 0.7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Timeline,
    Clustered,
    Organic,
}

impl LayoutMode {
    pub const ALL: [Self; 3] = [Self::Timeline, Self::Clustered, Self::Organic];

    pub fn label(self) -> &'static str {
        match self {
            Self::Timeline => "Timeline",
            Self::Clustered => "Clustered by year",
            Self::Organic => "Organic",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeline => "timeline",
            Self::Clustered => "clustered",
            Self::Organic => "organic",
        };
        f.write_str(name)
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "timeline" => Ok(Self::Timeline),
            "clustered" | "cluster" => Ok(Self::Clustered),
            "organic" => Ok(Self::Organic),
            other => Err(format!(
                "unknown layout `{other}` (expected timeline, clustered or organic)"
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    pub fn center_x(self) -> f32 {
        self.width * 0.5
    }

    pub fn center_y(self) -> f32 {
        self.height * 0.5
    }
}

/// Per-axis kinematic override. `None` leaves the axis to the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pin {
    pub fx: Option<f32>,
    pub fy: Option<f32>,
}

impl Pin {
    pub const FREE: Self = Self { fx: None, fy: None };

    pub fn at(x: f32, y: f32) -> Self {
        Self {
            fx: Some(x),
            fy: Some(y),
        }
    }

    pub fn vertical(y: f32) -> Self {
        Self { fx: None, fy: Some(y) }
    }
}

/// Maps connection dates onto the usable vertical band of the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeScale {
    min: i64,
    max: i64,
    top: f32,
    bottom: f32,
}

impl TimeScale {
    pub fn from_nodes(nodes: &[Node], viewport: Viewport) -> Self {
        let mut min = i64::MAX;
        let mut max = i64::MIN;
        for node in nodes.iter().filter(|node| !node.is_owner()) {
            let stamp = node.connected.timestamp();
            min = min.min(stamp);
            max = max.max(stamp);
        }
        if min > max {
            min = 0;
            max = 0;
        }

        let top = MARGIN_TOP.min(viewport.height * 0.5);
        let bottom = (viewport.height - MARGIN_BOTTOM).max(top);
        Self {
            min,
            max,
            top,
            bottom,
        }
    }

    pub fn map(&self, date: DateTime<Utc>) -> f32 {
        if self.max <= self.min {
            return (self.top + self.bottom) * 0.5;
        }
        let fraction = (date.timestamp() - self.min) as f64 / (self.max - self.min) as f64;
        self.top + (self.bottom - self.top) * fraction.clamp(0.0, 1.0) as f32
    }
}

/// Groups non-owner node indices by calendar year, each group sorted by date.
fn year_groups(nodes: &[Node]) -> BTreeMap<i32, Vec<usize>> {
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (index, node) in nodes.iter().enumerate() {
        if node.is_owner() {
            continue;
        }
        groups.entry(node.year()).or_default().push(index);
    }
    for members in groups.values_mut() {
        members.sort_by_key(|&index| (nodes[index].connected, index));
    }
    groups
}

fn timeline(nodes: &[Node], viewport: Viewport, scale: &TimeScale, pins: &mut [Pin]) {
    for members in year_groups(nodes).values() {
        let count = members.len() as f32;
        let spacing = (viewport.width / (count + 1.0)).min(TIMELINE_MAX_SPACING);
        let start = viewport.center_x() - (count - 1.0) * spacing * 0.5;
        for (slot, &index) in members.iter().enumerate() {
            pins[index] = Pin::at(start + slot as f32 * spacing, scale.map(nodes[index].connected));
        }
    }
}

fn clustered(nodes: &[Node], viewport: Viewport, scale: &TimeScale, pins: &mut [Pin]) {
    for members in year_groups(nodes).values() {
        if members.is_empty() {
            continue;
        }
        let count = members.len() as f32;
        let anchor = members
            .iter()
            .map(|&index| scale.map(nodes[index].connected))
            .sum::<f32>()
            / count;
        let width = (viewport.width * CLUSTER_MAX_WIDTH_FRACTION).min(count * CLUSTER_NODE_WIDTH);
        let left = viewport.center_x() - width * 0.5;
        let step = width / count;
        for (slot, &index) in members.iter().enumerate() {
            pins[index] = Pin::at(left + (slot as f32 + 0.5) * step, anchor);
        }
    }
}

fn organic(nodes: &[Node], scale: &TimeScale, pins: &mut [Pin]) {
    for (pin, node) in pins.iter_mut().zip(nodes) {
        if !node.is_owner() {
            *pin = Pin::vertical(scale.map(node.connected));
        }
    }
}

/// Computes the pin for every node of `nodes`, index-aligned. Axes a mode
/// does not set come back as free, never as a leftover from another mode.
pub fn apply_layout(mode: LayoutMode, nodes: &[Node], viewport: Viewport) -> Vec<Pin> {
    let mut pins = vec![Pin::FREE; nodes.len()];
    let scale = TimeScale::from_nodes(nodes, viewport);

    match mode {
        LayoutMode::Timeline => timeline(nodes, viewport, &scale, &mut pins),
        LayoutMode::Clustered => clustered(nodes, viewport, &scale, &mut pins),
        LayoutMode::Organic => organic(nodes, &scale, &mut pins),
    }

    for (pin, node) in pins.iter_mut().zip(nodes) {
        if node.is_owner() {
            *pin = Pin::at(viewport.center_x(), viewport.center_y());
        }
    }

    pins
}
