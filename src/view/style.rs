use eframe::egui::{Color32, Stroke};

use crate::ai::MatchMap;
use crate::network::Node;

pub const OWNER_RADIUS: f32 = 22.0;
pub const MIN_RADIUS: f32 = 5.0;
pub const MAX_RADIUS: f32 = 14.0;
pub const MATCH_BONUS: f32 = 4.0;
const MATCH_SCORE_RANGE: f32 = 6.0;

pub const OWNER_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
pub const MATCH_COLOR: Color32 = Color32::from_rgb(79, 209, 197);
const SELECTED_STROKE: Color32 = Color32::WHITE;
const MATCH_STROKE: Color32 = Color32::from_rgb(178, 245, 234);
const DEFAULT_STROKE: Color32 = Color32::from_rgba_premultiplied(15, 15, 15, 190);

const YEAR_SATURATION: f32 = 0.65;
const YEAR_LIGHTNESS: f32 = 0.58;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeStyle {
    pub radius: f32,
    pub fill: Color32,
    pub match_score: Option<f32>,
}

impl NodeStyle {
    pub fn is_matched(&self) -> bool {
        self.match_score.is_some()
    }

    /// Selection always wins over match styling; the fill is left alone so a
    /// selected match keeps its match color.
    pub fn stroke(&self, selected: bool) -> Stroke {
        if selected {
            Stroke::new(3.0, SELECTED_STROKE)
        } else if self.is_matched() {
            Stroke::new(1.8, MATCH_STROKE)
        } else {
            Stroke::new(1.0, DEFAULT_STROKE)
        }
    }
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = (hue.rem_euclid(360.0)) / 60.0;
    let second = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, second, 0.0),
        1 => (second, chroma, 0.0),
        2 => (0.0, chroma, second),
        3 => (0.0, second, chroma),
        4 => (second, 0.0, chroma),
        _ => (chroma, 0.0, second),
    };
    let offset = lightness - chroma * 0.5;
    let channel = |value: f32| ((value + offset).clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgb(channel(r), channel(g), channel(b))
}

pub fn year_color(year: i32) -> Color32 {
    let hue = year.rem_euclid(10) as f32 * 36.0;
    hsl_to_rgb(hue, YEAR_SATURATION, YEAR_LIGHTNESS)
}

/// Linear in the recency fraction; a single distinct date sits at the midpoint.
pub fn recency_radius(stamp: i64, min: i64, max: i64) -> f32 {
    if max <= min {
        return (MIN_RADIUS + MAX_RADIUS) * 0.5;
    }
    let fraction = ((stamp - min) as f64 / (max - min) as f64).clamp(0.0, 1.0) as f32;
    MIN_RADIUS + fraction * (MAX_RADIUS - MIN_RADIUS)
}

pub fn match_radius(score: f32) -> f32 {
    MAX_RADIUS + MATCH_BONUS + (score.clamp(0.0, 100.0) / 100.0) * MATCH_SCORE_RANGE
}

/// One pass over the working view; the result is cached by the session and
/// dropped together with the view it was computed for.
pub fn derive_styles(nodes: &[Node], matches: Option<&MatchMap>) -> Vec<NodeStyle> {
    let (min, max) = nodes
        .iter()
        .filter(|node| !node.is_owner())
        .map(|node| node.connected.timestamp())
        .fold((i64::MAX, i64::MIN), |(min, max), stamp| {
            (min.min(stamp), max.max(stamp))
        });

    nodes
        .iter()
        .map(|node| {
            if node.is_owner() {
                return NodeStyle {
                    radius: OWNER_RADIUS,
                    fill: OWNER_COLOR,
                    match_score: None,
                };
            }

            match matches.and_then(|map| map.get(&node.id)) {
                Some(entry) => NodeStyle {
                    radius: match_radius(entry.score),
                    fill: MATCH_COLOR,
                    match_score: Some(entry.score),
                },
                None => NodeStyle {
                    radius: recency_radius(node.connected.timestamp(), min, max),
                    fill: year_color(node.year()),
                    match_score: None,
                },
            }
        })
        .collect()
}
