//! Damped force relaxation over the working view.
//!
//! Each [`Simulation::step`] is one short integration step; the caller
//! schedules steps (one per frame in the UI) and reads positions in between.
//! Pinned axes are kinematic: the node sits exactly on the pin with zero
//! velocity along that axis.

mod forces;
mod quadtree;

use eframe::egui::{Vec2, vec2};
use serde::{Deserialize, Serialize};

use crate::util::stable_pair;
use crate::view::{Pin, Viewport, WorkingView};
use forces::{LinkParams, accumulate_repulsion_for_node, apply_link_springs};
use quadtree::QuadNode;

const BARNES_HUT_THETA: f32 = 0.9;
const ALPHA_MIN: f32 = 0.001;
const REHEAT_ALPHA: f32 = 1.0;
const DRAG_ALPHA_TARGET: f32 = 0.3;
const SEED_JITTER: f32 = 80.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub link_distance: f32,
    pub link_strength: f32,
    pub owner_charge: f32,
    pub node_charge: f32,
    pub x_strength: f32,
    pub y_strength: f32,
    pub target_strength: f32,
    pub velocity_decay: f32,
    pub max_speed: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            link_distance: 110.0,
            link_strength: 0.35,
            owner_charge: 1400.0,
            node_charge: 160.0,
            x_strength: 0.04,
            y_strength: 0.12,
            target_strength: 0.6,
            velocity_decay: 0.4,
            max_speed: 40.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SimNode {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Kinematic override for this step.
    pub pin: Pin,
    /// Where the active layout wants this node; free axes spring toward it.
    pub target: Pin,
    charge: f32,
}

pub struct Simulation {
    nodes: Vec<SimNode>,
    edges: Vec<(usize, usize)>,
    degrees: Vec<usize>,
    config: PhysicsConfig,
    center: Vec2,
    alpha: f32,
    alpha_target: f32,
    alpha_decay: f32,
    scratch: Scratch,
}

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    charges: Vec<f32>,
    velocities: Vec<Vec2>,
}

impl Simulation {
    /// Builds fresh per-node state for `view`. No position or velocity from a
    /// previous population is consulted.
    pub fn new(view: &WorkingView, pins: &[Pin], viewport: Viewport, config: PhysicsConfig) -> Self {
        let center = vec2(viewport.center_x(), viewport.center_y());
        let nodes = view
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let pin = pins.get(index).copied().unwrap_or_default();
                let (jx, jy) = stable_pair(&node.id);
                let position = vec2(
                    pin.fx.unwrap_or(center.x + jx * SEED_JITTER),
                    pin.fy.unwrap_or(center.y + jy * SEED_JITTER),
                );
                SimNode {
                    position,
                    velocity: Vec2::ZERO,
                    pin,
                    target: pin,
                    charge: if node.is_owner() {
                        config.owner_charge
                    } else {
                        config.node_charge
                    },
                }
            })
            .collect::<Vec<_>>();

        let edges = view
            .edges
            .iter()
            .map(|edge| (edge.source, edge.target))
            .collect::<Vec<_>>();
        let mut degrees = vec![0usize; nodes.len()];
        for &(source, target) in &edges {
            if source < degrees.len() && target < degrees.len() {
                degrees[source] += 1;
                degrees[target] += 1;
            }
        }

        Self {
            nodes,
            edges,
            degrees,
            config,
            center,
            alpha: REHEAT_ALPHA,
            alpha_target: 0.0,
            alpha_decay: 1.0 - ALPHA_MIN.powf(1.0 / 300.0),
            scratch: Scratch::default(),
        }
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_active(&self) -> bool {
        self.alpha >= ALPHA_MIN || self.alpha_target >= ALPHA_MIN
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.nodes.iter().map(|node| node.position).collect()
    }

    pub fn reheat(&mut self) {
        self.alpha = REHEAT_ALPHA;
    }

    /// Swaps tuning in place; positions and pins survive.
    pub fn set_config(&mut self, config: PhysicsConfig) {
        self.config = config;
        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.charge = if index == WorkingView::OWNER_INDEX {
                config.owner_charge
            } else {
                config.node_charge
            };
        }
        self.reheat();
    }

    /// Replaces layout targets and pins for an unchanged population.
    pub fn relayout(&mut self, pins: &[Pin], viewport: Viewport) {
        self.center = vec2(viewport.center_x(), viewport.center_y());
        for (index, pin) in pins.iter().enumerate().take(self.nodes.len()) {
            self.nodes[index].target = *pin;
            self.set_pin(index, *pin);
        }
        self.reheat();
    }

    pub fn set_pin(&mut self, index: usize, pin: Pin) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.pin = pin;
            if let Some(x) = pin.fx {
                node.position.x = x;
                node.velocity.x = 0.0;
            }
            if let Some(y) = pin.fy {
                node.position.y = y;
                node.velocity.y = 0.0;
            }
        }
    }

    pub fn begin_interaction(&mut self) {
        self.alpha_target = DRAG_ALPHA_TARGET;
        self.alpha = self.alpha.max(DRAG_ALPHA_TARGET);
    }

    pub fn end_interaction(&mut self) {
        self.alpha_target = 0.0;
    }

    /// Runs one integration step. Returns `false` once the system has cooled
    /// and the step was skipped.
    pub fn step(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        let alpha = self.alpha;
        let node_count = self.nodes.len();

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.charges.clear();
        scratch.velocities.clear();
        for node in &self.nodes {
            scratch.positions.push(node.position);
            scratch.charges.push(node.charge);
            scratch.velocities.push(node.velocity);
        }

        apply_link_springs(
            &self.edges,
            &self.degrees,
            &scratch.positions,
            &mut scratch.velocities,
            LinkParams {
                rest_length: self.config.link_distance,
                strength: self.config.link_strength,
                alpha,
            },
        );

        if node_count > 1
            && let Some(tree) = QuadNode::build(&scratch.positions, &scratch.charges)
        {
            for (index, velocity) in scratch.velocities.iter_mut().enumerate() {
                accumulate_repulsion_for_node(
                    &tree,
                    index,
                    &scratch.positions,
                    &scratch.charges,
                    alpha,
                    BARNES_HUT_THETA,
                    velocity,
                );
            }
        }

        let config = self.config;
        let center = self.center;
        let max_speed_sq = config.max_speed * config.max_speed;
        for (node, velocity) in self.nodes.iter_mut().zip(&scratch.velocities) {
            let mut velocity = *velocity;

            if node.pin.fx.is_none() {
                let (anchor, strength) = match node.target.fx {
                    Some(x) => (x, config.target_strength),
                    None => (center.x, config.x_strength),
                };
                velocity.x += (anchor - node.position.x) * strength * alpha;
            }
            if node.pin.fy.is_none() {
                let (anchor, strength) = match node.target.fy {
                    Some(y) => (y, config.target_strength),
                    None => (center.y, config.y_strength),
                };
                velocity.y += (anchor - node.position.y) * strength * alpha;
            }

            velocity *= 1.0 - config.velocity_decay;
            let speed_sq = velocity.length_sq();
            if speed_sq > max_speed_sq {
                velocity *= config.max_speed / speed_sq.sqrt();
            }

            node.velocity = velocity;
            node.position += velocity;

            if let Some(x) = node.pin.fx {
                node.position.x = x;
                node.velocity.x = 0.0;
            }
            if let Some(y) = node.pin.fy {
                node.position.y = y;
                node.velocity.y = 0.0;
            }
        }

        true
    }
}
