use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

const MIN_DISTANCE_SQ: f32 = 1.0;

/// Deterministic unit direction for coincident points.
fn separation_direction(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

fn repulsion_between(delta: Vec2, charge: f32, alpha: f32) -> Vec2 {
    let distance_sq = delta.length_sq().max(MIN_DISTANCE_SQ);
    delta * (charge * alpha / distance_sq)
}

pub(super) fn accumulate_repulsion_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    charges: &[f32],
    alpha: f32,
    theta: f32,
    velocity: &mut Vec2,
) {
    if node.charge <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            let mut delta = point - positions[other_index];
            if delta.length_sq() <= 0.000_001 {
                delta = separation_direction(index, other_index);
            }
            *velocity += repulsion_between(delta, charges[other_index], alpha);
        }
        return;
    }

    let delta = point - node.center_of_charge;
    let distance = delta.length_sq().max(0.0001).sqrt();
    let can_approximate =
        !node.bounds.contains(point) && (node.bounds.side_length() / distance) < theta;

    if can_approximate {
        *velocity += repulsion_between(delta, node.charge, alpha);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_repulsion_for_node(child, index, positions, charges, alpha, theta, velocity);
    }
}

#[derive(Clone, Copy)]
pub(super) struct LinkParams {
    pub(super) rest_length: f32,
    pub(super) strength: f32,
    pub(super) alpha: f32,
}

/// Spring along each edge, split between the endpoints by degree so the
/// owner hub barely moves while its leaves do.
pub(super) fn apply_link_springs(
    edges: &[(usize, usize)],
    degrees: &[usize],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    params: LinkParams,
) {
    for &(source, target) in edges {
        if source == target || source >= positions.len() || target >= positions.len() {
            continue;
        }

        let mut delta = (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        if delta.length_sq() <= 0.000_001 {
            delta = separation_direction(source, target) * 0.01;
        }
        let distance = delta.length();
        let stretch = (distance - params.rest_length) / distance * params.alpha * params.strength;
        let correction = delta * stretch;

        let source_degree = degrees[source].max(1) as f32;
        let target_degree = degrees[target].max(1) as f32;
        let bias = source_degree / (source_degree + target_degree);

        velocities[target] -= correction * bias;
        velocities[source] += correction * (1.0 - bias);
    }
}
