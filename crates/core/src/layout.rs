//! Positions generated nodes inside a bounding rectangle.
//!
//! Every path gets a horizontal band; nodes generated together share their band evenly and sit
//! at `distance * width`. Perlin noise keyed by the segment seed then shifts each node by at
//! most the gap to the next slice horizontally and half its share of the band vertically.

use noise::{NoiseFn, Perlin};

use crate::graph::{MapGraph, MapSegment};
use crate::seed::MapRng;
use crate::types::{NodeId, Point, Rect};

const LAYOUT_TARGET: &str = "overworld::layout";
const NOISE_OFFSET_RANGE: u64 = 1_000;

/// Places every visible node of `segment` inside `bounds` and resyncs every connection line.
///
/// Noise is derived from the segment seed, so repeated calls with the same bounds place nodes
/// at the same positions.
pub fn layout_segment(graph: &mut MapGraph, segment: &MapSegment, bounds: Rect) {
    if segment.paths.is_empty() {
        tracing::error!(target: LAYOUT_TARGET, "cannot display a map segment with no paths");
        return;
    }
    tracing::debug!(
        target: LAYOUT_TARGET,
        definition = %segment.definition.name,
        paths = segment.paths.len(),
        x = bounds.x,
        y = bounds.y,
        width = bounds.width,
        height = bounds.height,
        "laying out map segment"
    );

    let mut rng = MapRng::new(segment.seed);
    let offset = Point::new(
        rng.below(NOISE_OFFSET_RANGE) as f32,
        rng.below(NOISE_OFFSET_RANGE) as f32,
    );
    let noise = SegmentNoise {
        perlin: Perlin::new(segment.seed as u32),
        offset,
        scale: segment.definition.noise_scale,
    };

    let path_count = segment.paths.len();
    let vertical_gap = 1.0 / (path_count + 1) as f32;
    let middle = path_count / 2;

    for (i, path) in segment.paths.iter().enumerate() {
        if path.is_empty() {
            continue;
        }
        // Only the middle path draws the shared start and ends.
        let is_middle = i == middle;
        let first = if is_middle { 0 } else { 1 };
        let last =
            if is_middle { path.len() } else { path.len().saturating_sub(segment.ends.len()) };
        if first >= last {
            continue;
        }

        let slices = slices(graph, &path[first..last]);
        for (s, slice) in slices.iter().enumerate() {
            let slice_distance = distance_of(graph, slice[0]);
            let next_distance =
                slices.get(s + 1).map_or(slice_distance, |next| distance_of(graph, next[0]));
            let split_gap = vertical_gap / slice.len() as f32;
            let drift = Point::new(slice_distance - next_distance, split_gap / 2.0);

            for (k, id) in slice.iter().enumerate() {
                let vertical = vertical_gap * (i as f32 + 0.5) + split_gap * k as f32;
                let pinned = is_middle && *id == segment.start;
                let Some(node) = graph.node_mut(*id) else {
                    continue;
                };
                let mut position = Point::new(
                    bounds.x + node.distance * bounds.width,
                    bounds.y + vertical * bounds.height,
                );
                if !pinned {
                    let magnitude = segment.definition.noise_magnitude.evaluate(node.distance)
                        * noise.sample(node.distance, vertical)
                        / (1 + node.bonus) as f32;
                    position.x += magnitude * drift.x * bounds.width;
                    position.y += magnitude * drift.y * bounds.height;
                }
                node.position = position;
            }
        }
    }

    graph.sync_connections();
}

/// Bounds of every segment when the whole map is drawn inside `base`, in segment order.
///
/// Segments are laid out right to left, widths weighted by `display_width`; every segment but
/// the first is shifted right by one step so its start does not overlap the previous ends.
pub fn segment_bounds(segments: &[MapSegment], base: Rect, padding: Point) -> (Rect, Vec<Rect>) {
    let total_width: f32 = segments.iter().map(|segment| segment.definition.display_width).sum();
    let total_height = segments
        .iter()
        .map(|segment| segment.definition.display_height)
        .fold(0.0_f32, f32::max);

    let mut full = base;
    full.width *= total_width;
    full.y += full.height * (total_height - 1.0) / 2.0;
    full.height *= total_height;
    full.x += padding.x;
    full.width -= padding.x * 2.0;
    full.y += padding.y;
    full.height -= padding.y * 2.0;

    let step = if total_width > 0.0 { full.width / total_width } else { 0.0 };
    let mut current_min = full.x_max();
    let mut bounds = vec![Rect::default(); segments.len()];
    for (i, segment) in segments.iter().enumerate().rev() {
        let definition = &segment.definition;
        let x_max = current_min;
        current_min -= step * definition.display_width;
        let mut x_min = current_min;
        if i != 0 {
            x_min += (x_max - x_min) / (2 + definition.max_path_length) as f32;
        }
        let height = full.height * definition.display_height;
        bounds[i] = Rect::new(x_min, full.y, x_max - x_min, height);
    }
    (full, bounds)
}

struct SegmentNoise {
    perlin: Perlin,
    offset: Point,
    scale: f32,
}

impl SegmentNoise {
    /// Coherent noise in [0, 1].
    fn sample(&self, distance: f32, vertical: f32) -> f32 {
        let x = f64::from(self.offset.x + self.scale * distance);
        let y = f64::from(self.offset.y + self.scale * vertical);
        let value = self.perlin.get([x, y]);
        ((value + 1.0) / 2.0).clamp(0.0, 1.0) as f32
    }
}

/// Groups consecutive nodes generated in the same step and branch.
fn slices(graph: &MapGraph, nodes: &[NodeId]) -> Vec<Vec<NodeId>> {
    let mut slices: Vec<Vec<NodeId>> = Vec::new();
    let mut current_key = None;
    for id in nodes {
        let Some(node) = graph.node(*id) else {
            continue;
        };
        let key = (node.index, node.bonus, node.branch);
        match slices.last_mut() {
            Some(slice) if current_key == Some(key) => slice.push(*id),
            _ => slices.push(vec![*id]),
        }
        current_key = Some(key);
    }
    slices
}

fn distance_of(graph: &MapGraph, id: NodeId) -> f32 {
    graph.node(id).map_or(0.0, |node| node.distance)
}
