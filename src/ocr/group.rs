//! Groups positioned text blocks into formatted report lines.
//!
//! Recognition returns word fragments with noisy, unaligned bounding boxes.
//! Blocks are clustered into lines by vertical proximity, ordered
//! left-to-right within each line, and serialized with a space only where a
//! genuine column gap exists, so tokens the recognizer fragmented are joined
//! back together.

use super::engine::TextBlock;

/// Vertical distance (px) within which a block joins an existing line.
pub const DEFAULT_Y_TOLERANCE: f32 = 7.0;

/// Horizontal gap (px) above which consecutive blocks get a separating space.
pub const DEFAULT_GAP_THRESHOLD: f32 = 10.0;

/// A block reduced to the geometry the grouper needs.
#[derive(Debug, Clone)]
struct BlockSpan {
    y_center: f32,
    x_start: f32,
    x_end: f32,
    text: String,
}

/// One line under construction: a running-mean key plus its members.
#[derive(Debug)]
struct LineBucket {
    key: f32,
    members: Vec<BlockSpan>,
}

impl LineBucket {
    /// Adds a member and recomputes the key as the mean of all member centers.
    fn merge(&mut self, span: BlockSpan) {
        self.members.push(span);
        let sum: f32 = self.members.iter().map(|m| m.y_center).sum();
        self.key = sum / self.members.len() as f32;
    }
}

/// Reduces a block to its vertical center and horizontal extent.
///
/// Returns `None` for malformed boxes (not exactly 4 points, or non-finite
/// coordinates); the caller skips those with a warning.
fn span_of(block: &TextBlock) -> Option<BlockSpan> {
    if block.box_points.len() != 4 {
        return None;
    }
    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for &(x, y) in &block.box_points {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    Some(BlockSpan {
        y_center: (min_y + max_y) / 2.0,
        x_start: min_x,
        x_end: max_x,
        text: block.text.clone(),
    })
}

/// Clusters text blocks into lines and serializes each line top-to-bottom.
///
/// Grouping is independent of input order: spans are sorted by position
/// before bucketing, so the same block set always yields the same lines.
/// Blocks with malformed boxes are skipped with a warning, never fatal.
/// An empty input yields an empty output.
pub fn group_lines(blocks: &[TextBlock], y_tolerance: f32, gap_threshold: f32) -> Vec<String> {
    let mut spans: Vec<BlockSpan> = Vec::with_capacity(blocks.len());
    for block in blocks {
        match span_of(block) {
            Some(span) => spans.push(span),
            None => {
                log::warn!(
                    "Skipping block with malformed bounding box ({} points): {:?}",
                    block.box_points.len(),
                    block.text
                );
            }
        }
    }

    // Fixed processing order makes the clustering deterministic regardless
    // of how the recognizer happened to order its output.
    spans.sort_by(|a, b| {
        a.y_center
            .total_cmp(&b.y_center)
            .then(a.x_start.total_cmp(&b.x_start))
    });

    let mut buckets: Vec<LineBucket> = Vec::new();
    for span in spans {
        let nearest = buckets
            .iter_mut()
            .map(|b| ((b.key - span.y_center).abs(), b))
            .filter(|(dist, _)| *dist <= y_tolerance)
            .min_by(|(d1, _), (d2, _)| d1.total_cmp(d2));
        match nearest {
            Some((_, bucket)) => bucket.merge(span),
            None => buckets.push(LineBucket {
                key: span.y_center,
                members: vec![span],
            }),
        }
    }

    buckets.sort_by(|a, b| a.key.total_cmp(&b.key));

    buckets
        .iter_mut()
        .map(|bucket| {
            bucket
                .members
                .sort_by(|a, b| a.x_start.total_cmp(&b.x_start));
            serialize_line(&bucket.members, gap_threshold)
        })
        .collect()
}

/// Joins line members left-to-right, inserting a space only across real
/// column gaps so accidentally split tokens stay joined.
fn serialize_line(members: &[BlockSpan], gap_threshold: f32) -> String {
    let mut line = String::new();
    let mut prev_x_end: Option<f32> = None;
    for member in members {
        if let Some(end) = prev_x_end {
            if member.x_start - end > gap_threshold {
                line.push(' ');
            }
        }
        line.push_str(&member.text);
        prev_x_end = Some(member.x_end);
    }
    line
}
