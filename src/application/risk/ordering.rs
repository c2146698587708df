//! Tie-break helpers for picking which positions to trim.

use crate::domain::Position;

/// Indices of the positions to close when more than `max_open` are open.
///
/// Positions are ranked newest first by `opened_at`; equal timestamps keep
/// their input order (the sort is stable). The first `len - max_open`
/// ranked positions are returned. Indices refer to `positions`.
#[must_use]
pub fn select_excess(positions: &[Position], max_open: usize) -> Vec<usize> {
    let excess = positions.len().saturating_sub(max_open);
    if excess == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<usize> = (0..positions.len()).collect();
    ranked.sort_by(|&a, &b| positions[b].opened_at.cmp(&positions[a].opened_at));
    ranked.truncate(excess);
    ranked
}
