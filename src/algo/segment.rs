//! Contour segment partitioning.
//!
//! Splits a closed contour cycle into ordered segment buckets. Bucket sizes
//! follow prescribed arc-length proportions rather than the raw landmark
//! positions: once a bucket holds `round(proportion * total)` points the cut
//! moves to the next bucket, wherever the original landmark was observed.
//! This redistribution decouples segment length from mesh sampling density
//! and is what keeps facing segments of neighboring holes compatible.
//!
//! The returned cut points ("proportionally displaced extremes") replace the
//! originally detected landmarks everywhere downstream, in particular as
//! endpoints for path re-routing.

use crate::error::{FlattenError, Result};
use crate::mesh::{Contour, VertexId};

/// One ordered bucket of contour ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    ids: Vec<VertexId>,
}

impl Segment {
    /// Get the number of points in the segment.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the segment is empty (a zero-proportion degenerate bucket).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Get the ordered ids.
    #[inline]
    pub fn ids(&self) -> &[VertexId] {
        &self.ids
    }

    /// Get the first id, if any.
    pub fn first(&self) -> Option<VertexId> {
        self.ids.first().copied()
    }
}

/// Result of partitioning one contour.
#[derive(Debug, Clone)]
pub struct ContourPartition {
    segments: Vec<Segment>,
}

impl ContourPartition {
    /// The ordered segment buckets.
    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The segment at index `k`.
    #[inline]
    pub fn segment(&self, k: usize) -> &Segment {
        &self.segments[k]
    }

    /// Number of segments (2 or 3).
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if there are no segments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total number of contour points across all segments.
    pub fn total_len(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    /// The displaced extreme of each segment: its first id, or for an empty
    /// bucket the id shared with the following segment.
    pub fn extremes(&self) -> Vec<VertexId> {
        let n = self.segments.len();
        (0..n)
            .map(|k| {
                // An empty bucket borrows the start of the next non-empty one
                (0..n)
                    .filter_map(|step| self.segments[(k + step) % n].first())
                    .next()
                    .unwrap_or_else(VertexId::invalid)
            })
            .collect()
    }

    /// Iterate over all ids in walk order.
    pub fn iter_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.segments.iter().flat_map(|s| s.ids.iter().copied())
    }
}

/// Partition a contour into three segments with proportional redistribution.
///
/// The cycle is rotated so `landmarks[0]` comes first. If `landmarks[1]` does
/// not precede `landmarks[2]` in the rotated cycle, the traversal direction
/// is reversed (keeping the start fixed) so the walk matches the template's
/// counter-clockwise convention. Cuts then fall at
/// `round(proportion * total)` points per bucket, the last bucket taking the
/// remainder.
///
/// Fails with [`FlattenError::BoundaryMismatch`] if any landmark is not on
/// the contour; `contour_label` names the contour in that diagnostic.
pub fn partition_proportional(
    contour: &Contour,
    landmarks: [VertexId; 3],
    proportions: [f64; 3],
    contour_label: &str,
) -> Result<ContourPartition> {
    debug_assert!(
        proportions.iter().all(|&p| (0.0..=1.0).contains(&p)),
        "proportions must be fractions"
    );

    let cycle = orient_cycle(contour, landmarks[0], landmarks[1], landmarks[2], contour_label)?;

    let n = cycle.len();
    let c0 = ((proportions[0] * n as f64).round() as usize).min(n);
    let c1 = ((proportions[1] * n as f64).round() as usize).min(n - c0);

    let ids = cycle.ids();
    let segments = vec![
        Segment {
            ids: ids[..c0].to_vec(),
        },
        Segment {
            ids: ids[c0..c0 + c1].to_vec(),
        },
        Segment {
            ids: ids[c0 + c1..].to_vec(),
        },
    ];

    Ok(ContourPartition { segments })
}

/// Partition a contour into two segments cut at the observed landmarks.
///
/// No redistribution takes place: the first bucket runs from `first` up to
/// (excluding) `second`, the second bucket from `second` back around. The
/// `witness` id resolves the traversal direction; it must fall inside the
/// second bucket, and the cycle is reversed if it does not. The witness is
/// not itself a cut point.
pub fn partition_two_way(
    contour: &Contour,
    first: VertexId,
    second: VertexId,
    witness: VertexId,
    contour_label: &str,
) -> Result<ContourPartition> {
    let cycle = orient_cycle(contour, first, second, witness, contour_label)?;

    // Position is defined: orient_cycle verified membership
    let cut = cycle
        .position_of(second)
        .ok_or_else(|| FlattenError::BoundaryMismatch {
            landmark: second.index(),
            contour: contour_label.to_string(),
        })?;

    let ids = cycle.ids();
    let segments = vec![
        Segment {
            ids: ids[..cut].to_vec(),
        },
        Segment {
            ids: ids[cut..].to_vec(),
        },
    ];

    Ok(ContourPartition { segments })
}

/// Rotate a contour to start at `start` and orient it so `before` precedes
/// `after` in the walk.
fn orient_cycle(
    contour: &Contour,
    start: VertexId,
    before: VertexId,
    after: VertexId,
    contour_label: &str,
) -> Result<Contour> {
    let mut cycle = contour.clone();

    if !cycle.rotate_to(start) {
        return Err(FlattenError::BoundaryMismatch {
            landmark: start.index(),
            contour: contour_label.to_string(),
        });
    }

    let pos_before = cycle
        .position_of(before)
        .ok_or_else(|| FlattenError::BoundaryMismatch {
            landmark: before.index(),
            contour: contour_label.to_string(),
        })?;
    let pos_after = cycle
        .position_of(after)
        .ok_or_else(|| FlattenError::BoundaryMismatch {
            landmark: after.index(),
            contour: contour_label.to_string(),
        })?;

    if pos_before > pos_after {
        cycle.reverse_keeping_first();
    }

    Ok(cycle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(raw: &[usize]) -> Contour {
        Contour::new(raw.iter().map(|&i| VertexId::new(i)).collect())
    }

    fn v(i: usize) -> VertexId {
        VertexId::new(i)
    }

    fn raw(seg: &Segment) -> Vec<usize> {
        seg.ids().iter().map(|id| id.index()).collect()
    }

    #[test]
    fn test_even_thirds() {
        let contour = cycle(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        let part = partition_proportional(
            &contour,
            [v(0), v(4), v(8)],
            [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
            "test",
        )
        .unwrap();

        assert_eq!(raw(part.segment(0)), vec![0, 1, 2, 3]);
        assert_eq!(raw(part.segment(1)), vec![4, 5, 6, 7]);
        assert_eq!(raw(part.segment(2)), vec![8, 9, 10, 11]);
        assert_eq!(part.extremes(), vec![v(0), v(4), v(8)]);
    }

    #[test]
    fn test_redistribution_displaces_extremes() {
        // Landmarks observed at 0/2/4, but proportions demand 6/3/3 points:
        // the cuts move away from the observed landmarks
        let contour = cycle(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        let part = partition_proportional(
            &contour,
            [v(0), v(2), v(4)],
            [0.5, 0.25, 0.25],
            "test",
        )
        .unwrap();

        assert_eq!(part.segment(0).len(), 6);
        assert_eq!(part.segment(1).len(), 3);
        assert_eq!(part.segment(2).len(), 3);
        assert_eq!(part.extremes(), vec![v(0), v(6), v(9)]);
    }

    #[test]
    fn test_rotation_to_first_landmark() {
        let contour = cycle(&[7, 8, 9, 0, 1, 2, 3, 4, 5, 6]);
        let part = partition_proportional(
            &contour,
            [v(0), v(3), v(6)],
            [0.3, 0.3, 0.4],
            "test",
        )
        .unwrap();

        // Bucket 0 always starts at landmark 0
        assert_eq!(part.segment(0).first(), Some(v(0)));
        assert_eq!(part.total_len(), 10);
    }

    #[test]
    fn test_orientation_reversal() {
        // Walking forward from 0, landmark 8 comes before landmark 4, so the
        // cycle must be reversed (keeping 0 first) before cutting
        let contour = cycle(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        let part = partition_proportional(
            &contour,
            [v(0), v(8), v(4)],
            [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
            "test",
        )
        .unwrap();

        assert_eq!(raw(part.segment(0)), vec![0, 11, 10, 9]);
        assert_eq!(raw(part.segment(1)), vec![8, 7, 6, 5]);
        assert_eq!(raw(part.segment(2)), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_counts_within_one_of_target() {
        let n = 97;
        let contour = cycle(&(0..n).collect::<Vec<_>>());
        let cases = [
            [0.2347, 0.2938, 0.4715],
            [0.1, 0.1, 0.8],
            [0.45, 0.45, 0.1],
            [0.5, 0.5, 0.0],
        ];

        for proportions in cases {
            let part = partition_proportional(
                &contour,
                [v(0), v(10), v(20)],
                proportions,
                "test",
            )
            .unwrap();

            assert_eq!(part.total_len(), n);
            for (k, p) in proportions.iter().enumerate() {
                let target = (p * n as f64).round() as i64;
                let got = part.segment(k).len() as i64;
                assert!(
                    (got - target).abs() <= 1,
                    "bucket {} got {} points, target {}",
                    k,
                    got,
                    target
                );
            }
        }
    }

    #[test]
    fn test_zero_proportion_segment() {
        let contour = cycle(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let part = partition_proportional(
            &contour,
            [v(0), v(2), v(4)],
            [0.5, 0.0, 0.5],
            "test",
        )
        .unwrap();

        assert_eq!(part.segment(0).len(), 4);
        assert!(part.segment(1).is_empty());
        assert_eq!(part.segment(2).len(), 4);

        // The empty bucket's extreme is shared with its neighbor
        let extremes = part.extremes();
        assert_eq!(extremes[1], extremes[2]);
        assert_eq!(extremes[1], v(4));
    }

    #[test]
    fn test_missing_landmark_fails() {
        let contour = cycle(&[0, 1, 2, 3]);
        let result = partition_proportional(
            &contour,
            [v(0), v(1), v(99)],
            [0.3, 0.3, 0.4],
            "rspv",
        );

        match result {
            Err(FlattenError::BoundaryMismatch { landmark, contour }) => {
                assert_eq!(landmark, 99);
                assert_eq!(contour, "rspv");
            }
            other => panic!("expected BoundaryMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_two_way_cut_at_observed() {
        let contour = cycle(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let part = partition_two_way(&contour, v(0), v(3), v(5), "laa").unwrap();

        assert_eq!(raw(part.segment(0)), vec![0, 1, 2]);
        assert_eq!(raw(part.segment(1)), vec![3, 4, 5, 6, 7]);
        assert_eq!(part.extremes(), vec![v(0), v(3)]);
    }

    #[test]
    fn test_two_way_witness_flips_direction() {
        // Forward from 0 the witness (1) would precede the cut (3), so the
        // walk reverses: 0, 7, 6, 5, 4, | 3, 2, 1
        let contour = cycle(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let part = partition_two_way(&contour, v(0), v(3), v(1), "laa").unwrap();

        assert_eq!(raw(part.segment(0)), vec![0, 7, 6, 5, 4]);
        assert_eq!(raw(part.segment(1)), vec![3, 2, 1]);
    }

    #[test]
    fn test_two_way_missing_witness_fails() {
        let contour = cycle(&[0, 1, 2, 3]);
        let result = partition_two_way(&contour, v(0), v(2), v(42), "laa");
        assert!(matches!(
            result,
            Err(FlattenError::BoundaryMismatch { landmark: 42, .. })
        ));
    }
}
