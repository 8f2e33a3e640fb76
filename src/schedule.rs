//! Shared lane/row scheduling for the CISR format.
//!
//! CISR distributes the stored elements of a matrix across `width` lanes.
//! Lane `c` starts on row `c`; whenever a lane exhausts its current row it
//! claims the next unassigned row id from a shared [`Frontier`] counter.
//! Elements are laid out in wavefronts of `width` consecutive positions,
//! one per lane, so lane `c`'s k-th element sits at position `c + k*width`
//! and its g-th row length at slot `c + g*width`.
//!
//! Encoder and SpMV must agree on this assignment exactly, so both sides
//! derive it from one [`RowSchedule`] built here. The encoder builds it
//! from per-row nonzero counts in row-id order; the SpMV engine rebuilds
//! the identical schedule from the lane-major `row_lengths` array.

use crate::error::{CisrError, Result};

/// Shared counter handing out not-yet-assigned row ids to lanes.
///
/// Rows `0..width` are assigned directly at startup, so the frontier begins
/// at `width` and advances monotonically. This is the single point of shared
/// mutable state between lanes; a parallel execution must serialize access
/// to it, which [`RowSchedule`] does by resolving the full assignment in one
/// sequential pass.
#[derive(Debug)]
pub struct Frontier {
    next: usize,
    num_rows: usize,
}

impl Frontier {
    /// Create a frontier for a matrix with `num_rows` rows and `width` lanes.
    pub fn new(width: usize, num_rows: usize) -> Self {
        Self {
            next: width,
            num_rows,
        }
    }

    /// Hand out the next unassigned row id, or `None` if all rows are taken.
    pub fn claim(&mut self) -> Option<usize> {
        if self.next < self.num_rows {
            let row = self.next;
            self.next += 1;
            Some(row)
        } else {
            None
        }
    }

    /// Number of rows not yet handed out.
    pub fn remaining(&self) -> usize {
        self.num_rows.saturating_sub(self.next)
    }
}

/// Per-lane replay state while resolving the schedule.
struct LaneState {
    row: Option<usize>,
    remaining: usize,
    slot: usize,
}

/// The complete lane/row assignment for one (matrix, width) pair.
///
/// Resolves, for every linear position in the values array, which row owns
/// it (`None` marks a padding hole left by a lane that ran out of rows while
/// others were still working), and for every row, the lane that owns it and
/// the slot its length occupies in the lane-major `row_lengths` array.
#[derive(Debug)]
pub struct RowSchedule {
    width: usize,
    num_rows: usize,
    lanes: Vec<Vec<usize>>,
    position_rows: Vec<Option<usize>>,
    row_slots: Vec<usize>,
    row_lengths_len: usize,
    nnz: usize,
}

impl RowSchedule {
    /// Build the schedule from per-row stored-element counts in row-id order.
    ///
    /// This is the encoder-side entry point: counts come from a prior pass
    /// over the matrix under the presence predicate.
    pub fn from_row_counts(width: usize, counts: &[usize]) -> Result<Self> {
        Self::build(width, counts.len(), |row, _slot| Ok(counts[row]))
    }

    /// Rebuild the schedule from a lane-major `row_lengths` array.
    ///
    /// This is the SpMV-side entry point: lane `c` reads its g-th row length
    /// at slot `c + g*width`, exactly where the encoder wrote it. A slot
    /// falling outside the array means the triple cannot have been produced
    /// for this `width`/`num_rows` pair.
    pub fn from_lane_major(width: usize, num_rows: usize, row_lengths: &[usize]) -> Result<Self> {
        Self::build(width, num_rows, |row, slot| {
            row_lengths
                .get(slot)
                .copied()
                .ok_or_else(|| CisrError::FormatInconsistency {
                    reason: format!(
                        "row length slot {slot} for row {row} is outside row_lengths (len {})",
                        row_lengths.len()
                    ),
                })
        })
    }

    /// Replay the lane mechanics, looking up each claimed row's length via
    /// `len_of(row, slot)`.
    fn build<F>(width: usize, num_rows: usize, mut len_of: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> Result<usize>,
    {
        if width == 0 {
            return Err(CisrError::InvalidDimensions {
                reason: "lane width must be at least 1".to_string(),
            });
        }

        let mut lanes: Vec<Vec<usize>> = vec![Vec::new(); width];
        let mut row_slots = vec![0usize; num_rows];
        let mut position_rows: Vec<Option<usize>> = Vec::new();
        let mut row_lengths_len = 0usize;
        let mut nnz = 0usize;

        let mut frontier = Frontier::new(width, num_rows);
        let mut states: Vec<LaneState> = Vec::with_capacity(width);

        // Lanes start on rows 0..width; lanes beyond the row count stay idle.
        for c in 0..width {
            if c < num_rows {
                lanes[c].push(c);
                row_slots[c] = c;
                row_lengths_len = row_lengths_len.max(c + 1);
                let len = len_of(c, c)?;
                nnz += len;
                states.push(LaneState {
                    row: Some(c),
                    remaining: len,
                    slot: c,
                });
            } else {
                states.push(LaneState {
                    row: None,
                    remaining: 0,
                    slot: c,
                });
            }
        }

        loop {
            let live = states.iter().any(|s| s.remaining > 0) || frontier.remaining() > 0;
            if !live {
                break;
            }

            // One wavefront: each lane contributes at most one element,
            // claiming replacement rows from the frontier as needed.
            for (c, state) in states.iter_mut().enumerate() {
                while state.remaining == 0 {
                    match frontier.claim() {
                        Some(row) => {
                            state.slot += width;
                            state.row = Some(row);
                            lanes[c].push(row);
                            row_slots[row] = state.slot;
                            row_lengths_len = row_lengths_len.max(state.slot + 1);
                            let len = len_of(row, state.slot)?;
                            nnz += len;
                            state.remaining = len;
                        }
                        None => {
                            state.row = None;
                            break;
                        }
                    }
                }

                if state.remaining > 0 {
                    position_rows.push(state.row);
                    state.remaining -= 1;
                } else {
                    position_rows.push(None);
                }
            }
        }

        // The arrays end at the last written position.
        while matches!(position_rows.last(), Some(None)) {
            position_rows.pop();
        }

        Ok(Self {
            width,
            num_rows,
            lanes,
            position_rows,
            row_slots,
            row_lengths_len,
            nnz,
        })
    }

    /// Lane count the schedule was built for.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Row count of the scheduled matrix.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Total stored-element count (padding holes excluded).
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Owning row per linear position; `None` marks a padding hole.
    pub fn position_rows(&self) -> &[Option<usize>] {
        &self.position_rows
    }

    /// Required length of the values / column-index arrays.
    pub fn values_len(&self) -> usize {
        self.position_rows.len()
    }

    /// Row ids owned by each lane, in generation order.
    pub fn lanes(&self) -> &[Vec<usize>] {
        &self.lanes
    }

    /// Slot in the lane-major `row_lengths` array for each row id.
    pub fn row_slots(&self) -> &[usize] {
        &self.row_slots
    }

    /// Required length of the lane-major `row_lengths` array.
    pub fn row_lengths_len(&self) -> usize {
        self.row_lengths_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontier_post_increment() {
        let mut frontier = Frontier::new(4, 6);
        assert_eq!(frontier.remaining(), 2);
        assert_eq!(frontier.claim(), Some(4));
        assert_eq!(frontier.claim(), Some(5));
        assert_eq!(frontier.claim(), None);
        assert_eq!(frontier.remaining(), 0);
    }

    #[test]
    fn test_frontier_more_lanes_than_rows() {
        let mut frontier = Frontier::new(8, 4);
        assert_eq!(frontier.remaining(), 0);
        assert_eq!(frontier.claim(), None);
    }

    #[test]
    fn test_schedule_interleaves_lanes() {
        // Row nonzero counts of the 6x4 example matrix.
        let counts = [2, 1, 2, 2, 2, 1];
        let schedule = RowSchedule::from_row_counts(4, &counts).unwrap();

        assert_eq!(schedule.nnz(), 10);
        assert_eq!(schedule.values_len(), 10);
        assert_eq!(schedule.row_lengths_len(), 6);
        assert_eq!(
            schedule.lanes(),
            &[vec![0, 5], vec![1, 4], vec![2], vec![3]]
        );
        // Rows 4 and 5 land in swapped slots: lane 0 frees up first and
        // claims row 5 into slot 0 + 1*4.
        assert_eq!(schedule.row_slots(), &[0, 1, 2, 3, 5, 4]);
        let owners: Vec<Option<usize>> = [0, 1, 2, 3, 0, 4, 2, 3, 5, 4]
            .iter()
            .map(|&r| Some(r))
            .collect();
        assert_eq!(schedule.position_rows(), owners.as_slice());
    }

    #[test]
    fn test_schedule_width_one_is_row_major() {
        let counts = [2, 0, 3];
        let schedule = RowSchedule::from_row_counts(1, &counts).unwrap();

        assert_eq!(schedule.lanes(), &[vec![0, 1, 2]]);
        assert_eq!(schedule.row_slots(), &[0, 1, 2]);
        let owners: Vec<Option<usize>> =
            [0, 0, 2, 2, 2].iter().map(|&r| Some(r)).collect();
        assert_eq!(schedule.position_rows(), owners.as_slice());
    }

    #[test]
    fn test_schedule_pads_unbalanced_lanes() {
        // Lane 0 owns three elements, lane 1 only one: positions 0,2,4 are
        // lane 0's, position 1 is lane 1's, position 3 is a hole.
        let schedule = RowSchedule::from_row_counts(2, &[3, 1]).unwrap();

        assert_eq!(schedule.nnz(), 4);
        assert_eq!(schedule.values_len(), 5);
        assert_eq!(
            schedule.position_rows(),
            &[Some(0), Some(1), Some(0), None, Some(0)]
        );
    }

    #[test]
    fn test_schedule_empty_rows_consume_generations() {
        // Rows 0 and 2 are empty; lane 0 burns through rows 0, 2 and 3
        // within the first wavefront, advancing its slot each time.
        let schedule = RowSchedule::from_row_counts(2, &[0, 2, 0, 1]).unwrap();

        assert_eq!(schedule.lanes(), &[vec![0, 2, 3], vec![1]]);
        assert_eq!(schedule.row_slots(), &[0, 1, 2, 4]);
        assert_eq!(schedule.row_lengths_len(), 5);
        assert_eq!(
            schedule.position_rows(),
            &[Some(3), Some(1), None, Some(1)]
        );
    }

    #[test]
    fn test_schedule_all_rows_empty() {
        let schedule = RowSchedule::from_row_counts(3, &[0, 0, 0, 0]).unwrap();
        assert_eq!(schedule.nnz(), 0);
        assert_eq!(schedule.values_len(), 0);
        assert_eq!(schedule.lanes(), &[vec![0, 3], vec![1], vec![2]]);
    }

    #[test]
    fn test_schedule_width_beyond_rows() {
        let schedule = RowSchedule::from_row_counts(5, &[1, 2]).unwrap();
        assert_eq!(schedule.lanes(), &[vec![0], vec![1], vec![], vec![], vec![]]);
        assert_eq!(
            schedule.position_rows(),
            &[Some(0), Some(1), None, None, None, None, Some(1)]
        );
    }

    #[test]
    fn test_lane_major_matches_row_counts() {
        let counts = [2, 1, 2, 2, 2, 1];
        let by_counts = RowSchedule::from_row_counts(4, &counts).unwrap();

        // Rebuild the lane-major row_lengths the encoder would emit.
        let mut row_lengths = vec![0usize; by_counts.row_lengths_len()];
        for (row, &slot) in by_counts.row_slots().iter().enumerate() {
            row_lengths[slot] = counts[row];
        }
        assert_eq!(row_lengths, vec![2, 1, 2, 2, 1, 2]);

        let by_slots = RowSchedule::from_lane_major(4, 6, &row_lengths).unwrap();
        assert_eq!(by_slots.position_rows(), by_counts.position_rows());
        assert_eq!(by_slots.lanes(), by_counts.lanes());
        assert_eq!(by_slots.nnz(), by_counts.nnz());
    }

    #[test]
    fn test_lane_major_rejects_short_array() {
        let err = RowSchedule::from_lane_major(4, 6, &[2, 1, 2, 2]).unwrap_err();
        assert!(err.is_format_inconsistency());
    }

    #[test]
    fn test_zero_width_rejected() {
        let err = RowSchedule::from_row_counts(0, &[1, 2]).unwrap_err();
        assert!(err.is_invalid_dimensions());
    }
}
