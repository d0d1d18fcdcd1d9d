//! Pure rank arithmetic for the ordering engine.
//!
//! Ranks are 1-based. A move from `old` to `new` shifts exactly the peers in
//! the window between the two ranks by one step; everything else keeps its
//! rank.

/// Direction of a single-item move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Toward the front (`new < old`); peers in `[new, old)` get `+1`.
    Up,
    /// Toward the back (`new > old`); peers in `(old, new]` get `-1`.
    Down,
}

/// Inclusive rank range of peers displaced by a move, and how they shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWindow {
    pub direction: MoveDirection,
    /// Lowest displaced rank, inclusive.
    pub low: i64,
    /// Highest displaced rank, inclusive.
    pub high: i64,
}

impl ShiftWindow {
    /// Computes the displaced window for a move, or `None` for a no-op.
    ///
    /// The window is derived from the caller's `old_rank`, never from the
    /// stored rank.
    pub fn for_move(old_rank: i64, new_rank: i64) -> Option<Self> {
        match old_rank.cmp(&new_rank) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(Self {
                direction: MoveDirection::Up,
                low: new_rank,
                high: old_rank - 1,
            }),
            std::cmp::Ordering::Less => Some(Self {
                direction: MoveDirection::Down,
                low: old_rank + 1,
                high: new_rank,
            }),
        }
    }

    /// Rank delta applied to every displaced peer.
    pub fn delta(&self) -> i64 {
        match self.direction {
            MoveDirection::Up => 1,
            MoveDirection::Down => -1,
        }
    }
}

/// Result of checking active ranks against the dense sequence `1..=len`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankAudit {
    /// Number of active todos inspected.
    pub len: usize,
    /// Ranks held by more than one active todo, ascending.
    pub duplicates: Vec<i64>,
    /// Ranks in `1..=len` held by no active todo, ascending.
    pub gaps: Vec<i64>,
}

impl RankAudit {
    /// Audits a set of active ranks in any order.
    pub fn from_ranks(ranks: impl IntoIterator<Item = i64>) -> Self {
        let mut sorted = ranks.into_iter().collect::<Vec<_>>();
        sorted.sort_unstable();

        let mut duplicates = sorted
            .windows(2)
            .filter(|pair| pair[0] == pair[1])
            .map(|pair| pair[0])
            .collect::<Vec<_>>();
        duplicates.dedup();

        let len = sorted.len();
        let gaps = (1..=len as i64)
            .filter(|rank| sorted.binary_search(rank).is_err())
            .collect();

        Self {
            len,
            duplicates,
            gaps,
        }
    }

    /// True when active ranks are exactly `1..=len`.
    pub fn is_dense(&self) -> bool {
        self.duplicates.is_empty() && self.gaps.is_empty()
    }
}
