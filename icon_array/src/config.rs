// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The number of icons in a full display, plus one.
///
/// A flashcard is read as "N out of 100 people", so the display budget passed
/// to [crate::allocate] is `MAX_ICONS - 1`.
pub const MAX_ICONS: u32 = 101;

/// A single aggregated count for one category value of one variable.
///
/// Produced by an upstream aggregation process and treated as an immutable
/// input here.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CategoricalCount {
    pub variable: String,
    pub value: String,
    pub count: u64,
}

/// The two disjoint sets of category values that count toward each side of a
/// flashcard. A value that appears in neither set is ignored.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StrataSelector {
    pub positive_strata: Vec<String>,
    pub negative_strata: Vec<String>,
}

impl StrataSelector {
    /// Sums the counts of the rows of `variable` that fall in each stratum.
    pub fn split_counts(&self, rows: &[CategoricalCount], variable: &str) -> (u64, u64) {
        let mut positive: u64 = 0;
        let mut negative: u64 = 0;
        for row in rows.iter().filter(|r| r.variable == variable) {
            if self.positive_strata.contains(&row.value) {
                positive += row.count;
            } else if self.negative_strata.contains(&row.value) {
                negative += row.count;
            }
        }
        (positive, negative)
    }
}

// ******** Output data structures *********

/// The outcome of distributing the display budget over the two strata.
///
/// The fields are signed: the single-pass excess correction in
/// [crate::allocate] does not re-check its result, so a pathological budget
/// can drive one side below zero. See the crate documentation.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct IconAllocation {
    pub positive_icons: i64,
    pub negative_icons: i64,
}

/// The glyphs used to render each side of a flashcard.
///
/// These are explicit parameters rather than process-wide globals so that a
/// caller can render the same allocation with different assets.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IconGlyphs {
    pub positive: String,
    pub negative: String,
}

/// Errors that prevent the allocation from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AllocationErrors {
    /// Both strata counts are zero: there is no ratio to distribute.
    EmptyTotal,
}

impl Error for AllocationErrors {}

impl Display for AllocationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AllocationError in icon_array: empty total count")
    }
}
