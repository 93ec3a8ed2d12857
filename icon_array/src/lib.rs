mod config;
pub mod quick_start;

use log::debug;

pub use crate::config::*;

/// Distributes `max_icons` display icons over the two strata, proportionally
/// to the observed counts.
///
/// The raw per-side allocations are obtained by truncation (not rounding) of
/// `max_icons * ratio`. Truncation biases the total downward; when floating
/// point imprecision still pushes the sum above `max_icons`, a single
/// corrective pass subtracts the whole excess from the strictly larger side.
/// Two quirks of this correction are kept on purpose and are part of the
/// contract:
///
/// - on a tie between the two sides, the excess is taken from the negative
///   side;
/// - the pass does not re-check its own result, so an excess larger than the
///   bigger side would leave a negative count behind. For budgets derived as
///   `N - 1` from an `N`-icon display this cannot happen, and the result
///   satisfies `positive_icons + negative_icons <= max_icons` with both
///   sides non-negative.
///
/// Arguments:
/// * `positive_count` the summed count of the positive strata
/// * `negative_count` the summed count of the negative strata
/// * `max_icons` the display budget, typically [MAX_ICONS]` - 1`
///
/// Fails with [AllocationErrors::EmptyTotal] when both counts are zero.
pub fn allocate(
    positive_count: u64,
    negative_count: u64,
    max_icons: u32,
) -> Result<IconAllocation, AllocationErrors> {
    let total = positive_count + negative_count;
    if total == 0 {
        return Err(AllocationErrors::EmptyTotal);
    }

    let positive_ratio = positive_count as f64 / total as f64;
    let negative_ratio = negative_count as f64 / total as f64;

    // Truncation, not rounding.
    let mut positive_icons = (max_icons as f64 * positive_ratio) as i64;
    let mut negative_icons = (max_icons as f64 * negative_ratio) as i64;

    if positive_icons + negative_icons > max_icons as i64 {
        let excess = (positive_icons + negative_icons) - max_icons as i64;
        debug!(
            "allocate: correcting excess {} over budget {}",
            excess, max_icons
        );
        // Ties route to the negative side.
        if positive_icons > negative_icons {
            positive_icons -= excess;
        } else {
            negative_icons -= excess;
        }
    }

    Ok(IconAllocation {
        positive_icons,
        negative_icons,
    })
}

/// Renders an allocation as a display string: the positive glyph repeated,
/// one separating space, the negative glyph repeated.
///
/// A negative icon count renders as zero repetitions. Note that callers that
/// serialize flashcards strip all spaces afterwards, including the separator
/// produced here.
pub fn render(allocation: &IconAllocation, glyphs: &IconGlyphs) -> String {
    let positive = glyphs.positive.repeat(allocation.positive_icons.max(0) as usize);
    let negative = glyphs.negative.repeat(allocation.negative_icons.max(0) as usize);
    format!("{} {}", positive, negative)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyphs(p: &str, n: &str) -> IconGlyphs {
        IconGlyphs {
            positive: p.to_string(),
            negative: n.to_string(),
        }
    }

    #[test]
    fn allocates_full_budget_to_one_side() {
        assert_eq!(
            allocate(100, 0, 100).unwrap(),
            IconAllocation {
                positive_icons: 100,
                negative_icons: 0
            }
        );
        assert_eq!(
            allocate(0, 100, 100).unwrap(),
            IconAllocation {
                positive_icons: 0,
                negative_icons: 100
            }
        );
    }

    #[test]
    fn splits_even_counts_evenly() {
        assert_eq!(
            allocate(50, 50, 100).unwrap(),
            IconAllocation {
                positive_icons: 50,
                negative_icons: 50
            }
        );
    }

    #[test]
    fn exact_ratios_need_no_correction() {
        assert_eq!(
            allocate(67, 33, 100).unwrap(),
            IconAllocation {
                positive_icons: 67,
                negative_icons: 33
            }
        );
    }

    #[test]
    fn truncates_fractional_allocations() {
        // Ratios 1/3 and 2/3 of a budget of 10 truncate to 3 and 6.
        assert_eq!(
            allocate(1, 2, 10).unwrap(),
            IconAllocation {
                positive_icons: 3,
                negative_icons: 6
            }
        );
    }

    #[test]
    fn never_exceeds_the_budget() {
        for p in 0..20u64 {
            for n in 0..20u64 {
                if p + n == 0 {
                    continue;
                }
                for max_icons in 1..30u32 {
                    let a = allocate(p, n, max_icons).unwrap();
                    assert!(a.positive_icons + a.negative_icons <= max_icons as i64);
                    assert!(a.positive_icons >= 0);
                    assert!(a.negative_icons >= 0);
                }
            }
        }
    }

    #[test]
    fn tiny_budget_truncates_to_zero() {
        // Truncation alone keeps the sum within budget here; nothing to correct.
        assert_eq!(
            allocate(1, 1, 1).unwrap(),
            IconAllocation {
                positive_icons: 0,
                negative_icons: 0
            }
        );
    }

    #[test]
    fn empty_total_is_an_error() {
        assert_eq!(allocate(0, 0, 100), Err(AllocationErrors::EmptyTotal));
    }

    #[test]
    fn renders_repeated_glyphs_with_separator() {
        let a = IconAllocation {
            positive_icons: 3,
            negative_icons: 2,
        };
        assert_eq!(render(&a, &glyphs("X", "Y")), "XXX YY");
        assert_eq!(render(&a, &glyphs("X", "Y")).replace(' ', ""), "XXXYY");
    }

    #[test]
    fn renders_negative_counts_as_empty() {
        let a = IconAllocation {
            positive_icons: 2,
            negative_icons: -1,
        };
        assert_eq!(render(&a, &glyphs("X", "Y")), "XX ");
    }

    #[test]
    fn splits_counts_by_strata() {
        let rows = vec![
            CategoricalCount {
                variable: "smoking".to_string(),
                value: "never".to_string(),
                count: 40,
            },
            CategoricalCount {
                variable: "smoking".to_string(),
                value: "current".to_string(),
                count: 25,
            },
            CategoricalCount {
                variable: "smoking".to_string(),
                value: "unknown".to_string(),
                count: 7,
            },
            CategoricalCount {
                variable: "alcohol".to_string(),
                value: "never".to_string(),
                count: 99,
            },
        ];
        let selector = StrataSelector {
            positive_strata: vec!["never".to_string()],
            negative_strata: vec!["current".to_string(), "former".to_string()],
        };
        // The unknown value and the other variable are both ignored.
        assert_eq!(selector.split_counts(&rows, "smoking"), (40, 25));
    }
}
