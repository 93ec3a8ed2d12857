/*!

# Quick start

This example builds a flashcard string for a single variable, starting from
aggregated per-category counts.

Suppose an upstream (federated) aggregation produced the following counts for
the variable `smoking_status`:

| value   | count |
|---------|-------|
| never   | 67    |
| former  | 12    |
| current | 21    |

We want a 100-icon flashcard in which "never" counts as the positive side and
"former" and "current" count as the negative side:

```
use icon_array::*;

let rows = vec![
    CategoricalCount { variable: "smoking_status".to_string(), value: "never".to_string(), count: 67 },
    CategoricalCount { variable: "smoking_status".to_string(), value: "former".to_string(), count: 12 },
    CategoricalCount { variable: "smoking_status".to_string(), value: "current".to_string(), count: 21 },
];
let selector = StrataSelector {
    positive_strata: vec!["never".to_string()],
    negative_strata: vec!["former".to_string(), "current".to_string()],
};

let (positive, negative) = selector.split_counts(&rows, "smoking_status");
let allocation = allocate(positive, negative, MAX_ICONS - 1).unwrap();
assert_eq!(allocation.positive_icons, 67);
assert_eq!(allocation.negative_icons, 33);

let glyphs = IconGlyphs { positive: "O".to_string(), negative: "x".to_string() };
let flashcard = render(&allocation, &glyphs);
assert!(flashcard.starts_with("OOO"));
```

In the information portal the glyphs are markdown image links to SVG assets,
and the rendered string becomes the single cell of a one-column table that a
charting service displays as an icon array.

*/
