//! Table reconstruction from recognized text fragments.
//!
//! Fragments are grouped into rows by vertical proximity, then each row is
//! ordered left-to-right. The algorithm:
//!
//! 1. Stable-sort fragments by descending `y` (top of the region first)
//! 2. Anchor a row at its first fragment; a fragment whose `y` differs from
//!    the anchor by more than the threshold starts a new row
//! 3. Order every row by ascending `x` ([`order_row_cells`])
//! 4. A region that yields no rows is not a table
//!
//! A difference equal to the threshold stays in the current row. Differences
//! are compared with a `1e-9` tolerance so that decimal thresholds such as
//! `0.1` behave the same for every pair of positions. The threshold is absolute in region-relative units; it does not adapt
//! to font size, region scale or rotation.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::vision::{self, RecognitionOptions, TextFragment, VisionEngine};

/// Slack added to the row threshold to absorb f64 rounding in `y - anchor`.
const ROW_TOLERANCE: f64 = 1e-9;

/// Reconstructed table content: rows top-to-bottom, cells left-to-right.
///
/// Never empty, and no row is empty; an empty grid is represented as
/// `Option::None` by [`TableGrid::from_rows`]. Deserialization goes through
/// the same constructor and rejects input that would leave nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<String>>", try_from = "Vec<Vec<String>>")]
pub struct TableGrid {
    rows: Vec<Vec<String>>,
}

impl TryFrom<Vec<Vec<String>>> for TableGrid {
    type Error = &'static str;

    fn try_from(rows: Vec<Vec<String>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows).ok_or("table grid has no non-empty rows")
    }
}

impl From<TableGrid> for Vec<Vec<String>> {
    fn from(grid: TableGrid) -> Self {
        grid.rows
    }
}

impl TableGrid {
    /// Build a grid, dropping empty rows. Returns `None` if nothing is left.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<String>>) -> Option<Self> {
        let rows: Vec<Vec<String>> = rows.into_iter().filter(|r| !r.is_empty()).collect();
        if rows.is_empty() {
            None
        } else {
            Some(Self { rows })
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cells joined by tabs, one line per row.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }
}

/// Knobs for grid building
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSettings {
    /// Maximum `y` distance from a row's anchor (0.0-1.0)
    pub row_threshold: f64,
    /// Order cells by `x` within each row
    pub sort_cells_by_x: bool,
    /// Fragments below this confidence are discarded
    pub min_confidence: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            row_threshold: 0.1,
            sort_cells_by_x: true,
            min_confidence: 0.0,
        }
    }
}

/// Group fragments into rows by vertical proximity to each row's anchor.
///
/// Within a row, fragments keep the order the descending-`y` sort left them
/// in; use [`order_row_cells`] for left-to-right order.
pub fn cluster_rows(fragments: Vec<TextFragment>, threshold: f64) -> Vec<Vec<TextFragment>> {
    let mut sorted = fragments;
    sorted.sort_by(|a, b| b.bounds.y.total_cmp(&a.bounds.y));

    let mut rows = Vec::new();
    let mut current: Vec<TextFragment> = Vec::new();
    let mut anchor: Option<f64> = None;

    for fragment in sorted {
        let y = fragment.bounds.y;
        match anchor {
            None => anchor = Some(y),
            Some(a) if (y - a).abs() > threshold + ROW_TOLERANCE => {
                if !current.is_empty() {
                    rows.push(std::mem::take(&mut current));
                }
                anchor = Some(y);
            }
            Some(_) => {}
        }
        current.push(fragment);
    }

    if !current.is_empty() {
        rows.push(current);
    }
    rows
}

/// Order one row's fragments left-to-right. The sort is stable, so
/// fragments sharing an `x` keep their relative order.
pub fn order_row_cells(row: &mut [TextFragment]) {
    row.sort_by(|a, b| a.bounds.x.total_cmp(&b.bounds.x));
}

/// Turn recognized fragments into a grid.
pub fn build_grid(fragments: Vec<TextFragment>, settings: &GridSettings) -> Option<TableGrid> {
    let usable: Vec<TextFragment> = fragments
        .into_iter()
        .filter(|f| {
            f.bounds.y.is_finite()
                && f.bounds.x.is_finite()
                && !f.text.trim().is_empty()
                && f.confidence >= settings.min_confidence
        })
        .collect();

    let rows = cluster_rows(usable, settings.row_threshold)
        .into_iter()
        .map(|mut row| {
            if settings.sort_cells_by_x {
                order_row_cells(&mut row);
            }
            row.into_iter().map(|f| f.text).collect()
        })
        .collect();

    TableGrid::from_rows(rows)
}

/// Recognizes text in a region and rebuilds its table grid
pub struct TableReconstructor {
    engine: VisionEngine,
    options: RecognitionOptions,
    settings: GridSettings,
}

impl TableReconstructor {
    pub fn new(engine: VisionEngine, options: RecognitionOptions, settings: GridSettings) -> Self {
        Self {
            engine,
            options,
            settings,
        }
    }

    /// `Ok(None)` means the region holds no table text. Recognition errors
    /// are returned as-is for the caller to degrade.
    pub async fn reconstruct_table(&self, region: &RgbaImage) -> vision::Result<Option<TableGrid>> {
        let fragments = self.engine.recognize_text(region, &self.options).await?;
        tracing::debug!("Recognized {} fragments in region", fragments.len());
        Ok(build_grid(fragments, &self.settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::geometry::RelativeBox;

    fn frag(text: &str, x: f64, y: f64) -> TextFragment {
        TextFragment::new(text, RelativeBox::new(x, y, 0.1, 0.05), 0.9)
    }

    fn texts(rows: &[Vec<TextFragment>]) -> Vec<Vec<&str>> {
        rows.iter()
            .map(|r| r.iter().map(|f| f.text.as_str()).collect())
            .collect()
    }

    #[test]
    fn grid_rejects_empty_rows() {
        assert!(TableGrid::from_rows(vec![]).is_none());
        assert!(TableGrid::from_rows(vec![vec![], vec![]]).is_none());
        let grid = TableGrid::from_rows(vec![vec![], vec!["a".into()]]).unwrap();
        assert_eq!(grid.row_count(), 1);
    }

    #[test]
    fn grid_deserialization_goes_through_constructor() {
        assert!(serde_json::from_str::<TableGrid>("[]").is_err());
        assert!(serde_json::from_str::<TableGrid>("[[]]").is_err());

        let grid: TableGrid = serde_json::from_str(r#"[[], ["a", "b"]]"#).unwrap();
        assert_eq!(grid.rows(), &[vec!["a".to_string(), "b".to_string()]]);
        assert_eq!(serde_json::to_string(&grid).unwrap(), r#"[["a","b"]]"#);
    }

    #[test]
    fn grid_renders_tab_separated() {
        let grid = TableGrid::from_rows(vec![
            vec!["Name".into(), "Age".into()],
            vec!["Alice".into(), "30".into(), "NYC".into()],
        ])
        .unwrap();
        assert_eq!(grid.to_tsv(), "Name\tAge\nAlice\t30\tNYC\n");
        assert_eq!(grid.column_count(), 3);
    }

    #[test]
    fn clusters_two_rows_top_first() {
        let fragments = vec![
            frag("c", 0.1, 0.5),
            frag("a", 0.1, 0.9),
            frag("d", 0.4, 0.5),
            frag("b", 0.4, 0.9),
            frag("e", 0.7, 0.5),
        ];
        let rows = cluster_rows(fragments, 0.1);
        assert_eq!(texts(&rows), vec![vec!["a", "b"], vec!["c", "d", "e"]]);
    }

    #[test]
    fn anchor_is_first_fragment_of_row() {
        // Drifting baseline: each step is small, but 0.9 -> 0.78 exceeds 0.1
        let fragments = vec![
            frag("a", 0.0, 0.9),
            frag("b", 0.0, 0.84),
            frag("c", 0.0, 0.78),
        ];
        let rows = cluster_rows(fragments, 0.1);
        assert_eq!(texts(&rows), vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn threshold_boundary() {
        let threshold = 0.125;
        // threshold - epsilon: joins
        let rows = cluster_rows(vec![frag("a", 0.0, 0.5), frag("b", 0.0, 0.38)], threshold);
        assert_eq!(rows.len(), 1);
        // exactly at threshold: joins
        let rows = cluster_rows(vec![frag("a", 0.0, 0.5), frag("b", 0.0, 0.375)], threshold);
        assert_eq!(rows.len(), 1);
        // threshold + epsilon: splits
        let rows = cluster_rows(vec![frag("a", 0.0, 0.5), frag("b", 0.0, 0.37)], threshold);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn threshold_boundary_at_default_threshold() {
        let threshold = GridSettings::default().row_threshold;
        // Decimal gaps of exactly 0.1 join regardless of f64 rounding
        for (upper, lower) in [(0.9, 0.8), (0.8, 0.7), (0.5, 0.4), (0.3, 0.2)] {
            let rows = cluster_rows(vec![frag("a", 0.0, upper), frag("b", 0.0, lower)], threshold);
            assert_eq!(rows.len(), 1, "{upper} / {lower}");
        }
        // threshold - epsilon: joins
        let rows = cluster_rows(vec![frag("a", 0.0, 0.8), frag("b", 0.0, 0.71)], threshold);
        assert_eq!(rows.len(), 1);
        // threshold + epsilon: splits
        let rows = cluster_rows(vec![frag("a", 0.0, 0.8), frag("b", 0.0, 0.69)], threshold);
        assert_eq!(rows.len(), 2);

        let grid = build_grid(
            vec![frag("b", 0.5, 0.7), frag("a", 0.1, 0.8)],
            &GridSettings::default(),
        )
        .unwrap();
        assert_eq!(grid.rows(), &[vec!["a".to_string(), "b".to_string()]]);
    }

    #[test]
    fn order_row_cells_sorts_left_to_right() {
        let mut row = vec![frag("right", 0.8, 0.5), frag("left", 0.1, 0.5), frag("mid", 0.4, 0.5)];
        order_row_cells(&mut row);
        let cells: Vec<&str> = row.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(cells, vec!["left", "mid", "right"]);
    }

    #[test]
    fn build_grid_without_horizontal_sort_keeps_visit_order() {
        let fragments = vec![frag("second", 0.6, 0.5), frag("first", 0.1, 0.5)];
        let settings = GridSettings {
            sort_cells_by_x: false,
            ..GridSettings::default()
        };
        let grid = build_grid(fragments.clone(), &settings).unwrap();
        assert_eq!(grid.rows()[0], vec!["second", "first"]);

        let grid = build_grid(fragments, &GridSettings::default()).unwrap();
        assert_eq!(grid.rows()[0], vec!["first", "second"]);
    }

    #[test]
    fn build_grid_drops_blank_and_low_confidence_fragments() {
        let mut weak = frag("weak", 0.5, 0.5);
        weak.confidence = 0.2;
        let fragments = vec![frag("  ", 0.1, 0.9), weak, frag("kept", 0.1, 0.5)];
        let settings = GridSettings {
            min_confidence: 0.5,
            ..GridSettings::default()
        };
        let grid = build_grid(fragments, &settings).unwrap();
        assert_eq!(grid.rows(), &[vec!["kept".to_string()]]);
    }

    #[test]
    fn blank_fragment_does_not_anchor_a_row() {
        // A blank fragment at 0.85 would anchor a row that splits 0.8 from
        // 0.72; dropped first, the walk anchors at 0.8 and keeps one row.
        let fragments = vec![
            frag(" ", 0.0, 0.85),
            frag("left", 0.1, 0.8),
            frag("right", 0.6, 0.72),
        ];
        let rows = cluster_rows(fragments.clone(), 0.1);
        assert_eq!(rows.len(), 2);

        let grid = build_grid(fragments, &GridSettings::default()).unwrap();
        assert_eq!(grid.rows(), &[vec!["left".to_string(), "right".to_string()]]);
    }

    #[test]
    fn build_grid_with_no_text_is_not_a_table() {
        assert!(build_grid(vec![], &GridSettings::default()).is_none());
    }

    #[test]
    fn clustering_is_deterministic() {
        let fragments = vec![
            frag("a", 0.3, 0.71),
            frag("b", 0.1, 0.7),
            frag("c", 0.2, 0.7),
            frag("d", 0.2, 0.2),
        ];
        let first = build_grid(fragments.clone(), &GridSettings::default());
        for _ in 0..10 {
            assert_eq!(build_grid(fragments.clone(), &GridSettings::default()), first);
        }
    }
}
