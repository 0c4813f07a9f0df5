//! Table detection on a page layout
//!
//! Both strategies reduce a page to axis-aligned edges and then share one
//! lattice pass:
//!
//! 1. Edges: drawn rulings (`lines`), or edges inferred from word alignment
//!    (`text`: a column edge where at least `min_words_vertical` words line up,
//!    a row edge above and below every text line)
//! 2. Snap nearly-equal positions together, join collinear pieces, drop stubs
//! 3. Intersections of horizontal and vertical edges
//! 4. Smallest cell to the lower right of each intersection whose four sides
//!    lie on edges
//! 5. Cells sharing a corner form one table; rows and columns come from the
//!    distinct cell tops and lefts
//!
//! Cell text is read from the glyphs whose center falls inside the cell.

use std::collections::{HashMap, HashSet};

use super::layout::{text_of, Glyph, Orientation, PageLayout, Ruling, Word};
use crate::config::{TableSettings, TableStrategy};

/// Rows of cell texts; `None` marks a grid slot covered by no cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Column count of the first row
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Cell text of a row, trimmed; empty for missing cells
pub fn cell(row: &[Option<String>], index: usize) -> &str {
    row.get(index)
        .and_then(|c| c.as_deref())
        .map(str::trim)
        .unwrap_or("")
}

/// Find all tables on a page with one strategy
pub fn extract_tables(page: &PageLayout, settings: &TableSettings) -> Vec<Table> {
    let edges = match settings.strategy {
        TableStrategy::Lines => page.rulings.clone(),
        TableStrategy::Text => {
            let words = page.words(settings.x_tolerance, settings.y_tolerance);
            let mut edges = text_row_edges(&words, settings.min_words_horizontal);
            edges.extend(text_column_edges(&words, settings.min_words_vertical));
            edges
        }
    };

    let edges = merge_edges(edges, settings);
    let grid = Intersections::find(&edges, settings.intersection_tolerance);
    let cells = grid.cells();

    group_cells(cells)
        .into_iter()
        .map(|cells| build_table(page, &cells, settings))
        .filter(|table| !table.is_empty())
        .collect()
}

/// Try ruled lines first, then text alignment when no table was found
pub fn extract_tables_with_fallback(
    page: &PageLayout,
    lines: &TableSettings,
    text: &TableSettings,
) -> Vec<Table> {
    let tables = extract_tables(page, lines);
    if !tables.is_empty() {
        return tables;
    }
    tracing::debug!(
        "No ruled tables on page {}, falling back to text alignment",
        page.number
    );
    extract_tables(page, text)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BBox {
    x0: f64,
    top: f64,
    x1: f64,
    bottom: f64,
}

impl BBox {
    fn of_words<'a>(words: impl IntoIterator<Item = &'a Word>) -> Option<Self> {
        words.into_iter().fold(None, |acc, w| {
            Some(match acc {
                None => BBox {
                    x0: w.x0,
                    top: w.top,
                    x1: w.x1,
                    bottom: w.bottom,
                },
                Some(b) => BBox {
                    x0: b.x0.min(w.x0),
                    top: b.top.min(w.top),
                    x1: b.x1.max(w.x1),
                    bottom: b.bottom.max(w.bottom),
                },
            })
        })
    }

    fn overlaps(&self, other: &BBox) -> bool {
        let width = self.x1.min(other.x1) - self.x0.max(other.x0);
        let height = self.bottom.min(other.bottom) - self.top.max(other.top);
        width >= 0.0 && height >= 0.0 && width + height > 0.0
    }

    fn contains_center(&self, glyph: &Glyph) -> bool {
        let (cx, cy) = glyph.center();
        self.x0 <= cx && cx < self.x1 && self.top <= cy && cy < self.bottom
    }
}

/// Group items whose key values chain within `tolerance` of each other
fn cluster_by<'a, T>(items: &[&'a T], key: impl Fn(&T) -> f64, tolerance: f64) -> Vec<Vec<&'a T>> {
    let mut sorted: Vec<&T> = items.to_vec();
    sorted.sort_by(|a, b| key(*a).total_cmp(&key(*b)));

    let mut clusters: Vec<Vec<&T>> = Vec::new();
    let mut last = f64::NEG_INFINITY;
    for item in sorted {
        let value = key(item);
        match clusters.last_mut() {
            Some(cluster) if value <= last + tolerance => cluster.push(item),
            _ => clusters.push(vec![item]),
        }
        last = value;
    }
    clusters
}

/// Row edges along the top and bottom of every text line, spanning all lines
fn text_row_edges(words: &[Word], min_words: usize) -> Vec<Ruling> {
    let refs: Vec<&Word> = words.iter().collect();
    let lines: Vec<BBox> = cluster_by(&refs, |w| w.top, 1.0)
        .into_iter()
        .filter(|c| c.len() >= min_words)
        .filter_map(BBox::of_words)
        .collect();

    let Some(x0) = lines.iter().map(|b| b.x0).reduce(f64::min) else {
        return Vec::new();
    };
    let x1 = lines.iter().map(|b| b.x1).fold(x0, f64::max);

    lines
        .iter()
        .flat_map(|b| [Ruling::horizontal(b.top, x0, x1), Ruling::horizontal(b.bottom, x0, x1)])
        .collect()
}

/// Column edges where words share a left edge, right edge or center
fn text_column_edges(words: &[Word], min_words: usize) -> Vec<Ruling> {
    let refs: Vec<&Word> = words.iter().collect();
    let mut clusters = cluster_by(&refs, |w| w.x0, 1.0);
    clusters.extend(cluster_by(&refs, |w| w.x1, 1.0));
    clusters.extend(cluster_by(&refs, |w| (w.x0 + w.x1) / 2.0, 1.0));
    // Largest clusters claim their area first
    clusters.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut columns: Vec<BBox> = Vec::new();
    for cluster in clusters.iter().filter(|c| c.len() >= min_words) {
        if let Some(bbox) = BBox::of_words(cluster.iter().copied()) {
            if !columns.iter().any(|c| c.overlaps(&bbox)) {
                columns.push(bbox);
            }
        }
    }
    if columns.is_empty() {
        return Vec::new();
    }

    columns.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    let top = columns.iter().map(|b| b.top).fold(f64::INFINITY, f64::min);
    let bottom = columns.iter().map(|b| b.bottom).fold(f64::NEG_INFINITY, f64::max);
    let right = columns.iter().map(|b| b.x1).fold(f64::NEG_INFINITY, f64::max);

    columns
        .iter()
        .map(|b| Ruling::vertical(b.x0, top, bottom))
        .chain(std::iter::once(Ruling::vertical(right, top, bottom)))
        .collect()
}

/// Snap, join and filter edges of both orientations
fn merge_edges(edges: Vec<Ruling>, settings: &TableSettings) -> Vec<Ruling> {
    let (horizontal, vertical): (Vec<Ruling>, Vec<Ruling>) = edges
        .into_iter()
        .partition(|e| e.orientation == Orientation::Horizontal);

    let mut merged = join_edges(snap_edges(horizontal, settings.snap_tolerance), settings.join_tolerance);
    merged.extend(join_edges(snap_edges(vertical, settings.snap_tolerance), settings.join_tolerance));
    merged.retain(|e| e.length() >= settings.edge_min_length);
    merged
}

/// Move edges with nearby positions onto their cluster's mean position
fn snap_edges(edges: Vec<Ruling>, tolerance: f64) -> Vec<Ruling> {
    let refs: Vec<&Ruling> = edges.iter().collect();
    cluster_by(&refs, |e| e.position, tolerance)
        .into_iter()
        .flat_map(|cluster| {
            let mean = cluster.iter().map(|e| e.position).sum::<f64>() / cluster.len() as f64;
            cluster
                .into_iter()
                .map(move |e| Ruling { position: mean, ..*e })
        })
        .collect()
}

/// Join collinear edges that overlap or leave gaps up to `tolerance`
fn join_edges(mut edges: Vec<Ruling>, tolerance: f64) -> Vec<Ruling> {
    edges.sort_by(|a, b| {
        a.position
            .total_cmp(&b.position)
            .then(a.start.total_cmp(&b.start))
    });

    let mut joined: Vec<Ruling> = Vec::new();
    for edge in edges {
        match joined.last_mut() {
            Some(last) if last.position == edge.position && edge.start <= last.end + tolerance => {
                last.end = last.end.max(edge.end);
            }
            _ => joined.push(edge),
        }
    }
    joined
}

type PointKey = (i64, i64);

fn quantize(v: f64) -> i64 {
    (v * 1000.0).round() as i64
}

#[derive(Debug, Clone)]
struct Crossing {
    x: f64,
    y: f64,
    horizontal: HashSet<usize>,
    vertical: HashSet<usize>,
}

/// Edge crossings keyed by position
#[derive(Debug, Default)]
struct Intersections {
    points: HashMap<PointKey, Crossing>,
}

impl Intersections {
    fn find(edges: &[Ruling], tolerance: f64) -> Self {
        let mut grid = Self::default();
        for (vi, v) in edges.iter().enumerate() {
            if v.orientation != Orientation::Vertical {
                continue;
            }
            for (hi, h) in edges.iter().enumerate() {
                if h.orientation != Orientation::Horizontal {
                    continue;
                }
                let crosses = v.start <= h.position + tolerance
                    && v.end >= h.position - tolerance
                    && v.position >= h.start - tolerance
                    && v.position <= h.end + tolerance;
                if !crosses {
                    continue;
                }
                let crossing = grid
                    .points
                    .entry((quantize(v.position), quantize(h.position)))
                    .or_insert_with(|| Crossing {
                        x: v.position,
                        y: h.position,
                        horizontal: HashSet::new(),
                        vertical: HashSet::new(),
                    });
                crossing.horizontal.insert(hi);
                crossing.vertical.insert(vi);
            }
        }
        grid
    }

    /// Whether two crossings lie on one common edge
    fn connected(&self, a: &PointKey, b: &PointKey) -> bool {
        let (Some(pa), Some(pb)) = (self.points.get(a), self.points.get(b)) else {
            return false;
        };
        (a.0 == b.0 && !pa.vertical.is_disjoint(&pb.vertical))
            || (a.1 == b.1 && !pa.horizontal.is_disjoint(&pb.horizontal))
    }

    fn cells(&self) -> Vec<BBox> {
        let mut keys: Vec<PointKey> = self.points.keys().copied().collect();
        keys.sort();

        let mut cells = Vec::new();
        for (i, corner) in keys.iter().enumerate() {
            let rest = &keys[i + 1..];
            let below: Vec<&PointKey> = rest.iter().filter(|k| k.0 == corner.0).collect();
            let right: Vec<&PointKey> = rest.iter().filter(|k| k.1 == corner.1).collect();

            'search: for b in below.iter().filter(|b| self.connected(corner, b)) {
                for r in right.iter().filter(|r| self.connected(corner, r)) {
                    let opposite = (r.0, b.1);
                    if self.connected(&opposite, r) && self.connected(&opposite, b) {
                        let (tl, br) = (&self.points[corner], &self.points[&opposite]);
                        cells.push(BBox {
                            x0: tl.x,
                            top: tl.y,
                            x1: br.x,
                            bottom: br.y,
                        });
                        break 'search;
                    }
                }
            }
        }
        cells
    }
}

/// Partition cells into tables of corner-sharing cells, top-down
fn group_cells(cells: Vec<BBox>) -> Vec<Vec<BBox>> {
    fn corners(c: &BBox) -> [PointKey; 4] {
        let (x0, x1, t, b) = (quantize(c.x0), quantize(c.x1), quantize(c.top), quantize(c.bottom));
        [(x0, t), (x1, t), (x0, b), (x1, b)]
    }

    let mut remaining = cells;
    let mut tables: Vec<Vec<BBox>> = Vec::new();
    let mut current: Vec<BBox> = Vec::new();
    let mut current_corners: HashSet<PointKey> = HashSet::new();

    while !remaining.is_empty() {
        let before = current.len();
        let mut i = 0;
        while i < remaining.len() {
            let cell_corners = corners(&remaining[i]);
            if current.is_empty() || cell_corners.iter().any(|c| current_corners.contains(c)) {
                current_corners.extend(cell_corners);
                current.push(remaining.remove(i));
            } else {
                i += 1;
            }
        }
        if current.len() == before {
            tables.push(std::mem::take(&mut current));
            current_corners.clear();
        }
    }
    if !current.is_empty() {
        tables.push(current);
    }

    tables.retain(|t| t.len() > 1);
    tables.sort_by(|a, b| {
        let key = |t: &Vec<BBox>| {
            t.iter()
                .map(|c| (c.top, c.x0))
                .fold((f64::INFINITY, f64::INFINITY), |m, k| if k < m { k } else { m })
        };
        let (ka, kb) = (key(a), key(b));
        ka.0.total_cmp(&kb.0).then(ka.1.total_cmp(&kb.1))
    });
    tables
}

/// Lay a cell group out as rows and read each cell's text
fn build_table(page: &PageLayout, cells: &[BBox], settings: &TableSettings) -> Table {
    let mut columns: Vec<f64> = cells.iter().map(|c| c.x0).collect();
    columns.sort_by(f64::total_cmp);
    columns.dedup_by(|a, b| quantize(*a) == quantize(*b));

    let mut tops: Vec<f64> = cells.iter().map(|c| c.top).collect();
    tops.sort_by(f64::total_cmp);
    tops.dedup_by(|a, b| quantize(*a) == quantize(*b));

    let rows = tops
        .iter()
        .map(|top| {
            columns
                .iter()
                .map(|x0| {
                    cells
                        .iter()
                        .find(|c| quantize(c.top) == quantize(*top) && quantize(c.x0) == quantize(*x0))
                        .map(|c| cell_text(page, c, settings))
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| row.iter().any(|c| c.as_deref().is_some_and(|t| !t.is_empty())))
        .collect();

    Table::new(rows)
}

fn cell_text(page: &PageLayout, cell: &BBox, settings: &TableSettings) -> String {
    let glyphs: Vec<&Glyph> = page.glyphs.iter().filter(|g| cell.contains_center(g)).collect();
    text_of(&glyphs, settings.x_tolerance, settings.y_tolerance)
}
