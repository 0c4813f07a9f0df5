//! Positioned glyphs and ruling lines collected from PDF pages
//!
//! `pdf-extract` walks the content streams and reports every glyph with its
//! text rendering matrix and every stroked or filled path. [`LayoutCollector`]
//! turns those callbacks into page-space geometry with a top-left origin, the
//! coordinate system table detection works in.

use pdf_extract::{ColorSpace, MediaBox, OutputDev, OutputError, Path, PathOp, Transform};

/// Segments closer to axis-aligned than this are treated as rulings
const AXIS_TOLERANCE: f64 = 0.5;

/// One rendered glyph in page space (y grows downwards)
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Glyph {
    pub fn new(text: impl Into<String>, x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
            bottom,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.top + self.bottom) / 2.0)
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Glyphs merged into a word
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Word {
    fn start(glyph: &Glyph) -> Self {
        Self {
            text: glyph.text.clone(),
            x0: glyph.x0,
            x1: glyph.x1,
            top: glyph.top,
            bottom: glyph.bottom,
        }
    }

    fn push(&mut self, glyph: &Glyph) {
        self.text.push_str(&glyph.text);
        self.x0 = self.x0.min(glyph.x0);
        self.x1 = self.x1.max(glyph.x1);
        self.top = self.top.min(glyph.top);
        self.bottom = self.bottom.max(glyph.bottom);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An axis-aligned line segment
///
/// `position` is the y of a horizontal ruling or the x of a vertical one;
/// `start..end` is its extent along the other axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruling {
    pub orientation: Orientation,
    pub position: f64,
    pub start: f64,
    pub end: f64,
}

impl Ruling {
    pub fn horizontal(y: f64, x0: f64, x1: f64) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            position: y,
            start: x0.min(x1),
            end: x0.max(x1),
        }
    }

    pub fn vertical(x: f64, top: f64, bottom: f64) -> Self {
        Self {
            orientation: Orientation::Vertical,
            position: x,
            start: top.min(bottom),
            end: top.max(bottom),
        }
    }

    /// Ruling for a segment, `None` when it is diagonal
    pub fn from_segment(from: (f64, f64), to: (f64, f64)) -> Option<Self> {
        let (dx, dy) = ((to.0 - from.0).abs(), (to.1 - from.1).abs());
        if dy <= AXIS_TOLERANCE {
            Some(Self::horizontal((from.1 + to.1) / 2.0, from.0, to.0))
        } else if dx <= AXIS_TOLERANCE {
            Some(Self::vertical((from.0 + to.0) / 2.0, from.1, to.1))
        } else {
            None
        }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// Geometry of one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    /// 1-based page number
    pub number: u32,
    pub width: f64,
    pub height: f64,
    pub glyphs: Vec<Glyph>,
    pub rulings: Vec<Ruling>,
}

impl PageLayout {
    pub fn new(number: u32, width: f64, height: f64) -> Self {
        Self {
            number,
            width,
            height,
            ..Self::default()
        }
    }

    /// All words on the page, in reading order
    pub fn words(&self, x_tolerance: f64, y_tolerance: f64) -> Vec<Word> {
        let glyphs: Vec<&Glyph> = self.glyphs.iter().collect();
        group_lines(&glyphs, y_tolerance)
            .iter()
            .flat_map(|line| line_words(line, x_tolerance))
            .collect()
    }

    /// Plain text of the page: words joined by spaces, lines by newlines
    pub fn text(&self) -> String {
        let glyphs: Vec<&Glyph> = self.glyphs.iter().collect();
        text_of(&glyphs, 3.0, 3.0)
    }
}

/// Group glyphs into lines by their top edge, each line sorted left to right
pub fn group_lines<'a>(glyphs: &[&'a Glyph], y_tolerance: f64) -> Vec<Vec<&'a Glyph>> {
    let mut sorted: Vec<&Glyph> = glyphs.to_vec();
    sorted.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0)));

    let mut lines: Vec<Vec<&Glyph>> = Vec::new();
    let mut line_top = f64::NEG_INFINITY;
    for glyph in sorted {
        match lines.last_mut() {
            Some(line) if (glyph.top - line_top).abs() <= y_tolerance => line.push(glyph),
            _ => {
                line_top = glyph.top;
                lines.push(vec![glyph]);
            }
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    }
    lines
}

/// Split one line of glyphs into words at blanks and horizontal gaps
pub fn line_words(line: &[&Glyph], x_tolerance: f64) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current: Option<Word> = None;

    for glyph in line {
        if glyph.is_blank() {
            words.extend(current.take());
            continue;
        }
        match current.as_mut() {
            Some(word) if glyph.x0 - word.x1 <= x_tolerance => word.push(glyph),
            _ => {
                words.extend(current.take());
                current = Some(Word::start(glyph));
            }
        }
    }
    words.extend(current);
    words
}

/// Text of a glyph set, laid out as lines of space-separated words
pub fn text_of(glyphs: &[&Glyph], x_tolerance: f64, y_tolerance: f64) -> String {
    group_lines(glyphs, y_tolerance)
        .iter()
        .map(|line| {
            line_words(line, x_tolerance)
                .into_iter()
                .map(|w| w.text)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// [`OutputDev`] that records page geometry instead of rendering
#[derive(Debug, Default)]
pub struct LayoutCollector {
    pages: Vec<PageLayout>,
    current: Option<PageLayout>,
    /// Media box height plus its lower bound, for flipping y
    flip: f64,
}

impl LayoutCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_pages(mut self) -> Vec<PageLayout> {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        self.pages
    }

    fn to_page_space(&self, ctm: &Transform, x: f64, y: f64) -> (f64, f64) {
        let px = x * ctm.m11 + y * ctm.m21 + ctm.m31;
        let py = x * ctm.m12 + y * ctm.m22 + ctm.m32;
        (px, self.flip - py)
    }

    fn add_path(&mut self, ctm: &Transform, path: &Path) {
        let mut segments: Vec<((f64, f64), (f64, f64))> = Vec::new();
        let mut cursor: Option<(f64, f64)> = None;
        let mut subpath_start: Option<(f64, f64)> = None;

        for op in &path.ops {
            match *op {
                PathOp::MoveTo(x, y) => {
                    let point = self.to_page_space(ctm, x, y);
                    cursor = Some(point);
                    subpath_start = Some(point);
                }
                PathOp::LineTo(x, y) => {
                    let point = self.to_page_space(ctm, x, y);
                    if let Some(from) = cursor {
                        segments.push((from, point));
                    }
                    cursor = Some(point);
                }
                PathOp::CurveTo(_, _, _, _, x, y) => {
                    cursor = Some(self.to_page_space(ctm, x, y));
                }
                PathOp::Rect(x, y, w, h) => {
                    let corners = [
                        self.to_page_space(ctm, x, y),
                        self.to_page_space(ctm, x + w, y),
                        self.to_page_space(ctm, x + w, y + h),
                        self.to_page_space(ctm, x, y + h),
                    ];
                    for i in 0..4 {
                        segments.push((corners[i], corners[(i + 1) % 4]));
                    }
                    cursor = Some(corners[0]);
                    subpath_start = Some(corners[0]);
                }
                PathOp::Close => {
                    if let (Some(from), Some(start)) = (cursor, subpath_start) {
                        segments.push((from, start));
                        cursor = Some(start);
                    }
                }
            }
        }

        if let Some(page) = self.current.as_mut() {
            page.rulings.extend(
                segments
                    .into_iter()
                    .filter_map(|(from, to)| Ruling::from_segment(from, to)),
            );
        }
    }
}

impl OutputDev for LayoutCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        self.flip = media_box.ury;
        self.current = Some(PageLayout::new(
            page_num,
            media_box.urx - media_box.llx,
            media_box.ury - media_box.lly,
        ));
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        let vx = font_size * (trm.m11 + trm.m21);
        let vy = font_size * (trm.m12 + trm.m22);
        let size = (vx * vy).abs().sqrt();
        let x0 = trm.m31;
        let baseline = self.flip - trm.m32;

        if let Some(page) = self.current.as_mut() {
            page.glyphs.push(Glyph::new(
                char,
                x0,
                baseline - size,
                x0 + width * size,
                baseline + size * 0.2,
            ));
        }
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn stroke(
        &mut self,
        ctm: &Transform,
        _colorspace: &ColorSpace,
        _color: &[f64],
        path: &Path,
    ) -> Result<(), OutputError> {
        self.add_path(ctm, path);
        Ok(())
    }

    fn fill(
        &mut self,
        ctm: &Transform,
        _colorspace: &ColorSpace,
        _color: &[f64],
        path: &Path,
    ) -> Result<(), OutputError> {
        self.add_path(ctm, path);
        Ok(())
    }
}
