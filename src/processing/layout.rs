use crate::config::GridOptions;

/// Largest size with the source aspect ratio that fits `target`.
///
/// Scales up as well as down.
pub fn fit_within(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let scale = (target_w as f32 / iw).min(target_h as f32 / ih);
    let scale = if scale.is_finite() { scale } else { 1.0 };
    let w = (iw * scale).round().max(1.0);
    let h = (ih * scale).round().max(1.0);
    (w as u32, h as u32)
}

/// Like [`fit_within`], but never enlarges.
pub fn shrink_within(src_w: u32, src_h: u32, bound_w: u32, bound_h: u32) -> (u32, u32) {
    if src_w <= bound_w && src_h <= bound_h {
        return (src_w.max(1), src_h.max(1));
    }
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let scale = (bound_w as f32 / iw).min(bound_h as f32 / ih);
    let w = (iw * scale).round().clamp(1.0, bound_w.max(1) as f32);
    let h = (ih * scale).round().clamp(1.0, bound_h.max(1) as f32);
    (w as u32, h as u32)
}

/// Axis-aligned placement in window coordinates (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Page grid: `columns` x `rows` cells separated by `padding`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub columns: u32,
    pub rows: u32,
    pub padding: f32,
}

impl From<GridOptions> for GridLayout {
    fn from(opts: GridOptions) -> Self {
        Self {
            columns: opts.columns.max(1),
            rows: opts.rows.max(1),
            padding: opts.padding,
        }
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        GridOptions::default().into()
    }
}

impl GridLayout {
    pub fn page_size(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    pub fn cell_size(&self, viewport_w: u32, viewport_h: u32) -> (f32, f32) {
        let cols = self.columns as f32;
        let rows = self.rows as f32;
        let cell_w = (viewport_w as f32 - (cols + 1.0) * self.padding) / cols;
        let cell_h = (viewport_h as f32 - (rows + 1.0) * self.padding) / rows;
        (cell_w.max(0.0), cell_h.max(0.0))
    }

    /// Cell rectangle for slot `pos`; row 0 is the top row.
    pub fn cell(&self, pos: usize, viewport_w: u32, viewport_h: u32) -> Rect {
        let (cell_w, cell_h) = self.cell_size(viewport_w, viewport_h);
        let col = (pos % self.columns as usize) as f32;
        let row = (pos / self.columns as usize) as f32;
        Rect {
            x: self.padding + col * (cell_w + self.padding),
            y: viewport_h as f32 - self.padding - (row + 1.0) * cell_h - row * self.padding,
            width: cell_w,
            height: cell_h,
        }
    }

    /// Scale an image of `src_w` x `src_h` into its cell and center it.
    pub fn place(
        &self,
        pos: usize,
        src_w: u32,
        src_h: u32,
        viewport_w: u32,
        viewport_h: u32,
    ) -> Rect {
        let cell = self.cell(pos, viewport_w, viewport_h);
        if src_w == 0 || src_h == 0 {
            return Rect {
                x: cell.x,
                y: cell.y,
                width: 0.0,
                height: 0.0,
            };
        }
        let scale = (cell.width / src_w as f32).min(cell.height / src_h as f32);
        let width = src_w as f32 * scale;
        let height = src_h as f32 * scale;
        Rect {
            x: cell.x + (cell.width - width) / 2.0,
            y: cell.y + (cell.height - height) / 2.0,
            width,
            height,
        }
    }
}

/// Offset that centers `inner` inside `outer`.
pub fn center_offset(inner_w: u32, inner_h: u32, outer_w: u32, outer_h: u32) -> (u32, u32) {
    let ox = outer_w.saturating_sub(inner_w) / 2;
    let oy = outer_h.saturating_sub(inner_h) / 2;
    (ox, oy)
}
