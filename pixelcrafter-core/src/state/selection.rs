//! # Selection
//!
//! A canvas-sized coverage mask restricting where tools may paint. Coverage is `0..=255`, tools
//! scale their effect by it. While the selection is inactive, everything is fully covered.

use crate::{
    commands::{CommandConsumer, CommandError, DoUndo},
    filters::kernels,
    raster::RasterError,
    util::Rect,
};

pub mod commands {
    use super::MaskState;
    #[derive(Clone, Debug)]
    pub enum Command {
        /// Whole-mask snapshots, so every selection edit is one command.
        MaskChanged { from: MaskState, to: MaskState },
    }
    impl Command {
        #[must_use]
        pub fn memory_size(&self) -> usize {
            match self {
                Self::MaskChanged { from, to } => from.mask.cells.len() + to.mask.cells.len(),
            }
        }
    }
}
pub mod writer {
    use super::{commands::Command, Region, Selection};
    use crate::history::writer::CommandWrite;

    /// Mutable access to a [`Selection`], recording a command for every change.
    pub struct SelectionWriter<'a, Write> {
        writer: Write,
        state: &'a mut Selection,
    }
    impl<Write> std::ops::Deref for SelectionWriter<'_, Write> {
        type Target = Selection;
        fn deref(&self) -> &Self::Target {
            self.state
        }
    }
    impl<'a, Write: CommandWrite<Command>> SelectionWriter<'a, Write> {
        pub fn new(writer: Write, state: &'a mut Selection) -> Self {
            Self { writer, state }
        }
        /// Run an edit and record it, if it changed anything.
        fn record(&mut self, edit: impl FnOnce(&mut Selection) -> bool) -> bool {
            let from = self.state.mask_state();
            if !edit(self.state) {
                return false;
            }
            let to = self.state.mask_state();
            if from == to {
                return false;
            }
            self.writer.write(Command::MaskChanged { from, to });
            true
        }
        /// See [`Selection::create`].
        pub fn create(&mut self, width: u32, height: u32) -> bool {
            self.record(|selection| {
                selection.create(width, height);
                true
            })
        }
        /// See [`Selection::apply_region`].
        pub fn apply_region(&mut self, region: &Region) -> bool {
            self.record(|selection| selection.apply_region(region))
        }
        pub fn invert(&mut self) -> bool {
            self.record(Selection::invert)
        }
        pub fn grow(&mut self, radius: u32) -> bool {
            self.record(|selection| selection.grow(radius))
        }
        pub fn shrink(&mut self, radius: u32) -> bool {
            self.record(|selection| selection.shrink(radius))
        }
        pub fn feather(&mut self, radius: f32) -> bool {
            self.record(|selection| selection.feather(radius))
        }
        pub fn smooth(&mut self) -> bool {
            self.record(Selection::smooth)
        }
        pub fn clear(&mut self) -> bool {
            self.record(|selection| {
                selection.clear();
                true
            })
        }
        pub fn select_all(&mut self) -> bool {
            self.record(|selection| {
                selection.select_all();
                true
            })
        }
    }
}

#[derive(
    strum::AsRefStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// The mask becomes exactly the new region.
    #[default]
    Replace,
    /// Per-cell maximum of the mask and the region.
    Add,
    /// Remove the region from the mask, but only if they overlap.
    Subtract,
}

/// Grid of coverage values. Reads outside it are zero.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Mask {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}
impl std::fmt::Debug for Mask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mask")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
impl Mask {
    /// All zero.
    ///
    /// # Panics
    /// If larger than [`MAX_PIXELS`](crate::raster::MAX_PIXELS). See [`Mask::try_new`].
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0)
    }
    /// # Panics
    /// If larger than [`MAX_PIXELS`](crate::raster::MAX_PIXELS). See [`Mask::try_filled`].
    #[must_use]
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self::try_filled(width, height, value).expect("mask dimensions too large")
    }
    pub fn try_new(width: u32, height: u32) -> Result<Self, RasterError> {
        Self::try_filled(width, height, 0)
    }
    pub fn try_filled(width: u32, height: u32, value: u8) -> Result<Self, RasterError> {
        let count = crate::raster::pixel_count(width, height)?;
        Ok(Self {
            width,
            height,
            cells: vec![value; count],
        })
    }
    /// Build cell by cell.
    fn from_fn(width: u32, height: u32, mut f: impl FnMut(i32, i32) -> u8) -> Self {
        let mut mask = Self::new(width, height);
        for (x, y) in Rect::canvas(width, height).positions() {
            let value = f(x, y);
            mask.set(x, y, value);
        }
        mask
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    /// Row-major cells.
    #[must_use]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok().filter(|x| *x < self.width)?;
        let y = u32::try_from(y).ok().filter(|y| *y < self.height)?;
        usize::try_from(u64::from(y) * u64::from(self.width) + u64::from(x)).ok()
    }
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        self.index(x, y).map_or(0, |idx| self.cells[idx])
    }
    /// Returns false if out of bounds.
    pub fn set(&mut self, x: i32, y: i32, value: u8) -> bool {
        self.index(x, y)
            .map(|idx| self.cells[idx] = value)
            .is_some()
    }
    /// True if every cell is zero.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.cells.iter().all(|&cell| cell == 0)
    }
    /// Bounding box of the nonzero cells.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        Rect::canvas(self.width, self.height)
            .positions()
            .filter(|&(x, y)| self.get(x, y) != 0)
            .map(|(x, y)| Rect::from_xywh(x, y, 1, 1))
            .reduce(|a, b| a.union(&b))
    }
    fn zip_with(&self, other: &Self, f: impl Fn(u8, u8) -> u8) -> Self {
        Self::from_fn(self.width, self.height, |x, y| {
            f(self.get(x, y), other.get(x, y))
        })
    }
    fn overlaps(&self, other: &Self) -> bool {
        Rect::canvas(self.width, self.height)
            .positions()
            .any(|(x, y)| self.get(x, y) != 0 && other.get(x, y) != 0)
    }
    /// Square-window max (`dilate`) or min (erode) of the given radius, one axis at a time.
    /// Cells outside the mask count as zero.
    fn morph(&self, radius: u32, dilate: bool) -> Self {
        let (width, height) = (self.width as usize, self.height as usize);
        if self.cells.is_empty() {
            return self.clone();
        }
        // Past the longest side, every window already spans the whole line.
        let radius = usize::try_from(radius).unwrap_or(usize::MAX).min(width.max(height));
        let pick: fn(u8, u8) -> u8 = if dilate { u8::max } else { u8::min };

        let mut cells = Vec::with_capacity(self.cells.len());
        for row in self.cells.chunks_exact(width) {
            cells.extend(sliding_extreme(row, radius, pick));
        }
        let mut column = Vec::with_capacity(height);
        for x in 0..width {
            column.clear();
            column.extend((0..height).map(|y| cells[y * width + x]));
            for (y, value) in sliding_extreme(&column, radius, pick).into_iter().enumerate() {
                cells[y * width + x] = value;
            }
        }
        Self {
            width: self.width,
            height: self.height,
            cells,
        }
    }
    fn gaussian(&self, sigma: f32) -> Self {
        let (width, height) = (self.width as usize, self.height as usize);
        let plane: Vec<f32> = self.cells.iter().map(|&cell| f32::from(cell)).collect();
        let blurred =
            kernels::convolve_separable(&plane, width, height, &kernels::gaussian_kernel(sigma));
        Self {
            width: self.width,
            height: self.height,
            cells: blurred
                .into_iter()
                .map(crate::util::to_channel)
                .collect(),
        }
    }
}

/// `pick` folded over `line[i - radius..=i + radius]` for every `i`, zero outside the line.
///
/// van Herk/Gil-Werman: block-wise prefix and suffix runs, so each cell costs the same whatever
/// the radius.
fn sliding_extreme(line: &[u8], radius: usize, pick: fn(u8, u8) -> u8) -> Vec<u8> {
    let window = 2 * radius + 1;
    let mut padded = vec![0; radius];
    padded.extend_from_slice(line);
    padded.resize(line.len() + 2 * radius, 0);

    let mut prefix = padded.clone();
    for idx in 1..padded.len() {
        if idx % window != 0 {
            prefix[idx] = pick(prefix[idx - 1], padded[idx]);
        }
    }
    let mut suffix = padded.clone();
    for idx in (0..padded.len().saturating_sub(1)).rev() {
        if (idx + 1) % window != 0 {
            suffix[idx] = pick(suffix[idx + 1], padded[idx]);
        }
    }
    (0..line.len())
        .map(|idx| pick(suffix[idx], prefix[idx + window - 1]))
        .collect()
}

/// A shape to combine into the selection.
#[derive(Clone, Debug, PartialEq)]
pub enum Region {
    Rect(Rect),
    /// Ellipse inscribed in the rectangle.
    Ellipse(Rect),
    /// Arbitrary coverage, top-left at the canvas origin.
    Mask(Mask),
}
impl Region {
    /// Coverage of this region on a `width` x `height` canvas.
    #[must_use]
    pub fn rasterize(&self, width: u32, height: u32) -> Mask {
        match self {
            Self::Rect(rect) => {
                Mask::from_fn(width, height, |x, y| if rect.contains(x, y) { 255 } else { 0 })
            }
            Self::Ellipse(rect) => {
                let rx = rect.width() as f32 / 2.0;
                let ry = rect.height() as f32 / 2.0;
                let cx = rect.left as f32 + rx;
                let cy = rect.top as f32 + ry;
                Mask::from_fn(width, height, |x, y| {
                    if rx <= 0.0 || ry <= 0.0 {
                        return 0;
                    }
                    let dx = (x as f32 + 0.5 - cx) / rx;
                    let dy = (y as f32 + 0.5 - cy) / ry;
                    if dx * dx + dy * dy <= 1.0 {
                        255
                    } else {
                        0
                    }
                })
            }
            Self::Mask(mask) => Mask::from_fn(width, height, |x, y| mask.get(x, y)),
        }
    }
}

/// The parts of a selection tracked by history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskState {
    pub mask: Mask,
    pub active: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Selection {
    mask: Mask,
    active: bool,
    /// How [`Selection::apply_region`] combines. Not part of history.
    mode: SelectionMode,
}
impl Selection {
    /// Empty and inactive.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            mask: Mask::new(width, height),
            active: false,
            mode: SelectionMode::default(),
        }
    }
    /// Reset to an empty, inactive `width` x `height` mask. The mode is kept.
    pub fn create(&mut self, width: u32, height: u32) {
        self.mask = Mask::new(width, height);
        self.active = false;
    }
    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }
    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }
    #[must_use]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }
    #[must_use]
    pub fn mask_state(&self) -> MaskState {
        MaskState {
            mask: self.mask.clone(),
            active: self.active,
        }
    }
    /// Combine `region` into the mask according to the current mode. Returns whether anything
    /// changed.
    ///
    /// Replace and add activate the selection. Subtract only acts on an active selection that
    /// overlaps the region. A mask left all zero deactivates the selection.
    pub fn apply_region(&mut self, region: &Region) -> bool {
        let region = region.rasterize(self.mask.width, self.mask.height);
        let mask = match self.mode {
            SelectionMode::Replace => region,
            SelectionMode::Add if self.active => self.mask.zip_with(&region, u8::max),
            SelectionMode::Add => region,
            SelectionMode::Subtract => {
                if !self.active || !self.mask.overlaps(&region) {
                    return false;
                }
                self.mask.zip_with(&region, u8::saturating_sub)
            }
        };
        let active = !mask.is_clear();
        let changed = mask != self.mask || active != self.active;
        self.mask = mask;
        self.active = active;
        changed
    }
    /// True if `(x, y)` is on the canvas, the selection is active, and the cell is nonzero.
    #[must_use]
    pub fn is_point_selected(&self, x: i32, y: i32) -> bool {
        self.active && self.mask.get(x, y) != 0
    }
    /// How strongly tools affect `(x, y)`. Fully covered while inactive.
    #[must_use]
    pub fn coverage(&self, x: i32, y: i32) -> u8 {
        if self.active {
            self.mask.get(x, y)
        } else {
            255
        }
    }
    /// Bounding box of the selected cells. None while inactive or empty.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        if self.active {
            self.mask.bounds()
        } else {
            None
        }
    }
    /// Replace the mask after a refinement. Like [`Selection::apply_region`], a mask left all
    /// zero deactivates the selection.
    fn refine(&mut self, mask: Mask) -> bool {
        self.active = !mask.is_clear();
        self.mask = mask;
        true
    }
    /// Complement every cell. Only while active.
    pub fn invert(&mut self) -> bool {
        if !self.active {
            return false;
        }
        let mut mask = std::mem::take(&mut self.mask);
        mask.cells.iter_mut().for_each(|cell| *cell = 255 - *cell);
        self.refine(mask)
    }
    /// Dilate with a square of the given radius. Only while active.
    pub fn grow(&mut self, radius: u32) -> bool {
        if !self.active || radius == 0 {
            return false;
        }
        self.refine(self.mask.morph(radius, true))
    }
    /// Erode with a square of the given radius. Only while active.
    pub fn shrink(&mut self, radius: u32) -> bool {
        if !self.active || radius == 0 {
            return false;
        }
        self.refine(self.mask.morph(radius, false))
    }
    /// Gaussian blur of the mask with sigma `radius`. Only while active.
    pub fn feather(&mut self, radius: f32) -> bool {
        if !self.active || radius.is_nan() || radius <= 0.0 {
            return false;
        }
        self.refine(self.mask.gaussian(radius))
    }
    /// Gaussian blur with sigma 1. Only while active.
    pub fn smooth(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.refine(self.mask.gaussian(1.0))
    }
    pub fn clear(&mut self) {
        self.mask.cells.fill(0);
        self.active = false;
    }
    pub fn select_all(&mut self) {
        self.mask.cells.fill(255);
        self.active = true;
    }
}

impl CommandConsumer<commands::Command> for Selection {
    fn apply(&mut self, command: DoUndo<'_, commands::Command>) -> Result<(), CommandError> {
        use commands::Command;
        match command {
            DoUndo::Do(Command::MaskChanged { from, to })
            | DoUndo::Undo(Command::MaskChanged { from: to, to: from }) => {
                if self.mask != from.mask || self.active != from.active {
                    return Err(CommandError::MismatchedState);
                }
                self.mask = to.mask.clone();
                self.active = to.active;
                Ok(())
            }
        }
    }
}
