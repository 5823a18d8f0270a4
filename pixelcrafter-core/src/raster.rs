//! Owned, row-major RGBA8 pixel buffers.

use crate::{color::Color, util::Rect};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterError {
    #[error("{width}x{height} image needs {expected} bytes, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("{width}x{height} image is too large")]
    TooLarge { width: u32, height: u32 },
}

/// A `width` x `height` grid of straight-alpha colors. Zero-sized rasters are fine.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}
impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Pixel dumps are useless in logs.
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Largest image or mask, in pixels. 16384 x 16384.
pub const MAX_PIXELS: usize = 1 << 28;

/// `width * height`, if no more than [`MAX_PIXELS`].
pub fn pixel_count(width: u32, height: u32) -> Result<usize, RasterError> {
    usize::try_from(u64::from(width) * u64::from(height))
        .ok()
        .filter(|&count| count <= MAX_PIXELS)
        .ok_or(RasterError::TooLarge { width, height })
}
impl Raster {
    /// Fully transparent.
    ///
    /// # Panics
    /// If larger than [`MAX_PIXELS`]. See [`Raster::try_new`].
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Color::TRANSPARENT)
    }
    /// # Panics
    /// If larger than [`MAX_PIXELS`]. See [`Raster::try_filled`].
    #[must_use]
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self::try_filled(width, height, color).expect("raster dimensions too large")
    }
    pub fn try_new(width: u32, height: u32) -> Result<Self, RasterError> {
        Self::try_filled(width, height, Color::TRANSPARENT)
    }
    pub fn try_filled(width: u32, height: u32, color: Color) -> Result<Self, RasterError> {
        let count = pixel_count(width, height)?;
        Ok(Self {
            width,
            height,
            pixels: vec![color; count],
        })
    }
    /// Take ownership of tightly packed RGBA8 bytes.
    pub fn from_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, RasterError> {
        let expected = pixel_count(width, height)? * 4;
        if bytes.len() != expected {
            return Err(RasterError::SizeMismatch {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            width,
            height,
            // Color has alignment 1, this never fails.
            pixels: bytemuck::cast_slice(bytes).to_vec(),
        })
    }
    /// Tightly packed RGBA8 bytes, row-major.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::canvas(self.width, self.height)
    }
    #[must_use]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }
    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok().filter(|x| *x < self.width)?;
        let y = u32::try_from(y).ok().filter(|y| *y < self.height)?;
        usize::try_from(u64::from(y) * u64::from(self.width) + u64::from(x)).ok()
    }
    /// None if out of bounds.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|idx| self.pixels[idx])
    }
    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut Color> {
        self.index(x, y).map(|idx| &mut self.pixels[idx])
    }
    /// Set a pixel. Returns false if out of bounds.
    pub fn put(&mut self, x: i32, y: i32, color: Color) -> bool {
        self.get_mut(x, y).map(|pixel| *pixel = color).is_some()
    }
    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }
    /// Fill the part of `rect` that lies on this raster.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(rect) = rect.clip(self.width, self.height) else {
            return;
        };
        for (x, y) in rect.positions() {
            self.put(x, y, color);
        }
    }
    /// Copy out the part of `rect` that lies on this raster. The result has the clipped size,
    /// empty if `rect` misses entirely.
    #[must_use]
    pub fn crop(&self, rect: Rect) -> Self {
        let Some(rect) = rect.clip(self.width, self.height) else {
            return Self::default();
        };
        let mut out = Self::new(rect.width(), rect.height());
        for (x, y) in rect.positions() {
            if let Some(color) = self.get(x, y) {
                out.put(x - rect.left, y - rect.top, color);
            }
        }
        out
    }
    /// Overwrite pixels with `source`, its top-left placed at `(x, y)`. Off-raster parts are dropped.
    pub fn paste(&mut self, source: &Self, x: i32, y: i32) {
        let target = Rect::from_xywh(x, y, source.width, source.height);
        let Some(target) = target.clip(self.width, self.height) else {
            return;
        };
        for (tx, ty) in target.positions() {
            if let Some(color) = source.get(tx - x, ty - y) {
                self.put(tx, ty, color);
            }
        }
    }
    /// Pixel count in bytes, for memory bookkeeping.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<Color>()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn byte_exchange() {
        let bytes: Vec<u8> = (0..24).collect();
        let raster = Raster::from_bytes(3, 2, &bytes).unwrap();
        assert_eq!(raster.get(1, 0), Some(Color::rgba(4, 5, 6, 7)));
        assert_eq!(raster.get(0, 1), Some(Color::rgba(12, 13, 14, 15)));
        assert_eq!(raster.as_bytes(), bytes.as_slice());

        assert_eq!(
            Raster::from_bytes(3, 2, &bytes[..23]),
            Err(RasterError::SizeMismatch {
                width: 3,
                height: 2,
                expected: 24,
                actual: 23
            })
        );
    }
    #[test]
    fn zero_sized() {
        let raster = Raster::new(0, 10);
        assert!(raster.pixels().is_empty());
        assert_eq!(raster.get(0, 0), None);
        assert_eq!(Raster::from_bytes(0, 0, &[]), Ok(Raster::new(0, 0)));
    }
    #[test]
    fn size_limit() {
        let huge = RasterError::TooLarge {
            width: 4_000_000_000,
            height: 4_000_000_000,
        };
        assert_eq!(Raster::try_new(4_000_000_000, 4_000_000_000), Err(huge.clone()));
        assert_eq!(Raster::from_bytes(4_000_000_000, 4_000_000_000, &[]), Err(huge));
        assert!(Raster::try_new(16385, 16384).is_err());
        assert_eq!(pixel_count(16384, 16384), Ok(MAX_PIXELS));
        assert_eq!(Raster::try_filled(2, 1, Color::BLACK).map(|r| r.get(1, 0)), Ok(Some(Color::BLACK)));
    }
    #[test]
    fn out_of_bounds_access() {
        let mut raster = Raster::new(4, 4);
        assert!(!raster.put(-1, 0, Color::BLACK));
        assert!(!raster.put(4, 0, Color::BLACK));
        assert_eq!(raster.get(0, 4), None);
        raster.fill_rect(Rect::from_xywh(-2, -2, 4, 4), Color::WHITE);
        assert_eq!(raster.get(1, 1), Some(Color::WHITE));
        assert_eq!(raster.get(2, 2), Some(Color::TRANSPARENT));
    }
    #[test]
    fn crop_and_paste() {
        let mut raster = Raster::new(4, 4);
        raster.put(2, 2, Color::BLACK);
        let crop = raster.crop(Rect::from_xywh(2, 2, 10, 10));
        assert_eq!((crop.width(), crop.height()), (2, 2));
        assert_eq!(crop.get(0, 0), Some(Color::BLACK));

        let mut other = Raster::new(4, 4);
        other.paste(&crop, 1, 1);
        assert_eq!(other.get(1, 1), Some(Color::BLACK));
        other.paste(&crop, 3, 3);
        assert_eq!(other.get(3, 3), Some(Color::BLACK));
    }
}
