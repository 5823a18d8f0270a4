//! # Filters
//!
//! Whole-image effects. Each [`Filter`] is one of a closed set of [`FilterKind`]s together with
//! its tunable parameters, addressed by string key so front ends can drive them generically.
//! The [`FilterRegistry`] looks filters up by display name and groups them by category.

pub mod kernels;

use crate::{color::Color, raster::Raster, util::to_channel};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("{filter} has no parameter \"{key}\"")]
    UnknownParameter { filter: FilterKind, key: String },
    #[error("parameter \"{key}\" must be finite, got {value}")]
    NotFinite { key: String, value: f32 },
}

#[derive(
    strum::AsRefStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
)]
pub enum FilterKind {
    #[strum(serialize = "Gaussian Blur")]
    GaussianBlur,
    Sharpen,
    Brightness,
    Contrast,
    Saturation,
    Emboss,
    #[strum(serialize = "Edge Enhance")]
    EdgeEnhance,
    Invert,
    Grayscale,
}
impl FilterKind {
    #[must_use]
    pub fn category(self) -> FilterCategory {
        match self {
            Self::GaussianBlur => FilterCategory::Blur,
            Self::Sharpen | Self::EdgeEnhance => FilterCategory::Sharpen,
            Self::Brightness | Self::Contrast | Self::Saturation => FilterCategory::Adjust,
            Self::Emboss => FilterCategory::Stylize,
            Self::Invert | Self::Grayscale => FilterCategory::Color,
        }
    }
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::GaussianBlur => "Blur with a Gaussian of the given radius",
            Self::Sharpen => "Push pixels away from a smoothed copy of the image",
            Self::Brightness => "Scale color channels",
            Self::Contrast => "Push channels away from the mean luminance",
            Self::Saturation => "Push channels away from each pixel's luminance",
            Self::Emboss => "Relief effect on mid-gray",
            Self::EdgeEnhance => "Strongly enhance edges",
            Self::Invert => "Invert color channels",
            Self::Grayscale => "Replace color with luminance",
        }
    }
    /// Parameter keys and their defaults.
    #[must_use]
    pub fn default_parameters(self) -> &'static [(&'static str, f32)] {
        match self {
            Self::GaussianBlur => &[("radius", 2.0)],
            Self::Sharpen => &[("factor", 2.0)],
            Self::Brightness | Self::Contrast | Self::Saturation => &[("factor", 1.0)],
            Self::Emboss | Self::EdgeEnhance | Self::Invert | Self::Grayscale => &[],
        }
    }
}

#[derive(
    strum::AsRefStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Debug,
)]
pub enum FilterCategory {
    Blur,
    Sharpen,
    Adjust,
    Stylize,
    Color,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    kind: FilterKind,
    parameters: smallvec::SmallVec<[(&'static str, f32); 1]>,
}
impl From<FilterKind> for Filter {
    fn from(kind: FilterKind) -> Self {
        Self {
            kind,
            parameters: kind.default_parameters().into(),
        }
    }
}
impl Filter {
    #[must_use]
    pub fn kind(&self) -> FilterKind {
        self.kind
    }
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind.into()
    }
    #[must_use]
    pub fn category(&self) -> FilterCategory {
        self.kind.category()
    }
    #[must_use]
    pub fn parameters(&self) -> &[(&'static str, f32)] {
        &self.parameters
    }
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<f32> {
        self.parameters
            .iter()
            .find_map(|&(name, value)| (name == key).then_some(value))
    }
    fn slot(&mut self, key: &str, value: f32) -> Result<&mut f32, FilterError> {
        if !value.is_finite() {
            return Err(FilterError::NotFinite {
                key: key.to_owned(),
                value,
            });
        }
        let filter = self.kind;
        self.parameters
            .iter_mut()
            .find_map(|(name, value)| (*name == key).then_some(value))
            .ok_or_else(|| FilterError::UnknownParameter {
                filter,
                key: key.to_owned(),
            })
    }
    pub fn set_parameter(&mut self, key: &str, value: f32) -> Result<(), FilterError> {
        *self.slot(key, value)? = value;
        Ok(())
    }
    /// Set several parameters. If any is rejected, none are changed.
    pub fn set_parameters(&mut self, parameters: &[(&str, f32)]) -> Result<(), FilterError> {
        let mut updated = self.clone();
        for &(key, value) in parameters {
            updated.set_parameter(key, value)?;
        }
        *self = updated;
        Ok(())
    }
    /// Filtered copy of `image` using the current parameters.
    #[must_use]
    pub fn apply(&self, image: &Raster) -> Raster {
        let factor = || self.parameter("factor").unwrap_or(1.0);
        match self.kind {
            FilterKind::GaussianBlur => {
                gaussian_blur(image, self.parameter("radius").unwrap_or(0.0))
            }
            FilterKind::Sharpen => {
                let smooth = kernels::convolve3x3(
                    image,
                    &[[1.0, 1.0, 1.0], [1.0, 5.0, 1.0], [1.0, 1.0, 1.0]],
                    13.0,
                    0.0,
                );
                extrapolate(&smooth, image, factor())
            }
            FilterKind::Brightness => {
                let factor = factor();
                map_channels(image, |_, channel| channel * factor)
            }
            FilterKind::Contrast => {
                let factor = factor();
                let mean = mean_luminance(image);
                map_channels(image, |_, channel| mean + factor * (channel - mean))
            }
            FilterKind::Saturation => {
                let factor = factor();
                map_channels(image, |color, channel| {
                    let luma = f32::from(color.luminance());
                    luma + factor * (channel - luma)
                })
            }
            FilterKind::Emboss => kernels::convolve3x3(
                image,
                &[[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]],
                1.0,
                128.0,
            ),
            FilterKind::EdgeEnhance => kernels::convolve3x3(
                image,
                &[[-1.0, -1.0, -1.0], [-1.0, 9.0, -1.0], [-1.0, -1.0, -1.0]],
                1.0,
                0.0,
            ),
            FilterKind::Invert => map_pixels(image, Color::inverted),
            FilterKind::Grayscale => map_pixels(image, |color| {
                let luma = color.luminance();
                Color::rgba(luma, luma, luma, color.alpha())
            }),
        }
    }
    /// Apply with some parameters overridden for this call only.
    pub fn apply_with(
        &self,
        image: &Raster,
        parameters: &[(&str, f32)],
    ) -> Result<Raster, FilterError> {
        if parameters.is_empty() {
            return Ok(self.apply(image));
        }
        let mut filter = self.clone();
        filter.set_parameters(parameters)?;
        Ok(filter.apply(image))
    }
}

fn map_pixels(image: &Raster, f: impl Fn(Color) -> Color) -> Raster {
    let mut out = image.clone();
    out.pixels_mut().iter_mut().for_each(|pixel| *pixel = f(*pixel));
    out
}
/// Map the color channels as `[0, 255]` floats, keeping alpha.
fn map_channels(image: &Raster, f: impl Fn(Color, f32) -> f32) -> Raster {
    map_pixels(image, |color| {
        let [r, g, b, a] = color.0;
        let [r, g, b] = [r, g, b].map(|channel| to_channel(f(color, f32::from(channel))));
        Color::rgba(r, g, b, a)
    })
}
/// `base + factor * (image - base)`, per color channel.
fn extrapolate(base: &Raster, image: &Raster, factor: f32) -> Raster {
    let mut out = image.clone();
    for (pixel, degenerate) in out.pixels_mut().iter_mut().zip(base.pixels()) {
        for channel in 0..3 {
            let from = f32::from(degenerate.0[channel]);
            let to = f32::from(pixel.0[channel]);
            pixel.0[channel] = to_channel(from + factor * (to - from));
        }
    }
    out
}
fn mean_luminance(image: &Raster) -> f32 {
    let pixels = image.pixels();
    if pixels.is_empty() {
        return 0.0;
    }
    let total: u64 = pixels
        .iter()
        .map(|color| u64::from(color.luminance()))
        .sum();
    // Rounded to a whole level.
    (total as f64 / pixels.len() as f64).round() as f32
}
fn gaussian_blur(image: &Raster, radius: f32) -> Raster {
    let kernel = kernels::gaussian_kernel(radius);
    if kernel.len() <= 1 {
        return image.clone();
    }
    let (width, height) = (image.width() as usize, image.height() as usize);
    let planes = kernels::to_planes(image)
        .map(|plane| kernels::convolve_separable(&plane, width, height, &kernel));
    kernels::from_planes(image.width(), image.height(), &planes)
}

/// Filters by name, grouped by category in registration order.
#[derive(Clone, Debug)]
pub struct FilterRegistry {
    filters: hashbrown::HashMap<String, Filter>,
    categories: hashbrown::HashMap<FilterCategory, Vec<String>>,
}
impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
impl FilterRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            filters: hashbrown::HashMap::new(),
            categories: hashbrown::HashMap::new(),
        }
    }
    /// Every [`FilterKind`] with default parameters.
    #[must_use]
    pub fn with_builtin() -> Self {
        use strum::IntoEnumIterator;
        let mut registry = Self::empty();
        for kind in FilterKind::iter() {
            registry.register(kind.into());
        }
        registry
    }
    /// Returns false, leaving the registry unchanged, if the name is taken.
    pub fn register(&mut self, filter: Filter) -> bool {
        let name = filter.name();
        if self.filters.contains_key(name) {
            log::warn!("Filter \"{name}\" already registered");
            return false;
        }
        self.categories
            .entry(filter.category())
            .or_default()
            .push(name.to_owned());
        self.filters.insert(name.to_owned(), filter);
        true
    }
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Filter> {
        self.filters.get(name)
    }
    /// For changing the stored parameters.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Filter> {
        self.filters.get_mut(name)
    }
    /// Sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
    /// Categories with at least one filter, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<FilterCategory> {
        let mut categories: Vec<_> = self.categories.keys().copied().collect();
        categories.sort_unstable();
        categories
    }
    #[must_use]
    pub fn by_category(&self, category: FilterCategory) -> Vec<&Filter> {
        self.categories
            .get(&category)
            .into_iter()
            .flatten()
            .filter_map(|name| self.filters.get(name))
            .collect()
    }
    /// Run the named filter with its stored parameters, overridden by `parameters`.
    /// `None` if there is no such filter.
    pub fn apply(
        &self,
        name: &str,
        image: &Raster,
        parameters: &[(&str, f32)],
    ) -> Option<Result<Raster, FilterError>> {
        Some(self.get(name)?.apply_with(image, parameters))
    }
}
