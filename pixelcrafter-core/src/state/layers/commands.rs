use super::{Layer, LayerID, LayerProperties};
use crate::{raster::Raster, util::Rect};

/// Active index before and after a structural change.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ActiveChange {
    pub from: Option<usize>,
    pub to: Option<usize>,
}

#[derive(Clone, Debug)]
pub enum Command {
    Inserted {
        index: usize,
        layer: Layer,
        active: ActiveChange,
    },
    /// The layer is kept whole, so undo can restore it exactly.
    Removed {
        index: usize,
        layer: Layer,
        active: ActiveChange,
    },
    Moved {
        target: LayerID,
        from: usize,
        to: usize,
        active: ActiveChange,
    },
    PropertiesChanged {
        target: LayerID,
        from: LayerProperties,
        to: LayerProperties,
    },
    /// `before` and `after` are crops of the layer image at `rect`.
    PixelsChanged {
        target: LayerID,
        rect: Rect,
        before: Raster,
        after: Raster,
    },
    /// The whole image, which may change size.
    ImageReplaced {
        target: LayerID,
        before: Raster,
        after: Raster,
    },
    ActiveChanged {
        from: Option<usize>,
        to: Option<usize>,
    },
}
impl Command {
    /// Rough heap footprint of the captured state.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        match self {
            Self::Inserted { layer, .. } | Self::Removed { layer, .. } => {
                layer.image().byte_len() + layer.name().len()
            }
            Self::PropertiesChanged { from, to, .. } => from.name.len() + to.name.len(),
            Self::PixelsChanged { before, after, .. } | Self::ImageReplaced { before, after, .. } => {
                before.byte_len() + after.byte_len()
            }
            Self::Moved { .. } | Self::ActiveChanged { .. } => 0,
        }
    }
}
