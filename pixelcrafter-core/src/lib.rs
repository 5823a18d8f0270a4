//! Core of PixelCrafter: a layered raster document with selection, undo history, painting tools
//! and filters, independent of any user interface.

pub mod blend;
pub mod color;
pub mod commands;
pub mod compositor;
pub mod filters;
pub mod gradient;
pub mod history;
pub mod id;
pub mod io;
pub mod pattern;
pub mod plugins;
pub mod raster;
pub mod settings;
pub mod state;
pub mod tools;
pub mod util;

pub use id::CraftID;
