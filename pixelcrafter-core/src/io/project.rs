//! Project format.
//!
//! ```json
//! {
//!   "version": 1,
//!   "name": "Untitled",
//!   "width": 640, "height": 480,
//!   "active": 0,
//!   "layers": [
//!     { "name": "Background", "visible": true, "opacity": 1.0, "blend_mode": "normal",
//!       "locked": false, "width": 640, "height": 480, "pixels": "<base64 RGBA8>" }
//!   ],
//!   "metadata": {}
//! }
//! ```
//! Layers are listed bottom to top.

use base64::Engine as _;

use crate::{
    blend::{Blend, BlendMode},
    raster::{Raster, RasterError},
    state::{
        layers::{Layer, LayerProperties, LayerStack},
        Document,
    },
};

pub const PROJECT_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed project: {0}")]
    Json(#[from] serde_json::Error),
    #[error("pixels of layer \"{layer}\" are not valid base64")]
    Base64 {
        layer: String,
        #[source]
        source: base64::DecodeError,
    },
    #[error("pixels of layer \"{layer}\" don't match its size")]
    Raster {
        layer: String,
        #[source]
        source: RasterError,
    },
    #[error("{width}x{height} canvas is too large")]
    TooLarge { width: u32, height: u32 },
    #[error("project version {0} is not supported")]
    UnsupportedVersion(u32),
    #[error("active layer {active} out of range for {layers} layers")]
    ActiveOutOfRange { active: usize, layers: usize },
}

#[derive(serde::Serialize, serde::Deserialize)]
struct LayerRecord {
    name: String,
    visible: bool,
    opacity: f32,
    #[serde(default)]
    blend_mode: BlendMode,
    #[serde(default)]
    locked: bool,
    width: u32,
    height: u32,
    pixels: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ProjectFile {
    version: u32,
    #[serde(default)]
    name: String,
    width: u32,
    height: u32,
    active: Option<usize>,
    layers: Vec<LayerRecord>,
    #[serde(default)]
    metadata: serde_json::Value,
}

impl From<&Layer> for LayerRecord {
    fn from(layer: &Layer) -> Self {
        Self {
            name: layer.name().to_owned(),
            visible: layer.visible(),
            opacity: layer.opacity(),
            blend_mode: layer.blend_mode(),
            locked: layer.locked(),
            width: layer.width(),
            height: layer.height(),
            pixels: base64::engine::general_purpose::STANDARD.encode(layer.image().as_bytes()),
        }
    }
}
impl TryFrom<LayerRecord> for Layer {
    type Error = ProjectError;
    fn try_from(record: LayerRecord) -> Result<Self, Self::Error> {
        let bytes = match base64::engine::general_purpose::STANDARD.decode(&record.pixels) {
            Ok(bytes) => bytes,
            Err(source) => {
                return Err(ProjectError::Base64 {
                    layer: record.name,
                    source,
                })
            }
        };
        let image = match Raster::from_bytes(record.width, record.height, &bytes) {
            Ok(image) => image,
            Err(source) => {
                return Err(ProjectError::Raster {
                    layer: record.name,
                    source,
                })
            }
        };
        Ok(Layer::from_parts(
            LayerProperties {
                name: record.name,
                visible: record.visible,
                blend: Blend::new(record.blend_mode, record.opacity),
                locked: record.locked,
            },
            image,
        ))
    }
}

/// Write the whole document. History is not saved.
pub fn save(document: &Document, writer: impl std::io::Write) -> Result<(), ProjectError> {
    let file = ProjectFile {
        version: PROJECT_VERSION,
        name: document.name.clone(),
        width: document.width(),
        height: document.height(),
        active: document.layers().active_index(),
        layers: document.layers().iter().map(LayerRecord::from).collect(),
        metadata: document.metadata.clone(),
    };
    serde_json::to_writer(writer, &file)?;
    Ok(())
}

/// Read a document written by [`save`]. It starts with an empty history.
pub fn load(reader: impl std::io::Read) -> Result<Document, ProjectError> {
    let file: ProjectFile = serde_json::from_reader(reader)?;
    if file.version > PROJECT_VERSION {
        return Err(ProjectError::UnsupportedVersion(file.version));
    }
    if crate::raster::pixel_count(file.width, file.height).is_err() {
        return Err(ProjectError::TooLarge {
            width: file.width,
            height: file.height,
        });
    }
    let layers = file
        .layers
        .into_iter()
        .map(Layer::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(active) = file.active.filter(|&active| active >= layers.len()) {
        return Err(ProjectError::ActiveOutOfRange {
            active,
            layers: layers.len(),
        });
    }
    let metadata = match file.metadata {
        serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
        metadata => metadata,
    };
    let count = layers.len();
    let document = Document::from_parts(
        file.name,
        file.width,
        file.height,
        LayerStack::from_layers(layers, file.active),
        metadata,
    );
    log::debug!(
        "Loaded \"{}\" ({}x{}, {count} layers)",
        document.name,
        document.width(),
        document.height()
    );
    Ok(document)
}

pub fn save_path(document: &Document, path: impl AsRef<std::path::Path>) -> Result<(), ProjectError> {
    use std::io::Write as _;
    let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    save(document, &mut writer)?;
    writer.flush()?;
    Ok(())
}

pub fn load_path(path: impl AsRef<std::path::Path>) -> Result<Document, ProjectError> {
    let reader = std::io::BufReader::new(std::fs::File::open(path)?);
    load(reader)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{color::Color, util::Rect};

    fn sample() -> Document {
        let mut document = Document::new("sample", 4, 3);
        document.add_layer("bottom");
        let top = document.add_layer("top");
        document.write_with("Setup", |writer| {
            let mut layers = writer.layers();
            layers.set_opacity(top, 0.5).unwrap();
            layers.set_blend_mode(top, BlendMode::Multiply).unwrap();
            layers
                .paint(0, Rect::canvas(4, 3), |image, _| {
                    image.fill(Color::rgb(1, 2, 3));
                })
                .unwrap();
            layers.set_locked(0, true).unwrap();
            layers.set_active(Some(0));
        });
        document.metadata = serde_json::json!({ "author": "me" });
        document
    }
    #[test]
    fn round_trip() {
        let document = sample();
        let mut bytes = Vec::new();
        save(&document, &mut bytes).unwrap();
        let loaded = load(bytes.as_slice()).unwrap();

        assert_eq!(loaded.name, "sample");
        assert_eq!((loaded.width(), loaded.height()), (4, 3));
        assert_eq!(loaded.layers().len(), 2);
        assert_eq!(loaded.layers().active_index(), Some(0));
        for (a, b) in document.layers().iter().zip(loaded.layers().iter()) {
            assert_eq!(a.properties(), b.properties());
            assert_eq!(a.image(), b.image());
            assert_ne!(a.id(), b.id());
        }
        assert_eq!(loaded.metadata["author"], "me");
        assert!(loaded.history().is_empty());
    }
    #[test]
    fn layout() {
        let mut bytes = Vec::new();
        save(&sample(), &mut bytes).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["version"], PROJECT_VERSION);
        assert_eq!(value["layers"][1]["blend_mode"], "multiply");
        assert_eq!(value["layers"][0]["pixels"].as_str().map(str::len), Some(64));
    }
    #[test]
    fn rejects_bad_input() {
        let bad_pixels = r#"{"version":1,"width":1,"height":1,"active":null,
            "layers":[{"name":"a","visible":true,"opacity":1.0,"width":1,"height":1,"pixels":"AAAA"}]}"#;
        assert!(matches!(
            load(bad_pixels.as_bytes()),
            Err(ProjectError::Raster { .. })
        ));
        let bad_base64 = bad_pixels.replace("AAAA", "!!");
        assert!(matches!(
            load(bad_base64.as_bytes()),
            Err(ProjectError::Base64 { .. })
        ));
        let bad_active = r#"{"version":1,"width":1,"height":1,"active":2,"layers":[]}"#;
        assert!(matches!(
            load(bad_active.as_bytes()),
            Err(ProjectError::ActiveOutOfRange { active: 2, layers: 0 })
        ));
        let future = r#"{"version":99,"width":1,"height":1,"active":null,"layers":[]}"#;
        assert!(matches!(
            load(future.as_bytes()),
            Err(ProjectError::UnsupportedVersion(99))
        ));
        assert!(matches!(load(&b"{"[..]), Err(ProjectError::Json(_))));
        let huge = r#"{"version":1,"width":4000000000,"height":4000000000,"active":null,"layers":[]}"#;
        assert!(matches!(
            load(huge.as_bytes()),
            Err(ProjectError::TooLarge {
                width: 4_000_000_000,
                height: 4_000_000_000
            })
        ));
        let huge_layer = r#"{"version":1,"width":1,"height":1,"active":null,
            "layers":[{"name":"a","visible":true,"opacity":1.0,"width":4000000000,"height":4000000000,"pixels":""}]}"#;
        assert!(matches!(
            load(huge_layer.as_bytes()),
            Err(ProjectError::Raster { .. })
        ));
    }
    #[test]
    fn opacity_clamped_on_load() {
        let json = r#"{"version":1,"width":1,"height":1,"active":0,
            "layers":[{"name":"a","visible":true,"opacity":7.5,"width":1,"height":1,"pixels":"AAAAAA=="}]}"#;
        let document = load(json.as_bytes()).unwrap();
        assert_eq!(document.layers().get(0).map(Layer::opacity), Some(1.0));
        assert!(document.metadata.is_object());
    }
}
