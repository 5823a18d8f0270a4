//! Headless front end: create, inspect, flatten and filter project files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use pixelcrafter_core::{
    color::Color,
    filters::FilterRegistry,
    io,
    raster::{self, Raster},
    settings::Settings,
    state::Document,
    tools,
};

/// Layered raster image editor, without the interface.
#[derive(Parser, Debug)]
#[command(name = "pixelcrafter", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project with a single background layer.
    /// Size and color default to the user's settings.
    New {
        /// Project file to write.
        out: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Background color, "#RRGGBB" or "#RRGGBBAA".
        #[arg(long)]
        background: Option<Color>,
        /// Document name. Defaults to the file stem.
        #[arg(long)]
        name: Option<String>,
    },
    /// Describe a project and its layers.
    Info { project: PathBuf },
    /// Composite every visible layer into a PNG.
    Flatten {
        project: PathBuf,
        /// Defaults to the project path with the extension of the export format.
        out: Option<PathBuf>,
    },
    /// Run a filter over one layer of a project.
    Filter {
        project: PathBuf,
        /// Filter name, as listed by `filters`.
        name: String,
        /// Layer index, bottom is 0. Defaults to the active layer.
        #[arg(long)]
        layer: Option<usize>,
        /// Parameter override, `key=value`. May be repeated.
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_parameter)]
        parameters: Vec<(String, f32)>,
        /// Where to write the result. Defaults to overwriting the project.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List available filters and their parameters.
    Filters,
}

fn parse_parameter(arg: &str) -> Result<(String, f32), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got \"{arg}\""))?;
    let value: f32 = value
        .trim()
        .parse()
        .map_err(|err| format!("bad value for \"{key}\": {err}"))?;
    Ok((key.trim().to_owned(), value))
}

pub fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Command::New {
            out,
            width,
            height,
            background,
            name,
        } => {
            let mut settings = Settings::load();
            settings.canvas.width = width.unwrap_or(settings.canvas.width);
            settings.canvas.height = height.unwrap_or(settings.canvas.height);
            settings.canvas.background = background.unwrap_or(settings.canvas.background);
            raster::pixel_count(settings.canvas.width, settings.canvas.height)?;
            let name = name.unwrap_or_else(|| stem(&out));
            let document = Document::with_settings(name, &settings);
            io::save_path(&document, &out)
                .with_context(|| format!("writing {}", out.display()))?;
            log::info!(
                "Created {} ({}x{})",
                out.display(),
                document.width(),
                document.height()
            );
        }
        Command::Info { project } => {
            let document = load(&project)?;
            println!("{}", describe(&document));
        }
        Command::Flatten { project, out } => {
            let document = load(&project)?;
            let export = Settings::load().export;
            let out = out.unwrap_or_else(|| project.with_extension(&export.format));
            anyhow::ensure!(
                out.extension()
                    .is_some_and(|extension| extension.eq_ignore_ascii_case("png")),
                "can only export PNG, not {}",
                out.display()
            );
            let text = if export.preserve_metadata {
                png_text(&document)
            } else {
                Vec::new()
            };
            write_png(&document.composite(), &out, &text)
                .with_context(|| format!("writing {}", out.display()))?;
            log::info!("Flattened {} into {}", project.display(), out.display());
        }
        Command::Filter {
            project,
            name,
            layer,
            parameters,
            out,
        } => {
            let mut document = load(&project)?;
            let registry = FilterRegistry::with_builtin();
            let Some(filter) = registry.get(&name) else {
                anyhow::bail!(
                    "no filter named \"{name}\", expected one of: {}",
                    registry.names().join(", ")
                );
            };
            let parameters: Vec<(&str, f32)> = parameters
                .iter()
                .map(|(key, value)| (key.as_str(), *value))
                .collect();
            let changed = document.write_with(filter.name(), |writer| {
                if let Some(layer) = layer {
                    anyhow::ensure!(writer.layers().set_active(Some(layer)), "no layer {layer}");
                }
                Ok(tools::apply_filter(writer, filter, &parameters)?)
            })?;
            if !changed {
                log::warn!("{name} made no changes");
            }
            let out = out.unwrap_or(project);
            io::save_path(&document, &out)
                .with_context(|| format!("writing {}", out.display()))?;
        }
        Command::Filters => {
            let registry = FilterRegistry::with_builtin();
            for category in registry.categories() {
                println!("{category}:");
                for filter in registry.by_category(category) {
                    let parameters: Vec<String> = filter
                        .parameters()
                        .iter()
                        .map(|(key, value)| format!("{key}={value}"))
                        .collect();
                    println!(
                        "  {:<14} {}  [{}]",
                        filter.name(),
                        filter.kind().description(),
                        parameters.join(", ")
                    );
                }
            }
        }
    }
    Ok(())
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "Untitled".to_owned(), |stem| stem.to_string_lossy().into_owned())
}

fn load(path: &Path) -> anyhow::Result<Document> {
    io::load_path(path).with_context(|| format!("reading {}", path.display()))
}

fn describe(document: &Document) -> String {
    let mut text = format!(
        "{}: {}x{}, {} layers",
        document.name,
        document.width(),
        document.height(),
        document.layers().len()
    );
    // Top first, the way a layer panel lists them.
    for (index, layer) in document.layers().iter().enumerate().rev() {
        let active = if document.layers().active_index() == Some(index) {
            '*'
        } else {
            ' '
        };
        text.push_str(&format!(
            "\n{active} {index}: \"{}\" {}x{} {} {:.0}%{}{}",
            layer.name(),
            layer.width(),
            layer.height(),
            layer.blend_mode(),
            layer.opacity() * 100.0,
            if layer.visible() { "" } else { " hidden" },
            if layer.locked() { " locked" } else { "" },
        ));
    }
    if document
        .metadata
        .as_object()
        .is_some_and(|metadata| !metadata.is_empty())
    {
        text.push_str(&format!("\nmetadata: {}", document.metadata));
    }
    text
}

/// Document name and metadata as PNG text entries. Non-string metadata is written as JSON.
fn png_text(document: &Document) -> Vec<(String, String)> {
    let mut text = vec![("Title".to_owned(), document.name.clone())];
    if let Some(metadata) = document.metadata.as_object() {
        text.extend(metadata.iter().map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(string) => string.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        }));
    }
    text
}

fn write_png(image: &Raster, path: &Path, text: &[(String, String)]) -> anyhow::Result<()> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    let mut encoder = png::Encoder::new(file, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    for (keyword, value) in text {
        // Keywords are limited to 79 Latin-1 characters.
        if let Err(err) = encoder.add_text_chunk(keyword.clone(), value.clone()) {
            log::warn!("Not writing \"{keyword}\" into {}: {err}", path.display());
        }
    }
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_bytes())?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn parameters() {
        assert_eq!(parse_parameter("radius=3.5"), Ok(("radius".to_owned(), 3.5)));
        assert_eq!(parse_parameter(" factor = 2 "), Ok(("factor".to_owned(), 2.0)));
        assert!(parse_parameter("radius").is_err());
        assert!(parse_parameter("radius=big").is_err());
    }
    #[test]
    fn arguments() {
        let args = Args::try_parse_from([
            "pixelcrafter",
            "filter",
            "a.json",
            "Gaussian Blur",
            "--param",
            "radius=4",
            "--layer",
            "1",
        ])
        .unwrap();
        match args.command {
            Command::Filter {
                name,
                layer,
                parameters,
                out,
                ..
            } => {
                assert_eq!(name, "Gaussian Blur");
                assert_eq!(layer, Some(1));
                assert_eq!(parameters, [("radius".to_owned(), 4.0)]);
                assert!(out.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        let args = Args::try_parse_from(["pixelcrafter", "new", "x.json", "--background", "#ff0000"])
            .unwrap();
        assert!(matches!(
            args.command,
            Command::New { background: Some(color), .. } if color == Color::rgb(255, 0, 0)
        ));
        let args = Args::try_parse_from(["pixelcrafter", "flatten", "x.json"]).unwrap();
        assert!(matches!(args.command, Command::Flatten { out: None, .. }));
    }
    #[test]
    fn describes_layers() {
        let mut document = Document::new("doc", 2, 2);
        document.add_layer("one");
        document.add_layer("two");
        let text = describe(&document);
        assert!(text.starts_with("doc: 2x2, 2 layers"));
        assert!(text.contains("* 1: \"two\" 2x2 normal 100%"));
        assert!(text.contains("  0: \"one\""));
    }
    #[test]
    fn png_export() {
        let path = std::env::temp_dir().join("pixelcrafter-cli-test.png");
        let image = Raster::filled(3, 2, Color::rgb(1, 2, 3));
        let mut document = Document::new("Sketch", 3, 2);
        document.metadata = serde_json::json!({ "Author": "me", "Revision": 3 });
        let text = png_text(&document);
        write_png(&image, &path, &text).unwrap();
        let mut decoder = png::Decoder::new(std::fs::File::open(&path).unwrap());
        decoder.set_ignore_text_chunk(false);
        let mut reader = decoder.read_info().unwrap();
        let mut chunks: Vec<(String, String)> = reader
            .info()
            .uncompressed_latin1_text
            .iter()
            .map(|chunk| (chunk.keyword.clone(), chunk.text.clone()))
            .collect();
        chunks.sort();
        assert_eq!(
            chunks,
            [
                ("Author".to_owned(), "me".to_owned()),
                ("Revision".to_owned(), "3".to_owned()),
                ("Title".to_owned(), "Sketch".to_owned()),
            ]
        );
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        assert_eq!((info.width, info.height), (3, 2));
        assert_eq!(&buf[..info.buffer_size()], image.as_bytes());
        let _ = std::fs::remove_file(path);
    }
}
