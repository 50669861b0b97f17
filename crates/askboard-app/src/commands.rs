//! Subcommands of the `askboard` binary.

use anyhow::{Context, Result};
use askboard_core::guard::install_guards;
use askboard_core::{
    AutoFrameOutcome, BoardConfig, CanvasDocument, Platform, Shape, ShortcutRegistry,
};
use clap::{Parser, Subcommand};
use kurbo::Rect;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "askboard", version, about = "Headless tools for askboard documents")]
pub struct Cli {
    /// Board configuration file (JSON).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Frame all loose handwriting of a document into locked groups.
    Frame {
        document: PathBuf,
        /// Write the result here instead of overwriting the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the shapes of a document.
    Inspect {
        document: PathBuf,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print the keyboard shortcuts.
    Shortcuts {
        /// Show macOS key labels.
        #[arg(long)]
        mac: bool,
    },
    /// Print the effective configuration.
    Config,
}

fn load_config(path: Option<&Path>) -> Result<BoardConfig> {
    match path {
        Some(path) => BoardConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(BoardConfig::default()),
    }
}

fn load_document(path: &Path) -> Result<CanvasDocument> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    CanvasDocument::from_json(&json)
        .with_context(|| format!("{} is not a board document", path.display()))
}

fn format_rect(rect: Rect) -> String {
    format!("({:.1}, {:.1}) {:.1}x{:.1}", rect.x0, rect.y0, rect.width(), rect.height())
}

fn describe(shape: &Shape) -> String {
    let mut line = format!(
        "{} {:14} {}",
        shape.id(),
        shape.kind().to_string(),
        format_rect(shape.bounds())
    );
    if let Some(parent) = shape.parent_id {
        let _ = write!(line, " parent={parent}");
    }
    if shape.meta.no_resize() {
        line.push_str(" locked");
    }
    if let Some(response) = shape.as_text_response() {
        let _ = write!(line, " [{}] {:?}", response.state(), response.query);
    }
    line
}

fn frame(document: &Path, output: Option<&Path>, config: &BoardConfig) -> Result<String> {
    let mut doc = load_document(document)?;
    install_guards(&mut doc);

    let handwriting: Vec<Shape> = doc
        .shapes_ordered()
        .filter(|s| s.parent_id.is_none() && s.is_handwriting())
        .cloned()
        .collect();

    let outcome = config
        .auto_frame_engine()
        .auto_frame(&mut doc, &handwriting)
        .context("auto-frame failed")?;

    let target = output.unwrap_or(document);
    let message = match outcome {
        AutoFrameOutcome::Framed(group) => {
            let json = doc.to_json().context("failed to serialize document")?;
            std::fs::write(target, json)
                .with_context(|| format!("failed to write {}", target.display()))?;
            format!(
                "Framed {} strokes into group {} -> {}\n",
                handwriting.len(),
                group,
                target.display()
            )
        }
        AutoFrameOutcome::NoOp => "No loose handwriting to frame\n".to_string(),
    };
    Ok(message)
}

fn inspect(document: &Path, json: bool) -> Result<String> {
    let doc = load_document(document)?;
    if json {
        let shapes: Vec<serde_json::Value> = doc
            .shapes_ordered()
            .map(|s| {
                let b = s.bounds();
                serde_json::json!({
                    "id": s.id(),
                    "type": s.kind(),
                    "bounds": [b.x0, b.y0, b.x1, b.y1],
                    "parentId": s.parent_id,
                })
            })
            .collect();
        return Ok(format!("{}\n", serde_json::to_string_pretty(&shapes)?));
    }

    let mut out = format!("{} ({} shapes)\n", doc.name, doc.len());
    for shape in doc.shapes_ordered() {
        out.push_str(&describe(shape));
        out.push('\n');
    }
    if let Some(bounds) = doc.bounds() {
        let _ = writeln!(out, "content bounds: {}", format_rect(bounds));
    }
    Ok(out)
}

pub fn run(cli: Cli) -> Result<String> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Frame { document, output } => frame(&document, output.as_deref(), &config),
        Command::Inspect { document, json } => inspect(&document, json),
        Command::Shortcuts { mac } => {
            let platform = if mac { Platform::Mac } else { Platform::Other };
            let mut out = String::new();
            for line in ShortcutRegistry::new(platform).describe() {
                out.push_str(&line);
                out.push('\n');
            }
            Ok(out)
        }
        Command::Config => Ok(format!("{}\n", config.to_json()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askboard_core::shapes::{Draw, ShapeProps};
    use askboard_core::{ShapeSpec, ShapeStore};
    use kurbo::Point;

    fn write_doc(dir: &Path) -> PathBuf {
        let mut doc = CanvasDocument::new();
        for x in [0.0, 100.0] {
            let draw = Draw::from_points(vec![Point::ZERO, Point::new(10.0, 10.0)]);
            doc.create_shape(ShapeSpec::from_props(&ShapeProps::Draw(draw)).at(Point::new(x, 0.0)))
                .unwrap();
        }
        let path = dir.join("board.json");
        std::fs::write(&path, doc.to_json().unwrap()).unwrap();
        path
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("askboard").chain(args.iter().copied()))
    }

    #[test]
    fn test_frame_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_doc(dir.path());
        let output = dir.path().join("framed.json");

        let message = run(cli(&[
            "frame",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ]))
        .unwrap();
        assert!(message.starts_with("Framed 2 strokes"));

        let framed = load_document(&output).unwrap();
        assert_eq!(framed.len(), 4);
        let group = framed.shapes_ordered().find(|s| s.is_group()).unwrap();
        assert!(group.meta.no_resize());
        assert_eq!(group.bounds(), Rect::new(-20.0, -20.0, 130.0, 30.0));

        // Framing again finds nothing loose
        let again = run(cli(&["frame", output.to_str().unwrap()])).unwrap();
        assert_eq!(again, "No loose handwriting to frame\n");
    }

    #[test]
    fn test_frame_honours_config_margin() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_doc(dir.path());
        let config = dir.path().join("config.json");
        std::fs::write(&config, r#"{"frame": {"margin": 0}}"#).unwrap();

        run(cli(&[
            "--config",
            config.to_str().unwrap(),
            "frame",
            input.to_str().unwrap(),
        ]))
        .unwrap();
        let framed = load_document(&input).unwrap();
        let group = framed.shapes_ordered().find(|s| s.is_group()).unwrap();
        assert_eq!(group.bounds(), Rect::new(0.0, 0.0, 110.0, 10.0));
    }

    #[test]
    fn test_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_doc(dir.path());

        let table = run(cli(&["inspect", input.to_str().unwrap()])).unwrap();
        assert!(table.starts_with("Untitled (2 shapes)"));
        assert_eq!(table.matches(" draw ").count(), 2);

        let json = run(cli(&["inspect", "--json", input.to_str().unwrap()])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(value[0]["type"], "draw");
    }

    #[test]
    fn test_missing_document_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(run(cli(&["inspect", missing.to_str().unwrap()])).is_err());
    }

    #[test]
    fn test_shortcuts_listing() {
        let out = run(cli(&["shortcuts", "--mac"])).unwrap();
        assert!(out.contains("⌘ + K"));
        assert!(out.contains("⌘ + Shift + F"));
    }
}
