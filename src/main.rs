//! label-unwrap - flatten labels photographed on round containers
//!
//! Reads a photograph, resolves the six label landmarks from the command
//! line or a configuration file and writes the flattened label or one of the
//! debug overlays.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use image::{DynamicImage, Rgb, Rgba};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use label_unwrap::config::Config;
use label_unwrap::draw;
use label_unwrap::{CoordinateMode, GridSettings, LabelUnwrapper, Landmarks, Point};

/// label-unwrap - flatten labels on cylindrical and conical containers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Photograph and landmark overrides shared by every image command
#[derive(clap::Args, Debug)]
struct LabelArgs {
    /// Input photograph
    #[arg(short, long)]
    input: PathBuf,

    /// Six landmarks A..F as x,y pairs
    #[arg(long, num_args = 6, value_parser = parse_point)]
    points: Option<Vec<Point>>,

    /// Treat --points as pixel coordinates instead of fractions
    #[arg(long)]
    pixel: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Flatten the label into a rectangular image
    Unwrap {
        #[command(flatten)]
        label: LabelArgs,

        /// Output image
        #[arg(short, long)]
        output: PathBuf,

        /// Grid columns along the caps
        #[arg(long)]
        columns: Option<usize>,

        /// Grid rows between the caps
        #[arg(long)]
        rows: Option<usize>,
    },
    /// Write the filled label mask
    Mask {
        #[command(flatten)]
        label: LabelArgs,

        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write the label contour on a blank canvas
    Contour {
        #[command(flatten)]
        label: LabelArgs,

        #[arg(short, long)]
        output: PathBuf,
    },
    /// Draw the correspondence grid over the photograph
    Mesh {
        #[command(flatten)]
        label: LabelArgs,

        #[arg(short, long)]
        output: PathBuf,
    },
    /// Draw the landmark polygon over the photograph
    Poly {
        #[command(flatten)]
        label: LabelArgs,

        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the label geometry as JSON
    Describe {
        #[command(flatten)]
        label: LabelArgs,
    },
    /// Write the default configuration file
    InitConfig {
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", s))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad x in '{}': {}", s, e))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad y in '{}': {}", s, e))?;
    Ok(Point::new(x, y))
}

/// Open the photograph and resolve its landmarks, command line over config
fn load_label(label: &LabelArgs, config: &Config) -> Result<(DynamicImage, Landmarks)> {
    let image = image::open(&label.input)
        .with_context(|| format!("Failed to open image {:?}", label.input))?;
    let (width, height) = (image.width(), image.height());
    info!("Loaded {:?} ({}x{})", label.input, width, height);

    let landmarks = match &label.points {
        Some(points) => {
            let mode = if label.pixel {
                CoordinateMode::Pixel
            } else {
                CoordinateMode::Percent
            };
            Landmarks::from_mode(mode, points, width, height)?
        }
        None => config.landmarks.resolve(width, height)?,
    };

    for (name, point) in landmarks.labeled() {
        tracing::debug!("{}: ({}, {})", name, point.x, point.y);
    }
    Ok((image, landmarks))
}

/// Save an image, dropping alpha for formats that cannot store it
fn save_image(image: DynamicImage, path: &Path) -> Result<()> {
    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);

    let image = if is_jpeg {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };

    image
        .save(path)
        .with_context(|| format!("Failed to write image {:?}", path))?;
    info!("Wrote {:?}", path);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("label-unwrap v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_default(args.config.as_deref())?;

    match args.command {
        Command::Unwrap {
            label,
            output,
            columns,
            rows,
        } => {
            let (image, landmarks) = load_label(&label, &config)?;
            let settings = GridSettings::new(
                columns.unwrap_or(config.grid.columns),
                rows.unwrap_or(config.grid.rows),
            );
            let unwrapper = LabelUnwrapper::new(landmarks).with_grid(settings);
            let flattened = unwrapper.unwrap(&image.to_rgba8(), Rgba(config.render.border))?;
            save_image(DynamicImage::ImageRgba8(flattened), &output)?;
        }
        Command::Mask { label, output } => {
            let (image, landmarks) = load_label(&label, &config)?;
            let mask = draw::label_mask(&landmarks, image.width(), image.height())?;
            save_image(DynamicImage::ImageLuma8(mask), &output)?;
        }
        Command::Contour { label, output } => {
            let (image, landmarks) = load_label(&label, &config)?;
            let contour = draw::label_contour(
                &landmarks,
                image.width(),
                image.height(),
                Rgb(config.render.mask_color),
            )?;
            save_image(DynamicImage::ImageRgb8(contour), &output)?;
        }
        Command::Mesh { label, output } => {
            let (image, landmarks) = load_label(&label, &config)?;
            let grid = LabelUnwrapper::new(landmarks)
                .with_grid(config.grid)
                .correspondence_grid()?;
            let mut canvas = image.to_rgb8();
            draw::draw_mesh(&mut canvas, &grid, Rgb(config.render.overlay_color), 3);
            save_image(DynamicImage::ImageRgb8(canvas), &output)?;
        }
        Command::Poly { label, output } => {
            let (image, landmarks) = load_label(&label, &config)?;
            let mut canvas = image.to_rgb8();
            draw::draw_poly_mask(&mut canvas, &landmarks, Rgb(config.render.overlay_color));
            save_image(DynamicImage::ImageRgb8(canvas), &output)?;
        }
        Command::Describe { label } => {
            let (_, landmarks) = load_label(&label, &config)?;
            let description = LabelUnwrapper::new(landmarks)
                .with_grid(config.grid)
                .describe()?;
            println!("{}", serde_json::to_string_pretty(&description)?);
        }
        Command::InitConfig { output } => {
            if output.exists() {
                bail!("{:?} already exists", output);
            }
            Config::default().save(&output)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("0.1,0.25").unwrap(), Point::new(0.1, 0.25));
        assert_eq!(parse_point(" 40 , 30 ").unwrap(), Point::new(40.0, 30.0));
        assert!(parse_point("40").is_err());
        assert!(parse_point("a,1").is_err());
    }

    #[test]
    fn test_cli_parses_unwrap() {
        let args = Args::try_parse_from([
            "label-unwrap",
            "unwrap",
            "-i",
            "in.jpg",
            "-o",
            "out.png",
            "--points",
            "0.1,0.1",
            "0.5,0.05",
            "0.9,0.1",
            "0.9,0.9",
            "0.5,0.95",
            "0.1,0.9",
            "--columns",
            "12",
        ])
        .unwrap();

        match args.command {
            Command::Unwrap { label, columns, rows, .. } => {
                assert_eq!(label.points.unwrap().len(), 6);
                assert!(!label.pixel);
                assert_eq!(columns, Some(12));
                assert_eq!(rows, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_requires_six_points() {
        let result = Args::try_parse_from([
            "label-unwrap",
            "describe",
            "-i",
            "in.jpg",
            "--points",
            "0.1,0.1",
            "0.5,0.05",
        ]);
        assert!(result.is_err());
    }
}
