use clap::{Parser, Subcommand};
use imgpress::imaging::{CompressionLevel, Quality, QualitySetting, ResizeSpec};
use imgpress::{Compressor, config, output};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "imgpress")]
#[command(about = "Shrink JPEG, PNG and GIF images and report the savings")]
#[command(long_about = "\
Shrink JPEG, PNG and GIF images and report the savings

Quality tiers (the name is how hard the image is squeezed):

  low       quality 85
  medium    quality 60
  high      quality 35
  original  no re-encoding, output is the input

Only JPEG honours quality. PNG is re-encoded losslessly and GIF is
re-quantized, so their output is the same for every tier. No output is
larger than the input unless resized.

Run 'imgpress gen-config' to generate a documented imgpress.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Resize flags shared by commands that encode.
#[derive(clap::Args, Clone, Debug)]
struct ResizeArgs {
    /// Fit within this width, keeping aspect ratio (never upscales)
    #[arg(long)]
    max_width: Option<u32>,

    /// Fit within this height, keeping aspect ratio (never upscales)
    #[arg(long)]
    max_height: Option<u32>,

    /// Scale both sides by this factor
    #[arg(long, conflicts_with_all = ["max_width", "max_height", "preview"])]
    scale: Option<f64>,

    /// Fit to the configured preview width
    #[arg(long, conflicts_with = "max_width")]
    preview: bool,
}

impl ResizeArgs {
    fn spec(&self, preview_width: u32) -> Option<ResizeSpec> {
        if let Some(factor) = self.scale {
            return Some(ResizeSpec::scale(factor));
        }
        let max_width = if self.preview {
            Some(preview_width)
        } else {
            self.max_width
        };
        match (max_width, self.max_height) {
            (None, None) => None,
            (max_width, max_height) => Some(ResizeSpec::Fit {
                max_width,
                max_height,
            }),
        }
    }
}

/// Quality flags; without either, the configured level applies.
#[derive(clap::Args, Clone, Debug)]
struct QualityArgs {
    /// Quality tier: low, medium, high or original
    #[arg(long)]
    level: Option<CompressionLevel>,

    /// Raw quality 0-100 instead of a tier
    #[arg(long, conflicts_with = "level", value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: Option<u8>,
}

impl QualityArgs {
    fn setting(&self, configured: CompressionLevel) -> QualitySetting {
        match (self.quality, self.level) {
            (Some(q), _) => Quality::new(q.into()).into(),
            (None, Some(level)) => level.into(),
            (None, None) => configured.into(),
        }
    }
}

#[derive(clap::Args, Debug)]
struct CompressArgs {
    /// Image to compress
    input: PathBuf,

    #[command(flatten)]
    quality: QualityArgs,

    #[command(flatten)]
    resize: ResizeArgs,

    /// Where to write the result (default: suggested name next to the input)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compress one image and write the result
    Compress(CompressArgs),
    /// Compare the low, medium and high tiers on one image, then show the
    /// selected setting (reused from the comparison when it matches a tier)
    Tiers {
        /// Image to compare
        input: PathBuf,

        #[command(flatten)]
        quality: QualityArgs,
    },
    /// Print a stock imgpress.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Compress(args) => {
            let config = config::load_config(&cli.config)?;
            let bytes = std::fs::read(&args.input)?;
            let filename = upload_name(&args.input);
            let source = args.input.display().to_string();

            let setting = args.quality.setting(config.compression.level);
            let resize = args.resize.spec(config.preview.max_width);

            let mut compressor = Compressor::with_codec(config.codec());
            let printer = if args.json {
                None
            } else {
                let (tx, rx) = mpsc::channel();
                compressor = compressor.with_progress(tx);
                Some(std::thread::spawn(move || {
                    for event in rx {
                        for line in output::format_stage_event(&event) {
                            println!("{}", line);
                        }
                    }
                }))
            };

            let outcome = compressor.process(&bytes, &filename, setting, resize);
            // Closes the progress channel so the printer can finish.
            drop(compressor);
            if let Some(printer) = printer {
                printer
                    .join()
                    .map_err(|_| "progress printer panicked")?;
            }

            let result = match outcome {
                Ok(result) => result,
                Err(err) => {
                    if args.json {
                        println!("{}", output::format_json_error(&source, &err)?);
                    }
                    return Err(err.into());
                }
            };

            let destination = args
                .output
                .unwrap_or_else(|| args.input.with_file_name(&result.filename));
            std::fs::write(&destination, &result.bytes)?;

            if args.json {
                println!("{}", output::format_json(&source, &result)?);
            } else {
                output::print_result(&source, &result);
                println!("==> Wrote {}", destination.display());
            }
        }
        Command::Tiers { input, quality } => {
            let config = config::load_config(&cli.config)?;
            let bytes = std::fs::read(&input)?;
            let filename = upload_name(&input);
            let setting = quality.setting(config.compression.level);

            let compressor =
                Compressor::with_codec(config.codec()).with_cache(config.cache_capacity());
            let tiers: Vec<_> = CompressionLevel::ENCODING
                .iter()
                .map(|&level| (level, compressor.process(&bytes, &filename, level.into(), None)))
                .collect();
            output::print_tiers(&input.display().to_string(), bytes.len(), &tiers);

            let hits_before = compressor.cache_stats().map_or(0, |s| s.hits);
            let selected = compressor.process(&bytes, &filename, setting, None);
            let reused = compressor.cache_stats().map_or(0, |s| s.hits) > hits_before;
            println!("{}", output::format_selected(setting, &selected, reused));

            if let Some(stats) = compressor.cache_stats() {
                println!("Cache: {}", stats);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// The name the pipeline sees, as if the file had been uploaded.
fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
