use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cmspipe_core::{Category, ConversionMetadata};
use std::path::PathBuf;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "cmspipe")]
#[command(about = "Convert a word-processor HTML article export into a CMS import CSV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert one HTML export (plus one image) into `{slug}.csv` (prints a json summary).
    Convert(ConvertCmd),
    /// Store an image and print its public address (json).
    Upload(UploadCmd),
    /// Diagnose configuration (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct ConvertCmd {
    /// HTML export file.
    #[arg(long)]
    html: PathBuf,
    /// Public address of an already-uploaded image.
    #[arg(long, conflicts_with = "image_file", required_unless_present = "image_file")]
    image_url: Option<String>,
    /// Local image to upload first (see `upload`).
    #[arg(long)]
    image_file: Option<PathBuf>,
    /// Skip the SEO call and use the rule-based metadata fields.
    #[arg(long, default_value_t = false)]
    no_ai: bool,
    /// Skip the image description call.
    #[arg(long, default_value_t = false)]
    no_vision: bool,

    /// JSON object with field overrides (`snake_case` or `camelCase` keys).
    ///
    /// Flags below win over values from this file.
    #[arg(long)]
    metadata_json: Option<PathBuf>,
    #[arg(long)]
    slug: Option<String>,
    #[arg(long)]
    meta_title: Option<String>,
    #[arg(long)]
    meta_description: Option<String>,
    /// Comma-separated.
    #[arg(long)]
    keywords: Option<String>,
    #[arg(long)]
    preview: Option<String>,
    /// One of: "Founders & Startups", "Nederlandse AI in de wereld", "Investeren in Nederlandse AI".
    #[arg(long)]
    category: Option<Category>,
    #[arg(long)]
    image_alt: Option<String>,
    /// Publication date (YYYY-MM-DD). Default: today (UTC).
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Directory for the CSV file (created if missing).
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Overall deadline for the conversion, AI calls included.
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl ConvertCmd {
    fn metadata(&self) -> Result<ConversionMetadata> {
        let mut m = match &self.metadata_json {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("read {}", p.display()))?;
                serde_json::from_str::<ConversionMetadata>(&raw)
                    .with_context(|| format!("parse {}", p.display()))?
            }
            None => ConversionMetadata::default(),
        };
        let flags = [
            (&mut m.slug, &self.slug),
            (&mut m.meta_title, &self.meta_title),
            (&mut m.meta_description, &self.meta_description),
            (&mut m.keywords, &self.keywords),
            (&mut m.preview, &self.preview),
            (&mut m.image_alt, &self.image_alt),
        ];
        for (field, flag) in flags {
            if flag.is_some() {
                field.clone_from(flag);
            }
        }
        if self.category.is_some() {
            m.category = self.category;
        }
        if self.date.is_some() {
            m.date = self.date;
        }
        Ok(m)
    }
}

#[derive(clap::Args, Debug)]
struct UploadCmd {
    #[arg(long)]
    file: PathBuf,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

/// `CMSPIPE_ENV_FILE`: `KEY=VALUE` lines, `#` comments. Never overrides the process env.
fn load_env_file() {
    let Ok(p) = std::env::var("CMSPIPE_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        let v = v.trim().trim_matches('"');
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("CMSPIPE_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(tracing_subscriber::EnvFilter::new)
        .unwrap_or_else(|| {
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
        });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => {
            let summary = commands::convert(args).await?;
            println!("{summary}");
        }
        Commands::Upload(args) => {
            let out = commands::upload(&args.file).await?;
            println!("{out}");
        }
        Commands::Doctor(args) => {
            let v = commands::doctor();
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("{}", commands::doctor_text(&v)),
                _ => println!("{v}"),
            }
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "cmspipe",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("cmspipe {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }
    Ok(())
}
