//! bookmeta - ebook metadata inspector

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use bookmeta::mobi::{ExthTag, MobiContainer};
use bookmeta::{Ebook, Format, ReadOptions};

#[derive(Parser)]
#[command(name = "bookmeta")]
#[command(version, about = "Show ebook metadata", long_about = None)]
#[command(after_help = "EXAMPLES:
    bookmeta book.epub              Show metadata
    bookmeta --json book.azw3       Print metadata as JSON
    bookmeta --exth book.mobi       Also list raw EXTH records

Set RUST_LOG=debug for parser diagnostics.")]
struct Cli {
    /// Input files (EPUB, MOBI, AZW3, CBZ, ...)
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,

    /// Print JSON instead of text
    #[arg(short, long)]
    json: bool,

    /// Do not load cover images
    #[arg(long)]
    no_cover: bool,

    /// List raw EXTH records of MOBI files
    #[arg(long)]
    exth: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    path: String,
    format: &'a str,
    has_parser: bool,
    title: Option<&'a str>,
    authors: Vec<AuthorReport<'a>>,
    publisher: Option<&'a str>,
    description: Option<&'a str>,
    identifiers: BTreeMap<String, &'a str>,
    tags: &'a [String],
    publish_date: Option<String>,
    language: Option<&'a str>,
    series: Option<&'a str>,
    volume: Option<f32>,
    copyright: Option<&'a str>,
    cover: Option<CoverReport<'a>>,
    extras: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exth: Option<Vec<ExthReport>>,
}

#[derive(Serialize)]
struct AuthorReport<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_as: Option<&'a str>,
}

#[derive(Serialize)]
struct CoverReport<'a> {
    media_type: &'a str,
    size: usize,
}

#[derive(Serialize)]
struct ExthReport {
    tag: u32,
    name: Option<&'static str>,
    length: usize,
    value: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet { "error" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();

    let options = ReadOptions {
        with_cover: !cli.no_cover,
    };

    let mut failed = false;
    for path in &cli.inputs {
        if let Err(e) = show(path, &cli, &options) {
            log::error!("{}: {e}", path.display());
            failed = true;
        }
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn show(path: &Path, cli: &Cli, options: &ReadOptions) -> Result<(), String> {
    let book = Ebook::read_with(path, options).map_err(|e| e.to_string())?;
    let exth = if cli.exth && matches!(book.format, Format::Mobi | Format::Azw3) {
        Some(exth_records(path).map_err(|e| e.to_string())?)
    } else {
        None
    };
    let report = report(&book, path, exth);

    if cli.json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        print_text(&report);
    }
    Ok(())
}

fn report<'a>(book: &'a Ebook, path: &Path, exth: Option<Vec<ExthReport>>) -> Report<'a> {
    let identifiers = book
        .identifiers
        .iter()
        .map(|id| {
            let scheme = id.scheme.clone().unwrap_or_else(|| "id".to_string());
            (scheme, id.value.as_str())
        })
        .collect();

    Report {
        path: path.display().to_string(),
        format: book.format.name(),
        has_parser: book.has_parser,
        title: book.title.as_deref(),
        authors: book
            .authors
            .iter()
            .map(|a| AuthorReport {
                name: &a.name,
                role: a.role.as_deref(),
                file_as: a.file_as.as_deref(),
            })
            .collect(),
        publisher: book.publisher.as_deref(),
        description: book.description.as_deref(),
        identifiers,
        tags: &book.tags,
        publish_date: book.publish_date.map(|d| d.format("%Y-%m-%d").to_string()),
        language: book.language.as_deref(),
        series: book.series.as_deref(),
        volume: book.volume,
        copyright: book.copyright.as_deref(),
        cover: book.cover.as_ref().map(|c| CoverReport {
            media_type: &c.media_type,
            size: c.data.len(),
        }),
        extras: &book.extras,
        exth,
    }
}

fn exth_records(path: &Path) -> bookmeta::Result<Vec<ExthReport>> {
    let container = MobiContainer::open(path)?;
    let meta = container.metadata();
    let Some(exth) = container.exth_header() else {
        return Ok(Vec::new());
    };

    Ok(exth
        .records
        .iter()
        .map(|record| ExthReport {
            tag: record.tag,
            name: ExthTag::from_id(record.tag).map(ExthTag::name),
            length: record.len(),
            value: meta.decode_record(record).to_string(),
        })
        .collect())
}

fn print_text(report: &Report<'_>) {
    println!("File: {}", report.path);
    println!("Format: {}", report.format);
    if !report.has_parser {
        println!("(no metadata parser for this format)");
    }
    if let Some(title) = report.title {
        println!("Title: {title}");
    }
    if !report.authors.is_empty() {
        let authors: Vec<String> = report
            .authors
            .iter()
            .map(|a| match a.role {
                Some(role) if role != "aut" => format!("{} ({role})", a.name),
                _ => a.name.to_string(),
            })
            .collect();
        println!("Authors: {}", authors.join(", "));
    }
    if let Some(series) = report.series {
        match report.volume {
            Some(volume) => println!("Series: {series} #{volume}"),
            None => println!("Series: {series}"),
        }
    }
    if let Some(publisher) = report.publisher {
        println!("Publisher: {publisher}");
    }
    if let Some(date) = &report.publish_date {
        println!("Published: {date}");
    }
    if let Some(language) = report.language {
        println!("Language: {language}");
    }
    for (scheme, value) in &report.identifiers {
        println!("Identifier ({scheme}): {value}");
    }
    if !report.tags.is_empty() {
        println!("Tags: {}", report.tags.join(", "));
    }
    if let Some(rights) = report.copyright {
        println!("Rights: {rights}");
    }
    if let Some(desc) = report.description {
        let desc = desc.trim();
        match desc.char_indices().nth(200) {
            Some((cut, _)) => println!("Description: {}...", &desc[..cut]),
            None => println!("Description: {desc}"),
        }
    }
    if let Some(cover) = &report.cover {
        println!("Cover: {} ({} bytes)", cover.media_type, cover.size);
    }
    for (key, value) in report.extras {
        println!("  {key}: {value}");
    }
    if let Some(records) = &report.exth {
        println!("EXTH records: {}", records.len());
        for r in records {
            let name = r.name.unwrap_or("unknown");
            println!("  [{:>3}] {name:<28} {}", r.tag, r.value);
        }
    }
}
