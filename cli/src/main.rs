//! pdfsplit CLI - split PDF documents into size-bounded parts

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfsplit::{
    parse_byte_size, JsonFormat, MeasureMode, OverflowPolicy, PageSource, PdfSource,
    SplitOptions, SplitReport, Splitter,
};

#[derive(Parser)]
#[command(name = "pdfsplit")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Split PDF documents into parts under a size limit", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output directory (defaults to the input's directory)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(flatten)]
    split: SplitArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a PDF into numbered parts
    Split {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory (defaults to the input's directory)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        split: SplitArgs,
    },

    /// Show document information and a part estimate
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Size limit used for the estimate
        #[arg(long, value_name = "SIZE", default_value = "9MiB")]
        max_size: String,
    },

    /// Show version information
    Version,
}

#[derive(Args, Clone)]
struct SplitArgs {
    /// Size limit per part (e.g. "9MiB", "500kb", "2000000")
    #[arg(long, value_name = "SIZE", default_value = "9MiB")]
    max_size: String,

    /// Move the page that crosses the limit into the next part
    #[arg(long)]
    strict: bool,

    /// Measure parts through a scratch file instead of memory
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    temp_file_measure: Option<Option<PathBuf>>,

    /// Publish all parts at once, or none on failure
    #[arg(long)]
    atomic: bool,

    /// Print the split report as JSON
    #[arg(long)]
    json: bool,
}

impl SplitArgs {
    fn to_options(&self) -> Result<SplitOptions, Box<dyn std::error::Error>> {
        let mut options = SplitOptions::new().with_threshold(parse_byte_size(&self.max_size)?);
        if self.strict {
            options = options.with_overflow_policy(OverflowPolicy::Strict);
        }
        if let Some(dir) = &self.temp_file_measure {
            options = options.with_measure_mode(MeasureMode::TempFile { dir: dir.clone() });
        }
        if self.atomic {
            options = options.atomic();
        }
        Ok(options)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Split {
            input,
            output,
            split,
        }) => cmd_split(&input, output.as_deref(), &split),
        Some(Commands::Info { input, max_size }) => cmd_info(&input, &max_size),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: split if input is provided
            if let Some(input) = cli.input {
                cmd_split(&input, cli.output.as_deref(), &cli.split)
            } else {
                println!("{}", "Usage: pdfsplit <FILE> [OUTPUT]".yellow());
                println!("       pdfsplit --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Parts land next to the input unless told otherwise.
fn default_output_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn cmd_split(
    input: &Path,
    output: Option<&Path>,
    args: &SplitArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.to_options()?;
    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| default_output_dir(input));

    let pb = if args.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Splitting...");

    let result = Splitter::new()
        .input(input)
        .output_dir(&output_dir)
        .options(options)
        .run_with_progress(&mut |done: usize, total: usize| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        });

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            pb.abandon_with_message("Failed");
            return Err(e.into());
        }
    };
    pb.finish_with_message("Done!");

    if args.json {
        println!("{}", report.to_json(JsonFormat::Pretty)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &SplitReport) {
    if report.parts.is_empty() {
        println!("\n{}", "Document has no pages; nothing written.".yellow());
        return;
    }

    println!("\n{}", "Output files:".green().bold());
    let last = report.parts.len() - 1;
    for (i, part) in report.parts.iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        let name = part
            .path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("part {}", part.sequence));
        println!(
            "  {} {} {}",
            branch.dimmed(),
            name,
            format!(
                "(pages {}-{}, {})",
                part.first_page,
                part.last_page,
                format_bytes(part.bytes)
            )
            .dimmed()
        );
    }

    for part in report.oversized_parts().filter(|p| p.page_count == 1) {
        println!(
            "{} page {} alone is {} (limit {})",
            "Warning:".yellow().bold(),
            part.first_page,
            format_bytes(part.bytes),
            format_bytes(report.threshold)
        );
    }

    println!(
        "\n{} {} pages in {} parts",
        "Done!".green().bold(),
        report.page_count,
        report.part_count()
    );
}

fn cmd_info(input: &Path, max_size: &str) -> Result<(), Box<dyn std::error::Error>> {
    let threshold = parse_byte_size(max_size)?;
    let source = PdfSource::open(input)?;
    let file_size = fs::metadata(input)?.len();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), source.version());
    println!("{}: {}", "Pages".bold(), source.page_count());
    println!("{}: {}", "Size".bold(), format_bytes(file_size));

    println!();
    println!("{}", "Split Estimate".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "Limit".bold(), format_bytes(threshold));
    println!(
        "{}: ~{}",
        "Parts".bold(),
        estimate_parts(file_size, threshold)
    );

    Ok(())
}

/// Rough part count from the file size alone; shared resources make the
/// real count differ.
fn estimate_parts(file_size: u64, threshold: u64) -> u64 {
    if threshold == 0 {
        return 0;
    }
    file_size.div_ceil(threshold).max(1)
}

fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let b = bytes as f64;
    if b >= MIB {
        format!("{:.2} MB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

fn cmd_version() {
    println!("{} {}", "pdfsplit".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Split PDF documents into size-bounded parts");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/pdfsplit".dimmed());
    println!("License: MIT");
}
