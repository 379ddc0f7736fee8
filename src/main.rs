use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::mpsc;
use tracing_subscriber::EnvFilter;
use upload_pipeline::pipeline::{PipelineEvent, UploadPipeline};
use upload_pipeline::record::MemoryRecord;
use upload_pipeline::upload::UploadedFile;
use upload_pipeline::{config, output};

/// Record identity shared by the commands that touch step directories.
#[derive(clap::Args, Clone)]
struct RecordArgs {
    /// Record attribute as key=value, e.g. --attr id=42 (repeatable)
    #[arg(long = "attr", value_parser = parse_attr)]
    attrs: Vec<(String, String)>,

    /// Record scenario (defaults to insert, update or delete per command)
    #[arg(long)]
    scenario: Option<String>,

    /// Print the report as JSON instead of progress lines
    #[arg(long)]
    json: bool,
}

impl RecordArgs {
    fn record(&self, default_scenario: &str, is_new: bool) -> MemoryRecord {
        let scenario = self.scenario.as_deref().unwrap_or(default_scenario);
        let mut record = if is_new {
            MemoryRecord::new(scenario)
        } else {
            MemoryRecord::existing(scenario)
        };
        record.attributes.extend(self.attrs.iter().cloned());
        record
    }
}

fn parse_attr(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

#[derive(Parser)]
#[command(name = "upload-pipeline")]
#[command(about = "Store uploaded files through a configured list of steps")]
#[command(long_about = "\
Store uploaded files through a configured list of steps

Every step writes into its own directory. A step either copies the upload,
resizes it as an image (with optional thumbnail and original copy), or runs
custom code. All steps share one stored name per upload.

  public/uploads/42/photo_0192a4b7....jpg        copy step
  public/images/42/photo_0192a4b7....jpg         resized to fit 400x400
  public/images/42/thumb_photo_0192a4b7....jpg   cropped 100x100
  public/images/42/original_photo_0192a4b7....jpg

Step paths may use @alias prefixes and {attribute} placeholders filled from
the record, e.g. \"@webroot/uploads/{id}\" with --attr id=42.

Run 'upload-pipeline gen-config' to generate a documented upload.toml.
Set RUST_LOG=debug for per-file logging.")]
#[command(version = env!("UPLOAD_PIPELINE_VERSION"))]
struct Cli {
    /// Pipeline configuration file
    #[arg(long, default_value = "upload.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a file through every step as if a record were saved with it
    Process {
        /// File to store
        file: PathBuf,

        /// Client file name (defaults to the file's own name)
        #[arg(long)]
        name: Option<String>,

        /// Treat the save as an update of an existing record
        #[arg(long)]
        update: bool,

        #[command(flatten)]
        record: RecordArgs,
    },
    /// Remove every step directory as if the record were deleted
    Delete {
        #[command(flatten)]
        record: RecordArgs,
    },
    /// Validate the configuration and list the resolved steps
    Check,
    /// Print a stock upload.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Process {
            file,
            name,
            update,
            record: args,
        } => {
            if !file.is_file() {
                return Err(format!("no such file: {}", file.display()).into());
            }
            let client_name = name.unwrap_or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

            let pipeline = UploadPipeline::new(config::load_config(&cli.config)?)?;
            let (pipeline, printer) = attach_printer(pipeline, args.json);

            let upload = UploadedFile::new(file, &client_name);
            let mut record = if update {
                args.record("update", false)
            } else {
                args.record("insert", true)
            };
            let prepared = pipeline.before_save(&mut record, Some(&upload));
            let result = if update {
                pipeline.after_update(&record, prepared.as_ref())
            } else {
                pipeline.after_insert(&record, prepared.as_ref())
            };
            drop(pipeline);
            finish_printer(printer)?;

            let report = result?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_save_report(&report);
            }
        }
        Command::Delete { record: args } => {
            let pipeline = UploadPipeline::new(config::load_config(&cli.config)?)?;
            let (pipeline, printer) = attach_printer(pipeline, args.json);

            let record = args.record("delete", false);
            let result = pipeline.after_delete(&record);
            drop(pipeline);
            finish_printer(printer)?;

            let report = result?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_cleanup_report(&report);
            }
        }
        Command::Check => {
            println!("==> Checking {}", cli.config.display());
            let config = config::load_config(&cli.config)?;
            let pipeline = UploadPipeline::new(config)?;
            output::print_step_list(pipeline.steps());
            println!("==> Configuration is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

type Printer = Option<std::thread::JoinHandle<()>>;

/// Stream progress events to stdout from a printer thread, unless the
/// command's output is JSON.
fn attach_printer(pipeline: UploadPipeline, json: bool) -> (UploadPipeline, Printer) {
    if json {
        return (pipeline, None);
    }
    let (tx, rx) = mpsc::channel::<PipelineEvent>();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_pipeline_event(&event) {
                println!("{}", line);
            }
        }
    });
    (pipeline.with_events(tx), Some(printer))
}

/// Wait for the printer to drain. The pipeline (and its sender) must already
/// be dropped.
fn finish_printer(printer: Printer) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(handle) = printer {
        handle.join().map_err(|_| "progress printer panicked")?;
    }
    Ok(())
}
