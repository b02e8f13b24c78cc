/// Command line interface
///
/// `serve` (the default) runs the webhook receiver. The other subcommands drive the same
/// pipeline by hand: generate a workbook from a local input file, list board items, dump an
/// item's inputs, or export an item to `outputs/`.

use crate::config::Config;
use crate::eob::inputs::{example_inputs, load_inputs};
use crate::eob::workbook::write_workbook;
use crate::eob::{generate, Guidelines, Mode};
use crate::export::{export_filename, ExportService};
use crate::server::start_server;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "eob-bridge")]
#[command(version)]
#[command(about = "Monday.com webhook receiver and EOB estimate generator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the webhook server (default when no command is given)
    Serve {
        /// Bind host (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Generate an EOB workbook from a local input file
    Generate {
        /// Which estimator to run
        #[arg(long, value_enum, default_value_t = Mode::Residential)]
        mode: Mode,

        /// Input file (.json or legacy .txt); calculator defaults when omitted
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output .xlsx path
        #[arg(long, required_unless_present = "example")]
        output: Option<PathBuf>,

        /// Commercial guideline table (overrides EOB_GUIDELINES_PATH)
        #[arg(long)]
        guidelines: Option<PathBuf>,

        /// Print an example input document for the mode and exit
        #[arg(long)]
        example: bool,
    },

    /// List the items on the configured board
    Items {
        /// Board to list (overrides MONDAY_BOARD_ID)
        #[arg(long)]
        board_id: Option<u64>,
    },

    /// Show the estimator inputs derived from a board item
    Inputs {
        #[arg(long)]
        item_id: u64,

        /// Also write the field inputs as JSON to this path
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Generate an item's workbook locally
    Export {
        #[arg(long)]
        item_id: u64,

        /// Output path, must be under the output directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Upload the generated workbook to Dropbox afterwards
        #[arg(long)]
        upload_dropbox: bool,
    },
}

impl Cli {
    pub async fn run(self, mut config: Config) -> Result<()> {
        match self.command.unwrap_or(Commands::Serve {
            host: None,
            port: None,
        }) {
            Commands::Serve { host, port } => {
                if let Some(host) = host {
                    config.server.host = host;
                }
                if let Some(port) = port {
                    config.server.port = port;
                }
                start_server(config).await
            }
            Commands::Generate {
                mode,
                input,
                output,
                guidelines,
                example,
            } => {
                if example {
                    println!("{}", serde_json::to_string_pretty(&example_inputs(mode))?);
                    return Ok(());
                }
                let output = output.context("--output is required")?;
                let guidelines_path =
                    guidelines.unwrap_or_else(|| config.export.guidelines_path.clone());
                run_generate(&config, mode, input.as_deref(), &output, &guidelines_path)
            }
            Commands::Items { board_id } => {
                let service = service(config)?;
                let board_id = match board_id {
                    Some(id) => id,
                    None => service.config().monday.require_board()?,
                };
                let items = service.monday()?.list_board_items(board_id).await?;
                for item in items {
                    println!("{} : {}", item.name, item.id);
                }
                Ok(())
            }
            Commands::Inputs { item_id, json } => {
                let service = service(config)?;
                let prepared = service.prepare_item(item_id).await?;
                println!("Item: {} ({})", prepared.name, prepared.item_id);
                println!("Mode: {}", prepared.mode);
                println!("Fields:");
                for (key, value) in &prepared.fields {
                    println!("  {key}: {value}");
                }
                println!("Cells:");
                for (cell, value) in &prepared.cells {
                    println!("  {cell} = {value}");
                }
                if prepared.missing.is_empty() {
                    println!("All required fields present");
                } else {
                    println!("Missing required: {}", prepared.missing.join(", "));
                }
                if let Some(path) = json {
                    create_parent(&path)?;
                    std::fs::write(&path, serde_json::to_string_pretty(&prepared.fields)?)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                Ok(())
            }
            Commands::Export {
                item_id,
                out,
                upload_dropbox,
            } => {
                let service = service(config)?;
                let prepared = service.prepare_item(item_id).await?;
                let output_dir = service.config().export.output_dir.clone();
                let out_path = match out {
                    Some(path) => {
                        ensure_under(&path, &output_dir)?;
                        path
                    }
                    None => output_dir.join(export_filename(&prepared.fields)),
                };

                let today = chrono::Local::now().date_naive();
                let bytes = service.build_workbook(&prepared, today)?;
                create_parent(&out_path)?;
                std::fs::write(&out_path, &bytes)
                    .with_context(|| format!("writing {}", out_path.display()))?;
                println!("Generated {}", out_path.display());

                if upload_dropbox {
                    let filename = out_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| export_filename(&prepared.fields));
                    match service
                        .upload_to_dropbox(&prepared.fields, &filename, bytes, today)
                        .await
                    {
                        Some(path) => println!("Uploaded to Dropbox: {path}"),
                        None => println!("Dropbox upload skipped or failed (see logs)"),
                    }
                }
                Ok(())
            }
        }
    }
}

fn service(config: Config) -> Result<ExportService> {
    Ok(ExportService::from_config(Arc::new(config))?)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

/// Reject paths outside `root`, including `..` escapes
pub fn ensure_under(path: &Path, root: &Path) -> Result<()> {
    let escapes = path.components().any(|c| matches!(c, Component::ParentDir));
    if escapes || !path.starts_with(root) || path == root {
        bail!("output path must be under {}/", root.display());
    }
    Ok(())
}

fn run_generate(
    config: &Config,
    mode: Mode,
    input: Option<&Path>,
    output: &Path,
    guidelines_path: &Path,
) -> Result<()> {
    let cells = load_inputs(mode, input)?;
    let guidelines = match mode {
        Mode::Commercial => Some(Guidelines::load(guidelines_path).with_context(|| {
            format!("loading commercial guidelines from {}", guidelines_path.display())
        })?),
        Mode::Residential => None,
    };
    let today = chrono::Local::now().date_naive();
    let payload = generate(mode, &cells, guidelines.as_ref(), config.export.bonus, today)?;
    write_workbook(&payload, output)?;
    tracing::info!("✅ Wrote {} estimate to {}", mode, output.display());
    println!("Generated {}", output.display());
    Ok(())
}
