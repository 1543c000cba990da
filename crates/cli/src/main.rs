//! dcim-cli: run the placement engine over document files.
//!
//! Loads a canvas document, applies gestures, command scripts or generated
//! layouts to it, and writes the result back out.

mod logger;

use anyhow::{bail, Context, Result};
use api::{execute_command, Command, CommandResult};
use canvas::{Canvas, CanvasError};
use clap::{ArgAction, Parser, Subcommand};
use dcim_core::EngineConfig;
use generator::{layout_schema, AdvisorSession, LayoutMode, ReplayAdvisor};
use glam::Vec2;
use interchange::Document;
use logger::DcimLogger;
use node::ElementId;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Rack layout placement engine
#[derive(Parser)]
#[command(name = "dcim-cli")]
#[command(about = "Inspect, validate and edit rack layout documents")]
struct Cli {
    /// Engine configuration file (JSON); defaults apply to missing fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write the log to ~/.dcim/logs/
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print element counts and rack occupancy
    Inspect { document: PathBuf },

    /// Check a document's invariants; exits non-zero on a violation
    Check { document: PathBuf },

    /// Place a layout description saved from the advisor
    Generate {
        #[arg(long, default_value_t = LayoutMode::Rack)]
        mode: LayoutMode,
        /// Advisor response holding the layout JSON
        #[arg(long)]
        response: PathBuf,
        /// Document to add the layout to (default: an empty canvas)
        #[arg(long)]
        into: Option<PathBuf>,
        /// Request text the layout was generated for
        #[arg(long, default_value = "")]
        request: String,
        #[arg(long)]
        out: PathBuf,
    },

    /// Drag one element and release it with its top-left corner at (x, y)
    Drop {
        document: PathBuf,
        #[arg(long)]
        id: String,
        #[arg(long)]
        x: f32,
        #[arg(long)]
        y: f32,
        /// Where to write the result (default: print only)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Run a JSON command, or a list of commands, against a document
    Exec {
        document: PathBuf,
        commands: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the JSON schema of a layout description
    Schema {
        #[arg(long, default_value_t = LayoutMode::Rack)]
        mode: LayoutMode,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    DcimLogger::init(DcimLogger::level_for(cli.verbose), cli.log_file)?;

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Inspect { document } => inspect(&document, config),
        Commands::Check { document } => check(&document, config),
        Commands::Generate {
            mode,
            response,
            into,
            request,
            out,
        } => generate(mode, &response, into.as_deref(), &request, &out, config),
        Commands::Drop {
            document,
            id,
            x,
            y,
            out,
        } => drop_element(&document, id.into(), Vec2::new(x, y), out.as_deref(), config),
        Commands::Exec {
            document,
            commands,
            out,
        } => exec(&document, &commands, out.as_deref(), config),
        Commands::Schema { mode } => {
            println!("{}", serde_json::to_string_pretty(&layout_schema(mode))?);
            Ok(())
        }
    }
}

fn load_canvas(path: &Path, config: EngineConfig) -> Result<Canvas> {
    let document = Document::load(path)?;
    Canvas::from_document(document, config)
        .with_context(|| format!("Failed to load {}", path.display()))
}

fn save_canvas(canvas: &Canvas, path: &Path) -> Result<()> {
    canvas.to_document().save(path)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

fn inspect(path: &Path, config: EngineConfig) -> Result<()> {
    let canvas = load_canvas(path, config)?;
    let graph = canvas.graph();

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for element in graph.iter() {
        *counts.entry(element.kind().to_string()).or_default() += 1;
    }
    println!("{}: {} elements, {} connections", path.display(), graph.len(), canvas.connections().len());
    for (kind, count) in &counts {
        println!("  {kind:<16} {count}");
    }

    for rack in graph.iter().filter(|e| e.kind().is_rack_like()) {
        let occupancy = canvas.occupancy(&rack.id)?;
        let total_u = rack.total_u().unwrap_or_default();
        let used: u32 = occupancy.iter().map(|(_, slots)| slots.height).sum();
        println!();
        println!("{} ({}, {}): {used}/{total_u}U used", rack.label(), rack.id, rack.kind());
        for (id, slots) in occupancy.iter().rev() {
            let label = graph.get(id).map(|e| e.label()).unwrap_or_default();
            println!("  {:<10} {label} ({id})", slots.to_string());
        }
    }
    Ok(())
}

fn check(path: &Path, config: EngineConfig) -> Result<()> {
    let document = Document::load(path)?;
    match Canvas::from_document(document, config) {
        Ok(_) => {
            println!("{}: ok", path.display());
            Ok(())
        }
        Err(CanvasError::Invariants(violations)) => {
            for violation in &violations {
                println!("{}: {violation}", path.display());
            }
            bail!("{} invariant violation(s)", violations.len())
        }
        Err(err) => Err(err).with_context(|| format!("Failed to load {}", path.display())),
    }
}

fn generate(
    mode: LayoutMode,
    response: &Path,
    into: Option<&Path>,
    request: &str,
    out: &Path,
    config: EngineConfig,
) -> Result<()> {
    let text = std::fs::read_to_string(response)
        .with_context(|| format!("Failed to read {}", response.display()))?;
    let mut canvas = match into {
        Some(path) => load_canvas(path, config)?,
        None => Canvas::new(config),
    };

    let advisor = ReplayAdvisor::new().with_layout(text);
    let mut session = AdvisorSession::new();
    let inserted = smol::block_on(session.generate(&advisor, &mut canvas, request, mode))?;
    let count = inserted.map(|ids| ids.len()).unwrap_or_default();
    println!("Inserted {count} elements");
    save_canvas(&canvas, out)
}

fn drop_element(
    path: &Path,
    id: ElementId,
    position: Vec2,
    out: Option<&Path>,
    config: EngineConfig,
) -> Result<()> {
    let mut canvas = load_canvas(path, config)?;
    let result = execute_command(
        &mut canvas,
        Command::Batch {
            commands: vec![
                Command::DragStart { id: id.clone() },
                Command::DragMove {
                    id: id.clone(),
                    position,
                },
                Command::DragEnd { id, position },
            ],
        },
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    if let CommandResult::Error { message } = result {
        bail!(message);
    }
    if let Some(out) = out {
        save_canvas(&canvas, out)?;
    }
    Ok(())
}

fn exec(path: &Path, commands: &Path, out: Option<&Path>, config: EngineConfig) -> Result<()> {
    let mut canvas = load_canvas(path, config)?;
    let text = std::fs::read_to_string(commands)
        .with_context(|| format!("Failed to read {}", commands.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", commands.display()))?;
    let commands: Vec<Command> = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        _ => vec![serde_json::from_value(value)?],
    };

    let mut failed = 0;
    for command in commands {
        let result = execute_command(&mut canvas, command);
        if result.is_error() {
            failed += 1;
        }
        println!("{}", serde_json::to_string(&result)?);
    }
    if let Some(out) = out {
        save_canvas(&canvas, out)?;
    }
    if failed > 0 {
        bail!("{failed} command(s) failed");
    }
    Ok(())
}
