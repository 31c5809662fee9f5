//! Command line and GUI front end for `byteview`.
//!
//! Without a subcommand the GUI opens on the optional FILE. The `dump` and
//! `session` subcommands run headless and print to stdout.

mod cui;
mod gui;
mod image;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use byteview::ViewerLocation;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cui::dump::DumpOptions;
use crate::image::{FileResolver, ImageLayout, UninitRange, open_image, parse_number};

/// Options shared by every command that opens files.
#[derive(clap::Args, Debug, Clone)]
struct LayoutArgs {
    /// Address of the first byte of the file
    #[arg(long, default_value = "0", value_parser = parse_number)]
    base: usize,

    /// Start a new block at this file offset (repeatable)
    #[arg(long = "split", value_name = "OFFSET", value_parser = parse_number)]
    splits: Vec<usize>,

    /// Mark LEN bytes from START as uninitialized (repeatable)
    #[arg(long = "uninit", value_name = "START:LEN")]
    uninit: Vec<UninitRange>,
}

impl LayoutArgs {
    fn layout(&self) -> ImageLayout {
        ImageLayout {
            base: self.base,
            splits: self.splits.clone(),
            uninit: self.uninit.iter().map(|r| r.0.clone()).collect(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render rows of a file as text
    Dump {
        /// File to display (.gz is decompressed)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Pane to show (repeatable): Hex, Ascii, Octal, Decimal, Binary
        #[arg(long = "view", value_name = "NAME")]
        views: Vec<String>,

        #[arg(long, default_value_t = 16)]
        bytes_per_line: usize,

        /// Bytes per hex group (1, 2, 4 or 8)
        #[arg(long, default_value_t = 1)]
        group: usize,

        /// Align rows to addresses congruent to this value
        #[arg(long, default_value = "0", value_parser = parse_number)]
        offset: usize,

        /// First row to print
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Number of rows to print
        #[arg(long)]
        rows: Option<usize>,

        /// Print space-padded text instead of a table
        #[arg(long)]
        plain: bool,

        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Save or restore a multi-view session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand, Debug)]
enum SessionAction {
    /// Open files (first one connected) and write their state as JSON
    Save {
        /// Session file to write
        #[arg(long, value_name = "OUT")]
        state: PathBuf,

        /// Move the cursor of the connected view first, e.g. `seg0@40`
        #[arg(long, value_name = "BLOCK@OFFSET")]
        at: Option<ViewerLocation>,

        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Re-open a saved session and list its views
    Restore {
        /// Session file to read
        #[arg(long, value_name = "IN")]
        state: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "byteview",
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// File to open in the GUI (supports .gz (gzipped) and raw files)
    file: Option<PathBuf>,

    #[command(flatten)]
    layout: LayoutArgs,
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Dump {
            file,
            views,
            bytes_per_line,
            group,
            offset,
            start,
            rows,
            plain,
            layout,
        } => {
            let source = open_image(&file, &layout.layout())?;
            let opts = DumpOptions {
                views,
                bytes_per_line,
                hex_group_size: group,
                offset,
                start,
                rows,
                plain,
            };
            print!("{}", cui::dump::dump(source, &opts)?);
            if !plain {
                println!();
            }
        }
        Commands::Session {
            action: SessionAction::Save {
                state,
                at,
                files,
                layout,
            },
        } => {
            let session = cui::session::save(&files, at.as_ref(), &layout.layout())?;
            cui::session::write_session(&state, &session)?;
            println!("saved {} file(s) to {}", files.len(), state.display());
        }
        Commands::Session {
            action: SessionAction::Restore { state, layout },
        } => {
            let session = cui::session::read_session(&state)?;
            let resolver = Rc::new(FileResolver::new(layout.layout()));
            let plugin = cui::session::restore(&session, resolver)
                .with_context(|| format!("failed to restore {}", state.display()))?;
            println!("{}", cui::session::provider_table(&plugin));
        }
    }
    Ok(())
}

fn main() {
    // Parse CLI args early so we can load the initial source before creating the UI.
    let args = Args::parse();
    init_tracing();

    if let Some(command) = args.command {
        match run(command) {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("error: {:#}", e);
                std::process::exit(1);
            }
        }
    }

    let layout = args.layout.layout();
    let mut initial = None;
    if let Some(path) = args.file {
        match open_image(&path, &layout) {
            Ok(source) => initial = Some(source),
            Err(e) => eprintln!("failed to read file: {:#}", e),
        }
    }

    gui::run_gui(initial);
}
