//! Command-line front end: render a schema file to SVG.

use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use log::{debug, info};

use crate::config::AppConfig;
use crate::diagram::DragSession;
use crate::error::Error;
use crate::scene::Canvas;

/// Render a table schema file as an ER diagram
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input schema file
    pub input: PathBuf,

    /// Output SVG file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Drag a table after layout, e.g. `--move User=0,120`. Repeatable.
    #[arg(long = "move", value_name = "TABLE=DX,DY")]
    pub moves: Vec<TableMove>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// A drag of one table by a fixed offset.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMove {
    pub table: String,
    pub dx: f64,
    pub dy: f64,
}

impl FromStr for TableMove {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (table, offset) = s
            .split_once('=')
            .ok_or_else(|| format!("expected TABLE=DX,DY, got `{s}`"))?;
        let (dx, dy) = offset
            .split_once(',')
            .ok_or_else(|| format!("expected DX,DY after `=`, got `{offset}`"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid offset `{v}`: {e}"))
        };

        let table = table.trim();
        if table.is_empty() {
            return Err(format!("missing table name in `{s}`"));
        }

        Ok(Self {
            table: table.to_string(),
            dx: parse(dx)?,
            dy: parse(dy)?,
        })
    }
}

pub fn run(args: &Args) -> Result<(), Error> {
    info!(input:? = args.input; "Processing schema");

    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let source = fs::read_to_string(&args.input)?;
    let mut canvas = Canvas::load(&source, &config)?;
    apply_moves(&mut canvas, &args.moves)?;
    let svg = canvas.render_svg();

    match &args.output {
        Some(path) => {
            fs::write(path, svg)?;
            info!(output:? = path; "SVG written");
        }
        None => print!("{}", svg),
    }

    Ok(())
}

/// Replay each move as press, drag, release, rerouting after every applied drag.
pub fn apply_moves(canvas: &mut Canvas, moves: &[TableMove]) -> Result<(), Error> {
    let dirty = Cell::new(false);
    let mut session = DragSession::with_recompute(|| dirty.set(true));

    for m in moves {
        session.press(m.table.as_str());
        let moved = session.drag_by(canvas.diagram_mut(), m.dx, m.dy);
        session.release();

        if !moved {
            return Err(Error::UnknownTable(m.table.clone()));
        }
        if dirty.replace(false) {
            let routed = canvas.refresh().len();
            debug!(table = m.table.as_str(), connectors = routed; "Rerouted after move");
        }
    }

    Ok(())
}
