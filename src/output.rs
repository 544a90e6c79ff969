//! Terminal rendering for the `forge` binary: tables, styled notices and a
//! JSON mode.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};
use forge_core_model::{Planet, StarSystem, Status};
use serde::Serialize;

use crate::error::ForgeError;
use crate::notify::{Notice, NoticeLevel, NoticeSink};

/// Colors for consistent styling
pub struct Theme;

impl Theme {
    pub fn primary<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan()
    }

    pub fn success<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    pub fn warning<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    pub fn error<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    pub fn muted<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    /// Bold cyan
    pub fn header<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan().bold()
    }
}

/// Output mode for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Writes command results either as tables or as JSON documents on stdout
#[derive(Debug, Clone)]
pub struct OutputWriter {
    pub mode: OutputMode,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            mode: if json { OutputMode::Json } else { OutputMode::Human },
        }
    }

    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Print `value` as JSON, or run `human` to render it
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) {
        match self.mode {
            OutputMode::Json => match serde_json::to_string_pretty(value) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Error: failed to encode output: {e}"),
            },
            OutputMode::Human => human(value),
        }
    }

    /// Print an error; JSON mode writes an error document to stderr
    pub fn error(&self, err: &ForgeError) {
        match self.mode {
            OutputMode::Json => {
                let doc = ErrorDocument {
                    error: sanitize_error(&err.to_string()),
                    category: err.category().as_str(),
                    exit_code: err.exit_code(),
                };
                if let Ok(json) = serde_json::to_string(&doc) {
                    eprintln!("{json}");
                }
            }
            OutputMode::Human => {
                eprintln!(
                    "{} {}",
                    Theme::error(format!("✗ Error [{}]:", err.category())),
                    sanitize_error(&err.to_string())
                );
                if let Some(guidance) = err.guidance() {
                    eprintln!("  {} {}", Theme::muted("→"), Theme::muted(guidance.hint()));
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorDocument {
    error: String,
    category: &'static str,
    exit_code: i32,
}

/// Collapse whitespace so messages stay on one line
pub fn sanitize_error(msg: &str) -> String {
    msg.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Prints notices to stderr with level colors; silent in JSON mode
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    quiet: bool,
}

impl ConsoleSink {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl NoticeSink for ConsoleSink {
    fn notify(&self, notice: Notice) {
        if self.quiet {
            return;
        }
        let line = notice.to_string();
        let styled = match notice.level {
            NoticeLevel::Success => Theme::success(line),
            NoticeLevel::Info => Theme::primary(line),
            NoticeLevel::Warning => Theme::warning(line),
            NoticeLevel::Error => Theme::error(line),
        };
        eprintln!("{styled}");
    }
}

fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header_cells(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).fg(Color::Cyan).add_attribute(Attribute::Bold))
        .collect()
}

fn status_cell(status: Status) -> Cell {
    let color = match status {
        Status::Active => Color::Green,
        Status::Deploying => Color::Yellow,
        Status::Inactive => Color::DarkGrey,
    };
    Cell::new(status).fg(color)
}

pub fn systems_table(systems: &[StarSystem]) -> Table {
    let mut table = create_table();
    table.set_header(header_cells(&[
        "ID", "Name", "Status", "Tribute", "Planets", "Chain", "Owner",
    ]));
    for system in systems {
        table.add_row(vec![
            Cell::new(&system.id),
            Cell::new(&system.name).add_attribute(Attribute::Bold),
            status_cell(system.status),
            Cell::new(format!("{}%", system.tribute_percent)),
            Cell::new(system.planets.len()),
            Cell::new(system.chain_id.map_or_else(|| "-".to_string(), |id| id.to_string())),
            Cell::new(&system.owner_wallet),
        ]);
    }
    table
}

pub fn planets_table(planets: &[Planet]) -> Table {
    let mut table = create_table();
    table.set_header(header_cells(&[
        "ID", "Name", "Type", "Node", "Status", "Address", "Star system",
    ]));
    for planet in planets {
        table.add_row(vec![
            Cell::new(&planet.id),
            Cell::new(&planet.name).add_attribute(Attribute::Bold),
            Cell::new(planet.planet_type),
            Cell::new(planet.node_type),
            status_cell(planet.status),
            Cell::new(&planet.ip_address),
            Cell::new(&planet.star_system_id),
        ]);
    }
    table
}

/// Key/value view of a single star system
pub fn system_card(system: &StarSystem) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_NO_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let treasury = system
        .treasury_balance
        .iter()
        .map(|(token, amount)| format!("{amount} {token}"))
        .collect::<Vec<_>>()
        .join(", ");
    let rows = [
        ("Name", system.name.clone()),
        ("ID", system.id.to_string()),
        ("Status", system.status.to_string()),
        ("Subnet", system.subnet_id.clone()),
        ("RPC", system.rpc_url.clone()),
        ("Chain ID", system.chain_id.map_or_else(|| "-".to_string(), |id| id.to_string())),
        ("Tribute", format!("{}%", system.tribute_percent)),
        ("Treasury", treasury),
        ("Owner", system.owner_wallet.clone()),
        ("Created", system.created_at.to_rfc3339()),
    ];
    for (key, value) in rows {
        table.add_row(vec![
            Cell::new(key).fg(Color::Cyan),
            Cell::new(value).add_attribute(Attribute::Bold),
        ]);
    }
    table
}
