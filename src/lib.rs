/// eob-bridge: Monday.com webhook receiver for EOB cost-segregation estimates
///
/// Answers Monday's webhook handshake, turns board items into residential or commercial
/// estimates, renders them as xlsx workbooks and uploads them to the item's file column
/// (and optionally to Dropbox).

// Environment-driven configuration
pub mod config;

// Estimate engine: inputs, MACRS, calculators, workbook writer
pub mod eob;

// Monday.com GraphQL client and item -> input mapping
pub mod monday;

// Optional Dropbox destination
pub mod dropbox;

// Item export pipeline shared by the webhook and the CLI
pub mod export;

// HTTP routes
pub mod api;

// Server setup and initialization
pub mod server;

// Command line entry points
pub mod cli;

pub use config::Config;
pub use eob::{EstimatorPayload, Mode};
pub use export::{ExportOutcome, ExportService};
pub use server::{create_app, start_server};
