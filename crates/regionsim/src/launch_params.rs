//! Launch parameter parsing for the region tools.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use regionscene::terrain::TerrainEffect;
use uuid::Uuid;

/// Default brush strength for terraform requests.
const DEFAULT_STRENGTH: f32 = 1.0;
/// Default brush duration in seconds.
const DEFAULT_DURATION: f32 = 0.25;

/// Launch parameters for the region tools.
#[derive(Debug)]
pub struct LaunchParams {
    /// Region configuration file. The built-in defaults are used when absent.
    pub config: Option<PathBuf>,
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Decode a base64 shape record and print its parameters.
    Shape {
        /// The 45-byte record, base64 encoded.
        record: String,
    },
    /// Load an object group from XML and list its parts.
    Inspect {
        /// Path to the object XML.
        path: PathBuf,
        /// Culture whose names and descriptions are shown.
        #[arg(long)]
        culture: Option<String>,
    },
    /// Apply one terraform brush to the configured region.
    Terraform {
        /// Effect name: flatten, raise, lower, smooth, noise or revert.
        #[arg(long, value_parser = parse_effect)]
        effect: TerrainEffect,
        /// Agent the request is made on behalf of.
        #[arg(long)]
        agent: Uuid,
        /// Paint centre as `x,y`. Ignored when `--flood` is given.
        #[arg(long, value_parser = parse_pair, default_value = "128,128")]
        at: (f32, f32),
        /// Paint radius in metres.
        #[arg(long, default_value_t = 4.0)]
        radius: f32,
        /// Flood rectangle as `west,south,east,north`.
        #[arg(long, value_parser = parse_rect)]
        flood: Option<[f32; 4]>,
        #[arg(long, default_value_t = DEFAULT_STRENGTH)]
        strength: f32,
        #[arg(long, default_value_t = DEFAULT_DURATION)]
        duration: f32,
    },
    /// Print the default region configuration as JSON.
    DefaultConfig,
}

fn parse_effect(s: &str) -> Result<TerrainEffect, String> {
    s.parse::<TerrainEffect>().map_err(|e| e.to_string())
}

fn parse_floats(s: &str, expected: usize) -> Result<Vec<f32>, String> {
    let values = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| format!("invalid number '{part}': {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != expected {
        return Err(format!("expected {expected} comma-separated numbers, got '{s}'"));
    }
    Ok(values)
}

fn parse_pair(s: &str) -> Result<(f32, f32), String> {
    let values = parse_floats(s, 2)?;
    Ok((values[0], values[1]))
}

fn parse_rect(s: &str) -> Result<[f32; 4], String> {
    let values = parse_floats(s, 4)?;
    Ok([values[0], values[1], values[2], values[3]])
}

#[derive(Parser)]
#[command(about = "Tools for inspecting region objects and terraforming")]
struct CliArgs {
    /// Region configuration file (JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Parse launch parameters from the command line.
pub fn parse() -> LaunchParams {
    let args = CliArgs::parse();
    LaunchParams {
        config: args.config,
        command: args.command,
    }
}
