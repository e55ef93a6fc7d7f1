// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use davclient::{dav::Depth, record::Value};
use davsync::{OperationKind, ResourceShape};

#[derive(Clone, ValueEnum)]
enum Verbosity {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Flags describing how the target resource is written to.
///
/// Each flag is enabled if set here or in the profile.
#[derive(Args)]
pub(crate) struct ShapeArgs {
    /// The target is a collection; reads list its members by default.
    #[arg(long)]
    pub(crate) collection: bool,

    /// Updates create the collection with MKCOL and then set its properties.
    #[arg(long)]
    pub(crate) extended_collection: bool,

    /// Updates send the whole record with PUT.
    #[arg(long)]
    pub(crate) force_put: bool,
}

impl ShapeArgs {
    pub(crate) fn merge(&self, defaults: ResourceShape) -> ResourceShape {
        ResourceShape {
            is_collection: self.collection || defaults.is_collection,
            extended_collection: self.extended_collection || defaults.extended_collection,
            force_put: self.force_put || defaults.force_put,
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch properties of a resource, or of the members of a collection.
    Read {
        url: String,
        /// One of `0`, `1` or `infinity`. Defaults to `1` for collections.
        #[arg(long)]
        depth: Option<Depth>,
    },
    /// Create a new resource inside a collection.
    Create {
        url: String,
        /// A field to write, as `key=value`. May be repeated.
        #[arg(long = "set", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
    /// Replace the properties of a resource.
    Update {
        url: String,
        /// A field to write, as `key=value`. May be repeated.
        #[arg(long = "set", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
    /// Change some properties of a resource.
    Patch {
        url: String,
        /// A field to write, as `key=value`. May be repeated.
        #[arg(long = "set", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
    /// Delete a resource.
    Delete { url: String },
}

impl Command {
    pub(crate) fn kind(&self) -> OperationKind {
        match self {
            Command::Read { .. } => OperationKind::Read,
            Command::Create { .. } => OperationKind::Create,
            Command::Update { .. } => OperationKind::Update,
            Command::Patch { .. } => OperationKind::Patch,
            Command::Delete { .. } => OperationKind::Delete,
        }
    }
}

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// TOML file with server details and property mappings.
    #[arg(short, long)]
    pub(crate) profile: PathBuf,

    #[command(flatten)]
    pub(crate) shape: ShapeArgs,

    #[command(subcommand)]
    pub(crate) command: Command,

    /// Change logging verbosity
    #[clap(short, long)]
    verbose: Option<Verbosity>,
}

impl Cli {
    /// Returns the desired log level. The default log level is WARN.
    pub(crate) fn log_level(&self) -> log::Level {
        match self.verbose {
            Some(Verbosity::Error) => log::Level::Error,
            Some(Verbosity::Warn) | None => log::Level::Warn,
            Some(Verbosity::Info) => log::Level::Info,
            Some(Verbosity::Debug) => log::Level::Debug,
            Some(Verbosity::Trace) => log::Level::Trace,
        }
    }
}

/// Parses a `key=value` argument.
///
/// Values that look like a boolean or an integer are sent as such.
fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }

    let value = match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => other
            .parse::<i64>()
            .map_or_else(|_| Value::from(other), Value::Integer),
    };
    Ok((key.to_string(), value))
}
