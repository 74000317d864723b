// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Command line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// ferrite - register bytecode compiler for JavaScript ASTs
#[derive(Parser, Debug)]
#[command(name = "ferrite")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./ferrite.toml when present)
    #[arg(short, long, global = true, env = "FERRITE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile JSON-encoded ASTs to bytecode
    #[command(alias = "c")]
    Compile(CompileArgs),
}

/// Output encodings.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Human readable listing
    #[default]
    Listing,
    /// The compiled program as JSON
    Json,
}

#[derive(Args, Debug, Default)]
pub struct CompileArgs {
    /// AST files, one source unit each
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Emit scope-info literal buffers
    #[arg(long)]
    pub debug: bool,

    /// One compile job per file instead of one per function
    #[arg(long)]
    pub merge: bool,

    /// Worker threads
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Disable coloured listings
    #[arg(long)]
    pub no_color: bool,
}
