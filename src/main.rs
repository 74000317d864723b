// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! ferrite - register bytecode compiler for JavaScript ASTs
//!
//! This is the main entry point for the ferrite CLI.
//!
//! ## Features
//!
//! - Compiles JSON-encoded, parsed ASTs to register bytecode
//! - Async file loading with tokio
//! - Parallel compilation, per function or per file

use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod compile;
mod config;

use cli::{Cli, Commands};

/// Main entry point - uses tokio runtime for async operations.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let result = match &cli.command {
        Commands::Compile(args) => compile::run(args, &cli).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
