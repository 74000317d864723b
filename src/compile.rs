// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The `compile` command.
//!
//! Input files are read concurrently on the tokio runtime; the compilation
//! itself runs on the compiler's own worker threads inside
//! `spawn_blocking`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use ferrite_codegen::ast::Program;
use ferrite_codegen::{CompiledProgram, Compiler, SourceUnit};
use futures::future::try_join_all;
use owo_colors::OwoColorize;
use tracing::{debug, info};

use crate::cli::{Cli, CompileArgs, OutputFormat};
use crate::config::{Config, OutputConfig};

/// Runs `ferrite compile`.
pub async fn run(args: &CompileArgs, cli: &Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).await?;
    config.merge_args(args);

    let started = Instant::now();
    let compiled = compile_files(&args.files, &config).await?;
    info!(
        functions = compiled.functions.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "compiled"
    );

    let to_terminal = args.output.is_none();
    let rendered = render(&compiled, &config.output, to_terminal)?;
    match &args.output {
        Some(path) => tokio::fs::write(path, rendered)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{}", rendered),
    }

    if cli.verbose {
        eprintln!(
            "{} {} function(s) from {} file(s) in {:.2?}",
            "Compiled".green().bold(),
            compiled.functions.len(),
            args.files.len(),
            started.elapsed()
        );
    }
    Ok(())
}

/// Reads, binds and compiles `files`, one source unit per file.
pub async fn compile_files(files: &[PathBuf], config: &Config) -> Result<CompiledProgram> {
    let units = try_join_all(files.iter().map(|path| load_unit(path))).await?;

    let compiler = Compiler::new(config.compiler.clone());
    debug!(units = units.len(), threads = compiler.options().threads, "compiling");
    tokio::task::spawn_blocking(move || compiler.compile_units(&units))
        .await
        .context("compiler thread panicked")?
        .context("compilation failed")
}

async fn load_unit(path: &Path) -> Result<SourceUnit> {
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let program: Program =
        serde_json::from_str(&source).with_context(|| format!("{} is not a valid AST", path.display()))?;
    SourceUnit::new(path.display().to_string(), program).with_context(|| format!("failed to bind {}", path.display()))
}

/// Renders the program in the configured format.
pub fn render(compiled: &CompiledProgram, output: &OutputConfig, to_terminal: bool) -> Result<String> {
    match output.format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(compiled)?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Listing if output.color && to_terminal => Ok(colorize(&compiled.to_string())),
        OutputFormat::Listing => Ok(compiled.to_string()),
    }
}

/// Highlights function headers, labels and catch entries of a listing.
fn colorize(listing: &str) -> String {
    let mut out = String::with_capacity(listing.len());
    for line in listing.lines() {
        let trimmed = line.trim_start();
        if line.starts_with("function ") {
            out.push_str(&line.bright_cyan().bold().to_string());
        } else if line.starts_with("literal ") {
            out.push_str(&line.magenta().to_string());
        } else if trimmed.starts_with("catch ") {
            out.push_str(&line.red().to_string());
        } else if trimmed.ends_with(':') && trimmed.starts_with('L') {
            out.push_str(&line.yellow().to_string());
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}
