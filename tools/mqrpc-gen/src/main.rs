// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! mqrpc client generator
//!
//! Renders service descriptions into client source ahead of time, for
//! builds that compile their clients instead of creating them at runtime.
//!
//! # Usage
//!
//! ```bash
//! # Rust client under .mqrpc/
//! mqrpc-gen synth calculator.json
//!
//! # TypeScript declarations into a chosen directory
//! mqrpc-gen synth calculator.json --target typescript --out web/types
//!
//! # Read the types back out of a generated client
//! mqrpc-gen check .mqrpc/calculatorClient.rs
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mqrpc::codegen::{parse_types, ClientIr, Emitter, RustEmitter, TypeScriptEmitter};
use mqrpc::{Options, ServiceDescription};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "mqrpc-gen")]
#[command(author = "naskel.com")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate typed mqrpc clients from service descriptions")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose mode (show internal logs)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Render a description file into client source
    Synth {
        /// Service description (JSON)
        description: PathBuf,

        /// Output language
        #[arg(short, long, value_enum, default_value = "rust")]
        target: TargetArg,

        /// Output directory (defaults to the configured artifact path)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Options file (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the source instead of writing it
        #[arg(long)]
        stdout: bool,
    },

    /// Print the type declarations recovered from a generated Rust client
    Check {
        /// Generated client source
        source: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TargetArg {
    Rust,
    Typescript,
}

impl TargetArg {
    fn emitter(self) -> Result<Box<dyn Emitter>> {
        Ok(match self {
            Self::Rust => Box::new(RustEmitter),
            Self::Typescript => {
                Box::new(TypeScriptEmitter::new().context("Failed to load TypeScript template")?)
            }
        })
    }
}

/// Source rendered for one description.
struct Rendered {
    file_name: String,
    source: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("mqrpc_gen=debug,mqrpc=debug")
    } else {
        EnvFilter::new("mqrpc_gen=info,mqrpc=warn")
    };
    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Command::Synth {
            description,
            target,
            out,
            config,
            stdout,
        } => {
            let rendered = render(&description, target)?;
            if stdout {
                print!("{}", rendered.source);
            } else {
                let dir = output_dir(out, config.as_deref())?;
                let path = write_rendered(&rendered, &dir)?;
                tracing::info!(path = %path.display(), "client written");
            }
        }
        Command::Check { source } => {
            println!("{}", check(&source)?);
        }
    }
    Ok(())
}

fn render(description: &Path, target: TargetArg) -> Result<Rendered> {
    let desc = ServiceDescription::from_file(description)?;
    let ir = ClientIr::from_description(&desc);
    tracing::debug!(
        service = %ir.service_name,
        methods = ir.methods.len(),
        types = ir.types.len(),
        ?target,
        "rendering client"
    );

    let emitter = target.emitter()?;
    let source = emitter
        .emit(&ir)
        .with_context(|| format!("Failed to render client for {}", ir.service_name))?;
    Ok(Rendered {
        file_name: format!("{}.{}", ir.module_name, emitter.extension()),
        source,
    })
}

fn output_dir(out: Option<PathBuf>, config: Option<&Path>) -> Result<PathBuf> {
    if let Some(out) = out {
        return Ok(out);
    }
    let options = match config {
        Some(path) => Options::from_file(path)?,
        None => Options::default(),
    };
    Ok(options.path)
}

fn write_rendered(rendered: &Rendered, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(&rendered.file_name);
    fs::write(&path, &rendered.source)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn check(source: &Path) -> Result<String> {
    let text = fs::read_to_string(source)
        .with_context(|| format!("Failed to read {}", source.display()))?;
    let types = parse_types(&text)
        .with_context(|| format!("{} is not a readable client", source.display()))?;
    Ok(serde_json::to_string_pretty(&types)?)
}
