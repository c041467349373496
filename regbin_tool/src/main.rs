// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

mod dump;
mod replay;

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use clap::Parser;
use regbin::Container;
use regbin::ParseSettings;

#[derive(Parser)]
enum Cli {
    /// Print the contents of a regbin image.
    Dump(dump::DumpCommand),
    /// Print the register operations one phase of a profile would perform.
    Replay(replay::ReplayCommand),
}

trait Command {
    fn run(self) -> anyhow::Result<()>;
}

impl Command for Cli {
    fn run(self) -> anyhow::Result<()> {
        match self {
            Cli::Dump(c) => c.run(),
            Cli::Replay(c) => c.run(),
        }
    }
}

/// Options shared by every command that reads an image.
#[derive(Args)]
struct ImageArgs {
    /// Path to the regbin image
    image: PathBuf,
    /// Yaml file overriding the parser limits
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl ImageArgs {
    fn load(&self) -> anyhow::Result<Container> {
        let settings = match &self.settings {
            Some(path) => ParseSettings::from_file(path)?,
            None => ParseSettings::default(),
        };
        load_image(&self.image, &settings)
    }
}

fn load_image(path: &Path, settings: &ParseSettings) -> anyhow::Result<Container> {
    let blob = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Container::parse(&blob, settings).with_context(|| format!("parse {}", path.display()))
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(e) = Cli::parse().run() {
        eprintln!("ERROR: {e:#}");
        std::process::exit(1);
    }
}
