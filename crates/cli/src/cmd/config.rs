//! Show the effective configuration

use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

use crate::util;

pub async fn run(path: Option<&Path>) -> Result<()> {
    let config = util::resolve_config(path, None)?;

    match path {
        Some(path) => println!("{}: {}\n", "Location".dimmed(), path.display().dimmed()),
        None => println!("{}\n", "No config file given; using defaults".dimmed()),
    }

    print!("{}", config.to_toml_string());
    Ok(())
}
