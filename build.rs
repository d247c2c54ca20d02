//! Build script for Liquid Glass.
//!
//! Copies the `.env.example` template into the local data directory
//! (`liquidglass/` under the platform data dir), next to where
//! [`config::load_env`] looks for `.env`. A missing template only warns.

use std::{env, fs, path::PathBuf};

const TEMPLATE: &str = ".env.example";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed={TEMPLATE}");

    let source = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?).join(TEMPLATE);
    if !source.is_file() {
        println!("cargo:warning={TEMPLATE} not found at {}", source.display());
        return Ok(());
    }

    let mut target = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    target.push("liquidglass");
    fs::create_dir_all(&target)?;

    // Skip the write when nothing changed.
    let target = target.join(TEMPLATE);
    let contents = fs::read_to_string(&source)?;
    if fs::read_to_string(&target).ok().as_deref() != Some(contents.as_str()) {
        fs::write(&target, contents)?;
    }

    Ok(())
}
