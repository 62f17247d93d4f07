//! VRML export command

use crate::VrmlArgs;
use anyhow::{Context, Result};
use tracing::trace;

use super::load_gamut;

pub fn run(args: VrmlArgs, verbose: u8) -> Result<()> {
    trace!(input = %args.input.display(), "vrml::run");

    let gamut = load_gamut(&args.input)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("wrl"));

    gamut
        .write_vrml(&output, args.axes, args.cusps)
        .with_context(|| format!("Failed to save: {}", output.display()))?;

    if verbose > 0 {
        println!(
            "{} -> {} ({} vertices)",
            args.input.display(),
            output.display(),
            gamut.vertex_count().unwrap_or(0)
        );
    }
    Ok(())
}
