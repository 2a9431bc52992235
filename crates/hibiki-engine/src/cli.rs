//! CLI surface (spec.md §6.3): `--list <module>` prints discoverable plugin
//! classes and exits; no-argument invocation runs the engine proper.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "hibiki-engine", author, version, about = "Hibiki DAW audio engine", long_about = None)]
pub struct Cli {
    /// List every effect/instrument class found in a VST3 module and exit.
    #[arg(long = "list", value_name = "PLUGIN_MODULE_PATH")]
    pub list: Option<PathBuf>,
}
