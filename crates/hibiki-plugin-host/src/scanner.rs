//! VST3 plugin discovery, used both by the `LoadPlugin` command path and
//! the engine's `--list` CLI flag.

use std::path::{Path, PathBuf};

use rack::{PluginInfo, PluginScanner, Scanner};
use tracing::info;

use crate::error::Vst3Error;

#[derive(Debug, Clone)]
pub struct Vst3PluginInfo {
    pub info: PluginInfo,
    pub name: String,
    pub is_instrument: bool,
}

pub struct Vst3Scanner {
    scanner: Scanner,
    plugins: Vec<Vst3PluginInfo>,
}

impl Vst3Scanner {
    pub fn new() -> Result<Self, Vst3Error> {
        let scanner = Scanner::new().map_err(|e| Vst3Error::LoadError(format!("{e:?}")))?;
        Ok(Self {
            scanner,
            plugins: Vec::new(),
        })
    }

    /// Scans a single module path (`engine --list <plugin_module_path>` and
    /// `LoadPlugin` both resolve against this).
    pub fn scan_path(&mut self, path: &Path) -> Result<&[Vst3PluginInfo], Vst3Error> {
        if !path.exists() {
            return Err(Vst3Error::NotFound(path.to_path_buf()));
        }
        let plugin_infos = self
            .scanner
            .scan_path(path)
            .map_err(|e| Vst3Error::LoadError(format!("{e:?}")))?;
        self.plugins = plugin_infos
            .into_iter()
            .map(|info| {
                let name = info.name.clone();
                let is_instrument = info.is_instrument;
                info!(name = %name, "found plugin class");
                Vst3PluginInfo { info, name, is_instrument }
            })
            .collect();
        if self.plugins.is_empty() {
            return Err(Vst3Error::NoPluginsFound);
        }
        Ok(&self.plugins)
    }

    pub fn plugins(&self) -> &[Vst3PluginInfo] {
        &self.plugins
    }

    pub fn at(&self, subindex: i32) -> Result<&Vst3PluginInfo, Vst3Error> {
        self.plugins.get(subindex as usize).ok_or_else(|| {
            Vst3Error::SubindexOutOfRange {
                path: PathBuf::new(),
                subindex,
            }
        })
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }
}
