//! `ppc_recomp` — static PowerPC-to-x86-64 recompiler CLI.
//!
//! Wires the image, switch-table store, and config documents into a
//! [`FunctionRecompiler`] pass over every function in the image, writing the
//! generated sources through an [`OutputSink`]. See the module docs on
//! [`disassembler`] and [`image`] for what this binary does and does not
//! implement: both the container format and the instruction decoder are
//! external collaborators specified only by their trait shape.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use hashbrown::HashMap;
use serde::de::Error as _;

use ppc_recomp::config::Config;
use ppc_recomp::disassembler::{DecodedInstruction, Disassembler};
use ppc_recomp::error::{RecompError, Result};
use ppc_recomp::function::{self, FunctionRecompiler};
use ppc_recomp::image::{Function, Image, MemoryImage, SymbolKind};
use ppc_recomp::output::OutputSink;
use ppc_recomp::switch_table::SwitchTableStore;

/// Guest base address used when no image loader supplies a real one. The
/// container format (XEX, PE, ...) is out of scope for this crate; see
/// `load_image`.
const DEFAULT_BASE: u32 = 0;

#[derive(Parser, Debug)]
#[command(name = "ppc_recomp", version, about = "Static PowerPC-to-x86-64 recompiler")]
struct Cli {
    /// Executable image to recompile.
    #[arg(long)]
    image: PathBuf,

    /// Switch-table TOML document (branch site -> case register, targets).
    #[arg(long = "switch-table")]
    switch_table: Option<PathBuf>,

    /// Config document overriding the boolean knob defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for generated sources, created if missing.
    #[arg(long)]
    out: PathBuf,

    /// Raise the log filter toward debug/trace; repeatable.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: &Cli) -> Result<()> {
    let image = load_image(&cli.image)?;
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    let switch_tables = match &cli.switch_table {
        Some(path) => load_switch_tables(path)?,
        None => SwitchTableStore::empty(),
    };
    let disassembler = UnimplementedDisassembler;

    let names_by_address: HashMap<u32, String> = image
        .symbols()
        .iter()
        .filter(|s| s.kind == SymbolKind::Function)
        .map(|s| (s.address, s.name.clone()))
        .collect();
    let resolve_symbol = |address: u32| names_by_address.get(&address).map(String::as_str);

    let mut sink = OutputSink::new(&cli.out);
    sink.write_config_header(&config)?;
    sink.write_shared_header(image.symbols())?;

    let mut mapping = Vec::new();
    let recompiler = FunctionRecompiler {
        disassembler: &disassembler,
        switch_tables: &switch_tables,
        resolve_symbol: &resolve_symbol,
    };
    for &func in image.functions() {
        let name = names_by_address
            .get(&func.base)
            .cloned()
            .unwrap_or_else(|| function::default_name(func.base));
        let result = recompiler.recompile(&image, func, &config, &name);
        if !result.fully_recognized {
            tracing::warn!(base = func.base, name, "function emitted with unrecognized instructions");
        }
        sink.push_function(&result.source)?;
        mapping.push((func.base, name));
    }
    sink.finish()?;
    sink.write_function_mapping(&mapping)?;

    Ok(())
}

/// Load the executable image. The container format itself (XEX, PE, ...) is
/// an out-of-scope external collaborator (§1); absent a real loader, the
/// whole file is treated as one opaque function spanning its entire length,
/// which is enough to exercise every in-scope component (translator,
/// function recompiler, output sink) against real bytes end to end.
fn load_image(path: &Path) -> Result<MemoryImage> {
    let bytes = fs::read(path)
        .map_err(|source| RecompError::ImageLoad { path: path.to_path_buf(), source: anyhow::Error::new(source) })?;
    let size = u32::try_from(bytes.len())
        .map_err(|source| RecompError::ImageLoad { path: path.to_path_buf(), source: anyhow::Error::new(source) })?;
    let function = Function { base: DEFAULT_BASE, size };
    Ok(MemoryImage::new(DEFAULT_BASE, bytes, Vec::new(), vec![function]))
}

fn load_config(path: &Path) -> Result<Config> {
    let text = read_document(path).map_err(|source| RecompError::ConfigParse { path: path.to_path_buf(), source })?;
    Config::from_toml_str(&text).map_err(|source| RecompError::ConfigParse { path: path.to_path_buf(), source })
}

fn load_switch_tables(path: &Path) -> Result<SwitchTableStore> {
    let text =
        read_document(path).map_err(|source| RecompError::SwitchTableParse { path: path.to_path_buf(), source })?;
    SwitchTableStore::from_toml_str(&text)
        .map_err(|source| RecompError::SwitchTableParse { path: path.to_path_buf(), source })
}

/// Read a TOML document as text, folding an I/O failure into the same
/// deserialization-error type its caller reports with.
fn read_document(path: &Path) -> std::result::Result<String, toml::de::Error> {
    fs::read_to_string(path).map_err(toml::de::Error::custom)
}

/// Placeholder [`Disassembler`]: the real PowerPC decoder is an external
/// collaborator out of scope for this crate (§1), so every word reports as
/// unrecognized. A production build links a real decoder in its place.
struct UnimplementedDisassembler;

impl Disassembler for UnimplementedDisassembler {
    fn decode(&self, _address: u32, _word: u32) -> Option<DecodedInstruction> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_image_treats_whole_file_as_one_function() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.bin");
        fs::write(&path, [0x7Cu8, 0x64, 0x2A, 0x14]).unwrap();
        let image = load_image(&path).unwrap();
        assert_eq!(image.functions().len(), 1);
        assert_eq!(image.functions()[0].base, DEFAULT_BASE);
        assert_eq!(image.functions()[0].size, 4);
        assert_eq!(image.read_u32(DEFAULT_BASE), Some(0x7C642A14));
    }

    #[test]
    fn load_config_reports_missing_file_as_config_parse_error() {
        let err = load_config(Path::new("/nonexistent/ppc_recomp_test_config.toml")).unwrap_err();
        assert!(matches!(err, RecompError::ConfigParse { .. }));
    }

    #[test]
    fn load_switch_tables_parses_a_real_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switch.toml");
        fs::write(&path, "[[switch]]\nbase = 4096\nr = 3\nlabels = [4096]\n").unwrap();
        let store = load_switch_tables(&path).unwrap();
        assert!(store.get(4096).is_some());
    }
}
