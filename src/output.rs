//! Output sink and file partitioner.
//!
//! A single growable buffer accumulates emitted lines; at partition
//! boundaries it is flushed to disk, skipping the write entirely when the
//! existing file's content hash already matches (so incremental builds see
//! an unchanged mtime).

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{RecompError, Result};
use crate::image::Symbol;

/// Functions per `ppc_recomp.<N>.cpp` partition.
const FUNCTIONS_PER_PARTITION: usize = 256;

/// Accumulates recompiled function bodies and flushes them to numbered
/// partition files, plus the fixed-name shared headers.
pub struct OutputSink {
    out_dir: PathBuf,
    buffer: String,
    functions_in_buffer: usize,
    partition_index: u32,
}

impl OutputSink {
    /// Create a sink writing into `out_dir`, creating it if missing.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        OutputSink {
            out_dir: out_dir.into(),
            buffer: String::new(),
            functions_in_buffer: 0,
            partition_index: 0,
        }
    }

    /// Append one recompiled function body, flushing the partition if it
    /// just reached the per-file cap.
    pub fn push_function(&mut self, source: &str) -> Result<()> {
        self.buffer.push_str(source);
        self.buffer.push('\n');
        self.functions_in_buffer += 1;
        if self.functions_in_buffer >= FUNCTIONS_PER_PARTITION {
            self.flush_partition()?;
        }
        Ok(())
    }

    /// Flush whatever remains in the current partition buffer, if any.
    pub fn finish(&mut self) -> Result<()> {
        if self.functions_in_buffer > 0 {
            self.flush_partition()?;
        }
        Ok(())
    }

    fn flush_partition(&mut self) -> Result<()> {
        let path = self.out_dir.join(format!("ppc_recomp.{}.cpp", self.partition_index));
        write_if_changed(&path, &self.buffer)?;
        self.buffer.clear();
        self.functions_in_buffer = 0;
        self.partition_index += 1;
        Ok(())
    }

    /// Emit `ppc_config.h`: conditional `#define`s mirroring the config
    /// knobs, so generated bodies and the runtime agree on shadowing.
    pub fn write_config_header(&self, config: &Config) -> Result<()> {
        let mut text = String::new();
        text.push_str("#pragma once\n\n");
        let defines = [
            ("PPC_CONFIG_SKIP_LR", config.skip_lr),
            ("PPC_CONFIG_SKIP_MSR", config.skip_msr),
            ("PPC_CONFIG_CTR_LOCAL", config.ctr_as_local_variable),
            ("PPC_CONFIG_XER_LOCAL", config.xer_as_local_variable),
            ("PPC_CONFIG_RESERVED_LOCAL", config.reserved_register_as_local_variable),
            ("PPC_CONFIG_CR_LOCAL", config.cr_registers_as_local_variables),
            ("PPC_CONFIG_NON_ARGUMENT_LOCAL", config.non_argument_registers_as_local_variables),
            ("PPC_CONFIG_NON_VOLATILE_LOCAL", config.non_volatile_registers_as_local_variables),
        ];
        for (name, enabled) in defines {
            if enabled {
                text.push_str(&format!("#define {name} 1\n"));
            }
        }
        write_if_changed(&self.out_dir.join("ppc_config.h"), &text)
    }

    /// Emit `ppc_recomp_shared.h`: an `extern` declaration per known symbol.
    pub fn write_shared_header(&self, symbols: &[Symbol]) -> Result<()> {
        let mut text = String::new();
        text.push_str("#pragma once\n#include \"ppc_context.h\"\n\n");
        for symbol in symbols {
            text.push_str(&format!("PPC_EXTERN_FUNC({});\n", symbol.name));
        }
        write_if_changed(&self.out_dir.join("ppc_recomp_shared.h"), &text)
    }

    /// Emit `ppc_func_mapping.cpp`: a sorted `{ address, &function }` table,
    /// terminated by a null sentinel.
    pub fn write_function_mapping(&self, mapping: &[(u32, String)]) -> Result<()> {
        let mut sorted = mapping.to_vec();
        sorted.sort_by_key(|(address, _)| *address);
        let mut text = String::new();
        text.push_str("#include \"ppc_recomp_shared.h\"\n\n");
        text.push_str("PPCFuncMapping PPCFuncMappings[] = {\n");
        for (address, name) in &sorted {
            text.push_str(&format!("    {{ 0x{address:X}, {name} }},\n"));
        }
        text.push_str("    { 0, nullptr },\n");
        text.push_str("};\n");
        write_if_changed(&self.out_dir.join("ppc_func_mapping.cpp"), &text)
    }
}

/// Write `contents` to `path` unless a file already there hashes identically.
///
/// Comparing content hashes rather than bytes avoids holding the old file
/// resident; 128 bits makes an accidental collision between unrelated
/// partitions implausible.
fn write_if_changed(path: &Path, contents: &str) -> Result<()> {
    if let Ok(existing) = fs::read(path) {
        if xxhash_rust::xxh3::xxh3_128(&existing) == xxhash_rust::xxh3::xxh3_128(contents.as_bytes()) {
            return Ok(());
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| RecompError::OutputWrite { path: path.to_path_buf(), source })?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents).map_err(|source| RecompError::OutputWrite { path: path.to_path_buf(), source })?;
    fs::rename(&tmp_path, path).map_err(|source| RecompError::OutputWrite { path: path.to_path_buf(), source })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_write_of_identical_content_is_skipped() {
        let dir = tempdir().unwrap();
        let sink = OutputSink::new(dir.path());
        let config = Config::default();
        sink.write_config_header(&config).unwrap();
        let path = dir.path().join("ppc_config.h");
        let mtime_before = fs::metadata(&path).unwrap().modified().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        sink.write_config_header(&config).unwrap();
        let mtime_after = fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(mtime_before, mtime_after);
    }

    #[test]
    fn changed_content_is_rewritten() {
        let dir = tempdir().unwrap();
        let sink = OutputSink::new(dir.path());
        let mut config = Config::default();
        sink.write_config_header(&config).unwrap();
        config.skip_lr = true;
        sink.write_config_header(&config).unwrap();
        let text = fs::read_to_string(dir.path().join("ppc_config.h")).unwrap();
        assert!(text.contains("PPC_CONFIG_SKIP_LR"));
    }

    #[test]
    fn partitioner_flushes_at_the_function_cap() {
        let dir = tempdir().unwrap();
        let mut sink = OutputSink::new(dir.path());
        for _ in 0..FUNCTIONS_PER_PARTITION {
            sink.push_function("PPC_WEAK_FUNC(sub_1000) {}\n").unwrap();
        }
        assert!(dir.path().join("ppc_recomp.0.cpp").exists());
        sink.push_function("PPC_WEAK_FUNC(sub_2000) {}\n").unwrap();
        sink.finish().unwrap();
        assert!(dir.path().join("ppc_recomp.1.cpp").exists());
    }

    #[test]
    fn function_mapping_is_sorted_and_null_terminated() {
        let dir = tempdir().unwrap();
        let sink = OutputSink::new(dir.path());
        sink.write_function_mapping(&[(0x2000, "sub_2000".to_string()), (0x1000, "sub_1000".to_string())])
            .unwrap();
        let text = fs::read_to_string(dir.path().join("ppc_func_mapping.cpp")).unwrap();
        let first = text.find("0x1000").unwrap();
        let second = text.find("0x2000").unwrap();
        assert!(first < second);
        assert!(text.contains("{ 0, nullptr },"));
    }
}
