//! Executable reader — maps an ELF's loadable sections onto device memory
//! ranges. SHT_NOBITS sections (BSS) carry no bytes and become zero-fill
//! ranges.

use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use elf::abi::{SHF_ALLOC, SHT_NOBITS};
use elf::endian::LittleEndian;
use elf::ElfBytes;

use fpglink_core::MemoryRange;

/// Parse `path` and return one range per allocatable section, in file
/// order. Sections that occupy no address space are skipped.
pub fn load_ranges(path: &Path) -> Result<Vec<MemoryRange>> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read executable {}", path.display()))?;
    let file = ElfBytes::<LittleEndian>::minimal_parse(&data)
        .with_context(|| format!("{} is not a valid ELF file", path.display()))?;

    let sections = file
        .section_headers()
        .context("ELF file has no section headers")?;

    let mut ranges = Vec::new();
    for shdr in sections.iter() {
        if shdr.sh_flags & SHF_ALLOC as u64 == 0 {
            continue;
        }
        if shdr.sh_size == 0 {
            continue;
        }
        let start = shdr.sh_addr;
        let end = start + shdr.sh_size;

        let range = if shdr.sh_type == SHT_NOBITS {
            MemoryRange::zeroed(start, end)?
        } else {
            let (bytes, compression) = file
                .section_data(&shdr)
                .context("failed to read section data")?;
            anyhow::ensure!(
                compression.is_none(),
                "compressed sections are not supported"
            );
            anyhow::ensure!(
                bytes.len() as u64 == shdr.sh_size,
                "section data shorter than header size"
            );
            MemoryRange::with_content(start, Bytes::copy_from_slice(bytes))?
        };
        tracing::debug!(
            start = range.start(),
            end = range.end(),
            zero_fill = range.content().is_none(),
            "loadable section"
        );
        ranges.push(range);
    }

    anyhow::ensure!(
        !ranges.is_empty(),
        "{} contains no loadable sections",
        path.display()
    );
    Ok(ranges)
}
