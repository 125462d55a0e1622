use scroll::{Pread, SizeWith};

/// A single `Elf64_Rela` relocation entry.
///
/// Relocation *application* (R_X86_64_JUMP_SLOT/GLOB_DAT fixups) is not
/// performed here; entries are parsed and kept accessible so a future
/// relocation pass has them without re-parsing the OELF.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, SizeWith)]
pub struct Elf64Rela {
    pub r_offset: u64,
    pub r_info: u64,
    pub r_addend: i64,
}

impl Elf64Rela {
    pub fn sym(&self) -> u32 {
        (self.r_info >> 32) as u32
    }

    pub fn kind(&self) -> u32 {
        (self.r_info & 0xFFFF_FFFF) as u32
    }
}

pub fn parse_rela_table(bytes: &[u8]) -> Vec<Elf64Rela> {
    const SIZEOF_RELA: usize = 24;
    let count = bytes.len() / SIZEOF_RELA;
    (0..count)
        .filter_map(|i| bytes.pread_with(i * SIZEOF_RELA, scroll::LE).ok())
        .collect()
}
