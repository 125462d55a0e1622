//! ELF and Sony-specific constants used by the OELF parser.

/// Standard ELF magic, `e_ident[0..4]`.
pub const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

/// Index of the data-encoding byte within `e_ident`.
pub const EI_DATA: usize = 5;
pub const ELFDATA2LSB: u8 = 1;

/// Shared object / dynamic-library ELF type.
pub const ET_DYN: u16 = 3;
/// Sony's dynamic-object type; `is_lib` is set when `e_type` equals this.
pub const ET_SCE_DYNAMIC: u16 = 0xFE18;

/// Loadable program segment.
pub const PT_LOAD: u32 = 1;
/// Dynamic linking information.
pub const PT_DYNAMIC: u32 = 2;
/// Sony: raw dynamic-linker data blob (symtab/strtab/rela/jmprel all live here).
pub const PT_SCE_DYNLIBDATA: u32 = 0x6100_0000;
/// Sony: relocation read-only segment.
pub const PT_SCE_RELRO: u32 = 0x6100_0010;
/// Sony: process param blob.
pub const PT_SCE_PROCPARAM: u32 = 0x6100_0011;

/// Segment is executable.
pub const PF_X: u32 = 1 << 0;
/// Segment is writable.
pub const PF_W: u32 = 1 << 1;
/// Segment is readable.
pub const PF_R: u32 = 1 << 2;

/// Dynamic tags, standard and Sony-extended.
pub mod dt {
    pub const DT_NULL: u64 = 0;
    pub const DT_NEEDED: u64 = 1;
    pub const DT_INIT: u64 = 12;

    pub const DT_SCE_JMPREL: u64 = 0x6100_0029;
    pub const DT_SCE_PLTRELSZ: u64 = 0x6100_002D;
    pub const DT_SCE_RELA: u64 = 0x6100_002F;
    pub const DT_SCE_RELASZ: u64 = 0x6100_0031;
    pub const DT_SCE_STRTAB: u64 = 0x6100_0035;
    pub const DT_SCE_STRSZ: u64 = 0x6100_0037;
    pub const DT_SCE_SYMTAB: u64 = 0x6100_0039;
    pub const DT_SCE_SYMTABSZ: u64 = 0x6100_003F;
    pub const DT_SCE_MODULE_INFO: u64 = 0x6100_000D;
    pub const DT_SCE_NEEDED_MODULE: u64 = 0x6100_000F;
    pub const DT_SCE_EXPORT_LIB: u64 = 0x6100_0013;
    pub const DT_SCE_IMPORT_LIB: u64 = 0x6100_0015;
}

/// Symbol bindings (`st_info >> 4`).
pub const STB_LOCAL: u8 = 0;
pub const STB_GLOBAL: u8 = 1;
pub const STB_WEAK: u8 = 2;

/// Size in bytes of an on-disk `Elf64_Sym` record.
pub const SIZEOF_SYM: usize = 24;
/// Size in bytes of an on-disk `Elf64_Dyn` entry.
pub const SIZEOF_DYN: usize = 16;
/// Size in bytes of an on-disk `Elf64_Phdr` entry.
pub const SIZEOF_PHDR: usize = 56;
