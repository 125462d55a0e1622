//! Synthetic OELF byte buffers for unit tests, built by hand so every offset
//! is known rather than computed from another parser.
#![cfg(test)]

use super::consts::{dt, ELF_MAGIC, PF_R, PF_W, PF_X, PT_DYNAMIC, PT_LOAD, PT_SCE_DYNLIBDATA};
use super::dynamic::{Elf64Dyn, ModuleInfoValue};
use super::header::{Elf64Header, SIZEOF_EHDR};
use super::program_header::Elf64ProgramHeader;
use scroll::{Pwrite, LE};

pub const PH_DYNAMIC_OFFSET: usize = SIZEOF_EHDR + 2 * 56;

/// Layout:
/// - 0..64: ELF header
/// - 64..288: 4 program headers (PT_LOAD code, PT_LOAD data, PT_DYNAMIC, PT_SCE_DYNLIBDATA)
/// - 288..464: dynamic array (11 entries, 16 bytes each)
/// - 464..512: dynlib blob (strtab @ 0, symtab @ 16, rela/jmprel empty @ 40)
pub fn build_minimal_oelf() -> Vec<u8> {
    const DYN_OFF: u64 = 288;
    const DYN_SIZE: u64 = 176;
    const DYNLIB_BASE: u64 = 464;

    const STRTAB_REL: u64 = 0;
    const STRTAB_SIZE: u64 = 11; // b"\0eboot.bin\0"
    const SYMTAB_REL: u64 = 16;
    const SYMTAB_SIZE: u64 = 24; // one Elf64Sym
    const RELA_REL: u64 = 40;
    const RELA_SIZE: u64 = 0;

    let mut bytes = vec![0u8; 512];

    let mut header = Elf64Header {
        e_phoff: SIZEOF_EHDR as u64,
        e_phentsize: 56,
        e_phnum: 4,
        ..Default::default()
    };
    header.e_ident[0..4].copy_from_slice(&ELF_MAGIC);
    header.e_ident[4] = 2; // ELFCLASS64
    header.e_ident[5] = 1; // ELFDATA2LSB
    bytes.pwrite_with(header, 0, LE).unwrap();

    let code_ph = Elf64ProgramHeader {
        p_type: PT_LOAD,
        p_flags: PF_R | PF_X,
        p_vaddr: 0,
        p_memsz: 0x1000,
        p_filesz: 0x1000,
        p_align: 0x1000,
        ..Default::default()
    };
    bytes.pwrite_with(code_ph, SIZEOF_EHDR, LE).unwrap();

    let data_ph = Elf64ProgramHeader {
        p_type: PT_LOAD,
        p_flags: PF_R | PF_W,
        p_vaddr: 0x2000,
        p_memsz: 0x1000,
        p_filesz: 0x1000,
        p_align: 0x1000,
        ..Default::default()
    };
    bytes.pwrite_with(data_ph, SIZEOF_EHDR + 56, LE).unwrap();

    let dynamic_ph = Elf64ProgramHeader {
        p_type: PT_DYNAMIC,
        p_offset: DYN_OFF,
        p_filesz: DYN_SIZE,
        ..Default::default()
    };
    bytes.pwrite_with(dynamic_ph, PH_DYNAMIC_OFFSET, LE).unwrap();

    let dynlib_ph = Elf64ProgramHeader {
        p_type: PT_SCE_DYNLIBDATA,
        p_offset: DYNLIB_BASE,
        ..Default::default()
    };
    bytes
        .pwrite_with(dynlib_ph, PH_DYNAMIC_OFFSET + 56, LE)
        .unwrap();

    // Dynlib blob.
    let strtab_bytes: &[u8] = b"\0eboot.bin\0";
    bytes[(DYNLIB_BASE + STRTAB_REL) as usize..(DYNLIB_BASE + STRTAB_REL) as usize + strtab_bytes.len()]
        .copy_from_slice(strtab_bytes);

    let sym = super::symbol::Elf64Sym {
        st_name: 1,
        st_info: 0x12,
        ..Default::default()
    };
    bytes
        .pwrite_with(sym, (DYNLIB_BASE + SYMTAB_REL) as usize, LE)
        .unwrap();

    // Dynamic array.
    let module_info = ModuleInfoValue {
        name_offset: 1,
        version_minor: 0,
        version_major: 1,
        id: 0,
    };
    let name_offset = module_info.name_offset.to_le_bytes();
    let id = module_info.id.to_le_bytes();
    let module_info_val = u64::from_le_bytes([
        name_offset[0],
        name_offset[1],
        name_offset[2],
        name_offset[3],
        module_info.version_minor,
        module_info.version_major,
        id[0],
        id[1],
    ]);

    let entries: &[Elf64Dyn] = &[
        Elf64Dyn { d_tag: dt::DT_NEEDED, d_val: 1 },
        Elf64Dyn { d_tag: dt::DT_SCE_MODULE_INFO, d_val: module_info_val },
        Elf64Dyn { d_tag: dt::DT_SCE_SYMTAB, d_val: SYMTAB_REL },
        Elf64Dyn { d_tag: dt::DT_SCE_SYMTABSZ, d_val: SYMTAB_SIZE },
        Elf64Dyn { d_tag: dt::DT_SCE_STRTAB, d_val: STRTAB_REL },
        Elf64Dyn { d_tag: dt::DT_SCE_STRSZ, d_val: STRTAB_SIZE },
        Elf64Dyn { d_tag: dt::DT_SCE_RELA, d_val: RELA_REL },
        Elf64Dyn { d_tag: dt::DT_SCE_RELASZ, d_val: RELA_SIZE },
        Elf64Dyn { d_tag: dt::DT_SCE_JMPREL, d_val: RELA_REL },
        Elf64Dyn { d_tag: dt::DT_SCE_PLTRELSZ, d_val: RELA_SIZE },
        Elf64Dyn { d_tag: dt::DT_NULL, d_val: 0 },
    ];

    for (i, entry) in entries.iter().enumerate() {
        bytes
            .pwrite_with(*entry, DYN_OFF as usize + i * 16, LE)
            .unwrap();
    }

    bytes
}
