//! End-to-end coverage: a synthetic bare-ELF OELF, written to a temp file and
//! loaded through the public `Runtime` API.

use orbis_loader::oelf::consts::{dt, ELF_MAGIC, PF_R, PF_W, PF_X, PT_DYNAMIC, PT_LOAD, PT_SCE_DYNLIBDATA, PT_SCE_RELRO};
use orbis_loader::oelf::{Elf64Dyn, Elf64Header, Elf64ProgramHeader, SIZEOF_EHDR};
use orbis_loader::{LoaderConfig, Runtime};
use scroll::{Pwrite, LE};
use std::io::Write;

/// Builds a five-segment OELF matching the code/data/relro layout of
/// scenario S1, plus the minimal dynamic section every OELF requires.
fn build_s1_oelf() -> Vec<u8> {
    const PHOFF: usize = SIZEOF_EHDR;
    const CODE_OFF: usize = PHOFF + 56 * 5; // 344
    const DATA_OFF: usize = CODE_OFF + 16; // 360
    const DYN_OFF: usize = DATA_OFF + 8; // 368
    const DYN_SIZE: usize = 16 * 11; // 176
    const DYNLIB_BASE: usize = DYN_OFF + DYN_SIZE; // 544

    let total_len = DYNLIB_BASE + 16;
    let mut bytes = vec![0u8; total_len];

    let mut header = Elf64Header {
        e_phoff: PHOFF as u64,
        e_phentsize: 56,
        e_phnum: 5,
        ..Default::default()
    };
    header.e_ident[0..4].copy_from_slice(&ELF_MAGIC);
    header.e_ident[4] = 2;
    header.e_ident[5] = 1;
    bytes.pwrite_with(header, 0, LE).unwrap();

    let code_ph = Elf64ProgramHeader {
        p_type: PT_LOAD,
        p_flags: PF_R | PF_X,
        p_offset: CODE_OFF as u64,
        p_vaddr: 0,
        p_filesz: 0x10,
        p_memsz: 0x1000,
        p_align: 0x1000,
        ..Default::default()
    };
    bytes.pwrite_with(code_ph, PHOFF, LE).unwrap();

    let relro_ph = Elf64ProgramHeader {
        p_type: PT_SCE_RELRO,
        p_flags: PF_R,
        p_vaddr: 0x1000,
        p_filesz: 0,
        p_memsz: 0x1000,
        ..Default::default()
    };
    bytes.pwrite_with(relro_ph, PHOFF + 56, LE).unwrap();

    let data_ph = Elf64ProgramHeader {
        p_type: PT_LOAD,
        p_flags: PF_R | PF_W,
        p_offset: DATA_OFF as u64,
        p_vaddr: 0x2000,
        p_filesz: 8,
        p_memsz: 0x1000,
        p_align: 0x1000,
        ..Default::default()
    };
    bytes.pwrite_with(data_ph, PHOFF + 56 * 2, LE).unwrap();

    let dynamic_ph = Elf64ProgramHeader {
        p_type: PT_DYNAMIC,
        p_offset: DYN_OFF as u64,
        p_filesz: DYN_SIZE as u64,
        ..Default::default()
    };
    bytes.pwrite_with(dynamic_ph, PHOFF + 56 * 3, LE).unwrap();

    let dynlib_ph = Elf64ProgramHeader {
        p_type: PT_SCE_DYNLIBDATA,
        p_offset: DYNLIB_BASE as u64,
        ..Default::default()
    };
    bytes.pwrite_with(dynlib_ph, PHOFF + 56 * 4, LE).unwrap();

    bytes[CODE_OFF..CODE_OFF + 16].copy_from_slice(&[0xCC; 16]);
    bytes[DATA_OFF..DATA_OFF + 8].copy_from_slice(b"DATA0000");

    // name_offset=1, minor=0, major=1, id=1 packed little-endian into a u64.
    let module_info_val = u64::from_le_bytes([1, 0, 0, 0, 0, 1, 1, 0]);

    let entries: &[Elf64Dyn] = &[
        Elf64Dyn { d_tag: dt::DT_NEEDED, d_val: 1 },
        Elf64Dyn { d_tag: dt::DT_SCE_MODULE_INFO, d_val: module_info_val },
        Elf64Dyn { d_tag: dt::DT_SCE_SYMTAB, d_val: 11 },
        Elf64Dyn { d_tag: dt::DT_SCE_SYMTABSZ, d_val: 0 },
        Elf64Dyn { d_tag: dt::DT_SCE_STRTAB, d_val: 0 },
        Elf64Dyn { d_tag: dt::DT_SCE_STRSZ, d_val: 11 },
        Elf64Dyn { d_tag: dt::DT_SCE_RELA, d_val: 11 },
        Elf64Dyn { d_tag: dt::DT_SCE_RELASZ, d_val: 0 },
        Elf64Dyn { d_tag: dt::DT_SCE_JMPREL, d_val: 11 },
        Elf64Dyn { d_tag: dt::DT_SCE_PLTRELSZ, d_val: 0 },
        Elf64Dyn { d_tag: dt::DT_NULL, d_val: 0 },
    ];
    for (i, entry) in entries.iter().enumerate() {
        bytes.pwrite_with(*entry, DYN_OFF + i * 16, LE).unwrap();
    }

    bytes[DYNLIB_BASE..DYNLIB_BASE + 11].copy_from_slice(b"\0eboot.bin\0");

    bytes
}

#[test]
fn loads_a_bare_elf_and_maps_segments_per_scenario_s1() {
    let dir = std::env::temp_dir().join(format!("orbis-loader-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("eboot.bin");
    {
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&build_s1_oelf()).unwrap();
    }

    let mut runtime = Runtime::new(
        LoaderConfig::with_eboot_dir(&dir),
        Default::default(),
        Default::default(),
    );
    let index = runtime.load_file(&path).unwrap();

    let module = runtime.modules().get(index).unwrap();
    assert_eq!(module.data.len(), 0x3000);
    assert_eq!(&module.code_section()[0..16], &[0xCC; 16][..]);
    assert!(module.code_section()[16..0x1000].iter().all(|&b| b == 0));
    assert_eq!(&module.data_section()[0..8], b"DATA0000");
    assert!(module.relro_section().iter().all(|&b| b == 0));
    assert_eq!(module.export_name, "eboot.bin");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn loading_the_same_stem_twice_is_idempotent() {
    let dir = std::env::temp_dir().join(format!("orbis-loader-test-idempotent-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("eboot.bin");
    {
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&build_s1_oelf()).unwrap();
    }

    let mut runtime = Runtime::new(LoaderConfig::with_eboot_dir(&dir), Default::default(), Default::default());
    let first = runtime.load_file(&path).unwrap();
    let second = runtime.load_file(&path).unwrap();
    assert_eq!(first, second);
    assert_eq!(runtime.modules().len(), 1);

    std::fs::remove_dir_all(&dir).ok();
}
