use super::consts::{PF_R, PF_W, PF_X};
use scroll::{Pread, SizeWith};

/// A single ELF64 program header entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, SizeWith)]
pub struct Elf64ProgramHeader {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_paddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

impl Elf64ProgramHeader {
    pub fn is_executable(&self) -> bool {
        self.p_flags & PF_X != 0
    }

    pub fn is_writable(&self) -> bool {
        self.p_flags & PF_W != 0
    }

    pub fn is_readable(&self) -> bool {
        self.p_flags & PF_R != 0
    }
}

/// A zero-copy view over the program-header table: `phnum` entries starting
/// at `phoff` in the owning buffer, parsed lazily by index rather than all
/// at once.
#[derive(Debug, Clone, Copy)]
pub struct ProgramHeaderTable<'a> {
    bytes: &'a [u8],
    phoff: usize,
    phentsize: usize,
    phnum: usize,
}

impl<'a> ProgramHeaderTable<'a> {
    pub fn new(bytes: &'a [u8], phoff: usize, phentsize: usize, phnum: usize) -> Self {
        ProgramHeaderTable {
            bytes,
            phoff,
            phentsize,
            phnum,
        }
    }

    pub fn len(&self) -> usize {
        self.phnum
    }

    pub fn is_empty(&self) -> bool {
        self.phnum == 0
    }

    pub fn get(&self, index: usize) -> Option<Elf64ProgramHeader> {
        if index >= self.phnum {
            return None;
        }
        let offset = self.phoff + index * self.phentsize;
        self.bytes.pread_with(offset, scroll::LE).ok()
    }

    pub fn iter(&self) -> ProgramHeaderIter<'a> {
        ProgramHeaderIter {
            table: *self,
            index: 0,
        }
    }
}

pub struct ProgramHeaderIter<'a> {
    table: ProgramHeaderTable<'a>,
    index: usize,
}

impl Iterator for ProgramHeaderIter<'_> {
    type Item = Elf64ProgramHeader;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.table.get(self.index)?;
        self.index += 1;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scroll::Pwrite;

    #[test]
    fn iterates_entries_in_order() {
        let mut bytes = vec![0u8; 56 * 2];
        let mut ph = Elf64ProgramHeader {
            p_type: 1,
            p_vaddr: 0x1000,
            ..Default::default()
        };
        bytes.pwrite_with(ph, 0, scroll::LE).unwrap();
        ph.p_vaddr = 0x2000;
        bytes.pwrite_with(ph, 56, scroll::LE).unwrap();

        let table = ProgramHeaderTable::new(&bytes, 0, 56, 2);
        let vaddrs: Vec<u64> = table.iter().map(|p| p.p_vaddr).collect();
        assert_eq!(vaddrs, vec![0x1000, 0x2000]);
    }
}
