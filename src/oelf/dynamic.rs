use scroll::{Pread, SizeWith, LE};

/// A single entry in the `PT_DYNAMIC` array.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, SizeWith)]
pub struct Elf64Dyn {
    pub d_tag: u64,
    pub d_val: u64,
}

/// A zero-copy view over the dynamic array.
#[derive(Debug, Clone, Copy)]
pub struct DynamicTable<'a> {
    bytes: &'a [u8],
}

impl<'a> DynamicTable<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        DynamicTable { bytes }
    }

    /// Iterates entries up to (but not including) the terminating `DT_NULL`,
    /// or to the end of the segment if no `DT_NULL` is present.
    pub fn iter(&self) -> impl Iterator<Item = Elf64Dyn> + 'a {
        let bytes = self.bytes;
        (0..)
            .map(move |i| bytes.pread_with::<Elf64Dyn>(i * super::consts::SIZEOF_DYN, LE))
            .take_while(|r| r.is_ok())
            .map(Result::unwrap)
            .take_while(|d| d.d_tag != super::consts::dt::DT_NULL)
    }
}

/// The packed value of a `DT_SCE_MODULE_INFO` / `DT_SCE_NEEDED_MODULE`
/// entry: `{name_offset:u32, version_minor:u8, version_major:u8, id:u16}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleInfoValue {
    pub name_offset: u32,
    pub version_minor: u8,
    pub version_major: u8,
    pub id: u16,
}

impl ModuleInfoValue {
    pub fn unpack(d_val: u64) -> Self {
        let bytes = d_val.to_le_bytes();
        ModuleInfoValue {
            name_offset: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            version_minor: bytes[4],
            version_major: bytes[5],
            id: u16::from_le_bytes(bytes[6..8].try_into().unwrap()),
        }
    }
}

/// The packed value of a `DT_SCE_EXPORT_LIB` / `DT_SCE_IMPORT_LIB` entry:
/// `{name_offset:u32, version:u16, id:u16}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryInfoValue {
    pub name_offset: u32,
    pub version: u16,
    pub id: u16,
}

impl LibraryInfoValue {
    pub fn unpack(d_val: u64) -> Self {
        let bytes = d_val.to_le_bytes();
        LibraryInfoValue {
            name_offset: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            version: u16::from_le_bytes(bytes[4..6].try_into().unwrap()),
            id: u16::from_le_bytes(bytes[6..8].try_into().unwrap()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scroll::Pwrite;

    #[test]
    fn unpacks_module_info() {
        let mut bytes = [0u8; 8];
        bytes[0..4].copy_from_slice(&100u32.to_le_bytes());
        bytes[4] = 2; // minor
        bytes[5] = 1; // major
        bytes[6..8].copy_from_slice(&7u16.to_le_bytes());
        let value = u64::from_le_bytes(bytes);

        let info = ModuleInfoValue::unpack(value);
        assert_eq!(info.name_offset, 100);
        assert_eq!(info.version_minor, 2);
        assert_eq!(info.version_major, 1);
        assert_eq!(info.id, 7);
    }

    #[test]
    fn unpacks_library_info() {
        let mut bytes = [0u8; 8];
        bytes[0..4].copy_from_slice(&42u32.to_le_bytes());
        bytes[4..6].copy_from_slice(&3u16.to_le_bytes());
        bytes[6..8].copy_from_slice(&9u16.to_le_bytes());
        let value = u64::from_le_bytes(bytes);

        let info = LibraryInfoValue::unpack(value);
        assert_eq!(info.name_offset, 42);
        assert_eq!(info.version, 3);
        assert_eq!(info.id, 9);
    }

    #[test]
    fn iterates_until_dt_null() {
        let mut bytes = vec![0u8; 16 * 3];
        bytes.as_mut_slice()
            .pwrite_with(Elf64Dyn { d_tag: 1, d_val: 0xAA }, 0, LE)
            .unwrap();
        bytes.as_mut_slice()
            .pwrite_with(Elf64Dyn { d_tag: 2, d_val: 0xBB }, 16, LE)
            .unwrap();
        // entry at offset 32 left as DT_NULL (all zero)

        let table = DynamicTable::new(&bytes);
        let tags: Vec<u64> = table.iter().map(|d| d.d_tag).collect();
        assert_eq!(tags, vec![1, 2]);
    }
}
