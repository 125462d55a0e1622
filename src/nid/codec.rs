use super::table::NidTable;
use crate::error::{NidError, NidResult};

const ENCODED_LEN: usize = 15;
const HASH_LEN: usize = 11;

/// A symbol name is encoded iff it is exactly 15 characters long with `#`
/// at positions 11 and 13: `AAAAAAAAAAA#BB#CC`.
pub fn is_encoded(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == ENCODED_LEN && bytes[HASH_LEN] == b'#' && bytes[HASH_LEN + 2] == b'#'
}

/// Maps a single NID alphabet character (`A-Za-z0-9+-`) to its 6-bit index.
fn char_index(c: u8) -> Option<u64> {
    let idx = match c {
        b'A'..=b'Z' => c - b'A',
        b'a'..=b'z' => 26 + (c - b'a'),
        b'0'..=b'9' => 52 + (c - b'0'),
        b'+' => 62,
        b'-' => 63,
        _ => return None,
    };
    Some(idx as u64)
}

/// Decodes a base64-like id string (at most 11 characters) into a 64-bit
/// accumulator. Every character but the last contributes 6 bits; the last
/// contributes its top 4 bits only, matching the encoding PS4 binaries use
/// for module/library ids packed into a NID suffix.
pub fn decode_value(s: &str) -> NidResult<u64> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > HASH_LEN {
        return Err(NidError::InvalidEncodedValue);
    }

    let mut acc: u64 = 0;
    let last = bytes.len() - 1;
    for (i, &c) in bytes.iter().enumerate() {
        let idx = char_index(c).ok_or(NidError::InvalidEncodedValue)?;
        if i == last {
            acc = (acc << 4) | (idx >> 2);
        } else {
            acc = (acc << 6) | idx;
        }
    }

    Ok(acc)
}

/// Supplies the import module/library names a decoded NID id should resolve
/// to, falling back to the raw encoded fragment on a miss. Implemented by
/// [`crate::loader::Module`].
pub trait NidNameResolver {
    fn import_module_name_by_id(&self, id: u16) -> Option<&str>;
    fn import_library_name_by_id(&self, id: u16) -> Option<&str>;
}

/// Reassembles the `symbol#module#library` name for an encoded NID, using
/// `table` to resolve the hash and `resolver` to resolve the two short ids.
pub fn reconstruct_full_nid(
    resolver: &dyn NidNameResolver,
    table: &NidTable,
    encoded_name: &str,
) -> NidResult<String> {
    let parts: Vec<&str> = encoded_name.split('#').collect();
    let [hash, module_id, library_id] = parts[..] else {
        return Err(NidError::InvalidNid);
    };

    let symbol_name = table.lookup(hash);

    let module_name = decode_value(module_id)
        .ok()
        .and_then(|id| resolver.import_module_name_by_id((id & 0xFFFF) as u16))
        .unwrap_or(module_id);

    let library_name = decode_value(library_id)
        .ok()
        .and_then(|id| resolver.import_library_name_by_id((id & 0xFFFF) as u16))
        .unwrap_or(library_id);

    Ok(format!("{symbol_name}#{module_name}#{library_name}"))
}
