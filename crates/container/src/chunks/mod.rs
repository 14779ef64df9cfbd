//! One handler per chunk tag.

pub(crate) mod code;
pub(crate) mod func;
pub(crate) mod gen8;
pub(crate) mod objt;
pub(crate) mod room;
pub(crate) mod scpt;
pub(crate) mod strg;
pub(crate) mod vari;

use std::collections::HashMap;

use crate::error::LoadError;
use crate::reader::ByteReader;

/// Mask for the distance to the next site, stored in a reference operand.
const NEXT_SITE_MASK: u32 = 0x07FF_FFFF;

/// Walk a reference chain and map every site address to `index`.
///
/// `first_address` is the absolute address of the first referencing
/// instruction word; the operand after each word holds the distance to the
/// next one.
pub(crate) fn walk_sites(
    data: &[u8],
    first_address: i32,
    occurrences: u32,
    index: usize,
    sites: &mut HashMap<usize, usize>,
) -> Result<(), LoadError> {
    if occurrences == 0 || first_address < 0 {
        return Ok(());
    }
    let mut address = first_address as usize;
    for remaining in (0..occurrences).rev() {
        sites.insert(address, index);
        if remaining == 0 {
            break;
        }
        let operand = ByteReader::at(data, address + 4).u32()?;
        let next = (operand & NEXT_SITE_MASK) as usize;
        if next == 0 {
            return Err(LoadError::malformed(
                address,
                "reference chain does not advance",
            ));
        }
        address += next;
    }
    Ok(())
}

/// Converts an i32 index where negative means none.
pub(crate) fn optional_index(value: i32) -> Option<usize> {
    usize::try_from(value).ok()
}
