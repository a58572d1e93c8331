//! Directory entry names
//!
//! Entry names are compared the way the format orders siblings: shorter
//! names first, then code unit by code unit after upper-casing. Windows
//! Installer additionally packs most of its stream names into CJK code
//! points, which [`decode_msi_name`] turns back into readable names.

use std::cmp::Ordering;

/// First code point of the packed two-character range
const MSI_PACKED_BASE: u32 = 0x3800;
/// First code point of the packed single-character range
const MSI_SINGLE_BASE: u32 = 0x4800;
/// Prefix marking installer database tables
const MSI_TABLE_MARKER: u32 = 0x4840;

/// Map a 6-bit value to the installer's name alphabet.
fn msi_char(value: u32) -> char {
    match value {
        0..=9 => char::from(b'0' + value as u8),
        10..=35 => char::from(b'A' + (value - 10) as u8),
        36..=61 => char::from(b'a' + (value - 36) as u8),
        62 => '.',
        _ => '_',
    }
}

/// Decode a Windows Installer stream name into its display form.
///
/// Code points in U+3800..U+47FF carry two characters, U+4800..U+483F one,
/// and the U+4840 table marker as well as control characters (such as the
/// `\u{5}` prefix of property set streams) are dropped. Anything else is
/// kept as-is.
///
/// ```
/// use msiole::ole::decode_msi_name;
/// assert_eq!(decode_msi_name("\u{4840}\u{3b3f}\u{43f2}\u{4438}\u{45b1}"), "_Columns");
/// assert_eq!(decode_msi_name("\u{5}SummaryInformation"), "SummaryInformation");
/// ```
pub fn decode_msi_name(name: &str) -> String {
    let mut decoded = String::with_capacity(name.len());
    for ch in name.chars() {
        let code = u32::from(ch);
        if code == MSI_TABLE_MARKER || ch.is_control() {
            continue;
        }
        if (MSI_SINGLE_BASE..MSI_TABLE_MARKER).contains(&code) {
            decoded.push(msi_char(code - MSI_SINGLE_BASE));
        } else if (MSI_PACKED_BASE..MSI_SINGLE_BASE).contains(&code) {
            let packed = code - MSI_PACKED_BASE;
            decoded.push(msi_char(packed & 0x3F));
            decoded.push(msi_char((packed >> 6) & 0x3F));
        } else {
            decoded.push(ch);
        }
    }
    decoded
}

fn upper_units(name: &str) -> impl Iterator<Item = u16> + '_ {
    name.chars()
        .flat_map(char::to_uppercase)
        .flat_map(|ch| {
            let mut units = [0u16; 2];
            let len = ch.encode_utf16(&mut units).len();
            units.into_iter().take(len)
        })
}

/// Order two sibling names: by UTF-16 length, then case-insensitively.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.encode_utf16()
        .count()
        .cmp(&b.encode_utf16().count())
        .then_with(|| upper_units(a).cmp(upper_units(b)))
}

/// Whether two names denote the same sibling.
#[inline]
pub fn names_equal(a: &str, b: &str) -> bool {
    compare_names(a, b) == Ordering::Equal
}
