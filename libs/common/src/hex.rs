//! Hex formatting for wire dumps

use std::fmt::Write;

/// Encode bytes as space separated uppercase pairs, the way frames are
/// usually written down: [0xFF, 0xFF, 0x50] -> "FF FF 50"
pub fn encode_spaced(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            result.push(' ');
        }
        let _ = write!(&mut result, "{:02X}", byte);
    }
    result
}
