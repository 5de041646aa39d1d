//! Source map v3 `mappings` encoding.

use itertools::Itertools;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const VLQ_SHIFT: u32 = 5;
const VLQ_CONTINUATION: i64 = 1 << VLQ_SHIFT;
const VLQ_MASK: i64 = VLQ_CONTINUATION - 1;

/// One generated position tied to its source position. All fields are
/// 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub original_line: u32,
    pub original_column: u32,
}

/// Appends the base64 VLQ encoding of `value` to `out`.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 { ((-value) << 1) | 1 } else { value << 1 };
    loop {
        let mut digit = vlq & VLQ_MASK;
        vlq >>= VLQ_SHIFT;
        if vlq > 0 {
            digit |= VLQ_CONTINUATION;
        }
        out.push(BASE64[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Encodes mappings, sorted by generated position, as a `mappings` string.
///
/// Generated columns are relative to the previous segment on the same
/// line; original positions are relative to the previous segment overall.
/// There is a single source, so the source index field is always 0.
pub fn encode_mappings(mappings: &[Mapping]) -> String {
    let mut out = String::new();
    let mut line = 0;
    let mut prev_original_line = 0i64;
    let mut prev_original_column = 0i64;

    for (generated_line, group) in &mappings.iter().group_by(|m| m.generated_line) {
        while line < generated_line {
            out.push(';');
            line += 1;
        }

        let mut prev_generated_column = 0i64;
        for (i, mapping) in group.enumerate() {
            if i > 0 {
                out.push(',');
            }
            encode_vlq(mapping.generated_column as i64 - prev_generated_column, &mut out);
            encode_vlq(0, &mut out);
            encode_vlq(mapping.original_line as i64 - prev_original_line, &mut out);
            encode_vlq(mapping.original_column as i64 - prev_original_column, &mut out);

            prev_generated_column = mapping.generated_column as i64;
            prev_original_line = mapping.original_line as i64;
            prev_original_column = mapping.original_column as i64;
        }
    }
    out
}
