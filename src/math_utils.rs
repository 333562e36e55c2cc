use std::ops::Range;

pub fn remap(val: f32, range: Range<f32>, dest: Range<f32>) -> f32 {
    dest.start + (dest.end - dest.start) * (val - range.start) / (range.end - range.start)
}

/// Parses `#rrggbb` or `#rrggbbaa` into a packed pixel. Missing alpha is opaque.
pub fn parse_hex_color(text: &str) -> Option<u32> {
    let digits = text.strip_prefix('#')?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;
    let [r, g, b, a] = match digits.len() {
        6 => (value << 8 | 0xff).to_be_bytes(),
        8 => value.to_be_bytes(),
        _ => return None,
    };
    Some(u32::from_le_bytes([r, g, b, a]))
}

#[inline(always)]
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && n & (n - 1) == 0
}
