//! Color conversion for marker styling
//!
//! Slot colors arrive as `#rrggbb` hex from the popup's color pickers and are
//! rendered as a semi-transparent fill. Anything that is not 6-digit hex is
//! passed through unchanged so custom CSS color tokens keep working.

use once_cell::sync::Lazy;
use regex::Regex;

/// Alpha applied to highlight fills
pub const HIGHLIGHT_ALPHA: f64 = 0.4;

/// Auto-highlight palette: yellow to green gradient, two slots per level
pub const AUTO_PALETTE: &[&str] = &[
    "#ffee58", "#ffee58", // yellow (L1)
    "#f48fb1", "#f48fb1", // pink (L2)
    "#b39ddb", "#b39ddb", // purple (L3)
    "#a5d6a7", "#a5d6a7", // green (L4)
];

static HEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})$").unwrap());

/// Convert `#rrggbb` (leading `#` optional, case-insensitive) to an
/// `rgba(r, g, b, a)` string. Malformed input is returned verbatim.
pub fn hex_to_rgba(hex: &str, alpha: f64) -> String {
    match HEX_RE.captures(hex) {
        Some(caps) => {
            let r = u8::from_str_radix(&caps[1], 16).unwrap_or(0);
            let g = u8::from_str_radix(&caps[2], 16).unwrap_or(0);
            let b = u8::from_str_radix(&caps[3], 16).unwrap_or(0);
            format!("rgba({}, {}, {}, {})", r, g, b, alpha)
        }
        None => hex.to_string(),
    }
}

/// Palette color for a slot position, cycling when the palette runs out
pub fn palette_color(index: usize) -> &'static str {
    AUTO_PALETTE[index % AUTO_PALETTE.len()]
}

// ==================== TESTS ====================
