/// Avatar colors: deterministic palette pick from a display name
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed avatar palette, in pick order
pub const PALETTE: [Color; 5] = [
    Color::rgb(0x6c, 0x63, 0xff),
    Color::rgb(0xf9, 0x73, 0x16),
    Color::rgb(0x10, 0xb9, 0x81),
    Color::rgb(0xef, 0x44, 0x44),
    Color::rgb(0x3b, 0x82, 0xf6),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

/// Avatar shown in the conversation header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub color: Color,
    pub initial: Option<char>,
}

impl Avatar {
    pub fn for_name(name: &str) -> Self {
        Self {
            color: color_for(name),
            initial: initial_for(name),
        }
    }
}

/// Sum of UTF-16 code units modulo the palette size. The empty name sums to 0.
pub fn color_for(name: &str) -> Color {
    let sum: u64 = name.encode_utf16().map(u64::from).sum();
    PALETTE[(sum % PALETTE.len() as u64) as usize]
}

/// First character of the name, upper-cased
pub fn initial_for(name: &str) -> Option<char> {
    name.chars().next().and_then(|c| c.to_uppercase().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_maps_to_first_entry() {
        assert_eq!(color_for(""), PALETTE[0]);
        assert_eq!(initial_for(""), None);
    }

    #[test]
    fn test_known_names() {
        // 'B' + 'o' + 'b' = 66 + 111 + 98 = 275
        assert_eq!(color_for("Bob"), PALETTE[0]);
        // 'A' = 65
        assert_eq!(color_for("A"), PALETTE[0]);
        // 'B' = 66
        assert_eq!(color_for("B"), PALETTE[1]);
        // 'a' + 'b' = 97 + 98 = 195
        assert_eq!(color_for("ab"), PALETTE[0]);
        // 'c' = 99
        assert_eq!(color_for("c"), PALETTE[4]);
    }

    #[test]
    fn test_is_deterministic() {
        for name in ["alice", "Bob", "Zoë", "李雷", "🙂"] {
            assert_eq!(color_for(name), color_for(name));
            assert!(PALETTE.contains(&color_for(name)));
        }
    }

    #[test]
    fn test_counts_utf16_code_units() {
        // U+1F642 encodes as the surrogate pair 0xD83D 0xDE42
        let expected = (0xD83Du64 + 0xDE42) % 5;
        assert_eq!(color_for("🙂"), PALETTE[expected as usize]);
    }

    #[test]
    fn test_hex_and_initial() {
        assert_eq!(PALETTE[0].hex(), "#6c63ff");
        assert_eq!(PALETTE[4].to_string(), "#3b82f6");
        assert_eq!(initial_for("bob"), Some('B'));
        assert_eq!(Avatar::for_name("Bob").initial, Some('B'));
    }
}
