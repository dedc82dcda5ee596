//! Lenient validation of topic and value names.
//!
//! Names may contain letters, digits, spaces, underscores and forward slashes.
//! Anything else is reported, never rejected.

/// Result of checking a name's characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCheck {
    /// Every character is allowed.
    Valid,
    /// The first disallowed character and its char index.
    InvalidCharacter {
        /// The offending character.
        character: char,
        /// Index of `character`, counted in chars.
        position: usize,
    },
}

impl NameCheck {
    /// True for [`NameCheck::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, NameCheck::Valid)
    }
}

/// Whether `c` may appear in a name.
///
/// Letters are characters with the Unicode `Alphabetic` property, which also
/// covers letter numbers such as `Ⅻ`. Digits are ASCII `0-9` only; fractions,
/// superscripts and other numeric symbols are reported.
pub fn is_valid_name_char(c: char) -> bool {
    c.is_alphabetic() || c.is_ascii_digit() || c == ' ' || c == '_' || c == '/'
}

/// Checks every character of `name`, stopping at the first disallowed one.
pub fn check_name(name: &str) -> NameCheck {
    name.chars()
        .enumerate()
        .find(|(_, c)| !is_valid_name_char(*c))
        .map_or(NameCheck::Valid, |(position, character)| {
            NameCheck::InvalidCharacter {
                character,
                position,
            }
        })
}
