//! Correlation id ("gid") generation.
//!
//! Every request of a single login attempt carries the same gid so the
//! provider can link the code, the status channel and the final exchange.

use std::fmt;

/// Template of a gid. `x` is any hex digit, `y` is one of `8`, `9`, `A`, `B`.
pub const GID_TEMPLATE: &str = "xxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx";

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Per-attempt correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gid(String);

impl Gid {
    /// Generates a new random gid following [`GID_TEMPLATE`].
    pub fn generate() -> Self {
        let gid = GID_TEMPLATE
            .chars()
            .map(|c| match c {
                'x' => random_nibble_char(0x0f, 0x00),
                'y' => random_nibble_char(0x03, 0x08),
                other => other,
            })
            .collect();
        Gid(gid)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn random_nibble_char(mask: u8, set: u8) -> char {
    let nibble = (rand::random::<u8>() & mask) | set;
    HEX_UPPER[nibble as usize] as char
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Gid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
