//! Color types and color generation.
//!
//! Shapes are colored either from the built-in category palette (keyed by
//! category id) or from a deterministic hash of the category name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An RGBA color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// Alpha used for colors taken from the palette.
pub const PALETTE_ALPHA: u8 = 200;

/// Alpha used for colors derived from a category name.
pub const TEXT_COLOR_ALPHA: u8 = 100;

/// Unsigned 256-bit integer, least significant limb first.
type U256 = [u64; 4];

fn sha256_int(text: &str) -> U256 {
    let digest = Sha256::digest(text.as_bytes());
    let mut n = [0u64; 4];
    for (limb, chunk) in n.iter_mut().zip(digest.chunks_exact(8).rev()) {
        *limb = chunk.iter().fold(0, |acc, &byte| (acc << 8) | u64::from(byte));
    }
    n
}

fn div_rem(n: &U256, d: u64) -> (U256, u64) {
    let mut q = [0u64; 4];
    let mut rem = 0u128;
    for i in (0..4).rev() {
        let cur = (rem << 64) | u128::from(n[i]);
        q[i] = (cur / u128::from(d)) as u64;
        rem = cur % u128::from(d);
    }
    (q, rem as u64)
}

fn bit_len(n: &U256) -> u32 {
    (0..4)
        .rev()
        .find(|&i| n[i] != 0)
        .map_or(0, |i| i as u32 * 64 + 64 - n[i].leading_zeros())
}

fn bit(n: &U256, k: u32) -> bool {
    (n[(k / 64) as usize] >> (k % 64)) & 1 == 1
}

/// Whether any bit below `k` is set.
fn any_below(n: &U256, k: u32) -> bool {
    let (limbs, rem) = ((k / 64) as usize, k % 64);
    n[..limbs].iter().any(|&limb| limb != 0) || (rem > 0 && n[limbs] & ((1u64 << rem) - 1) != 0)
}

/// Bits `[shift, shift + 64)` of `n`.
fn window(n: &U256, shift: u32) -> u64 {
    let (limb, rem) = ((shift / 64) as usize, shift % 64);
    let low = n[limb] >> rem;
    let high = match n.get(limb + 1) {
        Some(next) if rem > 0 => next << (64 - rem),
        _ => 0,
    };
    low | high
}

/// `(n / d) % 255` where `n / d` is first rounded to the nearest `f64`
/// (ties to even). The fraction of a quotient that fits in the mantissa
/// is dropped.
fn rounded_quotient_mod_255(n: &U256, d: u64) -> u8 {
    const MANTISSA_BITS: u32 = 53;
    let (q, rem) = div_rem(n, d);
    let len = bit_len(&q);
    if len <= MANTISSA_BITS {
        return (q[0] % 255) as u8;
    }

    let mut shift = len - MANTISSA_BITS;
    let mut mantissa = window(&q, shift) & ((1u64 << MANTISSA_BITS) - 1);
    let round = bit(&q, shift - 1);
    let sticky = rem != 0 || any_below(&q, shift - 1);
    if round && (sticky || mantissa & 1 == 1) {
        mantissa += 1;
        if mantissa == 1 << MANTISSA_BITS {
            mantissa >>= 1;
            shift += 1;
        }
    }
    // 2^8 = 1 (mod 255)
    let scale = 1u64 << (shift % 8);
    ((mantissa % 255) * scale % 255) as u8
}

/// Derive a stable color from arbitrary text.
///
/// The SHA-256 digest of the text, read as a 256-bit integer, is divided
/// by 255, 255^2 and 255^3 in double precision; each quotient modulo 255
/// gives one channel.
pub fn generate_color_by_text(text: &str) -> Color {
    let hash = sha256_int(text);
    let r = rounded_quotient_mod_255(&hash, 255);
    let g = rounded_quotient_mod_255(&hash, 65_025);
    let b = rounded_quotient_mod_255(&hash, 16_581_375);
    Color::new(r, g, b, TEXT_COLOR_ALPHA)
}

/// Fixed colors for well-known category ids.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: HashMap<u32, [u8; 3]>,
}

impl Palette {
    /// A palette with no entries; every color comes from the name hash.
    pub fn empty() -> Self {
        Self {
            colors: HashMap::new(),
        }
    }

    fn insert(&mut self, id: u32, rgb: [u8; 3]) {
        self.colors.insert(id, rgb);
    }

    /// Palette color for a category id, if there is one.
    pub fn get(&self, id: u32) -> Option<Color> {
        self.colors
            .get(&id)
            .map(|[r, g, b]| Color::new(*r, *g, *b, PALETTE_ALPHA))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for Palette {
    /// Road-scene palette: pedestrian, rider, car, truck, bus, motorcycle,
    /// bicycle, train, traffic light, traffic sign.
    fn default() -> Self {
        let mut palette = Self::empty();
        for (id, rgb) in [
            (1, [0, 0, 255]),
            (2, [255, 255, 0]),
            (3, [139, 69, 19]),
            (4, [0, 100, 0]),
            (5, [255, 0, 0]),
            (6, [255, 20, 145]),
            (7, [255, 165, 0]),
            (8, [0, 0, 128]),
            (9, [160, 32, 240]),
            (10, [128, 128, 128]),
        ] {
            palette.insert(id, rgb);
        }
        palette
    }
}
