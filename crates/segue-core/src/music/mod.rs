//! Key normalization for harmonic mixing
//!
//! Converts any key notation a library is likely to carry (traditional
//! names like "A Minor" and "F#m", Open Key codes "4m"/"4d", Camelot wheel
//! codes "8A"/"8B") into one canonical wheel position. Unparseable input
//! maps to a sentinel instead of failing, so scoring can stay total.

use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use serde::{Deserialize, Serialize};

/// Scale mode of a wheel position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Major,
    Minor,
}

/// One slot on the 12-position harmonic wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WheelKey {
    /// Wheel position, always in 1..=12
    pub position: u8,
    pub mode: Mode,
}

/// Canonical key derived from a raw key string
///
/// `Unknown` is a first-class value, not an error: a track with a garbled or
/// missing key still participates in scoring at a neutral level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalKey {
    Wheel(WheelKey),
    Unknown,
}

// Wheel position indexed by root semitone (0=C .. 11=B).
// Major keys map to the B ring, minor keys to the A ring.
const WHEEL_MAJOR: [u8; 12] = [8, 3, 10, 5, 12, 7, 2, 9, 4, 11, 6, 1];
const WHEEL_MINOR: [u8; 12] = [5, 12, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10];

// Normalization runs on every pairwise comparison, so repeated raw strings
// are memoized process-wide. Bounded to keep a hostile catalog from growing
// the map without limit.
const CACHE_CAP: usize = 10_000;

static NORMALIZE_CACHE: LazyLock<RwLock<HashMap<String, CanonicalKey>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

impl WheelKey {
    pub const fn new(position: u8, mode: Mode) -> Self {
        Self { position, mode }
    }

    /// Root semitone (0=C .. 11=B) of this wheel slot
    fn root(&self) -> u8 {
        let table = match self.mode {
            Mode::Major => &WHEEL_MAJOR,
            Mode::Minor => &WHEEL_MINOR,
        };
        table
            .iter()
            .position(|&p| p == self.position)
            .unwrap_or(0) as u8
    }
}

impl CanonicalKey {
    /// Normalize a raw key string into a canonical wheel code.
    ///
    /// Accepted notations:
    /// - Camelot codes: "8A", "8B" (case-insensitive suffix)
    /// - Open Key codes: "8m" (minor), "8d" (major)
    /// - Traditional names: "Am", "C", "F#m", "Bb", "A Minor", "C Major"
    ///
    /// Anything else (empty strings, malformed codes, out-of-range wheel
    /// numbers, or numeric-ID-looking values that sometimes leak out of
    /// library databases) normalizes to `Unknown`.
    pub fn normalize(raw: &str) -> CanonicalKey {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CanonicalKey::Unknown;
        }

        if let Some(hit) = NORMALIZE_CACHE
            .read()
            .ok()
            .and_then(|cache| cache.get(trimmed).copied())
        {
            return hit;
        }

        let key = Self::parse_uncached(trimmed);

        if let Ok(mut cache) = NORMALIZE_CACHE.write() {
            if cache.len() < CACHE_CAP {
                cache.insert(trimmed.to_string(), key);
            }
        }

        key
    }

    fn parse_uncached(s: &str) -> CanonicalKey {
        // Database row IDs occasionally end up in key tags; don't let them
        // masquerade as keys.
        if s.len() >= 3 && s.bytes().all(|b| b.is_ascii_digit()) {
            return CanonicalKey::Unknown;
        }

        if let Some(key) = Self::parse_wheel_code(s) {
            return key;
        }

        Self::parse_traditional(s)
    }

    /// Parse "8A"/"8B" (Camelot) and "8m"/"8d" (Open Key) codes
    fn parse_wheel_code(s: &str) -> Option<CanonicalKey> {
        if s.len() < 2 {
            return None;
        }
        let (digits, suffix) = s.split_at(s.len() - 1);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let mode = match suffix.chars().next()?.to_ascii_lowercase() {
            'a' | 'm' => Mode::Minor,
            'b' | 'd' => Mode::Major,
            _ => return None,
        };
        match digits.parse::<u8>() {
            Ok(position) if (1..=12).contains(&position) => {
                Some(CanonicalKey::Wheel(WheelKey::new(position, mode)))
            }
            // "13A", "0B": shaped like a code but off the wheel
            Ok(_) => Some(CanonicalKey::Unknown),
            Err(_) => Some(CanonicalKey::Unknown),
        }
    }

    /// Parse traditional note names: "Am", "C", "F#m", "Bb", "A Minor"
    fn parse_traditional(s: &str) -> CanonicalKey {
        let mut chars = s.chars().peekable();

        let base_root = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return CanonicalKey::Unknown,
        };

        let root = match chars.peek() {
            Some('#') => {
                chars.next();
                (base_root + 1) % 12
            }
            Some('b') => {
                chars.next();
                (base_root + 11) % 12
            }
            _ => base_root,
        };

        let rest: String = chars.collect::<String>().trim().to_ascii_lowercase();
        let mode = match rest.as_str() {
            "" | "maj" | "major" => Mode::Major,
            "m" | "min" | "minor" => Mode::Minor,
            _ => return CanonicalKey::Unknown,
        };

        let position = match mode {
            Mode::Major => WHEEL_MAJOR[root as usize],
            Mode::Minor => WHEEL_MINOR[root as usize],
        };
        CanonicalKey::Wheel(WheelKey::new(position, mode))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CanonicalKey::Unknown)
    }
}

impl std::fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CanonicalKey::Wheel(k) => {
                let letter = match k.mode {
                    Mode::Minor => 'A',
                    Mode::Major => 'B',
                };
                write!(f, "{}{}", k.position, letter)
            }
            CanonicalKey::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Smallest transpose interval (-6..=+6 semitones) that aligns `from` with
/// `to`, or `None` when either key is unknown.
///
/// Identical keys and relative major/minor pairs (same wheel position) need
/// no transposition. Cross-mode targets align to the relative key sharing
/// `to`'s wheel position, which keeps the shift minimal.
pub fn semitone_shift(from: &CanonicalKey, to: &CanonicalKey) -> Option<i8> {
    let (from, to) = match (from, to) {
        (CanonicalKey::Wheel(a), CanonicalKey::Wheel(b)) => (a, b),
        _ => return None,
    };

    if from.position == to.position {
        return Some(0);
    }

    // Same-mode representative at the target's wheel position
    let target = WheelKey::new(to.position, from.mode);
    let diff = target.root() as i8 - from.root() as i8;

    Some(if diff > 6 {
        diff - 12
    } else if diff < -6 {
        diff + 12
    } else {
        diff
    })
}
