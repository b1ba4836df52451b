//! Client identity generation
//!
//! Each session picks one User-Agent from a fixed pool of browser signatures and
//! keeps it for its whole lifetime.

use rand::Rng;
use rand::seq::IndexedRandom;

const PLATFORMS: &[&str] = &[
    "Windows NT 10.0; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "X11; Linux x86_64",
    "Windows NT 11.0; Win64; x64",
];

const CHROME_MAJOR_MIN: u32 = 118;
const CHROME_MAJOR_MAX: u32 = 131;

/// Build a plausible desktop Chrome User-Agent.
///
/// Format: `Mozilla/5.0 ({platform}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{major}.0.{build}.{patch} Safari/537.36`
pub fn random_user_agent() -> String {
    let mut rng = rand::rng();
    let platform = PLATFORMS.choose(&mut rng).copied().unwrap_or(PLATFORMS[0]);
    let major: u32 = rng.random_range(CHROME_MAJOR_MIN..=CHROME_MAJOR_MAX);
    let build: u32 = rng.random_range(5000..=6999);
    let patch: u32 = rng.random_range(0..=199);
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.{}.{} Safari/537.36",
        platform, major, build, patch
    )
}
