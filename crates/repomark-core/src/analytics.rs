// Derived statistics over whichever list is on screen: search results or bookmarks
use crate::models::{Bookmark, Repository};

/// Bucket for records without a language
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// Anything the aggregation can count: it needs stars and a language
pub trait StarredRecord {
    fn star_count(&self) -> u32;
    fn language(&self) -> Option<&str>;
}

impl StarredRecord for Repository {
    fn star_count(&self) -> u32 {
        self.stars
    }

    fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

impl StarredRecord for Bookmark {
    fn star_count(&self) -> u32 {
        self.repo.view().stars
    }

    fn language(&self) -> Option<&str> {
        self.repo.view().language.as_deref()
    }
}

/// One language's share of a list
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageBucket {
    pub language: String,
    pub count: usize,
    /// Rounded to two decimals on its own; buckets need not add up to 100
    pub percentage: f64,
}

/// Everything the charts and the analytics panel show
#[derive(Debug, Clone, PartialEq)]
pub struct RepoStats<'a, T> {
    pub total_count: usize,
    pub total_stars: u64,
    pub top_repository: Option<&'a T>,
    /// In order of first appearance
    pub languages: Vec<LanguageBucket>,
}

impl<T> RepoStats<'_, T> {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    pub fn count_of(&self, language: &str) -> Option<usize> {
        self.languages
            .iter()
            .find(|b| b.language == language)
            .map(|b| b.count)
    }

    pub fn percentage_of(&self, language: &str) -> Option<f64> {
        self.languages
            .iter()
            .find(|b| b.language == language)
            .map(|b| b.percentage)
    }
}

pub fn summarize<T: StarredRecord>(records: &[T]) -> RepoStats<'_, T> {
    let total = records.len();
    let languages = language_distribution(records)
        .into_iter()
        .map(|(language, count)| LanguageBucket {
            percentage: percentage(count, total),
            language,
            count,
        })
        .collect();

    RepoStats {
        total_count: total,
        total_stars: total_stars(records),
        top_repository: top_repository(records),
        languages,
    }
}

pub fn total_stars<T: StarredRecord>(records: &[T]) -> u64 {
    records.iter().map(|r| u64::from(r.star_count())).sum()
}

/// Most-starred record; on a tie the earliest one wins
pub fn top_repository<T: StarredRecord>(records: &[T]) -> Option<&T> {
    let mut iter = records.iter();
    let first = iter.next()?;
    Some(iter.fold(first, |top, r| {
        if r.star_count() > top.star_count() {
            r
        } else {
            top
        }
    }))
}

/// Language -> count, buckets in the order each language first shows up
pub fn language_distribution<T: StarredRecord>(records: &[T]) -> Vec<(String, usize)> {
    let mut buckets: Vec<(String, usize)> = Vec::new();

    for record in records {
        let lang = match record.language() {
            Some(l) if !l.is_empty() => l,
            _ => UNKNOWN_LANGUAGE,
        };

        match buckets.iter_mut().find(|(name, _)| name == lang) {
            Some((_, count)) => *count += 1,
            None => buckets.push((lang.to_string(), 1)),
        }
    }

    buckets
}

pub fn language_percentages<T: StarredRecord>(records: &[T]) -> Vec<(String, f64)> {
    let total = records.len();
    language_distribution(records)
        .into_iter()
        .map(|(lang, count)| (lang, percentage(count, total)))
        .collect()
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(count as f64 / total as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// Chart colors depend on bucket position only, so the same language can get
// a different color when the set of buckets changes.

/// HSL color as the bar chart uses it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsl {
    pub hue: u16,
    pub saturation: u8,
    pub lightness: u8,
}

impl Hsl {
    pub fn to_rgb(self) -> (u8, u8, u8) {
        let h = f64::from(self.hue % 360);
        let s = f64::from(self.saturation.min(100)) / 100.0;
        let l = f64::from(self.lightness.min(100)) / 100.0;

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = l - c / 2.0;

        let (r, g, b) = match self.hue % 360 {
            0..=59 => (c, x, 0.0),
            60..=119 => (x, c, 0.0),
            120..=179 => (0.0, c, x),
            180..=239 => (0.0, x, c),
            240..=299 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        (to_byte(r), to_byte(g), to_byte(b))
    }
}

impl std::fmt::Display for Hsl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
    }
}

const BAR_BASE_HUE: u16 = 120;
const BAR_HUE_STEP: u16 = 37;

/// Color of the `index`-th bar in the language chart
pub fn bar_color(index: usize) -> Hsl {
    let step = (index % 360) as u16 * BAR_HUE_STEP;
    Hsl {
        hue: (BAR_BASE_HUE + step % 360) % 360,
        saturation: 70,
        lightness: 50,
    }
}

/// Slice colors of the bookmark language breakdown
pub const PIE_PALETTE: [&str; 8] = [
    "#60a5fa", // blue
    "#34d399", // green
    "#fbbf24", // yellow
    "#f87171", // red
    "#a78bfa", // purple
    "#fb923c", // orange
    "#4ade80", // lime
    "#c084fc", // violet
];

pub fn pie_color(index: usize) -> &'static str {
    PIE_PALETTE[index % PIE_PALETTE.len()]
}

/// `#rrggbb` -> (r, g, b)
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    // byte slicing below needs single-byte chars
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}
