//! Watch extractors (spec §4.4).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::constants::{
    DIAL_COLORS, WATCH_BAND_MATERIALS, WATCH_BRANDS, WATCH_CASE_MATERIALS, WATCH_MOVEMENT_TERMS,
};

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(1[89]\d{2}|20\d{2})\b").unwrap());

fn haystack(title: &str, aspects: &HashMap<String, String>) -> String {
    format!(
        "{} {}",
        title.to_lowercase(),
        aspects.values().cloned().collect::<Vec<_>>().join(" ").to_lowercase()
    )
}

pub fn extract_case_material(title: &str, aspects: &HashMap<String, String>) -> Option<String> {
    if let Some(v) = aspects.get("case material") {
        let lower = v.to_lowercase();
        if let Some(m) = WATCH_CASE_MATERIALS.iter().find(|m| lower.contains(**m)) {
            return Some(m.to_string());
        }
    }
    let h = haystack(title, aspects);
    WATCH_CASE_MATERIALS.iter().find(|m| h.contains(**m)).map(|m| m.to_string())
}

/// Requires an adjacent "band"/"strap"/"bracelet" token to avoid matching the case material.
pub fn extract_band_material(title: &str, aspects: &HashMap<String, String>) -> Option<String> {
    if let Some(v) = aspects.get("band material").or_else(|| aspects.get("strap material")) {
        let lower = v.to_lowercase();
        if let Some(m) = WATCH_BAND_MATERIALS.iter().find(|m| lower.contains(**m)) {
            return Some(m.to_string());
        }
    }
    let h = haystack(title, aspects);
    if !(h.contains("band") || h.contains("strap") || h.contains("bracelet")) {
        return None;
    }
    WATCH_BAND_MATERIALS.iter().find(|m| h.contains(**m)).map(|m| m.to_string())
}

pub fn extract_movement(title: &str, aspects: &HashMap<String, String>) -> Option<String> {
    if let Some(v) = aspects.get("movement") {
        let lower = v.to_lowercase();
        if let Some(m) = WATCH_MOVEMENT_TERMS.iter().find(|m| lower.contains(**m)) {
            return Some(m.to_string());
        }
    }
    let h = haystack(title, aspects);
    WATCH_MOVEMENT_TERMS.iter().find(|m| h.contains(**m)).map(|m| m.to_string())
}

pub fn extract_dial_color(title: &str, aspects: &HashMap<String, String>) -> Option<String> {
    if let Some(v) = aspects.get("dial color") {
        let lower = v.to_lowercase();
        if let Some(c) = DIAL_COLORS.iter().find(|c| lower.contains(**c)) {
            return Some(c.to_string());
        }
    }
    let h = haystack(title, aspects);
    DIAL_COLORS.iter().find(|c| h.contains(**c)).map(|c| c.to_string())
}

/// Accepts `1800..=current_year+1`.
pub fn extract_year(title: &str, aspects: &HashMap<String, String>, current_year: i32) -> Option<i32> {
    let candidate = aspects
        .get("year manufactured")
        .or_else(|| aspects.get("year"))
        .map(|s| s.as_str())
        .unwrap_or(title);
    YEAR_RE
        .captures(candidate)
        .and_then(|c| c[1].parse::<i32>().ok())
        .filter(|y| *y >= 1800 && *y <= current_year + 1)
}

pub fn extract_brand(title: &str, aspects: &HashMap<String, String>) -> Option<String> {
    if let Some(v) = aspects.get("brand") {
        let lower = v.to_lowercase();
        if let Some(b) = WATCH_BRANDS.iter().find(|b| lower.contains(**b)) {
            return Some(capitalize_words(b));
        }
    }
    let h = haystack(title, aspects);
    WATCH_BRANDS.iter().find(|b| h.contains(**b)).map(|b| capitalize_words(b))
}

pub fn extract_model(aspects: &HashMap<String, String>) -> Option<String> {
    aspects.get("model").or_else(|| aspects.get("reference number")).cloned()
}

fn capitalize_words(s: &str) -> String {
    s.split(' ')
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brand_detected_case_insensitive() {
        assert_eq!(extract_brand("ROLEX Submariner", &HashMap::new()), Some("Rolex".to_string()));
    }

    #[test]
    fn band_material_requires_adjacent_token() {
        assert_eq!(extract_band_material("Stainless Steel Watch", &HashMap::new()), None);
        assert_eq!(
            extract_band_material("Stainless Steel Band Watch", &HashMap::new()),
            Some("stainless steel".to_string())
        );
    }

    #[test]
    fn year_within_bounds() {
        assert_eq!(extract_year("1975 Vintage Watch", &HashMap::new(), 2026), Some(1975));
        assert_eq!(extract_year("3099 Watch", &HashMap::new(), 2026), None);
    }
}
