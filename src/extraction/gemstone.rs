//! Gemstone extractors (spec §4.4).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::constants::{
    CERT_LABS_BUDGET, CERT_LABS_PREMIUM, CERT_LABS_STANDARD, DIAMOND_CLARITIES, DIAMOND_COLORS,
    GEMSTONE_TYPES, STONE_SHAPES,
};

static CARAT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:ct|carat)\b").unwrap());
static DIAMOND_COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bcolor[:\s]+([D-Pd-p])\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Treatment {
    NotEnhanced,
    HeatOnly,
    Heavy,
    Unknown,
}

impl Treatment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Treatment::NotEnhanced => "Not Enhanced",
            Treatment::HeatOnly => "Heat Only",
            Treatment::Heavy => "Heavy",
            Treatment::Unknown => "Unknown",
        }
    }
}

fn haystack(title: &str, aspects: &HashMap<String, String>) -> String {
    format!(
        "{} {}",
        title.to_lowercase(),
        aspects.values().cloned().collect::<Vec<_>>().join(" ").to_lowercase()
    )
}

pub fn extract_stone_type(title: &str, aspects: &HashMap<String, String>) -> Option<String> {
    if let Some(v) = aspects.get("stone type").or_else(|| aspects.get("gemstone")) {
        let lower = v.to_lowercase();
        if let Some(found) = GEMSTONE_TYPES.iter().find(|t| lower.contains(**t)) {
            return Some(capitalize(found));
        }
    }
    let h = haystack(title, aspects);
    GEMSTONE_TYPES.iter().find(|t| h.contains(**t)).map(|t| capitalize(t))
}

pub fn extract_shape(title: &str, aspects: &HashMap<String, String>) -> Option<String> {
    if let Some(v) = aspects.get("shape") {
        let lower = v.to_lowercase();
        if let Some(found) = STONE_SHAPES.iter().find(|s| lower.contains(**s)) {
            return Some(capitalize(found));
        }
    }
    let h = haystack(title, aspects);
    STONE_SHAPES.iter().find(|s| h.contains(**s)).map(|s| capitalize(s))
}

/// Accepts `0 < carat < 10000`.
pub fn extract_carat(title: &str, aspects: &HashMap<String, String>) -> Option<f64> {
    if let Some(v) = aspects.get("carat").or_else(|| aspects.get("carat weight")) {
        if let Ok(c) = v.trim().parse::<f64>() {
            if c > 0.0 && c < 10000.0 {
                return Some(c);
            }
        }
        if let Some(cap) = CARAT_RE.captures(v) {
            if let Ok(c) = cap[1].parse::<f64>() {
                if c > 0.0 && c < 10000.0 {
                    return Some(c);
                }
            }
        }
    }
    CARAT_RE.captures(title).and_then(|c| c[1].parse::<f64>().ok()).filter(|c| *c > 0.0 && *c < 10000.0)
}

/// Diamond color: single letter D-P.
pub fn extract_color(title: &str, aspects: &HashMap<String, String>) -> Option<String> {
    if let Some(v) = aspects.get("color").or_else(|| aspects.get("colour")) {
        let letter = v.trim().to_uppercase();
        if letter.len() == 1 && DIAMOND_COLORS.contains(&letter.to_lowercase().as_str()) {
            return Some(letter);
        }
    }
    DIAMOND_COLOR_RE.captures(title).map(|c| c[1].to_uppercase())
}

pub fn extract_clarity(title: &str, aspects: &HashMap<String, String>) -> Option<String> {
    if let Some(v) = aspects.get("clarity") {
        let lower = v.to_lowercase();
        if let Some(found) = DIAMOND_CLARITIES.iter().find(|c| lower == **c) {
            return Some(found.to_uppercase());
        }
    }
    let h = title.to_lowercase();
    DIAMOND_CLARITIES.iter().find(|c| h.contains(&format!(" {} ", c))).map(|c| c.to_uppercase())
}

pub enum CertTier {
    Premium,
    Standard,
    Budget,
    Generic,
    None,
}

pub fn extract_certification(
    title: &str,
    aspects: &HashMap<String, String>,
) -> (Option<String>, CertTier) {
    let h = haystack(title, aspects);
    for lab in CERT_LABS_PREMIUM {
        if h.contains(lab) {
            return (Some(lab.to_uppercase()), CertTier::Premium);
        }
    }
    for lab in CERT_LABS_STANDARD {
        if h.contains(lab) {
            return (Some(lab.to_uppercase()), CertTier::Standard);
        }
    }
    for lab in CERT_LABS_BUDGET {
        if h.contains(lab) {
            return (Some(lab.to_uppercase()), CertTier::Budget);
        }
    }
    if h.contains("certified") || h.contains("certificate") {
        return (None, CertTier::Generic);
    }
    (None, CertTier::None)
}

pub fn extract_treatment(title: &str, aspects: &HashMap<String, String>) -> Treatment {
    let h = haystack(title, aspects);
    if h.contains("not enhanced") || h.contains("no treatment") || h.contains("untreated") {
        return Treatment::NotEnhanced;
    }
    if h.contains("heat only") || (h.contains("heat") && h.contains("treated")) || h.contains("heated") {
        return Treatment::HeatOnly;
    }
    if crate::extraction::constants::HEAVY_TREATMENT_TERMS.iter().any(|t| h.contains(t)) {
        return Treatment::Heavy;
    }
    Treatment::Unknown
}

pub fn extract_is_natural(title: &str, aspects: &HashMap<String, String>) -> bool {
    let h = haystack(title, aspects);
    if h.contains("natural") {
        return true;
    }
    !crate::extraction::constants::LAB_CREATED_TERMS.iter().any(|t| h.contains(t))
        && !crate::extraction::constants::GEMSTONE_BLACKLIST.iter().any(|t| h.contains(t))
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        Some(first) => first.to_uppercase().collect::<String>() + c.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carat_from_title() {
        assert_eq!(extract_carat("1.25ct Natural Blue Sapphire Oval", &HashMap::new()), Some(1.25));
    }

    #[test]
    fn stone_type_from_aspects() {
        let a: HashMap<String, String> =
            [("stone type".to_string(), "Sapphire".to_string())].into_iter().collect();
        assert_eq!(extract_stone_type("", &a), Some("Sapphire".to_string()));
    }

    #[test]
    fn treatment_heat_only() {
        let a: HashMap<String, String> =
            [("treatment".to_string(), "Heated".to_string())].into_iter().collect();
        assert_eq!(extract_treatment("", &a), Treatment::HeatOnly);
    }

    #[test]
    fn natural_flag_from_creation_method() {
        let a: HashMap<String, String> =
            [("creation method".to_string(), "Natural".to_string())].into_iter().collect();
        assert!(extract_is_natural("", &a));
    }
}
