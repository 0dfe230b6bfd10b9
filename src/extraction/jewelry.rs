//! Jewelry extractors: karat, weight (grams), metal type & purity (spec §4.4).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::constants::{KARAT_ASPECT_NAMES, VALID_KARATS, WEIGHT_ASPECT_NAMES};
use super::html::strip_html;

static KARAT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*[kK]").unwrap());
static KARAT_GOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(10|14|18|22|24)k\s*gold\b").unwrap());

fn valid_karat(n: u32) -> Option<u32> {
    VALID_KARATS.contains(&n).then_some(n)
}

fn extract_karat_from(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    KARAT_RE
        .captures_iter(&lower)
        .find_map(|c| c[1].parse::<u32>().ok().and_then(valid_karat))
}

/// Karat extraction: aspects in field order, then title, then HTML-stripped description.
pub fn extract_karat(
    title: &str,
    aspects: &HashMap<String, String>,
    description: Option<&str>,
) -> Option<u32> {
    for name in KARAT_ASPECT_NAMES {
        if let Some(value) = aspects.get(*name) {
            if let Some(k) = extract_karat_from(value) {
                return Some(k);
            }
        }
    }

    if let Some(k) = extract_karat_from(title) {
        return Some(k);
    }

    if let Some(desc) = description {
        let stripped = strip_html(desc);
        let lower = stripped.to_lowercase();
        if let Some(k) = extract_karat_from(&stripped) {
            return Some(k);
        }
        if let Some(c) = KARAT_GOLD_RE.captures(&lower) {
            if let Ok(k) = c[1].parse::<u32>() {
                return valid_karat(k);
            }
        }
    }

    None
}

static WEIGHT_UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(g|gr|gm|gms|gram|grams|oz|ounce|ounces|dwt|pennyweight)\b")
        .unwrap()
});
static LEADING_DOT_TYPO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.(\d+\.\d+)").unwrap());

const OZ_TO_G: f64 = 28.3495;
const DWT_TO_G: f64 = 1.555;

fn unit_to_grams(value: f64, unit: &str) -> f64 {
    match unit.to_lowercase().as_str() {
        "g" | "gr" | "gm" | "gms" | "gram" | "grams" => value,
        "oz" | "ounce" | "ounces" => value * OZ_TO_G,
        "dwt" | "pennyweight" => value * DWT_TO_G,
        _ => value,
    }
}

/// Repairs a seller typo where a leading dot precedes a second dot: `.1.08` -> `1.08`.
fn repair_typo(text: &str) -> String {
    if let Some(c) = LEADING_DOT_TYPO_RE.captures(text) {
        return c[1].to_string();
    }
    text.to_string()
}

fn extract_weight_from(text: &str) -> Option<f64> {
    let repaired = repair_typo(text.trim());
    let c = WEIGHT_UNIT_RE.captures(&repaired)?;
    let value: f64 = c[1].parse().ok()?;
    Some(unit_to_grams(value, &c[2]))
}

/// Weight extraction: aspect whitelist, then title, then description (with typo repair).
pub fn extract_weight_g(
    title: &str,
    aspects: &HashMap<String, String>,
    description: Option<&str>,
) -> Option<f64> {
    for name in WEIGHT_ASPECT_NAMES {
        if let Some(value) = aspects.get(*name) {
            if let Some(w) = extract_weight_from(value) {
                return Some(w);
            }
        }
    }

    if let Some(w) = extract_weight_from(title) {
        return Some(w);
    }

    if let Some(desc) = description {
        let stripped = strip_html(desc);
        if let Some(w) = extract_weight_from(&stripped) {
            return Some(w);
        }
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetalType {
    Platinum,
    Palladium,
    Silver,
    Gold,
}

impl MetalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetalType::Platinum => "platinum",
            MetalType::Palladium => "palladium",
            MetalType::Silver => "silver",
            MetalType::Gold => "gold",
        }
    }
}

/// Metal type & purity (parts per thousand). Order: platinum, palladium, silver, else gold
/// (purity derived from karat, `karat * 1000 / 24`, when present).
pub fn extract_metal_and_purity(
    title: &str,
    aspects: &HashMap<String, String>,
    karat: Option<u32>,
) -> (MetalType, u32) {
    let haystack = format!(
        "{} {}",
        title.to_lowercase(),
        aspects.values().cloned().collect::<Vec<_>>().join(" ").to_lowercase()
    );

    if haystack.contains("platinum") {
        let purity = if haystack.contains("900") {
            900
        } else if haystack.contains("850") {
            850
        } else {
            950
        };
        return (MetalType::Platinum, purity);
    }

    if haystack.contains("palladium") {
        let purity = if haystack.contains("500") { 500 } else { 950 };
        return (MetalType::Palladium, purity);
    }

    if haystack.contains("sterling")
        || haystack.contains("925")
        || haystack.contains(".999")
        || haystack.contains("800 silver")
        || haystack.contains("coin silver")
        || (haystack.contains("silver") && !haystack.contains("gold"))
    {
        let purity = if haystack.contains(".999") {
            999
        } else if haystack.contains("800") {
            800
        } else {
            925
        };
        return (MetalType::Silver, purity);
    }

    let purity = karat.map(|k| k * 1000 / 24).unwrap_or(0);
    (MetalType::Gold, purity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aspects(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn karat_from_aspect() {
        let a = aspects(&[("metal purity", "14k")]);
        assert_eq!(extract_karat("", &a, None), Some(14));
    }

    #[test]
    fn karat_14k_title() {
        assert_eq!(extract_karat("14K Yellow Gold Ring", &HashMap::new(), None), Some(14));
    }

    #[test]
    fn karat_14kt_title() {
        assert_eq!(extract_karat("14kt Gold Chain", &HashMap::new(), None), Some(14));
    }

    #[test]
    fn total_carat_weight_does_not_parse_as_karat() {
        assert_eq!(extract_karat("Total Carat Weight: 14", &HashMap::new(), None), None);
    }

    #[test]
    fn weight_requires_unit_suffix() {
        assert_eq!(extract_weight_g("Total Carat Weight: 14", &HashMap::new(), None), None);
    }

    #[test]
    fn weight_typo_repaired_in_description() {
        let w = extract_weight_g("Ring", &HashMap::new(), Some(".1.08 grams"));
        assert_eq!(w, Some(1.08));
    }

    #[test]
    fn weight_oz_converted() {
        let w = extract_weight_g("1 oz Gold Bar", &HashMap::new(), None).unwrap();
        assert!((w - OZ_TO_G).abs() < 1e-6);
    }

    #[test]
    fn metal_silver_without_gold() {
        let (metal, purity) = extract_metal_and_purity("Sterling Silver Ring", &HashMap::new(), None);
        assert_eq!(metal, MetalType::Silver);
        assert_eq!(purity, 925);
    }

    #[test]
    fn metal_gold_from_karat() {
        let (metal, purity) = extract_metal_and_purity("14K Gold Ring", &HashMap::new(), Some(14));
        assert_eq!(metal, MetalType::Gold);
        assert_eq!(purity, 583);
    }
}
