//! Watch classification chain (spec §4.5.6) — no scoring, attribute capture only.

use chrono::{Datelike, Utc};

use crate::extraction::watch::{
    extract_band_material, extract_brand, extract_case_material, extract_dial_color, extract_model,
    extract_movement, extract_year,
};
use crate::types::ListingDetail;

pub struct WatchComputed {
    pub case_material: Option<String>,
    pub band_material: Option<String>,
    pub movement: Option<String>,
    pub dial_color: Option<String>,
    pub year: Option<i32>,
    pub brand: Option<String>,
    pub model: Option<String>,
}

pub fn classify(title: &str, detail: &ListingDetail) -> WatchComputed {
    let normalized = detail.normalize();
    let current_year = Utc::now().year();
    WatchComputed {
        case_material: extract_case_material(title, &normalized.aspects),
        band_material: extract_band_material(title, &normalized.aspects),
        movement: extract_movement(title, &normalized.aspects),
        dial_color: extract_dial_color(title, &normalized.aspects),
        year: extract_year(title, &normalized.aspects, current_year),
        brand: extract_brand(title, &normalized.aspects),
        model: extract_model(&normalized.aspects),
    }
}
