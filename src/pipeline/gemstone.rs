//! Gemstone classification chain (spec §4.5.3-4.5.5).

use crate::extraction::constants::{GEMSTONE_BLACKLIST, GEMSTONE_CATEGORY_IDS, JEWELRY_CATEGORY_IDS, LAB_CREATED_TERMS};
use crate::extraction::gemstone::{
    extract_carat, extract_certification, extract_clarity, extract_color, extract_is_natural,
    extract_shape, extract_stone_type, extract_treatment, CertTier, Treatment,
};
use crate::types::{GemstoneFilters, ListingDetail, ListingSummary, Task};

pub struct GemstoneComputed {
    pub stone_type: Option<String>,
    pub shape: Option<String>,
    pub carat: Option<f64>,
    pub colour: Option<String>,
    pub clarity: Option<String>,
    pub cert_lab: Option<String>,
    pub treatment: String,
    pub is_natural: bool,
    pub deal_score: u32,
    pub risk_score: u32,
}

pub fn category_allowed(category_id: Option<&str>) -> Result<(), String> {
    let Some(cat) = category_id else { return Ok(()) };
    if GEMSTONE_CATEGORY_IDS.contains(cat) || JEWELRY_CATEGORY_IDS.contains(cat) {
        Ok(())
    } else {
        Err(format!("Category {cat} not a gemstone category"))
    }
}

fn word_boundary_contains(haystack: &str, term: &str) -> bool {
    if term.len() <= 3 {
        haystack.split(|c: char| !c.is_alphanumeric()).any(|w| w == term)
    } else {
        haystack.contains(term)
    }
}

pub fn blacklist_check(
    title: &str,
    aspects: &std::collections::HashMap<String, String>,
    filters: &GemstoneFilters,
) -> Result<(), String> {
    let haystack = format!(
        "{} {}",
        title.to_lowercase(),
        aspects.values().cloned().collect::<Vec<_>>().join(" ").to_lowercase()
    );

    if let Some(term) = GEMSTONE_BLACKLIST.iter().find(|t| word_boundary_contains(&haystack, t)) {
        return Err(format!("Simulant/blacklisted term \"{term}\""));
    }

    if !filters.allow_lab_created {
        if let Some(term) = LAB_CREATED_TERMS.iter().find(|t| word_boundary_contains(&haystack, t)) {
            return Err(format!("Lab-created term \"{term}\""));
        }
    }

    Ok(())
}

pub fn carat_in_range(filters: &GemstoneFilters, carat: Option<f64>) -> Result<(), String> {
    let Some(c) = carat else { return Ok(()) };
    if let Some(min) = filters.carat_min {
        if c < min {
            return Err(format!("Carat {c:.2} below minimum {min:.2}"));
        }
    }
    if let Some(max) = filters.carat_max {
        if c > max {
            return Err(format!("Carat {c:.2} above maximum {max:.2}"));
        }
    }
    Ok(())
}

pub fn classify(
    task: &Task,
    listing: &ListingSummary,
    detail: &ListingDetail,
) -> Result<GemstoneComputed, String> {
    let normalized = detail.normalize();
    let filters = task.filters.as_gemstone().cloned().unwrap_or_default();

    category_allowed(normalized.category_id.as_deref())?;
    blacklist_check(&listing.title, &normalized.aspects, &filters)?;

    let stone_type = extract_stone_type(&listing.title, &normalized.aspects);
    let shape = extract_shape(&listing.title, &normalized.aspects);
    let carat = extract_carat(&listing.title, &normalized.aspects);
    let colour = extract_color(&listing.title, &normalized.aspects);
    let clarity = extract_clarity(&listing.title, &normalized.aspects);
    let (cert_lab, cert_tier) = extract_certification(&listing.title, &normalized.aspects);
    let treatment = extract_treatment(&listing.title, &normalized.aspects);
    let is_natural = extract_is_natural(&listing.title, &normalized.aspects);

    carat_in_range(&filters, carat)?;

    if !filters.stone_types.is_empty() {
        if let Some(st) = &stone_type {
            if !filters.stone_types.iter().any(|s| s.eq_ignore_ascii_case(st)) {
                return Err(format!("Stone type {st} not in filter set"));
            }
        }
    }

    let deal_score = deal_score(task, listing, &filters, &stone_type, &shape, carat, &colour, &clarity, cert_tier, is_natural, treatment);
    let risk_score = risk_score(listing, &stone_type, &colour, &clarity, carat, treatment, is_natural);

    if let Some(min) = filters.min_deal_score {
        if deal_score < min {
            return Err(format!("Deal score {deal_score} below minimum {min}"));
        }
    }
    if let Some(max) = filters.max_risk_score {
        if risk_score > max {
            return Err(format!("Risk score {risk_score} above maximum {max}"));
        }
    }

    Ok(GemstoneComputed {
        stone_type,
        shape,
        carat,
        colour,
        clarity,
        cert_lab,
        treatment: treatment.as_str().to_string(),
        is_natural,
        deal_score,
        risk_score,
    })
}

#[allow(clippy::too_many_arguments)]
fn deal_score(
    _task: &Task,
    listing: &ListingSummary,
    filters: &GemstoneFilters,
    stone_type: &Option<String>,
    shape: &Option<String>,
    carat: Option<f64>,
    colour: &Option<String>,
    clarity: &Option<String>,
    cert_tier: CertTier,
    is_natural: bool,
    treatment: Treatment,
) -> u32 {
    let has_stone_type_filter = !filters.stone_types.is_empty();
    let has_shape_filter = !filters.shapes.is_empty();
    let has_carat_filter = filters.carat_min.is_some() || filters.carat_max.is_some();

    let set_filter_count =
        [has_stone_type_filter, has_shape_filter, has_carat_filter].iter().filter(|p| **p).count();

    let match_quality: f64 = if set_filter_count > 0 {
        let mut raw = 0.0;
        if has_stone_type_filter && stone_type.is_some() {
            raw += 1.0;
        }
        if has_shape_filter && shape.is_some() {
            raw += 1.0;
        }
        if has_carat_filter && carat.is_some() {
            raw += 1.0;
        }
        (raw / set_filter_count as f64) * 25.0
    } else {
        let present = [stone_type.is_some(), shape.is_some(), carat.is_some(), colour.is_some(), clarity.is_some()]
            .iter()
            .filter(|p| **p)
            .count();
        (present as f64 / 5.0) * 25.0
    };

    let seller_quality = seller_quality_score(listing.seller.feedback_score, listing.seller.feedback_percentage);
    let format_score = match listing.listing_type.as_str() {
        "BEST_OFFER" => 10.0,
        "FIXED_PRICE" => 7.0,
        "AUCTION" => 5.0,
        _ => 3.0,
    };
    let cert_bonus = match cert_tier {
        CertTier::Premium => 15.0,
        CertTier::Standard => 10.0,
        CertTier::Budget => 5.0,
        CertTier::Generic => 3.0,
        CertTier::None => 0.0,
    };
    let detail_bonus = ([carat.is_some(), colour.is_some(), clarity.is_some(), shape.is_some(), treatment != Treatment::Unknown]
        .iter()
        .filter(|p| **p)
        .count() as f64
        * 2.0)
        .min(10.0);

    let mut raw_sum = match_quality + seller_quality + format_score + cert_bonus + detail_bonus;
    if is_natural {
        raw_sum += 5.0;
    }
    let is_diamond = stone_type.as_deref().map(|s| s.eq_ignore_ascii_case("diamond")).unwrap_or(false);
    if treatment == Treatment::NotEnhanced && !is_diamond {
        raw_sum += 5.0;
    }

    ((raw_sum / 85.0) * 100.0).round().clamp(0.0, 100.0) as u32
}

fn seller_quality_score(feedback_score: i64, feedback_percentage: f64) -> f64 {
    let score_component = match feedback_score {
        s if s >= 10000 => 8.0,
        s if s >= 5000 => 7.0,
        s if s >= 1000 => 6.0,
        s if s >= 500 => 5.0,
        s if s >= 100 => 4.0,
        s if s >= 50 => 3.0,
        s if s >= 10 => 2.0,
        _ => 1.0,
    };
    let pct_component = match feedback_percentage {
        p if p >= 99.5 => 7.0,
        p if p >= 99.0 => 6.0,
        p if p >= 98.0 => 5.0,
        p if p >= 95.0 => 4.0,
        p if p >= 90.0 => 3.0,
        p if p >= 80.0 => 2.0,
        _ => 1.0,
    };
    score_component + pct_component
}

fn risk_score(
    listing: &ListingSummary,
    stone_type: &Option<String>,
    colour: &Option<String>,
    clarity: &Option<String>,
    carat: Option<f64>,
    treatment: Treatment,
    is_natural: bool,
) -> u32 {
    let title_lower = listing.title.to_lowercase();
    let mut score = 0i64;

    if ["lab", "synthetic", "created", "cvd", "hpht", "simulant"]
        .iter()
        .any(|t| title_lower.contains(t))
    {
        score += 30;
    }

    if listing.returns_accepted == Some(false) {
        score += 20;
    }

    let missing = [carat.is_none(), colour.is_none(), clarity.is_none(), stone_type.is_none()]
        .iter()
        .filter(|m| **m)
        .count() as i64;
    score += 5 * missing;

    if treatment == Treatment::Heavy {
        score += 15;
    }

    if listing.seller.feedback_score < 50 {
        score += 10;
    } else if listing.seller.feedback_score < 100 {
        score += 5;
    }
    if listing.seller.feedback_percentage < 98.0 {
        score += 5;
    }

    if ["beautiful", "stunning", "rare find", "one of a kind"]
        .iter()
        .any(|t| title_lower.contains(t))
    {
        score += 10;
    }

    if is_natural {
        if let Some(c) = carat {
            if c >= 1.0 {
                let price_per_carat = listing.price / c;
                if price_per_carat < 50.0 {
                    score += 10;
                }
            }
        }
    }

    score.clamp(0, 100) as u32
}
