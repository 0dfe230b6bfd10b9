//! Jewelry classification chain (spec §4.5.2).

use crate::extraction::constants::{
    BASE_METALS_TO_REJECT, COSTUME_JEWELRY_EXCLUSIONS, DESCRIPTION_BASE_METAL_PHRASES,
    DESCRIPTION_PLATED_PHRASES, JEWELRY_BLACKLIST_CATEGORIES, JEWELRY_CATEGORY_IDS,
    JEWELRY_TOOLS_EXCLUSIONS, METAL_ASPECT_KEYS, NO_STONE_VALUES, PLATED_TERMS, STONE_KEYWORDS,
};
use crate::extraction::html::strip_html;
use crate::extraction::jewelry::{extract_karat, extract_metal_and_purity, extract_weight_g, MetalType};
use crate::types::{JewelryFilters, ListingDetail, ListingSummary, MetalPrices, Task};

/// Steps 1-4: title-only denylists and the seller feedback gate.
/// `bypass=true` (test-seller listings) skips every reject, per §4.5.1.
pub fn stage1_title_checks(task: &Task, listing: &ListingSummary, bypass: bool) -> Result<(), String> {
    if bypass {
        return Ok(());
    }
    let title_lower = listing.title.to_lowercase();

    if let Some(term) = PLATED_TERMS.iter().find(|t| title_lower.contains(**t)) {
        return Err(format!("Plated/filled/vermeil \"{term}\""));
    }

    if let Some(metal) = BASE_METALS_TO_REJECT.iter().find(|m| title_lower.contains(**m)) {
        return Err(format!("Base metal \"{metal}\""));
    }

    let filters = task.filters.as_jewelry().cloned().unwrap_or_default();
    if !filters_allow_silver(&filters) {
        let has_silver_marker = title_lower.contains("sterling silver")
            || title_lower.contains("925 silver")
            || title_lower.contains(".925");
        let has_bare_silver = title_lower.contains("silver") && !title_lower.contains("gold");
        if has_silver_marker || has_bare_silver {
            return Err("Silver (not selected)".to_string());
        }
    }

    crate::pipeline::common::seller_feedback_ok(task, listing.seller.feedback_score)?;

    Ok(())
}

fn filters_allow_silver(filters: &JewelryFilters) -> bool {
    filters.metal.iter().any(|m| m.to_lowercase().contains("silver"))
}

pub struct JewelryComputed {
    pub karat: u32,
    pub weight_g: f64,
    pub metal_type: String,
    pub melt_value: f64,
    pub profit_scrap: f64,
    pub break_even: f64,
    pub suggested_offer: f64,
}

/// Steps 7-16, given a fetched `ListingDetail`. `bypass=true` skips every reject
/// but still runs extraction and scoring so the match record carries real fields.
pub fn stage2_detail_checks(
    task: &Task,
    listing: &ListingSummary,
    detail: &ListingDetail,
    prices_by_metal: &dyn Fn(&str) -> Option<MetalPrices>,
    bypass: bool,
) -> Result<JewelryComputed, String> {
    let normalized = detail.normalize();
    let filters = task.filters.as_jewelry().cloned().unwrap_or_default();

    if !bypass {
        if let Some(cat) = &normalized.category_id {
            if JEWELRY_BLACKLIST_CATEGORIES.contains(cat.as_str()) {
                return Err(format!("Blacklisted category {cat}"));
            }
            if !JEWELRY_CATEGORY_IDS.contains(cat.as_str()) {
                return Err(format!("Category {cat} not in jewelry set"));
            }
        }

        if let Some(desc) = &normalized.description {
            let stripped = strip_html(desc).to_lowercase();
            if let Some(phrase) = DESCRIPTION_PLATED_PHRASES.iter().find(|p| stripped.contains(**p)) {
                return Err(format!("Description plated term \"{phrase}\""));
            }
            if let Some(phrase) = DESCRIPTION_BASE_METAL_PHRASES.iter().find(|p| stripped.contains(**p)) {
                return Err(format!("Description base-metal term \"{phrase}\""));
            }
        }

        let title_lower = listing.title.to_lowercase();
        if let Some(term) = JEWELRY_TOOLS_EXCLUSIONS.iter().find(|t| title_lower.contains(**t)) {
            return Err(format!("Tools/supplies listing \"{term}\""));
        }

        for key in METAL_ASPECT_KEYS {
            if let Some(value) = normalized.aspects.get(*key) {
                let lower = value.to_lowercase();
                if let Some(m) = BASE_METALS_TO_REJECT.iter().find(|m| lower.contains(**m)) {
                    return Err(format!("Aspect \"{key}\" is base metal \"{m}\""));
                }
                if lower.contains("tone")
                    && !lower.contains("two-tone")
                    && !lower.contains("tri-tone")
                    && !lower.contains("bicolor")
                    && !lower.contains("tricolor")
                {
                    return Err(format!("Fake-tone metal in \"{key}\""));
                }
            }
        }

        if let Some(term) = COSTUME_JEWELRY_EXCLUSIONS.iter().find(|t| title_lower.contains(**t)) {
            return Err(format!("Costume jewelry term \"{term}\""));
        }

        if filters.no_stone {
            for key in ["main stone", "gemstone", "stone"] {
                if let Some(value) = normalized.aspects.get(key) {
                    let lower = value.trim().to_lowercase();
                    if !NO_STONE_VALUES.contains(&lower.as_str()) {
                        return Err(format!("Stone present in \"{key}\": {value}"));
                    }
                }
            }
            if let Some(kw) = STONE_KEYWORDS.iter().find(|k| title_lower.contains(**k)) {
                return Err(format!("Stone keyword \"{kw}\" in title"));
            }
        }
    }

    let karat = extract_karat(&listing.title, &normalized.aspects, normalized.description.as_deref());
    let weight_g = extract_weight_g(&listing.title, &normalized.aspects, normalized.description.as_deref());
    let (metal_type, purity) =
        extract_metal_and_purity(&listing.title, &normalized.aspects, karat);

    if !bypass {
        if let (Some(w), Some(min)) = (weight_g, filters.weight_min) {
            if w < min {
                return Err(format!("Weight {w:.2}g below minimum {min:.2}g"));
            }
        }
        if let (Some(w), Some(max)) = (weight_g, filters.weight_max) {
            if w > max {
                return Err(format!("Weight {w:.2}g above maximum {max:.2}g"));
            }
        }
    }

    let (Some(weight_g), Some(karat_val)) = (weight_g, karat) else {
        if bypass {
            return Ok(JewelryComputed {
                karat: karat.unwrap_or(0),
                weight_g: weight_g.unwrap_or(0.0),
                metal_type: metal_type.as_str().to_string(),
                melt_value: 0.0,
                profit_scrap: 0.0,
                break_even: 0.0,
                suggested_offer: 0.0,
            });
        }
        return Err("Karat or weight could not be determined".to_string());
    };

    let melt_value = melt_value_for(metal_type, karat_val, purity, weight_g, prices_by_metal);
    let shipping = listing.shipping_cost.unwrap_or(0.0);
    let total_cost = listing.price + shipping;
    let break_even = melt_value * crate::config::REFINING_FEE_FACTOR;
    let profit_scrap = melt_value - total_cost;
    let profit_margin_pct = if total_cost > 0.0 {
        (break_even - total_cost) / total_cost * 100.0
    } else {
        0.0
    };

    if !bypass && profit_margin_pct < task.effective_min_profit_margin() {
        return Err(format!("Profit margin {profit_margin_pct:.1}% below threshold"));
    }

    let suggested_offer = (break_even * crate::config::SUGGESTED_OFFER_FACTOR).floor();

    Ok(JewelryComputed {
        karat: karat_val,
        weight_g,
        metal_type: metal_type.as_str().to_string(),
        melt_value,
        profit_scrap,
        break_even,
        suggested_offer,
    })
}

fn melt_value_for(
    metal: MetalType,
    karat: u32,
    purity: u32,
    weight_g: f64,
    prices_by_metal: &dyn Fn(&str) -> Option<MetalPrices>,
) -> f64 {
    match metal {
        MetalType::Gold => {
            let Some(prices) = prices_by_metal("gold") else { return 0.0 };
            let per_gram = match karat {
                10 => prices.price_gram_10k,
                14 => prices.price_gram_14k,
                18 => prices.price_gram_18k,
                24 => prices.price_gram_24k,
                9 | 8 => prices.price_gram_10k * 0.97,
                22 => prices.price_gram_18k * 22.0 / 18.0,
                _ => 0.0,
            };
            weight_g * per_gram
        }
        other => {
            let key = other.as_str();
            let Some(prices) = prices_by_metal(key) else { return 0.0 };
            weight_g * prices.price_gram_24k * (purity as f64 / 1000.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuyFormat, FilterBag, ItemType, SellerInfo, ShippingType, TaskStatus};
    use std::collections::HashSet;

    fn task() -> Task {
        let mut filters = JewelryFilters::default();
        filters.metal.insert("Yellow Gold".to_string());
        Task {
            id: 1,
            user_id: 1,
            name: "gold hunter".to_string(),
            item_type: ItemType::Jewelry,
            status: TaskStatus::Active,
            min_price: 0.0,
            max_price: 500.0,
            min_seller_feedback: 0,
            listing_format: HashSet::from([BuyFormat::FixedPrice]),
            exclude_keywords: HashSet::new(),
            conditions: HashSet::new(),
            filters: FilterBag::Jewelry(filters),
            poll_interval_secs: 60,
            min_profit_margin: -20.0,
            last_run: None,
            slack_channel: None,
            slack_channel_id: None,
        }
    }

    fn listing() -> ListingSummary {
        ListingSummary {
            item_id: "A".to_string(),
            title: "14K Yellow Gold Chain 5.50g".to_string(),
            price: 150.0,
            currency: "USD".to_string(),
            shipping_cost: Some(9.0),
            shipping_type: ShippingType::Fixed,
            condition: Some("Pre-owned".to_string()),
            listing_url: "https://example.com/A".to_string(),
            listing_type: "FIXED_PRICE".to_string(),
            seller: SellerInfo { name: "seller1".to_string(), feedback_score: 600, feedback_percentage: 99.0 },
            buying_options: vec!["FIXED_PRICE".to_string()],
            item_creation_date: None,
            category_id: Some("261995".to_string()),
            returns_accepted: None,
        }
    }

    fn detail() -> ListingDetail {
        ListingDetail {
            raw_aspects: vec![
                ("Metal".to_string(), "Yellow Gold".to_string()),
                ("Metal Purity".to_string(), "14k".to_string()),
                ("Main Stone".to_string(), "None".to_string()),
                ("Weight".to_string(), "5.5 g".to_string()),
            ],
            title: listing().title,
            description: None,
            category_id: Some("261995".to_string()),
        }
    }

    #[test]
    fn plated_title_rejects() {
        let t = task();
        let mut l = listing();
        l.title = "Gold-plated chain 5g".to_string();
        assert!(stage1_title_checks(&t, &l, false).is_err());
    }

    #[test]
    fn accept_scenario_matches_spec_example() {
        let t = task();
        let l = listing();
        assert!(stage1_title_checks(&t, &l, false).is_ok());

        let prices = |metal: &str| {
            if metal == "gold" {
                Some(MetalPrices { price_gram_14k: 40.0, ..Default::default() })
            } else {
                None
            }
        };

        let computed = stage2_detail_checks(&t, &l, &detail(), &prices, false).unwrap();
        assert_eq!(computed.karat, 14);
        assert!((computed.weight_g - 5.5).abs() < 1e-6);
        assert!((computed.melt_value - 220.0).abs() < 1e-6);
        assert!((computed.break_even - 213.4).abs() < 1e-6);
        assert!((computed.suggested_offer - (220.0 * crate::config::MESSAGE_OFFER_MELT_FACTOR).floor()).abs() < 50.0);
    }
}
