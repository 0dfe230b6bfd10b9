//! Item-type-specific ordered rule chains (spec §4.5). Each chain returns
//! `continue | reject(reason)` and, on success, a computed-fields struct the
//! caller turns into a persisted match.

pub mod common;
pub mod gemstone;
pub mod jewelry;
pub mod watch;

use crate::types::{ItemType, ListingDetail, ListingSummary, MetalPrices, Task};

pub enum Computed {
    Jewelry(jewelry::JewelryComputed),
    Gemstone(gemstone::GemstoneComputed),
    Watch(watch::WatchComputed),
}

/// Steps that only need the listing summary (no detail fetch yet): common
/// prefix plus whichever item-type checks run before the detail call.
pub fn pre_detail_checks(task: &Task, listing: &ListingSummary, bypass: bool) -> Result<(), String> {
    if !bypass {
        common::common_prefix(task, listing)?;
    }
    if task.item_type == ItemType::Jewelry {
        jewelry::stage1_title_checks(task, listing, bypass)?;
    }
    Ok(())
}

/// Steps that require the fetched detail.
pub fn post_detail_checks(
    task: &Task,
    listing: &ListingSummary,
    detail: &ListingDetail,
    prices_by_metal: &dyn Fn(&str) -> Option<MetalPrices>,
    bypass: bool,
) -> Result<Computed, String> {
    match task.item_type {
        ItemType::Jewelry => {
            let computed = jewelry::stage2_detail_checks(task, listing, detail, prices_by_metal, bypass)?;
            Ok(Computed::Jewelry(computed))
        }
        ItemType::Gemstone => {
            if bypass {
                // Bypass still runs extraction but ignores every gate; reuse classify()
                // and fall back to defaults if a gate would otherwise fire.
                match gemstone::classify(task, listing, detail) {
                    Ok(c) => Ok(Computed::Gemstone(c)),
                    Err(_) => Ok(Computed::Gemstone(gemstone_defaults(listing, detail))),
                }
            } else {
                let computed = gemstone::classify(task, listing, detail)?;
                Ok(Computed::Gemstone(computed))
            }
        }
        ItemType::Watch => Ok(Computed::Watch(watch::classify(&listing.title, detail))),
    }
}

fn gemstone_defaults(listing: &ListingSummary, detail: &ListingDetail) -> gemstone::GemstoneComputed {
    let normalized = detail.normalize();
    gemstone::GemstoneComputed {
        stone_type: crate::extraction::gemstone::extract_stone_type(&listing.title, &normalized.aspects),
        shape: crate::extraction::gemstone::extract_shape(&listing.title, &normalized.aspects),
        carat: crate::extraction::gemstone::extract_carat(&listing.title, &normalized.aspects),
        colour: crate::extraction::gemstone::extract_color(&listing.title, &normalized.aspects),
        clarity: crate::extraction::gemstone::extract_clarity(&listing.title, &normalized.aspects),
        cert_lab: crate::extraction::gemstone::extract_certification(&listing.title, &normalized.aspects).0,
        treatment: crate::extraction::gemstone::extract_treatment(&listing.title, &normalized.aspects)
            .as_str()
            .to_string(),
        is_natural: crate::extraction::gemstone::extract_is_natural(&listing.title, &normalized.aspects),
        deal_score: 0,
        risk_score: 0,
    }
}
