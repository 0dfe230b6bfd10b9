//! Message content contract (spec §4.7): each formatter preserves the fields
//! named in the contract; exact wording is this implementation's own.

use chrono::Utc;

use crate::config::MESSAGE_OFFER_MELT_FACTOR;
use crate::pipeline::gemstone::GemstoneComputed;
use crate::pipeline::jewelry::JewelryComputed;
use crate::types::{ListingSummary, MatchCommon};

fn truncate_title(title: &str) -> String {
    if title.chars().count() <= 150 {
        title.to_string()
    } else {
        let truncated: String = title.chars().take(147).collect();
        format!("{truncated}...")
    }
}

fn latency_footer(item_creation_date: Option<chrono::DateTime<Utc>>) -> String {
    match item_creation_date {
        Some(created) => {
            let elapsed = Utc::now().signed_duration_since(created);
            let minutes = elapsed.num_minutes().max(0);
            if minutes < 60 {
                format!("found {minutes}m after listing")
            } else {
                format!("found {}h{}m after listing", minutes / 60, minutes % 60)
            }
        }
        None => "listing age unknown".to_string(),
    }
}

pub fn format_jewelry_message(listing: &ListingSummary, common: &MatchCommon, computed: &JewelryComputed) -> String {
    let total = listing.total_for_price_gate();
    let suggested_offer = (computed.melt_value * MESSAGE_OFFER_MELT_FACTOR).floor();
    let profit_margin_pct = if total > 0.0 {
        (computed.break_even - total) / total * 100.0
    } else {
        0.0
    };
    let sidebar = if profit_margin_pct >= 0.0 { "green" } else { "red" };

    format!(
        "*{}*\ntotal ${:.2} | {}K {} {:.2}g | suggested offer ${:.2} | margin {:.1}% [{}]\n{}\n<{}|View listing>",
        truncate_title(&listing.title),
        total,
        computed.karat,
        computed.metal_type,
        computed.weight_g,
        suggested_offer,
        profit_margin_pct,
        sidebar,
        latency_footer(common.item_creation_date),
        listing.listing_url,
    )
}

fn deal_emoji(score: u32) -> &'static str {
    if score >= 80 {
        ":fire:"
    } else if score >= 60 {
        ":gem:"
    } else {
        ":file_folder:"
    }
}

fn risk_label(score: u32) -> (&'static str, &'static str) {
    if score >= 50 {
        (":red_circle:", "High")
    } else if score >= 30 {
        (":large_orange_circle:", "Med")
    } else {
        (":large_green_circle:", "Low")
    }
}

pub fn format_gemstone_message(listing: &ListingSummary, common: &MatchCommon, computed: &GemstoneComputed) -> String {
    let (risk_emoji, risk_text) = risk_label(computed.risk_score);
    let carat = computed.carat.map(|c| format!("{c:.2}ct")).unwrap_or_else(|| "? ct".to_string());
    let stone = computed.stone_type.clone().unwrap_or_else(|| "Unknown stone".to_string());

    format!(
        "*{}*\n{} deal {} | {} risk {} ({})\n{} {}\n{} | {} | {} | {}\n{}\n<{}|View listing>",
        truncate_title(&listing.title),
        deal_emoji(computed.deal_score),
        computed.deal_score,
        risk_emoji,
        computed.risk_score,
        risk_text,
        carat,
        stone,
        computed.shape.clone().unwrap_or_else(|| "?".to_string()),
        computed.colour.clone().unwrap_or_else(|| "?".to_string()),
        computed.clarity.clone().unwrap_or_else(|| "?".to_string()),
        computed.cert_lab.clone().unwrap_or_else(|| "uncertified".to_string()),
        latency_footer(common.item_creation_date),
        listing.listing_url,
    )
}

pub fn format_test_bypass_message(listing: &ListingSummary, seller_name: &str) -> String {
    format!(
        ":test_tube: TEST LISTING :test_tube:\nseller: {}\n*{}*\n<{}|View listing>",
        seller_name,
        truncate_title(&listing.title),
        listing.listing_url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuyFormat, MatchStatus, SellerInfo, ShippingType};

    fn listing() -> ListingSummary {
        ListingSummary {
            item_id: "A".to_string(),
            title: "14K Yellow Gold Chain 5.50g".to_string(),
            price: 150.0,
            currency: "USD".to_string(),
            shipping_cost: Some(9.0),
            shipping_type: ShippingType::Fixed,
            condition: None,
            listing_url: "https://example.com/A".to_string(),
            listing_type: "FIXED_PRICE".to_string(),
            seller: SellerInfo { name: "seller1".to_string(), feedback_score: 600, feedback_percentage: 99.0 },
            buying_options: vec!["FIXED_PRICE".to_string()],
            item_creation_date: None,
            category_id: None,
            returns_accepted: None,
        }
    }

    fn common() -> MatchCommon {
        MatchCommon {
            task_id: 1,
            user_id: 1,
            ebay_listing_id: "A".to_string(),
            ebay_title: listing().title,
            ebay_url: listing().listing_url,
            listed_price: 150.0,
            shipping_cost: Some(9.0),
            currency: "USD".to_string(),
            buy_format: BuyFormat::FixedPrice,
            seller_feedback: 600,
            found_at: Utc::now(),
            item_creation_date: Some(Utc::now() - chrono::Duration::minutes(12)),
            status: MatchStatus::New,
            notification_sent: false,
            slack_message_ts: None,
            slack_channel_id: None,
        }
    }

    #[test]
    fn jewelry_message_contains_required_fields() {
        let computed = JewelryComputed {
            karat: 14,
            weight_g: 5.5,
            metal_type: "gold".to_string(),
            melt_value: 220.0,
            profit_scrap: 61.0,
            break_even: 213.4,
            suggested_offer: 187.0,
        };
        let msg = format_jewelry_message(&listing(), &common(), &computed);
        assert!(msg.contains("14K"));
        assert!(msg.contains("5.50g"));
        assert!(msg.contains("suggested offer"));
        assert!(msg.contains("View listing"));
    }

    #[test]
    fn title_longer_than_150_chars_is_truncated() {
        let long = "x".repeat(200);
        assert_eq!(truncate_title(&long).chars().count(), 150);
    }
}
