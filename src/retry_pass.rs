//! RetryPass (spec §4.10): re-attempts notification for rows left
//! `notification_sent = false`, up to 10 rows per match table per cycle.

use tracing::warn;

use crate::config::RETRY_PASS_LIMIT;
use crate::error::Result;
use crate::notifier::{format_gemstone_message, format_jewelry_message, Notifier};
use crate::pipeline::gemstone::GemstoneComputed;
use crate::pipeline::jewelry::JewelryComputed;
use crate::store::match_store::{match_common_from_row, UnsentRow};
use crate::store::MatchStore;
use crate::types::{ItemType, ListingSummary, SellerInfo, ShippingType};

fn listing_from_row(row: &UnsentRow) -> ListingSummary {
    ListingSummary {
        item_id: String::new(),
        title: row.ebay_title.clone(),
        price: row.listed_price,
        currency: "USD".to_string(),
        shipping_cost: row.shipping_cost,
        shipping_type: ShippingType::Unknown,
        condition: None,
        listing_url: row.ebay_url.clone(),
        listing_type: "FIXED_PRICE".to_string(),
        seller: SellerInfo { name: String::new(), feedback_score: 0, feedback_percentage: 0.0 },
        buying_options: vec![],
        item_creation_date: None,
        category_id: None,
        returns_accepted: None,
    }
}

async fn retry_jewelry(store: &MatchStore, notifier: &Notifier) -> Result<()> {
    let rows = store.list_unsent(ItemType::Jewelry, RETRY_PASS_LIMIT).await?;
    for row in rows {
        let listing = listing_from_row(&row);
        let common = match_common_from_row(&row);
        let computed = JewelryComputed {
            karat: row.karat.unwrap_or(0) as u32,
            weight_g: row.weight_g.unwrap_or(0.0),
            metal_type: "gold".to_string(),
            melt_value: row.melt_value.unwrap_or(0.0),
            profit_scrap: 0.0,
            break_even: row.melt_value.unwrap_or(0.0) * crate::config::REFINING_FEE_FACTOR,
            suggested_offer: row.suggested_offer.unwrap_or(0.0),
        };
        let text = format_jewelry_message(&listing, &common, &computed);
        let result = notifier.send(row.slack_channel.as_deref(), &text).await?;
        if result.ok {
            store
                .update_notification(ItemType::Jewelry, row.id, result.ts.as_deref(), result.channel_id.as_deref())
                .await?;
        } else {
            warn!(match_id = row.id, "retry pass: jewelry notification still failing");
        }
    }
    Ok(())
}

async fn retry_gemstone(store: &MatchStore, notifier: &Notifier) -> Result<()> {
    let rows = store.list_unsent(ItemType::Gemstone, RETRY_PASS_LIMIT).await?;
    for row in rows {
        let listing = listing_from_row(&row);
        let common = match_common_from_row(&row);
        let computed = GemstoneComputed {
            stone_type: row.stone_type.clone(),
            shape: row.shape.clone(),
            carat: row.carat,
            colour: row.colour.clone(),
            clarity: row.clarity.clone(),
            cert_lab: row.cert_lab.clone(),
            treatment: String::new(),
            is_natural: false,
            deal_score: row.deal_score.unwrap_or(0) as u32,
            risk_score: row.risk_score.unwrap_or(0) as u32,
        };
        let text = format_gemstone_message(&listing, &common, &computed);
        let result = notifier.send(row.slack_channel.as_deref(), &text).await?;
        if result.ok {
            store
                .update_notification(ItemType::Gemstone, row.id, result.ts.as_deref(), result.channel_id.as_deref())
                .await?;
        } else {
            warn!(match_id = row.id, "retry pass: gemstone notification still failing");
        }
    }
    Ok(())
}

pub async fn run(store: &MatchStore, notifier: &Notifier) -> Result<()> {
    retry_jewelry(store, notifier).await?;
    retry_gemstone(store, notifier).await?;
    Ok(())
}
