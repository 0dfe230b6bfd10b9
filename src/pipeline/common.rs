//! Common prefix shared by every item type's classification chain (spec §4.5.1).

use crate::types::{Condition, ListingSummary, Task};

pub fn keyword_excluded(task: &Task, title: &str) -> Option<String> {
    let lower = title.to_lowercase();
    task.exclude_keywords
        .iter()
        .find(|kw| lower.contains(kw.as_str()))
        .map(|kw| format!("Excluded keyword \"{kw}\""))
}

pub fn condition_allowed(task: &Task, condition_raw: Option<&str>) -> Result<(), String> {
    if task.conditions.is_empty() {
        return Ok(());
    }
    let Some(raw) = condition_raw else {
        return Err("Condition not whitelisted".to_string());
    };
    match Condition::parse(raw) {
        Some(c) if task.conditions.contains(&c) => Ok(()),
        _ => Err(format!("Condition \"{raw}\" not whitelisted")),
    }
}

/// Raw listed price gate, evaluated before any detail fetch (§4.5.1-5).
pub fn price_in_range(task: &Task, listing: &ListingSummary) -> Result<(), String> {
    if listing.price < task.min_price || listing.price > task.max_price {
        return Err(format!(
            "Price {:.2} outside [{:.2}, {:.2}]",
            listing.price, task.min_price, task.max_price
        ));
    }
    Ok(())
}

pub fn seller_feedback_ok(task: &Task, feedback_score: i64) -> Result<(), String> {
    if feedback_score < task.min_seller_feedback {
        return Err(format!(
            "Seller feedback {feedback_score} below minimum {}",
            task.min_seller_feedback
        ));
    }
    Ok(())
}

/// Runs the common prefix (keyword, condition, price). Seller feedback and
/// RejectCache/TestBypass/duplicate checks happen in the caller, since they
/// need collaborators (cache, store) the pure prefix doesn't have access to.
pub fn common_prefix(task: &Task, listing: &ListingSummary) -> Result<(), String> {
    if let Some(reason) = keyword_excluded(task, &listing.title) {
        return Err(reason);
    }
    condition_allowed(task, listing.condition.as_deref())?;
    price_in_range(task, listing)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuyFormat, FilterBag, ItemType, JewelryFilters, SellerInfo, ShippingType, TaskStatus};
    use std::collections::HashSet;

    fn base_task() -> Task {
        Task {
            id: 1,
            user_id: 1,
            name: "t".to_string(),
            item_type: ItemType::Jewelry,
            status: TaskStatus::Active,
            min_price: 10.0,
            max_price: 500.0,
            min_seller_feedback: 0,
            listing_format: HashSet::from([BuyFormat::FixedPrice]),
            exclude_keywords: HashSet::from(["fake".to_string()]),
            conditions: HashSet::new(),
            filters: FilterBag::Jewelry(JewelryFilters::default()),
            poll_interval_secs: 60,
            min_profit_margin: -50.0,
            last_run: None,
            slack_channel: None,
            slack_channel_id: None,
        }
    }

    fn summary(price: f64, title: &str) -> ListingSummary {
        ListingSummary {
            item_id: "A".to_string(),
            title: title.to_string(),
            price,
            currency: "USD".to_string(),
            shipping_cost: None,
            shipping_type: ShippingType::Unknown,
            condition: None,
            listing_url: "https://example.com/A".to_string(),
            listing_type: "FIXED_PRICE".to_string(),
            seller: SellerInfo { name: "s".to_string(), feedback_score: 100, feedback_percentage: 99.0 },
            buying_options: vec!["FIXED_PRICE".to_string()],
            item_creation_date: None,
            category_id: None,
            returns_accepted: None,
        }
    }

    #[test]
    fn keyword_exclusion_matches_substring() {
        let task = base_task();
        assert!(keyword_excluded(&task, "This is a FAKE ring").is_some());
        assert!(keyword_excluded(&task, "Real gold ring").is_none());
    }

    #[test]
    fn price_gate_rejects_out_of_range() {
        let task = base_task();
        assert!(price_in_range(&task, &summary(5.0, "Ring")).is_err());
        assert!(price_in_range(&task, &summary(150.0, "Ring")).is_ok());
    }

    #[test]
    fn condition_whitelist_empty_allows_all() {
        let task = base_task();
        assert!(condition_allowed(&task, None).is_ok());
    }

    #[test]
    fn condition_used_aliases_to_preowned() {
        let mut task = base_task();
        task.conditions.insert(Condition::PreOwned);
        assert!(condition_allowed(&task, Some("used")).is_ok());
        assert!(condition_allowed(&task, Some("New")).is_err());
    }
}
