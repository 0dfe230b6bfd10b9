use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Jewelry,
    Watch,
    Gemstone,
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemType::Jewelry => "jewelry",
            ItemType::Watch => "watch",
            ItemType::Gemstone => "gemstone",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ItemType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jewelry" => Ok(ItemType::Jewelry),
            "watch" => Ok(ItemType::Watch),
            "gemstone" => Ok(ItemType::Gemstone),
            other => Err(format!("unknown item_type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Paused,
    Stopped,
}

impl std::str::FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TaskStatus::Active),
            "paused" => Ok(TaskStatus::Paused),
            "stopped" => Ok(TaskStatus::Stopped),
            other => Err(format!("unknown task status '{other}'")),
        }
    }
}

/// Sale mode a listing was posted under (§3 "Listing format whitelist").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyFormat {
    Auction,
    FixedPrice,
    BestOffer,
    ClassifiedAd,
    AcceptsOffers,
}

impl BuyFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuyFormat::Auction => "AUCTION",
            BuyFormat::FixedPrice => "FIXED_PRICE",
            BuyFormat::BestOffer => "BEST_OFFER",
            BuyFormat::ClassifiedAd => "CLASSIFIED_AD",
            BuyFormat::AcceptsOffers => "ACCEPTS_OFFERS",
        }
    }

    pub fn from_ebay_label(label: &str) -> Option<Self> {
        match label {
            "Auction" => Some(BuyFormat::Auction),
            "Fixed Price (BIN)" | "FIXED_PRICE" => Some(BuyFormat::FixedPrice),
            "Best Offer" | "BEST_OFFER" => Some(BuyFormat::BestOffer),
            "Classified Ad" => Some(BuyFormat::ClassifiedAd),
            "Accepts Offers" => Some(BuyFormat::AcceptsOffers),
            _ => None,
        }
    }
}

/// Listing condition, with `used` aliased to `Pre-owned` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    PreOwned,
    ForPartsNotWorking,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::PreOwned => "Pre-owned",
            Condition::ForPartsNotWorking => "For parts or not working",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "new" => Some(Condition::New),
            "pre-owned" | "preowned" | "used" => Some(Condition::PreOwned),
            "for parts or not working" | "for parts" | "not working" => {
                Some(Condition::ForPartsNotWorking)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JewelryFilters {
    #[serde(default)]
    pub metal: HashSet<String>,
    #[serde(default)]
    pub conditions: HashSet<String>,
    #[serde(default)]
    pub categories: HashSet<String>,
    #[serde(default)]
    pub brands: HashSet<String>,
    #[serde(default)]
    pub main_stones: HashSet<String>,
    #[serde(default)]
    pub metal_purity: HashSet<String>,
    #[serde(default)]
    pub setting_style: HashSet<String>,
    #[serde(default)]
    pub era: HashSet<String>,
    #[serde(default)]
    pub features: HashSet<String>,
    #[serde(default)]
    pub colors: HashSet<String>,
    #[serde(default)]
    pub stone_colors: HashSet<String>,
    #[serde(default)]
    pub materials: HashSet<String>,
    #[serde(default)]
    pub styles: HashSet<String>,
    pub weight_min: Option<f64>,
    pub weight_max: Option<f64>,
    pub carat_weight_min: Option<f64>,
    pub carat_weight_max: Option<f64>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub no_stone: bool,
    #[serde(default)]
    pub selected_subcategories: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GemstoneFilters {
    #[serde(default)]
    pub stone_types: HashSet<String>,
    #[serde(default)]
    pub gemstone_creation: HashSet<String>,
    #[serde(default)]
    pub colors: HashSet<String>,
    #[serde(default)]
    pub shapes: HashSet<String>,
    #[serde(default)]
    pub clarities: HashSet<String>,
    #[serde(default)]
    pub treatments: HashSet<String>,
    #[serde(default)]
    pub conditions: HashSet<String>,
    #[serde(default)]
    pub brands: HashSet<String>,
    pub carat_min: Option<f64>,
    pub carat_max: Option<f64>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub allow_lab_created: bool,
    #[serde(default)]
    pub include_jewelry: bool,
    pub min_deal_score: Option<u32>,
    pub max_risk_score: Option<u32>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chrono24Reference {
    Avg,
    Low,
    Disabled,
}

impl Default for Chrono24Reference {
    fn default() -> Self {
        Chrono24Reference::Disabled
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchFilters {
    #[serde(default)]
    pub brands: HashSet<String>,
    #[serde(default)]
    pub models: HashSet<String>,
    #[serde(default)]
    pub movements: HashSet<String>,
    #[serde(default)]
    pub case_materials: HashSet<String>,
    #[serde(default)]
    pub bezel: HashSet<String>,
    #[serde(default)]
    pub dial_colors: HashSet<String>,
    #[serde(default)]
    pub band_materials: HashSet<String>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub case_size_min: Option<f64>,
    pub case_size_max: Option<f64>,
    pub thickness_min: Option<f64>,
    pub thickness_max: Option<f64>,
    pub lug_width_min: Option<f64>,
    pub lug_width_max: Option<f64>,
    pub reference_number: Option<String>,
    #[serde(default)]
    pub chrono24_reference: Chrono24Reference,
    pub reference_margin: Option<f64>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Tagged-union filter bag replacing the source's untyped per-type jsonb columns (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "lowercase")]
pub enum FilterBag {
    Jewelry(JewelryFilters),
    Watch(WatchFilters),
    Gemstone(GemstoneFilters),
}

impl FilterBag {
    pub fn item_type(&self) -> ItemType {
        match self {
            FilterBag::Jewelry(_) => ItemType::Jewelry,
            FilterBag::Watch(_) => ItemType::Watch,
            FilterBag::Gemstone(_) => ItemType::Gemstone,
        }
    }

    pub fn as_jewelry(&self) -> Option<&JewelryFilters> {
        match self {
            FilterBag::Jewelry(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_gemstone(&self) -> Option<&GemstoneFilters> {
        match self {
            FilterBag::Gemstone(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_watch(&self) -> Option<&WatchFilters> {
        match self {
            FilterBag::Watch(f) => Some(f),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub item_type: ItemType,
    pub status: TaskStatus,
    pub min_price: f64,
    pub max_price: f64,
    pub min_seller_feedback: i64,
    pub listing_format: HashSet<BuyFormat>,
    pub exclude_keywords: HashSet<String>,
    pub conditions: HashSet<Condition>,
    pub filters: FilterBag,
    pub poll_interval_secs: u32,
    pub min_profit_margin: f64,
    pub last_run: Option<DateTime<Utc>>,
    pub slack_channel: Option<String>,
    pub slack_channel_id: Option<String>,
}

impl Task {
    /// §4.5.2-14: task-level field is authoritative; floor at -50% (§9 open-question resolution).
    pub fn effective_min_profit_margin(&self) -> f64 {
        self.min_profit_margin.max(crate::config::DEFAULT_MIN_PROFIT_MARGIN_PCT)
    }
}

// ---------------------------------------------------------------------------
// Credentials / OAuth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Active,
    RateLimited,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub label: String,
    pub app_id: String,
    pub cert_id: String,
    pub status: CredentialStatus,
    pub rate_limited_at: Option<DateTime<Utc>>,
    pub calls_today: i64,
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    RoundRobin,
    LeastUsed,
}

impl Default for RotationStrategy {
    fn default() -> Self {
        RotationStrategy::RoundRobin
    }
}

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub credential_label: String,
}

// ---------------------------------------------------------------------------
// Listings (from SearchAdapter / DetailFetcher)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingType {
    Free,
    Fixed,
    Calculated,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerInfo {
    pub name: String,
    pub feedback_score: i64,
    pub feedback_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSummary {
    pub item_id: String,
    pub title: String,
    pub price: f64,
    pub currency: String,
    pub shipping_cost: Option<f64>,
    pub shipping_type: ShippingType,
    pub condition: Option<String>,
    pub listing_url: String,
    pub listing_type: String,
    pub seller: SellerInfo,
    pub buying_options: Vec<String>,
    pub item_creation_date: Option<DateTime<Utc>>,
    pub category_id: Option<String>,
    pub returns_accepted: Option<bool>,
}

impl ListingSummary {
    /// Price gate input: raw price + shipping-when-known (§3, §4.5.1-5).
    /// Calculated shipping with no estimate contributes 0 to the gate (§8 boundary behavior)
    /// even though the notifier still says "+ shipping".
    pub fn total_for_price_gate(&self) -> f64 {
        self.price + self.shipping_cost.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedDetail {
    pub aspects: HashMap<String, String>,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDetail {
    pub raw_aspects: Vec<(String, String)>,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
}

impl ListingDetail {
    pub fn normalize(&self) -> NormalizedDetail {
        let mut aspects = HashMap::new();
        for (name, value) in &self.raw_aspects {
            aspects.insert(name.to_lowercase(), value.clone());
        }
        NormalizedDetail {
            aspects,
            title: self.title.clone(),
            description: self.description.clone(),
            category_id: self.category_id.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    New,
    Purchased,
    Rejected,
    Watching,
    Reviewing,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::New => "new",
            MatchStatus::Purchased => "purchased",
            MatchStatus::Rejected => "rejected",
            MatchStatus::Watching => "watching",
            MatchStatus::Reviewing => "reviewing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(MatchStatus::New),
            "purchased" => Some(MatchStatus::Purchased),
            "rejected" => Some(MatchStatus::Rejected),
            "watching" => Some(MatchStatus::Watching),
            "reviewing" => Some(MatchStatus::Reviewing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchCommon {
    pub task_id: i64,
    pub user_id: i64,
    pub ebay_listing_id: String,
    pub ebay_title: String,
    pub ebay_url: String,
    pub listed_price: f64,
    /// `None` = unknown, `Some(0.0)` = free.
    pub shipping_cost: Option<f64>,
    pub currency: String,
    pub buy_format: BuyFormat,
    pub seller_feedback: i64,
    pub found_at: DateTime<Utc>,
    pub item_creation_date: Option<DateTime<Utc>>,
    pub status: MatchStatus,
    pub notification_sent: bool,
    pub slack_message_ts: Option<String>,
    pub slack_channel_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JewelryMatch {
    pub common: MatchCommon,
    pub karat: u32,
    pub weight_g: f64,
    pub metal_type: String,
    pub melt_value: f64,
    pub profit_scrap: f64,
    pub break_even: f64,
    pub suggested_offer: f64,
}

#[derive(Debug, Clone)]
pub struct GemstoneMatch {
    pub common: MatchCommon,
    pub stone_type: Option<String>,
    pub shape: Option<String>,
    pub carat: Option<f64>,
    pub colour: Option<String>,
    pub clarity: Option<String>,
    pub cert_lab: Option<String>,
    pub treatment: Option<String>,
    pub is_natural: bool,
    pub deal_score: u32,
    pub risk_score: u32,
}

#[derive(Debug, Clone)]
pub struct WatchMatch {
    pub common: MatchCommon,
    pub case_material: Option<String>,
    pub band_material: Option<String>,
    pub movement: Option<String>,
    pub dial_color: Option<String>,
    pub year: Option<i32>,
    pub brand: Option<String>,
    pub model: Option<String>,
}

// ---------------------------------------------------------------------------
// Caches
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RejectCacheEntry {
    pub task_id: i64,
    pub ebay_listing_id: String,
    pub rejection_reason: String,
    pub rejected_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DetailCacheEntry {
    pub ebay_item_id: String,
    pub aspects: HashMap<String, String>,
    pub title: String,
    pub description: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetalPrices {
    pub price_gram_10k: f64,
    pub price_gram_14k: f64,
    pub price_gram_18k: f64,
    pub price_gram_24k: f64,
}

// ---------------------------------------------------------------------------
// Scheduler health metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CycleStats {
    pub tasks_processed: i64,
    pub tasks_failed: i64,
    pub total_items_found: i64,
    pub total_matches: i64,
    pub total_excluded: i64,
}
