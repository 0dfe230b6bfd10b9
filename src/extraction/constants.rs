//! Static lookup tables for the extraction kernel and classification pipeline (spec §6).
//! All sets are lowercase; callers normalize input before membership checks.

use once_cell::sync::Lazy;
use std::collections::HashSet;

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

pub static JEWELRY_CATEGORY_IDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "281", "164331", "67681", "67680", "261990", "261988", "261989", "261993", "261994",
        "261995", "262003", "262004", "262008", "262011", "262013", "262014", "262016", "261975",
        "50637", "155101", "50610", "50647", "50692", "48579", "48585", "48583", "48581",
        "110633", "75576",
    ]
    .into_iter()
    .collect()
});

pub static JEWELRY_BLACKLIST_CATEGORIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "182901", "262017", "13837", "31387", "261669", "10034", "166725", "16102", "38199",
        "1378", "261642",
    ]
    .into_iter()
    .collect()
});

pub static GEMSTONE_CATEGORY_IDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["10207", "51089", "164694", "262026", "262027"].into_iter().collect());

pub static KARAT_ASPECT_NAMES: &[&str] =
    &["metal purity", "purity", "karat", "gold purity", "fineness"];

/// Weight aspect-name whitelist per §4.4; `total carat weight` deliberately excluded
/// (open question resolved in favor of spec §4.4's literal wording).
pub static WEIGHT_ASPECT_NAMES: &[&str] = &[
    "total weight",
    "gram weight",
    "net weight",
    "item weight",
    "metal weight",
    "metal weight(grams)",
    "total metal weight",
    "weight",
    "total item weight",
    "approximate weight",
    "approx. weight",
    "weight (g)",
    "weight(g)",
    "product weight",
    "jewelry weight",
    "gold weight",
    "silver weight",
    "piece weight",
];

pub static VALID_KARATS: &[u32] = &[8, 9, 10, 14, 18, 22, 24];

pub static PLATED_TERMS: &[&str] = &[
    "plated",
    "gold-plated",
    "silver-plated",
    "filled",
    "gold-filled",
    "vermeil",
    "gold tone",
    "goldtone",
];

pub static BASE_METALS_TO_REJECT: &[&str] = &[
    "brass", "bronze", "copper", "pewter", "alloy", "stainless", "titanium", "tungsten", "nickel",
];

pub static SILVER_VARIANT_TERMS: &[&str] = &["silver", "sterling", "925", ".925"];

pub static DESCRIPTION_PLATED_PHRASES: &[&str] = &[
    "gold plated",
    "rose gold plated",
    "silver plated",
    "plated brass",
    "brass plated",
    "plated metal",
    "electroplated",
    "gold filled",
    "gold-filled",
    "rose gold filled",
    "silver filled",
    "gold toned",
    "goldtone",
    "silvertone",
];

pub static DESCRIPTION_BASE_METAL_PHRASES: &[&str] = &[
    "made of brass",
    "brass base",
    "base metal: brass",
    "brass with",
    "brass material",
    "solid brass",
];

pub static JEWELRY_TOOLS_EXCLUSIONS: &[&str] = &[
    "polishing cloth",
    "jewelry box",
    "display stand",
    "ring sizer",
    "cleaning kit",
    "jewelry case",
    "gift box",
    "storage box",
    "jewelry pouch",
    "presentation box",
    "loupe",
    "tweezers",
    "jewelers tool",
    "repair kit",
];

pub static COSTUME_JEWELRY_EXCLUSIONS: &[&str] =
    &["costume jewelry", "costume jewellery", "fashion jewelry", "faux", "imitation"];

pub static NO_STONE_VALUES: &[&str] = &["none", "n/a", "na", "no stone", "-", ""];

pub static STONE_KEYWORDS: &[&str] = &[
    "diamond",
    "ruby",
    "sapphire",
    "emerald",
    "gemstone",
    "gem",
    "cz",
    "cubic zirconia",
    "topaz",
    "amethyst",
    "opal",
    "pearl",
    "garnet",
    "aquamarine",
    "tanzanite",
    "moissanite",
];

pub static METAL_ASPECT_KEYS: &[&str] = &["metal", "base metal", "material"];

pub static GEMSTONE_TYPES: &[&str] = &[
    "diamond",
    "sapphire",
    "ruby",
    "emerald",
    "topaz",
    "amethyst",
    "aquamarine",
    "garnet",
    "opal",
    "tanzanite",
    "tourmaline",
    "peridot",
    "citrine",
    "morganite",
    "spinel",
    "alexandrite",
    "zircon",
    "pearl",
];

pub static STONE_SHAPES: &[&str] = &[
    "round",
    "oval",
    "princess",
    "emerald",
    "cushion",
    "pear",
    "marquise",
    "radiant",
    "asscher",
    "heart",
    "baguette",
    "trillion",
];

pub static DIAMOND_COLORS: &[&str] =
    &["d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p"];

pub static DIAMOND_CLARITIES: &[&str] = &[
    "fl", "if", "vvs1", "vvs2", "vs1", "vs2", "si1", "si2", "i1", "i2", "i3",
];

pub static CERT_LABS_PREMIUM: &[&str] = &["gia", "ags"];
pub static CERT_LABS_STANDARD: &[&str] = &["igi", "hrd", "gcal"];
pub static CERT_LABS_BUDGET: &[&str] = &["egl", "gsi", "eggl"];

pub static GEMSTONE_BLACKLIST: &[&str] =
    &["cz", "cubic zirconia", "moissanite", "simulant", "diamonique", "rhinestone", "glass"];

pub static LAB_CREATED_TERMS: &[&str] = &[
    "lab created",
    "lab-created",
    "lab grown",
    "lab-grown",
    "synthetic",
    "created",
    "cvd",
    "hpht",
];

pub static HEAVY_TREATMENT_TERMS: &[&str] =
    &["fracture filled", "glass filled", "diffusion", "irradiated", "dyed", "bonded"];

pub static VAGUE_TITLE_TERMS: &[&str] = &["beautiful", "stunning", "rare find", "one of a kind"];

pub static WATCH_BRANDS: &[&str] = &[
    "rolex",
    "omega",
    "seiko",
    "citizen",
    "tag heuer",
    "breitling",
    "cartier",
    "tudor",
    "longines",
    "tissot",
    "hamilton",
    "patek philippe",
    "audemars piguet",
    "iwc",
    "panerai",
    "bulova",
    "movado",
    "invicta",
    "fossil",
    "casio",
];

pub static WATCH_MOVEMENT_TERMS: &[&str] =
    &["automatic", "quartz", "mechanical", "kinetic", "solar", "manual wind", "self-winding"];

pub static WATCH_BAND_MATERIALS: &[&str] = &[
    "leather", "stainless steel", "rubber", "silicone", "gold", "titanium", "nato", "mesh",
];

pub static WATCH_CASE_MATERIALS: &[&str] = &[
    "stainless steel", "gold", "titanium", "ceramic", "platinum", "two-tone", "carbon fiber",
];

pub static DIAL_COLORS: &[&str] = &[
    "black", "white", "blue", "silver", "gold", "green", "brown", "grey", "gray", "champagne",
    "mother of pearl",
];

pub fn weight_aspect_names() -> HashSet<String> {
    set(WEIGHT_ASPECT_NAMES)
}
