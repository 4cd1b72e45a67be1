use serde::{Deserialize, Serialize};

use crate::calendar::MonthName;
use crate::seasonality::SeasonalityEntry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    #[serde(rename = "India")]
    India,
    #[serde(rename = "USA")]
    Usa,
}

impl Country {
    pub const ALL: [Country; 2] = [Country::India, Country::Usa];

    pub fn as_str(self) -> &'static str {
        match self {
            Country::India => "India",
            Country::Usa => "USA",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "india" => Some(Country::India),
            "usa" | "us" => Some(Country::Usa),
            _ => None,
        }
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distribution channel: general trade or modern trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Gt,
    Mt,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Gt, Channel::Mt];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Gt => "GT",
            Channel::Mt => "MT",
        }
    }
}

/// Closed set of known product categories across both countries. Adding a
/// category is a compile-time decision; free-form names from external data
/// that fail to parse take the generic-bias fallback in the synthesizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    SweetMixes,
    Beverages,
    Masala,
    ReadyToEat,
    BreakfastCereals,
    CondimentsSauces,
    DairyAlternatives,
    Seafood,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::SweetMixes => "Sweet Mixes",
            Category::Beverages => "Beverages",
            Category::Masala => "Masala",
            Category::ReadyToEat => "Ready To Eat",
            Category::BreakfastCereals => "Breakfast Cereals",
            Category::CondimentsSauces => "Condiments & Sauces",
            Category::DairyAlternatives => "Dairy & Alternatives",
            Category::Seafood => "Seafood",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Sweet Mixes" => Some(Category::SweetMixes),
            "Beverages" => Some(Category::Beverages),
            "Masala" => Some(Category::Masala),
            "Ready To Eat" => Some(Category::ReadyToEat),
            "Breakfast Cereals" => Some(Category::BreakfastCereals),
            "Condiments & Sauces" => Some(Category::CondimentsSauces),
            "Dairy & Alternatives" => Some(Category::DairyAlternatives),
            "Seafood" => Some(Category::Seafood),
            _ => None,
        }
    }
}

/// One cell of the business-dimension Cartesian product. Built fresh per run
/// and held in memory only for the duration of generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Product {
    pub country: Country,
    pub state: String,
    pub city: String,
    pub plant: String,
    pub category: Category,
    pub sku_code: String,
    pub product_name: String,
    pub channel: Channel,
}

struct SkuDef {
    code: &'static str,
    product_name: &'static str,
}

struct CityDef {
    name: &'static str,
    plants: &'static [&'static str],
}

struct StateDef {
    name: &'static str,
    cities: &'static [CityDef],
}

/// Static per-country dimension hierarchy plus the default seasonality
/// fallback used when the external table has no exact match.
pub struct CountryCatalog {
    pub country: Country,
    states: &'static [StateDef],
    categories: &'static [(Category, &'static [SkuDef])],
    pub seasonality_file: &'static str,
}

const INDIA_STATES: &[StateDef] = &[
    StateDef {
        name: "Karnataka",
        cities: &[
            CityDef { name: "Bengaluru", plants: &["Kar123"] },
            CityDef { name: "Hubballi", plants: &["Kar125"] },
            CityDef { name: "Udupi", plants: &["Kar124"] },
        ],
    },
    StateDef {
        name: "Andhra Pradesh",
        cities: &[
            CityDef { name: "Tirupati", plants: &["And126"] },
            CityDef { name: "Vijayawada", plants: &["And201"] },
            CityDef { name: "Visakhapatnam", plants: &["And202"] },
        ],
    },
];

const INDIA_CATEGORIES: &[(Category, &[SkuDef])] = &[
    (
        Category::SweetMixes,
        &[
            SkuDef { code: "SKU-GULAB", product_name: "Gulab Jamun - 200gm" },
            SkuDef { code: "SKU-RASG", product_name: "Coconut Burfi - 100gm" },
        ],
    ),
    (
        Category::Beverages,
        &[
            SkuDef { code: "SKU-BADAM-MILK", product_name: "Badam Milk - 200ml" },
            SkuDef { code: "SKU-CHOCOLATE", product_name: "Chocolate Milk Shake - 200ml" },
        ],
    ),
    (
        Category::Masala,
        &[
            SkuDef { code: "SKU-GARAM", product_name: "Garam Masala - 100gm" },
            SkuDef { code: "SKU-CHILLI", product_name: "Chilli Powder - 100gm" },
            SkuDef { code: "SKU-SAMBHAR", product_name: "Sambhar Powder - 100gm" },
        ],
    ),
    (
        Category::ReadyToEat,
        &[
            SkuDef { code: "SKU-POHA", product_name: "Instant Poha - 250gm" },
            SkuDef { code: "SKU-UPMA", product_name: "Rava Upma - 500gm" },
            SkuDef { code: "SKU-DOSAMIX", product_name: "Dosa Mix - 250gm" },
        ],
    ),
];

const USA_STATES: &[StateDef] = &[
    StateDef {
        name: "California",
        cities: &[
            CityDef { name: "Los Angeles", plants: &["LA123"] },
            CityDef { name: "San Francisco", plants: &["SF124"] },
            CityDef { name: "San Diego", plants: &["SD125"] },
        ],
    },
    StateDef {
        name: "Texas",
        cities: &[
            CityDef { name: "Houston", plants: &["HS201"] },
            CityDef { name: "Dallas", plants: &["Da202"] },
            CityDef { name: "Austin", plants: &["Au203"] },
        ],
    },
];

const USA_CATEGORIES: &[(Category, &[SkuDef])] = &[
    (
        Category::BreakfastCereals,
        &[
            SkuDef { code: "SKU-CORN", product_name: "Cornflakes - 200 gm" },
            SkuDef { code: "SKU-OATS", product_name: "Oats - 100 gm" },
        ],
    ),
    (
        Category::CondimentsSauces,
        &[
            SkuDef { code: "SKU-KETCHUP", product_name: "Ketchup - 200 ml" },
            SkuDef { code: "SKU-BBQ", product_name: "BBQ Sauce - 200 ml" },
            SkuDef { code: "SKU-HOTSAUCE", product_name: "Hot Sauce - 100 ml" },
        ],
    ),
    (
        Category::DairyAlternatives,
        &[
            SkuDef { code: "SKU-ALMOND", product_name: "Almond Milk - 200 ml" },
            SkuDef { code: "SKU-YOGURT", product_name: "Yogurt - 200 ml" },
        ],
    ),
    (
        Category::Seafood,
        &[
            SkuDef { code: "SKU-SHRIMP", product_name: "Frozen Shrimp - 250gm" },
            SkuDef { code: "SKU-TUNA", product_name: "Canned Tuna - 500gm" },
            SkuDef { code: "SKU-SALMON", product_name: "Salmon Fillets - 250gm" },
        ],
    ),
];

impl CountryCatalog {
    pub fn for_country(country: Country) -> Self {
        match country {
            Country::India => Self {
                country,
                states: INDIA_STATES,
                categories: INDIA_CATEGORIES,
                seasonality_file: "output.json",
            },
            Country::Usa => Self {
                country,
                states: USA_STATES,
                categories: USA_CATEGORIES,
                seasonality_file: "output_usa.json",
            },
        }
    }

    /// Built-in fallback entry used whenever the seasonality table has no
    /// exact match for a product, or the table failed to load at all.
    pub fn default_entry(&self) -> SeasonalityEntry {
        match self.country {
            Country::India => SeasonalityEntry {
                state: "Karnataka".to_string(),
                category: "Masala".to_string(),
                plant: "Kar123".to_string(),
                product_name: "Sambhar Powder - 100gm".to_string(),
                min: 2500.0,
                max: 4000.0,
                trend_peaks: vec![MonthName::May, MonthName::October],
                dips: vec![],
            },
            Country::Usa => SeasonalityEntry {
                state: "California".to_string(),
                category: "Breakfast Cereals".to_string(),
                plant: "LA123".to_string(),
                product_name: "Cornflakes - 200 gm".to_string(),
                min: 2500.0,
                max: 4500.0,
                trend_peaks: vec![MonthName::November, MonthName::December],
                dips: vec![MonthName::February],
            },
        }
    }

    /// Full Cartesian product:
    /// state x city x plant x category x sku x channel.
    pub fn products(&self) -> Vec<Product> {
        let mut products = Vec::new();
        for state in self.states {
            for city in state.cities {
                for plant in city.plants {
                    for (category, skus) in self.categories {
                        for sku in *skus {
                            for channel in Channel::ALL {
                                products.push(Product {
                                    country: self.country,
                                    state: state.name.to_string(),
                                    city: city.name.to_string(),
                                    plant: plant.to_string(),
                                    category: *category,
                                    sku_code: sku.code.to_string(),
                                    product_name: sku.product_name.to_string(),
                                    channel,
                                });
                            }
                        }
                    }
                }
            }
        }
        products
    }
}
