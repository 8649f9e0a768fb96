//! Free-text industry → [`Category`] mapping.
//!
//! Rules are checked in declaration order and the first rule that hits wins.
//! Order matters: "tour" is checked before "desa wisata", so "Desa Wisata
//! Tour" is a tour operator.
//!
//! Long keywords match anywhere in the lower-cased text. Short ones that hide
//! inside unrelated words ("ngo" in "mango", "villa" in "village") only match
//! a whole word, where words are split on anything not alphanumeric.

use crmsync_shared::Category;

/// One ordered matching rule.
#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub category: Category,
    /// Matched as substrings of the lower-cased text.
    pub keywords: &'static [&'static str],
    /// Matched only against whole words.
    pub words: &'static [&'static str],
}

impl CategoryRule {
    /// Whether the lower-cased text, or one of its `words`, hits this rule.
    pub fn matches(&self, lowered: &str, words: &[&str]) -> bool {
        self.keywords.iter().any(|kw| lowered.contains(kw))
            || self.words.iter().any(|w| words.contains(w))
    }
}

/// Lower-cased text split into alphanumeric words.
fn split_words(lowered: &str) -> Vec<&str> {
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Matching rules in precedence order.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::Government,
        keywords: &[
            "government",
            "pemerintah",
            "kementerian",
            "ministry",
            "dinas",
            "municipal",
        ],
        words: &[],
    },
    CategoryRule {
        category: Category::Ngo,
        keywords: &["non-profit", "nonprofit", "foundation", "yayasan"],
        words: &["ngo", "ngos"],
    },
    CategoryRule {
        category: Category::Media,
        keywords: &["news", "magazine", "broadcast"],
        words: &["media", "press"],
    },
    CategoryRule {
        category: Category::Accommodation,
        keywords: &[
            "hotel",
            "resort",
            "hostel",
            "homestay",
            "guest house",
            "lodging",
            "accommodation",
        ],
        words: &["villa", "villas"],
    },
    CategoryRule {
        category: Category::TourOperator,
        keywords: &["travel"],
        words: &["tour", "tours", "trip", "trips"],
    },
    CategoryRule {
        category: Category::Bumn,
        keywords: &["bumn", "state-owned", "state owned", "persero"],
        words: &[],
    },
    CategoryRule {
        category: Category::Transportation,
        keywords: &[
            "transport",
            "airline",
            "aviation",
            "shipping",
            "logistic",
            "cruise",
        ],
        words: &[],
    },
    CategoryRule {
        category: Category::Fnb,
        keywords: &[
            "f&b",
            "fnb",
            "food",
            "beverage",
            "restaurant",
            "cafe",
            "coffee",
            "espresso",
            "culinary",
            "catering",
        ],
        words: &[],
    },
    CategoryRule {
        category: Category::Attraction,
        keywords: &["attraction", "theme park", "amusement", "museum", "waterpark"],
        words: &["zoo"],
    },
    CategoryRule {
        category: Category::TourismVillage,
        keywords: &["desa wisata", "tourism village", "village", "kampung"],
        words: &[],
    },
    CategoryRule {
        category: Category::HospitalitySuppliers,
        keywords: &["supplier", "amenities", "linen", "laundry", "equipment"],
        words: &[],
    },
];

/// Map a free-text industry description to a category.
///
/// Blank or missing input, and text matching no rule, map to [`Category::Others`].
pub fn map_industry_to_category(industry: Option<&str>) -> Category {
    let Some(text) = industry.map(str::trim).filter(|t| !t.is_empty()) else {
        return Category::Others;
    };
    let lowered = text.to_lowercase();
    let words = split_words(&lowered);

    CATEGORY_RULES
        .iter()
        .find(|rule| rule.matches(&lowered, &words))
        .map(|rule| rule.category)
        .unwrap_or(Category::Others)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hotel_maps_to_accommodation() {
        assert_eq!(
            map_industry_to_category(Some("Luxury Hotel & Resort")),
            Category::Accommodation
        );
    }

    #[test]
    fn missing_or_blank_is_others() {
        assert_eq!(map_industry_to_category(None), Category::Others);
        assert_eq!(map_industry_to_category(Some("")), Category::Others);
        assert_eq!(map_industry_to_category(Some("   ")), Category::Others);
        assert_eq!(
            map_industry_to_category(Some("Semiconductor fabrication")),
            Category::Others
        );
    }

    #[test]
    fn tour_wins_over_tourism_village() {
        assert_eq!(
            map_industry_to_category(Some("Desa Wisata Tour")),
            Category::TourOperator
        );
        assert_eq!(
            map_industry_to_category(Some("Desa Wisata Penglipuran")),
            Category::TourismVillage
        );
    }

    #[test]
    fn travel_is_tour_operator_unless_an_earlier_rule_hits() {
        assert_eq!(
            map_industry_to_category(Some("Travel & Transport Services")),
            Category::TourOperator
        );
        assert_eq!(
            map_industry_to_category(Some("Travel Media Network")),
            Category::Media
        );
        assert_eq!(
            map_industry_to_category(Some("Hotel Travel Desk")),
            Category::Accommodation
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(
            map_industry_to_category(Some("DINAS PARIWISATA")),
            Category::Government
        );
        assert_eq!(map_industry_to_category(Some("PT Persero")), Category::Bumn);
        assert_eq!(
            map_industry_to_category(Some("Coffee Roastery")),
            Category::Fnb
        );
        assert_eq!(
            map_industry_to_category(Some("Hotel Linen Supplier")),
            Category::Accommodation
        );
        assert_eq!(
            map_industry_to_category(Some("Linen Supplier")),
            Category::HospitalitySuppliers
        );
    }

    #[test]
    fn short_keywords_match_whole_words_only() {
        assert_eq!(
            map_industry_to_category(Some("Kampung Village")),
            Category::TourismVillage
        );
        assert_eq!(
            map_industry_to_category(Some("Tourism Village Cooperative")),
            Category::TourismVillage
        );
        assert_eq!(map_industry_to_category(Some("Mango Cafe")), Category::Fnb);
        assert_eq!(map_industry_to_category(Some("Espresso Bar")), Category::Fnb);
        assert_eq!(
            map_industry_to_category(Some("Congo Coffee Roasters")),
            Category::Fnb
        );
        assert_eq!(
            map_industry_to_category(Some("Desa Wisata Penglipuran")),
            Category::TourismVillage
        );
    }

    #[test]
    fn short_keywords_still_hit_as_words() {
        assert_eq!(
            map_industry_to_category(Some("Local NGO (education)")),
            Category::Ngo
        );
        assert_eq!(
            map_industry_to_category(Some("Bali Villa Rentals")),
            Category::Accommodation
        );
        assert_eq!(
            map_industry_to_category(Some("Press/Publishing")),
            Category::Media
        );
        assert_eq!(
            map_industry_to_category(Some("Safari Zoo")),
            Category::Attraction
        );
        assert_eq!(
            map_industry_to_category(Some("Day-Trip Organizer")),
            Category::TourOperator
        );
    }

    #[test]
    fn rules_cover_every_specific_category_once() {
        let specific: Vec<Category> = Category::ALL
            .iter()
            .copied()
            .filter(|c| *c != Category::Others)
            .collect();
        let ruled: Vec<Category> = CATEGORY_RULES.iter().map(|r| r.category).collect();
        assert_eq!(ruled, specific);
    }
}
