//! Listing filter.
//!
//! Pure boolean matching, no ranking or scoring. A listing may satisfy
//! several builds independently, and the bargain rule is evaluated on top of
//! build matching.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::builds::Build;
use crate::market::models::Listing;

/// Any listing under this USD price alerts unconditionally.
pub const BARGAIN_THRESHOLD: Decimal = dec!(50);

/// A listing matches a build iff all four clauses hold: class membership,
/// breed-count ceiling, price ceiling (exclusive), required-parts subset.
/// Listings without a parseable price never match.
pub fn matches(listing: &Listing, build: &Build) -> bool {
    let Some(class) = listing.class else {
        return false;
    };
    if !build.classes.contains(&class) {
        return false;
    }
    if listing.breed_count > build.max_breed_count {
        return false;
    }
    let Some(price) = listing.price() else {
        return false;
    };
    if price >= build.max_price {
        return false;
    }
    let names = listing.part_names();
    build.parts.iter().all(|part| names.contains(part.as_str()))
}

/// Per-build matched subsets. Builds with no hits are omitted.
pub fn match_builds<'a>(
    listings: &'a [Listing],
    builds: &'a [Build],
) -> Vec<(&'a Build, Vec<&'a Listing>)> {
    builds
        .iter()
        .filter_map(|build| {
            let hits: Vec<&Listing> = listings
                .iter()
                .filter(|listing| matches(listing, build))
                .collect();
            (!hits.is_empty()).then_some((build, hits))
        })
        .collect()
}

/// Unconditional bargain rule, independent of builds.
pub fn bargains(listings: &[Listing]) -> Vec<&Listing> {
    price_under(listings, BARGAIN_THRESHOLD)
}

pub fn price_under(listings: &[Listing], ceiling: Decimal) -> Vec<&Listing> {
    listings
        .iter()
        .filter(|listing| listing.price().is_some_and(|price| price < ceiling))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::models::{Auction, Class, Part};
    use std::collections::HashSet;

    fn part(id: &str, name: &str) -> Part {
        Part {
            id: id.to_string(),
            name: name.to_string(),
            class: None,
            slot: None,
        }
    }

    fn listing(id: &str, class: Class, breed_count: u32, price: &str, parts: &[&str]) -> Listing {
        Listing {
            id: id.to_string(),
            class: Some(class),
            breed_count,
            parts: parts.iter().map(|n| part("x", n)).collect(),
            stats: None,
            auction: Some(Auction {
                starting_price: "0".to_string(),
                ending_price: "0".to_string(),
                starting_timestamp: "0".to_string(),
                ending_timestamp: "0".to_string(),
                current_price: None,
                current_price_usd: price.to_string(),
            }),
            image: None,
        }
    }

    fn build(classes: &[Class], max_breed_count: u32, max_price: &str, parts: &[&str]) -> Build {
        Build {
            name: "Test Build".to_string(),
            classes: classes.iter().copied().collect(),
            max_breed_count,
            max_price: max_price.parse().unwrap(),
            parts: parts.iter().map(|p| p.to_string()).collect(),
            part_ids: Vec::new(),
            r1_deviation: 0,
            r2_deviation: 0,
        }
    }

    #[test]
    fn test_all_clauses_hold() {
        // The spec scenario: Beast, 0 breeds, $40, has Tiny Turtle.
        let l = listing("X1", Class::Beast, 0, "40", &["Tiny Turtle", "Nut Cracker"]);
        let b = build(&[Class::Beast], 1, "50", &["Tiny Turtle"]);
        assert!(matches(&l, &b));
        assert_eq!(bargains(std::slice::from_ref(&l)).len(), 1);
    }

    #[test]
    fn test_class_clause() {
        let l = listing("1", Class::Plant, 0, "40", &[]);
        let b = build(&[Class::Beast], 1, "50", &[]);
        assert!(!matches(&l, &b));
    }

    #[test]
    fn test_breed_count_clause_is_inclusive() {
        let b = build(&[Class::Beast], 2, "50", &[]);
        assert!(matches(&listing("1", Class::Beast, 2, "40", &[]), &b));
        assert!(!matches(&listing("2", Class::Beast, 3, "40", &[]), &b));
    }

    #[test]
    fn test_price_clause_is_exclusive() {
        let b = build(&[Class::Beast], 1, "50", &[]);
        assert!(matches(&listing("1", Class::Beast, 0, "49.99", &[]), &b));
        assert!(!matches(&listing("2", Class::Beast, 0, "50", &[]), &b));
    }

    #[test]
    fn test_required_parts_subset() {
        let b = build(&[Class::Beast], 1, "50", &["Tiny Turtle", "Imp"]);
        let both = listing("1", Class::Beast, 0, "40", &["Tiny Turtle", "Imp", "Goda"]);
        let one = listing("2", Class::Beast, 0, "40", &["Tiny Turtle"]);
        assert!(matches(&both, &b));
        assert!(!matches(&one, &b));
    }

    #[test]
    fn test_missing_price_never_matches() {
        let mut l = listing("1", Class::Beast, 0, "40", &[]);
        l.auction = None;
        let b = build(&[Class::Beast], 1, "50", &[]);
        assert!(!matches(&l, &b));
        assert!(bargains(std::slice::from_ref(&l)).is_empty());
    }

    #[test]
    fn test_missing_class_never_matches() {
        let mut l = listing("1", Class::Beast, 0, "40", &[]);
        l.class = None;
        let b = build(&[Class::Beast], 1, "50", &[]);
        assert!(!matches(&l, &b));
    }

    #[test]
    fn test_tightening_thresholds_never_grows_match_set() {
        let listings: Vec<Listing> = (0..20)
            .map(|i| {
                listing(
                    &i.to_string(),
                    if i % 2 == 0 { Class::Beast } else { Class::Bird },
                    i % 5,
                    &format!("{}", 10 + i * 7),
                    if i % 3 == 0 { &["Tiny Turtle"] } else { &[] },
                )
            })
            .collect();

        let loose = build(&[Class::Beast, Class::Bird], 4, "200", &[]);
        let loose_hits: HashSet<String> = listings
            .iter()
            .filter(|l| matches(l, &loose))
            .map(|l| l.id.clone())
            .collect();

        for tight in [
            build(&[Class::Beast], 4, "200", &[]),
            build(&[Class::Beast, Class::Bird], 2, "200", &[]),
            build(&[Class::Beast, Class::Bird], 4, "80", &[]),
            build(&[Class::Beast, Class::Bird], 4, "200", &["Tiny Turtle"]),
        ] {
            let tight_hits: HashSet<String> = listings
                .iter()
                .filter(|l| matches(l, &tight))
                .map(|l| l.id.clone())
                .collect();
            assert!(tight_hits.is_subset(&loose_hits));
        }
    }

    #[test]
    fn test_match_builds_independent_per_build() {
        let listings = vec![listing("X1", Class::Beast, 0, "40", &["Tiny Turtle"])];
        let builds = vec![
            build(&[Class::Beast], 1, "50", &["Tiny Turtle"]),
            build(&[Class::Beast], 0, "45", &[]),
            build(&[Class::Plant], 1, "50", &[]),
        ];
        let matched = match_builds(&listings, &builds);
        // Two builds hit the same listing, the Plant build is omitted.
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|(_, hits)| hits.len() == 1));
    }

    #[test]
    fn test_bargain_threshold_is_exclusive() {
        let under = listing("1", Class::Beast, 0, "49.99", &[]);
        let at = listing("2", Class::Beast, 0, "50", &[]);
        let listings = vec![under, at];
        let cheap = bargains(&listings);
        assert_eq!(cheap.len(), 1);
        assert_eq!(cheap[0].id, "1");
    }
}
