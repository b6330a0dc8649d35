//! Property-based test generators using proptest.
//!
//! Provides strategies for scenario data that keeps the invariants the
//! datasource relies on, such as unique item names per table.

use proptest::prelude::*;
use seedbus_core::RawRow;

/// Text transforms with a simple reference model, see
/// [`apply_text_transform`].
pub const TEXT_TRANSFORMS: [&str; 5] = ["upper", "lower", "trim", "append:-x", "prepend:x-"];

/// Strategy for generating item names such as `"Ada Lovelace"`.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{2,9}( [A-Z][a-z]{2,9})?").expect("Invalid regex")
}

/// Strategy for generating distinct item names.
pub fn unique_names_strategy(size: std::ops::Range<usize>) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(name_strategy(), size).prop_map(|names| names.into_iter().collect())
}

/// Strategy for generating attendee rows with distinct names.
pub fn attendee_rows_strategy() -> impl Strategy<Value = Vec<RawRow>> {
    unique_names_strategy(1..12).prop_flat_map(|names| {
        let len = names.len();
        (
            Just(names),
            prop::collection::vec(
                prop::option::of(prop::string::string_regex("[A-Z][a-z]{1,8}").expect("Invalid regex")),
                len,
            ),
        )
            .prop_map(|(names, companies)| {
                names
                    .into_iter()
                    .zip(companies)
                    .map(|(name, company)| {
                        let mut row = RawRow::new();
                        row.push("Name", name);
                        if let Some(company) = company {
                            row.push("Company", company);
                        }
                        row
                    })
                    .collect()
            })
    })
}

/// Strategy for generating a chain of [`TEXT_TRANSFORMS`].
pub fn text_chain_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(TEXT_TRANSFORMS.to_vec()), 1..5)
        .prop_map(|chain| chain.into_iter().map(str::to_string).collect())
}

/// Strategy for generating cell text with surrounding whitespace.
pub fn cell_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ ]{0,2}[A-Za-z]{1,8}[ ]{0,2}").expect("Invalid regex")
}

/// Reference model of one [`TEXT_TRANSFORMS`] entry.
///
/// # Panics
///
/// Panics for names outside [`TEXT_TRANSFORMS`].
pub fn apply_text_transform(name: &str, text: &str) -> String {
    match name {
        "upper" => text.to_uppercase(),
        "lower" => text.to_lowercase(),
        "trim" => text.trim().to_string(),
        "append:-x" => format!("{text}-x"),
        "prepend:x-" => format!("x-{text}"),
        other => panic!("no reference model for transform '{other}'"),
    }
}

/// Reference model of a transform chain, applied left to right.
pub fn apply_text_chain(chain: &[String], text: &str) -> String {
    chain
        .iter()
        .fold(text.to_string(), |acc, name| apply_text_transform(name, &acc))
}
