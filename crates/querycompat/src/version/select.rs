use crate::models::{Sql, SqlVariant};

use super::{ParsedVersion, parse_version};

/// Picks the SQL text that applies to `version`.
///
/// Among variants whose `since` is at or below the version's `(major, minor)`, the greatest `since`
/// wins; identical `since` values resolve to the later-declared variant. When no variant qualifies
/// (including an unknown version) the oldest variant is used. Variant order in the input is not
/// trusted.
#[must_use]
pub fn select_versioned_sql<'a>(sql: &'a Sql, version: Option<&ParsedVersion>) -> &'a str {
    let variants = match sql {
        Sql::Plain(text) => return text,
        Sql::Versioned(variants) => variants,
    };

    let target = version.map(ParsedVersion::feature_level);
    let newest_qualifying = target.and_then(|target| {
        pick_last_max(
            variants
                .iter()
                .map(|variant| (since_level(variant), variant))
                .filter(|(level, _)| *level <= target),
        )
    });

    newest_qualifying
        .or_else(|| {
            pick_last_max(
                variants
                    .iter()
                    .map(|variant| (std::cmp::Reverse(since_level(variant)), variant)),
            )
        })
        .map_or("", |variant| variant.sql.as_str())
}

/// Unparsable `since` values sort as the oldest possible version.
fn since_level(variant: &SqlVariant) -> (u32, u32) {
    parse_version(Some(variant.since.as_str())).map_or((0, 0), |parsed| parsed.feature_level())
}

/// `Iterator::max_by` returns the last of several equal maxima.
fn pick_last_max<'a, K: Ord>(
    candidates: impl Iterator<Item = (K, &'a SqlVariant)>,
) -> Option<&'a SqlVariant> {
    candidates
        .max_by(|(left, _), (right, _)| left.cmp(right))
        .map(|(_, variant)| variant)
}
