use querycompat::version::{ParsedVersion, parse_version};

#[test]
fn parses_full_four_part_versions() {
    assert_eq!(
        parse_version(Some("24.3.1.2672")),
        Some(ParsedVersion::new(24, 3, 1, 2672))
    );
}

#[test]
fn missing_segments_default_to_zero() {
    assert_eq!(parse_version(Some("23")), Some(ParsedVersion::new(23, 0, 0, 0)));
    assert_eq!(parse_version(Some("23.8")), Some(ParsedVersion::new(23, 8, 0, 0)));
}

#[test]
fn empty_and_missing_input_is_unknown() {
    assert_eq!(parse_version(None), None);
    assert_eq!(parse_version(Some("")), None);
    assert_eq!(parse_version(Some("   ")), None);
    assert_eq!(parse_version(Some("unknown")), None);
    assert_eq!(parse_version(Some(".3.1")), None);
}

#[test]
fn non_numeric_suffixes_keep_leading_digits() {
    assert_eq!(
        parse_version(Some("24.8.4.13-lts")),
        Some(ParsedVersion::new(24, 8, 4, 13))
    );
    assert_eq!(
        parse_version(Some("23.3.x.y")),
        Some(ParsedVersion::new(23, 3, 0, 0))
    );
    assert_eq!(
        parse_version(Some("v22.12.1")),
        Some(ParsedVersion::new(22, 12, 1, 0))
    );
}

#[test]
fn segments_beyond_four_are_ignored() {
    assert_eq!(
        parse_version(Some("24.1.2.3.4.5")),
        Some(ParsedVersion::new(24, 1, 2, 3))
    );
}

#[test]
fn out_of_range_segments_fall_back_to_zero() {
    assert_eq!(
        parse_version(Some("24.99999999999.1")),
        Some(ParsedVersion::new(24, 0, 1, 0))
    );
}

#[test]
fn only_major_and_minor_form_the_feature_level() {
    let a = parse_version(Some("24.3.1.1")).expect("version should parse");
    let b = parse_version(Some("24.3.9.9")).expect("version should parse");
    assert_eq!(a.feature_level(), b.feature_level());
    assert_eq!(a.feature_level(), (24, 3));
}
