use insta::assert_snapshot;
use querycompat::models::{Sql, SqlVariant};
use querycompat::version::{parse_version, select_versioned_sql};

fn merges_query() -> Sql {
    Sql::from(vec![
        SqlVariant::new("22.8", "SELECT database, table, elapsed FROM system.merges"),
        SqlVariant::new(
            "23.8",
            "SELECT database, table, elapsed, merge_type FROM system.merges",
        ),
        SqlVariant::new(
            "24.1",
            "SELECT database, table, elapsed, merge_type, merge_algorithm FROM system.merges",
        ),
    ])
}

#[test]
fn picks_newest_variant_not_newer_than_server() {
    let sql = merges_query();
    let version = parse_version(Some("23.12.1.1"));
    assert_snapshot!(
        select_versioned_sql(&sql, version.as_ref()),
        @"SELECT database, table, elapsed, merge_type FROM system.merges"
    );
}

#[test]
fn exact_since_match_qualifies() {
    let sql = merges_query();
    let version = parse_version(Some("24.1"));
    assert_snapshot!(
        select_versioned_sql(&sql, version.as_ref()),
        @"SELECT database, table, elapsed, merge_type, merge_algorithm FROM system.merges"
    );
}

#[test]
fn patch_and_build_do_not_affect_selection() {
    let sql = merges_query();
    let low = parse_version(Some("23.8.0.0"));
    let high = parse_version(Some("23.8.16.40"));
    assert_eq!(
        select_versioned_sql(&sql, low.as_ref()),
        select_versioned_sql(&sql, high.as_ref())
    );
}

#[test]
fn unknown_version_uses_oldest_variant() {
    let sql = merges_query();
    assert_snapshot!(
        select_versioned_sql(&sql, None),
        @"SELECT database, table, elapsed FROM system.merges"
    );
}

#[test]
fn server_older_than_every_variant_uses_oldest_variant() {
    let sql = merges_query();
    let version = parse_version(Some("21.3"));
    assert_snapshot!(
        select_versioned_sql(&sql, version.as_ref()),
        @"SELECT database, table, elapsed FROM system.merges"
    );
}

#[test]
fn declaration_order_is_not_trusted() {
    let sql = Sql::from(vec![
        SqlVariant::new("24.1", "newest"),
        SqlVariant::new("22.8", "oldest"),
        SqlVariant::new("23.8", "middle"),
    ]);
    assert_eq!(select_versioned_sql(&sql, parse_version(Some("25.1")).as_ref()), "newest");
    assert_eq!(select_versioned_sql(&sql, parse_version(Some("23.9")).as_ref()), "middle");
    assert_eq!(select_versioned_sql(&sql, None), "oldest");
}

#[test]
fn plain_sql_ignores_version() {
    let sql = Sql::from("SELECT uptime()");
    assert_eq!(select_versioned_sql(&sql, None), "SELECT uptime()");
    assert_eq!(
        select_versioned_sql(&sql, parse_version(Some("24.3")).as_ref()),
        "SELECT uptime()"
    );
}
