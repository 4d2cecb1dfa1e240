use querycompat::dependencies::{DependencyResolver, PatternDependencyResolver, TableRef};
use querycompat::models::{QueryDefinition, SqlVariant};
use querycompat::resolve_dependencies;

#[test]
fn explicit_table_check_wins_over_sql_scan() {
    let query = QueryDefinition::new("backups", "SELECT * FROM system.backup_log")
        .optional()
        .with_table_check(["system.backups"]);
    assert_eq!(resolve_dependencies(&query), vec!["system.backups"]);
}

#[test]
fn single_string_table_check_is_accepted() {
    let query: QueryDefinition = serde_json::from_str(
        r#"{"name":"zk","sql":"SELECT 1","optional":true,"tableCheck":"system.zookeeper_log"}"#,
    )
    .expect("definition should parse");
    assert_eq!(resolve_dependencies(&query), vec!["system.zookeeper_log"]);
}

#[test]
fn table_check_entries_are_deduplicated_in_order() {
    let query = QueryDefinition::new("x", "SELECT 1").with_table_check([
        "system.b",
        "system.a",
        "system.b",
    ]);
    assert_eq!(resolve_dependencies(&query), vec!["system.b", "system.a"]);
}

#[test]
fn scans_from_and_join_across_every_variant() {
    let query = QueryDefinition::new(
        "replication",
        vec![
            SqlVariant::new(
                "22.8",
                "SELECT * FROM system.replicas r JOIN system.replication_queue q ON r.table = q.table",
            ),
            SqlVariant::new(
                "24.1",
                "SELECT * FROM system.replicas r join system.replicated_fetches f USING (table)",
            ),
        ],
    );
    assert_eq!(
        resolve_dependencies(&query),
        vec![
            "system.replicas",
            "system.replication_queue",
            "system.replicated_fetches"
        ]
    );
}

#[test]
fn unqualified_tables_are_not_dependencies() {
    let query = QueryDefinition::new("numbers", "SELECT count() FROM numbers(10)");
    assert!(resolve_dependencies(&query).is_empty());
}

#[test]
fn pattern_resolver_matches_free_function() {
    let query = QueryDefinition::new("parts", "SELECT * FROM system.parts");
    assert_eq!(
        PatternDependencyResolver.resolve_dependencies(&query),
        resolve_dependencies(&query)
    );
}

#[test]
fn bare_table_names_land_in_default_database() {
    let table = TableRef::parse("events");
    assert_eq!(table.database, "default");
    assert_eq!(table.table, "events");
}
