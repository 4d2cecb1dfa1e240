use std::path::Path;

use clap::Parser;
use querycompat::cli::app::{Cli, Command};

#[test]
fn parses_global_runtime_flags_for_resolve() {
    let cli = Cli::parse_from([
        "querycompat",
        "--home-dir",
        "/home/tester",
        "--cwd",
        "/work/repo",
        "--cache-ttl-secs",
        "60",
        "resolve",
        "--registry",
        "queries.json",
        "--catalog",
        "catalog.json",
        "--host-id",
        "3",
        "--query",
        "backups",
        "--query",
        "merges",
    ]);

    assert_eq!(cli.runtime.home_dir.as_deref(), Some(Path::new("/home/tester")));
    assert_eq!(cli.runtime.cwd.as_deref(), Some(Path::new("/work/repo")));
    assert_eq!(cli.runtime.cache_ttl_secs, Some(60));

    match cli.command {
        Command::Resolve(args) => {
            assert_eq!(args.registry, Path::new("queries.json"));
            assert_eq!(args.catalog, Path::new("catalog.json"));
            assert_eq!(args.host_id, "3");
            assert_eq!(args.queries, vec!["backups", "merges"]);
            assert!(args.server_version.is_none());
        }
        other => panic!("expected resolve command, got {other:?}"),
    }
}

#[test]
fn runtime_flags_are_accepted_after_the_subcommand() {
    let cli = Cli::parse_from([
        "querycompat",
        "select",
        "--registry",
        "queries.json",
        "--query",
        "merges",
        "--server-version",
        "24.3.1",
        "--cache-max-entries",
        "10",
    ]);

    assert_eq!(cli.runtime.cache_max_entries, Some(10));
    match cli.command {
        Command::Select(args) => {
            assert_eq!(args.query, "merges");
            assert_eq!(args.server_version.as_deref(), Some("24.3.1"));
        }
        other => panic!("expected select command, got {other:?}"),
    }
}

#[test]
fn parses_classify_optional_flag() {
    let cli = Cli::parse_from([
        "querycompat",
        "classify",
        "--message",
        "Table system.x doesn't exist",
        "--optional",
    ]);

    match cli.command {
        Command::Classify(args) => {
            assert!(args.optional);
            assert_eq!(args.message, "Table system.x doesn't exist");
        }
        other => panic!("expected classify command, got {other:?}"),
    }
}

#[test]
fn deps_query_filter_defaults_to_all() {
    let cli = Cli::parse_from(["querycompat", "deps", "--registry", "queries.json"]);

    match cli.command {
        Command::Deps(args) => assert!(args.queries.is_empty()),
        other => panic!("expected deps command, got {other:?}"),
    }
}

#[test]
fn resolve_requires_host_id() {
    let err = Cli::try_parse_from([
        "querycompat",
        "resolve",
        "--registry",
        "queries.json",
        "--catalog",
        "catalog.json",
    ])
    .expect_err("missing --host-id must fail");
    assert_eq!(
        err.kind(),
        clap::error::ErrorKind::MissingRequiredArgument
    );
}
