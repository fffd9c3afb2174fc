use super::*;

use crate::application::auth::ConfiguredEditors;

#[test]
fn defaults_match_the_news_site() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.news.site_title, "GoodNews");
    assert_eq!(settings.news.list_page_size.get(), 1);
    assert_eq!(settings.news.search_page_size.get(), 10);
    assert_eq!(settings.auth.cookie_name, "goodnews_session");
    assert_eq!(settings.auth.session_ttl, Duration::from_secs(1_209_600));
    assert!(settings.auth.editors.is_empty());
    assert!(settings.database.url.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.news.list_page_size = Some(5);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        news_list_page_size: Some(20),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.news.list_page_size.get(), 20);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_page_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.news.search_page_size = Some(0);

    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "news.search_page_size"),
        other => panic!("expected invalid page size, got {other:?}"),
    }
}

#[test]
fn blank_database_url_is_treated_as_missing() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn editors_are_decoded_from_hex_digests() {
    let mut raw = RawSettings::default();
    raw.auth.editors = vec![RawEditorSettings {
        username: " editor ".to_string(),
        password_sha256: ConfiguredEditors::digest_hex("hunter2"),
    }];

    let settings = Settings::from_raw(raw).expect("valid settings");
    let editor = &settings.auth.editors[0];
    assert_eq!(editor.username, "editor");
    assert_eq!(editor.password_sha256, ConfiguredEditors::digest("hunter2"));
}

#[test]
fn malformed_editor_digest_is_rejected() {
    let mut raw = RawSettings::default();
    raw.auth.editors = vec![RawEditorSettings {
        username: "editor".to_string(),
        password_sha256: "abcd".to_string(),
    }];

    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "auth.editors.password_sha256"),
        other => panic!("expected invalid digest, got {other:?}"),
    }
}

#[test]
fn session_ttl_must_fit_within_a_year() {
    let mut raw = RawSettings::default();
    raw.auth.session_ttl_seconds = Some(u64::MAX);
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "auth.session_ttl_seconds"),
        other => panic!("expected invalid ttl, got {other:?}"),
    }

    let mut raw = RawSettings::default();
    raw.auth.session_ttl_seconds = Some(MAX_SESSION_TTL_SECS);
    let settings = Settings::from_raw(raw).expect("year-long ttl");
    assert_eq!(
        settings.auth.session_ttl,
        Duration::from_secs(MAX_SESSION_TTL_SECS)
    );
}

#[test]
fn cookie_name_must_be_a_token() {
    let mut raw = RawSettings::default();
    raw.auth.cookie_name = Some("bad name;".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["goodnews"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "goodnews",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--news-search-page-size",
        "25",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(serve.overrides.news_search_page_size, Some(25));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_categories_add_arguments() {
    let args = CliArgs::parse_from([
        "goodnews",
        "categories",
        "--database-url",
        "postgres://example",
        "add",
        "World",
    ]);

    match args.command.expect("categories command") {
        Command::Categories(categories) => {
            assert_eq!(
                categories.database.database_url.as_deref(),
                Some("postgres://example")
            );
            match categories.command {
                CategoriesCommand::Add { name } => assert_eq!(name, "World"),
                CategoriesCommand::List => panic!("wrong subcommand parsed"),
            }
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_hash_password_arguments() {
    let args = CliArgs::parse_from(["goodnews", "hash-password", "s3cret"]);
    match args.command.expect("hash-password command") {
        Command::HashPassword(hash) => assert_eq!(hash.password, "s3cret"),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn hash_password_runs_without_loadable_settings() {
    let args = CliArgs::try_parse_from([
        "goodnews",
        "--config-file",
        "/nonexistent/goodnews.toml",
        "hash-password",
        "s3cret",
    ])
    .expect("parse hash-password");

    assert!(load(&args).is_err());
    let command = args.command.expect("hash-password command");
    assert!(!command.needs_settings());
    assert!(Command::Serve(Box::default()).needs_settings());
}
