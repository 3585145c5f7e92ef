use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        worker: WorkerOverrides {
            logging: LoggingOverrides {
                log_level: Some("debug".to_string()),
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert!(settings.server.public_base_url.is_none());
    assert!(matches!(settings.logging.format, LogFormat::Json));
    assert_eq!(settings.jobs.max_concurrent.get(), 10);
    assert_eq!(settings.jobs.delivery_attempts.get(), 3);
    assert_eq!(settings.jobs.result_ttl, Duration::from_secs(24 * 3600));
    assert_eq!(settings.jobs.default_estimate, Duration::from_secs(300));
    assert_eq!(settings.genai.max_tokens.get(), 3000);
    assert_eq!(settings.genai.model, "default");
    assert_eq!(settings.limits.max_spec_bytes.get(), 10 * 1024 * 1024);
    assert_eq!(settings.api_rate_limit.max_requests.get(), 100);

    let policy = RetryPolicy::from(&settings.retry);
    assert_eq!(policy, RetryPolicy::default());
}

#[test]
fn cli_json_logging_can_be_disabled() {
    let mut raw = RawSettings::default();
    let overrides = WorkerOverrides {
        logging: LoggingOverrides {
            log_json: Some(false),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_worker_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn rejects_backoff_ceiling_below_initial_delay() {
    let mut raw = RawSettings::default();
    raw.retry.initial_backoff_ms = Some(5_000);
    raw.retry.max_backoff_ms = Some(1_000);

    let err = Settings::from_raw(raw).expect_err("invalid retry");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "retry.max_backoff_ms",
            ..
        }
    ));
}

#[test]
fn rejects_zero_concurrency_and_bad_urls() {
    let mut raw = RawSettings::default();
    raw.jobs.max_concurrent = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "jobs.max_concurrent",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.genai.endpoint_url = Some("ftp://models.internal".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "genai.endpoint_url",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.genai.temperature = Some(3.5);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn public_base_url_drops_trailing_slash() {
    let mut raw = RawSettings::default();
    raw.server.public_base_url = Some("https://docs.example.com/".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.server.public_base_url.as_deref(),
        Some("https://docs.example.com")
    );
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["specdoc"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_worker_arguments() {
    let args = CliArgs::parse_from([
        "specdoc",
        "worker",
        "--database-url",
        "postgres://example",
        "--jobs-max-concurrent",
        "4",
    ]);

    match args.command.expect("worker command") {
        Command::Worker(worker) => {
            assert_eq!(
                worker.overrides.database.database_url.as_deref(),
                Some("postgres://example")
            );
            assert_eq!(worker.overrides.jobs_max_concurrent, Some(4));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_purge_arguments() {
    let args = CliArgs::parse_from(["specdoc", "purge", "--older-than-hours", "48"]);

    match args.command.expect("purge command") {
        Command::Purge(purge) => assert_eq!(purge.older_than_hours, Some(48)),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "specdoc",
        "serve",
        "--server-host",
        "127.0.0.1",
        "--database-url",
        "postgres://override",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("127.0.0.1"));
            assert_eq!(
                serve.overrides.worker.database.database_url.as_deref(),
                Some("postgres://override")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
#[serial_test::serial]
fn config_file_is_layered_under_environment_and_cli() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("specdoc.toml");
    std::fs::write(
        &path,
        "[server]\nport = 9100\n\n[jobs]\nmax_concurrent = 4\nresult_ttl_hours = 48\n",
    )
    .expect("write config file");

    // SAFETY: env access is serialised by `#[serial]`.
    unsafe { std::env::set_var("SPECDOC__JOBS__MAX_CONCURRENT", "6") };

    let cli = CliArgs::parse_from([
        "specdoc".to_string(),
        "--config-file".to_string(),
        path.display().to_string(),
        "serve".to_string(),
        "--server-port".to_string(),
        "9200".to_string(),
    ]);
    let result = load(&cli);

    unsafe { std::env::remove_var("SPECDOC__JOBS__MAX_CONCURRENT") };

    let settings = result.expect("layered settings");
    assert_eq!(settings.server.addr.port(), 9200);
    assert_eq!(settings.jobs.max_concurrent.get(), 6);
    assert_eq!(settings.jobs.result_ttl, Duration::from_secs(48 * 3600));
}

#[test]
#[serial_test::serial]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.toml");

    let cli = CliArgs::parse_from([
        "specdoc".to_string(),
        "--config-file".to_string(),
        path.display().to_string(),
    ]);
    assert!(load(&cli).is_err());
}
