// tests/config_behaviour.rs

use taskpen::config::model::ConfigFile;
use taskpen::config::validate::validate_config;
use taskpen::task::Task;

fn parse(text: &str) -> ConfigFile {
    toml::from_str(text).expect("config should parse")
}

#[test]
fn full_config_parses_and_validates() {
    let cfg = parse(
        r#"
        [session]
        name = "dev"

        [task.server]
        argv = ["python3", "-m", "http.server"]
        cwd = "web"

        [task.server.env]
        PORT = "8080"

        [task.rebuild]
        watch = "src"
        recursive = true
        delay = 0.5
        force_once = true
        argv = ["make", "all"]
        "#,
    );

    validate_config(&cfg).unwrap();

    assert_eq!(cfg.session.name.as_deref(), Some("dev"));
    assert_eq!(cfg.task.len(), 2);

    let server = &cfg.task["server"];
    assert!(!server.is_watch());
    assert_eq!(server.argv, ["python3", "-m", "http.server"]);
    assert_eq!(server.cwd.as_deref(), Some("web"));
    assert_eq!(server.env["PORT"], "8080");

    let rebuild = &cfg.task["rebuild"];
    assert!(rebuild.is_watch());
    assert_eq!(rebuild.watch.as_deref(), Some("src"));
    assert!(rebuild.recursive);
    assert_eq!(rebuild.delay, Some(0.5));
    assert!(rebuild.force_once);
}

#[test]
fn minimal_task_uses_defaults() {
    let cfg = parse(
        r#"
        [task.lint]
        argv = ["cargo", "clippy"]
        "#,
    );
    validate_config(&cfg).unwrap();

    let lint = &cfg.task["lint"];
    assert!(lint.cwd.is_none());
    assert!(lint.env.is_empty());
    assert!(!lint.is_watch());
    assert!(!lint.recursive);
    assert!(lint.delay.is_none());
    assert!(!lint.force_once);
}

#[test]
fn empty_config_is_rejected() {
    let cfg = parse("");
    let err = validate_config(&cfg).unwrap_err();
    assert!(err.to_string().contains("at least one"), "{err}");
}

#[test]
fn empty_argv_is_rejected() {
    let cfg = parse(
        r#"
        [task.bad]
        argv = []
        "#,
    );
    let err = validate_config(&cfg).unwrap_err();
    assert!(err.to_string().contains("empty `argv`"), "{err}");
}

#[test]
fn empty_argv_element_is_rejected() {
    let cfg = parse(
        r#"
        [task.bad]
        argv = ["make", ""]
        "#,
    );
    let err = validate_config(&cfg).unwrap_err();
    assert!(err.to_string().contains("empty string"), "{err}");
}

#[test]
fn non_positive_delay_is_rejected() {
    let cfg = parse(
        r#"
        [task.bad]
        watch = "src"
        delay = 0.0
        argv = ["make"]
        "#,
    );
    let err = validate_config(&cfg).unwrap_err();
    assert!(err.to_string().contains("invalid `delay`"), "{err}");
}

#[test]
fn watch_only_keys_require_a_watch_path() {
    for snippet in [
        "delay = 2.0",
        "recursive = true",
        "force_once = true",
    ] {
        let cfg = parse(&format!(
            r#"
            [task.bad]
            argv = ["make"]
            {snippet}
            "#
        ));
        let err = validate_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("no `watch` path"), "{err}");
    }
}

#[test]
fn build_session_creates_one_task_per_entry() {
    let cfg = parse(
        r#"
        [task.server]
        argv = ["python3", "-m", "http.server"]

        [task.rebuild]
        watch = "src"
        argv = ["make", "all"]
        "#,
    );
    validate_config(&cfg).unwrap();

    let session = taskpen::build_session(&cfg);
    let names: Vec<&str> = session.tasks().map(|task| task.name()).collect();
    assert_eq!(names, ["rebuild", "server"]);

    let rebuild = session
        .tasks()
        .find(|task| task.name() == "rebuild")
        .unwrap();
    let actions: Vec<String> = rebuild
        .actions()
        .into_iter()
        .map(|a| a.name().to_string())
        .collect();
    assert_eq!(actions, ["Trigger"]);

    let server = session
        .tasks()
        .find(|task| task.name() == "server")
        .unwrap();
    let actions: Vec<String> = server
        .actions()
        .into_iter()
        .map(|a| a.name().to_string())
        .collect();
    assert_eq!(actions, ["Stop", "Restart"]);
}
