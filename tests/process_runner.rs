//! Real child processes: environment handling, timeouts and spawn failures.
#![cfg(unix)]

use std::collections::BTreeMap;
use std::time::Duration;

use readiness_launcher::config::{parse_config, EnvironmentConfig};
use readiness_launcher::error::{EXIT_NOT_FOUND, EXIT_TIMED_OUT};
use readiness_launcher::exec::{CommandRunner, CommandSpec, Environment, ExecError, ProcessRunner};
use readiness_launcher::lifecycle::Launcher;
use readiness_launcher::ServiceChain;

fn shell(script: &str) -> CommandSpec {
    CommandSpec::new("/bin/sh").args(["-c", script])
}

fn environment(isolate: bool) -> Environment {
    let config = EnvironmentConfig {
        isolate,
        ..EnvironmentConfig::default()
    };
    Environment::from_vars(
        [
            ("PATH", "/usr/bin:/bin"),
            ("TANGO_HOST", "databaseds:10000"),
            ("SECRET_TOKEN", "hunter2"),
        ],
        &config,
    )
    .unwrap()
}

#[tokio::test]
async fn test_passthrough_variables_reach_the_child() {
    let output = ProcessRunner
        .run(&shell("echo \"$TANGO_HOST\""), &environment(false))
        .await
        .unwrap();

    assert!(output.success());
    assert_eq!(output.stdout.trim(), "databaseds:10000");
}

#[tokio::test]
async fn test_isolated_environment_drops_everything_else() {
    let script = "echo \"${SECRET_TOKEN:-unset} $TANGO_HOST $INSTANCE\"";
    let mut spec = shell(script);
    spec.env = BTreeMap::from([("INSTANCE".to_string(), "test".to_string())]);

    let isolated = ProcessRunner.run(&spec, &environment(true)).await.unwrap();
    assert_eq!(isolated.stdout.trim(), "unset databaseds:10000 test");
}

#[tokio::test]
async fn test_isolation_hides_the_launcher_environment() {
    // Set by cargo for test binaries; read only, never modified here.
    let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let spec = shell("echo \"${CARGO_MANIFEST_DIR:-unset}\"");

    let inherited = ProcessRunner.run(&spec, &environment(false)).await.unwrap();
    assert_eq!(inherited.stdout.trim(), manifest_dir);

    let isolated = ProcessRunner.run(&spec, &environment(true)).await.unwrap();
    assert_eq!(isolated.stdout.trim(), "unset");
}

#[tokio::test]
async fn test_exit_code_and_stderr_are_captured() {
    let output = ProcessRunner
        .run(&shell("echo 'DB not reachable' >&2; exit 7"), &environment(false))
        .await
        .unwrap();

    assert_eq!(output.code, Some(7));
    assert_eq!(output.summary(), Some("DB not reachable"));
}

#[tokio::test]
async fn test_command_timeout() {
    let spec = shell("sleep 5").timeout(Duration::from_millis(100));
    let err = ProcessRunner.run(&spec, &environment(false)).await.unwrap_err();
    assert!(matches!(err, ExecError::TimedOut { .. }));
}

#[tokio::test]
async fn test_missing_program() {
    let spec = CommandSpec::new("/nonexistent/readiness-launcher-test-binary");
    let err = ProcessRunner.run(&spec, &environment(false)).await.unwrap_err();
    assert!(matches!(err, ExecError::Spawn { .. }));
}

#[tokio::test]
async fn test_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut spec = shell("pwd");
    spec.cwd = Some(dir.path().to_path_buf());

    let output = ProcessRunner.run(&spec, &environment(false)).await.unwrap();
    let reported = std::fs::canonicalize(output.stdout.trim()).unwrap();
    assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
}

fn launch_chain(toml_src: &str) -> ServiceChain {
    let config = parse_config(toml_src).unwrap();
    ServiceChain::from_config(&config, &environment(false)).unwrap()
}

#[tokio::test]
async fn test_launch_runs_real_commands_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("order.log");
    let log = log.display();

    let chain = launch_chain(&format!(
        r#"
        [retry]
        max_attempts = 3
        delay_ms = 10

        [[services]]
        name = "tangodb"
        probe = {{ kind = "command", program = "/bin/sh", args = ["-c", "true"] }}
        start = {{ program = "/bin/sh", args = ["-c", "echo tangodb >> {log}"] }}

        [[services]]
        name = "databaseds"
        depends_on = "tangodb"
        probe = {{ kind = "command", program = "/bin/sh", args = ["-c", "test -s {log}"] }}
        start = {{ program = "/bin/sh", args = ["-c", "echo databaseds >> {log}"] }}
        "#
    ));

    let launcher = Launcher::new(ProcessRunner, environment(false));
    let report = launcher.launch(&chain).await;

    assert!(report.is_success(), "{:?}", report.error());
    let written = std::fs::read_to_string(dir.path().join("order.log")).unwrap();
    assert_eq!(written.lines().collect::<Vec<_>>(), vec!["tangodb", "databaseds"]);
}

#[tokio::test]
async fn test_launch_exit_codes_for_process_errors() {
    let chain = launch_chain(
        r#"
        [[services]]
        name = "slow"
        start = { program = "/bin/sh", args = ["-c", "sleep 5"], timeout_secs = 1 }
        "#,
    );
    let report = Launcher::new(ProcessRunner, environment(false)).launch(&chain).await;
    assert_eq!(report.exit_code(), EXIT_TIMED_OUT);

    let chain = launch_chain(
        r#"
        [[services]]
        name = "missing"
        start = { program = "/nonexistent/readiness-launcher-test-binary" }
        "#,
    );
    let report = Launcher::new(ProcessRunner, environment(false)).launch(&chain).await;
    assert_eq!(report.exit_code(), EXIT_NOT_FOUND);
}
