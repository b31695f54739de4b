//! Execution-path policy matrix
//!
//! The policy in one table: containers whenever an engine is live, native
//! only with privileges, manual otherwise, with forced engines and --native
//! overriding the automatic choice.

use yare::parameterized;

use webp_migrator::detection::{Engine, EnvironmentInfo, ExecutionPath, OsKind};

fn env(engines: &[Engine], elevated: bool) -> EnvironmentInfo {
    EnvironmentInfo {
        os: OsKind::Linux,
        distro: Some("Ubuntu 24.04".to_string()),
        engines: engines.to_vec(),
        package_manager: None,
        elevated,
    }
}

#[parameterized(
    both_engines = { &[Engine::Docker, Engine::Podman], false, ExecutionPath::Container(Engine::Docker) },
    podman_only = { &[Engine::Podman], false, ExecutionPath::Container(Engine::Podman) },
    engine_beats_privileges = { &[Engine::Docker], true, ExecutionPath::Container(Engine::Docker) },
    no_engine_elevated = { &[], true, ExecutionPath::NativePrivileged },
    no_engine_unprivileged = { &[], false, ExecutionPath::Manual },
)]
fn auto_path(engines: &[Engine], elevated: bool, expected: ExecutionPath) {
    assert_eq!(env(engines, elevated).execution_path(None, false), expected);
}

#[parameterized(
    forced_live = { &[Engine::Docker, Engine::Podman], Engine::Podman, ExecutionPath::Container(Engine::Podman) },
    forced_dead = { &[Engine::Docker], Engine::Podman, ExecutionPath::Manual },
    forced_none_live = { &[], Engine::Docker, ExecutionPath::Manual },
)]
fn forced_engine(engines: &[Engine], forced: Engine, expected: ExecutionPath) {
    assert_eq!(
        env(engines, false).execution_path(Some(forced), false),
        expected
    );
}

#[parameterized(
    native_elevated = { true, ExecutionPath::NativePrivileged },
    native_unprivileged = { false, ExecutionPath::Manual },
)]
fn forced_native_ignores_engines(elevated: bool, expected: ExecutionPath) {
    // A live engine must not win over an explicit --native
    assert_eq!(
        env(&[Engine::Docker], elevated).execution_path(None, true),
        expected
    );
}
