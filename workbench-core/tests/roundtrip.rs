//! Roundtrip serialisation tests for `workbench-core` types.
//!
//! Each `#[case]` is isolated; no shared state.

use rstest::rstest;
use std::path::PathBuf;

use workbench_core::{AppState, BuildState, Link, LogDirs, Ports, ProjectInfo};

fn minimal_project() -> ProjectInfo {
    ProjectInfo::new("p1", "api", PathBuf::from("/code/api"))
}

fn full_project() -> ProjectInfo {
    let mut info = minimal_project();
    info.links = vec![
        Link::new("p2", "http://p2:9080", "P2_URL"),
        Link::new("p3", "http://p3:3000", "P3_URL"),
    ];
    info.app_status = AppState::Started;
    info.build_status = Some(BuildState::Success);
    info.context_root = "/api".to_string();
    info.ports = Ports {
        internal_port: Some(9080),
        exposed_port: Some(32768),
        ..Ports::default()
    };
    info.ignored_paths = vec!["*/node_modules*".to_string(), "*/.git/*".to_string()];
    info.logs = LogDirs {
        build: Some(PathBuf::from("logs/build")),
        app: Some(PathBuf::from("logs/app")),
    };
    info
}

fn unicode_project() -> ProjectInfo {
    let mut info = ProjectInfo::new("проект-🚀", "アプリ", PathBuf::from("/code/unicode"));
    info.links = vec![Link::new("项目", "http://例え.jp", "UNICODE_URL")];
    info
}

#[rstest]
#[case("minimal", minimal_project())]
#[case("all_fields", full_project())]
#[case("unicode_strings", unicode_project())]
fn project_info_roundtrip(#[case] label: &str, #[case] info: ProjectInfo) {
    let yaml = serde_yaml::to_string(&info)
        .unwrap_or_else(|e| panic!("[{label}] serialize failed: {e}"));
    let back: ProjectInfo = serde_yaml::from_str(&yaml)
        .unwrap_or_else(|e| panic!("[{label}] deserialize failed: {e}"));
    assert_eq!(info, back, "[{label}] roundtrip mismatch");
}

#[rstest]
#[case(AppState::Starting, "starting")]
#[case(AppState::Started, "started")]
#[case(AppState::Stopping, "stopping")]
#[case(AppState::Stopped, "stopped")]
#[case(AppState::Unknown, "unknown")]
fn app_state_wire_names(#[case] state: AppState, #[case] wire: &str) {
    assert_eq!(serde_json::to_value(state).unwrap(), serde_json::Value::from(wire));
    assert_eq!(wire.parse::<AppState>().unwrap(), state);
}

#[rstest]
#[case(BuildState::InProgress, "inProgress")]
#[case(BuildState::Success, "success")]
#[case(BuildState::Failed, "failed")]
#[case(BuildState::BuildRequired, "buildRequired")]
fn build_state_wire_names(#[case] state: BuildState, #[case] wire: &str) {
    assert_eq!(serde_json::to_value(state).unwrap(), serde_json::Value::from(wire));
    assert_eq!(wire.parse::<BuildState>().unwrap(), state);
}
