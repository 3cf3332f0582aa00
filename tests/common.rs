//! Common code for integration tests.
use assert_cmd::cargo_bin_cmd;

/// Path to the demo scenario used by the integration tests
#[allow(dead_code)]
pub const DEMO_MODEL_DIR: &str = "demos/simple";

/// Assert that the program runs successfully with the given arguments
#[allow(dead_code)]
pub fn assert_gridplan_runs(args: &[&str]) {
    cargo_bin_cmd!("gridplan")
        .env("GRIDPLAN_LOG_LEVEL", "off")
        .args(args)
        .assert()
        .success();
}

/// Assert that the program fails with the given arguments
#[allow(dead_code)]
pub fn assert_gridplan_fails(args: &[&str]) {
    cargo_bin_cmd!("gridplan")
        .env("GRIDPLAN_LOG_LEVEL", "off")
        .args(args)
        .assert()
        .failure();
}
