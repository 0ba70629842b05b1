//! Process-level tests for the `weft-demo` binary.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::{contains, is_empty};
use rstest::rstest;

#[test]
fn encode_prints_base64() {
    let mut command = cargo_bin_cmd!("weft-demo");
    command.args(["encode", "Hello World!"]);
    command
        .assert()
        .success()
        .stdout("SGVsbG8gV29ybGQh\n")
        .stderr(is_empty());
}

#[test]
fn decode_reverses_encode() {
    let mut command = cargo_bin_cmd!("weft-demo");
    command.args(["decode", "SGVsbG8gV29ybGQh"]);
    command.assert().success().stdout("Hello World!\n");
}

#[rstest]
#[case(&["encode", "???"], "Pz8/\n")]
#[case(&["encode", "--url-safe", "???"], "Pz8_\n")]
#[case(&["decode", "-u", "Pz8_"], "???\n")]
fn url_safe_alphabet_is_selectable(#[case] args: &[&str], #[case] expected: &str) {
    let mut command = cargo_bin_cmd!("weft-demo");
    command.args(args);
    command.assert().success().stdout(expected.to_owned());
}

#[test]
fn invalid_input_goes_through_the_exception_handler() {
    let mut command = cargo_bin_cmd!("weft-demo");
    command.args(["decode", "%%%"]);
    command
        .assert()
        .code(1)
        .stdout(is_empty())
        .stderr(contains("error: '%%%' is not valid Base64"));
}

#[test]
fn missing_command_is_reported() {
    let mut command = cargo_bin_cmd!("weft-demo");
    command
        .assert()
        .code(1)
        .stderr(contains("Required command was not provided."));
}

#[rstest]
#[case(&["--help"], "encode")]
#[case(&["encode", "--help"], "Text to encode")]
#[case(&["--version"], env!("CARGO_PKG_VERSION"))]
fn help_and_version_print_to_stdout(#[case] args: &[&str], #[case] expected: &str) {
    let mut command = cargo_bin_cmd!("weft-demo");
    command.args(args);
    command.assert().success().stdout(contains(expected));
}

#[test]
fn unknown_options_are_usage_errors() {
    let mut command = cargo_bin_cmd!("weft-demo");
    command.args(["encode", "--wrap", "x"]);
    command.assert().code(2).stderr(contains("--wrap"));
}

#[rstest]
#[case(&["--verbose", "encode", "x"])]
#[case(&["encode", "-v", "x"])]
fn verbose_is_accepted_at_any_level(#[case] args: &[&str]) {
    let mut command = cargo_bin_cmd!("weft-demo");
    command.args(args);
    command
        .assert()
        .success()
        .stdout("eA==\n")
        .stderr(contains("running weft-demo encode"));
}

#[test]
fn json_logs_can_be_selected_from_the_environment() {
    let mut command = cargo_bin_cmd!("weft-demo");
    command
        .env("WEFT_LOG_FORMAT", "json")
        .env("WEFT_LOG_FILTER", "debug")
        .args(["encode", "x"]);
    command
        .assert()
        .success()
        .stdout("eA==\n")
        .stderr(contains(r#""message":"dispatching""#));
}

#[test]
fn invalid_log_format_stops_startup() {
    let mut command = cargo_bin_cmd!("weft-demo");
    command.env("WEFT_LOG_FORMAT", "yaml").args(["encode", "x"]);
    command
        .assert()
        .failure()
        .stdout(is_empty())
        .stderr(contains("failed to load configuration").and(contains("yaml")));
}
