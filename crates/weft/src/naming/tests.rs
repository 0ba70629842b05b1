//! Unit tests for name resolution.

use rstest::rstest;

use super::*;

#[rstest]
#[case("HelloWorld", "hello-world")]
#[case("encode", "encode")]
#[case("createItem", "create-item")]
#[case("HTTPServer", "httpserver")]
#[case("parseHTTPHeader", "parse-httpheader")]
#[case("Base64Encode", "base64encode")]
#[case("already-kebab", "already-kebab")]
fn kebab_case_only_splits_lower_to_upper(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(kebab_case(input), expected);
}

#[test]
fn member_name_without_underscore_is_kebab_cased() {
    let resolved = resolve_command_name(None, "HelloWorld", false).expect("resolve name");
    assert_eq!(resolved.segments, vec![String::from("hello-world")]);
    assert!(!resolved.is_root_candidate);
}

#[test]
fn underscore_separates_path_segments_before_kebab_casing() {
    let resolved = resolve_command_name(None, "order_createItem", false).expect("resolve name");
    assert_eq!(
        resolved.segments,
        vec![String::from("order"), String::from("create-item")]
    );
}

#[test]
fn explicit_names_are_verbatim() {
    let resolved = resolve_command_name(Some("MixedCase"), "ignored", true).expect("resolve name");
    assert_eq!(resolved.segments, vec![String::from("MixedCase")]);
    assert!(
        !resolved.is_root_candidate,
        "explicitly named commands are never promoted to root"
    );
}

#[test]
fn explicit_names_with_whitespace_form_a_path() {
    let resolved =
        resolve_command_name(Some("order  create"), "ignored", false).expect("resolve name");
    assert_eq!(
        resolved.segments,
        vec![String::from("order"), String::from("create")]
    );
}

#[test]
fn sole_unnamed_command_is_a_root_candidate() {
    let resolved = resolve_command_name(None, "Run", true).expect("resolve name");
    assert!(resolved.is_root_candidate);
}

#[rstest]
#[case(Some("   "), "member")]
#[case(None, "order__create")]
#[case(None, "_leading")]
fn blank_segments_are_rejected(#[case] explicit: Option<&str>, #[case] member: &str) {
    let error = resolve_command_name(explicit, member, false).expect_err("name should fail");
    assert!(matches!(error, ConfigError::InvalidName { .. }));
}

#[rstest]
#[case(None, "maxCount", "max-count")]
#[case(Some("Count"), "maxCount", "Count")]
#[case(Some("--already"), "ignored", "--already")]
fn symbol_names_follow_the_same_rule(
    #[case] explicit: Option<&str>,
    #[case] member: &str,
    #[case] expected: &str,
) {
    assert_eq!(
        resolve_symbol_name(explicit, member).expect("resolve symbol"),
        expected
    );
}

#[test]
fn blank_symbol_names_are_rejected() {
    assert!(resolve_symbol_name(Some("--"), "x").is_err());
    assert!(resolve_symbol_name(None, "  ").is_err());
}

#[rstest]
#[case("v", "-v")]
#[case("x", "-x")]
#[case("verbose", "--verbose")]
#[case("-v", "-v")]
#[case("--verbose", "--verbose")]
#[case("-long", "-long")]
fn dash_prefix_follows_length_rule(#[case] name: &str, #[case] expected: &str) {
    assert_eq!(apply_dash_prefix(name), expected);
}

#[test]
fn bare_name_strips_any_prefix() {
    assert_eq!(bare_name("--verbose"), "verbose");
    assert_eq!(bare_name("-v"), "v");
    assert_eq!(bare_name("input"), "input");
}
