//! End-to-end code-fix assertions: single fix, title disambiguation, the
//! after-code comparison, and the no-new-compiler-diagnostics invariant.

mod common;

use chic_asserts::asserts;
use chic_asserts::{AllowedCompilerDiagnostics, Settings};
use common::{EmptyTypeAnalyzer, InsertMemberFix, NoActionFix, SloppyFix, TwoTitleFix};

#[test]
fn a_single_fix_produces_the_expected_code() {
    asserts::code_fix(
        &EmptyTypeAnalyzer,
        &InsertMemberFix,
        &["namespace N;\nclass ↓C { }"],
        &["namespace N;\nclass C { int placeholder; }"],
    )
    .expect("the fix fills in the placeholder member");
}

#[test]
fn wrong_after_code_fails_with_a_line_diff() {
    let err = asserts::code_fix(
        &EmptyTypeAnalyzer,
        &InsertMemberFix,
        &["namespace N;\nclass ↓C { }"],
        &["namespace N;\nclass C { int other; }"],
    )
    .unwrap_err();
    assert!(err.is_assertion());
    let report = err.to_string();
    assert!(report.contains("did not produce the expected code"), "{report}");
    assert!(report.contains("Mismatch on line 2."), "{report}");
    assert!(report.contains("Expected: class C { int other; }"), "{report}");
    assert!(report.contains("Actual:   class C { int placeholder; }"), "{report}");
}

#[test]
fn two_registered_fixes_require_a_title() {
    let err = asserts::code_fix(
        &EmptyTypeAnalyzer,
        &TwoTitleFix,
        &["namespace N;\nclass ↓C { }"],
        &["namespace N;\nclass C { int a; }"],
    )
    .unwrap_err();
    let report = err.to_string();
    assert!(report.contains("pass a fix title to disambiguate"), "{report}");
    assert!(report.contains("  Fix A\n  Fix B"), "{report}");
}

#[test]
fn a_title_picks_among_registered_fixes() {
    asserts::code_fix_with(
        &EmptyTypeAnalyzer,
        &TwoTitleFix,
        &["namespace N;\nclass ↓C { }"],
        &["namespace N;\nclass C { int b; }"],
        Some("Fix B"),
        &Settings::default(),
    )
    .expect("the titled fix applies");

    let err = asserts::code_fix_with(
        &EmptyTypeAnalyzer,
        &TwoTitleFix,
        &["namespace N;\nclass ↓C { }"],
        &["namespace N;\nclass C { int a; }"],
        Some("Fix C"),
        &Settings::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("\"Fix C\""), "{err}");
}

#[test]
fn an_unregistered_fix_is_an_assertion_failure() {
    let err = asserts::code_fix(
        &EmptyTypeAnalyzer,
        &NoActionFix,
        &["namespace N;\nclass ↓C { }"],
        &["namespace N;\nclass C { }"],
    )
    .unwrap_err();
    assert!(err.is_assertion());
    assert!(err.to_string().contains("none was registered"), "{err}");
}

#[test]
fn several_markers_are_caller_misuse_for_a_single_fix() {
    let err = asserts::code_fix(
        &EmptyTypeAnalyzer,
        &InsertMemberFix,
        &["namespace N;\nclass ↓A { }\nclass ↓B { }"],
        &["namespace N;\nclass A { int placeholder; }\nclass B { }"],
    )
    .unwrap_err();
    assert!(err.is_setup());
    assert!(err.to_string().contains("found 2"), "{err}");
}

#[test]
fn new_compiler_diagnostics_fail_the_fix() {
    let err = asserts::code_fix(
        &EmptyTypeAnalyzer,
        &SloppyFix,
        &["namespace N;\nclass ↓C { }"],
        &["namespace N;\nclass C { int x; } \n"],
    )
    .unwrap_err();
    assert!(err.is_assertion());
    let report = err.to_string();
    assert!(report.contains("new compiler diagnostics"), "{report}");
    assert!(report.contains("CHC0002"), "{report}");
}

#[test]
fn multiplying_a_pre_existing_diagnostic_still_fails_the_fix() {
    // One trailing-whitespace warning exists before the fix; the sloppy fix
    // adds a second instance of the same id, which must count as new.
    let err = asserts::code_fix(
        &EmptyTypeAnalyzer,
        &SloppyFix,
        &["namespace N;\nclass ↓C { }\nint z; \n"],
        &["namespace N;\nclass C { int x; } \n\nint z; \n"],
    )
    .unwrap_err();
    assert!(err.is_assertion());
    let report = err.to_string();
    assert!(report.contains("new compiler diagnostics"), "{report}");
    assert!(report.contains("CHC0002"), "{report}");
}

#[test]
fn the_regression_policy_can_be_relaxed() {
    let relaxed = Settings::default()
        .with_allowed_compiler_diagnostics(AllowedCompilerDiagnostics::Warnings);
    asserts::code_fix_with(
        &EmptyTypeAnalyzer,
        &SloppyFix,
        &["namespace N;\nclass ↓C { }"],
        &["namespace N;\nclass C { int x; } \n"],
        None,
        &relaxed,
    )
    .expect("new warnings are tolerated under the relaxed policy");

    let exempted = Settings::default().with_allowed_id("CHC0002");
    asserts::code_fix_with(
        &EmptyTypeAnalyzer,
        &SloppyFix,
        &["namespace N;\nclass ↓C { }"],
        &["namespace N;\nclass C { int x; } \n"],
        None,
        &exempted,
    )
    .expect("explicitly allowed ids are exempt from the regression check");
}

#[test]
fn disjoint_analyzer_and_provider_ids_are_caller_misuse() {
    struct ForeignFix;
    impl chic_asserts::fix::FixProvider for ForeignFix {
        fn fixable_ids(&self) -> &[&'static str] {
            &["OTHER001"]
        }
        fn register_fixes(&self, _ctx: &mut chic_asserts::fix::FixContext<'_>) {}
    }

    let err = asserts::code_fix(
        &EmptyTypeAnalyzer,
        &ForeignFix,
        &["namespace N;\nclass ↓C { }"],
        &["namespace N;\nclass C { }"],
    )
    .unwrap_err();
    assert!(err.is_setup());
    assert!(err.to_string().contains("share no diagnostic id"), "{err}");
}

#[test]
fn no_fix_passes_when_nothing_is_registered() {
    asserts::no_fix(&EmptyTypeAnalyzer, &NoActionFix, &["namespace N;\nclass ↓C { }"])
        .expect("the provider declines to fix this shape");
}

#[test]
fn no_fix_fails_when_an_action_is_registered() {
    let err = asserts::no_fix(
        &EmptyTypeAnalyzer,
        &InsertMemberFix,
        &["namespace N;\nclass ↓C { }"],
    )
    .unwrap_err();
    assert!(err.is_assertion());
    assert!(err.to_string().contains("Add placeholder member"), "{err}");
}
