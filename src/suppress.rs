//! Suppressor contract and the two-pass suppression runner. A baseline pass
//! without the suppressor proves the target diagnostics actually fire; only
//! then is the suppressor's effect checked.

use crate::analyze::{self, Diagnostic};
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::workspace::{Document, Solution};

/// Static description of one suppression a suppressor can apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuppressionDescriptor {
    /// Id of the suppression itself.
    pub id: &'static str,
    /// Id of the diagnostic being suppressed.
    pub suppressed_id: &'static str,
    pub justification: &'static str,
}

/// A pluggable component that marks previously reported diagnostics as
/// suppressed under specific conditions.
pub trait Suppressor {
    fn suppressions(&self) -> &[SuppressionDescriptor];

    fn report_suppressions(&self, ctx: &mut SuppressionContext<'_>);
}

/// Per-document callback context: the candidate diagnostics (those whose id
/// the suppressor declared) and the document they were reported in.
pub struct SuppressionContext<'a> {
    document: &'a Document,
    candidates: Vec<Diagnostic>,
    suppressed: Vec<(usize, &'static str)>,
    violations: Vec<String>,
}

impl<'a> SuppressionContext<'a> {
    #[must_use]
    pub fn document(&self) -> &Document {
        self.document
    }

    #[must_use]
    pub fn candidates(&self) -> &[Diagnostic] {
        &self.candidates
    }

    /// Mark one candidate as suppressed with the descriptor's justification.
    pub fn suppress(&mut self, index: usize, descriptor: &SuppressionDescriptor) {
        let Some(candidate) = self.candidates.get(index) else {
            self.violations
                .push(format!("suppression index {index} is out of range"));
            return;
        };
        if candidate.id != descriptor.suppressed_id {
            self.violations.push(format!(
                "suppression `{}` targets `{}` but was applied to `{}`",
                descriptor.id, descriptor.suppressed_id, candidate.id
            ));
            return;
        }
        self.suppressed.push((index, descriptor.justification));
    }
}

/// The compiler diagnostic set with the suppressor applied.
pub fn run(
    suppressor: &dyn Suppressor,
    solution: &Solution,
    settings: &Settings,
) -> Result<Vec<Diagnostic>> {
    let suppressible: Vec<&str> = suppressor
        .suppressions()
        .iter()
        .map(|descriptor| descriptor.suppressed_id)
        .collect();
    let mut diagnostics = analyze::flatten(analyze::compiler_diagnostics(solution, settings)?);
    for document in solution.documents() {
        let candidate_indices: Vec<usize> = diagnostics
            .iter()
            .enumerate()
            .filter(|(_, diagnostic)| {
                suppressible.contains(&diagnostic.id.as_str())
                    && diagnostic
                        .location
                        .as_ref()
                        .is_some_and(|location| location.path == document.path)
            })
            .map(|(index, _)| index)
            .collect();
        if candidate_indices.is_empty() {
            continue;
        }
        let mut ctx = SuppressionContext {
            document,
            candidates: candidate_indices
                .iter()
                .map(|index| diagnostics[*index].clone())
                .collect(),
            suppressed: Vec::new(),
            violations: Vec::new(),
        };
        suppressor.report_suppressions(&mut ctx);
        if let Some(violation) = ctx.violations.first() {
            return Err(Error::setup(violation.clone()));
        }
        for (local, justification) in ctx.suppressed {
            let global = candidate_indices[local];
            diagnostics[global].suppression = Some(justification.to_string());
        }
    }
    Ok(diagnostics)
}

/// The unsuppressed baseline, failing when any declared target id never
/// fires: a suppressor that "suppresses" a diagnostic that was never going
/// to be produced proves nothing.
pub fn baseline(
    suppressor: &dyn Suppressor,
    solution: &Solution,
    settings: &Settings,
) -> Result<Vec<Diagnostic>> {
    let diagnostics = analyze::flatten(analyze::compiler_diagnostics(solution, settings)?);
    for descriptor in suppressor.suppressions() {
        if !diagnostics
            .iter()
            .any(|diagnostic| diagnostic.id == descriptor.suppressed_id)
        {
            return Err(Error::assertion(format!(
                "`{}` was never produced by the baseline pass without the suppressor; \
                 there is nothing for `{}` to suppress.",
                descriptor.suppressed_id, descriptor.id
            )));
        }
    }
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPRESS_TRAILING: SuppressionDescriptor = SuppressionDescriptor {
        id: "SUP0001",
        suppressed_id: "CHC0002",
        justification: "trailing whitespace is tolerated after an ok-marker",
    };

    /// Suppresses trailing-whitespace warnings on lines ending in `// ok`.
    struct OkMarkerSuppressor;

    impl Suppressor for OkMarkerSuppressor {
        fn suppressions(&self) -> &[SuppressionDescriptor] {
            std::slice::from_ref(&SUPPRESS_TRAILING)
        }

        fn report_suppressions(&self, ctx: &mut SuppressionContext<'_>) {
            let flagged: Vec<usize> = ctx
                .candidates()
                .iter()
                .enumerate()
                .filter(|(_, diagnostic)| {
                    diagnostic.location.as_ref().is_some_and(|location| {
                        ctx.document()
                            .text
                            .line(location.start.line)
                            .is_some_and(|line| line.trim_end().ends_with("// ok"))
                    })
                })
                .map(|(index, _)| index)
                .collect();
            for index in flagged {
                ctx.suppress(index, &SUPPRESS_TRAILING);
            }
        }
    }

    fn solution(code: &str) -> Solution {
        Solution::synthesize(&[code], &Settings::default()).expect("synthesis")
    }

    #[test]
    fn baseline_requires_the_target_to_fire() {
        let clean = solution("class C\n{\n}\n");
        let err = baseline(&OkMarkerSuppressor, &clean, &Settings::default()).unwrap_err();
        assert!(err.is_assertion());
        assert!(
            err.to_string().contains("never produced by the baseline"),
            "{err}"
        );
    }

    #[test]
    fn run_marks_matching_candidates_suppressed() {
        // Two trailing-whitespace warnings; only the ok-marked line is
        // suppressed. The extra text after the whitespace keeps the marker
        // line flagged.
        let code = "class C\n{\n    int x; // ok \n    int y; \n}\n";
        let solution = solution(code);
        baseline(&OkMarkerSuppressor, &solution, &Settings::default())
            .expect("the target fires in the baseline");
        let diagnostics =
            run(&OkMarkerSuppressor, &solution, &Settings::default()).expect("run succeeds");
        let trailing: Vec<&Diagnostic> = diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.id == "CHC0002")
            .collect();
        assert_eq!(trailing.len(), 2);
        let suppressed: Vec<bool> = trailing
            .iter()
            .map(|diagnostic| diagnostic.is_suppressed())
            .collect();
        assert_eq!(
            suppressed,
            vec![true, false],
            "only the ok-marked line is suppressed: {trailing:?}"
        );
    }

    #[test]
    fn suppressing_a_foreign_id_is_a_setup_error() {
        struct WrongTarget;
        const WRONG: SuppressionDescriptor = SuppressionDescriptor {
            id: "SUP0002",
            suppressed_id: "CHC0001",
            justification: "unused",
        };

        impl Suppressor for WrongTarget {
            fn suppressions(&self) -> &[SuppressionDescriptor] {
                // Declares CHC0002 as suppressible but applies a CHC0001
                // descriptor to it.
                std::slice::from_ref(&SUPPRESS_TRAILING)
            }

            fn report_suppressions(&self, ctx: &mut SuppressionContext<'_>) {
                if !ctx.candidates().is_empty() {
                    ctx.suppress(0, &WRONG);
                }
            }
        }

        let code = "class C\n{\n    int x; \n}\n";
        let err = run(&WrongTarget, &solution(code), &Settings::default()).unwrap_err();
        assert!(err.is_setup(), "{err}");
        assert!(err.to_string().contains("SUP0002"), "{err}");
    }
}
