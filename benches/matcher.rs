use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use chic_asserts::analyze::{Diagnostic, Location, Severity};
use chic_asserts::expected::ExpectedDiagnostic;
use chic_asserts::marker::{extract_positions, MarkedFragment};
use chic_asserts::settings::Settings;
use chic_asserts::source::Span;
use chic_asserts::verify::mismatch_report;
use chic_asserts::workspace::Solution;

fn marked_source(classes: usize) -> String {
    let mut text = String::from("namespace Bench;\n");
    for index in 0..classes {
        text.push_str(&format!("class ↓Type{index} {{ }}\n"));
    }
    text
}

fn bench_marker_scan(c: &mut Criterion) {
    let small = marked_source(10);
    let large = marked_source(500);

    c.bench_function("marker/extract_positions/10", |b| {
        b.iter(|| extract_positions(&small));
    });
    c.bench_function("marker/extract_positions/500", |b| {
        b.iter(|| extract_positions(&large));
    });
    c.bench_function("marker/parse/500", |b| {
        b.iter(|| MarkedFragment::parse(&large));
    });
}

fn diagnostics_for(solution: &Solution) -> Vec<Diagnostic> {
    let document = solution
        .documents()
        .next()
        .expect("synthesized solution has a document");
    let text = document.text.as_str();
    let mut diagnostics = Vec::new();
    let mut search = 0;
    while let Some(found) = text[search..].find("Type") {
        let start = search + found;
        let end = start
            + text[start..]
                .find(' ')
                .unwrap_or(text.len() - start);
        diagnostics.push(
            Diagnostic::new("BENCH001", "benchmark diagnostic", Severity::Warning).with_location(
                Location::in_document(document, Span::new(start, end))
                    .expect("span lies on char boundaries"),
            ),
        );
        search = end;
    }
    diagnostics
}

fn bench_matching(c: &mut Criterion) {
    let fragment = MarkedFragment::parse(&marked_source(200));
    let solution = Solution::synthesize(&[fragment.text.as_str()], &Settings::default())
        .expect("synthesis succeeds");
    let actual = diagnostics_for(&solution);
    let expected: Vec<ExpectedDiagnostic> = actual
        .iter()
        .map(ExpectedDiagnostic::from_actual)
        .collect();

    c.bench_function("matcher/existential/200x200", |b| {
        b.iter(|| {
            let matched = actual
                .iter()
                .all(|diagnostic| expected.iter().any(|item| item.matches(diagnostic)));
            assert!(matched);
        });
    });

    let misplaced: Vec<ExpectedDiagnostic> = expected
        .iter()
        .cloned()
        .map(|item| item.at(9999, 1))
        .collect();
    c.bench_function("matcher/mismatch_report/200", |b| {
        b.iter_batched(
            || (misplaced.clone(), actual.clone()),
            |(expected, actual)| mismatch_report(&expected, &actual, &solution),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_marker_scan, bench_matching);
criterion_main!(benches);
