use std::collections::BTreeSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use examprep_core::model::{AnswerKey, Question, QuestionKind, SubmittedAnswer};
use examprep_core::scoring::{evaluate, partial_credit};

fn options(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("option {i}")).collect()
}

fn bench_partial_credit(c: &mut Criterion) {
    let mut group = c.benchmark_group("partial_credit");

    group.bench_function("hit=1,n=4", |b| {
        b.iter(|| partial_credit(black_box(1), black_box(4)))
    });

    group.bench_function("hit=3,n=4", |b| {
        b.iter(|| partial_credit(black_box(3), black_box(4)))
    });

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    let single = Question::new("s", "single", options(4), AnswerKey::SingleCorrect(2), 5).unwrap();
    let multiple = Question::new(
        "m",
        "multiple",
        options(6),
        AnswerKey::MultipleCorrect(BTreeSet::from([1, 3, 5])),
        5,
    )
    .unwrap();
    let numerical = Question::new("n", "numerical", vec![], AnswerKey::Numerical(9.81), 5).unwrap();

    group.bench_function("single_correct", |b| {
        let answer = SubmittedAnswer::Single(2);
        b.iter(|| evaluate(black_box(&single), black_box(&answer)))
    });

    group.bench_function("multiple_partial", |b| {
        let answer = SubmittedAnswer::Multiple(BTreeSet::from([1, 3]));
        b.iter(|| evaluate(black_box(&multiple), black_box(&answer)))
    });

    group.bench_function("numerical", |b| {
        let answer = SubmittedAnswer::Numerical("9.815".into());
        b.iter(|| evaluate(black_box(&numerical), black_box(&answer)))
    });

    group.bench_function("parse_and_evaluate", |b| {
        b.iter(|| {
            let answer =
                SubmittedAnswer::parse("m", QuestionKind::MultipleCorrect, black_box("1, 3 5"))
                    .unwrap();
            evaluate(&multiple, &answer)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_partial_credit, bench_evaluate);
criterion_main!(benches);
