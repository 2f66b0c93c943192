use criterion::{black_box, criterion_group, criterion_main, Criterion};

use practicum_core::payload::{parse_evaluation, parse_questions};
use practicum_core::traits::extract_json_payload;

fn question_array(n: usize) -> String {
    let items: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"text": "Question {i}: explain borrowing", "type": "technical",
"category": "Rust", "difficulty": "intermediate",
"sampleAnswer": "References without ownership.", "explanation": "Core concept.",
"links": ["https://doc.rust-lang.org/book/ch04-02-references-and-borrowing.html"]}}"#
            )
        })
        .collect();
    format!("[{}]", items.join(",\n"))
}

fn bench_extract_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_json_payload");

    let fenced = format!("Here you go:\n\n```json\n{}\n```\nGood luck!", question_array(5));
    let prose = format!("Sure! {} Let me know if you need more.", question_array(5));
    let bare = question_array(5);

    group.bench_function("fenced", |b| {
        b.iter(|| extract_json_payload(black_box(&fenced)))
    });

    group.bench_function("prose", |b| {
        b.iter(|| extract_json_payload(black_box(&prose)))
    });

    group.bench_function("bare", |b| {
        b.iter(|| extract_json_payload(black_box(&bare)))
    });

    group.finish();
}

fn bench_parse_questions(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_questions");

    let small = question_array(5);
    let large = question_array(100);
    let wrapped = format!(r#"{{"questions": {}}}"#, question_array(20));

    group.bench_function("5_questions", |b| {
        b.iter(|| parse_questions(black_box(&small)))
    });

    group.bench_function("100_questions", |b| {
        b.iter(|| parse_questions(black_box(&large)))
    });

    group.bench_function("wrapped_20", |b| {
        b.iter(|| parse_questions(black_box(&wrapped)))
    });

    group.finish();
}

fn bench_parse_evaluation(c: &mut Criterion) {
    let response = r#"```json
{
  "score": 72,
  "assessedProficiency": "advanced",
  "categoryScores": {"Rust": 80, "SQL": 64},
  "typeScores": {"technical": 75, "behavioral": 68},
  "feedback": "Solid fundamentals.",
  "recommendations": ["Review query planning."]
}
```"#;

    c.bench_function("parse_evaluation", |b| {
        b.iter(|| parse_evaluation(black_box(response)))
    });
}

criterion_group!(
    benches,
    bench_extract_payload,
    bench_parse_questions,
    bench_parse_evaluation
);
criterion_main!(benches);
