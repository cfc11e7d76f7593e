//! Benchmarks for normalization, pagination and search.
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use folio::import::{ContentUnit, ImportedBook, UnitBody};
use folio::markup::normalize;
use folio::search::search;
use folio::{Document, EngineConfig, Format, Page, Paginator};

const SENTENCE: &str = "It was the best of times, it was the worst of times, it was the age of wisdom. ";

/// A chapter of `paragraphs` paragraphs with inline markup and one unclosed element.
fn sample_chapter(paragraphs: usize) -> String {
    let mut html = String::from("<h1>Chapter</h1>\n");
    for i in 0..paragraphs {
        html.push_str("<p>");
        html.push_str(&SENTENCE.repeat(4));
        if i % 3 == 0 {
            html.push_str("<em>emphasis <b>nested</em> text</b>");
        }
        html.push_str("</p>\n");
    }
    html.push_str("<div><p>never closed");
    html
}

fn sample_book(chapters: usize) -> ImportedBook {
    ImportedBook {
        units: (0..chapters)
            .map(|i| ContentUnit {
                href: format!("text/chapter{i:02}.xhtml"),
                title: None,
                body: UnitBody::Markup(sample_chapter(40)),
            })
            .collect(),
        ..ImportedBook::default()
    }
}

fn bench_normalize(c: &mut Criterion) {
    let chapter = sample_chapter(200);
    c.bench_function("normalize", |b| {
        b.iter(|| normalize(black_box(&chapter)));
    });
}

fn bench_paginate_markup(c: &mut Criterion) {
    let chapter = sample_chapter(200);
    let paginator = Paginator::default();
    c.bench_function("paginate_markup", |b| {
        b.iter(|| paginator.paginate_markup(black_box(&chapter)));
    });
}

fn bench_paginate_text(c: &mut Criterion) {
    let text = format!("{}\n\n", SENTENCE.repeat(6)).repeat(300);
    let paginator = Paginator::default();
    c.bench_function("paginate_text", |b| {
        b.iter(|| paginator.paginate_text(black_box(&text)));
    });
}

fn bench_document(c: &mut Criterion) {
    let config = EngineConfig::default();
    c.bench_function("document_from_imported", |b| {
        b.iter(|| Document::from_imported(Format::Epub, black_box(sample_book(20)), &config));
    });
}

fn bench_search(c: &mut Criterion) {
    let pages: Vec<Page> = Paginator::default()
        .paginate_markup(&sample_chapter(400))
        .into_iter()
        .enumerate()
        .map(|(i, markup)| Page::new(i, markup))
        .collect();
    c.bench_function("search", |b| {
        b.iter(|| search(black_box(&pages), black_box("Worst of Times")));
    });
}

criterion_group!(
    benches,
    bench_normalize,
    bench_paginate_markup,
    bench_paginate_text,
    bench_document,
    bench_search,
);

criterion_main!(benches);
