use criterion::{black_box, criterion_group, criterion_main, Criterion};
use resume_export::{normalize, sanitize, CaptureDriver, Document, ExportConfig};

fn resume_html(sections: usize) -> String {
    let mut body = String::new();
    for i in 0..sections {
        body.push_str(&format!(
            r#"<section class="entry"><h2>Role {i}</h2><p class="muted">2019-0{m} to Present</p>
               <ul><li>Shipped feature {i}</li><li>Led migration {i}</li></ul></section>"#,
            i = i,
            m = i % 9 + 1
        ));
    }
    format!(
        r#"<html><head><style>
            .resume {{ color: oklch(0.3 0.02 260); padding: 16px; width: 600px }}
            .entry h2 {{ color: oklch(0.5 0.2 265); border: 1px solid oklch(0.9 0 0) }}
            .muted {{ color: #6b7280 }}
        </style></head><body><div id="resume-preview" class="resume">{}</div></body></html>"#,
        body
    )
}

fn bench_normalize(c: &mut Criterion) {
    let html = resume_html(20);
    let policy = ExportConfig::default().color_policy;
    c.bench_function("normalize_and_sanitize_20_sections", |b| {
        b.iter(|| {
            let mut doc = Document::parse(&html);
            let root = doc.query_selector("#resume-preview").unwrap();
            if let Some(r) = root {
                normalize::inline_all_computed_styles(&mut doc, r, &policy).unwrap();
            }
            sanitize::fix_unsupported_colors(&mut doc, root, &policy).unwrap();
            black_box(doc);
        })
    });
}

fn bench_capture(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let config = ExportConfig {
        scale: 1.0,
        ..Default::default()
    };
    let driver = CaptureDriver::new(config).expect("driver");
    let mut doc = Document::parse(&resume_html(5));
    let policy = driver.config().color_policy.clone();
    let root = doc.query_selector("#resume-preview").unwrap();
    if let Some(r) = root {
        normalize::inline_all_computed_styles(&mut doc, r, &policy).unwrap();
    }
    sanitize::fix_unsupported_colors(&mut doc, root, &policy).unwrap();

    c.bench_function("capture_5_sections_1x", |b| {
        b.iter(|| {
            let img = rt.block_on(driver.capture_element(&mut doc, root)).unwrap();
            black_box(img);
        })
    });
}

criterion_group!(benches, bench_normalize, bench_capture);
criterion_main!(benches);
