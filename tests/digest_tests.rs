use docforge::classify::Category;
use docforge::config::DigestConfig;
use docforge::content::PageContent;
use docforge::dedupe::{ExtractionRecord, dedupe};
use docforge::digest::assemble;
use spectral::assert_that;

fn page(body: &str) -> PageContent {
    PageContent::parse(&format!("<html><head></head><body>{body}</body></html>"))
}

fn filler(len: usize) -> String {
    "a".repeat(len)
}

fn records_of(
    content: &PageContent,
    config: &DigestConfig,
    category: Category,
) -> Vec<ExtractionRecord> {
    dedupe(content, config)
        .into_iter()
        .filter(|record| record.category == category)
        .collect()
}

#[test]
fn short_paragraph_extracted_oversized_dropped() {
    let config = DigestConfig::default();
    let content = page(&format!("<p>{}</p><p>{}</p>", filler(50), filler(2000)));

    let paragraphs = records_of(&content, &config, Category::Paragraph);

    assert_that(&paragraphs.len()).is_equal_to(1);
    assert_that(&paragraphs.first().map(|record| record.size)).is_equal_to(Some(50));
}

#[test]
fn small_section_swallows_inner_div() {
    let config = DigestConfig::default();
    let content = page(&format!(
        "<section>{} <div class=\"endpoint\">{}</div></section>",
        filler(1000),
        filler(200)
    ));

    let sections = records_of(&content, &config, Category::Section);
    let divs = records_of(&content, &config, Category::Div);

    assert_that(&sections.len()).is_equal_to(1);
    assert_that(&divs.len()).is_equal_to(0);
}

#[test]
fn oversized_section_leaves_inner_div_eligible() {
    let config = DigestConfig::default();
    let content = page(&format!(
        "<section>{} <div class=\"endpoint\">{}</div></section>",
        filler(2800),
        filler(200)
    ));

    let sections = records_of(&content, &config, Category::Section);
    let divs = records_of(&content, &config, Category::Div);

    assert_that(&sections.len()).is_equal_to(0);
    assert_that(&divs.len()).is_equal_to(1);
}

#[test]
fn oversized_leaf_is_simply_dropped() {
    let config = DigestConfig::default();
    let content = page(&format!("<p>{}</p>", filler(5000)));

    assert_that(&dedupe(&content, &config).len()).is_equal_to(0);
}

#[test]
fn code_inside_pre_is_not_emitted_twice() {
    let config = DigestConfig::default();
    let content = page("<pre><code>curl -X GET 'https://api.example.com/users'</code></pre>");

    let code = records_of(&content, &config, Category::Code);

    assert_that(&code.len()).is_equal_to(1);
}

#[test]
fn code_is_never_size_filtered() {
    let config = DigestConfig::default();
    let content = page(&format!("<pre><code>{}</code></pre>", filler(5000)));

    let code = records_of(&content, &config, Category::Code);

    assert_that(&code.len()).is_equal_to(1);
}

#[test]
fn spans_gated_on_api_vocabulary() {
    let config = DigestConfig::default();
    let content = page("<span>POST</span><span>our amazing community</span>");

    let spans = records_of(&content, &config, Category::Span);

    assert_that(&spans.len()).is_equal_to(1);
    assert_that(&spans.first().map(|record| record.text.clone()))
        .is_equal_to(Some("POST".to_string()));
}

fn record(category: Category, text: String, node: usize) -> ExtractionRecord {
    let size = text.chars().count();
    ExtractionRecord {
        category,
        text,
        size,
        node,
    }
}

#[test]
fn all_code_kept_paragraphs_fill_remaining_budget() {
    let config = DigestConfig::default().with_ceiling(20_000);

    let mut records = Vec::new();
    for index in 0..5 {
        records.push(record(
            Category::Code,
            format!("code-sample-{index} {}", filler(80)),
            index,
        ));
    }
    for index in 0..50 {
        records.push(record(
            Category::Paragraph,
            format!("paragraph-{index:02} {}", filler(1985)),
            100 + index,
        ));
    }

    let digest = assemble(&records, &config);
    let code_kept = (0..5)
        .filter(|index| digest.text.contains(&format!("code-sample-{index} ")))
        .count();
    let paragraphs_kept = (0..50)
        .filter(|index| digest.text.contains(&format!("paragraph-{index:02} ")))
        .count();

    assert_that(&(digest.size <= 20_000)).is_equal_to(true);
    assert_that(&code_kept).is_equal_to(5);
    assert_that(&(paragraphs_kept > 0)).is_equal_to(true);
    assert_that(&(paragraphs_kept < 50)).is_equal_to(true);
}

#[test]
fn assembly_is_idempotent() {
    let config = DigestConfig::default().with_ceiling(500);
    let records = vec![
        record(
            Category::Code,
            "curl -X GET 'https://api.example.com'".to_string(),
            0,
        ),
        record(Category::Paragraph, filler(120), 1),
        record(Category::Paragraph, filler(400), 2),
    ];

    let first = assemble(&records, &config);
    let second = assemble(&records, &config);

    assert_that(&first).is_equal_to(&second);
}

#[test]
fn digest_never_exceeds_any_ceiling() {
    let records = vec![
        record(Category::Code, filler(90), 0),
        record(Category::Table, filler(70), 1),
        record(Category::Paragraph, filler(50), 2),
        record(Category::Paragraph, filler(30), 3),
        record(Category::Span, "GET".to_string(), 4),
    ];

    for ceiling in [0, 10, 50, 100, 150, 200, 1000] {
        let config = DigestConfig::default().with_ceiling(ceiling);
        let digest = assemble(&records, &config);
        assert_that(&(digest.size <= ceiling)).is_equal_to(true);
    }
}

#[test]
fn dropped_fragment_drops_rest_of_category_but_not_later_categories() {
    // Header "## Paragraphs\n" is 14 chars; the first paragraph fits,
    // the second would overflow, the short span afterwards still fits.
    let records = vec![
        record(Category::Paragraph, filler(40), 0),
        record(Category::Paragraph, filler(60), 1),
        record(Category::Span, "GET".to_string(), 2),
    ];
    let config = DigestConfig::default().with_ceiling(90);

    let digest = assemble(&records, &config);

    assert_that(&digest.text.contains(&filler(40))).is_equal_to(true);
    assert_that(&digest.text.contains(&filler(60))).is_equal_to(false);
    assert_that(&digest.text.contains("GET")).is_equal_to(true);
}

#[test]
fn sections_emitted_in_fixed_priority_order() {
    let config = DigestConfig::default();
    let records = vec![
        record(Category::Section, filler(60), 0),
        record(Category::Paragraph, filler(40), 1),
        record(
            Category::Code,
            "curl -X GET 'https://api.example.com'".to_string(),
            2,
        ),
    ];

    let digest = assemble(&records, &config);
    let code_at = digest.text.find("## Code blocks");
    let paragraphs_at = digest.text.find("## Paragraphs");
    let sections_at = digest.text.find("## Sections");

    assert_that(&(code_at < paragraphs_at)).is_equal_to(true);
    assert_that(&(paragraphs_at < sections_at)).is_equal_to(true);
}

#[test]
fn trailing_marker_records_final_size() {
    let config = DigestConfig::default();
    let records = vec![record(Category::Paragraph, filler(40), 0)];

    let digest = assemble(&records, &config);
    let marker = format!("[digest size: {} chars]", digest.size);

    assert_that(&digest.text.contains(&marker)).is_equal_to(true);
}

#[test]
fn sparse_page_yields_thin_digest() {
    let config = DigestConfig::default();
    let content = page("<p>Welcome to our product!</p>");

    let digest = assemble(&dedupe(&content, &config), &config);

    assert_that(&digest.is_thin(config.min_chars)).is_equal_to(true);
}
