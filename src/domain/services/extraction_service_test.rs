// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;

fn site(primary: &str) -> SiteSpec {
    SiteSpec::new("registry", "https://registry.example", SelectorKind::parse(primary))
}

#[test]
fn test_number_from_text() {
    assert_eq!(number_from_text("Total: 1,234 servers"), Some(1234));
    assert_eq!(number_from_text("12 345"), Some(12));
    assert_eq!(number_from_text("1\u{00A0}234\u{00A0}567 MCP servers"), Some(1234567));
    assert_eq!(number_from_text("Showing 1-30 of 1,158 servers"), Some(1158));
    assert_eq!(number_from_text("Version 2 offers 40 servers"), Some(2));
    assert_eq!(number_from_text("no digits here"), None);
}

#[test]
fn test_number_from_text_ignores_non_ascii_digits() {
    // Arabic-Indic digits neither count nor glue ASCII digits together.
    assert_eq!(number_from_text("1\u{0662}3 servers"), Some(1));
    assert_eq!(number_from_text("\u{0664}\u{0662} servers"), None);
}

#[test]
fn test_extract_css_with_thousands_separator() {
    let html = r#"<div><p class="count">Total: 1,234 servers</p></div>"#;

    assert_eq!(ExtractionService::extract(html, &site(".count")), Ok(1234));
}

#[test]
fn test_extract_falls_back_to_data_count() {
    let html = r#"<div class="stats"><span data-count='57'></span></div>"#;
    let spec = site(".server-count").with_fallbacks(vec![SelectorKind::parse("[data-count]")]);

    assert_eq!(ExtractionService::extract(html, &spec), Ok(57));
}

#[test]
fn test_css_element_without_text_uses_count_attribute() {
    let html = r#"<span class="total" data-total="812"></span>"#;

    assert_eq!(ExtractionService::extract(html, &site(".total")), Ok(812));
}

#[test]
fn test_primary_selector_wins_over_fallback() {
    let html = r#"<b id="a">10</b><b id="b">20</b>"#;
    let spec = site("#a").with_fallbacks(vec![SelectorKind::parse("#b")]);

    assert_eq!(ExtractionService::extract(html, &spec), Ok(10));
}

#[test]
fn test_text_contains_selector() {
    let html = r#"
        <html><body>
            <script>var servers = 99;</script>
            <h1>Browse <em>4,210</em> MCP Servers</h1>
        </body></html>
    "#;
    let spec = site("h1:contains('MCP Servers')");

    assert_eq!(ExtractionService::extract(html, &spec), Ok(4210));
}

#[test]
fn test_text_contains_is_case_insensitive() {
    let html = r#"<p>There are 31 SERVERS listed</p>"#;

    assert_eq!(
        ExtractionService::extract(html, &site(":contains('servers')")),
        Ok(31)
    );
}

#[test]
fn test_escaped_css_class() {
    let html = r#"<span class="md:text-lg">Showing 1-20 of 305</span>"#;

    assert_eq!(
        ExtractionService::extract(html, &site(r"span.md\:text-lg")),
        Ok(305)
    );
}

#[test]
fn test_no_match() {
    let html = r#"<div class="other">nothing</div>"#;
    let spec = site(".count").with_fallbacks(vec![SelectorKind::parse("[data-count]")]);

    assert_eq!(ExtractionService::extract(html, &spec), Err(ExtractError::NoMatch));
}

#[test]
fn test_invalid_css_is_treated_as_no_match() {
    let html = r#"<p class="count">5</p>"#;
    let spec = site("p[[[").with_fallbacks(vec![SelectorKind::parse(".count")]);

    assert_eq!(ExtractionService::extract(html, &spec), Ok(5));
}

#[test]
fn test_first_policy_takes_document_order() {
    let html = r#"<i class="n">3</i><i class="n">9</i>"#;

    assert_eq!(ExtractionService::extract(html, &site(".n")), Ok(3));
}

#[test]
fn test_max_policy() {
    let html = r#"<i class="n">3</i><i class="n">9</i><i class="n">4</i>"#;
    let spec = site(".n").with_disambiguation(DisambiguationPolicy::Max);

    assert_eq!(ExtractionService::extract(html, &spec), Ok(9));
}

#[test]
fn test_unique_policy_falls_through_on_conflict() {
    let html = r#"<i class="n">3</i><i class="n">9</i><b data-count="12"></b>"#;
    let spec = site(".n")
        .with_fallbacks(vec![SelectorKind::parse("[data-count]")])
        .with_disambiguation(DisambiguationPolicy::Unique);

    assert_eq!(ExtractionService::extract(html, &spec), Ok(12));
}

#[test]
fn test_unique_policy_accepts_repeated_value() {
    let html = r#"<i class="n">7</i><i class="n">7</i>"#;
    let spec = site(".n").with_disambiguation(DisambiguationPolicy::Unique);

    assert_eq!(ExtractionService::extract(html, &spec), Ok(7));
}

#[test]
fn test_unique_policy_reports_ambiguity() {
    let html = r#"<i class="n">3</i><i class="n">9</i>"#;
    let spec = site(".n").with_disambiguation(DisambiguationPolicy::Unique);

    match ExtractionService::extract(html, &spec) {
        Err(ExtractError::Ambiguous { selector, values }) => {
            assert_eq!(selector, "css(.n)");
            assert_eq!(values, vec![3, 9]);
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }
}
