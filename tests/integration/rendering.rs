//! Rendering through the engine against realistic records.

use chrono::{DateTime, FixedOffset, TimeZone};
use portable_views::engine::Engine;
use portable_views::templating::{DataContext, DiagnosticKind, ParseError, Template};
use portable_views::test_utils::{RecordFixture, TemplateFixture, init_test_logging};
use serde_json::json;
use std::sync::Arc;

fn today() -> DateTime<FixedOffset> {
    FixedOffset::west_opt(5 * 3600).unwrap().with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

fn context(record: serde_json::Value) -> DataContext {
    DataContext::from_json(record, today())
}

fn render(source: &str, record: serde_json::Value) -> portable_views::templating::RenderResult {
    let engine = Engine::default();
    let template = engine.compile(Template::new("test", "1", source)).unwrap();
    engine.render(&template, &context(record)).unwrap()
}

#[test]
fn test_text_only_template_is_identity() {
    init_test_logging(None);
    let source = "# Heading\n\nPlain *markdown* with a } brace and 100% certainty.\n";
    let result = render(source, RecordFixture::change_order().value);
    assert_eq!(result.text, source);
    assert!(!result.has_diagnostics());
}

#[test]
fn test_substitution_scenario() {
    let result = render("{{ Number }} - {{ Description }}", json!({"Number": "C-100", "Description": "Site work"}));
    assert_eq!(result.text, "C-100 - Site work");
}

#[test]
fn test_missing_conditional_renders_nothing() {
    let result = render("{% if ScopeOfWork %}## Scope\n{{ ScopeOfWork }}{% endif %}", json!({}));
    assert_eq!(result.text, "");
    assert!(!result.has_diagnostics());
}

#[test]
fn test_default_applies_only_to_missing_or_empty() {
    let source = "[{{ X | default('Y') }}]";
    assert_eq!(render(source, json!({})).text, "[Y]");
    assert_eq!(render(source, json!({"X": ""})).text, "[Y]");
    assert_eq!(render(source, json!({"X": []})).text, "[Y]");
    assert_eq!(render(source, json!({"X": null})).text, "[Y]");
    assert_eq!(render(source, json!({"X": 0})).text, "[0]");
    assert_eq!(render(source, json!({"X": "value"})).text, "[value]");
}

#[test]
fn test_currency_formatting_and_missing_amount() {
    let result = render("{{ Amount | currency }}", json!({"Amount": 1234.5}));
    assert_eq!(result.text, "$1,234.50");

    let result = render("Total: {{ Amount | currency }}", json!({}));
    assert_eq!(result.text, "Total: ");
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].kind, DiagnosticKind::UnresolvedPath);

    let result = render("{{ Amount | currency | default('TBD') }}", json!({}));
    assert_eq!(result.text, "TBD");
    assert!(!result.has_diagnostics());
}

#[test]
fn test_loop_over_empty_or_missing_collection() {
    let source = "Before{% for co in ChangeOrders %}[{{ co.Number }}]{% endfor %}After";
    for record in [json!({}), json!({"ChangeOrders": []}), json!({"ChangeOrders": null})] {
        let result = render(source, record);
        assert_eq!(result.text, "BeforeAfter");
        assert!(!result.has_diagnostics());
    }

    let result = render(source, json!({"ChangeOrders": [{"Number": "CO-1"}, {"Number": "CO-2"}]}));
    assert_eq!(result.text, "Before[CO-1][CO-2]After");
}

#[test]
fn test_filter_type_error_does_not_blank_document() {
    let result = render("A {{ Name | currency }} B {{ Number }}", json!({"Name": "Acme", "Number": "CO-3"}));
    assert_eq!(result.text, "A  B CO-3");
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].kind, DiagnosticKind::FilterType);
    assert_eq!(result.diagnostics[0].path, "Name");
}

#[test]
fn test_rendering_is_idempotent_and_order_independent() {
    let template = TemplateFixture::change_order_letter();
    let template = Template::from_markdown(&template.name, &template.content).unwrap();
    let engine = Engine::default();

    let record = RecordFixture::change_order().value;
    let mut reordered = serde_json::Map::new();
    if let serde_json::Value::Object(fields) = &record {
        for (key, value) in fields.iter().rev() {
            reordered.insert(key.clone(), value.clone());
        }
    }

    let first = engine.render(&template, &context(record.clone())).unwrap();
    let second = engine.render(&template, &context(record)).unwrap();
    let third = engine.render(&template, &context(serde_json::Value::Object(reordered))).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[test]
fn test_change_order_letter() {
    let fixture = TemplateFixture::change_order_letter();
    let template = Template::from_markdown(&fixture.name, &fixture.content).unwrap();
    assert_eq!(template.entity(), Some("ChangeOrder"));

    let result = Engine::default().render(&template, &context(RecordFixture::change_order().value)).unwrap();
    assert!(result.text.contains("Dated June 1, 2024"));
    assert!(result.text.contains("To Acme Builders"));
    assert!(result.text.contains("adds $1,234.50 to the contract"));
    assert!(result.text.contains("Scope: Add #5 rebar at 12in O.C."));
    assert!(!result.text.contains("Scope to be confirmed."));
    assert!(result.text.contains("- Rebar: $800.00\n- Labor: $434.50\n"));
    assert!(!result.has_diagnostics(), "unexpected diagnostics: {:?}", result.diagnostics);
}

#[test]
fn test_change_order_letter_with_sparse_record() {
    let fixture = TemplateFixture::change_order_letter();
    let template = Template::from_markdown(&fixture.name, &fixture.content).unwrap();

    let result = Engine::default().render(&template, &context(json!({"Number": "CO-18", "Amount": 0}))).unwrap();
    assert!(result.text.contains("To Valued Customer"));
    assert!(result.text.contains("adds $0.00 to the contract"));
    assert!(result.text.contains("Scope to be confirmed."));
    assert!(!result.text.contains("- "));
    assert!(!result.has_diagnostics());
}

#[test]
fn test_unbalanced_if_reports_opening_location() {
    let engine = Engine::default();
    let err = engine.compile(Template::new("t", "1", "line one\n  {% if A %}text")).unwrap_err();
    match &err {
        ParseError::BlockMismatch {
            opening: Some(opening),
            closing: None,
        } => {
            assert_eq!(opening.keyword, "if");
            assert_eq!((opening.location.line, opening.location.column), (2, 3));
        }
        other => panic!("expected block mismatch, got {:?}", other),
    }

    let report = err.format_with_context("line one\n  {% if A %}text");
    assert!(report.contains("Block Mismatch"));
    assert!(report.contains("2 |   {% if A %}text"));
}

#[test]
fn test_parse_errors_surface_before_rendering() {
    let fixture = TemplateFixture::unknown_filter();
    let template = Template::from_markdown(&fixture.name, &fixture.content).unwrap();
    let err = Engine::default().render(&template, &context(json!({"Amount": 1}))).unwrap_err();
    match err {
        ParseError::UnknownFilter {
            name,
            suggestion,
            ..
        } => {
            assert_eq!(name, "curency");
            assert_eq!(suggestion.as_deref(), Some("currency"));
        }
        other => panic!("expected unknown filter, got {:?}", other),
    }
}

#[test]
fn test_today_is_available_everywhere() {
    let source = "{{ _today | date('%Y-%m-%d') }}{% for x in Xs %}|{{ _today | date('%d') }}{% endfor %}";
    let result = render(source, json!({"Xs": [1, 2]}));
    assert_eq!(result.text, "2024-06-01|01|01");
}

#[test]
fn test_shared_template_renders_concurrently() {
    let engine = Engine::default();
    let template = engine.compile(Template::new("co", "1", "{{ Number }}: {{ Amount | currency }}")).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let template = Arc::clone(&template);
            std::thread::spawn(move || {
                let context = context(json!({"Number": format!("CO-{}", i), "Amount": i * 1000}));
                template.render(&context, &Default::default()).unwrap().text
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), format!("CO-{}: ${}.00", i, format_thousands(i * 1000)));
    }
}

fn format_thousands(n: usize) -> String {
    if n >= 1000 {
        format!("{},{:03}", n / 1000, n % 1000)
    } else {
        n.to_string()
    }
}
