//! Gap proposals, schema lookup and schema caching.

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone};
use portable_views::config::EngineConfig;
use portable_views::engine::Engine;
use portable_views::schema::{
    AttributeGroup, DirectorySchemaSource, SchemaDescriptor, SchemaError, SchemaSource, StaticSchemaSource,
};
use portable_views::templating::{DataContext, Template};
use portable_views::test_utils::{RecordFixture, SchemaFixture, TemplateFixture};
use std::time::Duration;
use tempfile::TempDir;

fn context() -> DataContext {
    let today = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    DataContext::from_json(RecordFixture::change_order().value, today)
}

fn change_order_template() -> Template {
    let fixture = TemplateFixture::change_order();
    Template::from_markdown(&fixture.name, &fixture.content).unwrap()
}

struct HangingSource;

#[async_trait]
impl SchemaSource for HangingSource {
    async fn fetch(&self, _entity: &str) -> Result<SchemaDescriptor, SchemaError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_proposal_equals_unreferenced_attributes() {
    let engine = Engine::default();
    let source = StaticSchemaSource::new().with_schema(SchemaFixture::change_order_basic().descriptor);
    let template = change_order_template();

    let proposal = engine.propose_gaps(&template, None, &source).await.unwrap().unwrap();
    assert_eq!(proposal.names(), vec!["Priority", "InternalNotes"]);
    assert!(proposal.attributes.iter().all(|a| a.group == AttributeGroup::Text));

    let again = engine.propose_gaps(&template, None, &source).await.unwrap().unwrap();
    assert_eq!(proposal.source, again.source);
}

#[tokio::test]
async fn test_full_schema_is_grouped_by_type() {
    let engine = Engine::default();
    let source = StaticSchemaSource::new().with_schema(SchemaFixture::change_order_full().descriptor);

    let proposal = engine.propose_gaps(&change_order_template(), None, &source).await.unwrap().unwrap();
    assert_eq!(proposal.names(), vec!["Priority", "ApprovedOn", "Amount", "Customer", "Items"]);
    assert_eq!(proposal.schema_version, 3);
}

#[tokio::test]
async fn test_render_with_gaps_leaves_template_untouched() {
    let engine = Engine::default();
    let source = StaticSchemaSource::new().with_schema(SchemaFixture::change_order_full().descriptor);
    let template = change_order_template();
    let original = template.source().to_string();

    let filled = engine.render_with_gaps(&template, &context(), None, &source).await.unwrap();
    assert_eq!(template.source(), original);
    assert!(filled.render.text.trim_start().starts_with("# Change Order CO-17"));

    let supplement = filled.supplement.unwrap();
    assert!(supplement.text.contains("## Additional Details"));
    assert!(supplement.text.contains("- **Priority:** High"));
    assert!(supplement.text.contains("- **Amount:** $1,234.50"));
    assert!(supplement.text.contains("- **Customer:** Acme Builders"));
    assert!(supplement.text.contains("### Items"));
    assert!(supplement.text.contains("- Rebar, $800.00"));
    // No ApprovedOn in the record, so its line is guarded out.
    assert!(!supplement.text.contains("Approved On"));
    assert!(!supplement.has_diagnostics());
}

#[tokio::test]
async fn test_schema_lookup_timeout_degrades_to_no_proposal() {
    let engine = Engine::new(EngineConfig {
        schema_timeout_ms: 25,
        ..EngineConfig::default()
    });
    let template = change_order_template();

    let filled = tokio::time::timeout(
        Duration::from_secs(5),
        engine.render_with_gaps(&template, &context(), None, &HangingSource),
    )
    .await
    .expect("render must not wait on the schema source")
    .unwrap();

    assert!(filled.render.text.contains("CO-17"));
    assert!(filled.proposal.is_none());
    assert_eq!(filled.combined_text(), filled.render.text);
}

#[tokio::test]
async fn test_schema_cached_until_version_changes() {
    let engine = Engine::default();
    let source = StaticSchemaSource::new().with_schema(SchemaFixture::change_order_basic().descriptor);
    let template = change_order_template();

    for _ in 0..3 {
        engine.propose_gaps(&template, None, &source).await.unwrap();
    }
    assert_eq!(source.fetch_count(), 1);

    // The owner publishes version 3; the session learns about it.
    source.insert(SchemaFixture::change_order_full().descriptor);
    assert!(engine.schema_cache().observe_version("ChangeOrder", 3));

    let proposal = engine.propose_gaps(&template, None, &source).await.unwrap().unwrap();
    assert_eq!(proposal.schema_version, 3);
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn test_directory_source_end_to_end() {
    let temp = TempDir::new().unwrap();
    SchemaFixture::change_order_basic().write_to(temp.path()).unwrap();

    let engine = Engine::default();
    let source = DirectorySchemaSource::new(temp.path());
    let filled = engine.render_with_gaps(&change_order_template(), &context(), None, &source).await.unwrap();

    assert_eq!(filled.proposal.as_ref().unwrap().names(), vec!["Priority", "InternalNotes"]);
    assert!(filled.combined_text().contains("- **Priority:** High"));

    let missing = engine
        .render_with_gaps(&change_order_template(), &context(), Some("Invoice"), &source)
        .await
        .unwrap();
    assert!(missing.proposal.is_none());
}
