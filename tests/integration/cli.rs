//! The `pview` binary.

use assert_cmd::Command;
use portable_views::test_utils::{RecordFixture, SchemaFixture, TemplateFixture};
use predicates::prelude::*;
use tempfile::TempDir;

fn pview(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pview").unwrap();
    cmd.current_dir(temp.path())
        .env("PVIEW_CONFIG", temp.path().join("no-config.toml"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_check_valid_template() {
    let temp = TempDir::new().unwrap();
    let path = TemplateFixture::change_order_letter().write_to(temp.path()).unwrap();

    pview(&temp)
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("change-order-letter v1"));
}

#[test]
fn test_check_reports_block_mismatch_with_location() {
    let temp = TempDir::new().unwrap();
    let path = TemplateFixture::mismatched_blocks().write_to(temp.path()).unwrap();

    pview(&temp)
        .arg("check")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Block Mismatch"))
        .stderr(predicate::str::contains("`{% endfor %}` at 3:1"))
        .stderr(predicate::str::contains("1 of 1 template(s) failed the check"));
}

#[test]
fn test_check_locations_count_frontmatter() {
    let temp = TempDir::new().unwrap();
    let path = TemplateFixture::unclosed_with_frontmatter().write_to(temp.path()).unwrap();

    pview(&temp)
        .arg("check")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("`{% if %}` at 7:1 is never closed"))
        .stderr(predicate::str::contains("7 | {% if Approved %}Approved"));
}

#[test]
fn test_check_continues_past_unreadable_file() {
    let temp = TempDir::new().unwrap();
    let valid = TemplateFixture::change_order().write_to(temp.path()).unwrap();
    let missing = temp.path().join("missing.md");

    pview(&temp)
        .arg("check")
        .arg(&missing)
        .arg(&valid)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("change-order v2"))
        .stderr(predicate::str::contains("Failed to read template file"))
        .stderr(predicate::str::contains("1 of 2 template(s) failed the check"));
}

#[test]
fn test_check_suggests_filter_name() {
    let temp = TempDir::new().unwrap();
    let path = TemplateFixture::unknown_filter().write_to(temp.path()).unwrap();

    pview(&temp)
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Did you mean `currency`?"));
}

#[test]
fn test_render_with_fixed_today() {
    let temp = TempDir::new().unwrap();
    let template = TemplateFixture::change_order_letter().write_to(temp.path()).unwrap();
    let record = RecordFixture::change_order().write_to(temp.path()).unwrap();

    pview(&temp)
        .arg("render")
        .arg(&template)
        .arg("--context")
        .arg(&record)
        .args(["--today", "2024-06-01T09:00:00-05:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dated June 1, 2024"))
        .stdout(predicate::str::contains("- Labor: $434.50"));
}

#[test]
fn test_render_reports_diagnostics_and_strict_fails() {
    let temp = TempDir::new().unwrap();
    let template = TemplateFixture::simple("sparse", "Total: {{ Amount | currency }}\n").write_to(temp.path()).unwrap();
    let record = temp.path().join("empty.json");
    std::fs::write(&record, "{}").unwrap();

    pview(&temp)
        .arg("render")
        .arg(&template)
        .arg("--context")
        .arg(&record)
        .assert()
        .success()
        .stdout("Total: \n")
        .stderr(predicate::str::contains("unresolved path"));

    pview(&temp)
        .arg("render")
        .arg(&template)
        .arg("--context")
        .arg(&record)
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 diagnostic(s)"));
}

#[test]
fn test_render_fill_gaps_appends_supplement() {
    let temp = TempDir::new().unwrap();
    let template = TemplateFixture::change_order().write_to(temp.path()).unwrap();
    let record = RecordFixture::change_order().write_to(temp.path()).unwrap();
    let schemas = temp.path().join("schemas");
    std::fs::create_dir(&schemas).unwrap();
    SchemaFixture::change_order_basic().write_to(&schemas).unwrap();

    pview(&temp)
        .arg("render")
        .arg(&template)
        .arg("--context")
        .arg(&record)
        .arg("--fill-gaps")
        .arg("--schema-dir")
        .arg(&schemas)
        .assert()
        .success()
        .stdout(predicate::str::contains("# Change Order CO-17"))
        .stdout(predicate::str::contains("## Additional Details"))
        .stdout(predicate::str::contains("- **Priority:** High"));
}

#[test]
fn test_render_fill_gaps_survives_missing_schema() {
    let temp = TempDir::new().unwrap();
    let template = TemplateFixture::change_order().write_to(temp.path()).unwrap();
    let record = RecordFixture::change_order().write_to(temp.path()).unwrap();

    pview(&temp)
        .arg("render")
        .arg(&template)
        .arg("--context")
        .arg(&record)
        .arg("--fill-gaps")
        .arg("--schema-dir")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("# Change Order CO-17"))
        .stdout(predicate::str::contains("Additional Details").not());
}

#[test]
fn test_gaps_lists_unreferenced_attributes() {
    let temp = TempDir::new().unwrap();
    let template = TemplateFixture::change_order().write_to(temp.path()).unwrap();
    SchemaFixture::change_order_basic().write_to(temp.path()).unwrap();

    pview(&temp)
        .arg("gaps")
        .arg(&template)
        .arg("--schema-dir")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 attribute(s) of ChangeOrder v1 are not referenced"))
        .stdout(predicate::str::contains("{% if InternalNotes %}- **Internal Notes:** {{ InternalNotes }}"));
}

#[test]
fn test_gaps_json_output() {
    let temp = TempDir::new().unwrap();
    let template = TemplateFixture::change_order().write_to(temp.path()).unwrap();
    SchemaFixture::change_order_basic().write_to(temp.path()).unwrap();

    let output = pview(&temp)
        .arg("gaps")
        .arg(&template)
        .args(["--entity", "ChangeOrder", "--format", "json"])
        .arg("--schema-dir")
        .arg(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let proposal: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = proposal["attributes"].as_array().unwrap().iter().map(|a| a["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Priority", "InternalNotes"]);
    assert_eq!(proposal["entity"], "ChangeOrder");
}

#[test]
fn test_gaps_without_schema_fails() {
    let temp = TempDir::new().unwrap();
    let template = TemplateFixture::change_order().write_to(temp.path()).unwrap();

    pview(&temp)
        .arg("gaps")
        .arg(&template)
        .arg("--schema-dir")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no schema found for entity type `ChangeOrder`"));
}

#[test]
fn test_config_file_changes_default_currency() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("pview.toml");
    std::fs::write(&config, "default_currency = \"GBP\"\n").unwrap();
    let template = TemplateFixture::simple("amount", "{{ Amount | currency }}").write_to(temp.path()).unwrap();
    let record = temp.path().join("record.json");
    std::fs::write(&record, r#"{"Amount": 99.999}"#).unwrap();

    pview(&temp)
        .arg("--config")
        .arg(&config)
        .arg("render")
        .arg(&template)
        .arg("--context")
        .arg(&record)
        .assert()
        .success()
        .stdout("£100.00");
}
