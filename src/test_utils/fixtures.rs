//! Sample templates, records and schemas for tests.
//!
//! Everything here models the same construction change order so fixtures
//! can be mixed freely.

use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

use crate::schema::descriptor::{SchemaAttribute, SchemaDescriptor, SemanticType};

/// A template file with optional frontmatter.
#[derive(Clone, Debug)]
pub struct TemplateFixture {
    pub name: String,
    pub content: String,
}

impl TemplateFixture {
    /// Change order summary referencing `Number` and `Description` only.
    pub fn change_order() -> Self {
        Self {
            name: "change-order".to_string(),
            content: r#"---
name: change-order
version: 2
entity: ChangeOrder
---
# Change Order {{ Number }}

{{ Description }}
"#
            .to_string(),
        }
    }

    /// Full change order letter exercising filters, conditionals and loops.
    pub fn change_order_letter() -> Self {
        Self {
            name: "change-order-letter".to_string(),
            content: r#"---
name: change-order-letter
version: 1
entity: ChangeOrder
---
Dated {{ _today | date }}

To {{ Customer.Name | default('Valued Customer') }}

Change order {{ Number }} adds {{ Amount | currency }} to the contract.
{% if ScopeOfWork %}
Scope: {{ ScopeOfWork }}
{% else %}
Scope to be confirmed.
{% endif %}
{% for item in Items %}- {{ item.Description }}: {{ item.Cost | currency }}
{% endfor %}"#
                .to_string(),
        }
    }

    /// `{% if %}` closed by `{% endfor %}`.
    pub fn mismatched_blocks() -> Self {
        Self::simple("mismatched", "{% if Approved %}\nApproved on {{ ApprovedOn | date }}\n{% endfor %}\n")
    }

    /// A misspelled filter name.
    /// A frontmatter template whose `if` on file line 7 is never closed.
    pub fn unclosed_with_frontmatter() -> Self {
        Self::simple(
            "unclosed",
            "---\nname: unclosed\nversion: 1\nentity: ChangeOrder\n---\n# {{ Number }}\n{% if Approved %}Approved\n",
        )
    }

    pub fn unknown_filter() -> Self {
        Self::simple("unknown-filter", "Total: {{ Amount | curency }}\n")
    }

    pub fn simple(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    /// Write as `<name>.md` into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.md", self.name));
        fs::write(&path, &self.content)
            .with_context(|| format!("Failed to write template fixture: {}", path.display()))?;
        Ok(path)
    }
}

/// A JSON record to bind.
#[derive(Clone, Debug)]
pub struct RecordFixture {
    pub name: String,
    pub value: serde_json::Value,
}

impl RecordFixture {
    pub fn change_order() -> Self {
        Self {
            name: "co-17".to_string(),
            value: json!({
                "Number": "CO-17",
                "Description": "Additional footing reinforcement",
                "Amount": 1234.5,
                "ScopeOfWork": "Add #5 rebar at 12in O.C.",
                "Priority": "High",
                "InternalNotes": null,
                "Customer": {"Name": "Acme Builders"},
                "Items": [
                    {"Description": "Rebar", "Cost": 800},
                    {"Description": "Labor", "Cost": "434.50"}
                ]
            }),
        }
    }

    /// Write as `<name>.json` into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.json", self.name));
        let content = serde_json::to_string_pretty(&self.value)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write record fixture: {}", path.display()))?;
        Ok(path)
    }
}

/// Schema descriptors in the shape a schema directory holds.
#[derive(Clone, Debug)]
pub struct SchemaFixture {
    pub descriptor: SchemaDescriptor,
}

impl SchemaFixture {
    /// `{Number, Description, Priority, InternalNotes}`.
    pub fn change_order_basic() -> Self {
        Self {
            descriptor: SchemaDescriptor::new("ChangeOrder", 1)
                .with_attribute(SchemaAttribute::new("Number", SemanticType::Text))
                .with_attribute(SchemaAttribute::new("Description", SemanticType::Text))
                .with_attribute(SchemaAttribute::new("Priority", SemanticType::Text))
                .with_attribute(SchemaAttribute::new("InternalNotes", SemanticType::Text)),
        }
    }

    /// Every semantic type, for grouping and snippet tests.
    pub fn change_order_full() -> Self {
        Self {
            descriptor: SchemaDescriptor::new("ChangeOrder", 3)
                .with_attribute(SchemaAttribute::new("Number", SemanticType::Text))
                .with_attribute(SchemaAttribute::new("Items", SemanticType::Collection).with_fields(vec![
                    SchemaAttribute::new("Description", SemanticType::Text),
                    SchemaAttribute::new("Cost", SemanticType::Currency),
                ]))
                .with_attribute(SchemaAttribute::new("Amount", SemanticType::Currency))
                .with_attribute(SchemaAttribute::new("Customer", SemanticType::Reference))
                .with_attribute(SchemaAttribute::new("ApprovedOn", SemanticType::Date))
                .with_attribute(SchemaAttribute::new("Description", SemanticType::Text))
                .with_attribute(SchemaAttribute::new("Priority", SemanticType::Text)),
        }
    }

    /// Write as `<entity>.json` into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.json", self.descriptor.entity));
        let content = serde_json::to_string_pretty(&self.descriptor)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write schema fixture: {}", path.display()))?;
        Ok(path)
    }
}
