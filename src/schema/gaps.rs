//! Schema-aware gap filling.
//!
//! Compares the top-level attributes a template references against the
//! full schema of its entity type and proposes a supplementary section for
//! everything left out. The proposal is a pure function of the template's
//! AST and the descriptor: the template is never modified, and the same
//! inputs always produce the same fragment in the same order.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;

use super::descriptor::{AttributeGroup, SchemaAttribute, SchemaDescriptor, SemanticType};
use crate::templating::ast::Ast;
use crate::templating::context::TODAY;
use crate::templating::error::ParseError;
use crate::templating::parser::{self, IDENTIFIER};

/// Heading used when no title is configured.
pub const DEFAULT_SECTION_TITLE: &str = "Additional Details";

/// Pattern passed to `datetime` in generated snippets.
pub const DEFAULT_DATETIME_FORMAT: &str = "%B %-d, %Y %H:%M";

/// Loop binding used for generated collection sections.
const ITEM_BINDING: &str = "item";

/// Field shown for references whose schema names no display field.
const DEFAULT_DISPLAY_FIELD: &str = "Name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapOptions {
    pub section_title: String,
    pub datetime_format: String,
}

impl Default for GapOptions {
    fn default() -> Self {
        Self {
            section_title: DEFAULT_SECTION_TITLE.to_string(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
        }
    }
}

/// One schema attribute the template never references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposedAttribute {
    pub name: String,
    pub kind: SemanticType,
    pub group: AttributeGroup,
    pub label: String,
}

/// Supplementary content for attributes a template leaves out.
///
/// `source` is template text the caller may append, show for approval, or
/// discard; `fragment` is the same text already parsed.
#[derive(Debug, Clone, Serialize)]
pub struct GapProposal {
    pub entity: String,
    pub schema_version: u64,
    pub attributes: Vec<ProposedAttribute>,
    /// Schema attributes left out because they cannot be written as a path.
    pub skipped: Vec<String>,
    pub source: String,
    #[serde(skip)]
    pub fragment: Ast,
}

impl GapProposal {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }
}

/// Top-level record attributes referenced anywhere in `ast`.
///
/// Loop-bound names and `_today` are not record attributes and are left
/// out; `Customer.Name` counts as a reference to `Customer`.
pub fn referenced_attributes(ast: &Ast) -> BTreeSet<String> {
    let mut referenced = BTreeSet::new();
    ast.walk_paths(|path, bindings| {
        let head = path.head();
        if head != TODAY && !bindings.contains(&head) {
            referenced.insert(head.to_string());
        }
    });
    referenced
}

/// Propose content for every schema attribute `ast` does not reference.
///
/// Attributes are grouped as short text, dates, amounts, references and
/// collections, in that order, and keep schema order within a group.
/// Fails only if the generated fragment does not parse, which can happen
/// when `options.datetime_format` is not a valid pattern.
pub fn propose(ast: &Ast, schema: &SchemaDescriptor, options: &GapOptions) -> Result<GapProposal, ParseError> {
    let referenced = referenced_attributes(ast);
    let mut skipped = Vec::new();

    let mut unreferenced: Vec<&SchemaAttribute> = schema
        .attributes
        .iter()
        .filter(|attribute| !referenced.contains(&attribute.name))
        .filter(|attribute| {
            let usable = is_usable_name(&attribute.name);
            if !usable {
                skipped.push(attribute.name.clone());
            }
            usable
        })
        .collect();
    // Stable sort keeps schema order inside each group.
    unreferenced.sort_by_key(|attribute| attribute.kind.group());

    let source = fragment_source(&unreferenced, options);
    let fragment = parser::parse(&source)?;

    let attributes: Vec<ProposedAttribute> = unreferenced
        .iter()
        .map(|attribute| ProposedAttribute {
            name: attribute.name.clone(),
            kind: attribute.kind,
            group: attribute.kind.group(),
            label: attribute.display_label(),
        })
        .collect();

    tracing::debug!(
        entity = %schema.entity,
        schema_version = schema.version,
        referenced = referenced.len(),
        proposed = attributes.len(),
        skipped = skipped.len(),
        "computed gap proposal"
    );

    Ok(GapProposal {
        entity: schema.entity.clone(),
        schema_version: schema.version,
        attributes,
        skipped,
        source,
        fragment,
    })
}

fn is_usable_name(name: &str) -> bool {
    name != TODAY && IDENTIFIER.is_match(name)
}

fn fragment_source(attributes: &[&SchemaAttribute], options: &GapOptions) -> String {
    if attributes.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let _ = write!(out, "\n## {}\n\n", plain(&options.section_title));
    for attribute in attributes {
        let name = &attribute.name;
        let label = plain(&attribute.display_label());
        match attribute.kind {
            SemanticType::Collection => {
                let _ = write!(out, "{{% if {name} %}}\n### {label}\n\n{{% for {ITEM_BINDING} in {name} %}}- ");
                out.push_str(&item_line(attribute, options));
                out.push_str("\n{% endfor %}\n{% endif %}");
            }
            _ => {
                let snippet = snippet(name, attribute, options);
                let _ = write!(out, "{{% if {name} %}}- **{label}:** {snippet}\n{{% endif %}}");
            }
        }
    }
    out
}

/// Expression rendering one attribute at `path`.
fn snippet(path: &str, attribute: &SchemaAttribute, options: &GapOptions) -> String {
    match attribute.kind {
        SemanticType::Text | SemanticType::Number => format!("{{{{ {path} }}}}"),
        SemanticType::Currency => format!("{{{{ {path} | currency }}}}"),
        SemanticType::Date => format!("{{{{ {path} | date }}}}"),
        SemanticType::DateTime => {
            format!("{{{{ {path} | datetime('{}') }}}}", escape_literal(&options.datetime_format))
        }
        SemanticType::Reference => {
            let display = attribute
                .display_field
                .as_deref()
                .filter(|field| IDENTIFIER.is_match(field))
                .unwrap_or(DEFAULT_DISPLAY_FIELD);
            format!("{{{{ {path}.{display} }}}}")
        }
        // Nested collections have no single-line rendering.
        SemanticType::Collection => String::new(),
    }
}

fn item_line(collection: &SchemaAttribute, options: &GapOptions) -> String {
    let parts: Vec<String> = collection
        .fields
        .iter()
        .filter(|field| field.kind != SemanticType::Collection && IDENTIFIER.is_match(&field.name))
        .map(|field| snippet(&format!("{ITEM_BINDING}.{}", field.name), field, options))
        .collect();

    if parts.is_empty() {
        format!("{{{{ {ITEM_BINDING} }}}}")
    } else {
        parts.join(", ")
    }
}

/// Labels become literal text, so braces that could open a delimiter go.
fn plain(text: &str) -> String {
    text.replace(['{', '}'], "")
}

fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templating::ast::Node;

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new("ChangeOrder", 1)
            .with_attribute(SchemaAttribute::new("Number", SemanticType::Text))
            .with_attribute(SchemaAttribute::new("Description", SemanticType::Text))
            .with_attribute(SchemaAttribute::new("Priority", SemanticType::Text))
            .with_attribute(SchemaAttribute::new("InternalNotes", SemanticType::Text))
    }

    fn ast(source: &str) -> Ast {
        parser::parse(source).unwrap()
    }

    #[test]
    fn test_proposes_unreferenced_attributes() {
        let template = ast("# {{ Number }}\n\n{{ Description }}");
        let proposal = propose(&template, &schema(), &GapOptions::default()).unwrap();

        assert_eq!(proposal.names(), vec!["Priority", "InternalNotes"]);
        assert_eq!(proposal.attributes[1].label, "Internal Notes");
        assert!(proposal.skipped.is_empty());
        assert!(proposal.source.contains("## Additional Details"));
        assert!(proposal.source.contains("{% if Priority %}- **Priority:** {{ Priority }}"));
        assert!(!proposal.fragment.nodes.is_empty());
    }

    #[test]
    fn test_proposal_is_deterministic() {
        let template = ast("{{ Number }} {{ Description }}");
        let first = propose(&template, &schema(), &GapOptions::default()).unwrap();
        let second = propose(&template, &schema(), &GapOptions::default()).unwrap();
        assert_eq!(first.names(), second.names());
        assert_eq!(first.source, second.source);
        assert_eq!(first.fragment, second.fragment);
    }

    #[test]
    fn test_groups_by_semantic_type() {
        let schema = SchemaDescriptor::new("Invoice", 2)
            .with_attribute(SchemaAttribute::new("Lines", SemanticType::Collection))
            .with_attribute(SchemaAttribute::new("Total", SemanticType::Currency))
            .with_attribute(SchemaAttribute::new("Customer", SemanticType::Reference))
            .with_attribute(SchemaAttribute::new("IssuedOn", SemanticType::Date))
            .with_attribute(SchemaAttribute::new("Reference", SemanticType::Text))
            .with_attribute(SchemaAttribute::new("Quantity", SemanticType::Number))
            .with_attribute(SchemaAttribute::new("SentAt", SemanticType::DateTime))
            .with_attribute(SchemaAttribute::new("Memo", SemanticType::Text));

        let proposal = propose(&ast("static"), &schema, &GapOptions::default()).unwrap();
        assert_eq!(
            proposal.names(),
            vec!["Reference", "Memo", "IssuedOn", "SentAt", "Total", "Quantity", "Customer", "Lines"]
        );
    }

    #[test]
    fn test_references_through_nested_paths_and_conditions() {
        let schema = SchemaDescriptor::new("Rfi", 1)
            .with_attribute(SchemaAttribute::new("Customer", SemanticType::Reference))
            .with_attribute(SchemaAttribute::new("Answered", SemanticType::Text))
            .with_attribute(SchemaAttribute::new("Items", SemanticType::Collection))
            .with_attribute(SchemaAttribute::new("Subject", SemanticType::Text));

        let template = ast("{{ Customer.Name }}{% if Answered %}yes{% endif %}{% for i in Items %}{{ i.Subject }}{% endfor %}");
        let proposal = propose(&template, &schema, &GapOptions::default()).unwrap();
        // `i.Subject` is an item field, not the record's Subject.
        assert_eq!(proposal.names(), vec!["Subject"]);
    }

    #[test]
    fn test_loop_bindings_and_today_are_not_references() {
        let template = ast("{{ _today | date }}{% for Priority in Lines %}{{ Priority }}{% endfor %}");
        let referenced = referenced_attributes(&template);
        assert_eq!(referenced.into_iter().collect::<Vec<_>>(), vec!["Lines".to_string()]);
    }

    #[test]
    fn test_fully_covered_template_proposes_nothing() {
        let template = ast("{{ Number }}{{ Description }}{{ Priority }}{{ InternalNotes }}");
        let proposal = propose(&template, &schema(), &GapOptions::default()).unwrap();
        assert!(proposal.is_empty());
        assert_eq!(proposal.source, "");
        assert!(proposal.fragment.nodes.is_empty());
    }

    #[test]
    fn test_invalid_names_are_skipped() {
        let schema = SchemaDescriptor::new("X", 1)
            .with_attribute(SchemaAttribute::new("Due Date", SemanticType::Date))
            .with_attribute(SchemaAttribute::new("_today", SemanticType::Date))
            .with_attribute(SchemaAttribute::new("Ok", SemanticType::Text));
        let proposal = propose(&ast(""), &schema, &GapOptions::default()).unwrap();
        assert_eq!(proposal.names(), vec!["Ok"]);
        assert_eq!(proposal.skipped, vec!["Due Date".to_string(), "_today".to_string()]);
    }

    #[test]
    fn test_snippets_use_type_appropriate_filters() {
        let schema = SchemaDescriptor::new("CO", 1)
            .with_attribute(SchemaAttribute::new("Amount", SemanticType::Currency))
            .with_attribute(SchemaAttribute::new("DueOn", SemanticType::Date))
            .with_attribute(SchemaAttribute::new("SignedAt", SemanticType::DateTime))
            .with_attribute(SchemaAttribute::new("Vendor", SemanticType::Reference).with_display_field("Company"))
            .with_attribute(
                SchemaAttribute::new("Items", SemanticType::Collection).with_fields(vec![
                    SchemaAttribute::new("Description", SemanticType::Text),
                    SchemaAttribute::new("Cost", SemanticType::Currency),
                ]),
            );

        let options = GapOptions {
            section_title: "More".to_string(),
            datetime_format: "%d %b %Y".to_string(),
        };
        let proposal = propose(&ast(""), &schema, &options).unwrap();
        let source = &proposal.source;

        assert!(source.starts_with("\n## More\n"));
        assert!(source.contains("{{ Amount | currency }}"));
        assert!(source.contains("{{ DueOn | date }}"));
        assert!(source.contains("{{ SignedAt | datetime('%d %b %Y') }}"));
        assert!(source.contains("{{ Vendor.Company }}"));
        assert!(source.contains("{% for item in Items %}- {{ item.Description }}, {{ item.Cost | currency }}"));
        assert!(proposal.fragment.nodes.iter().any(|n| matches!(n, Node::Conditional { .. })));
    }

    #[test]
    fn test_invalid_datetime_format_fails_to_parse() {
        let schema = SchemaDescriptor::new("CO", 1).with_attribute(SchemaAttribute::new("At", SemanticType::DateTime));
        let options = GapOptions {
            datetime_format: "%Q".to_string(),
            ..GapOptions::default()
        };
        assert!(propose(&ast(""), &schema, &options).is_err());
    }
}
