//! Attribute schema of an entity type.
//!
//! Descriptors are read-only inputs supplied by an external collaborator.
//! They list every attribute an entity type exposes, in schema order,
//! tagged with a semantic type that decides how gap filling presents it.

use serde::{Deserialize, Serialize};

/// Semantic type tag of a schema attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Text,
    Number,
    Currency,
    Date,
    #[serde(alias = "date_time", alias = "date-time")]
    DateTime,
    Reference,
    Collection,
}

impl SemanticType {
    /// Presentation group used to order gap-fill proposals.
    pub fn group(self) -> AttributeGroup {
        match self {
            SemanticType::Text => AttributeGroup::Text,
            SemanticType::Date | SemanticType::DateTime => AttributeGroup::Dates,
            SemanticType::Number | SemanticType::Currency => AttributeGroup::Amounts,
            SemanticType::Reference => AttributeGroup::References,
            SemanticType::Collection => AttributeGroup::Collections,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SemanticType::Text => "text",
            SemanticType::Number => "number",
            SemanticType::Currency => "currency",
            SemanticType::Date => "date",
            SemanticType::DateTime => "datetime",
            SemanticType::Reference => "reference",
            SemanticType::Collection => "collection",
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Proposal groups, declared in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeGroup {
    Text,
    Dates,
    Amounts,
    References,
    Collections,
}

/// One attribute of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaAttribute {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: SemanticType,

    /// Human label; derived from the name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Field shown for a reference, e.g. `Name` for `Customer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_field: Option<String>,

    /// Item fields of a collection, or fields of a referenced entity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SchemaAttribute>,
}

impl SchemaAttribute {
    pub fn new(name: impl Into<String>, kind: SemanticType) -> Self {
        Self {
            name: name.into(),
            kind,
            label: None,
            display_field: None,
            fields: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_display_field(mut self, field: impl Into<String>) -> Self {
        self.display_field = Some(field.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<SchemaAttribute>) -> Self {
        self.fields = fields;
        self
    }

    /// Explicit label, or the name split at case boundaries and underscores.
    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| humanize(&self.name))
    }
}

/// Full attribute schema of one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub entity: String,

    /// Bumped by the schema owner whenever attributes change.
    #[serde(default)]
    pub version: u64,

    #[serde(default)]
    pub attributes: Vec<SchemaAttribute>,
}

impl SchemaDescriptor {
    pub fn new(entity: impl Into<String>, version: u64) -> Self {
        Self {
            entity: entity.into(),
            version,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: SchemaAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// `InternalNotes` → `Internal Notes`, `due_date` → `Due Date`,
/// `PONumber` → `PO Number`.
pub fn humanize(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let boundary = c.is_uppercase()
            && !current.is_empty()
            && match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
        if boundary {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .into_iter()
        .map(|word| {
            let mut letters = word.chars();
            match letters.next() {
                Some(first) => first.to_uppercase().chain(letters).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
