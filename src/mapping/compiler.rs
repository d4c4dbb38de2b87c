//! The mapping compiler.
//!
//! Turns a raw [`IndexerConfig`] into a validated [`MappingModel`], or
//! fails with a configuration error and returns no model at all. The
//! phases run in a strict order because later phases resolve references
//! created by earlier ones:
//!
//! 1. field type declarations
//! 2. global index fields (reference field types by name)
//! 3. index fields nested in mapping cases, qualified as
//!    `<recordType>.<name>`
//! 4. versioned content mapping cases with their field bindings
//! 5. non-versioned content mapping cases with their field bindings
//! 6. the optional default search field
//!
//! Each phase fails fast on the first structural problem it finds, so
//! errors are deterministic for a given input.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{Result, TernError};
use crate::mapping::config::{
    DerefConfig, IndexFieldConfig, IndexerConfig, MASTER_FOLLOW, MappingCaseConfig, ValueConfig,
};
use crate::mapping::model::{
    Follow, IndexField, IndexFieldBinding, IndexFieldType, LinkFieldFollow, MappingModel,
    MasterFollow, RecordTypeMapping, Scope, ValueSource,
};

/// Name prefix reserved for internally synthesized index fields. User
/// configuration can never claim it.
pub const RESERVED_NAME_PREFIX: &str = "@@";

/// Compile a JSON configuration document into a mapping model.
pub fn compile(json: &str) -> Result<MappingModel> {
    let config = IndexerConfig::from_json(json).map_err(|e| {
        TernError::configuration(format!("Error parsing supplied indexer configuration: {e}"))
    })?;
    compile_config(&config)
}

/// Compile an already-parsed configuration into a mapping model.
pub fn compile_config(config: &IndexerConfig) -> Result<MappingModel> {
    let mut compiler = Compiler {
        model: MappingModel::new(),
    };
    compiler.build_field_types(config)?;
    compiler.build_global_fields(config)?;
    compiler.build_nested_fields(config)?;
    compiler.build_versioned_mappings(config)?;
    compiler.build_non_versioned_mappings(config)?;
    compiler.build_default_search_field(config);
    Ok(compiler.model)
}

struct Compiler {
    model: MappingModel,
}

impl Compiler {
    fn build_field_types(&mut self, config: &IndexerConfig) -> Result<()> {
        for field_type in &config.field_types {
            validate_name(&field_type.name)?;
            if self.model.field_type(&field_type.name).is_some() {
                return Err(TernError::configuration(format!(
                    "Duplicate field type name {}",
                    field_type.name
                )));
            }
            self.model.insert_field_type(Arc::new(IndexFieldType::new(
                &field_type.name,
                &field_type.class,
            )));
        }
        Ok(())
    }

    fn build_global_fields(&mut self, config: &IndexerConfig) -> Result<()> {
        for field in &config.global_fields {
            let name = field.name.as_deref().ok_or_else(|| {
                TernError::configuration("A global index field requires a name")
            })?;
            validate_name(name)?;
            if self.model.field(name).is_some() {
                return Err(TernError::configuration(format!(
                    "Duplicate field name {name}"
                )));
            }
            let index_field = self.build_index_field(name, field)?;
            self.model.insert_field(Arc::new(index_field));
        }
        Ok(())
    }

    /// Register every named field declared inside a mapping case, under its
    /// qualified `<recordType>.<name>` form. Entries without a name are refs
    /// and are resolved later, during binding construction.
    fn build_nested_fields(&mut self, config: &IndexerConfig) -> Result<()> {
        let cases = config
            .versioned_mappings
            .iter()
            .chain(config.non_versioned_mappings.iter());
        for case in cases {
            for field in &case.fields {
                let Some(name) = field.name.as_deref() else {
                    continue;
                };
                validate_name(name)?;
                let qualified = qualify(&case.record_type, name);
                if self.model.field(&qualified).is_some() {
                    return Err(TernError::configuration(format!(
                        "Duplicate field name {name} (record type {})",
                        case.record_type
                    )));
                }
                let index_field = self.build_index_field(&qualified, field)?;
                self.model.insert_field(Arc::new(index_field));
            }
        }
        Ok(())
    }

    fn build_index_field(&self, name: &str, field: &IndexFieldConfig) -> Result<IndexField> {
        let type_name = field.field_type.as_deref().ok_or_else(|| {
            TernError::configuration(format!("Index field {name} requires a type"))
        })?;
        let field_type = self.model.field_type(type_name).ok_or_else(|| {
            TernError::configuration(format!(
                "Reference to undefined type {type_name} for field {name}"
            ))
        })?;
        Ok(IndexField::new(
            name,
            field_type.clone(),
            field.indexed,
            field.stored,
            field.multi_value,
        ))
    }

    fn build_versioned_mappings(&mut self, config: &IndexerConfig) -> Result<()> {
        for case in &config.versioned_mappings {
            let tags_csv = case.version_tags.as_deref().ok_or_else(|| {
                TernError::configuration(format!(
                    "Versioned content mapping for record type {} requires version tags",
                    case.record_type
                ))
            })?;
            let version_tags = parse_csv(tags_csv);

            for tag in &version_tags {
                if self
                    .model
                    .versioned_mapping(&case.record_type, tag)
                    .is_some()
                {
                    return Err(TernError::configuration(format!(
                        "Duplicate versioned content mapping for record type {} and version tag {tag}",
                        case.record_type
                    )));
                }
            }

            let mapping = self.build_case(case, Scope::Versioned, version_tags.clone())?;
            let mapping = Arc::new(mapping);
            for tag in &version_tags {
                self.model
                    .insert_versioned_mapping(&case.record_type, tag, mapping.clone());
            }
        }
        Ok(())
    }

    fn build_non_versioned_mappings(&mut self, config: &IndexerConfig) -> Result<()> {
        for case in &config.non_versioned_mappings {
            if self
                .model
                .non_versioned_mapping(&case.record_type)
                .is_some()
            {
                return Err(TernError::configuration(format!(
                    "Duplicate non-versioned content mapping for record type {}",
                    case.record_type
                )));
            }
            let mapping = self.build_case(case, Scope::NonVersioned, BTreeSet::new())?;
            self.model
                .insert_non_versioned_mapping(&case.record_type, Arc::new(mapping));
        }
        Ok(())
    }

    fn build_case(
        &self,
        case: &MappingCaseConfig,
        scope: Scope,
        version_tags: BTreeSet<String>,
    ) -> Result<RecordTypeMapping> {
        let mut mapping = RecordTypeMapping::new(&case.record_type, version_tags);
        for field in &case.fields {
            mapping.add_binding(self.build_binding(&case.record_type, field, scope)?);
        }
        Ok(mapping)
    }

    fn build_binding(
        &self,
        record_type: &str,
        field: &IndexFieldConfig,
        scope: Scope,
    ) -> Result<IndexFieldBinding> {
        let index_field = match (&field.name, &field.reference) {
            (Some(name), None) => {
                let qualified = qualify(record_type, name);
                // Registered during the nested-fields phase; a miss here is
                // a compiler bug, not a configuration error.
                self.model.field(&qualified).ok_or_else(|| {
                    TernError::other(format!(
                        "Index field not found: {qualified} (report this as a bug)"
                    ))
                })?
            }
            (None, Some(reference)) => self.model.field(reference).ok_or_else(|| {
                TernError::configuration(format!(
                    "Index field refers to a non-existing field: {reference} (record type {record_type})"
                ))
            })?,
            _ => {
                return Err(TernError::configuration(format!(
                    "An index field binding requires a name or a ref attribute, but not both (record type {record_type})"
                )));
            }
        };

        let value = field.value.as_ref().ok_or_else(|| {
            TernError::configuration(format!(
                "Index field {} requires a value (record type {record_type})",
                index_field.name()
            ))
        })?;

        Ok(IndexFieldBinding::new(
            index_field.clone(),
            self.build_value(record_type, value, scope)?,
        ))
    }

    fn build_value(
        &self,
        record_type: &str,
        value: &ValueConfig,
        scope: Scope,
    ) -> Result<ValueSource> {
        match (&value.field, &value.deref) {
            (Some(field), None) => Ok(ValueSource::Field {
                field: field.clone(),
                scope,
            }),
            (None, Some(deref)) => self.build_deref_value(record_type, deref, scope),
            _ => Err(TernError::configuration(format!(
                "A value requires a field or a deref, but not both (record type {record_type})"
            ))),
        }
    }

    fn build_deref_value(
        &self,
        record_type: &str,
        deref: &DerefConfig,
        scope: Scope,
    ) -> Result<ValueSource> {
        if deref.follow.is_empty() {
            return Err(TernError::configuration(format!(
                "A deref value requires at least one follow (record type {record_type})"
            )));
        }

        let mut follows = Vec::with_capacity(deref.follow.len());
        for token in &deref.follow {
            if token == MASTER_FOLLOW {
                follows.push(Follow::Master(MasterFollow::new(&deref.field)));
            } else {
                validate_name(token)?;
                follows.push(Follow::LinkField(LinkFieldFollow::new(token)));
            }
        }

        // From the index's point of view the whole chain belongs to its
        // first link field; every hop carries that attribution.
        let owner = deref
            .follow
            .iter()
            .find(|token| *token != MASTER_FOLLOW)
            .unwrap_or(&deref.field)
            .clone();
        for follow in &mut follows {
            follow.set_owner_field(&owner);
        }

        Ok(ValueSource::Deref {
            follows,
            field: deref.field.clone(),
            scope,
        })
    }

    fn build_default_search_field(&mut self, config: &IndexerConfig) {
        if let Some(name) = &config.default_search_field
            && !name.is_empty()
        {
            self.model.set_default_search_field(name);
        }
    }
}

fn qualify(record_type: &str, name: &str) -> String {
    format!("{record_type}.{name}")
}

fn validate_name(name: &str) -> Result<()> {
    if name.starts_with(RESERVED_NAME_PREFIX) {
        return Err(TernError::configuration(format!(
            "Names starting with {RESERVED_NAME_PREFIX} are reserved for internal use. Name: {name}"
        )));
    }
    Ok(())
}

/// Parse a comma-separated set of names: entries are trimmed, empty entries
/// dropped.
fn parse_csv(input: &str) -> BTreeSet<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_types() -> &'static str {
        r#""field_types": [{ "name": "string", "class": "tern.StringIndexFieldType" }]"#
    }

    #[test]
    fn test_compile_empty_document() {
        let model = compile("{}").unwrap();
        assert_eq!(model.field_count(), 0);
        assert!(model.default_search_field().is_none());
    }

    #[test]
    fn test_duplicate_field_type_rejected() {
        let json = r#"{ "field_types": [
            { "name": "string", "class": "a.B" },
            { "name": "string", "class": "c.D" }
        ]}"#;
        let err = compile(json).unwrap_err();
        assert!(matches!(err, TernError::Configuration(_)));
        assert!(err.to_string().contains("Duplicate field type name string"));
    }

    #[test]
    fn test_reserved_prefix_rejected() {
        let json = r#"{ "field_types": [{ "name": "@@string", "class": "a.B" }] }"#;
        let err = compile(json).unwrap_err();
        assert!(err.to_string().contains("reserved for internal use"));
    }

    #[test]
    fn test_undefined_type_reference_rejected() {
        let json = r#"{ "global_fields": [{ "name": "manager", "type": "string" }] }"#;
        let err = compile(json).unwrap_err();
        assert!(matches!(err, TernError::Configuration(_)));
        assert!(err.to_string().contains("undefined type string"));
    }

    #[test]
    fn test_nested_field_names_are_qualified() {
        let json = format!(
            r#"{{ {},
            "versioned_mappings": [
                {{ "record_type": "Book", "version_tags": "live",
                   "fields": [{{ "name": "title", "type": "string", "value": {{ "field": "title" }} }}] }},
                {{ "record_type": "Author", "version_tags": "live",
                   "fields": [{{ "name": "title", "type": "string", "value": {{ "field": "title" }} }}] }}
            ]}}"#,
            minimal_types()
        );
        let model = compile(&json).unwrap();
        // Identical local names under different record types do not collide.
        assert!(model.field("Book.title").is_some());
        assert!(model.field("Author.title").is_some());
        assert!(model.field("title").is_none());
    }

    #[test]
    fn test_duplicate_version_tag_coverage_rejected() {
        let json = format!(
            r#"{{ {},
            "versioned_mappings": [
                {{ "record_type": "Book", "version_tags": "live, last",
                   "fields": [{{ "name": "a", "type": "string", "value": {{ "field": "a" }} }}] }},
                {{ "record_type": "Book", "version_tags": "live",
                   "fields": [{{ "name": "b", "type": "string", "value": {{ "field": "b" }} }}] }}
            ]}}"#,
            minimal_types()
        );
        let err = compile(&json).unwrap_err();
        assert!(err.to_string().contains("Duplicate versioned content mapping"));
        assert!(err.to_string().contains("version tag live"));
    }

    #[test]
    fn test_version_tag_csv_is_trimmed() {
        let json = format!(
            r#"{{ {},
            "versioned_mappings": [
                {{ "record_type": "Book", "version_tags": " live ,, last, ",
                   "fields": [{{ "name": "a", "type": "string", "value": {{ "field": "a" }} }}] }}
            ]}}"#,
            minimal_types()
        );
        let model = compile(&json).unwrap();
        assert!(model.versioned_mapping("Book", "live").is_some());
        assert!(model.versioned_mapping("Book", "last").is_some());
        assert!(model.versioned_mapping("Book", "").is_none());
        // One mapping shared by both tags.
        let live = model.versioned_mapping("Book", "live").unwrap();
        assert_eq!(live.version_tags().len(), 2);
    }

    #[test]
    fn test_binding_requires_name_xor_ref() {
        let both = format!(
            r#"{{ {},
            "global_fields": [{{ "name": "manager", "type": "string" }}],
            "non_versioned_mappings": [
                {{ "record_type": "Book",
                   "fields": [{{ "name": "manager", "type": "string", "ref": "manager",
                                "value": {{ "field": "manager" }} }}] }}
            ]}}"#,
            minimal_types()
        );
        // Having both attributes still registers the nested field, then the
        // binding phase rejects the combination.
        let err = compile(&both).unwrap_err();
        assert!(err.to_string().contains("name or a ref attribute"));

        let neither = format!(
            r#"{{ {},
            "non_versioned_mappings": [
                {{ "record_type": "Book", "fields": [{{ "value": {{ "field": "manager" }} }}] }}
            ]}}"#,
            minimal_types()
        );
        let err = compile(&neither).unwrap_err();
        assert!(err.to_string().contains("name or a ref attribute"));
    }

    #[test]
    fn test_ref_to_unknown_field_rejected() {
        let json = format!(
            r#"{{ {},
            "non_versioned_mappings": [
                {{ "record_type": "Book",
                   "fields": [{{ "ref": "manager", "value": {{ "field": "manager" }} }}] }}
            ]}}"#,
            minimal_types()
        );
        let err = compile(&json).unwrap_err();
        assert!(err.to_string().contains("non-existing field: manager"));
    }

    #[test]
    fn test_duplicate_non_versioned_mapping_rejected() {
        let json = format!(
            r#"{{ {},
            "non_versioned_mappings": [
                {{ "record_type": "Book",
                   "fields": [{{ "name": "a", "type": "string", "value": {{ "field": "a" }} }}] }},
                {{ "record_type": "Book",
                   "fields": [{{ "name": "b", "type": "string", "value": {{ "field": "b" }} }}] }}
            ]}}"#,
            minimal_types()
        );
        let err = compile(&json).unwrap_err();
        assert!(
            err.to_string()
                .contains("Duplicate non-versioned content mapping for record type Book")
        );
    }

    #[test]
    fn test_empty_deref_chain_rejected() {
        let json = format!(
            r#"{{ {},
            "versioned_mappings": [
                {{ "record_type": "Book", "version_tags": "live",
                   "fields": [{{ "name": "a", "type": "string",
                                "value": {{ "deref": {{ "follow": [], "field": "name" }} }} }}] }}
            ]}}"#,
            minimal_types()
        );
        let err = compile(&json).unwrap_err();
        assert!(err.to_string().contains("at least one follow"));
    }

    #[test]
    fn test_deref_owner_field_propagation() {
        let json = format!(
            r#"{{ {},
            "versioned_mappings": [
                {{ "record_type": "Book", "version_tags": "live",
                   "fields": [{{ "name": "publisher_city", "type": "string",
                                "value": {{ "deref": {{ "follow": ["author", "publisher"],
                                                       "field": "city" }} }} }}] }}
            ]}}"#,
            minimal_types()
        );
        let model = compile(&json).unwrap();
        let mapping = model.versioned_mapping("Book", "live").unwrap();
        let ValueSource::Deref { follows, field, scope } = mapping.bindings()[0].value() else {
            panic!("expected a deref value source");
        };
        assert_eq!(field, "city");
        assert_eq!(*scope, Scope::Versioned);
        assert_eq!(follows.len(), 2);
        // Every hop is attributed to the top-level link field.
        assert_eq!(follows[0].owner_field(), "author");
        assert_eq!(follows[1].owner_field(), "author");
    }

    #[test]
    fn test_master_follow_token() {
        let json = format!(
            r#"{{ {},
            "versioned_mappings": [
                {{ "record_type": "Book", "version_tags": "live",
                   "fields": [{{ "name": "master_title", "type": "string",
                                "value": {{ "deref": {{ "follow": ["@master"], "field": "title" }} }} }}] }}
            ]}}"#,
            minimal_types()
        );
        let model = compile(&json).unwrap();
        let mapping = model.versioned_mapping("Book", "live").unwrap();
        let ValueSource::Deref { follows, .. } = mapping.bindings()[0].value() else {
            panic!("expected a deref value source");
        };
        assert!(matches!(follows[0], Follow::Master(_)));
        // A chain without link hops is attributed to the target field.
        assert_eq!(follows[0].owner_field(), "title");
    }
}
