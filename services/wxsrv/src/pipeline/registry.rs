//! Field registry
//!
//! Compiled form of the static field table. Loading compiles every key
//! pattern and formula once and rejects the table when a pattern or formula
//! is invalid, a unit option list has no single canonical entry, or two
//! fields of one vocabulary can claim the same key.

use crate::error::PipelineError;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;
use wx_calc::ConversionExpr;
use wx_model::{FieldSpec, UnitGroup, Vocabulary, FIELDS};

/// Instance suffixes tried when probing wildcard patterns for overlaps
const PROBE_INSTANCES: [&str; 3] = ["", "1", "10"];

#[derive(Debug, Clone)]
pub struct CompiledSource {
    pub pattern: Regex,
    pub to_canonical: Option<ConversionExpr>,
}

#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub display_unit: &'static str,
    pub to_canonical: Option<ConversionExpr>,
    pub from_canonical: Option<ConversionExpr>,
}

#[derive(Debug, Clone)]
pub struct CompiledField {
    pub spec: &'static FieldSpec,
    sources: [Option<CompiledSource>; 3],
    units: Vec<CompiledUnit>,
}

impl CompiledField {
    pub fn id(&self) -> &'static str {
        self.spec.id
    }

    pub fn source(&self, vocabulary: Vocabulary) -> Option<&CompiledSource> {
        self.sources[slot(vocabulary)].as_ref()
    }

    pub fn units(&self) -> &[CompiledUnit] {
        &self.units
    }

    pub fn unit(&self, display_unit: &str) -> Option<&CompiledUnit> {
        self.units.iter().find(|u| u.display_unit == display_unit)
    }

    /// Canonical storage unit
    pub fn canonical_unit(&self) -> Option<&'static str> {
        self.spec.unit
    }
}

#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: Vec<CompiledField>,
    by_id: HashMap<&'static str, usize>,
}

impl FieldRegistry {
    /// Compile and validate the built-in field table.
    pub fn builtin() -> Result<Self, PipelineError> {
        Self::load(FIELDS)
    }

    pub fn load(specs: &'static [FieldSpec]) -> Result<Self, PipelineError> {
        let mut fields = Vec::with_capacity(specs.len());
        let mut by_id = HashMap::with_capacity(specs.len());

        for spec in specs {
            if by_id.insert(spec.id, fields.len()).is_some() {
                return Err(PipelineError::DuplicateField(spec.id.to_string()));
            }
            fields.push(compile_field(spec)?);
        }

        let registry = Self { fields, by_id };
        for vocabulary in Vocabulary::ALL {
            registry.check_overlaps(vocabulary)?;
        }

        debug!("Field registry loaded: {} fields", registry.fields.len());
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&CompiledField> {
        self.by_id.get(id).map(|&i| &self.fields[i])
    }

    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    /// Field claiming `key` in `vocabulary`, with the captured instance
    /// index if the pattern has one and it is non-empty.
    pub fn resolve(
        &self,
        vocabulary: Vocabulary,
        key: &str,
    ) -> Option<(&CompiledField, Option<String>)> {
        self.fields.iter().find_map(|field| {
            let source = field.source(vocabulary)?;
            let caps = source.pattern.captures(key)?;
            let instance = caps
                .get(1)
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            Some((field, instance))
        })
    }

    /// Every display unit some field of `group` can be stored in
    pub fn units_for_group(&self, group: UnitGroup) -> Vec<&'static str> {
        let mut units: Vec<&'static str> = Vec::new();
        for field in self.fields.iter().filter(|f| f.spec.unit_group == Some(group)) {
            for unit in &field.units {
                if !units.contains(&unit.display_unit) {
                    units.push(unit.display_unit);
                }
            }
        }
        units
    }

    fn check_overlaps(&self, vocabulary: Vocabulary) -> Result<(), PipelineError> {
        for field in &self.fields {
            let Some(source) = field.source(vocabulary) else {
                continue;
            };
            let Some(mapping) = field.spec.source(vocabulary) else {
                continue;
            };
            for key in sample_keys(mapping.pattern, &source.pattern) {
                for other in &self.fields {
                    if other.id() == field.id() {
                        continue;
                    }
                    let claimed = other
                        .source(vocabulary)
                        .is_some_and(|s| s.pattern.is_match(&key));
                    if claimed {
                        return Err(PipelineError::AmbiguousKey {
                            vocabulary,
                            key,
                            first: field.id().to_string(),
                            second: other.id().to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn slot(vocabulary: Vocabulary) -> usize {
    match vocabulary {
        Vocabulary::DeviceBinary => 0,
        Vocabulary::Wunderground => 1,
        Vocabulary::Ecowitt => 2,
    }
}

fn compile_field(spec: &'static FieldSpec) -> Result<CompiledField, PipelineError> {
    if spec.channels.is_empty() {
        return Err(PipelineError::NoChannel {
            field: spec.id.to_string(),
        });
    }

    let mut sources: [Option<CompiledSource>; 3] = [None, None, None];
    for vocabulary in Vocabulary::ALL {
        let Some(mapping) = spec.source(vocabulary) else {
            continue;
        };
        let pattern = compile_pattern(spec.id, vocabulary, mapping.pattern)?;
        let to_canonical = compile_formula(spec.id, mapping.to_canonical)?;
        sources[slot(vocabulary)] = Some(CompiledSource {
            pattern,
            to_canonical,
        });
    }

    let units = spec
        .unit_options
        .iter()
        .map(|option| {
            Ok(CompiledUnit {
                display_unit: option.display_unit,
                to_canonical: compile_formula(spec.id, option.to_canonical)?,
                from_canonical: compile_formula(spec.id, option.from_canonical)?,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    if !units.is_empty() {
        let canonical: Vec<_> = units.iter().filter(|u| u.to_canonical.is_none()).collect();
        if canonical.len() != 1 {
            return Err(PipelineError::UnitOptions {
                field: spec.id.to_string(),
                reason: format!("{} canonical entries, expected 1", canonical.len()),
            });
        }
        if Some(canonical[0].display_unit) != spec.unit {
            return Err(PipelineError::UnitOptions {
                field: spec.id.to_string(),
                reason: format!(
                    "canonical entry '{}' differs from storage unit {:?}",
                    canonical[0].display_unit, spec.unit
                ),
            });
        }
    }

    Ok(CompiledField {
        spec,
        sources,
        units,
    })
}

fn compile_pattern(
    field: &str,
    vocabulary: Vocabulary,
    pattern: &str,
) -> Result<Regex, PipelineError> {
    let invalid = |reason: String| PipelineError::InvalidPattern {
        field: field.to_string(),
        vocabulary,
        reason,
    };

    let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| invalid(e.to_string()))?;
    // group 0 is the whole match
    if regex.captures_len() > 2 {
        return Err(invalid("more than one capture group".to_string()));
    }
    Ok(regex)
}

fn compile_formula(
    field: &str,
    formula: Option<&str>,
) -> Result<Option<ConversionExpr>, PipelineError> {
    formula
        .map(ConversionExpr::compile)
        .transpose()
        .map_err(|source| PipelineError::InvalidFormula {
            field: field.to_string(),
            source,
        })
}

/// Literal keys a pattern accepts, for overlap probing.
///
/// A literal pattern is its own sample. A pattern with one group between
/// literal text is sampled by filling the group with a few instance
/// suffixes. Anything else cannot be sampled and is skipped.
fn sample_keys(pattern: &str, compiled: &Regex) -> Vec<String> {
    if regex::escape(pattern) == pattern {
        return vec![pattern.to_string()];
    }

    let (Some(open), Some(close)) = (pattern.find('('), pattern.rfind(')')) else {
        return Vec::new();
    };
    let (prefix, suffix) = (&pattern[..open], &pattern[close + 1..]);
    if regex::escape(prefix) != prefix || regex::escape(suffix) != suffix {
        return Vec::new();
    }

    PROBE_INSTANCES
        .iter()
        .map(|instance| format!("{prefix}{instance}{suffix}"))
        .filter(|key| compiled.is_match(key))
        .collect()
}
