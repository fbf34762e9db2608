use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};

use crate::error::AppError;
use crate::models::{Category, CompanyProfiles, LeadRecord, LeadTags, MatchOutcome, MatchResult};

/// External CRM field identifier -> category it carries tags for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    fields: HashMap<String, Category>,
}

impl FieldMap {
    pub fn new<I>(entries: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (String, Category)>,
    {
        let mut fields = HashMap::new();
        for (field_id, category) in entries {
            if let Some(previous) = fields.insert(field_id.clone(), category) {
                return Err(AppError::InvalidInput(format!(
                    "Field id {} is mapped to both {} and {}",
                    field_id, previous, category
                )));
            }
        }
        Ok(Self { fields })
    }

    pub fn category(&self, field_id: &str) -> Option<Category> {
        self.fields.get(field_id).copied()
    }
}

/// Collects the values of the known custom fields into per-category lists,
/// in encounter order. Unknown keys are ignored.
pub fn extract_lead_tags(fields: &Map<String, Value>, field_map: &FieldMap) -> LeadTags {
    let mut tags = LeadTags::default();

    for (field_id, value) in fields {
        if let Some(category) = field_map.category(field_id) {
            push_value(&mut tags, category, value);
        }
    }

    tags
}

fn push_value(tags: &mut LeadTags, category: Category, value: &Value) {
    match value {
        // unset custom field
        Value::Null => {}
        Value::String(s) => tags.push(category, s.clone()),
        Value::Array(items) => {
            for item in items {
                push_value(tags, category, item);
            }
        }
        Value::Number(n) => tags.push(category, n.to_string()),
        Value::Bool(b) => tags.push(category, b.to_string()),
        Value::Object(_) => {
            tracing::warn!("Ignoring object value for {} field", category);
        }
    }
}

impl LeadRecord {
    /// Validates a raw CRM lead object once, at the boundary.
    pub fn from_fields(fields: Map<String, Value>, field_map: &FieldMap) -> Self {
        let tags = extract_lead_tags(&fields, field_map);

        let mut id = None;
        let mut title = None;
        let mut ignored = Map::new();
        for (key, value) in fields {
            if field_map.category(&key).is_some() {
                continue;
            }
            let value = match (key.as_str(), value) {
                ("id", Value::String(s)) => {
                    id = Some(s);
                    continue;
                }
                ("id", Value::Number(n)) => {
                    id = Some(n.to_string());
                    continue;
                }
                ("title", Value::String(s)) => {
                    title = Some(s);
                    continue;
                }
                (_, value) => value,
            };
            ignored.insert(key, value);
        }

        tracing::trace!("Lead {:?}: {} fields ignored", id, ignored.len());
        Self { id, title, tags, ignored }
    }
}

/// Companies sharing at least one tag with the lead in any category.
pub fn find_matches(tags: &LeadTags, profiles: &CompanyProfiles) -> MatchResult {
    let wanted: Vec<(Category, BTreeSet<&str>)> = Category::ALL
        .iter()
        .map(|c| (*c, tags.values(*c).iter().map(String::as_str).collect()))
        .collect();

    profiles
        .iter()
        .filter(|(_, profile)| {
            wanted.iter().any(|(category, lead_values)| {
                profile
                    .tags(*category)
                    .iter()
                    .any(|tag| lead_values.contains(tag.as_str()))
            })
        })
        .map(|(company, _)| company.clone())
        .collect()
}

/// Like [`find_matches`] but keeps "lead has no tags" apart from "nothing matched".
pub fn evaluate_lead(tags: &LeadTags, profiles: &CompanyProfiles) -> MatchOutcome {
    if tags.is_empty() {
        return MatchOutcome::NoTags;
    }

    let matches = find_matches(tags, profiles);
    if matches.is_empty() {
        MatchOutcome::NoMatches
    } else {
        MatchOutcome::Matches { companies: matches.into_iter().collect() }
    }
}

/// First lead carrying exactly this title.
pub fn select_lead<'a>(leads: &'a [LeadRecord], title: &str) -> Result<&'a LeadRecord, AppError> {
    if title.trim().is_empty() {
        return Err(AppError::InvalidInput("No lead selected".to_string()));
    }
    leads
        .iter()
        .find(|lead| lead.title.as_deref() == Some(title))
        .ok_or_else(|| AppError::LeadNotFound(title.to_string()))
}

/// Titles offered for selection: leads without a title are left out.
pub fn lead_titles(leads: &[LeadRecord]) -> Vec<String> {
    leads
        .iter()
        .filter_map(|lead| lead.title.as_deref())
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .collect()
}
