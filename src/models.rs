use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The three fixed groupings a company or a lead is tagged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Products,
    Sectors,
    Countries,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Products, Category::Sectors, Category::Countries];

    /// Name of the workbook sheet holding this category.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Category::Products => "Products",
            Category::Sectors => "Sectors",
            Category::Countries => "Countries",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawColumn {
    pub label: String,
    pub cells: Vec<Option<String>>,
}

impl RawColumn {
    pub fn new(label: impl Into<String>, cells: Vec<Option<String>>) -> Self {
        Self { label: label.into(), cells }
    }
}

/// One sheet of the workbook, column-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<RawColumn>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, columns: Vec<RawColumn>) -> Self {
        Self { name: name.into(), columns }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn row_count(&self) -> usize {
        self.columns.iter().map(|c| c.cells.len()).max().unwrap_or(0)
    }
}

/// The three category tables read from one workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workbook {
    pub products: RawTable,
    pub sectors: RawTable,
    pub countries: RawTable,
}

/// Trimmed cell value -> trimmed labels of the columns it appeared under.
pub type CategoryIndex = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompanyProfile {
    #[serde(rename = "Products")]
    pub products: BTreeSet<String>,
    #[serde(rename = "Sectors")]
    pub sectors: BTreeSet<String>,
    #[serde(rename = "Countries")]
    pub countries: BTreeSet<String>,
}

impl CompanyProfile {
    pub fn tags(&self, category: Category) -> &BTreeSet<String> {
        match category {
            Category::Products => &self.products,
            Category::Sectors => &self.sectors,
            Category::Countries => &self.countries,
        }
    }

    pub fn tags_mut(&mut self, category: Category) -> &mut BTreeSet<String> {
        match category {
            Category::Products => &mut self.products,
            Category::Sectors => &mut self.sectors,
            Category::Countries => &mut self.countries,
        }
    }
}

/// Company name -> profile. Built once per session and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CompanyProfiles(pub BTreeMap<String, CompanyProfile>);

impl CompanyProfiles {
    pub fn get(&self, company: &str) -> Option<&CompanyProfile> {
        self.0.get(company)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CompanyProfile)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeadTags {
    #[serde(rename = "Products")]
    pub products: Vec<String>,
    #[serde(rename = "Sectors")]
    pub sectors: Vec<String>,
    #[serde(rename = "Countries")]
    pub countries: Vec<String>,
}

impl LeadTags {
    pub fn values(&self, category: Category) -> &[String] {
        match category {
            Category::Products => &self.products,
            Category::Sectors => &self.sectors,
            Category::Countries => &self.countries,
        }
    }

    pub fn push(&mut self, category: Category, value: String) {
        match category {
            Category::Products => self.products.push(value),
            Category::Sectors => self.sectors.push(value),
            Category::Countries => self.countries.push(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.values(*c).is_empty())
    }
}

/// A CRM lead after boundary validation: the known tag fields are typed,
/// everything else is kept aside untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub tags: LeadTags,
    #[serde(skip)]
    pub ignored: Map<String, Value>,
}

/// Set of matching company names. Iterates in ascending order.
pub type MatchResult = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// The lead has no value in any of the three categories.
    NoTags,
    NoMatches,
    Matches { companies: Vec<String> },
}
