use crate::models::{Category, CategoryIndex, CompanyProfile, CompanyProfiles, RawTable, Workbook};

/// Inverts one category table: every non-empty cell value maps to the set of
/// column labels it appears under. Both sides are trimmed.
pub fn build_category_index(table: &RawTable) -> CategoryIndex {
    let mut index = CategoryIndex::new();

    for column in &table.columns {
        let label = column.label.trim();
        for value in column.cells.iter().flatten().filter(|v| !v.is_empty()) {
            index
                .entry(value.trim().to_string())
                .or_default()
                .insert(label.to_string());
        }
    }

    index
}

/// Folds the three category indexes into one profile per company.
///
/// A company present in a single index still gets a full record, with the
/// other two categories left as empty sets.
pub fn merge_profiles(
    products: &CategoryIndex,
    sectors: &CategoryIndex,
    countries: &CategoryIndex,
) -> CompanyProfiles {
    let mut profiles = CompanyProfiles::default();

    for (category, index) in [
        (Category::Products, products),
        (Category::Sectors, sectors),
        (Category::Countries, countries),
    ] {
        for (company, labels) in index {
            let profile = profiles
                .0
                .entry(company.clone())
                .or_insert_with(CompanyProfile::default);
            *profile.tags_mut(category) = labels.clone();
        }
    }

    profiles
}

impl CompanyProfiles {
    pub fn build(workbook: &Workbook) -> Self {
        let products = build_category_index(&workbook.products);
        let sectors = build_category_index(&workbook.sectors);
        let countries = build_category_index(&workbook.countries);

        tracing::debug!(
            "Built category indexes: {} products, {} sectors, {} countries",
            products.len(),
            sectors.len(),
            countries.len()
        );

        merge_profiles(&products, &sectors, &countries)
    }
}
