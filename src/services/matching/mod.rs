pub mod index;
pub mod matcher;

pub use matcher::{evaluate_lead, lead_titles, select_lead, FieldMap};
