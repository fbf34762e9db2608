pub mod loader;
pub mod utils;

pub use loader::WorkbookLoader;
