pub mod crm_client;
pub mod excel;
pub mod matching;
pub mod session_store;
