pub mod repository;
pub mod wire;

pub use repository::RulesRepository;
pub use wire::parse_ruleset_document;
