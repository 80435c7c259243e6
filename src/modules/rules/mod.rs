pub mod domain;
pub mod infrastructure;
pub mod memory;

pub use domain::{NewRoutingRule, RoutingRule, RuleRepository, RuleWithDestinations};
pub use infrastructure::RuleRepositoryImpl;
pub use memory::MemoryRuleRepository;
