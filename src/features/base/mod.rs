pub mod handler;
pub mod models;
pub mod resolver;
pub mod reward;

pub use handler::create_base_router;
pub use resolver::{SaveStore, resolve_base_save};
pub use reward::{LevelRewardBalancer, RewardBalancer};
