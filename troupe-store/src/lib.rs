pub mod app_config;
pub mod catalog_repo;
pub mod events;
pub mod group_repo;
pub mod interest_repo;

pub use catalog_repo::MemoryDestinationRepository;
pub use events::EventBus;
pub use group_repo::MemoryGroupRepository;
pub use interest_repo::MemoryInterestRepository;
