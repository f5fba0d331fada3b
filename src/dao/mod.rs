/// Storage engines and the trait they implement.
pub mod game_store;
/// Validation in front of every write.
pub mod integrity;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
