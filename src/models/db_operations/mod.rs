pub mod activity_db_operations;
pub mod resource_db_operations;
