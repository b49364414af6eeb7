pub mod issue_repository;
pub mod mock_db;
pub mod profile_repository;
