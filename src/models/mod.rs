pub mod issue;
pub mod profile;
pub mod user;
