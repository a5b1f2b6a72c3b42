pub mod db;

pub use db::store::PgStore;
