pub mod builder;
pub mod config;
pub mod constants;
pub mod convert;
pub mod ddl;
pub mod error;
pub mod executor;
pub mod lock;
pub mod migrate;
pub mod refresh;
pub mod rollback;
pub mod schema;

pub use error::{CksrError, Result};
