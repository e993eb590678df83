mod database {
    pub mod actions;
    pub mod error;
    pub mod forms;
    pub mod pagination;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;
mod error;

mod report {
    pub mod shopping_list;
}

pub use authentication::*;
pub use constants::*;
pub use database::*;
pub use error::{ApiError, Error};
pub use report::*;
