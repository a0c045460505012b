pub mod cache;
pub mod conditional;
pub mod config;
pub mod error;
pub mod guard;
pub mod identity;
pub mod listing;
pub mod object;
pub mod traits;

pub mod prelude {
    pub use super::cache::*;
    pub use super::conditional::*;
    pub use super::config::*;
    pub use super::error::*;
    pub use super::guard::*;
    pub use super::identity::*;
    pub use super::listing::*;
    pub use super::object::*;
    pub use super::traits::*;
}
