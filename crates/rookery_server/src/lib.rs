mod api;
mod server;

pub mod auth;
pub mod cache;
pub mod state;

pub use server::{RookeryServer, RookeryServerConfig};

pub mod prelude {
    pub use crate::auth::*;
    pub use crate::cache::*;
    pub use crate::server::*;
    pub use crate::state::*;
}
