pub use rookery_core::*;

#[cfg(feature = "server")]
pub mod server {
    pub use rookery_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use rookery_client::*;
}

#[cfg(feature = "fs")]
pub mod fs {
    pub use rookery_fs::*;
}

#[cfg(feature = "file_auth")]
pub mod auth_file {
    pub use rookery_auth_file::*;
}

#[cfg(feature = "s3")]
pub mod s3 {
    pub use rookery_s3::*;
}

#[cfg(feature = "opendal")]
pub mod opendal {
    pub use rookery_opendal::*;
}

pub mod prelude {
    pub use rookery_core::prelude::*;

    #[cfg(feature = "server")]
    pub use rookery_server::prelude::*;

    #[cfg(feature = "client")]
    pub use rookery_client::{Credentials, RookeryClient};

    #[cfg(feature = "fs")]
    pub use rookery_fs::FileSystemStorage;

    #[cfg(feature = "file_auth")]
    pub use rookery_auth_file::CredentialStore;

    #[cfg(feature = "s3")]
    pub use rookery_s3::S3Storage;

    #[cfg(feature = "opendal")]
    pub use rookery_opendal::OpendalStorage;
}
