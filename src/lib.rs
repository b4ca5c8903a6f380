pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub mod core {
    pub mod format;
    pub mod layout;
    pub mod service;
    pub mod store;
    pub mod summary;
    #[cfg(test)]
    pub mod test_utils;
}

pub mod io {
    pub mod exec;
    pub mod properties;
}

pub mod utils {
    pub mod util;
    pub mod util_intern;
}

pub mod constants;

pub use config::StoreConfig;
pub use crate::core::{
    format::VcfFormat,
    service::VcfStoreService,
    store::{VcfStore, VcfStream},
    summary::VcfSummary,
};
pub use error::{VcfStoreError, VcfStoreResult};
