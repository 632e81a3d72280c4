//! Configuration module for Kikk.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    EmbeddingSettings, GeneralSettings, SearchSettings, Settings, StoreBackend, StoreSettings,
};
