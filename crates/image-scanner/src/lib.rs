#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ImageScanError`)
//! - [`reference`]: Image reference parser (`ImageReference`)
//! - [`settings`]: Config resolver (`ScanSettings`, `RegistrySettings`, `ClairSettings`, `CliOverrides`)
//! - [`manifest`]: Registry manifest decoding (`Manifest`)
//! - [`layers`]: Layer chain builder (`LayerChain`)
//! - [`credentials`]: Registry credential source (`CredentialProvider`, `StaticCredentials`)
//! - [`registry`]: Registry client (`RegistryClient` trait, `HttpRegistryClient`)
//! - [`clair`]: Vulnerability service client (`ClairClient` trait, `HttpClairClient`, `ScanRequest`)
//! - [`coordinator`]: Cleanup and per-layer submission loop (`ScanCoordinator`)
//! - [`policy`]: Policy evaluator (`PolicyThresholds`, `Verdict`)
//! - [`scanner`]: Main orchestrator (`ImageScanner`, `ScanOutcome`)
//!
//! # Architecture
//!
//! ```text
//! YairConfig + CliOverrides --> ScanSettings
//!                                    |
//! input --> ImageReference --> RegistryClient --> Manifest --> LayerChain
//!                                                                  |
//!                                                   ScanCoordinator (cleanup, submit)
//!                                                                  |
//!                                                    ClairClient (tip findings)
//!                                                                  |
//!                                                  policy::evaluate --> Verdict
//! ```

pub mod clair;
pub mod coordinator;
pub mod credentials;
pub mod error;
mod http;
pub mod layers;
pub mod manifest;
pub mod policy;
pub mod reference;
pub mod registry;
pub mod scanner;
pub mod settings;

// --- Public API Re-exports ---

// Scanner (main orchestrator)
pub use scanner::{ImageScanner, ScanOutcome};

// Error
pub use error::ImageScanError;

// Reference & settings
pub use reference::ImageReference;
pub use settings::{ClairSettings, CliOverrides, RegistrySettings, ScanSettings};

// Manifest & layers
pub use layers::LayerChain;
pub use manifest::Manifest;

// Clients
pub use clair::{ClairClient, CleanupOutcome, HttpClairClient, ScanRequest};
pub use credentials::{CredentialProvider, StaticCredentials};
pub use registry::{FetchedManifest, HttpRegistryClient, RegistryClient};

// Coordinator & policy
pub use coordinator::{ScanCoordinator, SubmissionReport};
pub use policy::{FailReason, PolicyThresholds, SeverityCounts, Verdict};
