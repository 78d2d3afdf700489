//! Framekeeper-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across framekeeper:
//!
//! - **Probed values**: [`Probed`] distinguishes a recognised attribute from an
//!   unrecognised raw token, so nothing downstream can mistake one for the other
//! - **Media enumerations**: the closed sets of colour primaries, matrix
//!   coefficients, field orders, frame rates, aspect ratios and heights
//! - **Encode parameters**: the codec family, container and filter settings a
//!   transcode is driven by
//! - **Path Utilities**: derived-asset naming and extension checks
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use framekeeper_common::{AspectRatio, Height, MediaProfile, Probed};
//!
//! let mut profile = MediaProfile::unknown();
//! profile.height = Probed::Known(Height::H576);
//! profile.aspect_ratio = Probed::Known(AspectRatio::FourByThree);
//!
//! assert!(!profile.is_fully_known());
//! assert_eq!(profile.unknown_fields(), vec!["colour_primaries", "matrix_coefficients", "field_order", "frame_rate"]);
//! ```

pub mod error;
pub mod params;
pub mod paths;
pub mod profile;
pub mod types;

pub use error::{Error, Result};
pub use params::*;
pub use profile::MediaProfile;
pub use types::*;
