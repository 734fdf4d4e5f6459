//! kiln-core: recipe model and provisioning engine for kiln.
//!
//! This crate provides the building blocks the `kiln` binary is made of:
//! - `recipe`: the declarative recipe format (base image, build units,
//!   typed steps, entrypoint), parsing and validation
//! - `lower`: pure translation of steps into executable invocations
//! - `provision`: sequential fail-fast execution against a build root
//! - `image`: the manifest written after a fully successful run
//! - `platform`: host snapshot for diagnostics

pub mod error;
pub mod image;
pub mod lower;
pub mod platform;
pub mod provision;
pub mod recipe;

pub use error::{FetchError, ProvisionError, RecipeError, StepError};
pub use image::ImageManifest;
pub use lower::Invocation;
pub use provision::{Phase, ProvisionOptions, ProvisionReport, Provisioner};
pub use recipe::{BuildUnit, EntrypointSpec, Recipe, Step};
