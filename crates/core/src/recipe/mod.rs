//! Recipe model: the declarative description of an image build.
//!
//! A recipe names a base image, an ordered list of build units (atomic
//! groups of typed steps), a build-time environment table, and the
//! entrypoint the produced image runs. Recipes are plain TOML, loaded with
//! serde and validated before anything touches the filesystem.

mod types;
mod validate;

pub use types::{BuildUnit, EntrypointSpec, Recipe, Step};
