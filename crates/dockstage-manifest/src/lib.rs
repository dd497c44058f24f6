//! dockstage build manifest
//!
//! Parses `dockstage.kdl` files into a [`BuildManifest`]: the Dockerfile
//! instructions, image names, build options and registry credentials for
//! one image build.

pub mod error;
pub mod model;
pub mod parser;

pub use error::{ManifestError, Result};
pub use model::BuildManifest;
pub use parser::{parse_manifest_file, parse_manifest_string};
