//! dockstage image build functionality
//!
//! This crate stages a build description into a build context directory,
//! drives an external docker binary to build and tag the image, and pushes
//! the result to container registries.

pub mod auth;
pub mod builder;
pub mod error;
pub mod image;
pub mod options;
pub mod process;
pub mod processor;
pub mod pusher;
pub mod stage;

#[cfg(test)]
mod testing;

pub use auth::{DockerConfigAuth, RegistryCredentials};
pub use builder::ImageBuilder;
pub use error::{BuildError, CommandFailure, ErrorKind, Result};
pub use image::{ImageId, ImageName, parse_image_id};
pub use options::{BuildOptions, PullBaseImage, RemoveIntermediate};
pub use process::{
    CommandLine, CommandOutput, CommandRunner, LineSink, OutputStream, ProcessRunner, TracingSink,
};
pub use processor::{DefaultProcessor, Instruction, Processor};
pub use pusher::ImagePusher;
pub use stage::{DOCKERFILE_NAME, StageSource, StageWriter, StagedBuild};
