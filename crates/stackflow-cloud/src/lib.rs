//! StackFlow resource graph
//!
//! This crate holds the declarative side of StackFlow: stacks of resource
//! declarations, reference tokens between them, and synthesis of the whole
//! graph into a cloud assembly (one template per stack plus a manifest)
//! for an external provisioning engine.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                stackflow CLI                  │
//! │              (stackflow synth)                │
//! └──────────────────┬───────────────────────────┘
//!                    │
//! ┌──────────────────▼───────────────────────────┐
//! │               stackflow-stacks                │
//! │   network → stateful → compute → delivery     │
//! └──────────────────┬───────────────────────────┘
//!                    │ Stack::add(Resource)
//! ┌──────────────────▼───────────────────────────┐
//! │               stackflow-cloud                 │
//! │  ┌────────────┐ ┌──────────┐ ┌─────────────┐ │
//! │  │ App/Stack  │ │  Tokens  │ │  Assembly   │ │
//! │  └────────────┘ └──────────┘ └─────────────┘ │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! References between resources are carried as tokens until synthesis.
//! A token that stays inside its stack becomes `Ref`/`Fn::GetAtt`; one that
//! crosses into a later stack becomes an `Export` on the producer and an
//! `Fn::ImportValue` on the consumer.

pub mod app;
pub mod assembly;
pub mod error;
pub mod resource;
pub mod stack;
pub mod token;

// Re-exports
pub use app::App;
pub use assembly::{ArtifactManifest, ArtifactProperties, CloudAssembly, Manifest, StackArtifact};
pub use error::{CloudError, Result};
pub use resource::{RemovalPolicy, Resource, ResourceRef};
pub use stack::{Stack, StackProps};
pub use token::Reference;
