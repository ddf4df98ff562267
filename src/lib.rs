//! # comfy-link
//!
//! Async workflow-submission client for ComfyUI-style image-generation
//! engines.
//!
//! Builds declarative computation graphs for text-to-image and
//! image-to-image generation, submits them over the engine's HTTP API,
//! tracks completion through the engine's WebSocket push channel, and
//! downloads the produced artifacts.
//!
//! One generation is one logical job: submit, wait for the terminal event,
//! collect. Waiting is a plain async call with a hard deadline; drop the
//! future to abort it. Concurrent jobs work by invoking the client
//! concurrently, each wait owning its own channel connection.
//!
//! ## Quick Start
//!
//! ```no_run
//! use comfy_link::{EngineClient, GenerationRequest};
//! use std::time::Duration;
//!
//! # async fn example() -> comfy_link::Result<()> {
//! let client = EngineClient::new("http://127.0.0.1:8188");
//!
//! let graph = GenerationRequest::new("a lighthouse in a storm")
//!     .negative("lowres, blurry")
//!     .steps(25)
//!     .cfg(7.5)
//!     .text_to_image();
//!
//! let job_id = client.submit(&graph).await?;
//! let history = client.await_completion(&job_id, Duration::from_secs(120)).await?;
//! let images = client.collect_artifacts(&history).await?;
//!
//! for (i, bytes) in images.iter().enumerate() {
//!     std::fs::write(format!("output-{i}.png"), bytes).unwrap();
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod events;
pub mod graph;
pub mod types;
pub mod workflow;

pub use client::{EngineClient, DEFAULT_WAIT};
pub use error::{EngineError, Result};
pub use graph::{NodeInput, NodeLink, WorkflowGraph, WorkflowNode};
pub use types::{ArtifactRef, HistoryRecord, NodeOutput};
pub use workflow::{GenerationRequest, CHECKPOINT};
