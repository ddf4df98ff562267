//! Workflow Builder: generation parameters in, concrete graph out.
//!
//! Pure construction, no I/O and no parameter-range validation. Both shapes
//! share a scaffold (checkpoint, text encoders, sampler, decode, save) and
//! differ only in how node `"4"`, the sampler's latent source, is produced:
//! an empty latent for text-to-image, a VAE-encoded uploaded image for
//! image-to-image.

use rand::Rng;

use crate::graph::{WorkflowGraph, WorkflowNode};

/// Checkpoint loaded by every graph. Model selection is not exposed to
/// callers; changing the model means changing this constant.
pub const CHECKPOINT: &str = "sd_xl_base_1.0.safetensors";

const NODE_CHECKPOINT: &str = "1";
const NODE_POSITIVE: &str = "2";
const NODE_NEGATIVE: &str = "3";
const NODE_LATENT: &str = "4";
const NODE_SAMPLER: &str = "5";
const NODE_DECODE: &str = "6";
const NODE_SAVE: &str = "7";
const NODE_SOURCE_IMAGE: &str = "8";

/// Parameters for one generation.
///
/// Defaults mirror the engine deployment this crate was written against:
/// 20 steps, cfg 7.0, `euler`/`normal`, 512x512 output. Denoise strength is
/// resolved at build time (1.0 for text-to-image, 0.75 for image-to-image)
/// unless set explicitly. A missing seed is replaced by a uniform random
/// 32-bit value when the graph is built, so the submitted graph is always
/// fully concrete.
///
/// # Example
/// ```
/// use comfy_link::GenerationRequest;
///
/// let graph = GenerationRequest::new("a cat wearing a tiny hat")
///     .negative("lowres, blurry")
///     .steps(30)
///     .seed(42)
///     .text_to_image();
///
/// assert!(graph.dangling_links().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub steps: u32,
    pub cfg: f64,
    pub sampler: String,
    pub scheduler: String,
    pub denoise: Option<f64>,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u32>,
    pub filename_prefix: String,
}

impl GenerationRequest {
    /// Create a request with the given positive prompt and default sampling
    /// parameters.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: String::new(),
            steps: 20,
            cfg: 7.0,
            sampler: "euler".to_string(),
            scheduler: "normal".to_string(),
            denoise: None,
            width: 512,
            height: 512,
            seed: None,
            filename_prefix: "comfy-link".to_string(),
        }
    }

    /// Set the negative prompt.
    pub fn negative(mut self, prompt: impl Into<String>) -> Self {
        self.negative_prompt = prompt.into();
        self
    }

    /// Set the number of sampling steps.
    pub fn steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    /// Set the classifier-free guidance scale.
    pub fn cfg(mut self, cfg: f64) -> Self {
        self.cfg = cfg;
        self
    }

    /// Set the sampler algorithm (e.g. "euler", "dpmpp_2m").
    pub fn sampler(mut self, sampler: impl Into<String>) -> Self {
        self.sampler = sampler.into();
        self
    }

    /// Set the noise scheduler (e.g. "normal", "karras").
    pub fn scheduler(mut self, scheduler: impl Into<String>) -> Self {
        self.scheduler = scheduler.into();
        self
    }

    /// Set the denoise strength explicitly instead of the per-shape default.
    pub fn denoise(mut self, denoise: f64) -> Self {
        self.denoise = Some(denoise);
        self
    }

    /// Set output dimensions. Only text-to-image uses them; image-to-image
    /// keeps the source image's dimensions.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Pin the seed for reproducible output.
    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the filename prefix the save node writes artifacts under.
    pub fn filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.filename_prefix = prefix.into();
        self
    }

    /// Build the text-to-image graph: the latent starts empty at the
    /// requested dimensions.
    pub fn text_to_image(&self) -> WorkflowGraph {
        let mut graph = self.scaffold(self.denoise.unwrap_or(1.0));
        graph.insert(
            NODE_LATENT,
            WorkflowNode::new("EmptyLatentImage")
                .input("width", self.width)
                .input("height", self.height)
                .input("batch_size", 1u32),
        );
        graph
    }

    /// Build the image-to-image graph: the latent is the uploaded source
    /// image passed through the checkpoint's VAE.
    ///
    /// `source_filename` is the engine-side name returned by
    /// [`EngineClient::upload_image`](crate::EngineClient::upload_image).
    pub fn image_to_image(&self, source_filename: &str) -> WorkflowGraph {
        let mut graph = self.scaffold(self.denoise.unwrap_or(0.75));
        graph.insert(
            NODE_SOURCE_IMAGE,
            WorkflowNode::new("LoadImage")
                .input("image", source_filename)
                .input("upload", "image"),
        );
        graph.insert(
            NODE_LATENT,
            WorkflowNode::new("VAEEncode")
                .input("pixels", (NODE_SOURCE_IMAGE, 0))
                .input("vae", (NODE_CHECKPOINT, 2)),
        );
        graph
    }

    /// Nodes common to both shapes. The caller adds node `"4"`, the latent
    /// source the sampler reads from.
    fn scaffold(&self, denoise: f64) -> WorkflowGraph {
        let seed = self.seed.unwrap_or_else(|| rand::rng().random());

        let mut graph = WorkflowGraph::new();
        graph.insert(
            NODE_CHECKPOINT,
            WorkflowNode::new("CheckpointLoaderSimple").input("ckpt_name", CHECKPOINT),
        );
        graph.insert(
            NODE_POSITIVE,
            WorkflowNode::new("CLIPTextEncode")
                .input("text", self.prompt.clone())
                .input("clip", (NODE_CHECKPOINT, 1)),
        );
        graph.insert(
            NODE_NEGATIVE,
            WorkflowNode::new("CLIPTextEncode")
                .input("text", self.negative_prompt.clone())
                .input("clip", (NODE_CHECKPOINT, 1)),
        );
        graph.insert(
            NODE_SAMPLER,
            WorkflowNode::new("KSampler")
                .input("seed", seed)
                .input("steps", self.steps)
                .input("cfg", self.cfg)
                .input("sampler_name", self.sampler.clone())
                .input("scheduler", self.scheduler.clone())
                .input("denoise", denoise)
                .input("model", (NODE_CHECKPOINT, 0))
                .input("positive", (NODE_POSITIVE, 0))
                .input("negative", (NODE_NEGATIVE, 0))
                .input("latent_image", (NODE_LATENT, 0)),
        );
        graph.insert(
            NODE_DECODE,
            WorkflowNode::new("VAEDecode")
                .input("samples", (NODE_SAMPLER, 0))
                .input("vae", (NODE_CHECKPOINT, 2)),
        );
        graph.insert(
            NODE_SAVE,
            WorkflowNode::new("SaveImage")
                .input("filename_prefix", self.filename_prefix.clone())
                .input("images", (NODE_DECODE, 0)),
        );
        graph
    }
}
