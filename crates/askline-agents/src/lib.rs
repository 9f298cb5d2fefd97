//! Question-answering pipeline for Askline.
//!
//! A [`Supervisor`] routes each query through model-backed workers
//! (difficulty classification, prompt enhancement, direct answer,
//! response synthesis) and a retrieval strategy, recording every stage
//! in a step log.

pub mod decode;
pub mod error;
pub mod llm;
pub mod retrieval;
pub mod steps;
pub mod supervisor;
pub mod workers;

pub use error::AgentError;
pub use llm::{GeminiClient, TextGenerator};
pub use retrieval::{
    retriever_from_config, LiveRetriever, RetrievalMode, Retriever, SimulatedRetriever,
};
pub use steps::{NoopObserver, StepObserver};
pub use supervisor::Supervisor;
pub use workers::{
    DifficultyClassifier, DirectAnswerer, Outcome, PromptEnhancer, ResponseSynthesizer,
};
