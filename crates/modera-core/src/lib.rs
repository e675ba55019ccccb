//! Modera Core - moderation domain logic.
//!
//! This crate holds everything that does not touch persistence or HTTP
//! routing:
//!
//! - [`SafetyStatus`]: the three-tier safety classification
//! - [`MediaKind`] and upload validation rules
//! - Parsing of raw AI vision output into a structured verdict, with the
//!   fail-open fallback policy
//! - The [`ClassificationGateway`] trait and its OpenAI-compatible
//!   implementation
//! - The text Q&A client backing the `/api/ask` pass-through

pub mod analysis;
pub mod chat;
pub mod gateway;
pub mod media;
pub mod safety;

pub use analysis::{normalize_moderator_tags, normalize_tag_name, parse_analysis, ParsedAnalysis};
pub use chat::{ChatClient, ChatConfig, ChatError};
pub use gateway::{ClassificationGateway, GatewayFailure, OpenAiVisionGateway, VisionConfig};
pub use media::{validate_upload, MediaKind, ValidationError, MAX_UPLOAD_SIZE};
pub use safety::SafetyStatus;
