/*!
 * Prompt management for translation and evaluation.
 *
 * This module provides:
 * - Built-in templates for every prompt kind
 * - A registry that renders templates with variable checking
 * - Convenience builders for the translation and evaluation prompt pairs
 */

pub mod registry;
pub mod templates;

pub use registry::{PromptPair, PromptRegistry, PromptSummary};
pub use templates::{PromptKind, PromptTemplate};
