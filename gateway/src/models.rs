//! Payloads exchanged between pipeline stages
//!
//! The backend schemas are owned by the services themselves; the gateway
//! never interprets their contents. Each payload is still a typed envelope
//! over a JSON object, so a body that is not an object is rejected at the
//! client boundary instead of flowing through the pipeline unchecked.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured intent extracted from the deployment instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageContext(pub Map<String, Value>);

/// Structured facts extracted from the uploaded codebase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodebaseContext(pub Map<String, Value>);

/// A deployment plan produced from the two contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentSuggestion(pub Map<String, Value>);
