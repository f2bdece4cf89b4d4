//! Strategy Designer Core — the block-based visual language behind the
//! dashboard's strategy editor. Owns the block catalog, the condition and
//! action trees, semantic validation, and the bidirectional YAML /
//! Python-literal serialization of strategy documents. Rendering, strategy
//! execution and persistence live in other services; this crate ends at
//! the controller surface and the two HTTP endpoint callables.

pub mod alias;
pub mod catalog;
pub mod client;
pub mod controller;
pub mod import;
pub mod serialize;
pub mod tree;
pub mod validator;

pub use client::{EndpointError, HttpEndpoint, ImportRequest, SaveRequest, StrategyEndpoint};
pub use controller::{Derived, Designer, DropPayload, Status};
pub use import::{import, ImportResult};
pub use serialize::{build_document, to_python, to_yaml, ExportFormat};
pub use tree::{Config, ConfigValue, Forest, IdGen, Node, Section, SeqIds};
pub use validator::{validate, Validation};
