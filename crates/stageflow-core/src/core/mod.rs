// crates/stageflow-core/src/core/mod.rs
// ============================================================================
// Module: Stageflow Core Types
// Description: Process model, definitions, paths, locks, issues, and results.
// Purpose: Provide the stable types shared by the loader, analyzer, and runtime.
// Dependencies: regex, serde, serde_json, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Core types are pure data. Raw [`definition`] types describe what authors
//! write; [`process`] types describe what the loader accepted; [`results`]
//! types describe what evaluation returns.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod definition;
pub mod hashing;
pub mod identifiers;
pub mod issues;
pub mod lock;
pub mod path;
pub mod process;
pub mod results;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use definition::ActionDefinition;
pub use definition::FieldAttributes;
pub use definition::FieldEntry;
pub use definition::FieldShape;
pub use definition::FieldSpecDefinition;
pub use definition::FieldsDefinition;
pub use definition::GateDefinition;
pub use definition::GatesDefinition;
pub use definition::LockDefinition;
pub use definition::LockGroupDefinition;
pub use definition::LockList;
pub use definition::LockMetadata;
pub use definition::OrderedMap;
pub use definition::ProcessDefinition;
pub use definition::StageDefinition;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::canonical_digest;
pub use identifiers::GateName;
pub use identifiers::ProcessName;
pub use identifiers::StageId;
pub use issues::Issue;
pub use issues::IssueLocation;
pub use issues::IssueType;
pub use issues::Severity;
pub use lock::LengthBound;
pub use lock::Lock;
pub use lock::LockCondition;
pub use lock::LockPattern;
pub use lock::LockType;
pub use lock::ValueKind;
pub use path::PathAccessor;
pub use path::PathError;
pub use path::PathFilter;
pub use path::PathSegment;
pub use path::PropertyPath;
pub use process::ActionSpec;
pub use process::FieldSpec;
pub use process::Gate;
pub use process::Process;
pub use process::ProcessParts;
pub use process::RegressionPolicy;
pub use process::Stage;
pub use results::Action;
pub use results::ActionSource;
pub use results::ActionType;
pub use results::EvaluationResult;
pub use results::FailureReason;
pub use results::GateResult;
pub use results::LockResult;
pub use results::RegressionDetails;
pub use results::RegressionKind;
pub use results::StageResult;
pub use results::StageStatus;
