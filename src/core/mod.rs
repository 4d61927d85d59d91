/// Read configuration: reader selection, field list, conflict policy and named parameters.
pub mod config;

/// Per-field layout and value cleaning.
pub mod field;

pub mod format;

/// Persistence collaborator used by the processors.
pub mod persistence;

pub mod reader;

pub mod sink;

pub mod source;
