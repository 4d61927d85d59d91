/// This module provides a fixed-width batch file reader and a matching line writer.
pub mod fixed;

/// This module provides a delimited (comma or tab separated) batch file reader.
pub mod delimited;

#[cfg(feature = "xml")]
/// This module provides an XML batch file reader running its parser on a worker thread.
pub mod xml;
