pub mod archive;
pub mod batch;
pub mod credentials;
pub mod enumerator;
pub mod exporter;
pub mod reconciler;
