// ABOUTME: Validated domain types shared across the pipeline.
// ABOUTME: Image references, cluster resource names, and redacted secrets.

mod image_ref;
mod resource_name;
mod secret;

pub use image_ref::{ImageRef, ParseImageRefError};
pub use resource_name::{ResourceName, ResourceNameError};
pub use secret::Secret;
