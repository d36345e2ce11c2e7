pub mod artifacts;
pub mod buildspec;
pub mod descriptor;
pub mod document;
pub mod emit;
pub mod error;
pub mod image;
pub mod registry;
pub mod secrets;
pub mod tls;
pub mod transform;

pub use artifacts::Artifacts;
pub use buildspec::{BuildRequest, BuildSpec, ImageBuild};
pub use descriptor::{Descriptor, load_descriptor, parse_descriptor};
pub use document::{Map, Node};
pub use error::{DeployError, Result};
pub use image::{ImageRef, TargetOs};
pub use registry::{ExistingSecret, STACK_NAMESPACE_LABEL, SecretRegistry};
pub use tls::{CertificateIssuer, GeneratedCert, SelfSignedIssuer};
pub use transform::{TransformOptions, Transformer};
