//! XML-DSig signature placement over serialized batch documents.
//!
//! The cryptographic primitive is external (see [`XmlSigner`]); this module
//! owns everything around it: target location by tag, Id assignment and
//! uniqueness, sibling-after insertion, reference verification, and the
//! fail-closed signature count.
//!
//! # Example
//!
//! ```no_run
//! use abrasf::core::MunicipalSchema;
//! use abrasf::dsig::{self, XmlSigner};
//!
//! let schema = MunicipalSchema::abrasf_v204();
//! let signer: Box<dyn XmlSigner> = todo!(); // certificate-backed implementation
//! let unsigned: String = todo!();           // from xml::gerar_xml_lote_rps
//! let signed = dsig::sign_document(&unsigned, &schema, signer.as_ref()).unwrap();
//! ```

pub mod dom;
mod engine;
mod signer;

pub use engine::sign_document;
pub use signer::{CertificateHandle, SignRequest, XmlSigner, load_certificate};
