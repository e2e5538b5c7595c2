//! ABRASF XML generation.
//!
//! Two distinct serialization targets share the declaration writer:
//!
//! - **Batch envelope** (`EnviarLoteRpsEnvio`) — [`gerar_xml_lote_rps`],
//!   what gets signed and submitted.
//! - **Issued invoice** (`CompNfse`) — [`gerar_xml_comp_nfse`], the
//!   representation of an invoice the municipality already issued.
//!
//! # Example
//!
//! ```no_run
//! use abrasf::core::*;
//! use abrasf::xml;
//!
//! let lote: Lote = todo!(); // build via LoteBuilder
//! let schema = MunicipalSchema::abrasf_v204();
//! let unsigned = xml::gerar_xml_lote_rps(&lote, &schema).unwrap();
//! ```

mod lote;
mod nfse;
pub(crate) mod xml_utils;

pub use lote::{declaracao_id, gerar_xml_lote_rps};
pub use nfse::gerar_xml_comp_nfse;
pub use xml_utils::check_wellformed;
