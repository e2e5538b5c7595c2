//! # abrasf
//!
//! Brazilian NFS-e (municipal service invoice) library following the ABRASF
//! standard: Lote RPS assembly, per-municipality XML dialects, XML-DSig
//! signature placement, and SOAP envelope parts.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating point.
//! Tax rates are stored as fractions (`0.02` = 2%), the way ABRASF 2.x
//! schemas expect them on the wire.
//!
//! ## Quick Start
//!
//! ```rust
//! use abrasf::core::*;
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let item = ItemServico {
//!     valor_servicos: dec!(150.00),
//!     valor_iss: dec!(3.00),
//!     aliquota: dec!(0.02),
//!     iss_retido: false,
//!     descricao: "Consultoria em TI".into(),
//!     codigo_municipio: Some("3106200".into()),
//!     exigibilidade_iss: Some(ExigibilidadeIss::Exigivel),
//! };
//! let servico = aggregate_servico(&[item], "1401", &AggregationPolicy::default()).unwrap();
//!
//! let rps = RpsBuilder::new("1", "A", TipoRps::Rps, parse_data_emissao("2026-03-10T09:30:00").unwrap())
//!     .competencia(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
//!     .servico(servico)
//!     .tomador(
//!         TomadorBuilder::new("12.345.678/0001-99", "Cliente Exemplo Ltda")
//!             .endereco(
//!                 EnderecoBuilder::new("Rua das Flores", "100", "Centro", "3106200", "MG", "30130-010")
//!                     .build(),
//!             )
//!             .build(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let lote = LoteBuilder::new("lote1", 1)
//!     .prestador("45.987.654/0001-21", "123456")
//!     .add_rps(rps)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(lote.quantidade_rps, 1);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Domain types, normalization, aggregation, builders, business rules |
//! | `xml` | `EnviarLoteRpsEnvio` / `CompNfse` serializers per municipal schema |
//! | `dsig` | XML-DSig signature placement (RPS and batch scopes) |
//! | `soap` | SOAP envelope parts (cabecalho + dados) and transport boundary |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "xml")]
pub mod xml;

#[cfg(feature = "dsig")]
pub mod dsig;

#[cfg(feature = "soap")]
pub mod soap;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
