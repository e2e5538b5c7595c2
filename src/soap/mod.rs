//! SOAP envelope parts for ABRASF web services.
//!
//! Every ABRASF operation takes two string-valued parts: a fixed `cabecalho`
//! (header) declaring the schema version, and the signed payload as `dados`.
//! Transport itself — HTTP, TLS, retries — is the caller's concern behind
//! [`SoapTransmitter`]; nothing here performs I/O.

use crate::core::{MunicipalSchema, NfseError, xml_safe_text};

/// The fixed ABRASF header part.
pub fn cabecalho(schema: &MunicipalSchema) -> String {
    format!(
        "<cabecalho xmlns=\"{}\" versao=\"{}\"><versaoDados>{}</versaoDados></cabecalho>",
        schema.namespace, schema.versao, schema.versao
    )
}

/// A complete SOAP 1.1 envelope wrapping one ABRASF operation call.
/// Both parts travel as escaped text inside the operation element.
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    /// Operation name (e.g. "RecepcionarLoteRps").
    pub metodo: String,
    /// Service namespace of the municipal endpoint.
    pub namespace_servico: String,
    pub cabecalho: String,
    pub dados: String,
}

impl SoapEnvelope {
    pub fn new(
        metodo: impl Into<String>,
        namespace_servico: impl Into<String>,
        cabecalho: impl Into<String>,
        dados: impl Into<String>,
    ) -> Self {
        Self {
            metodo: metodo.into(),
            namespace_servico: namespace_servico.into(),
            cabecalho: cabecalho.into(),
            dados: dados.into(),
        }
    }

    pub fn to_xml(&self) -> String {
        format!(
            concat!(
                "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">",
                "<soap:Body>",
                "<{metodo} xmlns=\"{ns}\">",
                "<cabecalho>{cabecalho}</cabecalho>",
                "<dados>{dados}</dados>",
                "</{metodo}>",
                "</soap:Body>",
                "</soap:Envelope>"
            ),
            metodo = self.metodo,
            ns = self.namespace_servico,
            cabecalho = xml_safe_text(&self.cabecalho),
            dados = xml_safe_text(&self.dados),
        )
    }
}

/// Transport or SOAP fault surfaced by a [`SoapTransmitter`]. Carries the
/// last raw request/response so rejections with opaque municipal error codes
/// can be diagnosed offline. Never retried by this crate.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub message: String,
    pub last_request: String,
    pub last_response: Option<String>,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SOAP transport error: {}", self.message)
    }
}

impl std::error::Error for TransportError {}

/// External SOAP transmitter boundary. Retry and timeout policy live with
/// the implementation, not with the batch pipeline.
pub trait SoapTransmitter {
    fn call(
        &self,
        endpoint: &str,
        metodo: &str,
        cabecalho: &str,
        dados: &str,
    ) -> Result<String, TransportError>;
}

/// Convenience: the full "fail before you send" pipeline boundary. Builds
/// the envelope parts for an already-signed payload; the caller hands them
/// to its transmitter.
pub fn montar_partes(schema: &MunicipalSchema, dados_assinados: &str) -> (String, String) {
    (cabecalho(schema), dados_assinados.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MunicipalSchema;

    #[test]
    fn cabecalho_declares_version() {
        let header = cabecalho(&MunicipalSchema::abrasf_v204());
        assert!(header.contains("versao=\"2.04\""));
        assert!(header.contains("<versaoDados>2.04</versaoDados>"));
    }

    #[test]
    fn envelope_escapes_parts() {
        let env = SoapEnvelope::new(
            "RecepcionarLoteRps",
            "http://nfse.example.gov.br/ws",
            "<cabecalho/>",
            "<EnviarLoteRpsEnvio/>",
        );
        let xml = env.to_xml();
        assert!(xml.contains("<RecepcionarLoteRps xmlns=\"http://nfse.example.gov.br/ws\">"));
        assert!(xml.contains("&lt;EnviarLoteRpsEnvio/&gt;"));
        assert!(!xml.contains("<EnviarLoteRpsEnvio/>"));
    }
}
