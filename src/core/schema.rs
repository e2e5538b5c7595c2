//! Per-municipality schema descriptors.
//!
//! Municipal NFS-e providers all speak "ABRASF", but each with its own
//! namespace, tag layout, date grammar, decimal precision, and signing
//! granularity. Instead of one serializer per city, a single algorithm is
//! parameterized by one of these declarative descriptors.

use super::normalize::DateStyle;

/// What to do with a blank recipient name. Providers disagree: some default
/// it, others reject the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankNamePolicy {
    /// Substitute a fixed placeholder at serialization time.
    Placeholder,
    /// Hard-fail during the business-rule pass.
    Reject,
}

/// Digest algorithm the external XML-DSig primitive must use.
/// SHA-256 unless the municipality explicitly mandates SHA-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha1,
}

/// Declarative description of one municipal ABRASF dialect.
#[derive(Debug, Clone)]
pub struct MunicipalSchema {
    /// Human-readable dialect name.
    pub nome: &'static str,
    /// Target namespace of the batch envelope.
    pub namespace: &'static str,
    /// Schema-version attribute value (e.g. "2.04").
    pub versao: &'static str,
    /// Tag of the signed per-RPS declaration node.
    pub declaracao_tag: &'static str,
    pub date_style: DateStyle,
    /// Fraction digits of Aliquota on the wire (2 or 4).
    pub rate_decimals: u32,
    /// ABRASF 2.x wraps the prestador document in `<CpfCnpj><Cnpj>…`; 1.x
    /// emits `<Cnpj>` bare. The tomador document is wrapped in both.
    pub cpf_cnpj_wrapped: bool,
    pub emit_competencia: bool,
    pub emit_exigibilidade: bool,
    pub emit_construcao_civil: bool,
    /// IBS/CBS reform fields — only schemas on the reform revision.
    pub emit_reforma_tributaria: bool,
    pub blank_tomador_name: BlankNamePolicy,
    pub tomador_name_placeholder: &'static str,
    /// Sign each per-RPS declaration node.
    pub sign_rps: bool,
    /// Sign the batch root after the RPS scope.
    pub sign_lote: bool,
    pub digest: DigestAlgorithm,
    /// Maximum length of Discriminacao (characters).
    pub max_discriminacao: usize,
    /// Maximum length of RazaoSocial (characters).
    pub max_razao_social: usize,
}

impl MunicipalSchema {
    /// Generic ABRASF 2.04 dialect: the national schema as published,
    /// both signature scopes, strict recipient name.
    pub fn abrasf_v204() -> Self {
        Self {
            nome: "ABRASF 2.04",
            namespace: "http://www.abrasf.org.br/nfse.xsd",
            versao: "2.04",
            declaracao_tag: "InfDeclaracaoPrestacaoServico",
            date_style: DateStyle::IsoDateTime,
            rate_decimals: 4,
            cpf_cnpj_wrapped: true,
            emit_competencia: true,
            emit_exigibilidade: true,
            emit_construcao_civil: true,
            emit_reforma_tributaria: true,
            blank_tomador_name: BlankNamePolicy::Reject,
            tomador_name_placeholder: "NAO INFORMADO",
            sign_rps: true,
            sign_lote: true,
            digest: DigestAlgorithm::Sha256,
            max_discriminacao: 2000,
            max_razao_social: 150,
        }
    }

    /// Ginfes provider dialect (ABRASF 1.00 layout): `InfRps` declarations,
    /// no competence/exigibility elements, lenient recipient name, SHA-1
    /// still mandated by the provider.
    pub fn ginfes() -> Self {
        Self {
            nome: "Ginfes (ABRASF 1.00)",
            namespace: "http://www.ginfes.com.br/servico_enviar_lote_rps_envio_v03.xsd",
            versao: "1.00",
            declaracao_tag: "InfRps",
            date_style: DateStyle::IsoDateTime,
            rate_decimals: 4,
            cpf_cnpj_wrapped: false,
            emit_competencia: false,
            emit_exigibilidade: false,
            emit_construcao_civil: true,
            emit_reforma_tributaria: false,
            blank_tomador_name: BlankNamePolicy::Placeholder,
            tomador_name_placeholder: "NAO INFORMADO",
            sign_rps: true,
            sign_lote: true,
            digest: DigestAlgorithm::Sha1,
            max_discriminacao: 2000,
            max_razao_social: 115,
        }
    }

    /// ISSNet provider dialect: compact `YYYYMMDD` dates, 2-decimal rates,
    /// signs only the RPS scope (batch signing is a provider no-op).
    pub fn issnet() -> Self {
        Self {
            nome: "ISSNet",
            namespace: "http://www.issnetonline.com.br/webserviceabrasf/vsd/servico_enviar_lote_rps_envio.xsd",
            versao: "2.02",
            declaracao_tag: "InfDeclaracaoPrestacaoServico",
            date_style: DateStyle::Compact,
            rate_decimals: 2,
            cpf_cnpj_wrapped: true,
            emit_competencia: true,
            emit_exigibilidade: true,
            emit_construcao_civil: false,
            emit_reforma_tributaria: false,
            blank_tomador_name: BlankNamePolicy::Placeholder,
            tomador_name_placeholder: "NAO INFORMADO",
            sign_rps: true,
            sign_lote: false,
            digest: DigestAlgorithm::Sha256,
            max_discriminacao: 1000,
            max_razao_social: 150,
        }
    }

    /// Total `Signature` elements a fully signed document must carry.
    pub fn expected_signatures(&self, rps_count: usize) -> usize {
        let mut n = 0;
        if self.sign_rps {
            n += rps_count;
        }
        if self.sign_lote {
            n += 1;
        }
        n
    }
}
