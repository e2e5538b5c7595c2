use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// tcLoteRps: batch of one or more RPS submitted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lote {
    /// XML `Id` attribute of the `LoteRps` element (must be Id-safe).
    pub id: String,
    /// tcLoteRps/NumeroLote: batch sequence number.
    pub numero: u64,
    /// Issuer of every RPS in the batch.
    pub prestador: Prestador,
    /// tcLoteRps/QuantidadeRps: declared RPS count. Invariant: equals `rps.len()`.
    pub quantidade_rps: usize,
    /// tcLoteRps/ListaRps: ordered RPS entries (≥1).
    pub rps: Vec<Rps>,
}

/// tcIdentificacaoPrestador: the service provider (issuer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prestador {
    /// CNPJ, digits only, exactly 14.
    pub cnpj: String,
    /// Municipal registration (Inscrição Municipal), non-empty.
    pub inscricao_municipal: String,
}

/// tcRps: one provisional service receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rps {
    pub identificacao: IdentificacaoRps,
    /// tcInfRps/DataEmissao.
    pub data_emissao: NaiveDateTime,
    /// tcDeclaracaoServico/Competencia: competence month (day is ignored by
    /// receiving schemas, conventionally the 1st).
    pub competencia: NaiveDate,
    /// tcInfRps/Status: 1 = normal, 2 = cancelled.
    pub status: StatusRps,
    /// Exactly one aggregated service block per RPS (ABRASF assumption).
    pub servico: Servico,
    pub tomador: Tomador,
    /// tcInfDeclaracao/RegimeEspecialTributacao (optional).
    pub regime_especial_tributacao: Option<RegimeEspecialTributacao>,
    /// tcInfDeclaracao/OptanteSimplesNacional.
    pub optante_simples_nacional: SimNao,
    /// tcInfDeclaracao/IncentivoFiscal (cultural incentive).
    pub incentivo_fiscal: SimNao,
    /// tcConstrucaoCivil sub-block (optional).
    pub construcao_civil: Option<ConstrucaoCivil>,
    /// IBS/CBS reform sub-block (optional, newer schema revisions).
    pub reforma_tributaria: Option<ReformaTributaria>,
}

/// tcIdentificacaoRps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentificacaoRps {
    /// Numero: RPS number within the series.
    pub numero: String,
    /// Serie: series label.
    pub serie: String,
    /// Tipo: RPS kind.
    pub tipo: TipoRps,
}

/// tcInfRps/Tipo — RPS kind codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipoRps {
    /// 1 — RPS.
    Rps,
    /// 2 — Nota fiscal conjugada (mista).
    NotaConjugada,
    /// 3 — Cupom.
    Cupom,
}

impl TipoRps {
    pub fn code(&self) -> u8 {
        match self {
            Self::Rps => 1,
            Self::NotaConjugada => 2,
            Self::Cupom => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Rps),
            2 => Some(Self::NotaConjugada),
            3 => Some(Self::Cupom),
            _ => None,
        }
    }
}

/// tcInfRps/Status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusRps {
    /// 1 — Normal.
    Normal,
    /// 2 — Cancelado.
    Cancelado,
}

impl StatusRps {
    pub fn code(&self) -> u8 {
        match self {
            Self::Normal => 1,
            Self::Cancelado => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Normal),
            2 => Some(Self::Cancelado),
            _ => None,
        }
    }
}

/// tsSimNao — ABRASF binary flag (1 = sim, 2 = não).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimNao {
    Sim,
    Nao,
}

impl SimNao {
    pub fn code(&self) -> u8 {
        match self {
            Self::Sim => 1,
            Self::Nao => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Sim),
            2 => Some(Self::Nao),
            _ => None,
        }
    }

    pub fn from_bool(b: bool) -> Self {
        if b { Self::Sim } else { Self::Nao }
    }
}

/// tsExigibilidadeISS — ISS exigibility codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExigibilidadeIss {
    /// 1 — Exigível.
    Exigivel,
    /// 2 — Não incidência.
    NaoIncidencia,
    /// 3 — Isenção.
    Isencao,
    /// 4 — Exportação.
    Exportacao,
    /// 5 — Imunidade.
    Imunidade,
    /// 6 — Exigibilidade suspensa por decisão judicial.
    SuspensaJudicial,
}

impl ExigibilidadeIss {
    pub fn code(&self) -> u8 {
        match self {
            Self::Exigivel => 1,
            Self::NaoIncidencia => 2,
            Self::Isencao => 3,
            Self::Exportacao => 4,
            Self::Imunidade => 5,
            Self::SuspensaJudicial => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Exigivel),
            2 => Some(Self::NaoIncidencia),
            3 => Some(Self::Isencao),
            4 => Some(Self::Exportacao),
            5 => Some(Self::Imunidade),
            6 => Some(Self::SuspensaJudicial),
            _ => None,
        }
    }
}

/// tsRegimeEspecialTributacao — special tax regime codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegimeEspecialTributacao {
    /// 1 — Microempresa municipal.
    MicroempresaMunicipal,
    /// 2 — Estimativa.
    Estimativa,
    /// 3 — Sociedade de profissionais.
    SociedadeProfissionais,
    /// 4 — Cooperativa.
    Cooperativa,
    /// 5 — Microempresário individual (MEI).
    Mei,
    /// 6 — Microempresa ou pequeno porte (ME/EPP).
    MeEpp,
}

impl RegimeEspecialTributacao {
    pub fn code(&self) -> u8 {
        match self {
            Self::MicroempresaMunicipal => 1,
            Self::Estimativa => 2,
            Self::SociedadeProfissionais => 3,
            Self::Cooperativa => 4,
            Self::Mei => 5,
            Self::MeEpp => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::MicroempresaMunicipal),
            2 => Some(Self::Estimativa),
            3 => Some(Self::SociedadeProfissionais),
            4 => Some(Self::Cooperativa),
            5 => Some(Self::Mei),
            6 => Some(Self::MeEpp),
            _ => None,
        }
    }
}

/// tcDadosServico: the one aggregated service block of an RPS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Servico {
    /// tcValores/ValorServicos: total service amount.
    pub valor_servicos: Decimal,
    /// tcValores/ValorDeducoes (optional).
    pub valor_deducoes: Option<Decimal>,
    /// tcValores/ValorIss: total ISS amount. `None` means the field is
    /// omitted on the wire (business-rule patched), not zero.
    pub valor_iss: Option<Decimal>,
    /// tcValores/Aliquota: tax rate as a fraction (0.02 = 2%). `None` ⇒ omitted.
    pub aliquota: Option<Decimal>,
    /// tcValores/BaseCalculo.
    pub base_calculo: Decimal,
    /// IssRetido: whole-RPS withholding flag.
    pub iss_retido: SimNao,
    /// ItemListaServico: service classification code (LC 116/2003 list).
    pub item_lista_servico: String,
    /// CodigoCnae (optional).
    pub codigo_cnae: Option<String>,
    /// Discriminacao: concatenated, numbered description lines.
    pub discriminacao: String,
    /// CodigoMunicipio: IBGE code of the municipality where the service
    /// was rendered.
    pub codigo_municipio: String,
    /// ExigibilidadeISS.
    pub exigibilidade_iss: ExigibilidadeIss,
}

/// Whether a tax document belongs to an individual or a legal entity.
/// Decided purely by digit count — there is no explicit flag in ABRASF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipoPessoa {
    /// CPF, 11 digits.
    Fisica,
    /// CNPJ, 14 digits.
    Juridica,
}

/// tcDadosTomador: the service recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tomador {
    /// CPF (11 digits) or CNPJ (14 digits), digits only.
    pub cpf_cnpj: String,
    /// RazaoSocial: legal/trade name.
    pub razao_social: String,
    pub endereco: Endereco,
    /// Contato/Telefone (optional).
    pub telefone: Option<String>,
    /// Contato/Email (optional).
    pub email: Option<String>,
}

impl Tomador {
    /// Individual vs. legal entity, by digit count. `None` when the
    /// document has neither 11 nor 14 digits (validation rejects those).
    pub fn tipo_pessoa(&self) -> Option<TipoPessoa> {
        match self.cpf_cnpj.len() {
            11 => Some(TipoPessoa::Fisica),
            14 => Some(TipoPessoa::Juridica),
            _ => None,
        }
    }
}

/// tcEndereco: postal address. All six fields are individually required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endereco {
    /// Endereco: street.
    pub logradouro: String,
    /// Numero: house number.
    pub numero: String,
    /// Bairro: district.
    pub bairro: String,
    /// CodigoMunicipio: IBGE municipality code.
    pub codigo_municipio: String,
    /// Uf: two-letter state code.
    pub uf: String,
    /// Cep: postal code, digits only, exactly 8.
    pub cep: String,
}

/// tcConstrucaoCivil: construction-site sub-block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstrucaoCivil {
    /// CodigoObra: site registration code.
    pub codigo_obra: String,
    /// Art: technical responsibility record (ART).
    pub art: String,
}

/// IBS/CBS amounts introduced by the 2023 Brazilian tax reform.
/// Only emitted by schemas that already carry the reform revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReformaTributaria {
    pub valor_ibs: Decimal,
    pub valor_cbs: Decimal,
}

/// tcInfNfse: an already-issued invoice, wrapping its originating declaration.
/// Serialized by the `CompNfse` entry point, never by the batch envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nfse {
    /// InfNfse/Numero: invoice number assigned by the municipality.
    pub numero: String,
    /// InfNfse/CodigoVerificacao.
    pub codigo_verificacao: String,
    /// InfNfse/DataEmissao: issue timestamp of the final invoice.
    pub data_emissao: NaiveDateTime,
    pub prestador: Prestador,
    /// The declaration the invoice was issued from.
    pub declaracao: Rps,
}
