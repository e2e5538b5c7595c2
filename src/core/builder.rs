use chrono::{Datelike, NaiveDate, NaiveDateTime};

use super::error::{NfseError, ValidationError};
use super::normalize::{only_digits, xml_safe_id};
use super::types::*;

/// Builder for the submission batch.
///
/// ```
/// use abrasf::core::*;
/// use rust_decimal_macros::dec;
///
/// let servico = Servico {
///     valor_servicos: dec!(5.00),
///     valor_deducoes: None,
///     valor_iss: Some(dec!(0.00)),
///     aliquota: Some(dec!(0)),
///     base_calculo: dec!(5.00),
///     iss_retido: SimNao::Nao,
///     item_lista_servico: "1401".into(),
///     codigo_cnae: None,
///     discriminacao: "1- Lavagem de veiculo".into(),
///     codigo_municipio: "3106200".into(),
///     exigibilidade_iss: ExigibilidadeIss::Exigivel,
/// };
/// let rps = RpsBuilder::new("1", "A", TipoRps::Rps, parse_data_emissao("2026-03-10").unwrap())
///     .servico(servico)
///     .tomador(
///         TomadorBuilder::new("123.456.789-09", "Fulano de Tal")
///             .endereco(EnderecoBuilder::new("Rua A", "10", "Centro", "3106200", "MG", "30130-010").build())
///             .build(),
///     )
///     .build()
///     .unwrap();
/// let lote = LoteBuilder::new("lote1", 1)
///     .prestador("45.987.654/0001-21", "123456")
///     .add_rps(rps)
///     .build()
///     .unwrap();
/// assert_eq!(lote.quantidade_rps, lote.rps.len());
/// ```
pub struct LoteBuilder {
    id: String,
    numero: u64,
    prestador: Option<Prestador>,
    rps: Vec<Rps>,
}

impl LoteBuilder {
    pub fn new(id: impl Into<String>, numero: u64) -> Self {
        Self {
            id: id.into(),
            numero,
            prestador: None,
            rps: Vec::new(),
        }
    }

    /// Issuer of the batch. The CNPJ is digit-stripped here; length is
    /// enforced at build time.
    pub fn prestador(
        mut self,
        cnpj: impl Into<String>,
        inscricao_municipal: impl Into<String>,
    ) -> Self {
        self.prestador = Some(Prestador {
            cnpj: only_digits(&cnpj.into()),
            inscricao_municipal: inscricao_municipal.into(),
        });
        self
    }

    pub fn add_rps(mut self, rps: Rps) -> Self {
        self.rps.push(rps);
        self
    }

    /// Build the batch and run full validation. Returns all violations
    /// joined into one error — a partial batch is never produced.
    pub fn build(self) -> Result<Lote, NfseError> {
        let lote = self.assemble()?;
        let errors = validate_lote(&lote);
        if !errors.is_empty() {
            let msg = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(NfseError::Validation(msg));
        }
        Ok(lote)
    }

    /// Build without validation — useful for testing and for importing
    /// records that will be patched by the business-rule pass first.
    pub fn build_unchecked(self) -> Result<Lote, NfseError> {
        self.assemble()
    }

    fn assemble(self) -> Result<Lote, NfseError> {
        let prestador = self
            .prestador
            .ok_or_else(|| NfseError::MissingField("prestador".into()))?;
        let quantidade_rps = self.rps.len();
        Ok(Lote {
            id: self.id,
            numero: self.numero,
            prestador,
            quantidade_rps,
            rps: self.rps,
        })
    }
}

/// Builder for one RPS. Competence defaults to the first day of the issue
/// month when not set explicitly.
pub struct RpsBuilder {
    numero: String,
    serie: String,
    tipo: TipoRps,
    data_emissao: NaiveDateTime,
    competencia: Option<NaiveDate>,
    status: StatusRps,
    servico: Option<Servico>,
    tomador: Option<Tomador>,
    regime_especial_tributacao: Option<RegimeEspecialTributacao>,
    optante_simples_nacional: SimNao,
    incentivo_fiscal: SimNao,
    construcao_civil: Option<ConstrucaoCivil>,
    reforma_tributaria: Option<ReformaTributaria>,
}

impl RpsBuilder {
    pub fn new(
        numero: impl Into<String>,
        serie: impl Into<String>,
        tipo: TipoRps,
        data_emissao: NaiveDateTime,
    ) -> Self {
        Self {
            numero: numero.into(),
            serie: serie.into(),
            tipo,
            data_emissao,
            competencia: None,
            status: StatusRps::Normal,
            servico: None,
            tomador: None,
            regime_especial_tributacao: None,
            optante_simples_nacional: SimNao::Nao,
            incentivo_fiscal: SimNao::Nao,
            construcao_civil: None,
            reforma_tributaria: None,
        }
    }

    pub fn competencia(mut self, competencia: NaiveDate) -> Self {
        self.competencia = Some(competencia);
        self
    }

    pub fn status(mut self, status: StatusRps) -> Self {
        self.status = status;
        self
    }

    pub fn servico(mut self, servico: Servico) -> Self {
        self.servico = Some(servico);
        self
    }

    pub fn tomador(mut self, tomador: Tomador) -> Self {
        self.tomador = Some(tomador);
        self
    }

    pub fn regime_especial(mut self, regime: RegimeEspecialTributacao) -> Self {
        self.regime_especial_tributacao = Some(regime);
        self
    }

    pub fn optante_simples_nacional(mut self, flag: SimNao) -> Self {
        self.optante_simples_nacional = flag;
        self
    }

    pub fn incentivo_fiscal(mut self, flag: SimNao) -> Self {
        self.incentivo_fiscal = flag;
        self
    }

    pub fn construcao_civil(mut self, codigo_obra: impl Into<String>, art: impl Into<String>) -> Self {
        self.construcao_civil = Some(ConstrucaoCivil {
            codigo_obra: codigo_obra.into(),
            art: art.into(),
        });
        self
    }

    pub fn reforma_tributaria(mut self, reforma: ReformaTributaria) -> Self {
        self.reforma_tributaria = Some(reforma);
        self
    }

    pub fn build(self) -> Result<Rps, NfseError> {
        let servico = self
            .servico
            .ok_or_else(|| NfseError::MissingField("rps.servico".into()))?;
        let tomador = self
            .tomador
            .ok_or_else(|| NfseError::MissingField("rps.tomador".into()))?;

        let competencia = self.competencia.unwrap_or_else(|| {
            let d = self.data_emissao.date();
            NaiveDate::from_ymd_opt(d.year(), d.month(), 1).unwrap_or(d)
        });

        Ok(Rps {
            identificacao: IdentificacaoRps {
                numero: self.numero,
                serie: self.serie,
                tipo: self.tipo,
            },
            data_emissao: self.data_emissao,
            competencia,
            status: self.status,
            servico,
            tomador,
            regime_especial_tributacao: self.regime_especial_tributacao,
            optante_simples_nacional: self.optante_simples_nacional,
            incentivo_fiscal: self.incentivo_fiscal,
            construcao_civil: self.construcao_civil,
            reforma_tributaria: self.reforma_tributaria,
        })
    }
}

/// Builder for the service recipient. The tax document is digit-stripped
/// here; the 11-or-14 length rule is enforced by [`validate_lote`].
pub struct TomadorBuilder {
    cpf_cnpj: String,
    razao_social: String,
    endereco: Option<Endereco>,
    telefone: Option<String>,
    email: Option<String>,
}

impl TomadorBuilder {
    pub fn new(cpf_cnpj: impl Into<String>, razao_social: impl Into<String>) -> Self {
        Self {
            cpf_cnpj: only_digits(&cpf_cnpj.into()),
            razao_social: razao_social.into(),
            endereco: None,
            telefone: None,
            email: None,
        }
    }

    pub fn endereco(mut self, endereco: Endereco) -> Self {
        self.endereco = Some(endereco);
        self
    }

    pub fn telefone(mut self, telefone: impl Into<String>) -> Self {
        self.telefone = Some(telefone.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn build(self) -> Tomador {
        Tomador {
            cpf_cnpj: self.cpf_cnpj,
            razao_social: self.razao_social,
            endereco: self.endereco.unwrap_or(Endereco {
                logradouro: String::new(),
                numero: String::new(),
                bairro: String::new(),
                codigo_municipio: String::new(),
                uf: String::new(),
                cep: String::new(),
            }),
            telefone: self.telefone,
            email: self.email,
        }
    }
}

/// Builder for the recipient address. All six fields are required by every
/// receiving schema; the constructor takes them all.
pub struct EnderecoBuilder {
    logradouro: String,
    numero: String,
    bairro: String,
    codigo_municipio: String,
    uf: String,
    cep: String,
}

impl EnderecoBuilder {
    pub fn new(
        logradouro: impl Into<String>,
        numero: impl Into<String>,
        bairro: impl Into<String>,
        codigo_municipio: impl Into<String>,
        uf: impl Into<String>,
        cep: impl Into<String>,
    ) -> Self {
        Self {
            logradouro: logradouro.into(),
            numero: numero.into(),
            bairro: bairro.into(),
            codigo_municipio: codigo_municipio.into(),
            uf: uf.into(),
            cep: cep.into(),
        }
    }

    pub fn build(self) -> Endereco {
        Endereco {
            logradouro: self.logradouro,
            numero: self.numero,
            bairro: self.bairro,
            codigo_municipio: only_digits(&self.codigo_municipio),
            uf: self.uf,
            cep: only_digits(&self.cep),
        }
    }
}

/// Validate a batch against the ABRASF layer rules. Returns all violations
/// found (not just the first); an empty vector means the batch may be
/// serialized.
///
/// Blank recipient names are deliberately not checked here — that rule is
/// per-municipality (placeholder vs. reject) and enforced by
/// [`apply_business_rules`](super::apply_business_rules).
pub fn validate_lote(lote: &Lote) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if lote.id.trim().is_empty() {
        errors.push(ValidationError::new("id", "lot id must not be empty"));
    } else if xml_safe_id(&lote.id) != lote.id {
        errors.push(ValidationError::new(
            "id",
            "lot id contains characters illegal in an XML Id attribute",
        ));
    }

    if lote.numero == 0 {
        errors.push(ValidationError::new("numero", "lot number must be positive"));
    }

    if lote.prestador.cnpj.len() != 14 {
        errors.push(ValidationError::with_rule(
            "prestador.cnpj",
            format!(
                "CNPJ must have exactly 14 digits, got {}",
                lote.prestador.cnpj.len()
            ),
            "tcCpfCnpj",
        ));
    }
    if lote.prestador.inscricao_municipal.trim().is_empty() {
        errors.push(ValidationError::new(
            "prestador.inscricao_municipal",
            "municipal registration must not be empty",
        ));
    }

    if lote.rps.is_empty() {
        errors.push(ValidationError::new("rps", "batch must contain at least one RPS"));
    }
    if lote.quantidade_rps != lote.rps.len() {
        errors.push(ValidationError::new(
            "quantidade_rps",
            format!(
                "declared RPS count {} does not match actual count {}",
                lote.quantidade_rps,
                lote.rps.len()
            ),
        ));
    }

    for (i, rps) in lote.rps.iter().enumerate() {
        validate_rps(rps, i, &mut errors);
    }

    errors
}

fn validate_rps(rps: &Rps, index: usize, errors: &mut Vec<ValidationError>) {
    let path = |suffix: &str| format!("rps[{index}].{suffix}");

    if rps.identificacao.numero.trim().is_empty() {
        errors.push(ValidationError::new(
            path("identificacao.numero"),
            "RPS number must not be empty",
        ));
    }
    if rps.identificacao.serie.trim().is_empty() {
        errors.push(ValidationError::new(
            path("identificacao.serie"),
            "RPS series must not be empty",
        ));
    }

    if rps.servico.valor_servicos.is_sign_negative() {
        errors.push(ValidationError::new(
            path("servico.valor_servicos"),
            "service amount must not be negative",
        ));
    }
    if rps.servico.item_lista_servico.trim().is_empty() {
        errors.push(ValidationError::new(
            path("servico.item_lista_servico"),
            "service classification code must not be empty",
        ));
    }
    if rps.servico.codigo_municipio.trim().is_empty() {
        errors.push(ValidationError::new(
            path("servico.codigo_municipio"),
            "municipality code must not be empty",
        ));
    }
    if rps.servico.discriminacao.trim().is_empty() {
        errors.push(ValidationError::new(
            path("servico.discriminacao"),
            "service description must not be empty",
        ));
    }

    if rps.tomador.tipo_pessoa().is_none() {
        errors.push(ValidationError::with_rule(
            path("tomador.cpf_cnpj"),
            format!(
                "tax document must have 11 (CPF) or 14 (CNPJ) digits, got {}",
                rps.tomador.cpf_cnpj.len()
            ),
            "tcCpfCnpj",
        ));
    }

    let end = &rps.tomador.endereco;
    let address_fields: [(&str, &str); 6] = [
        ("logradouro", &end.logradouro),
        ("numero", &end.numero),
        ("bairro", &end.bairro),
        ("codigo_municipio", &end.codigo_municipio),
        ("uf", &end.uf),
        ("cep", &end.cep),
    ];
    for (name, value) in address_fields {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(
                path(&format!("tomador.endereco.{name}")),
                format!("address field '{name}' must not be empty"),
            ));
        }
    }
    if !end.cep.is_empty() && end.cep.len() != 8 {
        errors.push(ValidationError::new(
            path("tomador.endereco.cep"),
            format!("CEP must have exactly 8 digits, got {}", end.cep.len()),
        ));
    }
    if !end.uf.trim().is_empty() && end.uf.trim().len() != 2 {
        errors.push(ValidationError::new(
            path("tomador.endereco.uf"),
            "UF must be the two-letter state code",
        ));
    }
}
