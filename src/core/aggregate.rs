//! Service-line aggregation: N raw line items of one RPS reduced to the
//! single `Servico` block ABRASF expects (1 RPS ⇒ 1 Servico).

use rust_decimal::Decimal;

use super::error::NfseError;
use super::normalize::strip_accents;
use super::types::{ExigibilidadeIss, Servico, SimNao};

/// One raw service-line record, as read from the source system.
#[derive(Debug, Clone)]
pub struct ItemServico {
    pub valor_servicos: Decimal,
    pub valor_iss: Decimal,
    /// Rate as a fraction (0.02 = 2%).
    pub aliquota: Decimal,
    /// True when the recipient withholds ISS for this line.
    pub iss_retido: bool,
    pub descricao: String,
    pub codigo_municipio: Option<String>,
    pub exigibilidade_iss: Option<ExigibilidadeIss>,
}

/// Tie-break strategies for reducing many lines into one Servico.
///
/// The defaults reproduce the established business policy (first-non-zero
/// rate, first-non-empty codes); municipalities that need different
/// tie-breaks swap the function pointers without touching the algorithm.
pub struct AggregationPolicy {
    pub pick_aliquota: fn(&[ItemServico]) -> Decimal,
    pub pick_codigo_municipio: fn(&[ItemServico]) -> Option<String>,
    pub pick_exigibilidade: fn(&[ItemServico]) -> Option<ExigibilidadeIss>,
    /// Emitted when every line description normalizes to empty.
    pub descricao_fallback: &'static str,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            pick_aliquota: first_non_zero_aliquota,
            pick_codigo_municipio: first_codigo_municipio,
            pick_exigibilidade: first_exigibilidade,
            descricao_fallback: "SERVICOS PRESTADOS",
        }
    }
}

/// First item with rate > 0 wins; else the first item's rate; else 0.
pub fn first_non_zero_aliquota(items: &[ItemServico]) -> Decimal {
    items
        .iter()
        .find(|i| i.aliquota > Decimal::ZERO)
        .or_else(|| items.first())
        .map(|i| i.aliquota)
        .unwrap_or(Decimal::ZERO)
}

/// First non-empty municipality code, preserving input order.
pub fn first_codigo_municipio(items: &[ItemServico]) -> Option<String> {
    items
        .iter()
        .filter_map(|i| i.codigo_municipio.as_deref())
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// First present ISS-exigibility code, preserving input order.
pub fn first_exigibilidade(items: &[ItemServico]) -> Option<ExigibilidadeIss> {
    items.iter().find_map(|i| i.exigibilidade_iss)
}

fn normalize_descricao_line(raw: &str) -> String {
    // Accents dropped, newlines and runs of whitespace collapsed to spaces.
    strip_accents(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce the ordered line items of one RPS into its single `Servico` block.
///
/// `item_lista_servico` is carried at the RPS level in the source data and is
/// never derived from the lines. Monetary totals are summed; the withholding
/// flag is true the moment any line reports retained; rate and code
/// tie-breaks follow the [`AggregationPolicy`].
pub fn aggregate_servico(
    items: &[ItemServico],
    item_lista_servico: &str,
    policy: &AggregationPolicy,
) -> Result<Servico, NfseError> {
    if items.is_empty() {
        return Err(NfseError::MissingField("servico.itens".into()));
    }
    let item_lista = item_lista_servico.trim();
    if item_lista.is_empty() {
        return Err(NfseError::MissingField("servico.item_lista_servico".into()));
    }

    let mut valor_servicos = Decimal::ZERO;
    let mut valor_iss = Decimal::ZERO;
    let mut retido = false;
    let mut linhas: Vec<String> = Vec::new();

    for item in items {
        valor_servicos += item.valor_servicos;
        valor_iss += item.valor_iss;
        retido |= item.iss_retido;

        let texto = normalize_descricao_line(&item.descricao);
        if !texto.is_empty() {
            linhas.push(format!("{}- {}", linhas.len() + 1, texto));
        }
    }

    let discriminacao = if linhas.is_empty() {
        policy.descricao_fallback.to_string()
    } else {
        linhas.join("\n")
    };

    let codigo_municipio = (policy.pick_codigo_municipio)(items)
        .ok_or_else(|| NfseError::MissingField("servico.codigo_municipio".into()))?;
    let exigibilidade_iss = (policy.pick_exigibilidade)(items)
        .ok_or_else(|| NfseError::MissingField("servico.exigibilidade_iss".into()))?;

    Ok(Servico {
        valor_servicos,
        valor_deducoes: None,
        valor_iss: Some(valor_iss),
        aliquota: Some((policy.pick_aliquota)(items)),
        base_calculo: valor_servicos,
        iss_retido: SimNao::from_bool(retido),
        item_lista_servico: item_lista.to_string(),
        codigo_cnae: None,
        discriminacao,
        codigo_municipio,
        exigibilidade_iss,
    })
}
