//! Municipality business rules: field-omission patches and consistency
//! checks applied to a built batch before serialization.
//!
//! Fail-fast: the first violated rule aborts the run. Nothing is ever
//! silently skipped — resubmission against government endpoints is
//! expensive, so the batch must be fully clean before any network call.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::error::NfseError;
use super::normalize::only_digits;
use super::schema::{BlankNamePolicy, MunicipalSchema};
use super::types::{Lote, RegimeEspecialTributacao, Rps, SimNao};

const ISS_TOLERANCE: Decimal = dec!(0.01);

/// Apply the municipality's rule set to a built batch, mutating it in place.
/// After this returns `Ok`, the batch is final — the serializer consumes it
/// without further changes.
pub fn apply_business_rules(lote: &mut Lote, schema: &MunicipalSchema) -> Result<(), NfseError> {
    // Batches imported via `build_unchecked` skip the builder validation,
    // so the issuer document is re-checked here before it can reach the wire.
    let cnpj = &lote.prestador.cnpj;
    if cnpj.len() != 14 || !cnpj.chars().all(|c| c.is_ascii_digit()) {
        return Err(NfseError::InvalidFormat {
            field: "prestador.cnpj".into(),
            message: format!("CNPJ must have exactly 14 digits, got '{cnpj}'"),
        });
    }

    if only_digits(&lote.prestador.inscricao_municipal).is_empty()
        || only_digits(&lote.prestador.inscricao_municipal).len() > 15
    {
        return Err(NfseError::InvalidFormat {
            field: "prestador.inscricao_municipal".into(),
            message: "municipal registration must contain 1 to 15 digits".into(),
        });
    }

    for (i, rps) in lote.rps.iter_mut().enumerate() {
        apply_rps_rules(rps, i, schema)?;
    }
    Ok(())
}

fn apply_rps_rules(rps: &mut Rps, index: usize, schema: &MunicipalSchema) -> Result<(), NfseError> {
    let path = |suffix: &str| format!("rps[{index}].{suffix}");

    // Recipient name policy is per-municipality.
    if rps.tomador.razao_social.trim().is_empty() {
        match schema.blank_tomador_name {
            BlankNamePolicy::Placeholder => {
                rps.tomador.razao_social = schema.tomador_name_placeholder.to_string();
            }
            BlankNamePolicy::Reject => {
                return Err(NfseError::MissingField(path("tomador.razao_social")));
            }
        }
    }

    // Regime combinations where rate and ISS amount must be absent on the
    // wire — absent, not zero. MEI never declares them; Simples opt-in
    // without withholding likewise.
    let force_omit = rps.regime_especial_tributacao == Some(RegimeEspecialTributacao::Mei)
        || (rps.optante_simples_nacional == SimNao::Sim
            && rps.servico.iss_retido == SimNao::Nao);
    if force_omit {
        rps.servico.aliquota = None;
        rps.servico.valor_iss = None;
    }

    // When both survive, the stated ISS must match base × rate.
    if let (Some(aliquota), Some(valor_iss)) = (rps.servico.aliquota, rps.servico.valor_iss) {
        let computed = (rps.servico.base_calculo * aliquota)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if (computed - valor_iss).abs() > ISS_TOLERANCE {
            return Err(NfseError::InconsistentValue(format!(
                "{}: stated ISS {} differs from base {} × rate {} = {}",
                path("servico.valor_iss"),
                valor_iss,
                rps.servico.base_calculo,
                aliquota,
                computed
            )));
        }
    }

    // Length and format bounds, re-checked with this municipality's limits.
    let item_digits = only_digits(&rps.servico.item_lista_servico);
    if item_digits.is_empty() || item_digits.len() > 5 {
        return Err(NfseError::InvalidFormat {
            field: path("servico.item_lista_servico"),
            message: "service classification must contain 1 to 5 digits".into(),
        });
    }
    if let Some(cnae) = &rps.servico.codigo_cnae {
        let cnae_digits = only_digits(cnae);
        if cnae_digits.is_empty() || cnae_digits.len() > 7 {
            return Err(NfseError::InvalidFormat {
                field: path("servico.codigo_cnae"),
                message: "CNAE code must contain 1 to 7 digits".into(),
            });
        }
    }
    if rps.servico.discriminacao.chars().count() > schema.max_discriminacao {
        return Err(NfseError::InvalidFormat {
            field: path("servico.discriminacao"),
            message: format!(
                "description exceeds {} characters",
                schema.max_discriminacao
            ),
        });
    }
    if rps.tomador.razao_social.chars().count() > schema.max_razao_social {
        return Err(NfseError::InvalidFormat {
            field: path("tomador.razao_social"),
            message: format!("recipient name exceeds {} characters", schema.max_razao_social),
        });
    }
    if rps.tomador.endereco.cep.len() != 8 {
        return Err(NfseError::InvalidFormat {
            field: path("tomador.endereco.cep"),
            message: format!(
                "CEP must have exactly 8 digits, got {}",
                rps.tomador.endereco.cep.len()
            ),
        });
    }

    Ok(())
}
