//! `EnviarLoteRpsEnvio` batch envelope serialization.
//!
//! One algorithm, parameterized by a [`MunicipalSchema`]: element ordering is
//! fixed per dialect, optional fields are presence-conditional (an absent
//! `Option` is omitted, an explicit zero is still emitted), and every piece
//! of text goes through the normalizer's escaping.

use super::xml_utils::{XmlResult, XmlWriter, check_wellformed};
use crate::core::{
    Endereco, Lote, MunicipalSchema, NfseError, Prestador, Rps, Servico, TipoPessoa, Tomador,
    format_competencia, format_data, xml_safe_id,
};

/// Serialize a batch into the unsigned `EnviarLoteRpsEnvio` document.
///
/// The batch must already have passed [`validate_lote`](crate::core::validate_lote)
/// and [`apply_business_rules`](crate::core::apply_business_rules); this
/// function only renders. The output is re-parsed before being returned and
/// a parse failure surfaces as [`NfseError::MalformedXml`].
pub fn gerar_xml_lote_rps(lote: &Lote, schema: &MunicipalSchema) -> XmlResult {
    let mut w = XmlWriter::new()?;

    w.start_element_with_attrs("EnviarLoteRpsEnvio", &[("xmlns", schema.namespace)])?;
    w.start_element_with_attrs(
        "LoteRps",
        &[
            ("Id", xml_safe_id(&lote.id).as_str()),
            ("versao", schema.versao),
        ],
    )?;

    w.text_element("NumeroLote", &lote.numero.to_string())?;
    if schema.declaracao_tag == "InfRps" {
        // 1.x places the issuer fields directly under LoteRps.
        write_prestador_doc(&mut w, &lote.prestador, schema)?;
        w.text_element("InscricaoMunicipal", lote.prestador.inscricao_municipal.trim())?;
    } else {
        write_prestador_block(&mut w, &lote.prestador, schema)?;
    }
    w.text_element("QuantidadeRps", &lote.quantidade_rps.to_string())?;

    w.start_element("ListaRps")?;
    for rps in &lote.rps {
        w.start_element("Rps")?;
        let id = declaracao_id(rps);
        write_declaracao(&mut w, rps, &lote.prestador, schema, &id)?;
        w.end_element("Rps")?;
    }
    w.end_element("ListaRps")?;

    w.end_element("LoteRps")?;
    w.end_element("EnviarLoteRpsEnvio")?;

    let xml = w.into_string()?;
    check_wellformed(&xml)?;
    Ok(xml)
}

/// `Id` of the signed per-RPS declaration node, derived from the RPS's own
/// identification so it is unique document-wide.
pub fn declaracao_id(rps: &Rps) -> String {
    xml_safe_id(&format!(
        "rps{}{}",
        rps.identificacao.serie, rps.identificacao.numero
    ))
}

fn write_prestador_doc(
    w: &mut XmlWriter,
    prestador: &Prestador,
    schema: &MunicipalSchema,
) -> Result<(), NfseError> {
    if schema.cpf_cnpj_wrapped {
        w.start_element("CpfCnpj")?;
        w.text_element("Cnpj", &prestador.cnpj)?;
        w.end_element("CpfCnpj")?;
    } else {
        w.text_element("Cnpj", &prestador.cnpj)?;
    }
    Ok(())
}

/// Write one signed-scope declaration node (`InfDeclaracaoPrestacaoServico`
/// for ABRASF 2.x, `InfRps` for 1.x). Shared by the batch envelope and the
/// `CompNfse` wrapper.
pub(crate) fn write_declaracao(
    w: &mut XmlWriter,
    rps: &Rps,
    prestador: &Prestador,
    schema: &MunicipalSchema,
    id: &str,
) -> Result<(), NfseError> {
    let v1_layout = schema.declaracao_tag == "InfRps";
    w.start_element_with_attrs(schema.declaracao_tag, &[("Id", id)])?;

    if v1_layout {
        write_identificacao(w, rps)?;
        w.text_element("DataEmissao", &format_data(rps.data_emissao, schema.date_style))?;
        // 1.x carries NaturezaOperacao where 2.x has ExigibilidadeISS;
        // the code sets coincide for the values in use.
        w.text_element(
            "NaturezaOperacao",
            &rps.servico.exigibilidade_iss.code().to_string(),
        )?;
        if let Some(regime) = rps.regime_especial_tributacao {
            w.text_element("RegimeEspecialTributacao", &regime.code().to_string())?;
        }
        w.text_element(
            "OptanteSimplesNacional",
            &rps.optante_simples_nacional.code().to_string(),
        )?;
        w.text_element("IncentivadorCultural", &rps.incentivo_fiscal.code().to_string())?;
        w.text_element("Status", &rps.status.code().to_string())?;
        write_servico(w, &rps.servico, schema)?;
        write_prestador_block(w, prestador, schema)?;
        write_tomador(w, &rps.tomador, schema)?;
        write_construcao_civil(w, rps, schema)?;
    } else {
        w.start_element("Rps")?;
        write_identificacao(w, rps)?;
        w.text_element("DataEmissao", &format_data(rps.data_emissao, schema.date_style))?;
        w.text_element("Status", &rps.status.code().to_string())?;
        w.end_element("Rps")?;

        if schema.emit_competencia {
            w.text_element(
                "Competencia",
                &format_competencia(rps.competencia, schema.date_style),
            )?;
        }
        write_servico(w, &rps.servico, schema)?;
        write_prestador_block(w, prestador, schema)?;
        write_tomador(w, &rps.tomador, schema)?;
        write_construcao_civil(w, rps, schema)?;
        if let Some(regime) = rps.regime_especial_tributacao {
            w.text_element("RegimeEspecialTributacao", &regime.code().to_string())?;
        }
        w.text_element(
            "OptanteSimplesNacional",
            &rps.optante_simples_nacional.code().to_string(),
        )?;
        w.text_element("IncentivoFiscal", &rps.incentivo_fiscal.code().to_string())?;
        if schema.emit_reforma_tributaria {
            if let Some(reforma) = &rps.reforma_tributaria {
                w.start_element("ReformaTributaria")?;
                w.valor_element("ValorIbs", reforma.valor_ibs)?;
                w.valor_element("ValorCbs", reforma.valor_cbs)?;
                w.end_element("ReformaTributaria")?;
            }
        }
    }

    w.end_element(schema.declaracao_tag)?;
    Ok(())
}

fn write_identificacao(w: &mut XmlWriter, rps: &Rps) -> Result<(), NfseError> {
    w.start_element("IdentificacaoRps")?;
    w.text_element("Numero", rps.identificacao.numero.trim())?;
    w.text_element("Serie", rps.identificacao.serie.trim())?;
    w.text_element("Tipo", &rps.identificacao.tipo.code().to_string())?;
    w.end_element("IdentificacaoRps")?;
    Ok(())
}

fn write_servico(
    w: &mut XmlWriter,
    servico: &Servico,
    schema: &MunicipalSchema,
) -> Result<(), NfseError> {
    let v1_layout = schema.declaracao_tag == "InfRps";
    w.start_element("Servico")?;
    w.start_element("Valores")?;
    w.valor_element("ValorServicos", servico.valor_servicos)?;
    if let Some(deducoes) = servico.valor_deducoes {
        w.valor_element("ValorDeducoes", deducoes)?;
    }
    if let Some(valor_iss) = servico.valor_iss {
        w.valor_element("ValorIss", valor_iss)?;
    }
    if v1_layout {
        // 1.x nests the flag and the base inside Valores.
        w.text_element("IssRetido", &servico.iss_retido.code().to_string())?;
        if let Some(aliquota) = servico.aliquota {
            w.aliquota_element("Aliquota", aliquota, schema.rate_decimals)?;
        }
        w.valor_element("BaseCalculo", servico.base_calculo)?;
        w.end_element("Valores")?;
    } else {
        if let Some(aliquota) = servico.aliquota {
            w.aliquota_element("Aliquota", aliquota, schema.rate_decimals)?;
        }
        w.end_element("Valores")?;
        w.text_element("IssRetido", &servico.iss_retido.code().to_string())?;
    }
    w.text_element("ItemListaServico", servico.item_lista_servico.trim())?;
    if let Some(cnae) = &servico.codigo_cnae {
        w.text_element("CodigoCnae", cnae.trim())?;
    }
    w.text_element("Discriminacao", &servico.discriminacao)?;
    w.text_element("CodigoMunicipio", servico.codigo_municipio.trim())?;
    if !v1_layout && schema.emit_exigibilidade {
        w.text_element(
            "ExigibilidadeISS",
            &servico.exigibilidade_iss.code().to_string(),
        )?;
    }
    w.end_element("Servico")?;
    Ok(())
}

fn write_prestador_block(
    w: &mut XmlWriter,
    prestador: &Prestador,
    schema: &MunicipalSchema,
) -> Result<(), NfseError> {
    w.start_element("Prestador")?;
    write_prestador_doc(w, prestador, schema)?;
    w.text_element("InscricaoMunicipal", prestador.inscricao_municipal.trim())?;
    w.end_element("Prestador")?;
    Ok(())
}

fn write_tomador(
    w: &mut XmlWriter,
    tomador: &Tomador,
    schema: &MunicipalSchema,
) -> Result<(), NfseError> {
    w.start_element("Tomador")?;

    w.start_element("IdentificacaoTomador")?;
    w.start_element("CpfCnpj")?;
    match tomador.tipo_pessoa() {
        Some(TipoPessoa::Fisica) => w.text_element("Cpf", &tomador.cpf_cnpj)?,
        // Validation guarantees 11 or 14 digits; anything else would have
        // aborted the batch long before serialization.
        _ => w.text_element("Cnpj", &tomador.cpf_cnpj)?,
    };
    w.end_element("CpfCnpj")?;
    w.end_element("IdentificacaoTomador")?;

    let nome = if tomador.razao_social.trim().is_empty() {
        schema.tomador_name_placeholder
    } else {
        tomador.razao_social.trim()
    };
    w.text_element("RazaoSocial", nome)?;

    write_endereco(w, &tomador.endereco)?;

    if tomador.telefone.is_some() || tomador.email.is_some() {
        w.start_element("Contato")?;
        if let Some(telefone) = &tomador.telefone {
            w.text_element("Telefone", telefone.trim())?;
        }
        if let Some(email) = &tomador.email {
            w.text_element("Email", email.trim())?;
        }
        w.end_element("Contato")?;
    }

    w.end_element("Tomador")?;
    Ok(())
}

fn write_endereco(w: &mut XmlWriter, endereco: &Endereco) -> Result<(), NfseError> {
    w.start_element("Endereco")?;
    w.text_element("Endereco", endereco.logradouro.trim())?;
    w.text_element("Numero", endereco.numero.trim())?;
    w.text_element("Bairro", endereco.bairro.trim())?;
    w.text_element("CodigoMunicipio", endereco.codigo_municipio.trim())?;
    w.text_element("Uf", endereco.uf.trim())?;
    w.text_element("Cep", endereco.cep.trim())?;
    w.end_element("Endereco")?;
    Ok(())
}

fn write_construcao_civil(
    w: &mut XmlWriter,
    rps: &Rps,
    schema: &MunicipalSchema,
) -> Result<(), NfseError> {
    if !schema.emit_construcao_civil {
        return Ok(());
    }
    if let Some(obra) = &rps.construcao_civil {
        w.start_element("ConstrucaoCivil")?;
        w.text_element("CodigoObra", obra.codigo_obra.trim())?;
        w.text_element("Art", obra.art.trim())?;
        w.end_element("ConstrucaoCivil")?;
    }
    Ok(())
}
