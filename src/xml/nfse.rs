//! `CompNfse` declaration wrapper for already-issued invoices.
//!
//! Structurally related to the batch envelope but not interchangeable with
//! it: this renders one municipally-issued invoice around its originating
//! declaration, never a submission batch.

use super::lote::{declaracao_id, write_declaracao};
use super::xml_utils::{XmlResult, XmlWriter, check_wellformed};
use crate::core::{MunicipalSchema, Nfse, format_data, xml_safe_id};

/// Serialize an issued invoice as a `CompNfse`/`Nfse`/`InfNfse` document.
pub fn gerar_xml_comp_nfse(nfse: &Nfse, schema: &MunicipalSchema) -> XmlResult {
    let mut w = XmlWriter::new()?;

    w.start_element_with_attrs("CompNfse", &[("xmlns", schema.namespace)])?;
    w.start_element_with_attrs("Nfse", &[("versao", schema.versao)])?;

    let inf_id = xml_safe_id(&format!("nfse{}", nfse.numero));
    w.start_element_with_attrs("InfNfse", &[("Id", inf_id.as_str())])?;

    w.text_element("Numero", nfse.numero.trim())?;
    w.text_element("CodigoVerificacao", nfse.codigo_verificacao.trim())?;
    w.text_element("DataEmissao", &format_data(nfse.data_emissao, schema.date_style))?;

    w.start_element("DeclaracaoPrestacaoServico")?;
    let id = declaracao_id(&nfse.declaracao);
    write_declaracao(&mut w, &nfse.declaracao, &nfse.prestador, schema, &id)?;
    w.end_element("DeclaracaoPrestacaoServico")?;

    w.end_element("InfNfse")?;
    w.end_element("Nfse")?;
    w.end_element("CompNfse")?;

    let xml = w.into_string()?;
    check_wellformed(&xml)?;
    Ok(xml)
}
