#![cfg(feature = "xml")]

use abrasf::core::*;
use abrasf::xml;
use chrono::NaiveDate;
use rust_decimal_macros::dec;

fn servico() -> Servico {
    Servico {
        valor_servicos: dec!(5.00),
        valor_deducoes: None,
        valor_iss: Some(dec!(0.00)),
        aliquota: Some(dec!(0)),
        base_calculo: dec!(5.00),
        iss_retido: SimNao::Nao,
        item_lista_servico: "1401".into(),
        codigo_cnae: None,
        discriminacao: "1- Lavagem de veiculo".into(),
        codigo_municipio: "3106200".into(),
        exigibilidade_iss: ExigibilidadeIss::Exigivel,
    }
}

fn rps() -> Rps {
    RpsBuilder::new(
        "1",
        "A",
        TipoRps::Rps,
        parse_data_emissao("2026-03-10T09:30:00").unwrap(),
    )
    .competencia(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
    .servico(servico())
    .tomador(
        TomadorBuilder::new("123.456.789-09", "Fulano de Tal")
            .endereco(
                EnderecoBuilder::new("Rua A", "10", "Centro", "3106200", "MG", "30130-010").build(),
            )
            .telefone("31 3222-0000")
            .build(),
    )
    .build()
    .unwrap()
}

fn lote() -> Lote {
    LoteBuilder::new("lote1", 1)
        .prestador("45.987.654/0001-21", "123456")
        .add_rps(rps())
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Batch envelope — ABRASF 2.04
// ---------------------------------------------------------------------------

#[test]
fn v204_envelope_structure() {
    let xml_out = xml::gerar_xml_lote_rps(&lote(), &MunicipalSchema::abrasf_v204()).unwrap();

    assert!(xml_out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml_out.contains("<EnviarLoteRpsEnvio xmlns=\"http://www.abrasf.org.br/nfse.xsd\">"));
    assert!(xml_out.contains("<LoteRps Id=\"lote1\" versao=\"2.04\">"));
    assert!(xml_out.contains("<NumeroLote>1</NumeroLote>"));
    // 2.x wraps the lote-level issuer in a Prestador element.
    assert!(xml_out.contains(concat!(
        "<Prestador><CpfCnpj><Cnpj>45987654000121</Cnpj></CpfCnpj>",
        "<InscricaoMunicipal>123456</InscricaoMunicipal></Prestador><QuantidadeRps>"
    )));
    assert!(xml_out.contains("<QuantidadeRps>1</QuantidadeRps>"));
    assert!(xml_out.contains("<InfDeclaracaoPrestacaoServico Id=\"rpsA1\">"));
    assert!(xml_out.contains("<DataEmissao>2026-03-10T09:30:00</DataEmissao>"));
    assert!(xml_out.contains("<Competencia>2026-03-01</Competencia>"));
    assert!(xml_out.contains("<ExigibilidadeISS>1</ExigibilidadeISS>"));
    assert!(xml_out.contains("<Cpf>12345678909</Cpf>"));
    assert!(xml_out.contains("<Telefone>31 3222-0000</Telefone>"));
    xml::check_wellformed(&xml_out).unwrap();
}

#[test]
fn v204_money_and_rate_formatting() {
    let xml_out = xml::gerar_xml_lote_rps(&lote(), &MunicipalSchema::abrasf_v204()).unwrap();
    assert!(xml_out.contains("<ValorServicos>5.00</ValorServicos>"));
    assert!(xml_out.contains("<ValorIss>0.00</ValorIss>"));
    // Explicit zero rate is still emitted, with the dialect's 4 decimals.
    assert!(xml_out.contains("<Aliquota>0.0000</Aliquota>"));
}

#[test]
fn absent_optional_fields_are_omitted_entirely() {
    let mut l = lote();
    l.rps[0].servico.aliquota = None;
    l.rps[0].servico.valor_iss = None;
    let xml_out = xml::gerar_xml_lote_rps(&l, &MunicipalSchema::abrasf_v204()).unwrap();
    assert!(!xml_out.contains("<Aliquota>"));
    assert!(!xml_out.contains("<ValorIss>"));
    // Mandatory siblings remain.
    assert!(xml_out.contains("<ValorServicos>5.00</ValorServicos>"));
}

#[test]
fn description_is_escaped_not_mangled() {
    let mut l = lote();
    l.rps[0].servico.discriminacao = "1- Pecas & mao de obra <urgente>".into();
    let xml_out = xml::gerar_xml_lote_rps(&l, &MunicipalSchema::abrasf_v204()).unwrap();
    assert!(xml_out.contains("1- Pecas &amp; mao de obra &lt;urgente&gt;"));
    xml::check_wellformed(&xml_out).unwrap();
}

#[test]
fn legal_entity_tomador_uses_cnpj_element() {
    let mut l = lote();
    l.rps[0].tomador = TomadorBuilder::new("12.345.678/0001-99", "Cliente SA")
        .endereco(
            EnderecoBuilder::new("Av B", "200", "Savassi", "3106200", "MG", "30130-010").build(),
        )
        .build();
    let xml_out = xml::gerar_xml_lote_rps(&l, &MunicipalSchema::abrasf_v204()).unwrap();
    assert!(xml_out.contains("<Cnpj>12345678000199</Cnpj>"));
    // No Contato block when neither phone nor email is present.
    assert!(!xml_out.contains("<Contato>"));
}

#[test]
fn construcao_civil_and_reforma_blocks() {
    let mut l = lote();
    l.rps[0].construcao_civil = Some(ConstrucaoCivil {
        codigo_obra: "OB-77".into(),
        art: "ART-123".into(),
    });
    l.rps[0].reforma_tributaria = Some(ReformaTributaria {
        valor_ibs: dec!(0.40),
        valor_cbs: dec!(0.45),
    });
    l.rps[0].regime_especial_tributacao = Some(RegimeEspecialTributacao::Estimativa);
    let xml_out = xml::gerar_xml_lote_rps(&l, &MunicipalSchema::abrasf_v204()).unwrap();
    assert!(xml_out.contains("<ConstrucaoCivil><CodigoObra>OB-77</CodigoObra><Art>ART-123</Art></ConstrucaoCivil>"));
    // Declaration sequence: ConstrucaoCivil precedes RegimeEspecialTributacao.
    let obra_pos = xml_out.find("<ConstrucaoCivil>").unwrap();
    let regime_pos = xml_out.find("<RegimeEspecialTributacao>").unwrap();
    assert!(obra_pos < regime_pos);
    assert!(xml_out.contains("<ReformaTributaria><ValorIbs>0.40</ValorIbs><ValorCbs>0.45</ValorCbs></ReformaTributaria>"));

    // Dialects without the reform revision omit the block even when present.
    let xml_out = xml::gerar_xml_lote_rps(&l, &MunicipalSchema::issnet()).unwrap();
    assert!(!xml_out.contains("<ReformaTributaria>"));
}

// ---------------------------------------------------------------------------
// Dialect divergence
// ---------------------------------------------------------------------------

#[test]
fn issnet_uses_compact_dates_and_two_decimal_rates() {
    let mut l = lote();
    l.rps[0].servico.aliquota = Some(dec!(0.02));
    l.rps[0].servico.valor_iss = Some(dec!(0.10));
    let xml_out = xml::gerar_xml_lote_rps(&l, &MunicipalSchema::issnet()).unwrap();
    assert!(xml_out.contains("<DataEmissao>20260310</DataEmissao>"));
    assert!(xml_out.contains("<Competencia>20260301</Competencia>"));
    assert!(xml_out.contains("<Aliquota>0.02</Aliquota>"));
}

#[test]
fn ginfes_uses_v1_layout() {
    let xml_out = xml::gerar_xml_lote_rps(&lote(), &MunicipalSchema::ginfes()).unwrap();
    assert!(xml_out.contains("<InfRps Id=\"rpsA1\">"));
    // 1.x: bare prestador Cnpj, NaturezaOperacao instead of ExigibilidadeISS,
    // withholding flag and base inside Valores.
    assert!(xml_out.contains("<Cnpj>45987654000121</Cnpj><InscricaoMunicipal>123456</InscricaoMunicipal>"));
    assert!(xml_out.contains("<NaturezaOperacao>1</NaturezaOperacao>"));
    assert!(!xml_out.contains("<ExigibilidadeISS>"));
    assert!(xml_out.contains("<BaseCalculo>5.00</BaseCalculo>"));
    assert!(xml_out.contains("<IncentivadorCultural>2</IncentivadorCultural>"));
    assert!(!xml_out.contains("<Competencia>"));
    xml::check_wellformed(&xml_out).unwrap();
}

// ---------------------------------------------------------------------------
// End-to-end minimal scenario
// ---------------------------------------------------------------------------

#[test]
fn minimal_lote_end_to_end() {
    // One RPS, 5.00 total, zero rate, not withheld — must serialize to a
    // well-formed document with exactly one Rps element (v1 layout has no
    // nested Rps block, so the count is unambiguous).
    let xml_out = xml::gerar_xml_lote_rps(&lote(), &MunicipalSchema::ginfes()).unwrap();
    assert_eq!(xml_out.matches("<Rps>").count(), 1);
    assert!(xml_out.contains("<ValorServicos>5.00</ValorServicos>"));
    assert!(xml_out.contains("<IssRetido>2</IssRetido>"));
    xml::check_wellformed(&xml_out).unwrap();
}

#[test]
fn multiple_rps_emit_unique_declaration_ids() {
    let mut second = rps();
    second.identificacao.numero = "2".into();
    let l = LoteBuilder::new("lote9", 9)
        .prestador("45.987.654/0001-21", "123456")
        .add_rps(rps())
        .add_rps(second)
        .build()
        .unwrap();
    let xml_out = xml::gerar_xml_lote_rps(&l, &MunicipalSchema::abrasf_v204()).unwrap();
    assert!(xml_out.contains("Id=\"rpsA1\""));
    assert!(xml_out.contains("Id=\"rpsA2\""));
    assert!(xml_out.contains("<QuantidadeRps>2</QuantidadeRps>"));
}

// ---------------------------------------------------------------------------
// CompNfse wrapper
// ---------------------------------------------------------------------------

#[test]
fn comp_nfse_wraps_declaration() {
    let nfse = Nfse {
        numero: "2026000000123".into(),
        codigo_verificacao: "AB12-CD34".into(),
        data_emissao: parse_data_emissao("2026-03-11T08:00:00").unwrap(),
        prestador: Prestador {
            cnpj: "45987654000121".into(),
            inscricao_municipal: "123456".into(),
        },
        declaracao: rps(),
    };
    let xml_out = xml::gerar_xml_comp_nfse(&nfse, &MunicipalSchema::abrasf_v204()).unwrap();
    assert!(xml_out.contains("<CompNfse xmlns=\"http://www.abrasf.org.br/nfse.xsd\">"));
    assert!(xml_out.contains("<Nfse versao=\"2.04\">"));
    assert!(xml_out.contains("<InfNfse Id=\"nfse2026000000123\">"));
    assert!(xml_out.contains("<CodigoVerificacao>AB12-CD34</CodigoVerificacao>"));
    assert!(xml_out.contains("<DeclaracaoPrestacaoServico><InfDeclaracaoPrestacaoServico Id=\"rpsA1\">"));
    xml::check_wellformed(&xml_out).unwrap();
}
