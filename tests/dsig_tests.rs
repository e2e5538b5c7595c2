#![cfg(feature = "dsig")]

use abrasf::core::*;
use abrasf::dsig::{SignRequest, XmlSigner, load_certificate, sign_document};
use abrasf::xml;
use rust_decimal_macros::dec;

/// Stand-in for the external XML-DSig primitive: emits a structurally
/// complete Signature fragment pointing at the requested Id.
struct FakeSigner;

impl XmlSigner for FakeSigner {
    fn sign(&self, request: &SignRequest<'_>) -> Result<String, NfseError> {
        Ok(format!(
            concat!(
                "<Signature xmlns=\"http://www.w3.org/2000/09/xmldsig#\">",
                "<SignedInfo><Reference URI=\"#{id}\">",
                "<DigestValue>ZmFrZQ==</DigestValue>",
                "</Reference></SignedInfo>",
                "<SignatureValue>c2ln</SignatureValue>",
                "</Signature>"
            ),
            id = request.reference_id
        ))
    }
}

/// Signer that points its Reference at the wrong node.
struct WrongUriSigner;

impl XmlSigner for WrongUriSigner {
    fn sign(&self, _request: &SignRequest<'_>) -> Result<String, NfseError> {
        Ok("<Signature><SignedInfo><Reference URI=\"#elsewhere\"/></SignedInfo></Signature>".into())
    }
}

/// Signer that rejects any digest other than the one it was built for.
struct DigestCheckingSigner(DigestAlgorithm);

impl XmlSigner for DigestCheckingSigner {
    fn sign(&self, request: &SignRequest<'_>) -> Result<String, NfseError> {
        if request.digest != self.0 {
            return Err(NfseError::Signer("unexpected digest algorithm".into()));
        }
        FakeSigner.sign(request)
    }
}

fn servico() -> Servico {
    Servico {
        valor_servicos: dec!(100.00),
        valor_deducoes: None,
        valor_iss: Some(dec!(2.00)),
        aliquota: Some(dec!(0.02)),
        base_calculo: dec!(100.00),
        iss_retido: SimNao::Nao,
        item_lista_servico: "1401".into(),
        codigo_cnae: None,
        discriminacao: "1- Manutencao predial".into(),
        codigo_municipio: "3106200".into(),
        exigibilidade_iss: ExigibilidadeIss::Exigivel,
    }
}

fn rps(numero: &str) -> Rps {
    RpsBuilder::new(
        numero,
        "A",
        TipoRps::Rps,
        parse_data_emissao("2026-03-10T09:30:00").unwrap(),
    )
    .servico(servico())
    .tomador(
        TomadorBuilder::new("12345678909", "Fulano de Tal")
            .endereco(
                EnderecoBuilder::new("Rua A", "10", "Centro", "3106200", "MG", "30130010").build(),
            )
            .build(),
    )
    .build()
    .unwrap()
}

fn unsigned_lote_xml(schema: &MunicipalSchema, rps_numbers: &[&str]) -> String {
    let mut builder = LoteBuilder::new("lote1", 1).prestador("45987654000121", "123456");
    for n in rps_numbers {
        builder = builder.add_rps(rps(n));
    }
    xml::gerar_xml_lote_rps(&builder.build().unwrap(), schema).unwrap()
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

#[test]
fn v204_signs_each_rps_and_the_batch() {
    let schema = MunicipalSchema::abrasf_v204();
    let unsigned = unsigned_lote_xml(&schema, &["1"]);
    let signed = sign_document(&unsigned, &schema, &FakeSigner).unwrap();

    assert_eq!(signed.matches("<Signature").count(), 2);
    // Each signature sits right after the node it covers, as a sibling.
    assert!(signed.contains("</InfDeclaracaoPrestacaoServico><Signature"));
    assert!(signed.contains("</LoteRps><Signature"));
    assert!(signed.contains("URI=\"#rpsA1\""));
    assert!(signed.contains("URI=\"#lote1\""));
    xml::check_wellformed(&signed).unwrap();
}

#[test]
fn rps_only_schema_skips_the_batch_signature() {
    let schema = MunicipalSchema::issnet();
    let unsigned = unsigned_lote_xml(&schema, &["1"]);
    let signed = sign_document(&unsigned, &schema, &FakeSigner).unwrap();

    assert_eq!(signed.matches("<Signature").count(), 1);
    assert!(signed.contains("URI=\"#rpsA1\""));
    assert!(!signed.contains("URI=\"#lote1\""));
}

#[test]
fn three_rps_batch_carries_four_signatures() {
    let schema = MunicipalSchema::abrasf_v204();
    let unsigned = unsigned_lote_xml(&schema, &["1", "2", "3"]);
    let signed = sign_document(&unsigned, &schema, &FakeSigner).unwrap();
    assert_eq!(signed.matches("<Signature").count(), 4);
    for uri in ["#rpsA1", "#rpsA2", "#rpsA3", "#lote1"] {
        assert!(signed.contains(&format!("URI=\"{uri}\"")), "missing {uri}");
    }
}

#[test]
fn resigning_is_idempotent() {
    let schema = MunicipalSchema::abrasf_v204();
    let unsigned = unsigned_lote_xml(&schema, &["1", "2"]);
    let signed_once = sign_document(&unsigned, &schema, &FakeSigner).unwrap();
    let signed_twice = sign_document(&signed_once, &schema, &FakeSigner).unwrap();

    assert_eq!(signed_twice.matches("<Signature").count(), 3);
    assert_eq!(signed_once, signed_twice);
}

#[test]
fn ginfes_v1_layout_is_signed_at_inf_rps() {
    let schema = MunicipalSchema::ginfes();
    let unsigned = unsigned_lote_xml(&schema, &["1"]);
    let signed = sign_document(&unsigned, &schema, &FakeSigner).unwrap();
    assert!(signed.contains("</InfRps><Signature"));
    assert_eq!(signed.matches("<Signature").count(), 2);
}

// ---------------------------------------------------------------------------
// Id assignment
// ---------------------------------------------------------------------------

#[test]
fn missing_declaration_id_is_synthesized_from_identification() {
    let schema = MunicipalSchema::ginfes();
    let unsigned = unsigned_lote_xml(&schema, &["7"]).replace(" Id=\"rpsA7\"", "");
    assert!(!unsigned.contains("rpsA7"));

    let signed = sign_document(&unsigned, &schema, &FakeSigner).unwrap();
    assert!(signed.contains("<InfRps Id=\"rpsA7\">"));
    assert!(signed.contains("URI=\"#rpsA7\""));
}

#[test]
fn missing_batch_id_is_synthesized_from_lot_number() {
    let schema = MunicipalSchema::abrasf_v204();
    let unsigned = unsigned_lote_xml(&schema, &["1"]).replace(" Id=\"lote1\"", "");

    let signed = sign_document(&unsigned, &schema, &FakeSigner).unwrap();
    assert!(signed.contains("Id=\"lote1\""));
    assert!(signed.contains("URI=\"#lote1\""));
}

#[test]
fn duplicate_ids_abort_before_signing() {
    let schema = MunicipalSchema::abrasf_v204();
    // Two RPS whose identifications collapse to the same Id.
    let unsigned = unsigned_lote_xml(&schema, &["1", "2"]).replace("rpsA2", "rpsA1");
    let err = sign_document(&unsigned, &schema, &FakeSigner).unwrap_err();
    assert!(matches!(err, NfseError::InvalidFormat { .. }));
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[test]
fn document_without_targets_fails() {
    let schema = MunicipalSchema::abrasf_v204();
    let err = sign_document("<Outro><Nada/></Outro>", &schema, &FakeSigner).unwrap_err();
    assert!(matches!(err, NfseError::SignatureTargetNotFound(_)));
}

#[test]
fn mismatched_reference_uri_is_rejected() {
    let schema = MunicipalSchema::abrasf_v204();
    let unsigned = unsigned_lote_xml(&schema, &["1"]);
    let err = sign_document(&unsigned, &schema, &WrongUriSigner).unwrap_err();
    assert!(matches!(err, NfseError::Signer(_)));
}

#[test]
fn signer_failure_propagates() {
    struct FailingSigner;
    impl XmlSigner for FailingSigner {
        fn sign(&self, _request: &SignRequest<'_>) -> Result<String, NfseError> {
            Err(NfseError::Certificate("certificate expired".into()))
        }
    }
    let schema = MunicipalSchema::abrasf_v204();
    let unsigned = unsigned_lote_xml(&schema, &["1"]);
    let err = sign_document(&unsigned, &schema, &FailingSigner).unwrap_err();
    assert!(matches!(err, NfseError::Certificate(_)));
}

#[test]
fn malformed_input_is_rejected() {
    let schema = MunicipalSchema::abrasf_v204();
    let err = sign_document("<LoteRps><oops></LoteRps>", &schema, &FakeSigner).unwrap_err();
    assert!(matches!(err, NfseError::MalformedXml(_)));
}

// ---------------------------------------------------------------------------
// Certificate boundary
// ---------------------------------------------------------------------------

#[test]
fn certificate_loading_round_trips_bytes() {
    let path = std::env::temp_dir().join("abrasf_cert_load_test.pfx");
    std::fs::write(&path, b"pkcs12-bytes").unwrap();
    let handle = load_certificate(&path, "senha").unwrap();
    assert_eq!(handle.as_bytes(), b"pkcs12-bytes");
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn missing_certificate_file_is_a_certificate_error() {
    let err = load_certificate("/nonexistent/cert.pfx", "senha").unwrap_err();
    assert!(matches!(err, NfseError::Certificate(_)));
}

#[test]
fn blank_certificate_password_is_rejected() {
    let path = std::env::temp_dir().join("abrasf_cert_blank_pw_test.pfx");
    std::fs::write(&path, b"pkcs12-bytes").unwrap();
    let err = load_certificate(&path, "").unwrap_err();
    assert!(matches!(err, NfseError::Certificate(_)));
    std::fs::remove_file(&path).unwrap();
}

// ---------------------------------------------------------------------------
// Digest selection
// ---------------------------------------------------------------------------

#[test]
fn digest_follows_the_schema() {
    let v204 = MunicipalSchema::abrasf_v204();
    let unsigned = unsigned_lote_xml(&v204, &["1"]);
    sign_document(&unsigned, &v204, &DigestCheckingSigner(DigestAlgorithm::Sha256)).unwrap();

    let ginfes = MunicipalSchema::ginfes();
    let unsigned = unsigned_lote_xml(&ginfes, &["1"]);
    sign_document(&unsigned, &ginfes, &DigestCheckingSigner(DigestAlgorithm::Sha1)).unwrap();
}
