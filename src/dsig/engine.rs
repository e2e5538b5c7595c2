//! Signature placement: locate targets, assign Ids, invoke the external
//! signer, and insert each `Signature` as the immediate next sibling of the
//! node it covers. Sibling positioning (not child-append) is mandated by the
//! receiving schemas and is re-verified against the reference URI.

use std::collections::HashSet;

use crate::core::{MunicipalSchema, NfseError, xml_safe_id};
use crate::xml::check_wellformed;

use super::dom::{self, XmlElement, XmlNode, local_name};
use super::signer::{SignRequest, XmlSigner};

struct SignContext<'a> {
    signer: &'a dyn XmlSigner,
    schema: &'a MunicipalSchema,
    /// Every Id present in the document before signing started.
    existing_ids: HashSet<String>,
    /// Ids already claimed by a signed target in this pass.
    claimed_ids: HashSet<String>,
    synth_counter: usize,
}

/// Sign a serialized batch document for the given municipality.
///
/// Two scopes in fixed order: every per-RPS declaration node first, then the
/// `LoteRps` batch root (each only when the schema enables it). Pre-existing
/// `Signature` elements are stripped first, so re-running the pipeline on an
/// already-signed document reproduces the same structure instead of stacking
/// signatures. Fails closed: a short post-count returns
/// [`NfseError::IncompleteSignature`] rather than a partially-signed document.
pub fn sign_document(
    xml: &str,
    schema: &MunicipalSchema,
    signer: &dyn XmlSigner,
) -> Result<String, NfseError> {
    let mut root = dom::parse_element(xml)?;

    // Idempotence: re-signing is not additive.
    root.strip("Signature");

    let rps_count = root.count(schema.declaracao_tag);
    let expected = schema.expected_signatures(rps_count);

    let mut ids = Vec::new();
    root.collect_ids(&mut ids);
    let mut existing_ids = HashSet::new();
    for id in ids {
        if !existing_ids.insert(id.clone()) {
            return Err(NfseError::InvalidFormat {
                field: "Id".into(),
                message: format!("duplicate Id '{id}' in document"),
            });
        }
    }

    let mut ctx = SignContext {
        signer,
        schema,
        existing_ids,
        claimed_ids: HashSet::new(),
        synth_counter: 0,
    };

    if schema.sign_rps {
        let signed = sign_targets(&mut root, schema.declaracao_tag, &mut ctx)?;
        if signed == 0 {
            return Err(NfseError::SignatureTargetNotFound(
                schema.declaracao_tag.to_string(),
            ));
        }
    }
    if schema.sign_lote {
        let signed = sign_targets(&mut root, "LoteRps", &mut ctx)?;
        if signed == 0 {
            return Err(NfseError::SignatureTargetNotFound("LoteRps".into()));
        }
    }

    let found = root.count("Signature");
    if found != expected {
        return Err(NfseError::IncompleteSignature { expected, found });
    }

    let out = dom::to_document_string(&root)?;
    check_wellformed(&out)?;
    Ok(out)
}

/// Walk the tree and sign every element with the target local name,
/// inserting the returned `Signature` right after it. Returns how many
/// targets were signed.
fn sign_targets(
    parent: &mut XmlElement,
    target: &str,
    ctx: &mut SignContext<'_>,
) -> Result<usize, NfseError> {
    let mut signed = 0;
    let mut i = 0;
    while i < parent.children.len() {
        let mut signature: Option<XmlNode> = None;
        if let XmlNode::Element(child) = &mut parent.children[i] {
            if local_name(&child.name) == target {
                let id = ensure_id(child, ctx)?;
                let subtree = dom::to_fragment_string(child)?;
                let fragment = ctx.signer.sign(&SignRequest {
                    subtree_xml: &subtree,
                    reference_id: &id,
                    digest: ctx.schema.digest,
                })?;
                let sig = dom::parse_element(&fragment)?;
                verify_reference(&sig, &id)?;
                signature = Some(XmlNode::Element(sig));
            } else {
                signed += sign_targets(child, target, ctx)?;
            }
        }
        if let Some(node) = signature {
            // Immediate next sibling of the signed node, never a child.
            parent.children.insert(i + 1, node);
            signed += 1;
            i += 1;
        }
        i += 1;
    }
    Ok(signed)
}

/// Use the target's own `Id` or synthesize one from its identification
/// content. Each signed target must claim a unique Id — a collision means
/// two RPS carry the same identifier, which is never silently reused.
fn ensure_id(target: &mut XmlElement, ctx: &mut SignContext<'_>) -> Result<String, NfseError> {
    let id = match target.attr("Id").filter(|v| !v.is_empty()) {
        Some(existing) => existing.to_string(),
        None => {
            let synth = synthesize_id(target, ctx);
            if ctx.existing_ids.contains(&synth) {
                return Err(NfseError::InvalidFormat {
                    field: "Id".into(),
                    message: format!("synthesized Id '{synth}' collides with an existing one"),
                });
            }
            target.set_attr("Id", synth.clone());
            synth
        }
    };
    if !ctx.claimed_ids.insert(id.clone()) {
        return Err(NfseError::InvalidFormat {
            field: "Id".into(),
            message: format!("Id '{id}' is claimed by more than one signed node"),
        });
    }
    Ok(id)
}

fn synthesize_id(target: &XmlElement, ctx: &mut SignContext<'_>) -> String {
    if let Some(ident) = target.find("IdentificacaoRps") {
        let serie = ident.child("Serie").map(|e| e.text()).unwrap_or_default();
        let numero = ident.child("Numero").map(|e| e.text()).unwrap_or_default();
        if !numero.is_empty() {
            return xml_safe_id(&format!("rps{serie}{numero}"));
        }
    }
    if let Some(numero_lote) = target.child("NumeroLote") {
        let n = numero_lote.text();
        if !n.is_empty() {
            return xml_safe_id(&format!("lote{n}"));
        }
    }
    ctx.synth_counter += 1;
    xml_safe_id(&format!("{}{}", local_name(&target.name), ctx.synth_counter))
}

/// The returned fragment must be a `Signature` whose `Reference` points at
/// the signed node's Id.
fn verify_reference(signature: &XmlElement, id: &str) -> Result<(), NfseError> {
    if local_name(&signature.name) != "Signature" {
        return Err(NfseError::Signer(format!(
            "signer returned <{}> instead of a Signature element",
            signature.name
        )));
    }
    let reference = signature
        .find("Reference")
        .ok_or_else(|| NfseError::Signer("Signature has no Reference element".into()))?;
    let uri = reference.attr("URI").unwrap_or_default();
    let expected = format!("#{id}");
    if uri != expected {
        return Err(NfseError::Signer(format!(
            "Reference URI '{uri}' does not match signed node Id '{expected}'"
        )));
    }
    Ok(())
}
