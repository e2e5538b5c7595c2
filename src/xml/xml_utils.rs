use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::Decimal;
use std::io::Cursor;

use crate::core::{NfseError, format_decimal, format_valor, xml_safe_text};

pub type XmlResult = Result<String, NfseError>;

fn xml_io(e: std::io::Error) -> NfseError {
    NfseError::Xml(format!("XML write error: {e}"))
}

/// Thin event-writer wrapper over quick-xml. Text content is escaped through
/// [`xml_safe_text`] (char-range filtering + idempotent entity escaping), so
/// the writer receives pre-escaped bytes.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub fn new() -> Result<Self, NfseError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(quick_xml::events::BytesDecl::new(
                "1.0",
                Some("UTF-8"),
                None,
            )))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    pub fn into_string(self) -> Result<String, NfseError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| NfseError::Xml(format!("XML UTF-8 error: {e}")))
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, NfseError> {
        let elem = BytesStart::new(name);
        self.writer
            .write_event(Event::Start(elem))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, NfseError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer
            .write_event(Event::Start(elem))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, NfseError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, NfseError> {
        self.start_element(name)?;
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(xml_safe_text(text))))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    /// Write a monetary element: exactly 2 decimals, dot separator.
    pub fn valor_element(&mut self, name: &str, valor: Decimal) -> Result<&mut Self, NfseError> {
        self.text_element(name, &format_valor(valor))
    }

    /// Write a tax-rate element with the municipality's fraction digits.
    pub fn aliquota_element(
        &mut self,
        name: &str,
        aliquota: Decimal,
        decimals: u32,
    ) -> Result<&mut Self, NfseError> {
        self.text_element(name, &format_decimal(aliquota, decimals))
    }
}

/// Re-parse generated text as a local sanity check — never a network
/// round-trip. A failure here is an internal-bug signal.
pub fn check_wellformed(xml: &str) -> Result<(), NfseError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => {
                return Err(NfseError::MalformedXml(format!(
                    "parse error at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }
}
