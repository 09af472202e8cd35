use roxmltree::{Document, Node};

use crate::error::ProtocolError;

/// Extracts the rigid body names from a `GetParameters 6d` response.
///
/// Names are taken from `Body/Name` elements one level below the root
/// (`<QTM_Parameters_Ver_x.y><The_6D><Body><Name>`), in document order.
pub fn parse_body_names(xml: &[u8]) -> Result<Vec<String>, ProtocolError> {
    let text: &str = std::str::from_utf8(xml)?;
    let doc = Document::parse(text)?;

    let names: Vec<String> = doc
        .root_element()
        .children()
        .filter(Node::is_element)
        .flat_map(|section| section.children().filter(|n| n.has_tag_name("Body")))
        .filter_map(|body| body.children().find(|n| n.has_tag_name("Name")))
        .map(|name| name.text().unwrap_or_default().trim().to_string())
        .collect();

    Ok(names)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    const SIX_D_PARAMETERS: &str = r#"<?xml version="1.0"?>
<QTM_Parameters_Ver_1.23>
    <The_6D>
        <Bodies>2</Bodies>
        <Body>
            <Name> drone-01 </Name>
            <Color R="255" G="0" B="0"/>
        </Body>
        <Body>
            <Name>drone-02</Name>
            <Color R="0" G="255" B="0"/>
        </Body>
    </The_6D>
</QTM_Parameters_Ver_1.23>"#;

    #[test]
    fn extracts_names_in_document_order() {
        let names = parse_body_names(SIX_D_PARAMETERS.as_bytes()).unwrap();
        assert_eq!(names, vec!["drone-01", "drone-02"]);
    }

    #[test]
    fn no_bodies_yields_empty_list() {
        let xml = "<QTM_Parameters_Ver_1.23><The_6D><Bodies>0</Bodies></The_6D></QTM_Parameters_Ver_1.23>";
        assert!(parse_body_names(xml.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn ignores_bodies_at_other_depths() {
        let xml = "<Root><Body><Name>too-shallow</Name></Body><The_6D><Group><Body><Name>too-deep</Name></Body></Group></The_6D></Root>";
        assert!(parse_body_names(xml.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let result = parse_body_names(b"<QTM_Parameters_Ver_1.23><The_6D>");
        assert!(matches!(result, Err(ProtocolError::Xml(_))));
    }
}
