//! SOAP envelopes for WS-Management requests.

use quick_xml::escape::escape;

use super::{Properties, PropertyValue, SelectorSet};
use crate::uris::{
    NS_SOAP_ENV, NS_WSMAN, NS_WS_ADDRESSING, NS_WS_ENUMERATION, WQL_DIALECT,
    WS_ADDRESSING_ANONYMOUS,
};

const ACTION_ENUMERATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration/Enumerate";
const ACTION_PULL: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration/Pull";

/// Addressing information shared by every request.
pub(crate) struct Header<'a> {
    pub to: &'a str,
    pub resource_uri: &'a str,
    pub action: &'a str,
    pub selectors: Option<&'a SelectorSet>,
}

impl Header<'_> {
    fn render(&self) -> String {
        let mut header = format!(
            concat!(
                "<s:Header>",
                "<wsa:To s:mustUnderstand=\"true\">{to}</wsa:To>",
                "<wsman:ResourceURI s:mustUnderstand=\"true\">{resource}</wsman:ResourceURI>",
                "<wsa:MessageID s:mustUnderstand=\"true\">uuid:{id}</wsa:MessageID>",
                "<wsa:ReplyTo><wsa:Address>{anonymous}</wsa:Address></wsa:ReplyTo>",
                "<wsa:Action s:mustUnderstand=\"true\">{action}</wsa:Action>",
            ),
            to = escape(self.to),
            resource = escape(self.resource_uri),
            id = uuid::Uuid::new_v4(),
            anonymous = WS_ADDRESSING_ANONYMOUS,
            action = escape(self.action),
        );

        if let Some(selectors) = self.selectors {
            header.push_str("<wsman:SelectorSet>");
            for (key, value) in selectors.pairs() {
                header.push_str(&format!(
                    "<wsman:Selector Name=\"{key}\">{}</wsman:Selector>",
                    escape(value)
                ));
            }
            header.push_str("</wsman:SelectorSet>");
        }

        header.push_str("</s:Header>");
        header
    }
}

fn wrap(header: &Header<'_>, body: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<s:Envelope xmlns:s=\"{soap}\" xmlns:wsa=\"{wsa}\" xmlns:wsman=\"{wsman}\" xmlns:wsen=\"{wsen}\">",
            "{header}<s:Body>{body}</s:Body></s:Envelope>",
        ),
        soap = NS_SOAP_ENV,
        wsa = NS_WS_ADDRESSING,
        wsman = NS_WSMAN,
        wsen = NS_WS_ENUMERATION,
        header = header.render(),
        body = body,
    )
}

/// `Enumerate` request with optimized enumeration.
pub(crate) fn enumerate(
    to: &str,
    resource_uri: &str,
    filter_query: Option<&str>,
    max_elements: u32,
) -> String {
    let header = Header {
        to,
        resource_uri,
        action: ACTION_ENUMERATE,
        selectors: None,
    };

    let filter = filter_query
        .map(|query| {
            format!(
                "<wsman:Filter Dialect=\"{WQL_DIALECT}\">{}</wsman:Filter>",
                escape(query)
            )
        })
        .unwrap_or_default();

    let body = format!(
        concat!(
            "<wsen:Enumerate>",
            "<wsman:OptimizeEnumeration/>",
            "<wsman:MaxElements>{max_elements}</wsman:MaxElements>",
            "{filter}",
            "</wsen:Enumerate>",
        ),
        max_elements = max_elements,
        filter = filter,
    );

    wrap(&header, &body)
}

/// `Pull` request continuing an enumeration.
pub(crate) fn pull(to: &str, resource_uri: &str, context: &str, max_elements: u32) -> String {
    let header = Header {
        to,
        resource_uri,
        action: ACTION_PULL,
        selectors: None,
    };

    let body = format!(
        concat!(
            "<wsen:Pull>",
            "<wsen:EnumerationContext>{context}</wsen:EnumerationContext>",
            "<wsman:MaxElements>{max_elements}</wsman:MaxElements>",
            "</wsen:Pull>",
        ),
        context = escape(context),
        max_elements = max_elements,
    );

    wrap(&header, &body)
}

/// Method invocation with `<method>_INPUT` body.
pub(crate) fn invoke(
    to: &str,
    resource_uri: &str,
    method: &str,
    selectors: &SelectorSet,
    properties: &Properties,
) -> String {
    let action = format!("{resource_uri}/{method}");
    let header = Header {
        to,
        resource_uri,
        action: &action,
        selectors: Some(selectors),
    };

    let mut body = format!(
        "<p:{method}_INPUT xmlns:p=\"{}\">",
        escape(resource_uri)
    );
    for (name, value) in properties.iter() {
        match value {
            PropertyValue::Single(v) => {
                body.push_str(&format!("<p:{name}>{}</p:{name}>", escape(v.as_str())));
            }
            PropertyValue::List(values) => {
                for v in values {
                    body.push_str(&format!("<p:{name}>{}</p:{name}>", escape(v.as_str())));
                }
            }
        }
    }
    body.push_str(&format!("</p:{method}_INPUT>"));

    wrap(&header, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uris::Resource;
    use crate::wsman::Document;

    const TO: &str = "https://1.2.3.4:443/wsman";

    #[test]
    fn test_enumerate_envelope_with_filter() {
        let uri = Resource::SystemView.uri();
        let xml = enumerate(
            TO,
            &uri,
            Some("select LifecycleControllerVersion from DCIM_SystemView"),
            100,
        );
        let doc = Document::parse(&xml).unwrap();

        let filter = doc.find(NS_WSMAN, "Filter").unwrap();
        assert_eq!(filter.attribute("Dialect"), Some(WQL_DIALECT));
        assert_eq!(
            filter.text(),
            Some("select LifecycleControllerVersion from DCIM_SystemView")
        );
        assert_eq!(doc.find(NS_WSMAN, "ResourceURI").unwrap().text(), Some(uri.as_str()));
        assert_eq!(
            doc.find(NS_WS_ADDRESSING, "Action").unwrap().text(),
            Some(ACTION_ENUMERATE)
        );
        assert!(doc.find(NS_WSMAN, "OptimizeEnumeration").is_some());
    }

    #[test]
    fn test_filter_is_escaped() {
        let xml = enumerate(TO, "urn:x", Some("select * from X where A='<b>'"), 100);
        assert!(xml.contains("&lt;b&gt;"));
        let doc = Document::parse(&xml).unwrap();
        assert_eq!(
            doc.find(NS_WSMAN, "Filter").unwrap().text(),
            Some("select * from X where A='<b>'")
        );
    }

    #[test]
    fn test_pull_envelope() {
        let xml = pull(TO, "urn:x", "ctx-42", 50);
        let doc = Document::parse(&xml).unwrap();
        assert_eq!(
            doc.find(NS_WS_ENUMERATION, "EnumerationContext").unwrap().text(),
            Some("ctx-42")
        );
        assert_eq!(doc.find(NS_WSMAN, "MaxElements").unwrap().text(), Some("50"));
    }

    #[test]
    fn test_invoke_envelope_repeats_list_values() {
        let resource = Resource::IdracCardService;
        let uri = resource.uri();
        let selectors = SelectorSet::for_service(resource);
        let properties = Properties::new()
            .with("Target", "iDRAC.Embedded.1")
            .with_list(
                "AttributeName",
                vec!["SSH.1#Enable".into(), "VNCServer.1#Enable".into()],
            )
            .with_list("AttributeValue", vec!["Enabled".into(), "Disabled".into()]);

        let xml = invoke(TO, &uri, "SetAttributes", &selectors, &properties);
        let doc = Document::parse(&xml).unwrap();

        assert_eq!(
            doc.find(NS_WS_ADDRESSING, "Action").unwrap().text(),
            Some(format!("{uri}/SetAttributes").as_str())
        );
        assert!(doc.find(&uri, "SetAttributes_INPUT").is_some());

        let names: Vec<_> = doc
            .find_all(&uri, "AttributeName")
            .into_iter()
            .filter_map(|e| e.text())
            .collect();
        assert_eq!(names, vec!["SSH.1#Enable", "VNCServer.1#Enable"]);

        let selector_names: Vec<_> = doc
            .find_all(NS_WSMAN, "Selector")
            .into_iter()
            .filter_map(|e| e.attribute("Name"))
            .collect();
        assert_eq!(
            selector_names,
            vec!["Name", "SystemName", "CreationClassName", "SystemCreationClassName"]
        );
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = Document::parse(&pull(TO, "urn:x", "c", 1)).unwrap();
        let b = Document::parse(&pull(TO, "urn:x", "c", 1)).unwrap();
        assert_ne!(
            a.find(NS_WS_ADDRESSING, "MessageID").unwrap().text(),
            b.find(NS_WS_ADDRESSING, "MessageID").unwrap().text()
        );
    }
}
