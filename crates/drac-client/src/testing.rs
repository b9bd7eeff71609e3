//! Recording fake transport and canned DRAC responses for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{DracError, Result};
use crate::uris::Resource;
use crate::wsman::{Document, Properties, SelectorSet, Transport};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Enumerate {
        resource: Resource,
        filter: Option<String>,
    },
    Invoke {
        resource: Resource,
        method: String,
        selectors: SelectorSet,
        properties: Properties,
    },
}

#[derive(Debug, Clone)]
enum Reply {
    Body(String),
    Fail { status: u16, message: String },
}

impl Reply {
    fn into_result(self) -> Result<Document> {
        match self {
            Self::Body(body) => Document::parse(&body),
            Self::Fail { status, message } => Err(DracError::Request { status, message }),
        }
    }
}

/// Transport returning queued replies and recording every call.
///
/// The last queued reply for a key is reused for further calls.
#[derive(Default)]
pub(crate) struct FakeTransport {
    enumerations: Mutex<HashMap<Resource, VecDeque<Reply>>>,
    invocations: Mutex<HashMap<(Resource, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_enumerate(self, resource: Resource, body: impl Into<String>) -> Self {
        self.enumerations
            .lock()
            .unwrap()
            .entry(resource)
            .or_default()
            .push_back(Reply::Body(body.into()));
        self
    }

    pub(crate) fn on_invoke(self, resource: Resource, method: &str, body: impl Into<String>) -> Self {
        self.push_invoke(resource, method, Reply::Body(body.into()));
        self
    }

    pub(crate) fn fail_invoke(self, resource: Resource, method: &str, status: u16, message: &str) -> Self {
        self.push_invoke(
            resource,
            method,
            Reply::Fail {
                status,
                message: message.to_string(),
            },
        );
        self
    }

    fn push_invoke(&self, resource: Resource, method: &str, reply: Reply) {
        self.invocations
            .lock()
            .unwrap()
            .entry((resource, method.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Names of invoked methods, in call order.
    pub(crate) fn invoked_methods(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Invoke { method, .. } => Some(method),
                Call::Enumerate { .. } => None,
            })
            .collect()
    }

    /// Properties passed to the `n`-th invocation of `method`.
    pub(crate) fn invoked_properties(&self, method: &str, n: usize) -> Properties {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Invoke {
                    method: m,
                    properties,
                    ..
                } if m == method => Some(properties),
                _ => None,
            })
            .nth(n)
            .unwrap_or_else(|| panic!("{method} was not invoked {} time(s)", n + 1))
    }
}

fn next_reply(queue: &mut VecDeque<Reply>) -> Option<Reply> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn enumerate(&self, resource: Resource, filter_query: Option<&str>) -> Result<Document> {
        self.calls.lock().unwrap().push(Call::Enumerate {
            resource,
            filter: filter_query.map(str::to_string),
        });
        let reply = self
            .enumerations
            .lock()
            .unwrap()
            .get_mut(&resource)
            .and_then(next_reply)
            .unwrap_or_else(|| panic!("no enumeration reply for {resource}"));
        reply.into_result()
    }

    async fn invoke(
        &self,
        resource: Resource,
        method: &str,
        selectors: &SelectorSet,
        properties: &Properties,
    ) -> Result<Document> {
        self.calls.lock().unwrap().push(Call::Invoke {
            resource,
            method: method.to_string(),
            selectors: selectors.clone(),
            properties: properties.clone(),
        });
        let reply = self
            .invocations
            .lock()
            .unwrap()
            .get_mut(&(resource, method.to_string()))
            .and_then(next_reply)
            .unwrap_or_else(|| panic!("no reply for {resource}.{method}"));
        reply.into_result()
    }
}

/// Optimized `EnumerateResponse` carrying the given instances.
///
/// Instances use the `n1` prefix, which is bound to the resource URI.
pub(crate) fn enumeration_body(resource: Resource, instances: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
    xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing"
    xmlns:wsen="http://schemas.xmlsoap.org/ws/2004/09/enumeration"
    xmlns:wsman="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xmlns:n1="{uri}">
  <s:Header>
    <wsa:Action>http://schemas.xmlsoap.org/ws/2004/09/enumeration/EnumerateResponse</wsa:Action>
  </s:Header>
  <s:Body>
    <wsen:EnumerateResponse>
      <wsman:Items>{items}</wsman:Items>
      <wsman:EndOfSequence/>
    </wsen:EnumerateResponse>
  </s:Body>
</s:Envelope>"#,
        uri = resource.uri(),
        items = instances.concat(),
    )
}

/// One `<n1:Class>` instance with the given `(field, value)` children.
///
/// A `None` value renders as `xsi:nil="true"`.
pub(crate) fn instance(resource: Resource, fields: &[(&str, Option<&str>)]) -> String {
    let class = resource.class_name();
    let mut xml = format!("<n1:{class}>");
    for (name, value) in fields {
        match value {
            Some(v) => xml.push_str(&format!("<n1:{name}>{v}</n1:{name}>")),
            None => xml.push_str(&format!("<n1:{name} xsi:nil=\"true\"/>")),
        }
    }
    xml.push_str(&format!("</n1:{class}>"));
    xml
}

/// `<method>_OUTPUT` body with a `ReturnValue` and extra fields.
pub(crate) fn invoke_body(resource: Resource, method: &str, return_value: &str, extra: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
    xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing"
    xmlns:wsman="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd"
    xmlns:n1="{uri}">
  <s:Header>
    <wsa:Action>{uri}/{method}Response</wsa:Action>
  </s:Header>
  <s:Body>
    <n1:{method}_OUTPUT>
      {extra}
      <n1:ReturnValue>{return_value}</n1:ReturnValue>
    </n1:{method}_OUTPUT>
  </s:Body>
</s:Envelope>"#,
        uri = resource.uri(),
    )
}

pub(crate) fn invoke_response(resource: Resource, method: &str, return_value: &str, extra: &str) -> Document {
    Document::parse(&invoke_body(resource, method, return_value, extra)).unwrap()
}

/// Successful `CreateTargetedConfigJob` body referencing `job_id`.
pub(crate) fn job_created_body(resource: Resource, job_id: &str) -> String {
    let reference = format!(
        r#"<n1:Job>
        <wsa:EndpointReference>
          <wsa:Address>http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous</wsa:Address>
          <wsa:ReferenceParameters>
            <wsman:ResourceURI>http://schemas.dell.com/wbem/wscim/1/cim-schema/2/DCIM_LifecycleJob</wsman:ResourceURI>
            <wsman:SelectorSet>
              <wsman:Selector Name="InstanceID">{job_id}</wsman:Selector>
              <wsman:Selector Name="__cimnamespace">root/dcim</wsman:Selector>
            </wsman:SelectorSet>
          </wsa:ReferenceParameters>
        </wsa:EndpointReference>
      </n1:Job>"#
    );
    invoke_body(resource, "CreateTargetedConfigJob", "4096", &reference)
}

pub(crate) fn job_created_response(resource: Resource, job_id: &str) -> Document {
    Document::parse(&job_created_body(resource, job_id)).unwrap()
}
