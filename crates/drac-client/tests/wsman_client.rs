//! `WsmanClient` against a mock WS-Management endpoint.

use std::sync::Arc;

use drac_client::resources::RemoteService;
use drac_client::{DracClient, DracError, EndpointConfig, Resource, Transport, WsmanClient};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CPU_VIEW: &str = "http://schemas.dell.com/wbem/wscim/1/cim-schema/2/DCIM_CPUView";
const CARD_SERVICE: &str = "http://schemas.dell.com/wbem/wscim/1/cim-schema/2/DCIM_iDRACCardService";

fn config(server: &MockServer) -> EndpointConfig {
    let address = server.address();
    EndpointConfig::new(address.ip().to_string(), "root", "calvin")
        .with_port(address.port())
        .with_protocol("http")
}

fn cpu(fqdd: &str, cores: u32) -> String {
    format!(
        "<n1:DCIM_CPUView><n1:FQDD>{fqdd}</n1:FQDD>\
         <n1:NumberOfProcessorCores>{cores}</n1:NumberOfProcessorCores></n1:DCIM_CPUView>"
    )
}

fn enumerate_response(items: &str, context: Option<&str>) -> String {
    let tail = match context {
        Some(ctx) => format!("<wsen:EnumerationContext>{ctx}</wsen:EnumerationContext>"),
        None => "<wsman:EndOfSequence/>".to_string(),
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
    xmlns:wsen="http://schemas.xmlsoap.org/ws/2004/09/enumeration"
    xmlns:wsman="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd"
    xmlns:n1="{CPU_VIEW}">
  <s:Body>
    <wsen:EnumerateResponse>
      <wsman:Items>{items}</wsman:Items>
      {tail}
    </wsen:EnumerateResponse>
  </s:Body>
</s:Envelope>"#
    )
}

fn pull_response(items: &str, context: Option<&str>) -> String {
    let tail = match context {
        Some(ctx) => format!("<wsen:EnumerationContext>{ctx}</wsen:EnumerationContext>"),
        None => "<wsen:EndOfSequence/>".to_string(),
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
    xmlns:wsen="http://schemas.xmlsoap.org/ws/2004/09/enumeration"
    xmlns:n1="{CPU_VIEW}">
  <s:Body>
    <wsen:PullResponse>
      <wsen:Items>{items}</wsen:Items>
      {tail}
    </wsen:PullResponse>
  </s:Body>
</s:Envelope>"#
    )
}

fn invoke_response(method: &str, return_value: &str, extra: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
    xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing"
    xmlns:wsman="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd"
    xmlns:n1="{CARD_SERVICE}">
  <s:Body>
    <n1:{method}_OUTPUT>{extra}<n1:ReturnValue>{return_value}</n1:ReturnValue></n1:{method}_OUTPUT>
  </s:Body>
</s:Envelope>"#
    )
}

const JOB_REFERENCE: &str = r#"<n1:Job><wsa:EndpointReference><wsa:ReferenceParameters>
    <wsman:SelectorSet>
      <wsman:Selector Name="InstanceID">JID_471269252011</wsman:Selector>
      <wsman:Selector Name="__cimnamespace">root/dcim</wsman:Selector>
    </wsman:SelectorSet>
  </wsa:ReferenceParameters></wsa:EndpointReference></n1:Job>"#;

const FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
    xmlns:wsman="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd">
  <s:Body>
    <s:Fault>
      <s:Code><s:Value>s:Sender</s:Value></s:Code>
      <s:Reason><s:Text>The action is not supported by the service.</s:Text></s:Reason>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

#[tokio::test]
async fn test_enumerate_follows_pull_until_end_of_sequence() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wsman"))
        .and(header("authorization", "Basic cm9vdDpjYWx2aW4="))
        .and(body_string_contains("enumeration/Enumerate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(enumerate_response(&cpu("CPU.Socket.1", 8), Some("ctx-1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("enumeration/Pull"))
        .and(body_string_contains("ctx-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(pull_response(&cpu("CPU.Socket.2", 12), Some("ctx-2"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("enumeration/Pull"))
        .and(body_string_contains("ctx-2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(pull_response(&cpu("CPU.Socket.3", 16), None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = DracClient::new(&config(&server)).unwrap();
    let cpus = client.cpus().list_cpus().await.unwrap();

    let ids: Vec<&str> = cpus.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["CPU.Socket.1", "CPU.Socket.2", "CPU.Socket.3"]);
    assert_eq!(cpus[2].cores, 16);
}

#[tokio::test]
async fn test_enumerate_stops_when_sequence_never_ends() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("enumeration/Enumerate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(enumerate_response(&cpu("CPU.Socket.1", 8), Some("ctx-1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("enumeration/Pull"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(pull_response(&cpu("CPU.Socket.2", 8), Some("ctx-1"))),
        )
        .expect(2)
        .mount(&server)
        .await;

    let transport = WsmanClient::new(&config(&server)).unwrap().with_max_pages(3);
    match transport.enumerate(Resource::CpuView, None).await {
        Err(DracError::InvalidResponse(message)) => assert!(message.contains("3 pages")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_enumerate_sends_filter_and_resource_uri() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains(CPU_VIEW))
        .and(body_string_contains("<wsman:OptimizeEnumeration/>"))
        .and(body_string_contains("<wsman:MaxElements>100</wsman:MaxElements>"))
        .and(body_string_contains("select * from DCIM_CPUView"))
        .respond_with(ResponseTemplate::new(200).set_body_string(enumerate_response("", None)))
        .expect(1)
        .mount(&server)
        .await;

    let transport = WsmanClient::new(&config(&server)).unwrap();
    let doc = transport
        .enumerate(Resource::CpuView, Some("select * from DCIM_CPUView"))
        .await
        .unwrap();
    assert!(doc.find_all(CPU_VIEW, "DCIM_CPUView").is_empty());
}

#[tokio::test]
async fn test_http_error_carries_fault_reason() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string(FAULT))
        .mount(&server)
        .await;

    let client = DracClient::new(&config(&server)).unwrap();
    match client.cpus().list_cpus().await {
        Err(DracError::Request { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "The action is not supported by the service.");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_is_request_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = DracClient::new(&config(&server)).unwrap();
    assert!(matches!(
        client.lifecycle().get_version().await,
        Err(DracError::Request { status: 401, .. })
    ));
}

#[tokio::test]
async fn test_fault_with_ok_status_is_request_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FAULT))
        .mount(&server)
        .await;

    let transport = WsmanClient::new(&config(&server)).unwrap();
    assert!(matches!(
        transport.enumerate(Resource::CpuView, None).await,
        Err(DracError::Request { status: 200, .. })
    ));
}

#[tokio::test]
async fn test_set_remote_services_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains(&format!("{CARD_SERVICE}/SetAttributes")))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(invoke_response("SetAttributes", "0", "")),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains(&format!(
            "{CARD_SERVICE}/CreateTargetedConfigJob"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_string(invoke_response(
            "CreateTargetedConfigJob",
            "4096",
            JOB_REFERENCE,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = DracClient::new(&config(&server)).unwrap();
    let job = client
        .lifecycle()
        .set_remote_services(&[(RemoteService::Ssh, true), (RemoteService::Vnc, false)])
        .await
        .unwrap();
    assert_eq!(job.job_id, "JID_471269252011");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let stage = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(stage.contains("<p:Target>iDRAC.Embedded.1</p:Target>"));
    assert!(stage.contains(concat!(
        "<p:AttributeName>SSH.1#Enable</p:AttributeName>",
        "<p:AttributeName>VNCServer.1#Enable</p:AttributeName>",
        "<p:AttributeValue>Enabled</p:AttributeValue>",
        "<p:AttributeValue>Disabled</p:AttributeValue>",
    )));
    assert!(stage.contains(r#"<wsman:Selector Name="Name">DCIM:iDRACCardService</wsman:Selector>"#));

    let schedule = String::from_utf8(requests[1].body.clone()).unwrap();
    assert!(schedule.contains("<p:ScheduledStartTime>TIME_NOW</p:ScheduledStartTime>"));
    assert!(!schedule.contains("RebootJobType"));
}

#[tokio::test]
async fn test_rejected_stage_skips_job_creation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("/SetAttributes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(invoke_response(
            "SetAttributes",
            "2",
            "<n1:Message>Invalid AttributeValue</n1:Message>",
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("/CreateTargetedConfigJob"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let transport: Arc<dyn Transport> = Arc::new(WsmanClient::new(&config(&server)).unwrap());
    let err = DracClient::with_transport(transport)
        .lifecycle()
        .set_remote_services(&[(RemoteService::Telnet, false)])
        .await
        .unwrap_err();

    match err {
        DracError::OperationFailed { message } => assert_eq!(message, "Invalid AttributeValue"),
        other => panic!("unexpected error: {other:?}"),
    }
}
