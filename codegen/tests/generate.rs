use std::{cell::RefCell, collections::HashMap, path::PathBuf};

use url::Url;
use wsdlgen_codegen::{generate, generate_with, ArtifactKind, Artifacts, Config, ErrorKind};
use wsdlgen_wsdl::{error::Error as WsdlError, Loader};

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn generate_fixture(name: &str) -> Artifacts {
    generate(fixture(name), &Config::default()).unwrap()
}

fn parse(artifacts: &Artifacts) -> syn::File {
    syn::parse_file(&artifacts.concatenate()).unwrap()
}

fn string_constant(file: &syn::File, name: &str) -> Option<String> {
    file.items.iter().find_map(|item| match item {
        syn::Item::Const(item) if item.ident == name => match &*item.expr {
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(literal),
                ..
            }) => Some(literal.value()),
            _ => None,
        },
        _ => None,
    })
}

#[test]
fn every_fixture_renders_a_valid_file() {
    for name in [
        "test.wsdl",
        "chromedata.xsd",
        "vboxweb.xsd",
        "list.xsd",
        "ferry.wsdl",
        "calculator.wsdl",
        "collisions.xsd",
    ] {
        let artifacts = generate_fixture(name);

        assert!(
            syn::parse_file(&artifacts.concatenate()).is_ok(),
            "{} did not produce valid Rust",
            name
        );
    }
}

#[test]
fn documentation_sits_on_its_own_lines() {
    let artifacts = generate_fixture("test.wsdl");
    let types = artifacts.get(ArtifactKind::Types);

    assert!(types.contains("/// The record matching the requested id."));
    assert!(types.contains("pub get_info_result: Option<Box<Info>>,"));
    assert!(!types
        .lines()
        .any(|line| line.contains("The record matching") && line.contains("get_info_result")));

    assert!(types.contains("/// A single information record.\n///\n/// Returned by GetInfo."));
}

#[test]
fn complex_types_map_to_serde_structs() {
    let artifacts = generate_fixture("test.wsdl");
    let types = artifacts.get(ArtifactKind::Types);

    assert!(types.contains("pub struct GetInfo {"));
    assert!(types.contains("pub id: Option<i32>,"));
    assert!(types.contains("pub tag: Vec<String>,"));
    assert!(types.contains("pub r#type: Option<String>,"));
    assert!(types.contains("pub payload: Option<String>,"));
    assert!(types.contains("#[serde(rename = \"@version\", skip_serializing_if = \"Option::is_none\")]"));
    assert!(types.contains("pub version: Option<u16>,"));
    assert!(types.contains("const NAMESPACE: &'static str = \"http://example.com/info\";"));
}

#[test]
fn operations_call_through_the_soap_client() {
    let artifacts = generate_fixture("test.wsdl");
    let operations = artifacts.get(ArtifactKind::Operations);

    assert!(operations.contains("pub struct InfoSoap<T: SoapTransport> {"));
    assert!(operations.contains("/// Looks up one record."));
    assert!(operations.contains("pub fn get_info(&self, request: &GetInfo) -> Result<GetInfoResponse, SoapError> {"));
    assert!(operations.contains("\"http://example.com/info/GetInfo\""));
    assert!(operations.contains("SoapClient::new(\"http://example.com/info.asmx\", transport)"));
}

#[test]
fn enumeration_values_keep_their_spelling() {
    let artifacts = generate_fixture("chromedata.xsd");
    let file = parse(&artifacts);

    assert_eq!(
        string_constant(&file, "DriveTrainFrontWheelDrive").as_deref(),
        Some("Front Wheel Drive")
    );
    assert_eq!(
        string_constant(&file, "DriveTrainAllWheelDrive").as_deref(),
        Some("All Wheel Drive")
    );

    let types = artifacts.get(ArtifactKind::Types);
    assert!(types.contains(
        "/// Power to the front.\npub const DriveTrainFrontWheelDrive: &str = \"Front Wheel Drive\";"
    ));
    assert!(types.contains("pub type DriveTrain = String;"));
    assert!(types.contains("pub drivetrain: Option<DriveTrain>,"));
    assert!(types.contains("pub model_year: Option<i32>,"));
}

#[test]
fn enumeration_constants_join_type_and_value() {
    let artifacts = generate_fixture("vboxweb.xsd");
    let file = parse(&artifacts);

    assert_eq!(
        string_constant(&file, "SettingsVersionV1_14").as_deref(),
        Some("v1_14")
    );
    assert_eq!(string_constant(&file, "SettingsVersionNull").as_deref(), Some("Null"));

    let types = artifacts.get(ArtifactKind::Types);
    assert!(types.contains("pub type MachineState = u32;"));
    assert!(types.contains("pub const MachineState_5: MachineState = 5;"));
}

#[test]
fn lists_become_vectors() {
    let artifacts = generate_fixture("list.xsd");
    let types = artifacts.get(ArtifactKind::Types);

    assert!(types.contains("pub type Numbers = Vec<i32>;"));
    assert!(types.contains("pub type Codes = Numbers;"));
    assert!(types.contains("/// Pattern: `[A-Z]{3}`\npub type Code = String;"));
}

#[test]
fn soap_headers_get_setters() {
    let artifacts = generate_fixture("ferry.wsdl");
    let operations = artifacts.get(ArtifactKind::Operations);

    assert!(operations.contains("pub fn set_book_header(&mut self, header: &Auth) -> Result<(), SoapError> {"));
    assert!(operations.contains("self.client.set_header(\"urn:ferry\", \"Auth\", header)"));
    assert!(operations.contains("pub fn book(&self, request: &Book) -> Result<BookResponse, SoapError> {"));
}

#[test]
fn imported_schemas_are_merged() {
    let artifacts = generate_fixture("calculator.wsdl");
    let types = artifacts.get(ArtifactKind::Types);
    let operations = artifacts.get(ArtifactKind::Operations);

    assert!(types.contains("pub struct Add {"));
    assert!(types.contains("pub int_a: Option<i32>,"));
    assert!(types.contains("pub struct AddResponse {"));

    assert!(operations.contains("pub fn add(&self, request: &Add) -> Result<AddResponse, SoapError> {"));
    assert!(operations.contains("with_version(SoapVersion::Soap11)"));
    assert!(operations.contains("with_version(SoapVersion::Soap12)"));
}

#[test]
fn glue_names_are_never_shadowed() {
    let artifacts = generate_fixture("collisions.xsd");
    let types = artifacts.get(ArtifactKind::Types);

    assert!(types.contains("pub struct ResponseBody_ {"));
    assert!(types.contains("pub type ResponseEnvelope_ = String;"));
    assert!(types.contains("pub envelope: Option<ResponseEnvelope_>,"));
    assert!(types.contains("pub struct SoapClient_ {"));
    assert!(!types.contains("pub struct ResponseBody {"));
}

#[test]
fn unqualified_local_elements_have_no_namespace() {
    let artifacts = generate_fixture("collisions.xsd");
    let types = artifacts.get(ArtifactKind::Types);

    assert!(types.contains("impl XmlName for GarageSpot {\n    const NAMESPACE: &'static str = \"\";"));
    assert!(types.contains("impl XmlName for Garage {\n    const NAMESPACE: &'static str = \"urn:collisions\";"));
}

#[test]
fn header_names_the_package() {
    let config = Config::new("calculator");
    let artifacts = generate(fixture("calculator.wsdl"), &config).unwrap();
    let header = artifacts.get(ArtifactKind::Header);

    assert!(header.contains("//! Package `calculator`."));
    assert!(header.contains("calculator.wsdl"));
    assert!(artifacts.concatenate().starts_with(header));
}

#[test]
fn missing_documents_are_wsdl_errors() {
    let err = generate(fixture("missing.wsdl"), &Config::default()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Document);
}

/// Serves documents from memory and records every load.
#[derive(Default)]
struct MemoryLoader {
    documents: HashMap<String, &'static str>,
    loads: RefCell<Vec<String>>,
}

impl MemoryLoader {
    fn with(mut self, location: &str, document: &'static str) -> Self {
        self.documents.insert(location.to_owned(), document);
        self
    }
}

impl Loader for MemoryLoader {
    fn load(&self, location: &Url) -> Result<Vec<u8>, WsdlError> {
        self.loads.borrow_mut().push(location.to_string());

        self.documents
            .get(location.as_str())
            .map(|document| document.as_bytes().to_vec())
            .ok_or_else(|| WsdlError::UnsupportedScheme(location.scheme().to_owned()))
    }
}

const SHARED: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:shared">
  <xs:simpleType name="Currency">
    <xs:restriction base="xs:string">
      <xs:enumeration value="EUR"/>
      <xs:enumeration value="GBP"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>"#;

const ORDERS: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:s="urn:shared" targetNamespace="urn:orders">
  <xs:import namespace="urn:shared" schemaLocation="shared.xsd"/>
  <xs:complexType name="Order">
    <xs:sequence>
      <xs:element name="currency" type="s:Currency"/>
    </xs:sequence>
  </xs:complexType>
</xs:schema>"#;

const INVOICES: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:s="urn:shared" targetNamespace="urn:invoices">
  <xs:import namespace="urn:shared" schemaLocation="shared.xsd"/>
  <xs:import namespace="urn:orders" schemaLocation="orders.xsd"/>
  <xs:complexType name="Invoice">
    <xs:sequence>
      <xs:element name="currency" type="s:Currency"/>
      <xs:element name="total" type="xs:decimal"/>
    </xs:sequence>
  </xs:complexType>
</xs:schema>"#;

#[test]
fn shared_imports_render_once() {
    let loader = MemoryLoader::default()
        .with("memory://schemas/shared.xsd", SHARED)
        .with("memory://schemas/orders.xsd", ORDERS)
        .with("memory://schemas/invoices.xsd", INVOICES);
    let location = Url::parse("memory://schemas/invoices.xsd").unwrap();

    let artifacts = generate_with(&loader, &location, &Config::default()).unwrap();
    let types = artifacts.get(ArtifactKind::Types);

    assert_eq!(types.matches("pub type Currency = String;").count(), 1);
    assert_eq!(types.matches("pub const CurrencyEUR: &str = \"EUR\";").count(), 1);
    assert!(types.contains("pub struct Order {"));
    assert!(types.contains("pub struct Invoice {"));

    let loads = loader.loads.borrow();
    assert_eq!(loads.len(), 3);
    assert_eq!(
        loads.iter().filter(|location| location.ends_with("shared.xsd")).count(),
        1
    );
}

#[test]
fn unmapped_primitives_warn_unless_strict() {
    let loader = MemoryLoader::default().with(
        "memory://schemas/time.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:time">
  <xs:simpleType name="Month">
    <xs:restriction base="xs:dateTimeStamp"/>
  </xs:simpleType>
</xs:schema>"#,
    );
    let location = Url::parse("memory://schemas/time.xsd").unwrap();

    let artifacts = generate_with(&loader, &location, &Config::default()).unwrap();
    assert!(artifacts.get(ArtifactKind::Types).contains("pub type Month = String;"));
    assert_eq!(artifacts.warnings().len(), 1);
    assert!(artifacts.warnings()[0].contains("dateTimeStamp"));

    let strict = Config::default().deny_unmapped_primitives(true);
    let err = generate_with(&loader, &location, &strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
}
