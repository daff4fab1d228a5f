//! Inventory request builder output, omission rules and round trips

mod common;

use braintacle_inventory::constants::elements;
use braintacle_inventory::hydrator::Value;
use braintacle_inventory::models::CustomFieldType;
use braintacle_inventory::{
    read_inventory, Client, InventoryDocument, InventoryError, InventoryRequest, InventoryRequestBuilder,
    ItemType,
};
use common::{fixture, registry, sample_client, schema_directory, ClientBuilder};

fn build(client: &Client) -> InventoryRequest {
    let registry = registry();
    InventoryRequestBuilder::new(&registry, schema_directory())
        .build(client)
        .unwrap()
}

fn content_sections(request: &InventoryRequest) -> Vec<String> {
    let doc = request.document();
    let content = doc.find_first(elements::CONTENT).unwrap();
    doc.element_children(content)
        .map(|c| doc.name(c).unwrap().to_string())
        .collect()
}

#[test]
fn test_client_without_bios_has_no_bios_section() {
    let client = ClientBuilder::new("Name")
        .with_system("name", Value::text("Name"))
        .build();
    let request = build(&client);
    assert!(request.document().find_first(elements::BIOS).is_none());
    assert_eq!(content_sections(&request), vec!["HARDWARE"]);
}

#[test]
fn test_bios_with_only_empty_values_is_omitted() {
    let client = ClientBuilder::new("Name")
        .with_bios("manufacturer", Value::text(""))
        .with_bios("serial", Value::Null)
        .build();
    let request = build(&client);
    assert!(content_sections(&request).is_empty());
}

#[test]
fn test_sample_client_layout() {
    let request = build(&sample_client());
    assert_eq!(
        content_sections(&request),
        vec![
            "HARDWARE",
            "BIOS",
            "ACCOUNTINFO",
            "ACCOUNTINFO",
            "DOWNLOAD",
            "CPUS",
            "CPUS",
            "NETWORKS"
        ]
    );

    let doc = request.document();
    let bios = doc.find_first(elements::BIOS).unwrap();
    let bios_children: Vec<_> = doc
        .element_children(bios)
        .map(|c| doc.name(c).unwrap().to_string())
        .collect();
    assert_eq!(bios_children, vec!["SMANUFACTURER", "SSN"]);

    // Items ordered by id: the Intel CPU (id 1) comes first and has no SPEED
    let first_cpu = doc.find_first("CPUS").unwrap();
    let manufacturer = doc.first_child_element(first_cpu, "MANUFACTURER").unwrap();
    assert_eq!(doc.text_content(manufacturer), "Intel");
    assert!(doc.first_child_element(first_cpu, "SPEED").is_none());

    let xml = request.document().to_xml_string().unwrap();
    assert!(xml.contains("<KEYNAME>PURCHASED</KEYNAME>\n      <KEYVALUE>2015-06-04</KEYVALUE>"));
    assert!(xml.contains("<MACADDR>00:0C:29:AB:CD:EF</MACADDR>"));
    assert!(xml.contains("<PACKAGE ID=\"1433442126\"/>"));
}

#[test]
fn test_built_document_is_schema_valid() {
    let request = build(&sample_client());
    assert_eq!(request.validation_report().unwrap(), vec![]);
    assert_eq!(request.derive_filename().unwrap(), "Name-2015-06-04-18-22-06.xml");
}

#[test]
fn test_output_is_deterministic() {
    let first = build(&sample_client()).to_bytes().unwrap();
    let second = build(&sample_client()).to_bytes().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_malformed_custom_date_aborts_build() {
    let client = ClientBuilder::new("Name")
        .with_custom_field("PURCHASED", CustomFieldType::Date, "June 4th")
        .build();
    let registry = registry();
    let err = InventoryRequestBuilder::new(&registry, schema_directory())
        .build(&client)
        .unwrap_err();
    assert!(matches!(err, InventoryError::InvalidFormat(_)));
}

#[test]
fn test_invalid_item_value_aborts_build() {
    let client = ClientBuilder::new("Name")
        .with_item(ItemType::Software, 1, &[("installation_date", Value::text("yesterday"))])
        .build();
    let registry = registry();
    let err = InventoryRequestBuilder::new(&registry, schema_directory())
        .build(&client)
        .unwrap_err();
    assert!(matches!(err, InventoryError::Hydration { .. }));
}

#[test]
fn test_fixture_round_trip_is_stable() {
    let registry = registry();
    let builder = InventoryRequestBuilder::new(&registry, schema_directory());

    let uploaded = InventoryRequest::from_bytes(&fixture("inventory.ocs"), schema_directory()).unwrap();
    let snapshot = read_inventory(uploaded.document()).unwrap();
    let client = Client::from_snapshot(&snapshot, &registry).unwrap();
    let exported = builder.build(&client).unwrap();
    assert!(exported.is_valid().unwrap());

    // Lossy transforms only apply once
    let reread = Client::from_snapshot(&read_inventory(exported.document()).unwrap(), &registry).unwrap();
    let reexported = builder.build(&reread).unwrap();
    assert_eq!(exported.to_bytes().unwrap(), reexported.to_bytes().unwrap());

    let xml = exported.document().to_xml_string().unwrap();
    assert!(xml.contains("<SPEED>3300</SPEED>"), "clock speed is normalized");
    assert!(xml.contains("<CAPACITY>0</CAPACITY>"), "empty slot size becomes 0");
    assert!(!xml.contains("<MEMORY>0</MEMORY>"), "unknown video memory is omitted");
    assert!(xml.contains("<CREATEDATE>2015-06-04</CREATEDATE>"));
    assert!(xml.contains("<MACADDR>F8:B1:56:AA:BB:CC</MACADDR>"));
}
