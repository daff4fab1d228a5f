//! End-to-end decompression against fixtures

mod common;

use braintacle_inventory::{decode_if_compressed, decompress, is_compressed, InventoryError};
use common::fixture;

#[test]
fn test_compressed_fixture_decodes_to_xml_fixture() {
    let compressed = fixture("inventory.ocs");
    let expected = fixture("inventory.xml");
    assert!(is_compressed(&compressed));
    assert_eq!(decompress(&compressed).unwrap(), expected);
}

#[test]
fn test_non_zlib_input_is_a_decode_error() {
    let err = decompress(b"not a zlib stream").unwrap_err();
    assert!(matches!(err, InventoryError::Decode(_)));
    assert!(err.is_recoverable());
}

#[test]
fn test_truncated_fixture_is_rejected() {
    let compressed = fixture("inventory.ocs");
    let truncated = &compressed[..compressed.len() / 2];
    assert!(matches!(decompress(truncated), Err(InventoryError::Decode(_))));
}

#[test]
fn test_decode_if_compressed_normalizes_both_forms() {
    let xml = fixture("inventory.xml");
    assert!(!is_compressed(&xml));
    assert_eq!(decode_if_compressed(&xml).unwrap(), xml);
    assert_eq!(decode_if_compressed(&fixture("inventory.ocs")).unwrap(), xml);
}
