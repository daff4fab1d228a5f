//! Field transform properties of the hydrator strategies

mod common;

use braintacle_inventory::hydrator::{
    EntityType, FieldError, HydratorSettings, Platform, RawValue, Strategy, Value,
};
use braintacle_inventory::{HydratorRegistry, InventoryError, ItemType};
use common::strategies::*;
use proptest::prelude::*;

#[test]
fn test_memory_size_sentinel() {
    let strategy = Strategy::MemorySize;
    assert_eq!(strategy.hydrate(&RawValue::text("0")).unwrap(), Value::Null);
    assert_eq!(strategy.hydrate(&RawValue::Integer(0)).unwrap(), Value::Null);
    assert_eq!(strategy.hydrate(&RawValue::text("0a")).unwrap(), Value::text("0a"));
    assert_eq!(strategy.hydrate(&RawValue::Integer(512)).unwrap(), Value::Integer(512));
}

#[test]
fn test_clock_speed_truncation() {
    let strategy = Strategy::ClockSpeed;
    assert_eq!(strategy.hydrate(&RawValue::text("800 MHz")).unwrap(), Value::Integer(800));
    assert_eq!(strategy.hydrate(&RawValue::text("Unknown")).unwrap(), Value::Null);
    assert_eq!(strategy.hydrate(&RawValue::text("0")).unwrap(), Value::Null);
    assert_eq!(strategy.hydrate(&RawValue::Integer(800)).unwrap(), Value::Integer(800));
    assert_eq!(strategy.extract(&Value::Integer(800)).unwrap(), RawValue::Integer(800));
}

#[test]
fn test_slot_size_never_null() {
    let strategy = Strategy::SlotSize;
    assert_eq!(strategy.hydrate(&RawValue::text("No")).unwrap(), Value::Integer(0));
    assert_eq!(strategy.hydrate(&RawValue::text("2048")).unwrap(), Value::Integer(2048));
    assert_eq!(strategy.hydrate(&RawValue::Null).unwrap(), Value::Integer(0));
}

#[test]
fn test_platform_bijection() {
    let strategy = Strategy::Platform;
    for platform in Platform::ALL {
        let raw = strategy.extract(&Value::Platform(platform)).unwrap();
        assert_eq!(strategy.hydrate(&raw).unwrap(), Value::Platform(platform));
    }
    assert_eq!(
        strategy.extract(&Value::text("mac")).unwrap(),
        RawValue::text("MacOSX")
    );
}

#[test]
fn test_platform_invalid_in_both_directions() {
    let strategy = Strategy::Platform;
    assert_eq!(
        strategy.hydrate(&RawValue::text("SOLARIS")),
        Err(FieldError::InvalidPlatform("SOLARIS".to_string()))
    );
    assert_eq!(
        strategy.extract(&Value::text("solaris")),
        Err(FieldError::InvalidPlatform("solaris".to_string()))
    );
}

#[test]
fn test_registry_value_sentinel() {
    let strategy = Strategy::RegistryValue;
    assert_eq!(strategy.hydrate(&RawValue::text("*")).unwrap(), Value::Null);
    assert_eq!(strategy.extract(&Value::Null).unwrap(), RawValue::text("*"));
    assert_eq!(strategy.extract(&Value::text("")).unwrap(), RawValue::text("*"));
    assert_eq!(strategy.extract(&Value::text("value")).unwrap(), RawValue::text("value"));
}

#[test]
fn test_integer_coercion() {
    let strategy = Strategy::Integer;
    assert_eq!(strategy.hydrate(&RawValue::text("42")).unwrap(), Value::Integer(42));
    assert_eq!(strategy.hydrate(&RawValue::Integer(42)).unwrap(), Value::Integer(42));
    assert_eq!(strategy.hydrate(&RawValue::Null).unwrap(), Value::Null);
    assert!(strategy.hydrate(&RawValue::text("4x2")).is_err());
}

#[test]
fn test_timestamp_zero_collapses_to_null() {
    let strategy = Strategy::Timestamp { offset: 43_200 };
    assert_eq!(strategy.hydrate(&RawValue::Integer(0)).unwrap(), Value::Null);
    assert_eq!(strategy.hydrate(&RawValue::text("")).unwrap(), Value::Null);
    assert_eq!(strategy.extract(&Value::Null).unwrap(), RawValue::Integer(0));
}

#[test]
fn test_registry_dispatch_by_name() {
    let registry = HydratorRegistry::new(HydratorSettings::default());
    for item_type in ItemType::ALL {
        let hydrator = registry.resolve(item_type.as_str()).unwrap();
        assert_eq!(hydrator.entity(), EntityType::Item(item_type));
        assert!(!hydrator.fields().is_empty());
    }
    assert_eq!(registry.resolve("package").unwrap().entity(), EntityType::Package);
    assert!(matches!(
        registry.resolve("Cpu"),
        Err(InventoryError::Configuration(_))
    ));
}

#[test]
fn test_registry_value_definition_round_trip() {
    let registry = HydratorRegistry::default();
    let hydrator = registry.get(EntityType::RegistryValueDefinition);
    let raw = [
        ("ID".to_string(), RawValue::Integer(1)),
        ("NAME".to_string(), RawValue::text("Office")),
        ("REGTREE".to_string(), RawValue::Integer(2)),
        ("REGKEY".to_string(), RawValue::text("SOFTWARE\\Microsoft\\Office")),
        ("REGVALUE".to_string(), RawValue::text("*")),
    ]
    .into_iter()
    .collect();
    let record = hydrator.hydrate(&raw).unwrap();
    assert_eq!(record["value"], Value::Null);
    let extracted = hydrator.extract(&record).unwrap();
    assert_eq!(extracted.last().unwrap(), &("REGVALUE", RawValue::text("*")));
}

proptest! {
    /// Property: timestamps survive hydration and extraction with the same offset
    #[test]
    fn timestamps_round_trip(t in timestamp_strategy(), offset in offset_strategy()) {
        let strategy = Strategy::Timestamp { offset };
        let hydrated = strategy.hydrate(&RawValue::Integer(t)).unwrap();
        prop_assert_eq!(strategy.extract(&hydrated).unwrap(), RawValue::Integer(t));
    }

    /// Property: only the exact zero sentinel collapses to null
    #[test]
    fn memory_size_passes_other_values(value in non_zero_numeric_strategy()) {
        let hydrated = Strategy::MemorySize.hydrate(&RawValue::text(value.clone())).unwrap();
        prop_assert_eq!(hydrated, Value::Text(value));
    }

    /// Property: clock speeds are the leading digits of the input
    #[test]
    fn clock_speed_uses_leading_digits(speed in 1i64..100_000, suffix in "( ?[A-Za-z]{0,3})") {
        let hydrated = Strategy::ClockSpeed.hydrate(&RawValue::text(format!("{speed}{suffix}"))).unwrap();
        prop_assert_eq!(hydrated, Value::Integer(speed));
    }
}
