//! Tests for property resolution and stack assembly.
//!
//! # Test Strategy
//!
//! 1. **Assembly**: Transport first, declared order preserved
//! 2. **Injection**: Only declared properties receive binding values
//! 3. **Conflicts**: Explicit values survive, one warning per key
//! 4. **Multicast**: Retransmission forced off without transport multicast
//! 5. **Descriptors**: JSON stacks materialize through the registry

use corelib::properties::{
    BIND_ADDR, BIND_PORT, ENABLE_DIAGNOSTICS, MCAST_ADDR, MCAST_PORT, START_PORT, USE_MCAST_XMIT,
};
use corelib::{
    ModuleRegistry, ModuleRuntime, ProtocolConfiguration, ProtocolSchema, RecordingSink,
    SocketBinding, StackAssembler, StackConfiguration, StackDescriptor, StaticDefaults,
    TransportConfiguration,
};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

const INJECTED: [&str; 6] = [
    BIND_ADDR,
    BIND_PORT,
    START_PORT,
    MCAST_ADDR,
    MCAST_PORT,
    USE_MCAST_XMIT,
];

fn tcp(binding: Option<SocketBinding>) -> TransportConfiguration {
    let mut protocol = ProtocolConfiguration::new(Arc::new(ProtocolSchema::transport("TCP")));
    if let Some(binding) = binding {
        protocol = protocol.socket_binding(binding);
    }
    TransportConfiguration::new(protocol)
}

fn binding() -> SocketBinding {
    SocketBinding::new("jgroups", "10.0.0.7:7600".parse().unwrap())
        .with_multicast("230.0.0.9:45700".parse().unwrap())
}

// Property names that never collide with injected keys
fn property_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,11}".prop_filter("injected key", |name| !INJECTED.contains(&name.as_str()))
}

fn property_map_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(property_name_strategy(), "[a-z0-9]{1,8}", 0..6)
}

// ============================================================================
// Assembly Tests
// ============================================================================

#[test]
fn test_transport_first_then_declared_order() {
    let names = ["PING", "MERGE3", "FD_ALL", "VERIFY_SUSPECT", "pbcast.GMS"];
    let mut builder = StackConfiguration::builder("tcp", tcp(None));
    for name in names {
        builder = builder.protocol(ProtocolConfiguration::new(Arc::new(ProtocolSchema::new(name))));
    }
    let stack = builder.build().unwrap();
    let sink = RecordingSink::new();

    let resolved = StackAssembler::new(&stack, &sink).assemble();
    let order: Vec<_> = resolved.iter().map(|p| p.name()).collect();

    assert_eq!(order[0], "TCP");
    assert_eq!(&order[1..], &names);
    assert_eq!(resolved[0].property(ENABLE_DIAGNOSTICS), Some("false"));
}

#[test]
fn test_duplicate_protocol_rejected() {
    let schema = Arc::new(ProtocolSchema::new("PING"));
    let result = StackConfiguration::builder("tcp", tcp(None))
        .protocol(ProtocolConfiguration::new(Arc::clone(&schema)))
        .protocol(ProtocolConfiguration::new(schema))
        .build();

    assert!(result.is_err());
}

// ============================================================================
// Injection Tests
// ============================================================================

#[test]
fn prop_no_spurious_injection() {
    proptest!(|(
        declared in prop::collection::btree_set(property_name_strategy(), 0..6),
        defaults in property_map_strategy(),
        explicit in property_map_strategy()
    )| {
        let schema = Arc::new(ProtocolSchema::new("PING").properties(declared.iter().cloned()));
        let mut provider = StaticDefaults::new();
        for (name, value) in &defaults {
            provider.insert("PING", name, value);
        }
        let stack = StackConfiguration::builder("tcp", tcp(Some(binding())))
            .protocol(ProtocolConfiguration::new(schema).properties(explicit.clone()))
            .defaults(Arc::new(provider))
            .build()
            .unwrap();
        let sink = RecordingSink::new();

        let resolved = StackAssembler::new(&stack, &sink).assemble();

        let mut expected = defaults.clone();
        expected.extend(explicit);
        prop_assert_eq!(resolved[1].properties(), &expected);
        prop_assert!(sink.is_empty());
    });
}

#[test]
fn test_declared_properties_receive_binding() {
    let schema =
        ProtocolSchema::new("MPING").properties([BIND_ADDR, BIND_PORT, MCAST_ADDR, MCAST_PORT]);
    let stack = StackConfiguration::builder("tcp", tcp(None))
        .protocol(ProtocolConfiguration::new(Arc::new(schema)).socket_binding(binding()))
        .build()
        .unwrap();
    let sink = RecordingSink::new();

    let resolved = StackAssembler::new(&stack, &sink).assemble();
    let mping = &resolved[1];

    assert_eq!(mping.property(BIND_ADDR), Some("10.0.0.7"));
    assert_eq!(mping.property(BIND_PORT), Some("7600"));
    assert_eq!(mping.property(MCAST_ADDR), Some("230.0.0.9"));
    assert_eq!(mping.property(MCAST_PORT), Some("45700"));
    assert_eq!(mping.property(START_PORT), None);
    assert!(sink.is_empty());
}

// ============================================================================
// Conflict Tests
// ============================================================================

#[test]
fn prop_explicit_values_never_overwritten() {
    let keys = [BIND_ADDR, BIND_PORT, START_PORT, MCAST_ADDR, MCAST_PORT];

    proptest!(|(
        explicit in prop::collection::vec(any::<bool>(), 5),
        value in "[a-z0-9.]{1,10}"
    )| {
        let mut protocol = ProtocolConfiguration::new(Arc::new(
            ProtocolSchema::new("FD_SOCK").properties(keys),
        ))
        .socket_binding(binding());
        for (key, set) in keys.iter().zip(&explicit) {
            if *set {
                protocol = protocol.property(*key, value.as_str());
            }
        }
        let stack = StackConfiguration::builder("tcp", tcp(None))
            .protocol(protocol)
            .build()
            .unwrap();
        let sink = RecordingSink::new();

        let resolved = StackAssembler::new(&stack, &sink).assemble();
        let fd = &resolved[1];

        for (key, set) in keys.iter().zip(&explicit) {
            if *set {
                prop_assert_eq!(fd.property(key), Some(value.as_str()));
                prop_assert_eq!(sink.override_count("FD_SOCK", key), 1);
            } else {
                prop_assert!(fd.property(key).is_some());
                prop_assert_eq!(sink.override_count("FD_SOCK", key), 0);
            }
        }
        prop_assert_eq!(sink.len(), explicit.iter().filter(|set| **set).count());
    });
}

#[test]
fn test_default_value_also_blocks_injection() {
    let schema = ProtocolSchema::new("FD_SOCK").properties([BIND_ADDR, START_PORT]);
    let stack = StackConfiguration::builder("tcp", tcp(None))
        .protocol(ProtocolConfiguration::new(Arc::new(schema)).socket_binding(binding()))
        .defaults(Arc::new(StaticDefaults::new().with("FD_SOCK", START_PORT, "0")))
        .build()
        .unwrap();
    let sink = RecordingSink::new();

    let resolved = StackAssembler::new(&stack, &sink).assemble();

    assert_eq!(resolved[1].property(START_PORT), Some("0"));
    assert_eq!(resolved[1].property(BIND_ADDR), Some("10.0.0.7"));
    assert_eq!(sink.override_count("FD_SOCK", START_PORT), 1);
}

// ============================================================================
// Multicast Tests
// ============================================================================

#[test]
fn prop_retransmission_off_without_transport_multicast() {
    proptest!(|(settings in prop::collection::vec(prop::option::of("[a-z]{1,5}"), 1..6))| {
        let mut builder = StackConfiguration::builder("tcp", tcp(Some(binding())));
        for (i, setting) in settings.iter().enumerate() {
            let mut protocol = ProtocolConfiguration::new(Arc::new(
                ProtocolSchema::new(format!("NAKACK{i}")).property(USE_MCAST_XMIT),
            ));
            if let Some(value) = setting {
                protocol = protocol.property(USE_MCAST_XMIT, value.as_str());
            }
            builder = builder.protocol(protocol);
        }
        let stack = builder.build().unwrap();
        let sink = RecordingSink::new();

        let resolved = StackAssembler::new(&stack, &sink).assemble();

        for protocol in &resolved[1..] {
            prop_assert_eq!(protocol.property(USE_MCAST_XMIT), Some("false"));
        }
        prop_assert!(sink.is_empty());
    });
}

#[test]
fn test_retransmission_kept_with_transport_multicast() {
    let udp = ProtocolConfiguration::new(Arc::new(
        ProtocolSchema::transport("UDP").properties([MCAST_ADDR, MCAST_PORT, USE_MCAST_XMIT]),
    ))
    .socket_binding(binding());
    let nakack = ProtocolConfiguration::new(Arc::new(
        ProtocolSchema::new("pbcast.NAKACK2").property(USE_MCAST_XMIT),
    ))
    .property(USE_MCAST_XMIT, "true");
    let stack = StackConfiguration::builder("udp", TransportConfiguration::new(udp))
        .protocol(nakack)
        .build()
        .unwrap();
    let sink = RecordingSink::new();

    let resolved = StackAssembler::new(&stack, &sink).assemble();

    assert_eq!(resolved[0].property(USE_MCAST_XMIT), None);
    assert_eq!(resolved[1].property(USE_MCAST_XMIT), Some("true"));
}

#[test]
fn test_transport_without_multicast_disables_its_own_retransmission() {
    let tcp = ProtocolConfiguration::new(Arc::new(
        ProtocolSchema::transport("TCP").property(USE_MCAST_XMIT),
    ));
    let stack = StackConfiguration::builder("tcp", TransportConfiguration::new(tcp))
        .build()
        .unwrap();
    let sink = RecordingSink::new();

    let resolved = StackAssembler::new(&stack, &sink).assemble();

    assert_eq!(resolved[0].property(USE_MCAST_XMIT), Some("false"));
}

// ============================================================================
// Descriptor Tests
// ============================================================================

const TCP_STACK: &str = r#"{
    "name": "tcp",
    "node_name": "node2",
    "modules": [
        { "name": "TCP", "transport": true },
        { "name": "MPING", "properties": ["bind_addr", "mcast_addr", "mcast_port"] },
        { "name": "pbcast.NAKACK2", "properties": ["use_mcast_xmit"] }
    ],
    "socket_bindings": {
        "jgroups-tcp": { "address": "10.0.0.7", "port": 7600 },
        "jgroups-mping": { "address": "10.0.0.7", "port": 0,
                           "multicast_address": "230.0.0.4", "multicast_port": 45700 }
    },
    "transport": { "type": "TCP", "socket_binding": "jgroups-tcp", "shared": true },
    "protocols": [
        { "type": "MPING", "socket_binding": "jgroups-mping" },
        { "type": "pbcast.NAKACK2", "properties": { "use_mcast_xmit": "true" } }
    ]
}"#;

#[test]
fn test_descriptor_materializes() {
    let descriptor = StackDescriptor::from_json(TCP_STACK).unwrap();
    let mut registry = ModuleRegistry::new();
    for schema in descriptor.schemas() {
        registry.register(schema);
    }
    let stack = descriptor.build(&registry, None).unwrap();
    let sink = RecordingSink::new();

    let resolved = StackAssembler::new(&stack, &sink).assemble();
    let live = registry.materialize(&resolved).unwrap();

    assert_eq!(live.protocol_names(), vec!["TCP", "MPING", "pbcast.NAKACK2"]);
    assert_eq!(live.transport().singleton_name(), Some("tcp"));
    assert_eq!(live.transport().property(BIND_PORT), Some("7600"));
    assert_eq!(resolved[1].property(MCAST_ADDR), Some("230.0.0.4"));
    assert_eq!(resolved[2].property(USE_MCAST_XMIT), Some("false"));
    assert!(sink.is_empty());
}

#[test]
fn test_descriptor_json_survives_reload() {
    let descriptor = StackDescriptor::from_json(TCP_STACK).unwrap();
    let reloaded = StackDescriptor::from_json(&descriptor.to_json().unwrap()).unwrap();
    assert_eq!(descriptor, reloaded);
}
