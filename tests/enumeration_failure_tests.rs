//! Interface listing under descriptor exhaustion
//!
//! Kept in its own test binary: it lowers the process file-descriptor limit,
//! which would starve any test running alongside it.

#![cfg(target_os = "linux")]

use std::fs::File;

use openports::{
    network::{AddressEnumerator, InterfaceSource, SystemInterfaces},
    ScanError,
};
use rlimit::Resource;

#[test]
fn test_listing_failure_is_reported_not_swallowed() {
    let (soft, hard) = Resource::NOFILE.get().unwrap();
    Resource::NOFILE.set(32.min(soft), hard).unwrap();

    let mut held = Vec::new();
    while let Ok(file) = File::open("/dev/null") {
        held.push(file);
    }

    let listed = SystemInterfaces.interfaces();
    let enumerated = AddressEnumerator::new().list_ipv4_addresses();

    drop(held);
    Resource::NOFILE.set(soft, hard).unwrap();

    assert!(listed.is_err(), "listing with no free descriptors succeeded");
    match enumerated {
        Err(ScanError::EnumerationError(_)) => {}
        other => panic!("expected an enumeration error, got {:?}", other),
    }
}
