// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for newsletter metadata normalization

#![no_main]

use libfuzzer_sys::fuzz_target;
use wmex_newsletter::{extract_metadata, MediaHostResolver, MetadataSource};
use wmex_node::BinaryNode;

fuzz_target!(|data: &[u8]| {
    let node = BinaryNode::new("iq")
        .with_children(vec![BinaryNode::new("result").with_bytes(data.to_vec())]);
    let resolver = MediaHostResolver::new("https://mmg.whatsapp.net");

    // Arbitrary payloads may fail to decode, but must never panic
    for source in [MetadataSource::Create, MetadataSource::Fetch] {
        let _ = extract_metadata(&node, source, &resolver);
    }
});
