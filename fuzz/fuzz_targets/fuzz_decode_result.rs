// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for WMex reply classification

#![no_main]

use libfuzzer_sys::fuzz_target;
use wmex_node::BinaryNode;
use wmex_query::decode_result;

fuzz_target!(|data: &[u8]| {
    let node = BinaryNode::new("iq")
        .with_children(vec![BinaryNode::new("result").with_bytes(data.to_vec())]);

    let _ = decode_result(&node, None, 400);
    let _ = decode_result(&node, Some("xwa2_newsletter"), 400);
});
