// SPDX-License-Identifier: MIT

//! Property tests: any status payload survives the wire.

use crate::{decode, encode, HubEntry, PathEntry, Response, TrackedInfo, WildcardEntry};
use proptest::prelude::*;

fn entry_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9/._ -]{0,40}"
}

fn tracked_info_strategy() -> impl Strategy<Value = TrackedInfo> {
    (
        proptest::collection::vec(entry_strategy(), 0..8),
        proptest::collection::vec(entry_strategy(), 0..8),
        proptest::collection::vec(entry_strategy(), 0..8),
        proptest::collection::vec(entry_strategy(), 0..8),
    )
        .prop_map(|(tools, paths, hubs, wildcards)| TrackedInfo {
            tools,
            paths: paths.into_iter().map(|path| PathEntry { path }).collect(),
            hubs: hubs.into_iter().map(|path| HubEntry { path }).collect(),
            wildcards: wildcards.into_iter().map(|path| WildcardEntry { path }).collect(),
        })
}

proptest! {
    #[test]
    fn status_responses_roundtrip(info in tracked_info_strategy()) {
        let response = Response::Status { info };
        let bytes = encode(&response).unwrap();
        let back: Response = decode(&bytes).unwrap();
        prop_assert_eq!(back, response);
    }

    #[test]
    fn error_responses_roundtrip(message in "[\\PC]{0,60}") {
        let response = Response::Error { message };
        let bytes = encode(&response).unwrap();
        let back: Response = decode(&bytes).unwrap();
        prop_assert_eq!(back, response);
    }
}
