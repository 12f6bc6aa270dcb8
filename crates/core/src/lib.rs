// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! forge-core: ids, time, clock and variable environments for the forge
//! asset pipeline.

pub mod clock;
pub mod id;
pub mod time;
pub mod vars;

pub use clock::{Clock, FakeClock, SystemClock};
pub use id::NodeId;
pub use time::{
    format_elapsed_secs, millis_to_time, time_to_millis, times_equal_eps, TimePoint, EPOCH,
    TIME_EPSILON,
};
pub use vars::{Variables, CUR_DIR};
