#![no_main]

use bp6_core::bundle::Route;
use bp6_core::eid::Eid;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let route = Route {
        local: Eid::new(10, 1),
        destination: Eid::new(10, 1),
        report_to: Eid::null(),
    };
    let _ = bp6_core::bundle::receive(&route, data, 1_000_000, true, false);
});
