mod middleware;
mod public;

pub use middleware::{PERMISSIONS_POLICY, PERMISSIONS_POLICY_VALUE, RequestContext};
pub use public::{HttpState, build_router};
