pub mod extract;
pub mod fetch;
pub mod hashtags;
pub mod notify;
pub mod reconcile;
pub mod scout;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
