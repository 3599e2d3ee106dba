pub mod azure;
pub mod base;
pub mod sse;

#[cfg(test)]
pub mod mock;
