pub mod checkout;
pub mod clone;
pub mod fetch;

// Re-export commonly used types
pub use checkout::CheckoutOptions;
pub use clone::CloneOptions;
pub use fetch::FetchOptions;
