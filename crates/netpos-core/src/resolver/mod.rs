// # Resolvers
//
// - `FallbackResolver`: network kinds, through an ordered provider chain
// - `InterfaceResolver`: local interfaces, through the OS lister

pub mod fallback;
pub mod interfaces;

pub use fallback::FallbackResolver;
pub use interfaces::InterfaceResolver;
