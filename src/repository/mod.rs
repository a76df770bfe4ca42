mod batch;
mod versioned;

pub use batch::BatchDispatch;
pub use versioned::VersionedRepository;
